// src/output/mod.rs
// =============================================================================
// This module puts rendered collections on disk.
//
// Submodules:
// - filename: `<prefix>_<NNNN>_<sanitized title>.txt` naming
// - writer: one file per item plus `_index.txt` per collection
// =============================================================================

mod filename;
mod writer;

pub use writer::{write_collection, WriteSummary};
