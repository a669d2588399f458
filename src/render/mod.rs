// src/render/mod.rs
// =============================================================================
// This module turns fetched items into text.
//
// Submodules:
// - document: one file's worth of text per issue/discussion
// - index: the `_index.txt` summary for a whole collection
//
// Rendering is pure: no I/O, no clock. The output module does the writing.
// =============================================================================

mod document;
mod index;

pub use document::render_item;
pub use index::{render_index, Counts};
