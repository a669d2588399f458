// src/github/mod.rs
// =============================================================================
// This module fetches issues and discussions from GitHub.
//
// Two implementations of one Fetcher trait:
// - RestFetcher: page-number pagination, separate comments endpoint per issue
// - GraphQlFetcher: cursor pagination, comments and replies in one response
//
// main.rs picks one per collection. Both produce the same Item shape, so the
// renderer never knows which API the data came from.
//
// Rust concepts:
// - Traits: a shared interface with several implementations
// - async_trait: async methods on traits we can box as `dyn Fetcher`
// =============================================================================

mod client;
mod graphql;
mod rest;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Item, ItemKind, RepoCoords};

pub use client::GitHubClient;
pub use graphql::GraphQlFetcher;
pub use rest::RestFetcher;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Short API name for logs and error messages
    fn name(&self) -> &'static str;

    /// Every item of `kind`, oldest first, with its full comment thread.
    ///
    /// Runs to completion before returning; there are no partial results on
    /// failure.
    async fn fetch_items(&self, repo: &RepoCoords, kind: ItemKind) -> Result<Vec<Item>>;
}
