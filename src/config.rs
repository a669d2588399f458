// src/config.rs
// =============================================================================
// Runtime configuration: the GitHub token and the knobs the fetchers use.
//
// The token is the only required setting. It comes from the process
// environment, optionally seeded from a local .env file. Values already
// present in the environment always win over the file.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::ExportError;

pub const TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const API_URL_VAR: &str = "GITHUB_API_URL";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

// Loads KEY=VALUE pairs from `path` if the file exists.
//
// dotenvy never overrides variables that are already set, so an exported
// GITHUB_TOKEN beats the one in the file.
pub fn load_env_file(path: &Path) -> Result<()> {
    if !path.exists() {
        debug!(path = %path.display(), "no env file, skipping");
        return Ok(());
    }

    dotenvy::from_path(path)
        .with_context(|| format!("failed to load env file at {}", path.display()))?;
    debug!(path = %path.display(), "loaded env file");
    Ok(())
}

// Reads the token from the process environment
pub fn resolve_token() -> Result<String, ExportError> {
    resolve_token_with(|key| std::env::var(key).ok())
}

// Same as resolve_token, with the lookup injected so tests don't touch
// the real environment
pub fn resolve_token_with<F>(lookup: F) -> Result<String, ExportError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(TOKEN_VAR)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(ExportError::MissingCredential)
}

/// Tunables shared by both fetchers.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// REST base, e.g. https://api.github.com
    pub api_base: String,
    /// GraphQL endpoint, usually `{api_base}/graphql`
    pub graphql_url: String,
    pub rest_page_size: u32,
    pub graphql_page_size: u32,
    /// Courtesy pause after every listing page
    pub page_delay: Duration,
    /// Courtesy pause after every comment page and every issue
    pub comment_delay: Duration,
    /// Floor for rate-limit waits in the comment loop
    pub min_rate_limit_wait: Duration,
    /// Consecutive rate-limit waits allowed for one comment page
    pub max_rate_limit_retries: u32,
    pub request_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::with_api_base(DEFAULT_API_BASE)
    }
}

impl FetchOptions {
    pub fn with_api_base(api_base: &str) -> Self {
        let api_base = api_base.trim_end_matches('/').to_string();
        Self {
            graphql_url: format!("{api_base}/graphql"),
            api_base,
            rest_page_size: 100,
            graphql_page_size: 50,
            page_delay: Duration::from_millis(500),
            comment_delay: Duration::from_millis(300),
            min_rate_limit_wait: Duration::from_secs(60),
            max_rate_limit_retries: 10,
            request_timeout: Duration::from_secs(30),
        }
    }

    // Honors GITHUB_API_URL (GitHub Enterprise, or a mock server)
    pub fn from_env() -> Self {
        match std::env::var(API_URL_VAR) {
            Ok(base) if !base.trim().is_empty() => Self::with_api_base(base.trim()),
            _ => Self::default(),
        }
    }
}
