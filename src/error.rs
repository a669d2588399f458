// src/error.rs
// =============================================================================
// This module defines everything that can go wrong during an export.
//
// Failure taxonomy:
// - MissingCredential: no GITHUB_TOKEN, checked before any network call
// - RateLimited: GitHub refused us until a reset time
// - RequestFailed: any other non-success HTTP status
// - GraphQl: the GraphQL endpoint answered with errors and no data
// - Unsupported: the chosen API cannot list the requested kind
//
// Every fatal error knows how to explain itself to the user via
// `remediation()`, which main.rs prints before exiting.
//
// Rust concepts:
// - thiserror: derive macro that implements std::error::Error for us
// - #[from]: automatic conversion so the ? operator just works
// =============================================================================

use chrono::{DateTime, Local, Utc};
use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

use crate::model::ItemKind;

// Result alias used by the fetchers and the writer
pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    /// GITHUB_TOKEN is absent or empty
    #[error("GITHUB_TOKEN environment variable required")]
    MissingCredential,

    /// GitHub's rate limit was hit; it lifts at `reset_at`
    #[error("rate limited by GitHub API until {}", format_reset(.reset_at))]
    RateLimited { reset_at: DateTime<Utc> },

    /// Any other non-success HTTP status
    #[error("request to {url} failed: HTTP {status}")]
    RequestFailed { status: StatusCode, url: String },

    /// GraphQL errors with nothing usable in `data`
    #[error("GraphQL query failed: {}", .messages.join("; "))]
    GraphQl { messages: Vec<String> },

    /// e.g. the REST API has no repository discussions listing
    #[error("the {api} API cannot fetch {}", .kind.plural())]
    Unsupported { api: &'static str, kind: ItemKind },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("could not decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    // Actionable advice printed after the error message, if we have any
    pub fn remediation(&self) -> Option<String> {
        match self {
            ExportError::MissingCredential => Some(
                [
                    "Without a token, GitHub allows only 60 requests/hour, which is",
                    "insufficient to download all issues with comments.",
                    "",
                    "To fix:",
                    "  1. Create a token at: https://github.com/settings/tokens",
                    "     (no special scopes needed for public repos)",
                    "  2. Run:",
                    "     export GITHUB_TOKEN=your_token_here",
                    "     (or put GITHUB_TOKEN=... in a .env file)",
                ]
                .join("\n"),
            ),
            ExportError::RateLimited { reset_at } => Some(format!(
                "Rate limit resets at: {}\nRe-run the export after that time; it starts from scratch.",
                format_reset(reset_at)
            )),
            ExportError::RequestFailed { status, .. }
                if *status == StatusCode::UNAUTHORIZED =>
            {
                Some("Check that GITHUB_TOKEN is valid and has not expired.".to_string())
            }
            ExportError::Unsupported { .. } => {
                Some("Use --api graphql (or the default --api auto).".to_string())
            }
            _ => None,
        }
    }
}

// Reset times are shown in local wall-clock time, like a user would read them
fn format_reset(reset_at: &DateTime<Utc>) -> String {
    reset_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
