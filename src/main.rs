// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Resolve the GitHub token (before any network call)
// 3. For each selected collection: fetch everything, then write the files
// 4. Exit with proper code (0 = success, 1 = error)
//
// Fetching and writing never overlap: a collection is written only after
// its fetch has fully succeeded.
// =============================================================================

mod cli;
mod config;
mod error;
mod github;
mod model;
mod output;
mod render;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::info;

use cli::{Api, Cli};
use config::FetchOptions;
use error::ExportError;
use github::{Fetcher, GitHubClient, GraphQlFetcher, RestFetcher};
use model::{ItemKind, RepoCoords};
use output::WriteSummary;
use std::path::Path;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: {e}");
    }

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            report(&e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<()> {
    config::load_env_file(&cli.env_file)?;
    let token = config::resolve_token()?;

    let options = FetchOptions::from_env();
    let client = GitHubClient::new(&token, options.request_timeout)?;
    let repo = cli.repo_coords();

    for kind in cli.kinds() {
        let fetcher = fetcher_for(cli.api, kind, client.clone(), options.clone());
        println!(
            "🔍 Downloading all {} from {} via {}...",
            kind.plural(),
            repo,
            fetcher.name()
        );

        let summary = export_collection(fetcher.as_ref(), &repo, kind, &cli.output_dir).await?;
        println!(
            "✅ Wrote {} {} to '{}' ({} open, {} closed)",
            summary.files_written,
            summary.kind.plural(),
            summary.directory.display(),
            summary.counts.open,
            summary.counts.closed
        );
    }

    Ok(())
}

// Fetch one collection completely, then write it. A failed fetch writes nothing.
async fn export_collection(
    fetcher: &dyn Fetcher,
    repo: &RepoCoords,
    kind: ItemKind,
    output_dir: &Path,
) -> Result<WriteSummary> {
    let items = fetcher
        .fetch_items(repo, kind)
        .await
        .with_context(|| format!("failed to fetch {} from {}", kind.plural(), repo))?;
    info!(count = items.len(), "fetched all {}", kind.plural());

    let generated_at = Local::now().to_rfc3339();
    let summary = output::write_collection(output_dir, kind, repo, &items, &generated_at)?;
    Ok(summary)
}

// `auto` uses REST for issues (per-issue comments, reactions) and GraphQL for
// discussions, which REST cannot list
fn fetcher_for(
    api: Api,
    kind: ItemKind,
    client: GitHubClient,
    options: FetchOptions,
) -> Box<dyn Fetcher> {
    match (api, kind) {
        (Api::Rest, _) | (Api::Auto, ItemKind::Issue) => Box::new(RestFetcher::new(client, options)),
        (Api::Graphql, _) | (Api::Auto, ItemKind::Discussion) => {
            Box::new(GraphQlFetcher::new(client, options))
        }
    }
}

// Prints the error chain, then any remediation hint the root cause carries
fn report(e: &anyhow::Error) {
    eprintln!("\nERROR: {e:#}");
    if let Some(hint) = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<ExportError>())
        .and_then(ExportError::remediation)
    {
        eprintln!("\n{hint}");
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("ISSUE_ARCHIVER_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))?;

    Ok(())
}
