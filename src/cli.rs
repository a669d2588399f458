// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// The tool has a single command. Flags choose what to export:
//   issue-archiver                      -> issues and discussions
//   issue-archiver --issues-only        -> just issues
//   issue-archiver --discussions-only   -> just discussions
//
// Everything else has a sensible default, so a bare run exports
// molstar/molstar into ./issues and ./discussions.
// =============================================================================

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::model::{ItemKind, RepoCoords};

pub const DEFAULT_OWNER: &str = "molstar";
pub const DEFAULT_REPO: &str = "molstar";

// #[derive(Parser)] tells clap to automatically generate parsing code
#[derive(Parser, Debug)]
#[command(
    name = "issue-archiver",
    version,
    about = "Export GitHub issues and discussions into LLM-readable text files",
    long_about = "issue-archiver downloads every issue and/or discussion of a GitHub repository, \
                  including all comments and replies, and writes one text file per item plus \
                  an _index.txt summary.\n\n\
                  Requires a GitHub token in GITHUB_TOKEN (or in a .env file)."
)]
pub struct Cli {
    /// Only export issues
    #[arg(long, conflicts_with = "discussions_only")]
    pub issues_only: bool,

    /// Only export discussions
    #[arg(long)]
    pub discussions_only: bool,

    /// Repository owner (user or organization)
    #[arg(long, default_value = DEFAULT_OWNER)]
    pub owner: String,

    /// Repository name
    #[arg(long, default_value = DEFAULT_REPO)]
    pub repo: String,

    /// Directory that receives issues/ and discussions/
    #[arg(long, short, default_value = ".")]
    pub output_dir: PathBuf,

    /// Which GitHub API to use
    ///
    /// auto: REST for issues, GraphQL for discussions
    #[arg(long, value_enum, default_value_t = Api::Auto)]
    pub api: Api,

    /// Optional KEY=VALUE file read before the environment is checked
    #[arg(long, default_value = ".env")]
    pub env_file: PathBuf,

    /// Show debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Api {
    Auto,
    Rest,
    Graphql,
}

impl Cli {
    // Collections to export, in the order they are processed
    pub fn kinds(&self) -> Vec<ItemKind> {
        if self.issues_only {
            vec![ItemKind::Issue]
        } else if self.discussions_only {
            vec![ItemKind::Discussion]
        } else {
            vec![ItemKind::Issue, ItemKind::Discussion]
        }
    }

    pub fn repo_coords(&self) -> RepoCoords {
        RepoCoords::new(self.owner.clone(), self.repo.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_export_both() {
        let cli = Cli::try_parse_from(["issue-archiver"]).unwrap();
        assert_eq!(cli.kinds(), vec![ItemKind::Issue, ItemKind::Discussion]);
        assert_eq!(cli.repo_coords(), RepoCoords::new("molstar", "molstar"));
        assert_eq!(cli.api, Api::Auto);
        assert_eq!(cli.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_only_flags() {
        let cli = Cli::try_parse_from(["issue-archiver", "--issues-only"]).unwrap();
        assert_eq!(cli.kinds(), vec![ItemKind::Issue]);

        let cli = Cli::try_parse_from(["issue-archiver", "--discussions-only"]).unwrap();
        assert_eq!(cli.kinds(), vec![ItemKind::Discussion]);
    }

    #[test]
    fn test_only_flags_conflict() {
        let result =
            Cli::try_parse_from(["issue-archiver", "--issues-only", "--discussions-only"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_repo_and_api() {
        let cli = Cli::try_parse_from([
            "issue-archiver",
            "--owner",
            "rust-lang",
            "--repo",
            "rust",
            "--api",
            "graphql",
            "-o",
            "out",
        ])
        .unwrap();
        assert_eq!(cli.repo_coords().to_string(), "rust-lang/rust");
        assert_eq!(cli.api, Api::Graphql);
        assert_eq!(cli.output_dir, PathBuf::from("out"));
    }
}
