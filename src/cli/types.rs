//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kbae")]
#[command(about = "Knowledge Bae - semantic search over your documents", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .kbae/config.yaml and .kbae/local.yaml)
    #[arg(short, long, global = true, env = "KBAE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP search API
    Serve {
        /// Apply database migrations before serving
        #[arg(long)]
        migrate: bool,

        /// Override the configured bind address
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Search the corpus
    Search {
        /// Query text
        query: String,

        /// Number of results to return
        #[arg(short, long)]
        k: Option<usize>,

        /// Drop results scoring below this similarity
        #[arg(long)]
        min_score: Option<f32>,
    },

    /// Chunk, embed and store documents
    Ingest {
        /// Text files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Reference description stored with every chunk (defaults to the file name)
        #[arg(short, long)]
        description: Option<String>,

        /// Reference link stored with every chunk
        #[arg(short, long)]
        link: Option<String>,
    },

    /// Serve the search and ingest tools over MCP on stdio
    Mcp {
        /// Apply database migrations before serving
        #[arg(long)]
        migrate: bool,
    },

    /// Apply database migrations
    Migrate,

    /// Show provider, store and circuit breaker status
    Status,
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
    fn test_parse_search() {
        let cli = Cli::try_parse_from(["kbae", "search", "sky color", "-k", "3", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Search { query, k, min_score } => {
                assert_eq!(query, "sky color");
                assert_eq!(k, Some(3));
                assert_eq!(min_score, None);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_ingest_requires_files() {
        assert!(Cli::try_parse_from(["kbae", "ingest"]).is_err());
    }
}
