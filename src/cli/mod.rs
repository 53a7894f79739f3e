//! Command-line interface (`kbae`)

pub mod commands;
pub mod output;
pub mod types;

use std::path::Path;

use anyhow::Result;
use console::style;

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

pub use types::{Cli, Commands};

/// Load configuration from an explicit file or the default `.kbae/` locations.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Run a parsed command line against a loaded configuration.
pub async fn run(command: Commands, config: Config, json: bool) -> Result<()> {
    match command {
        Commands::Serve { migrate, bind } => commands::serve::execute(config, migrate, bind).await,
        Commands::Search { query, k, min_score } => {
            commands::search::execute(config, query, k, min_score, json).await
        }
        Commands::Ingest {
            files,
            description,
            link,
        } => commands::ingest::execute(config, files, description, link, json).await,
        Commands::Mcp { migrate } => commands::mcp::execute(config, migrate).await,
        Commands::Migrate => commands::migrate::execute(config, json).await,
        Commands::Status => commands::status::execute(config, json).await,
    }
}

/// Print an error with its cause chain and exit non-zero.
pub fn handle_error(err: &anyhow::Error, json: bool) -> ! {
    if json {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({ "error": err.to_string(), "causes": causes });
        println!("{body}");
    } else {
        eprintln!("{} {err}", style("error:").red().bold());
        for cause in err.chain().skip(1) {
            eprintln!("  {} {cause}", style("caused by:").dim());
        }
    }
    std::process::exit(1)
}
