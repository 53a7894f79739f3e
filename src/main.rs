//! Knowledge Bae CLI entry point.

use clap::Parser;

use knowledge_bae::cli::{handle_error, load_config, run, Cli};
use knowledge_bae::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(&err, cli.json),
    };

    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(&err, cli.json),
    };

    if let Err(err) = run(cli.command, config, cli.json).await {
        handle_error(&err, cli.json);
    }
}
