//! Baton CLI entry point.

use clap::Parser;

use baton::cli::{handle_error, Cli, Commands};
use baton::domain::models::Config;
use baton::infrastructure::config::ConfigLoader;
use baton::infrastructure::logging::Logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => handle_error(&err, cli.json),
    };

    // Guard flushes the file appender on drop.
    let _logger = match Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(&err, cli.json),
    };

    let result = match cli.command {
        Commands::Run(args) => baton::cli::commands::run::execute(&config, args, cli.json).await,
        Commands::Graph => baton::cli::commands::graph::execute(cli.json),
        Commands::Config(args) => baton::cli::commands::config::execute(&config, args, cli.json),
    };

    if let Err(err) = result {
        handle_error(&err, cli.json);
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    ConfigLoader::validate(&config)?;
    Ok(config)
}
