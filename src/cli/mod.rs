//! Command-line interface for the baton assistant.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level argument parser.
#[derive(Parser, Debug)]
#[command(name = "baton", version, about = "Multi-agent event planning assistant")]
pub struct Cli {
    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to load instead of the default search path
    #[arg(long, short = 'c', global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive planning conversation
    Run(commands::run::RunArgs),

    /// Show the agent roster and its handoff graph
    Graph,

    /// Inspect configuration
    Config(commands::config::ConfigArgs),
}

/// Report a fatal error and exit nonzero.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let payload = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_default()
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
