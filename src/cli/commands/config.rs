//! Configuration inspection CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

/// Arguments for `baton config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the resolved configuration
    Show,

    /// Check the resolved configuration for problems
    Validate,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    config: Config,
}

impl CommandOutput for ShowOutput {
    fn to_human(&self) -> String {
        let c = &self.config;
        let mut lines = vec![
            format!("model:    {} ({} via {})", c.model.name, c.model.provider, c.model.base_url),
            format!(
                "          api key from ${}, timeout {}s",
                c.model.api_key_env, c.model.timeout_secs
            ),
            format!(
                "retry:    {} retries, {}ms..{}ms backoff",
                c.retry.max_retries, c.retry.initial_backoff_ms, c.retry.max_backoff_ms
            ),
            format!(
                "session:  {} (max {} connections)",
                c.session.path, c.session.max_connections
            ),
            format!("logging:  {} / {}", c.logging.level, c.logging.format),
            format!(
                "limits:   {} tool rounds, {} questions",
                c.limits.max_tool_rounds, c.limits.max_questions
            ),
        ];
        if c.connectors.is_empty() {
            lines.push("connectors: none".to_string());
        } else {
            for connector in &c.connectors {
                lines.push(format!(
                    "connector: {} -> {} {} (timeout {}s)",
                    connector.name,
                    connector.command,
                    connector.args.join(" "),
                    connector.timeout_secs
                ));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    valid: bool,
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        "Configuration OK".to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Execute the config command.
pub fn execute(config: &Config, args: ConfigArgs, json_mode: bool) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            output(&ShowOutput { config: redacted(config) }, json_mode);
        }
        ConfigCommands::Validate => {
            ConfigLoader::validate(config)?;
            output(&ValidateOutput { valid: true }, json_mode);
        }
    }
    Ok(())
}

/// Copy of the config with the inline API key masked.
fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.model.api_key.is_some() {
        shown.model.api_key = Some("***".to_string());
    }
    shown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_masks_the_api_key() {
        let mut config = Config::default();
        config.model.api_key = Some("sk-secret".to_string());

        let shown = redacted(&config);
        assert_eq!(shown.model.api_key.as_deref(), Some("***"));

        let json = ShowOutput { config: shown }.to_json();
        assert_eq!(json["config"]["model"]["api_key"], "***");
    }

    #[test]
    fn test_show_human_output_names_the_sections() {
        let rendered = ShowOutput {
            config: Config::default(),
        }
        .to_human();
        assert!(rendered.contains("model:"));
        assert!(rendered.contains("limits:"));
        assert!(rendered.contains("connectors: none"));
    }
}
