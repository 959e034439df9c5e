use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid model provider: {0}. Must be one of: http, mock")]
    InvalidProvider(String),

    #[error("Session database path cannot be empty")]
    EmptySessionPath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid max_tool_rounds: {0}. Must be at least 1")]
    InvalidMaxToolRounds(u32),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .baton/config.yaml (project config)
    /// 3. .baton/local.yaml (project local overrides, optional)
    /// 4. Environment variables (BATON_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.baton/) so several
    /// assistants on one machine stay independent.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            // 1. Start with programmatic defaults
            .merge(Serialized::defaults(Config::default()))
            // 2. Merge project config
            .merge(Yaml::file(".baton/config.yaml"))
            // 3. Merge project local overrides (optional)
            .merge(Yaml::file(".baton/local.yaml"))
            // 4. Merge environment variables (highest priority)
            .merge(Env::prefixed("BATON_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("BATON_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        // Validate model config
        let valid_providers = ["http", "mock"];
        if !valid_providers.contains(&config.model.provider.as_str()) {
            return Err(ConfigError::InvalidProvider(config.model.provider.clone()));
        }
        if config.model.name.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Model name cannot be empty".to_string(),
            ));
        }
        if config.model.provider == "http" && config.model.base_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Model base_url cannot be empty for the http provider".to_string(),
            ));
        }

        // Validate session store config
        if config.session.path.is_empty() {
            return Err(ConfigError::EmptySessionPath);
        }
        if config.session.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.session.max_connections,
            ));
        }

        // Validate retry config
        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }
        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        // Validate engine limits
        if config.limits.max_tool_rounds == 0 {
            return Err(ConfigError::InvalidMaxToolRounds(
                config.limits.max_tool_rounds,
            ));
        }

        // Validate connector configs
        let mut seen = std::collections::HashSet::new();
        for connector in &config.connectors {
            if connector.name.is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "Connector name cannot be empty".to_string(),
                ));
            }
            if connector.command.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Connector '{}' command cannot be empty",
                    connector.name
                )));
            }
            if !seen.insert(connector.name.as_str()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Connector '{}' is configured twice",
                    connector.name
                )));
            }
        }

        Ok(())
    }
}
