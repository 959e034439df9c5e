use anyhow::Result;
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::models::LoggingConfig;

/// Logger implementation using tracing.
///
/// Terminal output goes to stderr; the REPL owns stdout. With a log
/// directory configured, a daily-rolling JSON file layer runs alongside.
pub struct Logger {
    _guard: Option<WorkerGuard>,
}

impl Logger {
    /// Initialize the global subscriber from the logging configuration.
    ///
    /// # Errors
    /// Returns an error on an unknown level or format string.
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let default_level = parse_log_level(&config.level)?;
        let env_filter = EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy();

        let guard = if let Some(ref log_dir) = config.directory {
            let file_appender = rolling::daily(log_dir, "baton.log");
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            // File layer - always JSON for structured logging
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_current_span(true)
                .with_target(true)
                .with_filter(env_filter.clone());

            match config.format.as_str() {
                "json" => {
                    let stderr_layer = tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_current_span(true)
                        .with_target(true)
                        .with_filter(env_filter);
                    tracing_subscriber::registry()
                        .with(file_layer)
                        .with(stderr_layer)
                        .init();
                }
                "pretty" => {
                    let stderr_layer = tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(io::stderr)
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .with_filter(env_filter);
                    tracing_subscriber::registry()
                        .with(file_layer)
                        .with(stderr_layer)
                        .init();
                }
                other => anyhow::bail!("Invalid log format: {other}"),
            }

            Some(guard)
        } else {
            match config.format.as_str() {
                "json" => {
                    let stderr_layer = tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_current_span(true)
                        .with_target(true)
                        .with_filter(env_filter);
                    tracing_subscriber::registry().with(stderr_layer).init();
                }
                "pretty" => {
                    let stderr_layer = tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(io::stderr)
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .with_filter(env_filter);
                    tracing_subscriber::registry().with(stderr_layer).init();
                }
                other => anyhow::bail!("Invalid log format: {other}"),
            }

            None
        };

        tracing::debug!(
            level = %config.level,
            format = %config.format,
            file_output = config.directory.is_some(),
            "logger initialized"
        );

        Ok(Self { _guard: guard })
    }
}

/// Parse log level string to Level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {level}"),
    }
}
