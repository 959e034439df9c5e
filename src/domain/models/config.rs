use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main configuration structure for baton.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Model backend configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Session store configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// External connector configurations
    #[serde(default)]
    pub connectors: Vec<ConnectorConfig>,

    /// User routine document handed to the routine tool
    #[serde(default)]
    pub routine: RoutineConfig,

    /// Engine limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            retry: RetryConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
            connectors: vec![],
            routine: RoutineConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelConfig {
    /// Backend to use: http or mock
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name passed to the backend
    #[serde(default = "default_model_name")]
    pub name: String,

    /// API key; falls back to the `api_key_env` environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable consulted when `api_key` is unset
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the chat-completions endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "http".to_string()
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

const fn default_model_timeout() -> u64 {
    60
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            name: default_model_name(),
            api_key: None,
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_model_timeout(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Path to the `SQLite` session database
    #[serde(default = "default_session_path")]
    pub path: String,

    /// Maximum number of database connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_session_path() -> String {
    ".baton/sessions.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling file logs; stderr only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
        }
    }
}

/// External connector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConnectorConfig {
    /// Connector name agents refer to
    pub name: String,

    /// Command to spawn
    pub command: String,

    /// Command arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables for the spawned process
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Per-call timeout in seconds
    #[serde(default = "default_connector_timeout")]
    pub timeout_secs: u64,
}

const fn default_connector_timeout() -> u64 {
    30
}

/// User routine document configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoutineConfig {
    /// Free-form routine and preferences text returned by the routine tool
    #[serde(default = "default_routine_document")]
    pub document: String,
}

fn default_routine_document() -> String {
    "Lives in Kandy. Weekday gym 7-9 PM. Commutes by train: 7 AM out, 6 PM \
     back. Office hours 9-5 in Colombo. Grocery run on Saturday mornings; \
     haircut at the neighborhood salon once a month."
        .to_string()
}

impl Default for RoutineConfig {
    fn default() -> Self {
        Self {
            document: default_routine_document(),
        }
    }
}

/// Engine limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LimitsConfig {
    /// Maximum tool rounds within a single agent turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Question budget seeded into the shared context
    #[serde(default = "default_max_questions")]
    pub max_questions: u32,
}

const fn default_max_tool_rounds() -> u32 {
    8
}

const fn default_max_questions() -> u32 {
    3
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            max_questions: default_max_questions(),
        }
    }
}
