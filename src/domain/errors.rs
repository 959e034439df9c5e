//! Domain errors for the baton orchestration engine.

use thiserror::Error;

use crate::domain::ports::{ConnectorError, ModelError};

/// Format fan-out branch failures as `agent: error, agent: error`.
fn format_branch_failures(failed: &[(String, String)]) -> String {
    failed
        .iter()
        .map(|(agent, err)| format!("{agent}: {err}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Engine-level errors raised while building or driving the agent graph.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Agent already registered: {0}")]
    DuplicateAgent(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Unknown handoff target: {agent} -> {target}")]
    UnknownTarget { agent: String, target: String },

    #[error("Invalid handoff from {from} to {to}: {reason}")]
    InvalidHandoff { from: String, to: String, reason: String },

    #[error("Registry is sealed; agents and handoffs can no longer change")]
    RegistrySealed,

    #[error("Tool round limit reached for {agent}: {limit}")]
    ToolRoundLimit { agent: String, limit: u32 },

    #[error("Fan-out branches failed: {}", format_branch_failures(.failed))]
    FanOutPartialFailure { failed: Vec<(String, String)> },

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Session store error: {0}")]
    Session(String),

    #[error("Operation canceled")]
    Canceled,
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Session(err.to_string())
    }
}

/// Errors surfaced by the tool invocation layer.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Execution of {tool} failed: {reason}")]
    ExecutionFailure { tool: String, reason: String },
}

impl ToolError {
    /// Tool name the error was raised for.
    pub fn tool_name(&self) -> &str {
        match self {
            Self::UnknownTool(name) => name,
            Self::InvalidArguments { tool, .. } | Self::ExecutionFailure { tool, .. } => tool,
        }
    }
}
