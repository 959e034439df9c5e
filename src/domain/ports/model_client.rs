//! Model client port - interface for LLM backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::models::{Turn, TurnSignal};

/// JSON-schema description of a tool offered to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One completed tool exchange fed back to the model within the same turn.
#[derive(Debug, Clone)]
pub struct ToolExchange {
    pub tool: String,
    pub arguments: Value,
    pub output: Value,
}

/// Request for one turn of the current agent.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Name of the agent whose turn this is.
    pub agent: String,

    /// The agent's system instructions.
    pub instructions: String,

    /// Tools the agent may request, already filtered to its allowlist.
    pub tools: Vec<ToolSchema>,

    /// Handoff targets the agent may name.
    pub handoffs: Vec<String>,

    /// Prior conversation turns, oldest first.
    pub history: Vec<Turn>,

    /// Input for this turn.
    pub input: String,

    /// Tool results produced earlier in this turn, oldest first.
    pub exchanges: Vec<ToolExchange>,

    /// Whether the final message must carry the structured signal envelope.
    pub expects_signal: bool,
}

/// One thing the model decided to do.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnAction {
    /// Invoke a tool and report the result back.
    ToolInvocation { tool: String, arguments: Value },

    /// Final message of the turn, with its signal.
    Message { text: String, signal: TurnSignal },

    /// Transfer control to another agent.
    Handoff { target: String },
}

/// One round of model output.
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    /// Actions in the order the model emitted them.
    pub actions: Vec<TurnAction>,
}

impl ModelTurn {
    /// A turn holding the given actions.
    pub fn new(actions: Vec<TurnAction>) -> Self {
        Self { actions }
    }

    /// A turn with a single final message.
    pub fn message(text: impl Into<String>, signal: TurnSignal) -> Self {
        Self::new(vec![TurnAction::Message {
            text: text.into(),
            signal,
        }])
    }

    /// A turn with a single tool invocation.
    pub fn tool_call(tool: impl Into<String>, arguments: Value) -> Self {
        Self::new(vec![TurnAction::ToolInvocation {
            tool: tool.into(),
            arguments,
        }])
    }

    /// A turn with a single handoff directive.
    pub fn handoff(target: impl Into<String>) -> Self {
        Self::new(vec![TurnAction::Handoff {
            target: target.into(),
        }])
    }
}

/// Error types specific to model invocation
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Transient model failure: {0}")]
    Transient(String),

    #[error("Model violated its output contract: {0}")]
    SchemaViolation(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API key not configured (set {0})")]
    MissingApiKey(String),
}

impl ModelError {
    /// Whether a retry with the same request can reasonably succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Port trait for LLM backends.
///
/// A model client turns one [`ModelRequest`] into the actions the agent wants
/// to take. Turn-loop bookkeeping (executing tools, feeding results back,
/// following handoffs) belongs to the dispatcher, not the client.
///
/// # Errors
/// - `ModelError::Transient` - rate limit, 5xx, connection failure (retryable)
/// - `ModelError::SchemaViolation` - output breaks the agent's contract (fatal)
/// - `ModelError::Http` - non-retryable HTTP failure (fatal)
/// - `ModelError::MissingApiKey` - credential absent at call time (fatal)
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Run one model round for the request.
    async fn complete(&self, request: &ModelRequest) -> Result<ModelTurn, ModelError>;
}
