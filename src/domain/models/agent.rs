use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output contract for an agent's final message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputContract {
    /// Plain prose; the turn signal defaults to `Continue`.
    #[default]
    FreeText,
    /// The final message must carry the structured signal envelope.
    Signal,
}

impl fmt::Display for OutputContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FreeText => write!(f, "freetext"),
            Self::Signal => write!(f, "signal"),
        }
    }
}

impl FromStr for OutputContract {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "freetext" => Ok(Self::FreeText),
            "signal" => Ok(Self::Signal),
            _ => Err(anyhow::anyhow!("Invalid output contract: {s}")),
        }
    }
}

/// Immutable description of an agent.
///
/// Handoff targets are not part of the spec; they are bound late through the
/// registry so mutually-referencing agents can be declared in any order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Unique agent name; doubles as the handoff target label.
    pub name: String,

    /// System instructions sent with every model request.
    pub instructions: String,

    /// Names of the tools this agent may invoke.
    #[serde(default)]
    pub tools: Vec<String>,

    /// Names of the connectors this agent's tools may reach.
    #[serde(default)]
    pub connectors: Vec<String>,

    /// Contract for the agent's final output.
    #[serde(default)]
    pub contract: OutputContract,

    /// Outgoing edges are followed only on a confirmed verdict, never from
    /// a model turn.
    #[serde(default)]
    pub gate_handoffs: bool,
}

impl AgentSpec {
    /// Create a spec with no tools, no connectors, free-text output.
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            tools: Vec::new(),
            connectors: Vec::new(),
            contract: OutputContract::FreeText,
            gate_handoffs: false,
        }
    }

    /// Set the tool allowlist.
    #[must_use]
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Set the connector allowlist.
    #[must_use]
    pub fn with_connectors<I, S>(mut self, connectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.connectors = connectors.into_iter().map(Into::into).collect();
        self
    }

    /// Set the output contract.
    #[must_use]
    pub const fn with_contract(mut self, contract: OutputContract) -> Self {
        self.contract = contract;
        self
    }

    /// Reserve this agent's outgoing edges for a confirmed verdict.
    ///
    /// The dispatcher offers a gated agent no transfer directives and fails
    /// a model-proposed handoff from it; only `hand_to` leaves the agent.
    #[must_use]
    pub const fn with_gated_handoffs(mut self) -> Self {
        self.gate_handoffs = true;
        self
    }

    /// Whether the model must emit the structured signal envelope.
    pub fn expects_signal(&self) -> bool {
        self.contract == OutputContract::Signal
    }

    /// Whether the agent declared the named tool.
    pub fn allows_tool(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }
}

/// Cheap handle to a registered agent.
///
/// Issued by the registry at registration time; the index is only meaningful
/// to the registry that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentHandle {
    index: usize,
    name: String,
}

impl AgentHandle {
    pub(crate) fn new(index: usize, name: impl Into<String>) -> Self {
        Self { index, name: name.into() }
    }

    /// The agent's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) const fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
