use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One visible item produced during a dispatch step, in generation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunItem {
    /// Text the agent addressed to the user.
    MessageOutput { agent: String, text: String },

    /// The agent requested a tool invocation.
    ToolCall {
        agent: String,
        tool: String,
        arguments: Value,
    },

    /// Result of a completed tool invocation.
    ToolCallOutput {
        agent: String,
        tool: String,
        output: Value,
    },

    /// Control transferred between agents.
    HandoffOutput { from: String, to: String },
}

impl fmt::Display for RunItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageOutput { agent, text } => write!(f, "{agent}: {text}"),
            Self::ToolCall { agent, tool, .. } => write!(f, "{agent} -> tool {tool}"),
            Self::ToolCallOutput { agent, tool, .. } => write!(f, "{agent} <- tool {tool}"),
            Self::HandoffOutput { from, to } => write!(f, "{from} handed off to {to}"),
        }
    }
}

/// Structured completion signal carried by an agent's final message.
///
/// Replaces keyword sniffing on message prose: an agent under a `Signal`
/// contract reports its outcome here and the engine branches on the variant,
/// never on the text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnSignal {
    /// More work remains; keep dispatching.
    #[default]
    Continue,
    /// The agent finished its terminal action.
    Done,
    /// The reviewed plan was accepted.
    Approved,
    /// The reviewed plan needs revision; carries the feedback.
    ChangesRequested(String),
}

impl TurnSignal {
    /// Whether this signal marks terminal completion.
    pub fn is_done(&self) -> bool {
        *self == Self::Done
    }

    /// Revision feedback, when the signal carries one.
    pub fn feedback(&self) -> Option<&str> {
        match self {
            Self::ChangesRequested(feedback) => Some(feedback),
            _ => None,
        }
    }
}

/// Outcome of one successful dispatch step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    /// Everything the step produced, in order.
    pub items: Vec<RunItem>,

    /// Agent that produced the final message of the step.
    pub last_agent: String,

    /// Signal attached to the final message.
    pub signal: TurnSignal,
}

impl DispatchResult {
    /// Message texts in generation order.
    pub fn message_texts(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| match item {
                RunItem::MessageOutput { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// All message texts joined with newlines.
    pub fn text_output(&self) -> String {
        self.message_texts().join("\n")
    }

    /// The final message of the step, if any message was produced.
    pub fn final_text(&self) -> Option<&str> {
        self.message_texts().last().copied()
    }

    /// The last handoff edge followed during the step, if any.
    pub fn handoff(&self) -> Option<(&str, &str)> {
        self.items.iter().rev().find_map(|item| match item {
            RunItem::HandoffOutput { from, to } => Some((from.as_str(), to.as_str())),
            _ => None,
        })
    }
}
