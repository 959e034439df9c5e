use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The human driving the conversation.
    User,
    /// A named agent.
    Agent(String),
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent(name) => write!(f, "{name}"),
        }
    }
}

/// One turn in a session's append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke.
    pub role: TurnRole,

    /// What was said.
    pub text: String,

    /// When the turn was recorded.
    pub at: DateTime<Utc>,
}

impl Turn {
    /// A user turn stamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// An agent turn stamped now.
    pub fn agent(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Agent(name.into()),
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// Speaker label for prompt rendering and transcripts.
    pub fn speaker(&self) -> String {
        self.role.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_constructors() {
        let user = Turn::user("plan a party");
        assert_eq!(user.role, TurnRole::User);
        assert_eq!(user.speaker(), "user");

        let agent = Turn::agent("planner", "here is the plan");
        assert_eq!(agent.role, TurnRole::Agent("planner".into()));
        assert_eq!(agent.speaker(), "planner");
    }
}
