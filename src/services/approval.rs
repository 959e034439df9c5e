//! Human-in-the-loop approval gate.
//!
//! The gate is an engine primitive, not an agent behavior: after the
//! reviewer presents a plan the engine consults a [`ConfirmationSource`] and
//! routes on the structured verdict. Whether the plan proceeds never depends
//! on keyword matching against model prose, and the side-effecting terminal
//! agent runs only after an explicit approval.

use async_trait::async_trait;

use crate::domain::errors::EngineResult;
use crate::domain::models::DispatchResult;

/// Human verdict on a presented plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Proceed with the plan as presented.
    Approved,
    /// Revise the plan; carries the reviewer feedback.
    ChangesRequested(String),
}

/// Source of human confirmation.
#[async_trait]
pub trait ConfirmationSource: Send + Sync {
    /// Present the prompt and block until a verdict arrives.
    async fn await_confirmation(&self, prompt: &str) -> EngineResult<Verdict>;
}

/// Classify a raw human reply as a verdict.
///
/// A short affirmative (case-insensitive) approves; anything else is treated
/// as revision feedback verbatim.
pub fn classify_reply(reply: &str) -> Verdict {
    let normalized = reply.trim().to_lowercase();
    match normalized.as_str() {
        "y" | "yes" | "yep" | "approve" | "approved" | "ok" | "okay" | "sure" | "lgtm"
        | "looks good" => Verdict::Approved,
        _ => Verdict::ChangesRequested(reply.trim().to_string()),
    }
}

/// Which agent's presentations gate, and where each verdict routes.
#[derive(Debug, Clone)]
pub struct ApprovalGate {
    reviewer: String,
    on_approve: String,
    on_changes: String,
}

/// Routing decision for one verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    /// Agent to hand the conversation to.
    pub target: String,

    /// Input for the next dispatch step.
    pub input: String,
}

impl ApprovalGate {
    /// Gate on `reviewer`, routing approval to `on_approve` and change
    /// requests to `on_changes`. Both targets must be declared handoff edges
    /// of the reviewer; the dispatcher re-validates the move.
    pub fn new(
        reviewer: impl Into<String>,
        on_approve: impl Into<String>,
        on_changes: impl Into<String>,
    ) -> Self {
        Self {
            reviewer: reviewer.into(),
            on_approve: on_approve.into(),
            on_changes: on_changes.into(),
        }
    }

    /// Name of the gating reviewer agent.
    pub fn reviewer(&self) -> &str {
        &self.reviewer
    }

    /// Whether the step result is a reviewer presentation to gate on.
    pub fn applies_to(&self, result: &DispatchResult) -> bool {
        result.last_agent == self.reviewer
    }

    /// Route a verdict to the next agent and its input.
    pub fn route(&self, verdict: &Verdict) -> GateDecision {
        match verdict {
            Verdict::Approved => GateDecision {
                target: self.on_approve.clone(),
                input: "The plan is approved. Carry it out now.".to_string(),
            },
            Verdict::ChangesRequested(feedback) => GateDecision {
                target: self.on_changes.clone(),
                input: format!("Revise the plan. Feedback: {feedback}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TurnSignal;

    #[test]
    fn test_classify_affirmatives() {
        for reply in ["yes", "YES", "  y ", "Approve", "ok", "Looks Good", "lgtm"] {
            assert_eq!(classify_reply(reply), Verdict::Approved, "reply: {reply}");
        }
    }

    #[test]
    fn test_classify_feedback_passes_text_through() {
        let verdict = classify_reply("  Move the dinner to Friday instead. ");
        assert_eq!(
            verdict,
            Verdict::ChangesRequested("Move the dinner to Friday instead.".into())
        );
    }

    #[test]
    fn test_route_targets() {
        let gate = ApprovalGate::new("reviewer", "calendar", "planner");

        let approved = gate.route(&Verdict::Approved);
        assert_eq!(approved.target, "calendar");

        let changes = gate.route(&Verdict::ChangesRequested("earlier please".into()));
        assert_eq!(changes.target, "planner");
        assert!(changes.input.contains("earlier please"));
    }

    #[test]
    fn test_applies_to_reviewer_results_only() {
        let gate = ApprovalGate::new("reviewer", "calendar", "planner");
        let reviewer_stop = DispatchResult {
            items: vec![],
            last_agent: "reviewer".into(),
            signal: TurnSignal::Continue,
        };
        let planner_stop = DispatchResult {
            items: vec![],
            last_agent: "planner".into(),
            signal: TurnSignal::Continue,
        };

        assert!(gate.applies_to(&reviewer_stop));
        assert!(!gate.applies_to(&planner_stop));
    }
}
