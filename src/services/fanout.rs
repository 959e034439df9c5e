//! Parallel fan-out over independent agents.
//!
//! Every branch runs the same input against the shared context; the join
//! returns only after all branches completed, successful or not. Branches are
//! one-shot: a branch whose model tries to hand off fails that branch and
//! leaves the others alone.

use futures::future::join_all;
use tracing::{debug, instrument};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{AgentHandle, DispatchResult, Turn};
use crate::services::dispatcher::TurnEngine;

/// Outcome of one fan-out branch.
#[derive(Debug)]
pub struct BranchResult {
    /// Agent that ran the branch.
    pub agent: String,

    /// What the branch produced, or why it failed.
    pub outcome: EngineResult<DispatchResult>,
}

/// Runs agents concurrently and joins their results.
#[derive(Clone)]
pub struct FanOutCoordinator {
    engine: TurnEngine,
}

impl FanOutCoordinator {
    /// Coordinator sharing the given engine core.
    pub fn new(engine: TurnEngine) -> Self {
        Self { engine }
    }

    /// Run every agent against the same input and wait for all of them.
    ///
    /// Results come back in the order the agents were passed in, one per
    /// agent, regardless of which branch finished first.
    #[instrument(skip_all, fields(branches = agents.len()))]
    pub async fn run(
        &self,
        agents: &[AgentHandle],
        input: &str,
        history: &[Turn],
    ) -> Vec<BranchResult> {
        let branches = agents.iter().map(|agent| {
            let engine = self.engine.clone();
            let agent = agent.clone();
            async move {
                let outcome = engine.drive(&agent, history, input, false).await;
                BranchResult {
                    agent: agent.name().to_string(),
                    outcome: outcome.map(|o| DispatchResult {
                        items: o.items,
                        last_agent: o.last_agent,
                        signal: o.signal,
                    }),
                }
            }
        });

        let results = join_all(branches).await;
        let failed = results.iter().filter(|r| r.outcome.is_err()).count();
        debug!(failed, "fan-out joined");
        results
    }
}

/// Upgrade any branch failure to a hard error.
pub fn require_all(results: &[BranchResult]) -> EngineResult<()> {
    let failed: Vec<(String, String)> = results
        .iter()
        .filter_map(|r| {
            r.outcome
                .as_ref()
                .err()
                .map(|e| (r.agent.clone(), e.to_string()))
        })
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(EngineError::FanOutPartialFailure { failed })
    }
}

/// Concatenate the successful branches' messages, labeled by agent, in the
/// order the agents were passed to `run`.
pub fn merge_outputs(results: &[BranchResult]) -> String {
    results
        .iter()
        .filter_map(|r| {
            r.outcome
                .as_ref()
                .ok()
                .map(|d| format!("[{}]\n{}", r.agent, d.text_output()))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
