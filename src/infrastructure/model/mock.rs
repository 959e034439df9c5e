//! Mock model client for testing.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::domain::ports::{ModelClient, ModelError, ModelRequest, ModelTurn};

/// Scripted model client.
///
/// Each agent gets a FIFO queue of turns; `complete` pops the next one for
/// the requesting agent and records the request for later inspection. An
/// agent with no remaining script fails the turn, which keeps a test from
/// silently looping past its scenario.
#[derive(Default)]
pub struct MockModelClient {
    scripts: Mutex<HashMap<String, VecDeque<Result<ModelTurn, ModelError>>>>,
    requests: Mutex<Vec<ModelRequest>>,
    default_turn: Option<ModelTurn>,
    latency: Option<Duration>,
}

impl MockModelClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every completion by the given duration.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Turn served whenever an agent's script queue is empty.
    ///
    /// Dry runs use this so every agent answers without a script.
    #[must_use]
    pub fn with_default_turn(mut self, turn: ModelTurn) -> Self {
        self.default_turn = Some(turn);
        self
    }

    /// Queue the next turn for an agent.
    pub async fn script(&self, agent: &str, turn: ModelTurn) {
        let mut scripts = self.scripts.lock().await;
        scripts.entry(agent.to_string()).or_default().push_back(Ok(turn));
    }

    /// Queue a failure for an agent's next turn.
    pub async fn script_error(&self, agent: &str, error: ModelError) {
        let mut scripts = self.scripts.lock().await;
        scripts
            .entry(agent.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Every request seen so far, in arrival order.
    pub async fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().await.clone()
    }

    /// Drop recorded requests and unconsumed scripts.
    pub async fn clear(&self) {
        self.scripts.lock().await.clear();
        self.requests.lock().await.clear();
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelTurn, ModelError> {
        self.requests.lock().await.push(request.clone());

        if let Some(latency) = self.latency {
            sleep(latency).await;
        }

        let mut scripts = self.scripts.lock().await;
        if let Some(next) = scripts.get_mut(&request.agent).and_then(VecDeque::pop_front) {
            return next;
        }

        self.default_turn.clone().ok_or_else(|| {
            ModelError::SchemaViolation(format!(
                "no scripted turn for agent {}",
                request.agent
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TurnSignal;
    use serde_json::json;
    use tokio::time::Instant;

    fn request_for(agent: &str) -> ModelRequest {
        ModelRequest {
            agent: agent.to_string(),
            instructions: "Test instructions.".to_string(),
            tools: vec![],
            handoffs: vec![],
            history: vec![],
            input: "hello".to_string(),
            exchanges: vec![],
            expects_signal: false,
        }
    }

    #[tokio::test]
    async fn test_scripts_replay_in_order() {
        let client = MockModelClient::new();
        client
            .script("planner", ModelTurn::message("first", TurnSignal::Continue))
            .await;
        client
            .script("planner", ModelTurn::message("second", TurnSignal::Done))
            .await;

        let first = client.complete(&request_for("planner")).await.unwrap();
        let second = client.complete(&request_for("planner")).await.unwrap();

        assert_eq!(first.actions.len(), 1);
        assert!(matches!(
            &first.actions[0],
            crate::domain::ports::TurnAction::Message { text, .. } if text == "first"
        ));
        assert!(matches!(
            &second.actions[0],
            crate::domain::ports::TurnAction::Message { text, .. } if text == "second"
        ));
    }

    #[tokio::test]
    async fn test_unscripted_agent_fails() {
        let client = MockModelClient::new();
        client
            .script("planner", ModelTurn::tool_call("today", json!({})))
            .await;

        let err = client.complete(&request_for("reviewer")).await.unwrap_err();
        assert!(matches!(err, ModelError::SchemaViolation(msg) if msg.contains("reviewer")));
    }

    #[tokio::test]
    async fn test_scripted_error_is_returned() {
        let client = MockModelClient::new();
        client
            .script_error("planner", ModelError::Transient("overloaded".into()))
            .await;

        let err = client.complete(&request_for("planner")).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_records_requests() {
        let client = MockModelClient::new();
        client
            .script("planner", ModelTurn::message("ok", TurnSignal::Continue))
            .await;

        client.complete(&request_for("planner")).await.unwrap();
        let requests = client.requests().await;

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].agent, "planner");
        assert_eq!(requests[0].input, "hello");
    }

    #[tokio::test]
    async fn test_default_turn_serves_unscripted_agents() {
        let client = MockModelClient::new()
            .with_default_turn(ModelTurn::message("stand-in", TurnSignal::Done));

        let turn = client.complete(&request_for("anyone")).await.unwrap();
        assert!(matches!(
            &turn.actions[0],
            crate::domain::ports::TurnAction::Message { text, .. } if text == "stand-in"
        ));
    }

    #[tokio::test]
    async fn test_latency_delays_completion() {
        let client =
            MockModelClient::new().with_latency(Duration::from_millis(20));
        client
            .script("planner", ModelTurn::message("ok", TurnSignal::Continue))
            .await;

        let started = Instant::now();
        client.complete(&request_for("planner")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
