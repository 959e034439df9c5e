//! Common test utilities for integration tests
//!
//! Provides shared fixtures, helpers, and test utilities used across
//! multiple integration test files.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use baton::domain::errors::{EngineError, EngineResult};
use baton::domain::models::AgentSpec;
use baton::domain::ports::SessionStore;
use baton::infrastructure::model::MockModelClient;
use baton::infrastructure::session::InMemorySessionStore;
use baton::services::{
    register_builtins, AgentRegistry, CancelToken, ConfirmationSource, ContextStore, Dispatcher,
    TerminalPolicy, ToolRegistry, TurnEngine, Verdict,
};

/// Session id used by dispatcher fixtures.
#[allow(dead_code)]
pub const SESSION_ID: &str = "it-session";

/// Registry, scripted model, and engine wired together.
pub struct Rig {
    pub registry: Arc<AgentRegistry>,
    pub model: Arc<MockModelClient>,
    pub engine: TurnEngine,
}

/// Agent spec with placeholder instructions.
#[allow(dead_code)]
pub fn spec(name: &str) -> AgentSpec {
    AgentSpec::new(name, format!("You are {name}."))
}

/// Build a sealed registry and an engine over a scripted model.
///
/// Edges are `(from, targets)` pairs bound before sealing. The tool
/// registry carries the built-ins with a short routine document.
#[allow(dead_code)]
pub async fn engine_rig(specs: Vec<AgentSpec>, edges: &[(&str, &[&str])]) -> Rig {
    engine_rig_with_model(specs, edges, Arc::new(MockModelClient::new())).await
}

/// Like [`engine_rig`], with a caller-supplied model client.
#[allow(dead_code)]
pub async fn engine_rig_with_model(
    specs: Vec<AgentSpec>,
    edges: &[(&str, &[&str])],
    model: Arc<MockModelClient>,
) -> Rig {
    let mut registry = AgentRegistry::new();
    for spec in specs {
        registry.register(spec).expect("register agent");
    }
    for (from, targets) in edges {
        let from = registry.get(from).expect("edge source");
        let targets: Vec<_> = targets
            .iter()
            .map(|t| registry.get(t).expect("edge target"))
            .collect();
        registry.set_handoffs(&from, &targets).expect("bind edges");
    }
    registry.seal();
    let registry = Arc::new(registry);

    let tools = ToolRegistry::new();
    register_builtins(&tools, "gym every weekday evening").await;

    let engine = TurnEngine::new(
        Arc::clone(&registry),
        tools,
        ContextStore::new(),
        model.clone(),
        CancelToken::never(),
        8,
    );
    Rig {
        registry,
        model,
        engine,
    }
}

/// Dispatcher over the rig's engine with a fresh in-memory session.
#[allow(dead_code)]
pub async fn dispatcher_for(
    rig: &Rig,
    start: &str,
    terminal: &str,
) -> (Dispatcher, Arc<InMemorySessionStore>) {
    let sessions = Arc::new(InMemorySessionStore::new());
    sessions.create(SESSION_ID).await.expect("create session");
    let dispatcher = Dispatcher::new(
        rig.engine.clone(),
        Arc::clone(&sessions) as Arc<dyn SessionStore>,
        SESSION_ID,
        rig.registry.get(start).expect("start agent"),
        TerminalPolicy::new(terminal),
    );
    (dispatcher, sessions)
}

/// Confirmation source replaying queued verdicts.
#[allow(dead_code)]
pub struct ScriptedConfirmation {
    verdicts: Mutex<VecDeque<Verdict>>,
    pub polls: AtomicU32,
}

#[allow(dead_code)]
impl ScriptedConfirmation {
    pub fn new(verdicts: Vec<Verdict>) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.into()),
            polls: AtomicU32::new(0),
        }
    }

    pub fn poll_count(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfirmationSource for ScriptedConfirmation {
    async fn await_confirmation(&self, _prompt: &str) -> EngineResult<Verdict> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.verdicts
            .lock()
            .expect("verdict queue lock")
            .pop_front()
            .ok_or_else(|| EngineError::Session("no scripted verdict left".to_string()))
    }
}
