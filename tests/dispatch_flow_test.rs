//! Dispatch loop integration tests: session persistence, failure isolation,
//! terminal detection, and handoff validation through the public API.

mod common;

use baton::domain::errors::EngineError;
use baton::domain::models::{TurnRole, TurnSignal};
use baton::domain::ports::{ModelError, ModelTurn, SessionStore};
use baton::services::AgentRegistry;

use common::{dispatcher_for, engine_rig, spec, SESSION_ID};

#[tokio::test]
async fn test_failed_step_leaves_session_and_agent_unchanged() {
    let rig = engine_rig(
        vec![spec("coordinator"), spec("worker")],
        &[("coordinator", &["worker"])],
    )
    .await;
    let (mut dispatcher, sessions) = dispatcher_for(&rig, "coordinator", "worker").await;

    rig.model
        .script(
            "coordinator",
            ModelTurn::message("Noted.", TurnSignal::Continue),
        )
        .await;
    dispatcher.step("first request").await.expect("first step");
    let before = sessions.history(SESSION_ID).await.expect("history");
    assert_eq!(before.len(), 2);

    rig.model
        .script_error("coordinator", ModelError::Transient("overloaded".into()))
        .await;
    let err = dispatcher.step("second request").await.unwrap_err();
    assert!(matches!(err, EngineError::Model(_)));

    // Nothing was written and the conversation did not move.
    let after = sessions.history(SESSION_ID).await.expect("history");
    assert_eq!(after.len(), before.len());
    assert_eq!(dispatcher.current_agent().name(), "coordinator");

    // The same input succeeds on retry and lands in the session.
    rig.model
        .script(
            "coordinator",
            ModelTurn::message("Recovered.", TurnSignal::Continue),
        )
        .await;
    dispatcher.step("second request").await.expect("retry step");
    let final_history = sessions.history(SESSION_ID).await.expect("history");
    assert_eq!(final_history.len(), 4);
    assert_eq!(final_history[2].role, TurnRole::User);
    assert_eq!(final_history[2].text, "second request");
    assert_eq!(final_history[3].text, "Recovered.");
}

#[tokio::test]
async fn test_full_history_feeds_every_step() {
    let rig = engine_rig(vec![spec("coordinator")], &[]).await;
    let (mut dispatcher, _sessions) = dispatcher_for(&rig, "coordinator", "coordinator").await;

    rig.model
        .script(
            "coordinator",
            ModelTurn::message("First reply.", TurnSignal::Continue),
        )
        .await;
    rig.model
        .script(
            "coordinator",
            ModelTurn::message("Second reply.", TurnSignal::Continue),
        )
        .await;

    dispatcher.step("hello").await.expect("step one");
    dispatcher.step("again").await.expect("step two");

    let requests = rig.model.requests().await;
    assert_eq!(requests.len(), 2);
    assert!(requests[0].history.is_empty());
    let replayed: Vec<&str> = requests[1]
        .history
        .iter()
        .map(|turn| turn.text.as_str())
        .collect();
    assert_eq!(replayed, vec!["hello", "First reply."]);
}

#[tokio::test]
async fn test_terminal_policy_requires_terminal_agent_and_done() {
    let rig = engine_rig(
        vec![spec("worker"), spec("closer")],
        &[("worker", &["closer"])],
    )
    .await;
    let (mut dispatcher, _sessions) = dispatcher_for(&rig, "worker", "closer").await;

    // Done from a non-terminal agent does not finish the conversation.
    rig.model
        .script("worker", ModelTurn::message("Wrapped up.", TurnSignal::Done))
        .await;
    let result = dispatcher.step("do the thing").await.expect("step");
    assert!(!dispatcher.is_finished(&result));

    // Done from the terminal agent does.
    rig.model.script("worker", ModelTurn::handoff("closer")).await;
    rig.model
        .script("closer", ModelTurn::message("All recorded.", TurnSignal::Done))
        .await;
    let result = dispatcher.step("finish it").await.expect("step");
    assert!(dispatcher.is_finished(&result));
    assert_eq!(result.last_agent, "closer");
}

#[tokio::test]
async fn test_handoff_to_undeclared_target_fails_step() {
    let rig = engine_rig(
        vec![spec("coordinator"), spec("worker")],
        &[("coordinator", &["worker"])],
    )
    .await;
    let (mut dispatcher, sessions) = dispatcher_for(&rig, "coordinator", "worker").await;

    // "worker" declares no outgoing edges, so the model cannot route there.
    rig.model.script("coordinator", ModelTurn::handoff("worker")).await;
    rig.model.script("worker", ModelTurn::handoff("coordinator")).await;

    let err = dispatcher.step("go").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::UnknownTarget { ref agent, ref target }
            if agent == "worker" && target == "coordinator"
    ));
    assert!(sessions
        .history(SESSION_ID)
        .await
        .expect("history")
        .is_empty());
}

#[tokio::test]
async fn test_hand_to_validates_against_declared_edges() {
    let rig = engine_rig(
        vec![spec("reviewer"), spec("calendar"), spec("planner")],
        &[("reviewer", &["calendar"])],
    )
    .await;
    let (mut dispatcher, _sessions) = dispatcher_for(&rig, "reviewer", "calendar").await;

    dispatcher.hand_to("calendar").expect("declared edge");
    assert_eq!(dispatcher.current_agent().name(), "calendar");

    let err = dispatcher.hand_to("planner").unwrap_err();
    assert!(matches!(err, EngineError::UnknownTarget { .. }));
}

#[test]
fn test_sealed_registry_rejects_new_agents() {
    let mut registry = AgentRegistry::new();
    registry.register(spec("only")).expect("register");
    registry.seal();

    let err = registry.register(spec("late")).unwrap_err();
    assert!(matches!(err, EngineError::RegistrySealed));
}
