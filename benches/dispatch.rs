//! Benchmarks for the dispatch engine overhead.
//!
//! All benches run against zero-latency model stubs so the numbers isolate
//! engine overhead (registry lookups, item assembly, tool rounds, fan-out
//! join) from model and network time.

use std::sync::Arc;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use tokio::runtime::Runtime;

use baton::assistant::profile;
use baton::domain::models::{AgentHandle, AgentSpec, TurnSignal};
use baton::domain::ports::{ModelClient, ModelError, ModelRequest, ModelTurn};
use baton::services::tools::{register_builtins, TOOL_TODAY};
use baton::services::{
    AgentRegistry, CancelToken, ContextStore, FanOutCoordinator, ToolRegistry, TurnEngine,
};

/// Model stub that answers every request with one message, immediately.
struct MessageModel;

#[async_trait]
impl ModelClient for MessageModel {
    fn name(&self) -> &'static str {
        "bench"
    }

    async fn complete(&self, _request: &ModelRequest) -> Result<ModelTurn, ModelError> {
        Ok(ModelTurn::message("Here is the plan.", TurnSignal::Continue))
    }
}

/// Model stub that requests one tool round before answering.
///
/// Keyed off the replayed exchanges, so it needs no state between calls.
struct ToolRoundModel;

#[async_trait]
impl ModelClient for ToolRoundModel {
    fn name(&self) -> &'static str {
        "bench-tools"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelTurn, ModelError> {
        if request.exchanges.is_empty() {
            Ok(ModelTurn::tool_call(TOOL_TODAY, json!({})))
        } else {
            Ok(ModelTurn::message("Done for today.", TurnSignal::Continue))
        }
    }
}

fn engine_for(
    rt: &Runtime,
    model: Arc<dyn ModelClient>,
    specs: Vec<AgentSpec>,
) -> (TurnEngine, Vec<AgentHandle>) {
    let mut registry = AgentRegistry::new();
    let handles: Vec<AgentHandle> = specs
        .into_iter()
        .map(|spec| registry.register(spec).expect("register agent"))
        .collect();
    registry.seal();

    let tools = ToolRegistry::new();
    rt.block_on(register_builtins(&tools, "gym every weekday evening"));

    let engine = TurnEngine::new(
        Arc::new(registry),
        tools,
        ContextStore::new(),
        model,
        CancelToken::never(),
        8,
    );
    (engine, handles)
}

fn benchmark_single_message_turn(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let (engine, handles) = engine_for(
        &rt,
        Arc::new(MessageModel),
        vec![AgentSpec::new("planner", "You plan events.")],
    );
    let planner = handles[0].clone();

    c.bench_function("engine_single_message_turn", |b| {
        b.iter(|| {
            rt.block_on(async {
                let outcome = engine
                    .drive(&planner, &[], "plan a birthday dinner", true)
                    .await
                    .expect("drive");
                black_box(outcome);
            });
        });
    });
}

fn benchmark_turn_with_tool_round(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let (engine, handles) = engine_for(
        &rt,
        Arc::new(ToolRoundModel),
        vec![AgentSpec::new("planner", "You plan events.").with_tools([TOOL_TODAY])],
    );
    let planner = handles[0].clone();

    c.bench_function("engine_turn_with_tool_round", |b| {
        b.iter(|| {
            rt.block_on(async {
                let outcome = engine
                    .drive(&planner, &[], "what day suits", true)
                    .await
                    .expect("drive");
                black_box(outcome);
            });
        });
    });
}

fn benchmark_fanout_two_branch_join(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let (engine, handles) = engine_for(
        &rt,
        Arc::new(MessageModel),
        vec![
            AgentSpec::new("calendar_checker", "Check the calendar."),
            AgentSpec::new("routine_checker", "Check the routine."),
        ],
    );
    let coordinator = FanOutCoordinator::new(engine);
    let agents = [handles[0].clone(), handles[1].clone()];

    c.bench_function("fanout_two_branch_join", |b| {
        b.iter(|| {
            rt.block_on(async {
                let results = coordinator.run(&agents, "dinner Friday at 7", &[]).await;
                black_box(results);
            });
        });
    });
}

fn benchmark_profile_install(c: &mut Criterion) {
    c.bench_function("profile_install", |b| {
        b.iter(|| {
            let mut registry = AgentRegistry::new();
            let handles = profile::install(&mut registry).expect("install profile");
            black_box(handles);
        });
    });
}

criterion_group!(
    benches,
    benchmark_single_message_turn,
    benchmark_turn_with_tool_round,
    benchmark_fanout_two_branch_join,
    benchmark_profile_install
);
criterion_main!(benches);
