//! Wiring and drive loop for the planning assistant.
//!
//! [`PlanningPipeline::build`] assembles the whole stack from config: agent
//! registry, tools, shared context, model client, session store, and the
//! calendar connector. A conversation then runs in two phases, the way the
//! flow is laid out in [`crate::assistant::profile`]: the parallel conflict
//! phase first, then dispatch steps with the approval gate between the
//! reviewer and the calendar writer.

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::assistant::profile::{self, ProfileHandles};
use crate::domain::errors::EngineError;
use crate::domain::models::{AgentHandle, Config, DispatchResult, RunItem, TurnSignal};
use crate::domain::ports::{Connector, ModelClient, SessionStore};
use crate::infrastructure::connector::{MockConnector, StdioConnector};
use crate::infrastructure::session::{InMemorySessionStore, SqliteSessionStore};
use crate::services::approval::{ApprovalGate, ConfirmationSource, Verdict};
use crate::services::context::ContextStore;
use crate::services::dispatcher::{
    cancel_pair, CancelHandle, Dispatcher, TerminalPolicy, TurnEngine,
};
use crate::services::fanout::{merge_outputs, require_all, FanOutCoordinator};
use crate::services::registry::AgentRegistry;
use crate::services::tools::{register_builtins, CalendarTool, ToolRegistry, KEY_MAX_QUESTIONS};

/// Context key holding the user's opening request.
pub const KEY_INITIAL_REQUEST: &str = "initial_request";

/// Question put to the user when a presented plan awaits a verdict.
const GATE_PROMPT: &str = "Approve this plan, or describe the changes you want.";

/// Build options for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Session to resume; a fresh id is generated when unset.
    pub session_id: Option<String>,

    /// Dry run: the calendar connector is stubbed instead of spawned.
    pub mock: bool,

    /// Keep the session in memory instead of the configured database.
    pub ephemeral: bool,
}

/// What the caller should do after a pipeline turn.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The conversation waits for the next free-form user input.
    AwaitingInput {
        /// Items the turn produced, in order.
        items: Vec<RunItem>,
    },

    /// The reviewer presented a plan; the approval gate wants a verdict.
    AwaitingVerdict {
        /// Items the turn produced, in order.
        items: Vec<RunItem>,
        /// Question to put to the user.
        prompt: String,
    },

    /// The terminal agent reported completion.
    Finished {
        /// Items the turn produced, in order.
        items: Vec<RunItem>,
    },
}

impl TurnOutcome {
    /// Items the turn produced, in order.
    pub fn items(&self) -> &[RunItem] {
        match self {
            Self::AwaitingInput { items }
            | Self::AwaitingVerdict { items, .. }
            | Self::Finished { items } => items,
        }
    }

    /// Whether the conversation is over.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}

/// Fully wired planning assistant for one session.
pub struct PlanningPipeline {
    dispatcher: Dispatcher,
    coordinator: FanOutCoordinator,
    gate: ApprovalGate,
    confirmation: Arc<dyn ConfirmationSource>,
    checkers: [AgentHandle; 2],
    cancel: Arc<CancelHandle>,
    calendar: Option<Arc<StdioConnector>>,
    session_id: String,
    pending_verdict: bool,
}

impl PlanningPipeline {
    /// Wire the full assistant from config.
    ///
    /// Installs the agent profile, registers the built-in tools, spawns the
    /// configured calendar connector (stubbed on a dry run or when none is
    /// configured), opens the session store, and seeds the shared context
    /// with the question budget.
    pub async fn build(
        config: &Config,
        options: PipelineOptions,
        model: Arc<dyn ModelClient>,
        confirmation: Arc<dyn ConfirmationSource>,
    ) -> Result<Self> {
        let mut registry = AgentRegistry::new();
        let handles = profile::install(&mut registry)?;
        let registry = Arc::new(registry);

        let tools = ToolRegistry::new();
        register_builtins(&tools, config.routine.document.clone()).await;
        let calendar = Self::connect_calendar(config, &options, &tools).await?;

        let context = ContextStore::new();
        context
            .save(KEY_MAX_QUESTIONS, json!(config.limits.max_questions))
            .await;

        let sessions: Arc<dyn SessionStore> = if options.ephemeral {
            Arc::new(InMemorySessionStore::new())
        } else {
            Arc::new(SqliteSessionStore::open(&config.session).await?)
        };
        let session_id = options
            .session_id
            .unwrap_or_else(|| format!("planning-{}", uuid::Uuid::new_v4()));
        sessions.create(&session_id).await?;

        let (cancel, token) = cancel_pair();
        let engine = TurnEngine::new(
            Arc::clone(&registry),
            tools,
            context,
            model,
            token,
            config.limits.max_tool_rounds,
        );
        let dispatcher = Dispatcher::new(
            engine.clone(),
            sessions,
            session_id.clone(),
            handles.orchestrator.clone(),
            TerminalPolicy::new(profile::CALENDAR_AGENT),
        );
        let coordinator = FanOutCoordinator::new(engine);
        let gate = ApprovalGate::new(
            profile::REVIEWER_AGENT,
            profile::CALENDAR_AGENT,
            profile::PLANNING_ORCHESTRATOR,
        );

        info!(session = %session_id, "planning pipeline ready");

        let ProfileHandles {
            calendar_checker,
            routine_checker,
            ..
        } = handles;
        Ok(Self {
            dispatcher,
            coordinator,
            gate,
            confirmation,
            checkers: [calendar_checker, routine_checker],
            cancel: Arc::new(cancel),
            calendar,
            session_id,
            pending_verdict: false,
        })
    }

    /// Spawn the configured calendar connector and register the calendar
    /// tool against it. Dry runs and missing configuration get a stub.
    async fn connect_calendar(
        config: &Config,
        options: &PipelineOptions,
        tools: &ToolRegistry,
    ) -> Result<Option<Arc<StdioConnector>>> {
        let configured = config
            .connectors
            .iter()
            .find(|c| c.name == profile::CALENDAR_CONNECTOR);

        let (spawned, connector): (Option<Arc<StdioConnector>>, Arc<dyn Connector>) =
            match configured {
                Some(cfg) if !options.mock => {
                    let stdio = Arc::new(StdioConnector::spawn(cfg)?);
                    stdio
                        .health_check()
                        .await
                        .context("calendar connector failed its health check")?;
                    (Some(Arc::clone(&stdio)), stdio)
                }
                Some(_) => {
                    debug!("dry run; calendar connector not spawned");
                    (
                        None,
                        Arc::new(MockConnector::new(profile::CALENDAR_CONNECTOR)),
                    )
                }
                None => {
                    warn!("no calendar connector configured; calendar operations are stubbed");
                    (
                        None,
                        Arc::new(MockConnector::new(profile::CALENDAR_CONNECTOR)),
                    )
                }
            };

        tools.register(Arc::new(CalendarTool::new(connector))).await;
        Ok(spawned)
    }

    /// Session this pipeline appends to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Name of the agent currently holding the conversation.
    pub fn current_agent(&self) -> &str {
        self.dispatcher.current_agent().name()
    }

    /// Request cooperative cancellation of in-flight work.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle for canceling in-flight work from another task.
    pub fn cancel_handle(&self) -> Arc<CancelHandle> {
        Arc::clone(&self.cancel)
    }

    /// Kill the spawned calendar connector, if any.
    pub async fn shutdown(&self) {
        if let Some(connector) = &self.calendar {
            if let Err(e) = connector.shutdown().await {
                debug!(error = %e, "calendar connector was already gone");
            }
        }
    }

    /// Open the conversation: run the parallel conflict phase, then hand the
    /// merged report to the conflict orchestrator.
    ///
    /// Both checker branches see the same input and the shared context. The
    /// branches themselves are not recorded in the session; the merged
    /// report becomes the recorded input of the orchestrator step.
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub async fn start(&mut self, input: &str) -> Result<TurnOutcome> {
        self.dispatcher
            .engine()
            .context()
            .save(KEY_INITIAL_REQUEST, json!(input))
            .await;

        let results = self.coordinator.run(&self.checkers, input, &[]).await;
        // Cancellation outranks the partial-failure report.
        if results
            .iter()
            .any(|r| matches!(r.outcome, Err(EngineError::Canceled)))
        {
            return Err(EngineError::Canceled.into());
        }
        require_all(&results)?;
        let report = merge_outputs(&results);
        let composite = format!("User request: {input}\n\n{report}");
        debug!("conflict phase complete");

        let result = self.dispatcher.step(&composite).await?;
        self.after_step(result).await
    }

    /// Run one dispatch step with free-form user input.
    #[instrument(skip_all, fields(session = %self.session_id, agent = %self.dispatcher.current_agent()))]
    pub async fn advance(&mut self, input: &str) -> Result<TurnOutcome> {
        let result = self.dispatcher.step(input).await?;
        self.after_step(result).await
    }

    /// Consult the confirmation source for the pending plan verdict and
    /// follow the gate's routing.
    ///
    /// Valid only right after a turn ended in [`TurnOutcome::AwaitingVerdict`].
    pub async fn confirm(&mut self) -> Result<TurnOutcome> {
        if !self.pending_verdict {
            bail!("no plan is awaiting a verdict");
        }
        self.pending_verdict = false;

        let verdict = self.confirmation.await_confirmation(GATE_PROMPT).await?;
        let decision = self.gate.route(&verdict);
        debug!(target = %decision.target, "gate routed the verdict");
        self.dispatcher.hand_to(&decision.target)?;
        let result = self.dispatcher.step(&decision.input).await?;
        self.after_step(result).await
    }

    /// Shared post-step routing.
    ///
    /// Finishes on the terminal signal, arms the gate when the reviewer
    /// presented a plan, and follows a reviewer-reported change request
    /// straight back to the planner. Approval is never taken from the model;
    /// the calendar writer runs only after [`Self::confirm`].
    async fn after_step(&mut self, first: DispatchResult) -> Result<TurnOutcome> {
        let mut items = Vec::new();
        let mut current = first;

        loop {
            items.append(&mut current.items);

            if self.dispatcher.is_finished(&current) {
                info!(session = %self.session_id, "planning complete");
                return Ok(TurnOutcome::Finished { items });
            }

            if self.gate.applies_to(&current) {
                if let TurnSignal::ChangesRequested(feedback) = &current.signal {
                    let decision = self
                        .gate
                        .route(&Verdict::ChangesRequested(feedback.clone()));
                    self.dispatcher.hand_to(&decision.target)?;
                    current = self.dispatcher.step(&decision.input).await?;
                    continue;
                }
                self.pending_verdict = true;
                return Ok(TurnOutcome::AwaitingVerdict {
                    items,
                    prompt: GATE_PROMPT.to_string(),
                });
            }

            return Ok(TurnOutcome::AwaitingInput { items });
        }
    }
}
