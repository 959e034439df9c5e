//! Dispatch loop driving one conversation across the agent graph.
//!
//! A step hands the user input to the current agent and follows the model's
//! actions: tool invocations are executed and fed back, handoff directives
//! transfer control along declared edges, and a final message ends the step.
//! Only a successful step is persisted and advances the current agent; any
//! failure leaves both the session and the position untouched so the caller
//! can retry the same step.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::domain::errors::{EngineError, EngineResult, ToolError};
use crate::domain::models::{AgentHandle, DispatchResult, RunItem, Turn, TurnSignal};
use crate::domain::ports::{
    ModelClient, ModelError, ModelRequest, SessionStore, ToolExchange, TurnAction,
};
use crate::services::context::ContextStore;
use crate::services::registry::AgentRegistry;
use crate::services::tools::{ToolCtx, ToolRegistry};

/// Create a linked cancellation handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx: Some(rx) })
}

/// Sender half of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel every token linked to this handle.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Cooperative cancellation token checked at invocation boundaries.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelToken {
    /// A token that can never be canceled.
    pub const fn never() -> Self {
        Self { rx: None }
    }

    /// Whether cancellation was requested.
    pub fn is_canceled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

/// Terminal condition for a dispatched conversation.
///
/// Finished means the terminal agent produced a `Done` signal; reaching the
/// terminal agent with any other signal keeps the conversation open.
#[derive(Debug, Clone)]
pub struct TerminalPolicy {
    terminal_agent: String,
}

impl TerminalPolicy {
    /// Policy finishing on `Done` from the named agent.
    pub fn new(terminal_agent: impl Into<String>) -> Self {
        Self {
            terminal_agent: terminal_agent.into(),
        }
    }

    /// Name of the terminal agent.
    pub fn terminal_agent(&self) -> &str {
        &self.terminal_agent
    }

    /// Whether the step result terminates the conversation.
    pub fn is_finished(&self, result: &DispatchResult) -> bool {
        result.last_agent == self.terminal_agent && result.signal.is_done()
    }
}

/// Everything one agent chain produced while being driven.
#[derive(Debug)]
pub struct DriveOutcome {
    /// Items in generation order.
    pub items: Vec<RunItem>,

    /// Agent message turns, in order.
    pub turns: Vec<Turn>,

    /// Where control rests after the chain.
    pub final_agent: AgentHandle,

    /// Agent that produced the final message.
    pub last_agent: String,

    /// Signal attached to the final message.
    pub signal: TurnSignal,
}

/// Shared turn-loop core used by the dispatcher and the fan-out coordinator.
#[derive(Clone)]
pub struct TurnEngine {
    registry: Arc<AgentRegistry>,
    tools: ToolRegistry,
    context: ContextStore,
    model: Arc<dyn ModelClient>,
    cancel: CancelToken,
    max_tool_rounds: u32,
}

impl TurnEngine {
    /// Assemble the engine core.
    pub fn new(
        registry: Arc<AgentRegistry>,
        tools: ToolRegistry,
        context: ContextStore,
        model: Arc<dyn ModelClient>,
        cancel: CancelToken,
        max_tool_rounds: u32,
    ) -> Self {
        Self {
            registry,
            tools,
            context,
            model,
            cancel,
            max_tool_rounds,
        }
    }

    /// The agent registry the engine dispatches against.
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// The shared context store.
    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    /// Drive one agent chain to its final message.
    ///
    /// Starts at `start` and keeps going until an agent ends its turn with a
    /// message and no pending handoff. Messages produced earlier in the chain
    /// are visible to later agents through the request history. With
    /// `allow_handoffs` false a handoff directive fails the chain instead;
    /// parallel branches run in that mode. An agent whose spec gates its
    /// handoffs is offered no transfer directives and cannot leave its turn
    /// by handoff at all; its declared edges are reserved for `hand_to`.
    pub async fn drive(
        &self,
        start: &AgentHandle,
        history: &[Turn],
        input: &str,
        allow_handoffs: bool,
    ) -> EngineResult<DriveOutcome> {
        let mut items: Vec<RunItem> = Vec::new();
        let mut turns: Vec<Turn> = Vec::new();
        let mut agent = start.clone();
        let mut last_agent = agent.name().to_string();
        let mut signal = TurnSignal::Continue;

        'agents: loop {
            let spec = self.registry.spec(&agent)?;
            let tool_schemas = self.tools.schemas(&spec.tools).await;
            let handoff_names: Vec<String> = if allow_handoffs && !spec.gate_handoffs {
                self.registry
                    .handoff_targets(&agent)?
                    .iter()
                    .map(|h| h.name().to_string())
                    .collect()
            } else {
                Vec::new()
            };

            let mut exchanges: Vec<ToolExchange> = Vec::new();
            let mut rounds: u32 = 0;

            loop {
                if self.cancel.is_canceled() {
                    return Err(EngineError::Canceled);
                }
                if rounds >= self.max_tool_rounds {
                    return Err(EngineError::ToolRoundLimit {
                        agent: spec.name.clone(),
                        limit: self.max_tool_rounds,
                    });
                }
                rounds += 1;

                let mut request_history = history.to_vec();
                request_history.extend(turns.iter().cloned());
                let request = ModelRequest {
                    agent: spec.name.clone(),
                    instructions: spec.instructions.clone(),
                    tools: tool_schemas.clone(),
                    handoffs: handoff_names.clone(),
                    history: request_history,
                    input: input.to_string(),
                    exchanges: exchanges.clone(),
                    expects_signal: spec.expects_signal(),
                };

                let turn = self.model.complete(&request).await?;
                if turn.actions.is_empty() {
                    return Err(
                        ModelError::SchemaViolation("model returned an empty turn".into()).into(),
                    );
                }

                let mut ran_tool = false;
                let mut messaged = false;

                for action in turn.actions {
                    match action {
                        TurnAction::ToolInvocation { tool, arguments } => {
                            if !spec.allows_tool(&tool) {
                                return Err(ToolError::UnknownTool(tool).into());
                            }
                            if self.cancel.is_canceled() {
                                return Err(EngineError::Canceled);
                            }
                            items.push(RunItem::ToolCall {
                                agent: spec.name.clone(),
                                tool: tool.clone(),
                                arguments: arguments.clone(),
                            });
                            let ctx = ToolCtx {
                                agent: spec.name.clone(),
                                context: self.context.clone(),
                            };
                            let output = self.tools.invoke(&tool, arguments.clone(), &ctx).await?;
                            items.push(RunItem::ToolCallOutput {
                                agent: spec.name.clone(),
                                tool: tool.clone(),
                                output: output.clone(),
                            });
                            exchanges.push(ToolExchange {
                                tool,
                                arguments,
                                output,
                            });
                            ran_tool = true;
                        }
                        TurnAction::Message { text, signal: s } => {
                            items.push(RunItem::MessageOutput {
                                agent: spec.name.clone(),
                                text: text.clone(),
                            });
                            turns.push(Turn::agent(spec.name.clone(), text));
                            last_agent = spec.name.clone();
                            signal = s;
                            messaged = true;
                        }
                        TurnAction::Handoff { target } => {
                            if !allow_handoffs {
                                return Err(EngineError::InvalidHandoff {
                                    from: spec.name.clone(),
                                    to: target,
                                    reason: "handoffs are not allowed inside a parallel branch"
                                        .into(),
                                });
                            }
                            if spec.gate_handoffs {
                                return Err(EngineError::InvalidHandoff {
                                    from: spec.name.clone(),
                                    to: target,
                                    reason: "leaving this agent requires a confirmed verdict"
                                        .into(),
                                });
                            }
                            let next = self.registry.resolve_handoff(&agent, &target)?;
                            items.push(RunItem::HandoffOutput {
                                from: spec.name.clone(),
                                to: next.name().to_string(),
                            });
                            debug!(from = %spec.name, to = %next.name(), "handoff");
                            agent = next;
                            continue 'agents;
                        }
                    }
                }

                if messaged {
                    break 'agents;
                }
                if !ran_tool {
                    return Err(ModelError::SchemaViolation(
                        "turn produced neither a message, a tool call, nor a handoff".into(),
                    )
                    .into());
                }
            }
        }

        Ok(DriveOutcome {
            items,
            turns,
            final_agent: agent,
            last_agent,
            signal,
        })
    }
}

/// Stateful dispatcher for one session.
pub struct Dispatcher {
    engine: TurnEngine,
    sessions: Arc<dyn SessionStore>,
    session_id: String,
    current: AgentHandle,
    terminal: TerminalPolicy,
}

impl Dispatcher {
    /// Dispatcher starting at `start` for the given session.
    pub fn new(
        engine: TurnEngine,
        sessions: Arc<dyn SessionStore>,
        session_id: impl Into<String>,
        start: AgentHandle,
        terminal: TerminalPolicy,
    ) -> Self {
        Self {
            engine,
            sessions,
            session_id: session_id.into(),
            current: start,
            terminal,
        }
    }

    /// Agent currently holding the conversation.
    pub fn current_agent(&self) -> &AgentHandle {
        &self.current
    }

    /// Session this dispatcher appends to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The engine core, for coordinators sharing this dispatcher's wiring.
    pub fn engine(&self) -> &TurnEngine {
        &self.engine
    }

    /// Whether the result terminates the conversation.
    pub fn is_finished(&self, result: &DispatchResult) -> bool {
        self.terminal.is_finished(result)
    }

    /// Run one dispatch step with the given user input.
    ///
    /// On success the user turn and every agent message are appended to the
    /// session and the current agent follows any handoffs that occurred. On
    /// failure nothing is written and the current agent is unchanged.
    #[instrument(skip(self, user_input), fields(session_id = %self.session_id, agent = %self.current), err)]
    pub async fn step(&mut self, user_input: &str) -> EngineResult<DispatchResult> {
        let history = self.sessions.history(&self.session_id).await?;
        let outcome = self
            .engine
            .drive(&self.current, &history, user_input, true)
            .await?;

        let mut new_turns = Vec::with_capacity(outcome.turns.len() + 1);
        new_turns.push(Turn::user(user_input));
        new_turns.extend(outcome.turns);
        self.sessions
            .append_turns(&self.session_id, &new_turns)
            .await?;

        self.current = outcome.final_agent;
        debug!(
            items = outcome.items.len(),
            last_agent = %outcome.last_agent,
            "step completed"
        );

        Ok(DispatchResult {
            items: outcome.items,
            last_agent: outcome.last_agent,
            signal: outcome.signal,
        })
    }

    /// Move the conversation along a declared edge without a model turn.
    ///
    /// Used by the approval gate to follow the reviewer's outcome edges. The
    /// move is validated against the current agent's declared targets.
    pub fn hand_to(&mut self, target: &str) -> EngineResult<()> {
        let next = self
            .engine
            .registry()
            .resolve_handoff(&self.current, target)?;
        debug!(from = %self.current, to = %next, "gate handoff");
        self.current = next;
        Ok(())
    }
}
