pub mod approval;
pub mod context;
pub mod dispatcher;
pub mod fanout;
pub mod registry;
pub mod tools;

pub use approval::{classify_reply, ApprovalGate, ConfirmationSource, GateDecision, Verdict};
pub use context::ContextStore;
pub use dispatcher::{
    cancel_pair, CancelHandle, CancelToken, Dispatcher, DriveOutcome, TerminalPolicy, TurnEngine,
};
pub use fanout::{merge_outputs, require_all, BranchResult, FanOutCoordinator};
pub use registry::AgentRegistry;
pub use tools::{register_builtins, Tool, ToolCtx, ToolRegistry};
