//! The event-planning assistant built on the dispatch engine.
//!
//! [`profile`] declares the agent roster and its handoff graph;
//! [`pipeline`] wires the roster to tools, model, sessions, and the
//! approval gate, and drives a conversation turn by turn.

pub mod pipeline;
pub mod profile;

pub use pipeline::{PipelineOptions, PlanningPipeline, TurnOutcome};
pub use profile::{install, ProfileHandles};
