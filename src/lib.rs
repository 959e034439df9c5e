//! Baton - Multi-Agent Handoff Orchestrator
//!
//! Baton runs a roster of LLM agents that pass one conversation between
//! them: a registry fixes the handoff graph up front, a dispatcher drives
//! turns against a model backend, tools execute against shared context and
//! external connectors, and every exchange lands in a persistent session.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors, and port traits
//! - **Service Layer** (`services`): registry, turn engine, fan-out, approval gate
//! - **Infrastructure Layer** (`infrastructure`): model clients, connectors,
//!   session stores, configuration, logging
//! - **Assistant Layer** (`assistant`): the event-planning roster and pipeline
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use baton::infrastructure::config::ConfigLoader;
//! use baton::infrastructure::model::ModelClientFactory;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let model = ModelClientFactory::create(&config, false)?;
//!     // Wire a PlanningPipeline and drive it; see baton::assistant.
//!     Ok(())
//! }
//! ```

pub mod assistant;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{EngineError, EngineResult, ToolError};
pub use domain::models::{
    AgentSpec, Config, DispatchResult, OutputContract, RunItem, Turn, TurnRole, TurnSignal,
};
pub use domain::ports::{Connector, ModelClient, SessionStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AgentRegistry, Dispatcher, FanOutCoordinator, ToolRegistry, TurnEngine};
