//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - `ModelClient`: LLM backend operations
//! - `Connector`: external service process operations
//! - `SessionStore`: conversation persistence
//!
//! These traits define the contracts that allow the domain to be independent
//! of specific infrastructure implementations.

pub mod connector;
pub mod model_client;
pub mod session_store;

pub use connector::{Connector, ConnectorError};
pub use model_client::{
    ModelClient, ModelError, ModelRequest, ModelTurn, ToolExchange, ToolSchema, TurnAction,
};
pub use session_store::SessionStore;
