//! Infrastructure layer module
//!
//! This module contains all infrastructure adapters and external integrations:
//! - Model client implementations (HTTP chat completions, scripted mock)
//! - Connector implementations (stdio JSON-RPC subprocesses)
//! - Session store implementations (SQLite with sqlx, in-memory)
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod connector;
pub mod logging;
pub mod model;
pub mod session;
