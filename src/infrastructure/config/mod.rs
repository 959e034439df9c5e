//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - Programmatic defaults, then `.baton/` YAML files, then `BATON_` env vars
//! - Eager validation before anything else starts
//! - Type-safe config structs shared with the domain layer

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
