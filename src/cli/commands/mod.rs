//! CLI command implementations.

pub mod config;
pub mod graph;
pub mod run;
