//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - EnvFilter from config with `RUST_LOG` override
//! - JSON or pretty terminal output on stderr
//! - Optional daily-rolling JSON file output

pub mod logger;

pub use logger::Logger;
