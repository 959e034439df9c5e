//! Connector implementations.

pub mod mock;
pub mod stdio;

pub use mock::MockConnector;
pub use stdio::StdioConnector;
