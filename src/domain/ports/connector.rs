//! Connector port - interface for external service processes.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Error types specific to connector operations
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Failed to spawn connector process: {0}")]
    Spawn(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Operation timed out after {0}s")]
    Timeout(u64),

    #[error("Connector closed")]
    Closed,
}

/// Port trait for an external connector.
///
/// A connector fronts one external service process. Operations are plain
/// names; argument and result semantics belong to the service behind it.
/// Calls are sequential per connector: one in-flight operation at a time.
///
/// # Errors
/// - `ConnectorError::Spawn` - process could not be started (fatal)
/// - `ConnectorError::Protocol` - malformed frame on the wire (fatal)
/// - `ConnectorError::OperationFailed` - the service rejected the operation
/// - `ConnectorError::Timeout` - no response within the per-call budget
/// - `ConnectorError::Closed` - the process exited or its pipes closed
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connector name agents refer to.
    fn name(&self) -> &str;

    /// Invoke a named operation.
    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, ConnectorError>;

    /// List the operations the service advertises.
    async fn operations(&self) -> Result<Vec<String>, ConnectorError>;

    /// Check the service responds at all.
    async fn health_check(&self) -> Result<(), ConnectorError>;
}
