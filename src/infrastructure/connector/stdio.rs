//! Stdio connector implementation.
//!
//! Spawns the configured service command and speaks newline-delimited
//! JSON-RPC 2.0 over the child's stdin/stdout. The child's stderr is
//! inherited, so service logs land next to our own.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::domain::models::ConnectorConfig;
use crate::domain::ports::{Connector, ConnectorError};

#[derive(Debug)]
struct ChildIo {
    /// Owning handle; kill_on_drop reaps the process with the connector.
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

/// Connector speaking JSON-RPC 2.0 to a spawned subprocess.
///
/// One operation is in flight at a time; callers queue on the io lock.
#[derive(Debug)]
pub struct StdioConnector {
    name: String,
    timeout_secs: u64,
    io: Mutex<ChildIo>,
}

impl StdioConnector {
    /// Spawn the configured command and wire up its pipes.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Spawn` when the process cannot be started
    /// or its pipes cannot be captured.
    pub fn spawn(config: &ConnectorConfig) -> Result<Self, ConnectorError> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| ConnectorError::Spawn(format!("{}: {e}", config.command)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ConnectorError::Spawn("failed to capture stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConnectorError::Spawn("failed to capture stdout".to_string()))?;

        debug!(connector = %config.name, command = %config.command, "connector spawned");

        Ok(Self {
            name: config.name.clone(),
            timeout_secs: config.timeout_secs,
            io: Mutex::new(ChildIo {
                child,
                stdin,
                stdout: BufReader::new(stdout).lines(),
                next_id: 0,
            }),
        })
    }

    /// Kill the child process.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Closed` if the process cannot be signaled.
    pub async fn shutdown(&self) -> Result<(), ConnectorError> {
        let mut io = self.io.lock().await;
        io.child.kill().await.map_err(|_| ConnectorError::Closed)
    }

    /// One JSON-RPC round trip under the per-call timeout.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ConnectorError> {
        let mut io = self.io.lock().await;
        let id = io.next_id;
        io.next_id += 1;

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let mut frame = request.to_string().into_bytes();
        frame.push(b'\n');

        io.stdin
            .write_all(&frame)
            .await
            .map_err(|_| ConnectorError::Closed)?;
        io.stdin.flush().await.map_err(|_| ConnectorError::Closed)?;

        let response = timeout(
            Duration::from_secs(self.timeout_secs),
            Self::read_response(&mut io.stdout, id),
        )
        .await
        .map_err(|_| ConnectorError::Timeout(self.timeout_secs))??;

        if let Some(error) = response.get("error") {
            return Err(ConnectorError::OperationFailed(error.to_string()));
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| ConnectorError::Protocol("response missing result field".to_string()))
    }

    /// Read frames until the one matching our request id; notifications and
    /// stale replies are skipped.
    async fn read_response(
        lines: &mut Lines<BufReader<ChildStdout>>,
        id: u64,
    ) -> Result<Value, ConnectorError> {
        loop {
            let line = lines
                .next_line()
                .await
                .map_err(|e| ConnectorError::Protocol(format!("read failed: {e}")))?
                .ok_or(ConnectorError::Closed)?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let frame: Value = serde_json::from_str(line)
                .map_err(|e| ConnectorError::Protocol(format!("invalid JSON frame: {e}")))?;
            if frame.get("id").and_then(Value::as_u64) == Some(id) {
                return Ok(frame);
            }
        }
    }
}

#[async_trait]
impl Connector for StdioConnector {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, arguments), fields(connector = %self.name))]
    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, ConnectorError> {
        self.request(operation, arguments).await
    }

    async fn operations(&self) -> Result<Vec<String>, ConnectorError> {
        let result = self.request("operations/list", Value::Null).await?;
        result
            .get("operations")
            .and_then(Value::as_array)
            .map(|ops| {
                ops.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .ok_or_else(|| {
                ConnectorError::Protocol("operations/list returned no operations array".to_string())
            })
    }

    async fn health_check(&self) -> Result<(), ConnectorError> {
        self.request("ping", Value::Null).await.map(|_| ())
    }
}
