//! Mock connector for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::domain::ports::{Connector, ConnectorError};

/// Connector serving canned results and recording every call.
pub struct MockConnector {
    name: String,
    results: Mutex<HashMap<String, Result<Value, String>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockConnector {
    /// A connector with no canned results.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            results: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Canned result for an operation. Operations without one answer
    /// `{"ok": true}`.
    pub async fn set_result(&self, operation: &str, result: Value) {
        let mut results = self.results.lock().await;
        results.insert(operation.to_string(), Ok(result));
    }

    /// Make an operation fail with the given message.
    pub async fn set_failure(&self, operation: &str, message: &str) {
        let mut results = self.results.lock().await;
        results.insert(operation.to_string(), Err(message.to_string()));
    }

    /// Every `(operation, arguments)` pair seen so far, in call order.
    pub async fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, ConnectorError> {
        self.calls
            .lock()
            .await
            .push((operation.to_string(), arguments));

        let results = self.results.lock().await;
        match results.get(operation) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(ConnectorError::OperationFailed(message.clone())),
            None => Ok(json!({"ok": true})),
        }
    }

    async fn operations(&self) -> Result<Vec<String>, ConnectorError> {
        let results = self.results.lock().await;
        let mut operations: Vec<String> = results.keys().cloned().collect();
        operations.sort();
        Ok(operations)
    }

    async fn health_check(&self) -> Result<(), ConnectorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_and_default_results() {
        let connector = MockConnector::new("calendar");
        connector
            .set_result("list-events", json!([{"title": "Standup"}]))
            .await;

        let canned = connector.invoke("list-events", json!({})).await.unwrap();
        assert_eq!(canned, json!([{"title": "Standup"}]));

        let default = connector.invoke("create-event", json!({})).await.unwrap();
        assert_eq!(default, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let connector = MockConnector::new("calendar");
        connector.set_failure("create-event", "quota exceeded").await;

        let err = connector
            .invoke("create-event", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::OperationFailed(msg) if msg == "quota exceeded"));
    }

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let connector = MockConnector::new("calendar");
        connector.invoke("list-events", json!({"d": 1})).await.unwrap();
        connector.invoke("create-event", json!({"d": 2})).await.unwrap();

        let calls = connector.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "list-events");
        assert_eq!(calls[1], ("create-event".to_string(), json!({"d": 2})));
    }
}
