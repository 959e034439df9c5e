//! Shared key-value context visible to every agent and tool.
//!
//! Cloning is cheap and shares state. Writes are serialized behind a single
//! writer lock; when concurrent fan-out branches write the same key the last
//! write wins, and the next sequential stage observes the post-join state.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

/// Process-wide mutable context store.
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl ContextStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under a key, replacing any previous value.
    pub async fn save(&self, key: impl Into<String>, value: Value) {
        self.inner.write().await.insert(key.into(), value);
    }

    /// Fetch a value by key.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().await.get(key).cloned()
    }

    /// Remove a key, returning the value it held.
    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().await.remove(key)
    }

    /// Copy of the full store contents.
    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.inner.read().await.clone()
    }

    /// Drop every entry. Used between planning runs.
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Increment an integer counter under the write lock and return the new
    /// value. Missing or non-integer values count from zero.
    pub async fn increment(&self, key: &str) -> i64 {
        let mut guard = self.inner.write().await;
        let next = guard.get(key).and_then(Value::as_i64).unwrap_or(0) + 1;
        guard.insert(key.to_string(), Value::from(next));
        next
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
