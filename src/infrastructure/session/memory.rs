//! In-memory session store for tests and ephemeral runs.

use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::models::Turn;
use crate::domain::ports::SessionStore;

/// Session store holding everything in process memory.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl InMemorySessionStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.to_string()).or_default();
        Ok(())
    }

    async fn append_turns(&self, session_id: &str, turns: &[Turn]) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(stored) => {
                stored.extend_from_slice(turns);
                Ok(())
            }
            None => bail!("unknown session: {session_id}"),
        }
    }

    async fn history(&self, session_id: &str) -> Result<Vec<Turn>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }

    async fn exists(&self, session_id: &str) -> Result<bool> {
        let sessions = self.sessions.read().await;
        Ok(sessions.contains_key(session_id))
    }
}
