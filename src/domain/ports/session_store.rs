//! Session store port (trait) for dependency injection.
//!
//! Defines the contract for conversation persistence that infrastructure
//! adapters implement. Services depend on this trait, not concrete stores.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::Turn;

/// Append-only store of conversation turns keyed by session id.
///
/// The dispatcher reads the full history before every step and appends the
/// step's turns only after the step succeeded; a failed step writes nothing.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates the session if it does not already exist.
    ///
    /// Idempotent: creating an existing session is a no-op.
    ///
    /// # Errors
    /// Returns error if the backing store fails.
    async fn create(&self, session_id: &str) -> Result<()>;

    /// Appends turns to the session, preserving order.
    ///
    /// # Errors
    /// Returns error if:
    /// - Session does not exist
    /// - The backing store fails
    async fn append_turns(&self, session_id: &str, turns: &[Turn]) -> Result<()>;

    /// Full turn history, oldest first.
    ///
    /// Returns an empty history for an unknown session.
    ///
    /// # Errors
    /// Returns error if the backing store fails.
    async fn history(&self, session_id: &str) -> Result<Vec<Turn>>;

    /// Checks whether the session exists.
    ///
    /// # Errors
    /// Returns error if the backing store fails.
    async fn exists(&self, session_id: &str) -> Result<bool>;
}
