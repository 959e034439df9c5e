//! SQLite-backed session store.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use tracing::debug;

use crate::domain::models::{SessionConfig, Turn, TurnRole};
use crate::domain::ports::SessionStore;

/// Conversation turns persisted in SQLite.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (or create) the session database at the configured path.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be opened or the schema
    /// cannot be created.
    pub async fn open(config: &SessionConfig) -> Result<Self> {
        ensure_database_directory(&config.path)?;

        let url = if config.path.starts_with("sqlite:") {
            config.path.clone()
        } else {
            format!("sqlite:{}", config.path)
        };

        let connect_options = SqliteConnectOptions::from_str(&url)
            .with_context(|| format!("invalid database path: {}", config.path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(connect_options)
            .await
            .context("failed to create session pool")?;

        let store = Self { pool };
        store.ensure_schema().await?;
        debug!(path = %config.path, "session store opened");
        Ok(store)
    }

    /// In-memory store for tests.
    ///
    /// # Errors
    ///
    /// Returns an error when the pool or schema cannot be created.
    pub async fn open_in_memory() -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory database url")?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .shared_cache(true);

        // One connection: each new in-memory connection is a fresh database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_options)
            .await
            .context("failed to create in-memory session pool")?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create sessions table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL REFERENCES sessions(id),
                role TEXT NOT NULL,
                agent TEXT,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create turns table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id)")
            .execute(&self.pool)
            .await
            .context("failed to create turns index")?;

        Ok(())
    }

    fn row_to_turn(row: TurnRow) -> Result<Turn> {
        let role = match row.role.as_str() {
            "user" => TurnRole::User,
            "agent" => TurnRole::Agent(row.agent.unwrap_or_default()),
            other => bail!("unknown turn role in store: {other}"),
        };
        let at = DateTime::parse_from_rfc3339(&row.created_at)
            .with_context(|| format!("invalid turn timestamp: {}", row.created_at))?
            .with_timezone(&Utc);

        Ok(Turn {
            role,
            text: row.text,
            at,
        })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, session_id: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO sessions (id, created_at) VALUES (?, ?)")
            .bind(session_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("failed to create session")?;
        Ok(())
    }

    async fn append_turns(&self, session_id: &str, turns: &[Turn]) -> Result<()> {
        if !self.exists(session_id).await? {
            bail!("unknown session: {session_id}");
        }

        // One transaction: either every turn of the step lands or none do.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;

        for turn in turns {
            let (role, agent) = match &turn.role {
                TurnRole::User => ("user", None),
                TurnRole::Agent(name) => ("agent", Some(name.as_str())),
            };
            sqlx::query(
                r#"
                INSERT INTO turns (session_id, role, agent, text, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(session_id)
            .bind(role)
            .bind(agent)
            .bind(&turn.text)
            .bind(turn.at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .context("failed to append turn")?;
        }

        tx.commit().await.context("failed to commit turns")?;
        Ok(())
    }

    async fn history(&self, session_id: &str) -> Result<Vec<Turn>> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            r#"
            SELECT role, agent, text, created_at
            FROM turns
            WHERE session_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load session history")?;

        rows.into_iter().map(Self::row_to_turn).collect()
    }

    async fn exists(&self, session_id: &str) -> Result<bool> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to check session")?;
        Ok(row.is_some())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TurnRow {
    role: String,
    agent: Option<String>,
    text: String,
    created_at: String,
}

fn ensure_database_directory(path: &str) -> Result<()> {
    let path = path
        .strip_prefix("sqlite://")
        .or_else(|| path.strip_prefix("sqlite:"))
        .unwrap_or(path);

    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store = SqliteSessionStore::open_in_memory().await.unwrap();
        store.create("s1").await.unwrap();
        store.create("s1").await.unwrap();
        assert!(store.exists("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_append_requires_session() {
        let store = SqliteSessionStore::open_in_memory().await.unwrap();
        let err = store
            .append_turns("missing", &[Turn::user("hello")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown session"));
    }

    #[tokio::test]
    async fn test_round_trip_preserves_roles_and_order() {
        let store = SqliteSessionStore::open_in_memory().await.unwrap();
        store.create("s1").await.unwrap();

        store
            .append_turns(
                "s1",
                &[
                    Turn::user("plan dinner on Friday"),
                    Turn::agent("planner", "Here is the plan."),
                    Turn::agent("reviewer", "Looks good."),
                ],
            )
            .await
            .unwrap();

        let history = store.history("s1").await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].speaker(), "user");
        assert_eq!(history[0].text, "plan dinner on Friday");
        assert_eq!(history[1].speaker(), "planner");
        assert_eq!(history[2].speaker(), "reviewer");
    }

    #[tokio::test]
    async fn test_history_empty_for_unknown_session() {
        let store = SqliteSessionStore::open_in_memory().await.unwrap();
        assert!(store.history("nope").await.unwrap().is_empty());
        assert!(!store.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SqliteSessionStore::open_in_memory().await.unwrap();
        store.create("a").await.unwrap();
        store.create("b").await.unwrap();

        store.append_turns("a", &[Turn::user("for a")]).await.unwrap();
        store.append_turns("b", &[Turn::user("for b")]).await.unwrap();

        let a = store.history("a").await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].text, "for a");
        assert_eq!(store.history("b").await.unwrap().len(), 1);
    }
}
