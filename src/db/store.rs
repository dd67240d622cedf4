use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;

const MEMORY_PATH: &str = ":memory:";

/// SQLite persistence for cached content snapshots and member sessions.
pub struct Store {
    pool: SqlitePool,
}

#[derive(Debug, Clone, FromRow)]
pub struct SnapshotRecord {
    pub key: String,
    pub payload: String,
    pub fetched_at: String,
}

impl SnapshotRecord {
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.fetched_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub email: Option<String>,
    pub created_at: Option<String>,
}

impl Store {
    pub async fn new(database_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{database_path}"))
            .context("Invalid database path")?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // Every in-memory connection is its own database.
        let max_connections = if database_path == MEMORY_PATH { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        let migration_sql = include_str!("../../migrations/001_init.sql");
        // Execute each statement separately (sqlx doesn't support multiple statements in one call)
        for statement in migration_sql.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .with_context(|| format!("Failed to execute migration: {trimmed}"))?;
            }
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // --- Snapshot operations ---

    pub async fn put_snapshot(&self, key: &str, payload: &str, fetched_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT INTO snapshots (key, payload, fetched_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, fetched_at = excluded.fetched_at",
        )
        .bind(key)
        .bind(payload)
        .bind(fetched_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to store snapshot {key}"))?;
        Ok(())
    }

    pub async fn get_snapshot(&self, key: &str) -> Result<Option<SnapshotRecord>> {
        let snapshot =
            sqlx::query_as::<_, SnapshotRecord>("SELECT key, payload, fetched_at FROM snapshots WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Failed to fetch snapshot {key}"))?;
        Ok(snapshot)
    }

    // --- Session operations ---

    pub async fn insert_session(&self, session: &SessionRecord) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO sessions (token, user_id, username, email) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(&session.username)
        .bind(&session.email)
        .execute(&self.pool)
        .await
        .context("Failed to insert session")?;
        Ok(())
    }

    /// Returns whether a session was removed.
    pub async fn delete_session(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .context("Failed to delete session")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_all_sessions(&self) -> Result<Vec<SessionRecord>> {
        let sessions = sqlx::query_as::<_, SessionRecord>("SELECT * FROM sessions ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch sessions")?;
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str) -> SessionRecord {
        SessionRecord {
            token: token.to_string(),
            user_id: 7,
            username: "punter".to_string(),
            email: Some("punter@example.com".to_string()),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_store_create_and_migrate() {
        let store = Store::new(":memory:").await.expect("should create store");
        assert!(store.get_snapshot("adverts").await.unwrap().is_none());
        assert!(store.get_all_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_upsert() {
        let store = Store::new(":memory:").await.expect("should create store");
        let first = Utc::now();
        store.put_snapshot("bonuses", "[]", first).await.unwrap();
        store.put_snapshot("bonuses", "[{\"id\":1}]", first).await.unwrap();

        let snapshot = store.get_snapshot("bonuses").await.unwrap().expect("snapshot stored");
        assert_eq!(snapshot.payload, "[{\"id\":1}]");
        assert_eq!(snapshot.fetched_at().map(|t| t.timestamp()), Some(first.timestamp()));
    }

    #[tokio::test]
    async fn test_session_insert_and_delete() {
        let store = Store::new(":memory:").await.expect("should create store");
        store.insert_session(&session("tok-a")).await.unwrap();
        store.insert_session(&session("tok-b")).await.unwrap();

        let sessions = store.get_all_sessions().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].created_at.is_some());

        assert!(store.delete_session("tok-a").await.unwrap());
        assert!(!store.delete_session("tok-a").await.unwrap());
        assert_eq!(store.get_all_sessions().await.unwrap().len(), 1);
    }
}
