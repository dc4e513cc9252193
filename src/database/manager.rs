use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Schema bootstrap failed: {0}")]
    SchemaError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Idempotent DDL for the four collections. Array columns hold the ordered
/// child ids; `revision` backs optimistic concurrency.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        revision BIGINT NOT NULL DEFAULT 1
    )"#,
    r#"CREATE TABLE IF NOT EXISTS boards (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        owner_id UUID NOT NULL REFERENCES users(id),
        authorized_user_ids UUID[] NOT NULL DEFAULT '{}',
        list_ids UUID[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        revision BIGINT NOT NULL DEFAULT 1
    )"#,
    r#"CREATE TABLE IF NOT EXISTS lists (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        board_id UUID NOT NULL REFERENCES boards(id),
        card_ids UUID[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        revision BIGINT NOT NULL DEFAULT 1
    )"#,
    r#"CREATE TABLE IF NOT EXISTS cards (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        list_id UUID NOT NULL REFERENCES lists(id),
        assigned_to UUID REFERENCES users(id),
        movement_history JSONB NOT NULL DEFAULT '[]',
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        revision BIGINT NOT NULL DEFAULT 1
    )"#,
    "CREATE INDEX IF NOT EXISTS boards_owner_id_idx ON boards (owner_id)",
    "CREATE INDEX IF NOT EXISTS lists_board_id_idx ON lists (board_id)",
    "CREATE INDEX IF NOT EXISTS cards_list_id_idx ON cards (list_id)",
];

/// Connection pool construction and schema bootstrap for the Postgres store
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open a pool sized from config
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(max_connections = config.max_connections, "Created database pool");
        Ok(pool)
    }

    /// Create tables and indexes when missing
    pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(pool)
                .await
                .map_err(|e| DatabaseError::SchemaError(e.to_string()))?;
        }
        info!("Database schema ready");
        Ok(())
    }

    /// Close the pool on shutdown
    pub async fn close(pool: PgPool) {
        pool.close().await;
        info!("Closed database pool");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_config(url: Option<&str>) -> DatabaseConfig {
        DatabaseConfig {
            url: url.map(str::to_string),
            max_connections: 1,
            connection_timeout: 1,
        }
    }

    #[tokio::test]
    async fn connect_requires_url() {
        let err = DatabaseManager::connect(&db_config(None)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::ConfigMissing("DATABASE_URL")));
    }

    #[tokio::test]
    async fn connect_rejects_non_postgres_url() {
        let err = DatabaseManager::connect(&db_config(Some("mysql://localhost/kanban")))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidDatabaseUrl));
    }

    #[test]
    fn schema_creates_every_collection() {
        for table in ["users", "boards", "lists", "cards"] {
            let needle = format!("CREATE TABLE IF NOT EXISTS {} ", table);
            assert!(SCHEMA.iter().any(|s| s.starts_with(&needle)), "missing table {}", table);
        }
    }
}
