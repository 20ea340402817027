//! Persistence layer.
//!
//! SQLite via `sqlx`. The schema is small enough to be created in place
//! at startup; there is no migration history to replay.

pub mod events;
pub mod users;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

pub use events::EventStore;
pub use users::UserStore;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS events (
        id                TEXT PRIMARY KEY NOT NULL,
        home_team         TEXT NOT NULL,
        away_team         TEXT NOT NULL,
        commence_time     TEXT NOT NULL,
        last_refreshed_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id              TEXT PRIMARY KEY NOT NULL,
        email           TEXT NOT NULL UNIQUE,
        hashed_password TEXT NOT NULL,
        is_active       BOOLEAN NOT NULL DEFAULT 1,
        created_at      TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_users_email ON users (email)",
];

/// Open a pool against `database_url`, creating the file if needed.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .context("Invalid database URL")?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    init_schema(&pool).await?;
    info!(max_connections, "Database ready");
    Ok(pool)
}

/// Single-connection in-memory database. Each connection to `:memory:`
/// is its own database, so the pool must never open a second one.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .context("Failed to open in-memory database")?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Create tables and indexes if they don't exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to create schema")?;
    }
    Ok(())
}
