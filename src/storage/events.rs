//! The event table.
//!
//! Rows are only ever written by [`EventStore::replace_all`], so every row
//! shares the `last_refreshed_at` of the refresh that wrote it.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::types::Event;

#[derive(Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// `last_refreshed_at` of the first row in insertion order, if any.
    pub async fn sentinel_refreshed_at(&self) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT last_refreshed_at FROM events ORDER BY rowid LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
    }

    /// All rows in insertion order.
    pub async fn list(&self) -> Result<Vec<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(
            "SELECT id, home_team, away_team, commence_time, last_refreshed_at \
             FROM events ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(
            "SELECT id, home_team, away_team, commence_time, last_refreshed_at \
             FROM events WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await
    }

    /// Wholesale-replace the table with `events` in one transaction.
    ///
    /// Nothing is visible to readers until commit; any failure rolls the
    /// delete back. Duplicate ids within a snapshot keep the first entry.
    pub async fn replace_all(&self, events: &[Event]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM events")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for event in events {
            sqlx::query(
                "INSERT OR IGNORE INTO events \
                 (id, home_team, away_team, commence_time, last_refreshed_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&event.id)
            .bind(&event.home_team)
            .bind(&event.away_team)
            .bind(event.commence_time)
            .bind(event.last_refreshed_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(deleted, inserted = events.len(), "Event table replaced");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
