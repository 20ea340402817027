//! Time-bounded event cache.
//!
//! Serves the persisted event table while it is fresh and otherwise
//! replaces it wholesale with the provider's current snapshot. Freshness
//! is decided by a single sentinel row: all rows come from the same
//! refresh, so the first one speaks for the whole table.
//!
//! Refreshes are not serialized. Two stale reads racing each other both
//! hit the provider; each replace runs in its own transaction, so the
//! last commit wins and readers always see one complete snapshot.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::odds::OddsProvider;
use crate::storage::EventStore;
use crate::types::Event;

/// How long a refresh stays valid.
pub const FRESHNESS_WINDOW_MINS: i64 = 60;

pub fn freshness_window() -> Duration {
    Duration::minutes(FRESHNESS_WINDOW_MINS)
}

/// Whether a table refreshed at `refreshed_at` may still be served at `now`.
pub fn is_fresh(refreshed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - refreshed_at < freshness_window()
}

#[derive(Clone)]
pub struct EventCache {
    store: EventStore,
    provider: Arc<dyn OddsProvider>,
}

impl EventCache {
    pub fn new(store: EventStore, provider: Arc<dyn OddsProvider>) -> Self {
        Self { store, provider }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// All events, refreshing first if the table is empty or stale.
    pub async fn get_events(&self) -> Result<Vec<Event>> {
        self.get_events_at(Utc::now()).await
    }

    pub async fn get_events_at(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        match self.store.sentinel_refreshed_at().await? {
            Some(refreshed_at) if is_fresh(refreshed_at, now) => {
                let events = self.store.list().await?;
                debug!(count = events.len(), %refreshed_at, "Serving events from cache");
                return Ok(events);
            }
            Some(refreshed_at) => {
                info!(
                    age_mins = (now - refreshed_at).num_minutes(),
                    "Event cache stale, refreshing"
                );
            }
            None => info!("Event cache empty, refreshing"),
        }

        self.refresh_at(now).await
    }

    /// Look up one event. A miss triggers exactly one refresh before
    /// giving up with `NotFound`.
    pub async fn get_event_by_id(&self, id: &str) -> Result<Event> {
        if let Some(event) = self.store.get(id).await? {
            return Ok(event);
        }

        info!(game_id = %id, "Game not cached, refreshing once");
        self.refresh_at(Utc::now()).await?;

        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    /// Fetch the provider snapshot and replace the table with it.
    ///
    /// The table is untouched unless the fetch succeeded and the whole
    /// snapshot was written.
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let snapshot = self.provider.fetch_events().await.map_err(|e| {
            warn!(error = %e, "Odds provider fetch failed, keeping existing events");
            AppError::OddsUnavailable(format!("{e:#}"))
        })?;

        let events: Vec<Event> = snapshot.into_iter().map(|p| p.into_event(now)).collect();
        self.store.replace_all(&events).await?;

        let stored = self.store.list().await?;
        info!(fetched = events.len(), stored = stored.len(), "Event cache refreshed");
        Ok(stored)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
