//! Odds provider integrations.
//!
//! Defines the `OddsProvider` trait consumed by the event cache and the
//! HTTP client for The Odds API.

pub mod the_odds_api;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::ProviderEvent;

/// Abstraction over the upstream source of scheduled events.
///
/// Implementors return the full current snapshot on every call. No
/// caching and no retries: failures propagate to the caller as-is.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OddsProvider: Send + Sync {
    /// Fetch every upcoming event the provider currently lists.
    async fn fetch_events(&self) -> Result<Vec<ProviderEvent>>;
}
