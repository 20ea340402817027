//! The Odds API client.
//!
//! API: `GET {base_url}/sports/{sport}/events?apiKey=...`
//! Returns `[{id, sport_key, commence_time, home_team, away_team}]`.
//! The events endpoint doesn't count against the request quota.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, info};

use super::OddsProvider;
use crate::config::OddsConfig;
use crate::types::ProviderEvent;

pub struct TheOddsApiClient {
    http: Client,
    base_url: String,
    sport: String,
    api_key: SecretString,
}

impl TheOddsApiClient {
    pub fn new(config: &OddsConfig, api_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Oraculo/0.1.0")
            .build()
            .context("Failed to build odds HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            sport: config.sport.clone(),
            api_key,
        })
    }

    fn events_url(&self) -> String {
        format!(
            "{}/sports/{}/events",
            self.base_url,
            urlencoding::encode(&self.sport)
        )
    }
}

#[async_trait]
impl OddsProvider for TheOddsApiClient {
    async fn fetch_events(&self) -> Result<Vec<ProviderEvent>> {
        let url = self.events_url();
        debug!(url = %url, sport = %self.sport, "Fetching events from The Odds API");

        let response = self
            .http
            .get(&url)
            .query(&[("apiKey", self.api_key.expose_secret().as_str())])
            .send()
            .await
            .context("Odds API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Odds API error {status}: {body}");
        }

        let events: Vec<ProviderEvent> = response
            .json()
            .await
            .context("Failed to parse Odds API response")?;

        info!(sport = %self.sport, count = events.len(), "Odds API snapshot fetched");
        Ok(events)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
