//! Shared types for the Oráculo service.
//!
//! These are the data contracts passed between the cache, the prediction
//! requester and the HTTP layer. Persisted rows map 1:1 onto the SQLite
//! tables created in `storage`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A scheduled match as persisted in the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    /// Provider-assigned identifier.
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    /// Scheduled start, always UTC.
    pub commence_time: DateTime<Utc>,
    /// When the refresh cycle that wrote this row ran.
    pub last_refreshed_at: DateTime<Utc>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} vs {} ({})",
            self.id,
            self.home_team,
            self.away_team,
            self.commence_time.format("%Y-%m-%d %H:%M UTC"),
        )
    }
}

impl Event {
    /// Helper to build a test event with sensible defaults.
    #[cfg(test)]
    pub fn sample(id: &str) -> Self {
        Event {
            id: id.to_string(),
            home_team: "Kansas City Chiefs".to_string(),
            away_team: "Baltimore Ravens".to_string(),
            commence_time: Utc::now() + chrono::Duration::days(3),
            last_refreshed_at: Utc::now(),
        }
    }
}

/// One event as returned by the odds provider, before it is stamped
/// with a refresh time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(deserialize_with = "deserialize_utc")]
    pub commence_time: DateTime<Utc>,
}

impl ProviderEvent {
    /// Stamp this snapshot entry with the refresh time it is persisted under.
    pub fn into_event(self, refreshed_at: DateTime<Utc>) -> Event {
        Event {
            id: self.id,
            home_team: self.home_team,
            away_team: self.away_team,
            commence_time: self.commence_time,
            last_refreshed_at: refreshed_at,
        }
    }
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// Accepts RFC 3339 with `Z` or a numeric offset. Offset-less values are
/// taken to already be UTC.
pub fn parse_utc(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc_err),
    }
}

fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc(&raw).map_err(serde::de::Error::custom)
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// Structured match prediction produced by the language model.
///
/// Every field is required: deserialising a tool-call payload that lacks
/// one of them fails, and the whole reply is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub summary: String,
    pub key_factors: Vec<KeyFactor>,
    pub prediction: MatchPrediction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFactor {
    pub factor: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPrediction {
    pub winner: String,
    /// 0.0–1.0
    pub confidence: f64,
    /// Formatted "N-N", home score first.
    pub final_score: String,
}

// ---------------------------------------------------------------------------
// Users and tokens
// ---------------------------------------------------------------------------

/// A registered user row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        UserPublic {
            id: user.id,
            email: user.email,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Request body for both registration and login.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Bearer token issued at login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

impl Token {
    pub fn bearer(access_token: String) -> Self {
        Token {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
