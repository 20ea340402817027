//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ServiceState>`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::auth::AuthService;
use crate::engine::{EventCache, Predictor};
use crate::error::{AppError, Result};
use crate::types::{Credentials, Event, PredictionResult, Token, UserPublic};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Components shared by all route handlers.
pub struct ServiceState {
    pub cache: EventCache,
    pub predictor: Predictor,
    pub auth: AuthService,
}

pub type AppState = Arc<ServiceState>;

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Bienvenido al motor de El Oráculo IA." }))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /games
pub async fn list_games(State(state): State<AppState>) -> Result<Json<Vec<Event>>> {
    let events = state.cache.get_events().await?;
    Ok(Json(events))
}

/// GET /predict/:game_id
pub async fn predict_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<PredictionResult>> {
    let event = state
        .cache
        .get_event_by_id(&game_id)
        .await
        .map_err(|e| match e {
            // On this route a failed fallback refresh is a failed prediction.
            AppError::OddsUnavailable(msg) => AppError::PredictionFailed(msg),
            other => other,
        })?;

    info!(game_id = %event.id, home = %event.home_team, away = %event.away_team, "Predicting game");
    let prediction = state.predictor.predict(&event).await?;
    Ok(Json(prediction))
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<UserPublic>> {
    let Json(credentials) = payload?;
    Ok(Json(state.auth.register(credentials).await?))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Token>> {
    let Json(credentials) = payload?;
    Ok(Json(state.auth.login(credentials).await?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
