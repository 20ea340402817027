//! Service error taxonomy and its HTTP mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// The odds provider could not be reached or answered with an error.
    #[error("Odds provider unavailable: {0}")]
    OddsUnavailable(String),

    /// The language model could not be reached or answered with an error.
    #[error("Language model unavailable: {0}")]
    ModelUnavailable(String),

    /// A prediction could not be produced because an upstream call failed.
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    #[error("Malformed AI output: {0}")]
    MalformedAiOutput(String),

    #[error("Game not found: {0}")]
    NotFound(String),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// The request body could not be read as the expected JSON.
    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::OddsUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ModelUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::PredictionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MalformedAiOutput(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmailTaken => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Don't leak driver messages to clients.
        let detail = match &self {
            AppError::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        };

        let mut response = (status, Json(json!({ "detail": detail }))).into_response();

        if matches!(self, AppError::InvalidCredentials) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
