//! End-to-end flows through the HTTP router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use oraculo::llm::LlmReply;
use oraculo::types::parse_utc;

use crate::fakes::{harness, nfl_slate, prediction_call, valid_prediction};

// -- Liveness ----------------------------------------------------------------

#[tokio::test]
async fn test_root_welcome() {
    let h = harness().await;
    let (status, _, body) = h.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Oráculo"));
}

#[tokio::test]
async fn test_health() {
    let h = harness().await;
    let (status, _, _) = h.get("/health").await;
    assert_eq!(status, StatusCode::OK);
}

// -- Games -------------------------------------------------------------------

#[tokio::test]
async fn test_games_empty_store_fetches_once_then_serves_cache() {
    let h = harness().await;

    let (status, _, first) = h.get("/games").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first.as_array().unwrap().len(), 3);
    assert_eq!(h.odds.calls(), 1);
    assert_eq!(h.store.count().await.unwrap(), 3);

    let (status, _, second) = h.get("/games").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, first);
    assert_eq!(h.odds.calls(), 1);
}

#[tokio::test]
async fn test_games_share_one_refresh_timestamp() {
    let h = harness().await;
    let (_, _, body) = h.get("/games").await;

    let stamps: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["last_refreshed_at"].as_str().unwrap())
        .collect();
    assert!(stamps.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_games_stale_store_is_replaced() {
    let h = harness().await;
    h.seed(nfl_slate(), Duration::minutes(90)).await;

    let mut latest = nfl_slate();
    latest.truncate(1);
    h.odds.set_events(latest);

    let (status, _, body) = h.get("/games").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.odds.calls(), 1);

    let games = body.as_array().unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0]["id"], "kc-bal");
    assert_eq!(h.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_games_fresh_store_makes_no_provider_call() {
    let h = harness().await;
    h.seed(nfl_slate(), Duration::minutes(10)).await;

    let (status, _, body) = h.get("/games").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert_eq!(h.odds.calls(), 0);
}

#[tokio::test]
async fn test_games_commence_time_is_utc() {
    let h = harness().await;
    let (_, _, body) = h.get("/games").await;

    let kc = body
        .as_array()
        .unwrap()
        .iter()
        .find(|g| g["id"] == "kc-bal")
        .unwrap();
    let served: DateTime<Utc> = kc["commence_time"].as_str().unwrap().parse().unwrap();
    assert_eq!(served, parse_utc("2024-09-10T00:20:00Z").unwrap());
}

#[tokio::test]
async fn test_games_provider_failure_is_503() {
    let h = harness().await;
    h.odds.set_error("connection refused");

    let (status, _, body) = h.get("/games").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_games_provider_failure_keeps_stale_rows() {
    let h = harness().await;
    h.seed(nfl_slate(), Duration::hours(2)).await;
    h.odds.set_error("HTTP 502");

    let (status, _, _) = h.get("/games").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(h.store.count().await.unwrap(), 3);
}

// -- Predictions ---------------------------------------------------------------

#[tokio::test]
async fn test_predict_unknown_id_refreshes_once_then_404() {
    let h = harness().await;

    let (status, _, body) = h.get("/predict/unknown-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("unknown-id"));
    assert_eq!(h.odds.calls(), 1);
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn test_predict_cached_game() {
    let h = harness().await;
    h.seed(nfl_slate(), Duration::minutes(5)).await;

    let (status, _, body) = h.get("/predict/kc-bal").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, valid_prediction());
    assert_eq!(h.odds.calls(), 0);
    assert_eq!(h.llm.calls(), 1);

    let prompt = h.llm.last_prompt().unwrap();
    assert!(prompt.contains("Kansas City Chiefs"));
    assert!(prompt.contains("Baltimore Ravens"));
    assert!(prompt.contains(&Utc::now().format("%Y").to_string()));
}

#[tokio::test]
async fn test_predict_fetches_missing_game() {
    let h = harness().await;

    let (status, _, body) = h.get("/predict/phi-gb").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"]["final_score"], "27-20");
    assert_eq!(h.odds.calls(), 1);
}

#[tokio::test]
async fn test_predict_missing_prediction_field_is_500() {
    let h = harness().await;
    let mut partial = valid_prediction();
    partial.as_object_mut().unwrap().remove("prediction");
    h.llm.set_reply(prediction_call(partial));

    let (status, _, body) = h.get("/predict/kc-bal").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("Malformed AI output"));
    assert_eq!(h.llm.calls(), 1);
}

#[tokio::test]
async fn test_predict_free_text_is_500() {
    let h = harness().await;
    h.llm.set_reply(LlmReply::Text("The Chiefs will win 27-20.".into()));

    let (status, _, _) = h.get("/predict/kc-bal").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_predict_provider_failure_is_500() {
    let h = harness().await;
    h.odds.set_error("provider down");

    let (status, _, _) = h.get("/predict/kc-bal").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(h.llm.calls(), 0);
}

// -- Auth --------------------------------------------------------------------

#[tokio::test]
async fn test_register_twice() {
    let h = harness().await;
    let creds = json!({ "email": "a@b.com", "password": "hunter2" });

    let (status, _, body) = h.post_json("/auth/register", creds.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@b.com");
    assert_eq!(body["is_active"], true);
    assert!(body.get("hashed_password").is_none());
    assert!(body.get("password").is_none());

    let (status, _, body) = h.post_json("/auth/register", creds).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already registered");
}

#[tokio::test]
async fn test_register_incomplete_body_is_422_with_detail() {
    let h = harness().await;
    let (status, headers, body) = h
        .post_json("/auth/register", json!({ "email": "a@b.com" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
    assert!(body["detail"].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn test_login_unparseable_body_is_422_with_detail() {
    let h = harness().await;
    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _, body) = h.send(request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_login_success() {
    let h = harness().await;
    let creds = json!({ "email": "a@b.com", "password": "hunter2" });
    h.post_json("/auth/register", creds.clone()).await;

    let (status, _, body) = h.post_json("/auth/login", creds).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["access_token"].as_str().unwrap().split('.').count(), 3);
}

#[tokio::test]
async fn test_login_wrong_password_is_401_with_challenge() {
    let h = harness().await;
    h.post_json("/auth/register", json!({ "email": "a@b.com", "password": "hunter2" }))
        .await;

    let (status, headers, _) = h
        .post_json("/auth/login", json!({ "email": "a@b.com", "password": "nope" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
}

// -- CORS --------------------------------------------------------------------

#[tokio::test]
async fn test_cors_preflight_for_allowed_origin() {
    let h = harness().await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/games")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();

    let (status, headers, _) = h.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
}

#[tokio::test]
async fn test_cors_unknown_origin_gets_no_allow_header() {
    let h = harness().await;
    let request = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();

    let (_, headers, _) = h.send(request).await;
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
