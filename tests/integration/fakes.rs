//! Fake upstreams for integration testing.
//!
//! Deterministic `OddsProvider` and `LlmClient` implementations that
//! record how often they were called. All state is in-memory and fully
//! controllable from test code.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use oraculo::api::{self, ServiceState};
use oraculo::auth::AuthService;
use oraculo::config::{AuthConfig, CorsConfig};
use oraculo::engine::{predictor::PREDICTION_TOOL, EventCache, Predictor};
use oraculo::llm::{LlmClient, LlmReply, ToolSpec};
use oraculo::odds::OddsProvider;
use oraculo::storage::{self, EventStore, UserStore};
use oraculo::types::{parse_utc, ProviderEvent};

// ---------------------------------------------------------------------------
// Odds provider
// ---------------------------------------------------------------------------

pub struct FakeOdds {
    events: Mutex<Vec<ProviderEvent>>,
    calls: AtomicUsize,
    /// If set, every fetch fails with this message.
    force_error: Mutex<Option<String>>,
}

impl FakeOdds {
    pub fn with_events(events: Vec<ProviderEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            calls: AtomicUsize::new(0),
            force_error: Mutex::new(None),
        }
    }

    pub fn set_events(&self, events: Vec<ProviderEvent>) {
        *self.events.lock().unwrap() = events;
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OddsProvider for FakeOdds {
    async fn fetch_events(&self) -> Result<Vec<ProviderEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self.events.lock().unwrap().clone())
    }
}

/// A small NFL slate with known ids.
pub fn nfl_slate() -> Vec<ProviderEvent> {
    let kickoff = |s: &str| parse_utc(s).unwrap();
    vec![
        ProviderEvent {
            id: "kc-bal".into(),
            home_team: "Kansas City Chiefs".into(),
            away_team: "Baltimore Ravens".into(),
            commence_time: kickoff("2024-09-10T00:20:00Z"),
        },
        ProviderEvent {
            id: "phi-gb".into(),
            home_team: "Philadelphia Eagles".into(),
            away_team: "Green Bay Packers".into(),
            commence_time: kickoff("2024-09-07T00:15:00Z"),
        },
        ProviderEvent {
            id: "atl-pit".into(),
            home_team: "Atlanta Falcons".into(),
            away_team: "Pittsburgh Steelers".into(),
            commence_time: kickoff("2024-09-08T17:00:00Z"),
        },
    ]
}

// ---------------------------------------------------------------------------
// Language model
// ---------------------------------------------------------------------------

pub struct FakeLlm {
    reply: Mutex<LlmReply>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl FakeLlm {
    pub fn replying(reply: LlmReply) -> Self {
        Self {
            reply: Mutex::new(reply),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn set_reply(&self, reply: LlmReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn generate_structured(
        &self,
        _system: &str,
        prompt: &str,
        _tool: &ToolSpec,
    ) -> Result<LlmReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        Ok(self.reply.lock().unwrap().clone())
    }
}

pub fn valid_prediction() -> Value {
    json!({
        "summary": "Kansas City's home record gives them a slight edge.",
        "key_factors": [
            { "factor": "Home field", "reasoning": "Chiefs rarely lose openers at home." },
            { "factor": "Rushing attack", "reasoning": "Ravens lead the league in rushing." },
            { "factor": "Turnovers", "reasoning": "Kansas City protects the ball well." }
        ],
        "prediction": {
            "winner": "Kansas City Chiefs",
            "confidence": 0.6,
            "final_score": "27-20"
        }
    })
}

pub fn prediction_call(arguments: Value) -> LlmReply {
    LlmReply::ToolCall { name: PREDICTION_TOOL.to_string(), arguments }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub router: Router,
    pub odds: Arc<FakeOdds>,
    pub llm: Arc<FakeLlm>,
    pub store: EventStore,
}

pub async fn harness() -> Harness {
    let pool = storage::connect_in_memory().await.unwrap();
    let odds = Arc::new(FakeOdds::with_events(nfl_slate()));
    let llm = Arc::new(FakeLlm::replying(prediction_call(valid_prediction())));
    let store = EventStore::new(pool.clone());

    let auth_config = AuthConfig { bcrypt_cost: 4, ..AuthConfig::default() };
    let state = Arc::new(ServiceState {
        cache: EventCache::new(store.clone(), odds.clone()),
        predictor: Predictor::new(llm.clone()),
        auth: AuthService::new(
            UserStore::new(pool),
            &auth_config,
            SecretString::new("integration-secret".into()),
        ),
    });

    let cors = api::cors_layer(&CorsConfig {
        allowed_origins: vec!["http://localhost:3000".into()],
    })
    .unwrap();

    Harness {
        router: api::build_router(state, cors),
        odds,
        llm,
        store,
    }
}

impl Harness {
    /// Seed the table as if a refresh had run `age` ago.
    pub async fn seed(&self, events: Vec<ProviderEvent>, age: Duration) {
        let refreshed_at = Utc::now() - age;
        let rows: Vec<_> = events.into_iter().map(|e| e.into_event(refreshed_at)).collect();
        self.store.replace_all(&rows).await.unwrap();
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let resp = self.router.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, headers, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, HeaderMap, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}
