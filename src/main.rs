//! El Oráculo IA: entry point.
//!
//! Loads configuration, initialises structured logging, opens the
//! database, wires the odds provider and language model into the
//! services, and serves the HTTP API until Ctrl+C.

use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::info;

use oraculo::api::{self, ServiceState};
use oraculo::auth::AuthService;
use oraculo::config::AppConfig;
use oraculo::engine::{EventCache, Predictor};
use oraculo::llm;
use oraculo::odds::the_odds_api::TheOddsApiClient;
use oraculo::storage::{self, EventStore, UserStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path = std::env::var("ORACULO_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = AppConfig::load_or_default(&config_path)?;
    let secrets = cfg.resolve_secrets()?;

    info!(
        sport = %cfg.odds.sport,
        llm_provider = %cfg.llm.provider,
        origins = ?cfg.cors.allowed_origins,
        "Oráculo starting up"
    );

    // -- Initialise components -------------------------------------------

    let pool = storage::connect(
        secrets.database_url.expose_secret(),
        cfg.database.max_connections,
    )
    .await?;

    let odds = TheOddsApiClient::new(&cfg.odds, secrets.odds_api_key.clone())?;
    let llm_client = llm::build_client(&cfg.llm, secrets.llm_api_key.clone())?;

    let state = Arc::new(ServiceState {
        cache: EventCache::new(EventStore::new(pool.clone()), Arc::new(odds)),
        predictor: Predictor::new(llm_client),
        auth: AuthService::new(UserStore::new(pool.clone()), &cfg.auth, secrets.secret_key.clone()),
    });

    let router = api::build_router(state, api::cors_layer(&cfg.cors)?);

    // -- Serve -----------------------------------------------------------

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "Listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
        })
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Oráculo shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("oraculo=info,tower_http=info"));

    let json_logging = std::env::var("ORACULO_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
