//! GradeUp API entry point.
//!
//! Loads configuration, opens the store selected by `STORE_BACKEND` and
//! serves the REST API.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gradeup_api::api::ApiState;
use gradeup_api::config::{Config, StoreBackend};
use gradeup_api::gateway::HttpGateway;
use gradeup_api::store::{memory::MemoryStore, sqlite::SqliteStore, Store};
use gradeup_api::{db, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Sqlite => {
            let pool = db::init_pool(&config.database_url).await?;
            Arc::new(SqliteStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let gateway = Arc::new(HttpGateway::new(
        &config.payment_api_url,
        &config.payment_api_key,
        config.gateway_timeout_secs,
    )?);

    if config.api_token.is_none() {
        warn!("API_TOKEN is not set; /api routes are unauthenticated");
    }

    let state = Arc::new(ApiState::new(store, gateway, &config));
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
