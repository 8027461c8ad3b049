use axum::{routing::get, Router};
use dotenvy::dotenv;
use std::sync::Arc;
use anyhow::Result;

mod advisory;
mod auth;
mod config;
mod error;
mod locator;
mod logging;
mod metrics;
mod models;
mod routes;
mod store;

use advisory::AdvisoryClient;
use config::Config;
use locator::ClinicLocator;
use routes::AppState;
use store::{MemoryStore, PgStore, RecordStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    logging::init();

    let config = Config::from_env()?;

    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url, config.max_connections).await?),
        None => {
            tracing::warn!("⚠️ DATABASE_URL not set, records will be kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let http = reqwest::Client::new();
    if config.advisory.api_key.is_none() {
        tracing::warn!("⚠️ GEMINI_API_KEY not set, wellness analysis is disabled");
    }

    let state = AppState {
        store,
        advisory: Arc::new(AdvisoryClient::new(http.clone(), config.advisory.clone())),
        locator: Arc::new(ClinicLocator::new(http, config.locator.clone())),
    };

    let app = Router::new()
        .merge(routes::api(state))
        .route("/health", get(|| async { "✅ Backend up" }));

    tracing::info!("🚀 Server running at {}", config.bind_addr);

    axum::serve(
        tokio::net::TcpListener::bind(config.bind_addr).await?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}
