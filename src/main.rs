// Main entry point for the tracker server

use std::sync::Arc;

use anyhow::{Context, Result};
use cptracker::server::{router, AppState};
use cptracker::{Config, HttpTransport, ProfileFetcher, ProfileStore, ProgressHub};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present (development)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cptracker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Competitive Programming Tracker");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        data_file = %config.data_file.display(),
        max_bulk_jobs = config.scrape.max_bulk_jobs,
        "Configuration loaded"
    );

    let transport = Arc::new(HttpTransport::new()?);
    let fetcher = Arc::new(ProfileFetcher::new(transport, config.scrape.clone()));
    let store = Arc::new(ProfileStore::new(config.data_file.clone()));
    let hub = ProgressHub::new();

    let app = router(AppState::new(hub, fetcher, store));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
