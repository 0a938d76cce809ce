use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

mod api;
mod config;
mod db;
mod players;
mod predictor;

use api::AppState;
use config::Config;
use db::Database;
use players::{load_seed_file, PlayerDirectory};
use predictor::{HttpOracle, PredictionEngine, RemotePredictor};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open database
    let db = Arc::new(Database::open(&config.database_path)?);
    info!("Database opened: {}", config.database_path);

    let players = Arc::new(PlayerDirectory::new(db.clone()));
    if let Some(path) = &config.players_seed_path {
        let seed = load_seed_file(Path::new(path))?;
        let inserted = players.seed(&seed)?;
        info!(
            "Player directory seeded with {} of {} players from {}",
            inserted,
            seed.len(),
            path
        );
    }

    // Build scoring service client
    let oracle = HttpOracle::new(&config.ml_service_url, config.ml_service_timeout())?;
    let policy = config.retry_policy();
    info!(
        "ML service: {} (timeout {:?}, {} attempts, base delay {:?}, x{})",
        config.ml_service_url,
        config.ml_service_timeout(),
        policy.max_attempts,
        policy.base_delay,
        policy.multiplier
    );
    let remote = RemotePredictor::new(Arc::new(oracle), policy);
    let engine = Arc::new(PredictionEngine::new(remote, db));

    // Background health probe keeps the availability flag fresh between predictions
    if config.health_probe_interval_secs > 0 {
        let probe_engine = engine.clone();
        let period = Duration::from_secs(config.health_probe_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let up = probe_engine.check_remote_health().await;
                debug!("ML service health probe: available={}", up);
            }
        });
    }

    let app = api::router(AppState { engine, players });
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Prediction API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
