//! APD Sensors Daemon
//!
//! Serves sensor readings over an authenticated JSON API and optionally
//! records them for later historical queries.

mod config;
mod state;
mod store;
mod web;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use apd_sensors::{HistoryStore, SensorRegistry};
use config::Config;
use state::AppState;
use store::SqliteStore;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load configuration
    let config_path = std::env::args().nth(1);
    let mut config = match config_path.as_deref() {
        Some(path) => {
            let config = Config::load(path).context("Failed to load configuration")?;
            info!("Loaded configuration from: {}", path);
            config
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            let config =
                Config::load(DEFAULT_CONFIG_PATH).context("Failed to load configuration")?;
            info!("Loaded configuration from: {}", DEFAULT_CONFIG_PATH);
            config
        }
        None => {
            info!("No configuration file, using defaults and environment");
            Config::default()
        }
    };
    config.apply_env(std::env::vars());

    // Open history storage
    let history: Option<Arc<dyn HistoryStore>> = if config.history.enable {
        let store = SqliteStore::open(&config.history.database)?;
        Some(Arc::new(store))
    } else {
        None
    };

    // Initialize application state
    let state = Arc::new(AppState::new(&config, SensorRegistry::builtin(), history)?);

    // Start collection loop
    let interval = config.history.collect_interval;
    if state.has_history() && interval > 0 {
        let collect_state = state.clone();
        tokio::spawn(async move {
            collect_loop(collect_state, Duration::from_secs(interval)).await;
        });
    }

    // Setup Unix signal handlers
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    let app = web::create_router(state.clone());
    let addr: SocketAddr = config.listen.parse().context("Invalid listen address")?;
    let listener = TcpListener::bind(addr).await?;
    info!("Web server listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
        }
    }

    Ok(())
}

/// Polls every sensor on a fixed interval and stores the readings.
async fn collect_loop(state: Arc<AppState>, interval: Duration) {
    let mut consecutive_errors: u32 = 0;
    let mut last_error_log = Instant::now();

    loop {
        tokio::time::sleep(interval).await;

        let task_state = state.clone();
        let result = tokio::task::spawn_blocking(move || {
            let collection = task_state.collect(None);
            task_state.record(&collection)
        })
        .await;

        let error = match result {
            Ok(Ok(stored)) => {
                debug!("Stored {} readings", stored);
                consecutive_errors = 0;
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };

        consecutive_errors += 1;
        // Only log errors once per minute or on first error
        let elapsed = last_error_log.elapsed();
        if consecutive_errors == 1 || elapsed >= Duration::from_secs(60) {
            if consecutive_errors > 1 {
                warn!(
                    "Collection error (repeated {} times in {:?}): {}",
                    consecutive_errors, elapsed, error
                );
            } else {
                warn!("Collection error: {}", error);
            }
            last_error_log = Instant::now();
            consecutive_errors = 0;
        }
    }
}
