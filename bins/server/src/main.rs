//! Tally API Server
//!
//! Main entry point for the account balance service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_api::{AppState, create_router};
use tally_core::lock::{InMemoryLockBackend, LockBackend, LockManager, LockSettings};
use tally_db::{DatabaseLockBackend, connect};
use tally_shared::{AppConfig, LockBackendKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tally=debug,tower_http=debug".into());
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Connect to database
    let db = connect(&config.database).await?;
    info!("Connected to database");

    // Account locks
    let backend: Arc<dyn LockBackend> = match config.lock.backend {
        LockBackendKind::Database => Arc::new(DatabaseLockBackend::new(
            db.clone(),
            Duration::from_millis(config.lock.retry_interval_ms),
        )),
        LockBackendKind::Memory => {
            warn!("In-memory account locks only protect a single server instance");
            Arc::new(InMemoryLockBackend::new())
        }
    };
    let settings = LockSettings::from(&config.lock);
    info!(
        backend = ?config.lock.backend,
        wait_ms = config.lock.wait_ms,
        lease_ms = config.lock.lease_ms,
        fail_open = settings.fail_open,
        "Account locks configured"
    );

    // Create application state
    let state = AppState {
        db: Arc::new(db),
        locks: LockManager::new(backend, settings),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
