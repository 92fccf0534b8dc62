//! BloodLink Server: blood request notification and donor matching.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use bloodlink_api::{AppState, build_router};
use bloodlink_core::config::{AppConfig, DatabaseProvider};
use bloodlink_core::error::AppError;
use bloodlink_core::traits::{RealtimeChannel, SmsProvider, SystemClock};
use bloodlink_database::{DatabasePool, Repositories};
use bloodlink_dispatch::build_sms_provider;
use bloodlink_realtime::heartbeat::spawn_heartbeat;
use bloodlink_realtime::{RemoteLink, RoomHub};
use bloodlink_service::{EngineParts, MatchingEngine};

/// How often expired codes and idle rate-limit windows are swept.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    let env = std::env::var("BLOODLINK_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        "Starting BloodLink"
    );

    // ── Step 1: Storage ──────────────────────────────────────────
    let (repositories, db) = match config.database.provider {
        DatabaseProvider::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            (Repositories::in_memory(), None)
        }
        DatabaseProvider::Postgres => {
            let db = DatabasePool::connect(&config.database).await?;
            bloodlink_database::migration::run_migrations(db.pool()).await?;
            (Repositories::postgres(&db), Some(db))
        }
    };

    // ── Step 2: Providers ────────────────────────────────────────
    let sms = build_sms_provider(
        &config.sms,
        config.environment,
        config.dispatch.call_timeout(),
    )?;
    tracing::info!(provider = sms.name(), "SMS provider ready");

    let (realtime, hub): (Arc<dyn RealtimeChannel>, Option<Arc<RoomHub>>) =
        match &config.realtime.remote {
            Some(remote) => {
                tracing::info!(url = %remote.url, "Forwarding realtime events to remote gateway");
                let link: Arc<dyn RealtimeChannel> = Arc::new(RemoteLink::new(remote));
                (link, None)
            }
            None => {
                let hub = Arc::new(RoomHub::new(config.realtime.clone()));
                let channel: Arc<dyn RealtimeChannel> = hub.clone();
                (channel, Some(hub))
            }
        };

    // ── Step 3: Engine and background tasks ──────────────────────
    let engine = MatchingEngine::new(EngineParts {
        config: config.clone(),
        repositories,
        sms,
        realtime,
        clock: Arc::new(SystemClock),
    });

    let maintenance = engine.spawn_maintenance(MAINTENANCE_INTERVAL);
    let heartbeat = hub.clone().map(|hub| {
        let interval = Duration::from_secs(config.realtime.ping_interval_seconds);
        spawn_heartbeat(hub, interval)
    });

    // ── Step 4: HTTP server ──────────────────────────────────────
    let addr = config.server.bind_address();
    let app = build_router(AppState::new(config, engine, hub));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(address = %addr, "BloodLink server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    maintenance.abort();
    if let Some(heartbeat) = heartbeat {
        heartbeat.abort();
    }
    if let Some(db) = db {
        db.close().await;
    }
    tracing::info!("BloodLink server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
