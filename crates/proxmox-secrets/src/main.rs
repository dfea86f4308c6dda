//! Proxmox Secrets Broker Server
//!
//! An async Rust server that issues short-lived Proxmox VE API tokens and
//! revokes them when their leases end.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proxmox_secrets::{
    config::{AppConfig, DatabaseConfig, StorageKind},
    crypto::Encryptor,
    db::create_pool,
    routes::build_router,
    services::LeaseManager,
    state::AppState,
    storage::{InmemStorage, PgStorage, SealedStorage, Storage},
    ResultExt,
};

/// Initialize tracing/logging.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,proxmox_secrets=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Open the configured storage, sealed when a seal key is set.
async fn open_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.storage {
        StorageKind::Memory => {
            tracing::warn!("Using in-memory storage, records are lost on restart");
            Arc::new(InmemStorage::new())
        }
        StorageKind::Postgres => {
            let db_config = DatabaseConfig::from_env().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load database config, using defaults");
                DatabaseConfig::default()
            });
            let schema = db_config
                .validated_schema()
                .with_context(|| format!("invalid POSTGRES_SCHEMA '{}'", db_config.schema))?
                .to_string();
            let pool = create_pool(&db_config).await?;
            Arc::new(PgStorage::connect(pool, &schema).await?)
        }
    };

    match config.seal_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            let encryptor = Encryptor::from_base64(key).context("invalid seal key")?;
            tracing::info!("Sealing connection profile and roles at rest");
            Ok(Arc::new(SealedStorage::new(storage, encryptor)))
        }
        None => Ok(storage),
    }
}

/// Revoke expired leases every `config.sweep_interval()`.
fn spawn_lease_sweeper(leases: Arc<LeaseManager>, config: &AppConfig) {
    let period = config.sweep_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let _ = leases.revoke_expired().await.log("sweeping expired leases");
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let (app_config, config_error) = match AppConfig::from_env() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    init_tracing(app_config.log_json);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Proxmox secrets broker"
    );

    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Failed to load app config, using defaults");
    }

    tracing::info!(
        host = %app_config.host,
        port = app_config.port,
        mount = %app_config.mount_path(),
        storage = ?app_config.storage,
        default_lease_ttl = app_config.default_lease_ttl,
        max_lease_ttl = app_config.max_lease_ttl,
        "Configuration loaded"
    );

    let storage = open_storage(&app_config).await?;
    let state = AppState::new(storage, app_config.clone());

    spawn_lease_sweeper(state.leases.clone(), &app_config);

    let app = build_router(state);

    // Bind to address
    let addr: SocketAddr = app_config.bind_address().parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Server listening");

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
