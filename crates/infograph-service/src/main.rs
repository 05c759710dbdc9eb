//! Infograph Service - HTTP API for credits and payments.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use infograph_service::{create_router, AppState, ServiceConfig};
use infograph_store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,infograph=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Infograph Service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        database_configured = %config.database_url.is_some(),
        data_dir = ?config.data_dir,
        jwt_configured = %!config.auth_jwt_secret.is_empty(),
        "Service configuration loaded"
    );

    let store = open_store(&config).await?;

    let state = AppState::new(store, config.clone());
    tracing::info!(razorpay_configured = %state.has_razorpay(), "Provider state resolved");

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Pick the ledger backend: Postgres, then RocksDB, then in-memory.
async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    if let Some(url) = &config.database_url {
        tracing::info!("Connecting to Postgres store");
        return Ok(Arc::new(PgStore::connect(url).await?));
    }

    #[cfg(feature = "rocksdb-backend")]
    {
        if let Some(dir) = &config.data_dir {
            tracing::info!(path = %dir, "Opening RocksDB store");
            return Ok(Arc::new(infograph_store::RocksStore::open(dir)?));
        }
    }

    #[cfg(not(feature = "rocksdb-backend"))]
    {
        if config.data_dir.is_some() {
            tracing::warn!("DATA_DIR is set but the rocksdb-backend feature is disabled");
        }
    }

    tracing::warn!("No persistent store configured - balances will be lost on restart");
    Ok(Arc::new(MemoryStore::new()))
}
