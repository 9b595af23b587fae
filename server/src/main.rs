//! Sealed Relay Broker - Main Entry Point

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use relay_server::store::{KvStore, MemoryStore, RedisStore};
use relay_server::{api, config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Sealed Relay broker"
    );

    // Initialize storage
    let store: Arc<dyn KvStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisStore::connect(url).await?),
        None => {
            warn!("REDIS_URL not set, using in-memory store. Workspace records will not survive a restart.");
            Arc::new(MemoryStore::new())
        }
    };

    if !config.has_oauth() {
        warn!("SLACK_CLIENT_ID/SLACK_CLIENT_SECRET not set, install flow disabled");
    }

    // Build application state
    let state = api::AppState::new(config.clone(), store)?;
    info!(
        broker_pubkey = %state.keys.box_public_b64(),
        broker_signing_pubkey = %state.keys.signing_public_b64(),
        "Broker keys loaded"
    );

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
