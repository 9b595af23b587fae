//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use relay_crypto::BrokerKeys;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    relay::{self, Forwarder},
    slack::{self, SlackClient},
    store::KvStore,
    workspaces::WorkspaceRegistry,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Broker key material derived from `BROKER_SECRET_KEY`
    pub keys: Arc<BrokerKeys>,
    /// Backing key-value store
    pub store: Arc<dyn KvStore>,
    /// Workspace records
    pub registry: WorkspaceRegistry,
    /// Event forwarder
    pub forwarder: Forwarder,
    /// Slack Web API client
    pub slack: SlackClient,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: Config, store: Arc<dyn KvStore>) -> anyhow::Result<Self> {
        let keys = Arc::new(BrokerKeys::from_base64(&config.broker_secret_key)?);
        let registry = WorkspaceRegistry::new(store.clone(), &keys)?;
        let forwarder = Forwarder::new(
            keys.clone(),
            Duration::from_secs(config.forward_timeout_secs),
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.forward_timeout_secs))
            .build()?;
        let slack = SlackClient::new(http, config.slack_api_base.clone());

        Ok(Self {
            config: Arc::new(config),
            keys,
            store,
            registry,
            forwarder,
            slack,
        })
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    let api_routes = Router::new()
        .route(
            "/register",
            post(relay::register::register).delete(relay::register::unregister),
        )
        .route("/send", post(relay::send::send));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Server-facing API
        .nest("/api", api_routes)
        // Slack-facing webhook and install flow
        .nest("/slack", slack::router())
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_body_bytes))
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Storage backend in use
    store: &'static str,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store: state.store.backend_name(),
    })
}
