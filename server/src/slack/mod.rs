//! Slack Integration
//!
//! Events webhook, install flow and Web API client.

pub mod api;
pub mod events;
pub mod oauth;
pub mod signature;

use axum::routing::{get, post};
use axum::Router;

pub use api::{SlackApiError, SlackClient};

use crate::api::AppState;

/// Slack-facing routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(events::events))
        .route("/oauth/install", get(oauth::install))
        .route("/oauth/callback", get(oauth::callback))
}
