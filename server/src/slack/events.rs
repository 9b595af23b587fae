//! Events API Webhook
//!
//! `POST /slack/events`. Verifies Slack's signature, answers the
//! `url_verification` handshake and hands `event_callback` payloads to the
//! forwarder without waiting for delivery. Slack gets its 200 either way.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::signature::{self, RETRY_NUM_HEADER};
use crate::api::AppState;
use crate::relay::replay::now_secs;

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "error": message })),
    )
        .into_response()
}

/// Receive one Events API delivery.
///
/// POST /slack/events
#[tracing::instrument(skip_all)]
pub async fn events(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(e) = signature::verify(
        &state.config.slack_signing_secret,
        &headers,
        &body,
        now_secs(),
    ) {
        warn!(error = %e, "Rejected Slack webhook");
        return e.into_response();
    }

    let Ok(payload) = serde_json::from_slice::<Value>(&body) else {
        return bad_request("Body is not JSON");
    };

    match payload["type"].as_str() {
        Some("url_verification") => match payload["challenge"].as_str() {
            Some(challenge) => Json(json!({ "challenge": challenge })).into_response(),
            None => bad_request("Missing challenge"),
        },
        Some("event_callback") => {
            if let Some(retry) = headers.get(RETRY_NUM_HEADER) {
                debug!(retry = ?retry, "Ignoring Slack retry");
                return StatusCode::OK.into_response();
            }
            route_event(&state, payload).await;
            StatusCode::OK.into_response()
        }
        other => {
            debug!(event_type = ?other, "Ignoring Slack payload");
            StatusCode::OK.into_response()
        }
    }
}

/// Look up the workspace and spawn forwarding if it is active.
async fn route_event(state: &AppState, payload: Value) {
    let Some(team_id) = payload["team_id"].as_str() else {
        warn!("Event callback without team_id");
        return;
    };

    let record = match state.registry.get(team_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            debug!(workspace_id = %team_id, "Event for unknown workspace");
            return;
        }
        Err(e) => {
            error!(workspace_id = %team_id, error = %e, "Workspace lookup failed");
            return;
        }
    };

    if !record.is_active() {
        debug!(workspace_id = %team_id, "Event for inactive workspace");
        return;
    }

    info!(
        workspace_id = %team_id,
        event_type = payload["event"]["type"].as_str().unwrap_or("unknown"),
        "Forwarding event"
    );
    state.forwarder.spawn(payload, record);
}
