//! Slack Install Flow
//!
//! `GET /slack/oauth/install` redirects to Slack's consent page with a
//! single-use state token. `GET /slack/oauth/callback` consumes that state,
//! exchanges the code for a bot token, records a pending workspace and shows
//! the installer a one-time registration code. Only the code's keyed hash is
//! stored.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::Utc;
use rand::RngCore;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use crate::api::AppState;
use crate::relay::is_valid_workspace_id;
use crate::workspaces::hash_auth_code;

const STATE_KEY_PREFIX: &str = "oauth_state:";

/// Install flow errors, rendered as HTML for the browser.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Slack installation is not configured on this relay.")]
    NotConfigured,

    #[error("The authorization response was incomplete.")]
    MissingParams,

    #[error("This installation link has expired or was already used. Please start again.")]
    InvalidState,

    #[error("Slack rejected the installation: {0}")]
    Exchange(String),

    #[error("Something went wrong on our side. Please try again.")]
    Internal(String),
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::MissingParams | Self::InvalidState => StatusCode::BAD_REQUEST,
            Self::Exchange(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(detail) => {
                error!(detail = %detail, "Install flow failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Html(page("Installation failed", &html_escape(&self.to_string())))).into_response()
    }
}

/// Stored between install and callback.
#[derive(Debug, Serialize, Deserialize)]
struct OAuthFlowState {
    created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn state_key(state_token: &str) -> String {
    format!(
        "{STATE_KEY_PREFIX}{}",
        hex::encode(Sha256::digest(state_token.as_bytes()))
    )
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Escape text for interpolation into HTML.
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// `body_html` must already be escaped.
fn page(title: &str, body_html: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>{title}</title></head>
<body style="font-family: sans-serif; max-width: 40em; margin: 3em auto;">
<h1>{title}</h1>
{body_html}
</body></html>"#,
    )
}

/// Start a Slack installation.
///
/// GET /slack/oauth/install
#[tracing::instrument(skip(state))]
pub async fn install(State(state): State<AppState>) -> Result<Response, OAuthError> {
    let client_id = state
        .config
        .slack_client_id
        .as_deref()
        .filter(|_| state.config.has_oauth())
        .ok_or(OAuthError::NotConfigured)?;

    let state_token = random_token();
    let flow = serde_json::to_string(&OAuthFlowState {
        created_at: Utc::now().timestamp(),
    })
    .map_err(|e| OAuthError::Internal(e.to_string()))?;

    state
        .store
        .put(
            &state_key(&state_token),
            &flow,
            Some(Duration::from_secs(state.config.oauth_state_ttl_secs)),
        )
        .await
        .map_err(|e| OAuthError::Internal(format!("Failed to store OAuth state: {e}")))?;

    let redirect_uri = state.config.oauth_redirect_uri();
    let authorize_url = Url::parse_with_params(
        &state.config.slack_authorize_url,
        &[
            ("client_id", client_id),
            ("scope", state.config.slack_scopes.as_str()),
            ("state", state_token.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
        ],
    )
    .map_err(|e| OAuthError::Internal(format!("Invalid authorize URL: {e}")))?;

    info!("Redirecting to Slack authorization");
    Ok(Redirect::temporary(authorize_url.as_str()).into_response())
}

/// Finish a Slack installation.
///
/// GET /slack/oauth/callback
#[tracing::instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, OAuthError> {
    if let Some(reason) = query.error.as_deref() {
        info!(reason = %reason, "Installation cancelled");
        let body = format!(
            "<p>The installation was not completed ({}). You can close this window.</p>",
            html_escape(reason)
        );
        return Ok(Html(page("Installation cancelled", &body)).into_response());
    }

    let (Some(client_id), Some(client_secret)) = (
        state.config.slack_client_id.as_deref(),
        state.config.slack_client_secret.as_deref(),
    ) else {
        return Err(OAuthError::NotConfigured);
    };
    let (Some(code), Some(state_token)) = (query.code.as_deref(), query.state.as_deref()) else {
        return Err(OAuthError::MissingParams);
    };

    // Single use: consumed before the code exchange.
    state
        .store
        .take(&state_key(state_token))
        .await
        .map_err(|e| OAuthError::Internal(format!("Failed to read OAuth state: {e}")))?
        .ok_or(OAuthError::InvalidState)?;

    let access = state
        .slack
        .oauth_access(client_id, client_secret, code, &state.config.oauth_redirect_uri())
        .await
        .map_err(|e| {
            warn!(error = %e, "Slack code exchange failed");
            OAuthError::Exchange(e.to_string())
        })?;

    if !is_valid_workspace_id(&access.team_id) {
        return Err(OAuthError::Exchange("unexpected team id".into()));
    }

    let registration_code = Zeroizing::new(random_token());
    let code_hash = hash_auth_code(&registration_code, state.keys.auth_code_key());

    state
        .registry
        .create_pending(&access.team_id, &access.team_name, &access.bot_token, &code_hash)
        .await
        .map_err(|e| OAuthError::Internal(e.to_string()))?;

    info!(workspace_id = %access.team_id, "Slack app installed");

    let body = format!(
        r#"<p>The relay is installed for <strong>{team}</strong> (<code>{team_id}</code>).</p>
<p>Give your server this one-time registration code. It is shown only once.</p>
<pre style="font-size: 1.2em; padding: 1em; background: #f4f4f4;">{code}</pre>
<p>Register with <code>POST {public_url}/api/register</code>.</p>"#,
        team = html_escape(&access.team_name),
        team_id = html_escape(&access.team_id),
        code = html_escape(&registration_code),
        public_url = html_escape(&state.config.public_url),
    );
    Ok(Html(page("Slack app installed", &body)).into_response())
}
