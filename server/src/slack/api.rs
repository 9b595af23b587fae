//! Slack Web API Client
//!
//! Thin wrapper over the handful of Web API methods the broker calls.
//! Tokens are passed per call and never stored on the client.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

/// Slack API errors.
#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("Slack request failed: {0}")]
    Transport(String),

    #[error("Slack returned HTTP {0}")]
    Status(u16),

    #[error("Slack returned an unreadable response")]
    InvalidResponse,

    /// `ok: false` with Slack's error code.
    #[error("Slack API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for SlackApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result of an `oauth.v2.access` exchange.
pub struct OAuthAccess {
    pub team_id: String,
    pub team_name: String,
    pub bot_token: Zeroizing<String>,
}

#[derive(Deserialize)]
struct OAuthAccessResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    team: Option<TeamInfo>,
}

#[derive(Deserialize)]
struct TeamInfo {
    id: String,
    #[serde(default)]
    name: String,
}

/// Slack Web API client.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
}

impl SlackClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// Call a bot-token method with a JSON body and return the parsed reply.
    #[instrument(skip(self, token, body))]
    pub async fn call(&self, method: &str, token: &str, body: &Value) -> Result<Value, SlackApiError> {
        let resp = self
            .http
            .post(self.method_url(method))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SlackApiError::Status(status.as_u16()));
        }

        let reply: Value = resp
            .json()
            .await
            .map_err(|_| SlackApiError::InvalidResponse)?;
        if reply["ok"].as_bool() != Some(true) {
            let code = reply["error"].as_str().unwrap_or("unknown_error");
            return Err(SlackApiError::Api(code.to_string()));
        }

        debug!("Slack call succeeded");
        Ok(reply)
    }

    /// Exchange an OAuth authorization code for a bot token.
    #[instrument(skip_all)]
    pub async fn oauth_access(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthAccess, SlackApiError> {
        let resp = self
            .http
            .post(self.method_url("oauth.v2.access"))
            .header("Accept", "application/json")
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SlackApiError::Status(status.as_u16()));
        }

        let body: OAuthAccessResponse = resp
            .json()
            .await
            .map_err(|_| SlackApiError::InvalidResponse)?;
        if !body.ok {
            return Err(SlackApiError::Api(
                body.error.unwrap_or_else(|| "unknown_error".into()),
            ));
        }

        let team = body.team.ok_or(SlackApiError::InvalidResponse)?;
        let bot_token = body.access_token.ok_or(SlackApiError::InvalidResponse)?;

        Ok(OAuthAccess {
            team_id: team.id,
            team_name: team.name,
            bot_token: Zeroizing::new(bot_token),
        })
    }
}
