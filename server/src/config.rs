//! Server Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Default Slack OAuth bot scopes.
const DEFAULT_SCOPES: &str =
    "app_mentions:read,chat:write,reactions:write,channels:history,im:history";

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// Public base URL of this broker, used to build the OAuth redirect URI
    pub public_url: String,

    /// Base64 32-byte seed all broker keys are derived from
    pub broker_secret_key: String,

    /// Slack request signing secret
    pub slack_signing_secret: String,

    /// Slack OAuth client ID (optional)
    pub slack_client_id: Option<String>,

    /// Slack OAuth client secret (optional)
    pub slack_client_secret: Option<String>,

    /// Comma-separated bot scopes requested during installation
    pub slack_scopes: String,

    /// Slack Web API base URL
    pub slack_api_base: String,

    /// Slack OAuth authorization page
    pub slack_authorize_url: String,

    /// Redis connection URL (optional, in-memory store when absent)
    pub redis_url: Option<String>,

    /// Forwarding timeout in seconds (default: 10)
    pub forward_timeout_secs: u64,

    /// OAuth state lifetime in seconds (default: 600)
    pub oauth_state_ttl_secs: u64,

    /// Maximum accepted request body size in bytes (default: 1MB)
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            public_url: env::var("PUBLIC_URL")
                .context("PUBLIC_URL must be set")?
                .trim_end_matches('/')
                .to_string(),
            broker_secret_key: env::var("BROKER_SECRET_KEY")
                .context("BROKER_SECRET_KEY must be set")?,
            slack_signing_secret: env::var("SLACK_SIGNING_SECRET")
                .context("SLACK_SIGNING_SECRET must be set")?,
            slack_client_id: env::var("SLACK_CLIENT_ID").ok(),
            slack_client_secret: env::var("SLACK_CLIENT_SECRET").ok(),
            slack_scopes: env::var("SLACK_SCOPES").unwrap_or_else(|_| DEFAULT_SCOPES.into()),
            slack_api_base: env::var("SLACK_API_BASE")
                .unwrap_or_else(|_| "https://slack.com/api".into())
                .trim_end_matches('/')
                .to_string(),
            slack_authorize_url: env::var("SLACK_AUTHORIZE_URL")
                .unwrap_or_else(|_| "https://slack.com/oauth/v2/authorize".into()),
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            forward_timeout_secs: env::var("FORWARD_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            oauth_state_ttl_secs: env::var("OAUTH_STATE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600), // 10 minutes
            max_body_bytes: env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
        })
    }

    /// Check if the Slack OAuth install flow is configured.
    #[must_use]
    pub const fn has_oauth(&self) -> bool {
        self.slack_client_id.is_some() && self.slack_client_secret.is_some()
    }

    /// Redirect URI registered with Slack for the install flow.
    #[must_use]
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/slack/oauth/callback", self.public_url)
    }

    /// Create a default configuration for testing.
    ///
    /// Uses the in-memory store; no Redis or network access required.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".into(),
            public_url: "https://relay.test".into(),
            // 32 bytes of 0x2a
            broker_secret_key: "KioqKioqKioqKioqKioqKioqKioqKioqKioqKioqKio=".into(),
            slack_signing_secret: "test-signing-secret".into(),
            slack_client_id: Some("test-client-id".into()),
            slack_client_secret: Some("test-client-secret".into()),
            slack_scopes: DEFAULT_SCOPES.into(),
            slack_api_base: "http://127.0.0.1:9/api".into(),
            slack_authorize_url: "https://slack.com/oauth/v2/authorize".into(),
            redis_url: None,
            forward_timeout_secs: 2,
            oauth_state_ttl_secs: 600,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("public_url", &self.public_url)
            .field("slack_client_id", &self.slack_client_id)
            .field("slack_api_base", &self.slack_api_base)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "<set>"))
            .field("forward_timeout_secs", &self.forward_timeout_secs)
            .finish_non_exhaustive()
    }
}
