//! Event Forwarding
//!
//! Seals one Slack event to a workspace's server, signs the envelope and
//! POSTs it. Delivery is at-most-once: a timeout, a non-2xx answer or a
//! transport error drops the event. Nothing is queued or retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_common::{Envelope, SIGNATURE_HEADER, TIMESTAMP_HEADER, WORKSPACE_HEADER};
use relay_crypto::{canonical, encoding, sealed, types::BoxPublicKey, BrokerKeys};
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use super::replay::now_secs;
use super::ssrf::{self, PinnedTarget, SsrfError};
use crate::workspaces::{WorkspaceRecord, WorkspaceStatus};

/// Why an event was not delivered.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Workspace is not active")]
    NotActive,

    #[error("Workspace has no server identity")]
    MissingServerIdentity,

    #[error("Server URL must use https")]
    InsecureUrl,

    #[error("Invalid server public key")]
    InvalidServerKey,

    #[error("Delivery blocked: {0}")]
    Blocked(SsrfError),

    #[error("Event encryption failed")]
    Encryption,

    #[error("Server did not answer within the forwarding timeout")]
    Timeout,

    #[error("Server answered with HTTP {0}")]
    Status(u16),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Local checks that need no network I/O.
pub fn preflight(record: &WorkspaceRecord) -> Result<(), ForwardError> {
    if record.status != WorkspaceStatus::Active {
        return Err(ForwardError::NotActive);
    }
    if record.server_url.is_empty() || record.server_pubkey.is_empty() {
        return Err(ForwardError::MissingServerIdentity);
    }
    match Url::parse(&record.server_url) {
        Ok(url) if url.scheme() == "https" => Ok(()),
        _ => Err(ForwardError::InsecureUrl),
    }
}

/// Carries a signed envelope to a server URL.
#[async_trait]
pub trait EnvelopeTransport: Send + Sync {
    async fn deliver(
        &self,
        server_url: &str,
        envelope: &Envelope,
        timeout: Duration,
    ) -> Result<u16, ForwardError>;
}

/// Resolves the host, refuses private addresses, then POSTs to the pinned
/// address with redirects disabled.
pub struct PinnedHttpsTransport;

#[async_trait]
impl EnvelopeTransport for PinnedHttpsTransport {
    async fn deliver(
        &self,
        server_url: &str,
        envelope: &Envelope,
        timeout: Duration,
    ) -> Result<u16, ForwardError> {
        let target = ssrf::resolve_and_pin(server_url)
            .await
            .map_err(ForwardError::Blocked)?;
        let client = pinned_client(&target, timeout)?;

        post_envelope(&client, target.url.as_str(), envelope).await
    }
}

/// Seals events and delivers envelopes.
#[derive(Clone)]
pub struct Forwarder {
    keys: Arc<BrokerKeys>,
    timeout: Duration,
    transport: Arc<dyn EnvelopeTransport>,
}

impl Forwarder {
    pub fn new(keys: Arc<BrokerKeys>, timeout: Duration) -> Self {
        Self {
            keys,
            timeout,
            transport: Arc::new(PinnedHttpsTransport),
        }
    }

    /// Replace how envelopes are carried. Sealing, signing and the
    /// forwarding deadline are unchanged.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn EnvelopeTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Seal `event` to the workspace server and sign the envelope.
    pub fn build_envelope(
        &self,
        event: &serde_json::Value,
        record: &WorkspaceRecord,
        timestamp: i64,
    ) -> Result<Envelope, ForwardError> {
        let server_key = encoding::from_base64_array::<32>(&record.server_pubkey)
            .map(BoxPublicKey::from)
            .map_err(|_| ForwardError::InvalidServerKey)?;

        let plaintext = serde_json::to_vec(event).map_err(|_| ForwardError::Encryption)?;
        let encrypted =
            sealed::seal(&plaintext, &server_key).map_err(|_| ForwardError::Encryption)?;

        let signature = self.keys.sign(&canonical::envelope_payload(
            &record.workspace_id,
            timestamp,
            &encrypted,
        ));

        Ok(Envelope {
            workspace_id: record.workspace_id.clone(),
            encrypted,
            timestamp,
            signature,
        })
    }

    /// Run pre-flight checks, seal, sign and deliver. Returns the HTTP status.
    ///
    /// The timeout bounds the whole delivery, DNS resolution included.
    #[instrument(skip(self, event, record), fields(workspace_id = %record.workspace_id))]
    pub async fn forward(
        &self,
        event: &serde_json::Value,
        record: &WorkspaceRecord,
    ) -> Result<u16, ForwardError> {
        preflight(record)?;
        let envelope = self.build_envelope(event, record, now_secs())?;

        let delivery = self
            .transport
            .deliver(&record.server_url, &envelope, self.timeout);
        tokio::time::timeout(self.timeout, delivery)
            .await
            .map_err(|_| ForwardError::Timeout)?
    }

    /// Forward on a detached task. The caller never observes the outcome;
    /// failures (and panics) end up in the log only.
    pub fn spawn(&self, event: serde_json::Value, record: WorkspaceRecord) {
        let forwarder = self.clone();
        tokio::spawn(async move {
            let workspace_id = record.workspace_id.clone();
            let handle = tokio::spawn(async move {
                match forwarder.forward(&event, &record).await {
                    Ok(status) => debug!(status, "Event forwarded"),
                    Err(e) => warn!(error = %e, "Event dropped"),
                }
            });
            if let Err(e) = handle.await {
                error!(workspace_id = %workspace_id, "Forwarding task panicked: {}", e);
            }
        });
    }
}

fn pinned_client(target: &PinnedTarget, timeout: Duration) -> Result<reqwest::Client, ForwardError> {
    reqwest::Client::builder()
        .resolve(&target.host, target.addr)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| ForwardError::Transport(e.to_string()))
}

/// POST an envelope; signature and timestamp are mirrored in headers.
pub async fn post_envelope(
    client: &reqwest::Client,
    url: &str,
    envelope: &Envelope,
) -> Result<u16, ForwardError> {
    let response = client
        .post(url)
        .header(SIGNATURE_HEADER, &envelope.signature)
        .header(TIMESTAMP_HEADER, envelope.timestamp.to_string())
        .header(WORKSPACE_HEADER, &envelope.workspace_id)
        .json(envelope)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ForwardError::Timeout
            } else {
                ForwardError::Transport(e.to_string())
            }
        })?;

    let status = response.status();
    if status.is_success() {
        Ok(status.as_u16())
    } else {
        Err(ForwardError::Status(status.as_u16()))
    }
}
