//! Workspace Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a workspace's server link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceStatus {
    /// Installed, waiting for a server to register with the one-time code.
    Pending,
    /// Linked to a server; events are forwarded.
    Active,
    /// Unlinked. Requires a fresh install to become pending again.
    Inactive,
}

/// Stored workspace record. Cleared fields are empty strings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    /// Slack team id (`T...`), immutable.
    pub workspace_id: String,
    pub team_name: String,
    pub status: WorkspaceStatus,
    #[serde(default)]
    pub server_url: String,
    /// Server X25519 public key (base64).
    #[serde(default)]
    pub server_pubkey: String,
    /// Server Ed25519 public key (base64).
    #[serde(default)]
    pub server_signing_pubkey: String,
    /// Encrypted bot token (base64 `nonce || ciphertext`).
    pub bot_token: String,
    /// HMAC of the one-time registration code; empty once consumed.
    #[serde(default)]
    pub auth_code_hash: String,
    pub updated_at: DateTime<Utc>,
}

impl WorkspaceRecord {
    /// Active with a complete server identity.
    pub fn is_active(&self) -> bool {
        self.status == WorkspaceStatus::Active
            && !self.server_url.is_empty()
            && !self.server_pubkey.is_empty()
    }
}

impl std::fmt::Debug for WorkspaceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceRecord")
            .field("workspace_id", &self.workspace_id)
            .field("team_name", &self.team_name)
            .field("status", &self.status)
            .field("server_url", &self.server_url)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}
