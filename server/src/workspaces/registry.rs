//! Workspace Registry Operations
//!
//! State transitions over [`WorkspaceRecord`]s persisted in a [`KvStore`].

use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use relay_crypto::{keys::BOT_TOKEN_KEY_INFO, BrokerKeys};
use sha2::Sha256;
use tracing::{info, instrument};
use zeroize::Zeroizing;

use super::error::{RegistryError, RegistryResult};
use super::token_crypto::{decrypt_token, encrypt_token};
use super::types::{WorkspaceRecord, WorkspaceStatus};
use crate::store::{KvStore, StoreError};

type HmacSha256 = Hmac<Sha256>;

const WORKSPACE_KEY_PREFIX: &str = "workspace:";

fn record_key(workspace_id: &str) -> String {
    format!("{WORKSPACE_KEY_PREFIX}{workspace_id}")
}

/// HMAC-SHA256 of a one-time registration code, hex-encoded.
pub fn hash_auth_code(code: &str, key: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(code.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Workspace records keyed by team id.
#[derive(Clone)]
pub struct WorkspaceRegistry {
    store: Arc<dyn KvStore>,
    token_key: Arc<Zeroizing<[u8; 32]>>,
}

impl WorkspaceRegistry {
    /// Build a registry whose bot-token key is derived from the broker seed.
    pub fn new(store: Arc<dyn KvStore>, keys: &BrokerKeys) -> RegistryResult<Self> {
        let token_key = keys
            .derive_key(BOT_TOKEN_KEY_INFO)
            .map_err(|_| RegistryError::KeyDerivation)?;
        Ok(Self {
            store,
            token_key: Arc::new(token_key),
        })
    }

    /// Look up a workspace record.
    pub async fn get(&self, workspace_id: &str) -> RegistryResult<Option<WorkspaceRecord>> {
        let Some(raw) = self.store.get(&record_key(workspace_id)).await? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&raw).map_err(StoreError::from)?;
        Ok(Some(record))
    }

    async fn save(&self, record: &WorkspaceRecord) -> RegistryResult<()> {
        let raw = serde_json::to_string(record).map_err(StoreError::from)?;
        self.store
            .put(&record_key(&record.workspace_id), &raw, None)
            .await?;
        Ok(())
    }

    /// Record a fresh installation as pending.
    ///
    /// Any existing record for the team is replaced, so a reinstall always
    /// starts a new registration cycle and drops the previous server link.
    #[instrument(skip(self, bot_token, auth_code_hash))]
    pub async fn create_pending(
        &self,
        workspace_id: &str,
        team_name: &str,
        bot_token: &str,
        auth_code_hash: &str,
    ) -> RegistryResult<WorkspaceRecord> {
        let encrypted = encrypt_token(bot_token, workspace_id, &self.token_key[..])
            .map_err(RegistryError::TokenEncryption)?;

        let record = WorkspaceRecord {
            workspace_id: workspace_id.to_string(),
            team_name: team_name.to_string(),
            status: WorkspaceStatus::Pending,
            server_url: String::new(),
            server_pubkey: String::new(),
            server_signing_pubkey: String::new(),
            bot_token: encrypted,
            auth_code_hash: auth_code_hash.to_string(),
            updated_at: Utc::now(),
        };
        self.save(&record).await?;

        info!(workspace_id = %workspace_id, "Workspace installed, awaiting registration");
        Ok(record)
    }

    /// Link a server to a workspace and consume its registration code.
    ///
    /// Fails without mutation when the workspace is unknown or already active.
    #[instrument(skip(self, server_pubkey, server_signing_pubkey))]
    pub async fn activate(
        &self,
        workspace_id: &str,
        server_url: &str,
        server_pubkey: &str,
        server_signing_pubkey: &str,
    ) -> RegistryResult<WorkspaceRecord> {
        let mut record = self
            .get(workspace_id)
            .await?
            .ok_or(RegistryError::NotFound)?;
        if record.status == WorkspaceStatus::Active {
            return Err(RegistryError::AlreadyActive);
        }

        record.status = WorkspaceStatus::Active;
        record.server_url = server_url.to_string();
        record.server_pubkey = server_pubkey.to_string();
        record.server_signing_pubkey = server_signing_pubkey.to_string();
        record.auth_code_hash = String::new();
        record.updated_at = Utc::now();
        self.save(&record).await?;

        info!(workspace_id = %workspace_id, server_url = %server_url, "Workspace activated");
        Ok(record)
    }

    /// Unlink the server. The record stays, with server fields and any
    /// outstanding registration code cleared.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, workspace_id: &str) -> RegistryResult<WorkspaceRecord> {
        let mut record = self
            .get(workspace_id)
            .await?
            .ok_or(RegistryError::NotFound)?;

        record.status = WorkspaceStatus::Inactive;
        record.server_url = String::new();
        record.server_pubkey = String::new();
        record.server_signing_pubkey = String::new();
        record.auth_code_hash = String::new();
        record.updated_at = Utc::now();
        self.save(&record).await?;

        info!(workspace_id = %workspace_id, "Workspace deactivated");
        Ok(record)
    }

    /// Decrypt a record's bot token.
    pub fn bot_token(&self, record: &WorkspaceRecord) -> RegistryResult<Zeroizing<String>> {
        decrypt_token(&record.bot_token, &record.workspace_id, &self.token_key[..])
            .map_err(RegistryError::TokenDecryption)
    }
}
