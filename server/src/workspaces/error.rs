//! Workspace Error Types

use super::token_crypto::TokenCryptoError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Workspace not found")]
    NotFound,

    #[error("Workspace is already active")]
    AlreadyActive,

    #[error("Bot token encryption failed: {0}")]
    TokenEncryption(TokenCryptoError),

    #[error("Bot token could not be decrypted")]
    TokenDecryption(TokenCryptoError),

    #[error("Registry key derivation failed")]
    KeyDerivation,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
