//! Crypto Error Types

use thiserror::Error;

/// Errors produced by the relay crypto primitives.
///
/// Decryption failures deliberately collapse into a single variant so callers
/// cannot distinguish a wrong key from a corrupted ciphertext.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid base64 encoding")]
    InvalidBase64,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Ciphertext too short")]
    CiphertextTooShort,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Invalid UTF-8 in decrypted payload")]
    InvalidUtf8,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
