//! Bot Token Encryption
//!
//! AES-256-GCM encryption for Slack bot tokens at rest. The workspace id is
//! bound in as associated data, so a ciphertext copied into another
//! workspace's record does not decrypt.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use zeroize::Zeroizing;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Token encryption errors.
#[derive(Error, Debug)]
pub enum TokenCryptoError {
    #[error("Invalid encryption key length (expected 32 bytes, got {0})")]
    InvalidKeyLength(usize),

    #[error("Token cipher failure")]
    Cipher,

    #[error("Stored token is not valid base64 nonce||ciphertext")]
    InvalidFormat,

    #[error("Stored token does not belong to this workspace or key")]
    Rejected,

    #[error("Decrypted token is not UTF-8")]
    NotUtf8,
}

pub type TokenCryptoResult<T> = Result<T, TokenCryptoError>;

fn cipher(key: &[u8]) -> TokenCryptoResult<Aes256Gcm> {
    if key.len() != KEY_LEN {
        return Err(TokenCryptoError::InvalidKeyLength(key.len()));
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| TokenCryptoError::Cipher)
}

/// Encrypt a bot token for storage in `workspace_id`'s record.
///
/// # Arguments
/// * `token` - Plaintext `xoxb-` bot token
/// * `workspace_id` - Team id the record is stored under
/// * `key` - 32-byte token key derived from the broker seed
///
/// # Returns
/// Base64 of `nonce(12 bytes) || ciphertext || tag(16 bytes)`
pub fn encrypt_token(token: &str, workspace_id: &str, key: &[u8]) -> TokenCryptoResult<String> {
    let cipher = cipher(key)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let sealed = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: token.as_bytes(),
                aad: workspace_id.as_bytes(),
            },
        )
        .map_err(|_| TokenCryptoError::Cipher)?;

    let mut stored = Vec::with_capacity(NONCE_LEN + sealed.len());
    stored.extend_from_slice(&nonce);
    stored.extend_from_slice(&sealed);
    Ok(STANDARD.encode(stored))
}

/// Decrypt a stored bot token.
///
/// # Arguments
/// * `stored` - Value produced by [`encrypt_token`]
/// * `workspace_id` - Team id of the record the value was read from
/// * `key` - 32-byte token key (same as used for encryption)
///
/// # Returns
/// The plaintext token, wiped from memory on drop
pub fn decrypt_token(
    stored: &str,
    workspace_id: &str,
    key: &[u8],
) -> TokenCryptoResult<Zeroizing<String>> {
    let cipher = cipher(key)?;

    let raw = STANDARD
        .decode(stored)
        .map_err(|_| TokenCryptoError::InvalidFormat)?;
    if raw.len() <= NONCE_LEN {
        return Err(TokenCryptoError::InvalidFormat);
    }
    let (nonce, sealed) = raw.split_at(NONCE_LEN);

    let plaintext = Zeroizing::new(
        cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: workspace_id.as_bytes(),
                },
            )
            .map_err(|_| TokenCryptoError::Rejected)?,
    );

    let token = std::str::from_utf8(&plaintext).map_err(|_| TokenCryptoError::NotUtf8)?;
    Ok(Zeroizing::new(token.to_owned()))
}
