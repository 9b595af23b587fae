//! Authenticated Boxes (outbound direction)
//!
//! Curve25519-XSalsa20-Poly1305 (`crypto_box`) binding sender and recipient.
//! A fresh random nonce is drawn for every message; nonces are never derived.

use crypto_box::aead::{Aead, AeadCore};
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::rngs::OsRng;
use zeroize::{Zeroize, Zeroizing};

use crate::encoding::{from_base64, to_base64};
use crate::{CryptoError, Result};

/// XSalsa20 nonce length.
pub const NONCE_LEN: usize = 24;

/// Base64 ciphertext and nonce produced by [`box_encrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxedMessage {
    pub ciphertext: String,
    pub nonce: String,
}

/// Encrypt `plaintext` from `sender` to `recipient`.
pub fn box_encrypt(
    plaintext: &[u8],
    recipient: &PublicKey,
    sender: &SecretKey,
) -> Result<BoxedMessage> {
    let cipher = SalsaBox::new(recipient, sender);
    let nonce = SalsaBox::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(BoxedMessage {
        ciphertext: to_base64(&ciphertext),
        nonce: to_base64(nonce.as_slice()),
    })
}

/// Decrypt a message that must have been produced by `sender` for `recipient`.
///
/// Every failure (bad encoding, nonce length, key mismatch, tampering) maps to
/// [`CryptoError::DecryptionFailed`].
pub fn box_decrypt(
    ciphertext_b64: &str,
    nonce_b64: &str,
    sender: &PublicKey,
    recipient: &SecretKey,
) -> Result<Zeroizing<Vec<u8>>> {
    let ciphertext = from_base64(ciphertext_b64).map_err(|_| CryptoError::DecryptionFailed)?;
    let nonce_bytes = from_base64(nonce_b64).map_err(|_| CryptoError::DecryptionFailed)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(CryptoError::DecryptionFailed);
    }

    let nonce = crypto_box::aead::Nonce::<SalsaBox>::clone_from_slice(&nonce_bytes);
    let cipher = SalsaBox::new(sender, recipient);

    cipher
        .decrypt(&nonce, ciphertext.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Overwrite a plaintext buffer in place.
pub fn zero(buffer: &mut [u8]) {
    buffer.zeroize();
}
