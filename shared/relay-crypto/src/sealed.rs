//! Sealed Boxes (inbound direction)
//!
//! Anonymous-sender encryption: the ciphertext is `ephemeral_pk(32) || box`,
//! compatible with libsodium's `crypto_box_seal`. The broker only ever seals
//! to a server's public key; it holds no key that can open the result.

use crypto_box::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::encoding::{from_base64, to_base64};
use crate::{CryptoError, Result};

/// X25519 public key length.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Poly1305 tag length.
pub const MAC_LEN: usize = 16;

/// Seal `plaintext` to `recipient` and return the base64 ciphertext.
pub fn seal(plaintext: &[u8], recipient: &PublicKey) -> Result<String> {
    let sealed = recipient
        .seal(&mut OsRng, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    Ok(to_base64(&sealed))
}

/// Open a sealed box. Only automation servers call this; the broker never can.
pub fn unseal(
    sealed_b64: &str,
    recipient_public: &PublicKey,
    recipient_secret: &SecretKey,
) -> Result<Zeroizing<Vec<u8>>> {
    let sealed = from_base64(sealed_b64).map_err(|_| CryptoError::DecryptionFailed)?;
    if sealed.len() < PUBLIC_KEY_LEN + MAC_LEN {
        return Err(CryptoError::CiphertextTooShort);
    }
    if recipient_secret.public_key().as_bytes() != recipient_public.as_bytes() {
        return Err(CryptoError::DecryptionFailed);
    }

    recipient_secret
        .unseal(&sealed)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed)
}
