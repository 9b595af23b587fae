//! Ed25519 Signing
//!
//! Signatures and keys travel as base64. Verification never panics or errors:
//! any malformed input is simply an invalid signature.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::encoding::{from_base64, from_base64_array, to_base64};
use crate::Result;

/// Sign `message` and return the base64 signature.
pub fn sign(message: &[u8], key: &SigningKey) -> String {
    to_base64(&key.sign(message).to_bytes())
}

/// Verify a base64 signature against a base64 Ed25519 public key.
pub fn verify(message: &[u8], signature_b64: &str, public_b64: &str) -> bool {
    match verifying_key_from_base64(public_b64) {
        Ok(key) => verify_with_key(message, signature_b64, &key),
        Err(_) => false,
    }
}

/// Verify a base64 signature against an already-parsed public key.
pub fn verify_with_key(message: &[u8], signature_b64: &str, key: &VerifyingKey) -> bool {
    let Ok(raw) = from_base64(signature_b64) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&raw) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}

/// Parse a base64 Ed25519 public key.
pub fn verifying_key_from_base64(public_b64: &str) -> Result<VerifyingKey> {
    let bytes = from_base64_array::<32>(public_b64)?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| crate::CryptoError::InvalidKey(format!("Invalid Ed25519 public key: {e}")))
}
