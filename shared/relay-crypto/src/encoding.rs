//! Binary/text conversions shared by every other component.
//!
//! All wire keys, ciphertexts and signatures use standard padded base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::{CryptoError, Result};

/// Encode bytes as standard base64.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64.
pub fn from_base64(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|_| CryptoError::InvalidBase64)
}

/// Decode base64 into a fixed-size array, rejecting any other length.
pub fn from_base64_array<const N: usize>(encoded: &str) -> Result<[u8; N]> {
    let bytes = from_base64(encoded)?;
    <[u8; N]>::try_from(bytes.as_slice())
        .map_err(|_| CryptoError::InvalidKey(format!("expected {N} bytes, got {}", bytes.len())))
}

/// Interpret decrypted bytes as UTF-8.
pub fn to_utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| CryptoError::InvalidUtf8)
}
