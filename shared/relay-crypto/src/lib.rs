//! Relay Cryptography
//!
//! Key material and message protection for the Slack relay.
//!
//! - **Sealed box**: anonymous-sender encryption of inbound events (broker → server)
//! - **Authenticated box**: sender-bound encryption of outbound bodies (server → broker)
//! - **Signing**: Ed25519 signatures over canonical byte strings

pub mod authbox;
pub mod canonical;
pub mod encoding;
pub mod error;
pub mod keys;
pub mod sealed;
pub mod signing;

pub use error::{CryptoError, Result};
pub use keys::BrokerKeys;

/// Re-export key types that callers commonly need.
pub mod types {
    pub use crypto_box::{PublicKey as BoxPublicKey, SecretKey as BoxSecretKey};
    pub use ed25519_dalek::{SigningKey, VerifyingKey};
}

/// Compare two byte strings without branching on the first mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;

    a.len() == b.len() && bool::from(a.ct_eq(b))
}
