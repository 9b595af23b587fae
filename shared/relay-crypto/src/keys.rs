//! Broker Key Material
//!
//! A single 32-byte seed yields every long-term broker key:
//!
//! | Purpose                        | Derivation                               |
//! |--------------------------------|------------------------------------------|
//! | X25519 box key (outbound open) | seed used directly as the secret scalar  |
//! | Ed25519 envelope signing key   | seed used directly as the signing seed   |
//! | Bot-token encryption key       | HKDF-SHA256(seed, `relay:bot-token:v1`)  |
//! | Auth-code HMAC key             | seed                                     |

use crypto_box::{PublicKey, SecretKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::encoding::{from_base64_array, to_base64};
use crate::{signing, CryptoError, Result};

/// HKDF info label for the bot-token encryption key.
pub const BOT_TOKEN_KEY_INFO: &[u8] = b"relay:bot-token:v1";

/// Long-term broker keys derived from one secret seed.
pub struct BrokerKeys {
    seed: Zeroizing<[u8; 32]>,
    box_secret: SecretKey,
    box_public: PublicKey,
    signing: SigningKey,
}

impl BrokerKeys {
    /// Derive all broker keys from a 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let seed = Zeroizing::new(seed);
        let box_secret = SecretKey::from(*seed);
        let box_public = box_secret.public_key();
        let signing = SigningKey::from_bytes(&seed);

        Self {
            seed,
            box_secret,
            box_public,
            signing,
        }
    }

    /// Derive keys from a base64 seed (the `BROKER_SECRET_KEY` format).
    pub fn from_base64(seed_b64: &str) -> Result<Self> {
        let seed = from_base64_array::<32>(seed_b64)
            .map_err(|_| CryptoError::InvalidKey("broker seed must be 32 bytes of base64".into()))?;
        Ok(Self::from_seed(seed))
    }

    /// Generate a fresh random seed, returned base64-encoded.
    pub fn generate_seed() -> String {
        let mut seed = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(seed.as_mut());
        to_base64(seed.as_ref())
    }

    /// Secret half of the X25519 box keypair.
    pub const fn box_secret(&self) -> &SecretKey {
        &self.box_secret
    }

    /// Public half of the X25519 box keypair.
    pub const fn box_public(&self) -> &PublicKey {
        &self.box_public
    }

    /// Base64 X25519 public key handed to servers at registration.
    pub fn box_public_b64(&self) -> String {
        to_base64(self.box_public.as_bytes())
    }

    /// Ed25519 verifying key servers use to authenticate envelopes.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Base64 Ed25519 public key handed to servers at registration.
    pub fn signing_public_b64(&self) -> String {
        to_base64(self.signing.verifying_key().as_bytes())
    }

    /// Sign a canonical byte string with the broker's Ed25519 key.
    pub fn sign(&self, message: &[u8]) -> String {
        signing::sign(message, &self.signing)
    }

    /// Key for HMAC-ing one-time registration codes.
    pub fn auth_code_key(&self) -> &[u8] {
        self.seed.as_ref()
    }

    /// Derive a 32-byte subkey for the given purpose label.
    pub fn derive_key(&self, info: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
        let hkdf = Hkdf::<Sha256>::new(None, self.seed.as_ref());
        let mut okm = Zeroizing::new([0u8; 32]);
        hkdf.expand(info, okm.as_mut())
            .map_err(|e| CryptoError::InvalidKey(format!("HKDF expand failed: {e}")))?;
        Ok(okm)
    }
}

impl std::fmt::Debug for BrokerKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerKeys")
            .field("box_public", &self.box_public_b64())
            .field("signing_public", &self.signing_public_b64())
            .finish_non_exhaustive()
    }
}
