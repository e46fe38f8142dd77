//! Signing capability for audit entries
//!
//! The chain only requires `sign(bytes) -> sig` and
//! `verify(bytes, sig) -> bool`; the concrete algorithm is injected.
//! Two implementations are provided: HMAC-SHA256 (shared secret) and
//! Ed25519 (asymmetric).

use crate::config::SecretString;
use crate::domain::{Result, ScrubError};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Injected signing capability
pub trait Signer: Send + Sync {
    /// Identifier recorded for diagnostics
    fn algorithm(&self) -> &'static str;

    /// Signs a message, returning the raw signature bytes
    fn sign(&self, message: &[u8]) -> Vec<u8>;

    /// Verifies a signature over a message
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;
}

/// HMAC-SHA256 signer keyed by a shared secret
pub struct HmacSigner {
    key: SecretString,
}

impl HmacSigner {
    pub fn new(key: SecretString) -> Self {
        Self { key }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.key.expose_secret().as_ref().as_bytes())
            .expect("HMAC accepts keys of any length")
    }
}

impl Signer for HmacSigner {
    fn algorithm(&self) -> &'static str {
        "hmac-sha256"
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let mut mac = self.mac();
        mac.update(message);
        mac.verify_slice(signature).is_ok()
    }
}

/// Ed25519 signer holding the private key; verification uses only the
/// derived public key
pub struct Ed25519Signer {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Ed25519Signer {
    /// Builds a signer from a 32-byte hex-encoded seed
    pub fn from_hex_key(key: &SecretString) -> Result<Self> {
        let bytes = hex::decode(key.expose_secret().as_ref())
            .map_err(|e| ScrubError::Crypto(format!("invalid ed25519 key hex: {e}")))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ScrubError::Crypto("ed25519 key must be 32 bytes".to_string()))?;

        let signing_key = SigningKey::from_bytes(&seed);
        let verifying_key = signing_key.verifying_key();
        Ok(Self {
            signing_key,
            verifying_key,
        })
    }
}

impl Signer for Ed25519Signer {
    fn algorithm(&self) -> &'static str {
        "ed25519"
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        self.verifying_key.verify(message, &signature).is_ok()
    }
}

/// Builds the configured signer implementation
pub fn build_signer(algorithm: &str, key: &SecretString) -> Result<Box<dyn Signer>> {
    match algorithm {
        "hmac" => Ok(Box::new(HmacSigner::new(crate::config::secret_string(
            key.expose_secret().as_ref().to_string(),
        )))),
        "ed25519" => Ok(Box::new(Ed25519Signer::from_hex_key(key)?)),
        other => Err(ScrubError::Configuration(format!(
            "Unknown signing algorithm '{other}'. Must be one of: hmac, ed25519"
        ))),
    }
}
