//! Optional at-rest encryption for persisted audit records
//!
//! When enabled, each serialized entry is wrapped in an envelope
//! `{encrypted: true, data, iv, algorithm}` before it is written to the
//! segment. The chain itself is unaffected: hashing and signing happen
//! over the plaintext entry.

use crate::config::SecretString;
use crate::domain::{Result, ScrubError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

const ALGORITHM: &str = "chacha20-poly1305";
const NONCE_LEN: usize = 12;

/// Envelope wrapping one encrypted audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    pub encrypted: bool,
    /// Base64 ciphertext (includes the AEAD tag)
    pub data: String,
    /// Base64 nonce
    pub iv: String,
    pub algorithm: String,
}

/// Symmetric cipher for audit records at rest
pub struct EntryCipher {
    cipher: ChaCha20Poly1305,
}

impl EntryCipher {
    /// Builds a cipher from a 32-byte hex-encoded key
    pub fn from_hex_key(key: &SecretString) -> Result<Self> {
        let bytes = hex::decode(key.expose_secret().as_ref())
            .map_err(|e| ScrubError::Crypto(format!("invalid encryption key hex: {e}")))?;
        if bytes.len() != 32 {
            return Err(ScrubError::Crypto(
                "encryption key must be 32 bytes".to_string(),
            ));
        }

        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&bytes)),
        })
    }

    /// Encrypts a serialized entry into an envelope with a fresh nonce
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedEnvelope> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| ScrubError::Crypto(format!("audit record encryption failed: {e}")))?;

        Ok(EncryptedEnvelope {
            encrypted: true,
            data: BASE64.encode(ciphertext),
            iv: BASE64.encode(nonce_bytes),
            algorithm: ALGORITHM.to_string(),
        })
    }

    /// Decrypts an envelope back to the serialized entry
    pub fn decrypt(&self, envelope: &EncryptedEnvelope) -> Result<Vec<u8>> {
        if envelope.algorithm != ALGORITHM {
            return Err(ScrubError::Crypto(format!(
                "unsupported envelope algorithm '{}'",
                envelope.algorithm
            )));
        }

        let nonce_bytes = BASE64
            .decode(&envelope.iv)
            .map_err(|e| ScrubError::Crypto(format!("invalid envelope iv: {e}")))?;
        // A wrong-length nonce means the envelope is corrupt or forged;
        // report it instead of letting Nonce::from_slice panic
        if nonce_bytes.len() != NONCE_LEN {
            return Err(ScrubError::Crypto(format!(
                "envelope iv must be {NONCE_LEN} bytes, got {}",
                nonce_bytes.len()
            )));
        }
        let ciphertext = BASE64
            .decode(&envelope.data)
            .map_err(|e| ScrubError::Crypto(format!("invalid envelope data: {e}")))?;

        self.cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| ScrubError::Crypto(format!("audit record decryption failed: {e}")))
    }
}
