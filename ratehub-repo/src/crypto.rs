//! Credential encryption at rest.
//!
//! Integration API keys are stored AES-256-GCM encrypted as
//! `hex(nonce):hex(ciphertext)` with a fresh random nonce per encryption.
//! The key material comes from `APP_DATA_KEY`: shorter keys are padded with
//! `'0'` to 32 bytes, longer keys truncated.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;

use ratehub_types::RepoError;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Symmetric cipher for integration credentials.
#[derive(Clone)]
pub struct CredentialCipher {
    key: [u8; KEY_LEN],
}

impl CredentialCipher {
    /// Derives the fixed-size key from raw key material.
    pub fn new(material: &str) -> Result<Self, RepoError> {
        if material.trim().is_empty() {
            return Err(RepoError::Crypto(
                "encryption key must not be empty".to_string(),
            ));
        }
        let mut key = [b'0'; KEY_LEN];
        let bytes = material.as_bytes();
        let len = bytes.len().min(KEY_LEN);
        key[..len].copy_from_slice(&bytes[..len]);
        Ok(Self { key })
    }

    /// Encrypts a plaintext credential into the stored representation.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, RepoError> {
        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|e| RepoError::Crypto(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| RepoError::Crypto(e.to_string()))?;

        Ok(format!(
            "{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(ciphertext)
        ))
    }

    /// Decrypts a stored `hex(nonce):hex(ciphertext)` value.
    pub fn decrypt(&self, stored: &str) -> Result<String, RepoError> {
        let (nonce_hex, ciphertext_hex) = stored.split_once(':').ok_or_else(|| {
            RepoError::Crypto("malformed encrypted credential".to_string())
        })?;

        let nonce_bytes =
            hex::decode(nonce_hex).map_err(|e| RepoError::Crypto(e.to_string()))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(RepoError::Crypto("invalid nonce length".to_string()));
        }
        let ciphertext =
            hex::decode(ciphertext_hex).map_err(|e| RepoError::Crypto(e.to_string()))?;

        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|e| RepoError::Crypto(e.to_string()))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| RepoError::Crypto("credential decryption failed".to_string()))?;

        String::from_utf8(plaintext).map_err(|e| RepoError::Crypto(e.to_string()))
    }
}
