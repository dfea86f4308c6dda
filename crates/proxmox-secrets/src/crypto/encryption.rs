//! AES-GCM sealing for records at rest.
//!
//! Sealed values are laid out as a 12-byte random nonce followed by the
//! AES-256-GCM ciphertext and tag.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;

use crate::error::{AppError, AppResult};

/// Nonce size for AES-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (256 bits / 32 bytes).
const KEY_SIZE: usize = 32;

/// Seals and unseals storage values.
#[derive(Clone)]
pub struct Encryptor {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor").finish_non_exhaustive()
    }
}

impl Encryptor {
    /// Create a new encryptor from a base64-encoded key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not valid base64 or not 32 bytes.
    pub fn from_base64(key_base64: &str) -> AppResult<Self> {
        let key_bytes = BASE64
            .decode(key_base64.trim())
            .map_err(|e| AppError::Encryption(format!("Invalid base64 key: {}", e)))?;

        Self::from_bytes(&key_bytes)
    }

    /// Create a new encryptor from raw key bytes.
    pub fn from_bytes(key_bytes: &[u8]) -> AppResult<Self> {
        if key_bytes.len() != KEY_SIZE {
            return Err(AppError::Encryption(format!(
                "Invalid key length: expected {} bytes, got {}",
                KEY_SIZE,
                key_bytes.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key_bytes)
            .map_err(|e| AppError::Encryption(format!("Failed to create cipher: {}", e)))?;

        Ok(Self { cipher })
    }

    /// Generate a new random 32-byte key.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_SIZE];
        rand::thread_rng().fill(&mut key[..]);
        key
    }

    /// Generate a new random key and return it as base64.
    pub fn generate_key_base64() -> String {
        BASE64.encode(Self::generate_key())
    }

    /// Encrypt data and return the ciphertext with prepended nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> AppResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| AppError::Encryption(format!("Encryption failed: {}", e)))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(sealed)
    }

    /// Decrypt data with prepended nonce.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is truncated, tampered with, or was
    /// sealed under a different key.
    pub fn decrypt(&self, sealed: &[u8]) -> AppResult<Vec<u8>> {
        if sealed.len() < NONCE_SIZE {
            return Err(AppError::Encryption(
                "Ciphertext too short (missing nonce)".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| AppError::Encryption(format!("Decryption failed: {}", e)))
    }
}
