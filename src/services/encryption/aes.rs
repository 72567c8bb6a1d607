//! Local AES-256-GCM encryptor
//!
//! Wire format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use zeroize::Zeroizing;

use super::{EncryptionError, Encryptor};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// AES-256-GCM encryptor holding a single 32-byte key
pub struct AesGcmEncryptor {
    cipher: Aes256Gcm,
}

impl AesGcmEncryptor {
    /// Create an encryptor from raw key bytes (must be 32 bytes)
    pub fn new(key: &[u8]) -> Result<Self, EncryptionError> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| {
            EncryptionError::InvalidKey(format!("expected 32 key bytes, got {}", key.len()))
        })?;

        Ok(Self { cipher })
    }

    /// Create an encryptor from a hex-encoded key, as found in the environment
    pub fn from_hex(key_hex: &str) -> Result<Self, EncryptionError> {
        let key = Zeroizing::new(
            hex::decode(key_hex.trim().trim_start_matches("0x"))
                .map_err(|e| EncryptionError::InvalidKey(format!("key is not valid hex: {e}")))?,
        );

        Self::new(&key)
    }

    fn encrypt_sync(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| EncryptionError::Encrypt("AES-GCM seal failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt_sync(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, EncryptionError> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(EncryptionError::Decrypt(format!(
                "ciphertext too short: {} bytes",
                ciphertext.len()
            )));
        }

        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| {
                EncryptionError::Decrypt("authentication failed or wrong key".to_string())
            })?;

        Ok(Zeroizing::new(plaintext))
    }
}

#[async_trait]
impl Encryptor for AesGcmEncryptor {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        self.encrypt_sync(plaintext)
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, EncryptionError> {
        self.decrypt_sync(ciphertext)
    }
}

impl std::fmt::Debug for AesGcmEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmEncryptor").finish_non_exhaustive()
    }
}
