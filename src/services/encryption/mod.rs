//! Encryption boundary for mnemonic material
//!
//! Two independently keyed symmetric capabilities protect secrets around the pool:
//! - transit key: cluster-wide, protects mnemonics crossing into this service
//! - application key: scoped to this service, protects mnemonics held by callers between calls
//!
//! Plaintext produced by [`Encryptor::decrypt`] is always returned in a
//! [`Zeroizing`] buffer so it is wiped on every exit path.

pub mod aes;
pub mod boundary;
pub mod vault;

use async_trait::async_trait;
use thiserror::Error;
use zeroize::Zeroizing;

pub use aes::AesGcmEncryptor;
pub use boundary::{EncryptedMnemonic, EncryptionBoundary, MnemonicError};
pub use vault::VaultTransitEncryptor;

/// Errors raised by an [`Encryptor`]
#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Encryption failed: {0}")]
    Encrypt(String),

    #[error("Decryption failed: {0}")]
    Decrypt(String),

    #[error("Encryption backend unavailable: {0}")]
    Backend(String),
}

/// Symmetric encrypt/decrypt capability bound to one key
#[async_trait]
pub trait Encryptor: Send + Sync {
    /// Encrypt `plaintext`, returning an opaque ciphertext blob
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError>;

    /// Decrypt a blob produced by [`Encryptor::encrypt`] with the same key
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, EncryptionError>;
}
