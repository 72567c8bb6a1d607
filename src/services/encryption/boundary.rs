//! Mnemonic lifecycle across the transit and application keys
//!
//! - generate: factory phrase -> application ciphertext + hash
//! - validate: application ciphertext -> factory validator
//! - re-encrypt: transit ciphertext -> validator -> application ciphertext + hash
//!
//! Every plaintext produced here lives in a [`Zeroizing`] buffer and is wiped
//! when it goes out of scope, on success and error paths alike.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

use super::{EncryptionError, Encryptor};
use crate::services::wallet::{FactoryError, WalletUnitFactory};

/// Errors raised while moving mnemonics across the encryption boundary
#[derive(Error, Debug)]
pub enum MnemonicError {
    #[error("mnemonic phrase is not valid")]
    InvalidMnemonic,

    #[error("Generated mnemonic failed validation")]
    GeneratedInvalid,

    #[error("Mnemonic generation failed: {0}")]
    Generation(#[from] FactoryError),

    #[error("Transit decryption failed: {0}")]
    TransitDecrypt(#[source] EncryptionError),

    #[error("Application decryption failed: {0}")]
    ApplicationDecrypt(#[source] EncryptionError),

    #[error("Application encryption failed: {0}")]
    ApplicationEncrypt(#[source] EncryptionError),
}

/// Application-encrypted mnemonic plus the hash identifying the phrase
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptedMnemonic {
    pub encrypted_mnemonic: Vec<u8>,
    pub wallet_hash: String,
}

/// Lowercase hex SHA-256 of the plaintext phrase bytes
pub fn mnemonic_hash(phrase: &[u8]) -> String {
    hex::encode(Sha256::digest(phrase))
}

/// Transit and application encryptors bound together
#[derive(Clone)]
pub struct EncryptionBoundary {
    transit: Arc<dyn Encryptor>,
    application: Arc<dyn Encryptor>,
}

impl EncryptionBoundary {
    pub fn new(transit: Arc<dyn Encryptor>, application: Arc<dyn Encryptor>) -> Self {
        Self {
            transit,
            application,
        }
    }

    /// Encryptor for the cluster-wide transit key
    pub fn transit(&self) -> Arc<dyn Encryptor> {
        Arc::clone(&self.transit)
    }

    /// Encryptor for this service's application key (shared with the wallet pool)
    pub fn application(&self) -> Arc<dyn Encryptor> {
        Arc::clone(&self.application)
    }

    /// Generate a fresh mnemonic and return it encrypted with the application key.
    ///
    /// The phrase is checked against the factory's own validator before anything
    /// derived from it leaves this function.
    pub async fn generate_mnemonic(
        &self,
        factory: &dyn WalletUnitFactory,
    ) -> Result<EncryptedMnemonic, MnemonicError> {
        let phrase = factory.generate_mnemonic()?;

        if !factory.validate_mnemonic(phrase.as_str()) {
            return Err(MnemonicError::GeneratedInvalid);
        }

        let encrypted_mnemonic = self
            .application
            .encrypt(phrase.as_bytes())
            .await
            .map_err(MnemonicError::ApplicationEncrypt)?;

        Ok(EncryptedMnemonic {
            encrypted_mnemonic,
            wallet_hash: mnemonic_hash(phrase.as_bytes()),
        })
    }

    /// Decrypt an application-encrypted mnemonic and run it through the validator
    pub async fn validate_mnemonic(
        &self,
        factory: &dyn WalletUnitFactory,
        encrypted_mnemonic: &[u8],
    ) -> Result<bool, MnemonicError> {
        let plaintext = self
            .application
            .decrypt(encrypted_mnemonic)
            .await
            .map_err(MnemonicError::ApplicationDecrypt)?;

        Ok(std::str::from_utf8(&plaintext).is_ok_and(|phrase| factory.validate_mnemonic(phrase)))
    }

    /// Re-encrypt a transit-encrypted mnemonic under the application key
    pub async fn encrypt_transit_mnemonic(
        &self,
        factory: &dyn WalletUnitFactory,
        transit_ciphertext: &[u8],
    ) -> Result<EncryptedMnemonic, MnemonicError> {
        let plaintext: Zeroizing<Vec<u8>> = self
            .transit
            .decrypt(transit_ciphertext)
            .await
            .map_err(MnemonicError::TransitDecrypt)?;

        let valid =
            std::str::from_utf8(&plaintext).is_ok_and(|phrase| factory.validate_mnemonic(phrase));
        if !valid {
            return Err(MnemonicError::InvalidMnemonic);
        }

        let encrypted_mnemonic = self
            .application
            .encrypt(&plaintext)
            .await
            .map_err(MnemonicError::ApplicationEncrypt)?;

        Ok(EncryptedMnemonic {
            encrypted_mnemonic,
            wallet_hash: mnemonic_hash(&plaintext),
        })
    }
}

impl std::fmt::Debug for EncryptionBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionBoundary").finish_non_exhaustive()
    }
}
