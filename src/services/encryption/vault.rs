//! HashiCorp Vault transit engine encryptor
//!
//! Delegates encryption to Vault's transit secrets engine so key material never
//! enters this process. Each [`VaultTransitEncryptor`] is bound to one named
//! transit key.
//!
//! # Example
//!
//! ```rust,ignore
//! use hdwallet_keykeeper::services::encryption::{Encryptor, VaultTransitEncryptor};
//!
//! let transit = VaultTransitEncryptor::new(
//!     "https://vault.internal:8200".to_string(),
//!     "s.token".to_string(),
//!     "crypto-bundle-common-transit".to_string(),
//! )?;
//! let ciphertext = transit.encrypt(b"payload").await?;
//! ```

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{EncryptionError, Encryptor};

#[derive(Serialize)]
struct EncryptRequest<'a> {
    plaintext: &'a str,
}

#[derive(Serialize)]
struct DecryptRequest<'a> {
    ciphertext: &'a str,
}

#[derive(Deserialize)]
struct VaultResponse<T> {
    data: T,
}

#[derive(Deserialize)]
struct EncryptData {
    ciphertext: String,
}

#[derive(Deserialize)]
struct DecryptData {
    plaintext: Zeroizing<String>,
}

/// Vault transit encryptor bound to a single key name
#[derive(Clone)]
pub struct VaultTransitEncryptor {
    http: reqwest::Client,
    address: String,
    token: Zeroizing<String>,
    key_name: String,
}

impl VaultTransitEncryptor {
    /// Create a new encryptor for `key_name` on the Vault server at `address`
    pub fn new(address: String, token: String, key_name: String) -> Result<Self, EncryptionError> {
        if key_name.trim().is_empty() {
            return Err(EncryptionError::InvalidKey(
                "Vault transit key name is empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| EncryptionError::Backend(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            address: address.trim_end_matches('/').to_string(),
            token: Zeroizing::new(token),
            key_name,
        })
    }

    /// Transit key this encryptor is bound to
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    fn endpoint(&self, operation: &str) -> String {
        format!(
            "{}/v1/transit/{operation}/{}",
            self.address, self.key_name
        )
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        operation: &str,
        body: &B,
    ) -> Result<T, reqwest::Error> {
        let response = self
            .http
            .post(self.endpoint(operation))
            .header("X-Vault-Token", self.token.as_str())
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: VaultResponse<T> = response.json().await?;
        Ok(parsed.data)
    }
}

#[async_trait]
impl Encryptor for VaultTransitEncryptor {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let encoded = Zeroizing::new(BASE64.encode(plaintext));

        let data: EncryptData = self
            .post(
                "encrypt",
                &EncryptRequest {
                    plaintext: encoded.as_str(),
                },
            )
            .await
            .map_err(|e| {
                EncryptionError::Encrypt(format!(
                    "Vault transit encrypt with key '{}' failed: {e}",
                    self.key_name
                ))
            })?;

        Ok(data.ciphertext.into_bytes())
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, EncryptionError> {
        let ciphertext = std::str::from_utf8(ciphertext).map_err(|_| {
            EncryptionError::Decrypt("Vault ciphertext is not valid UTF-8".to_string())
        })?;

        if !ciphertext.starts_with("vault:") {
            return Err(EncryptionError::Decrypt(
                "ciphertext is not a Vault transit blob".to_string(),
            ));
        }

        let data: DecryptData = self
            .post("decrypt", &DecryptRequest { ciphertext })
            .await
            .map_err(|e| {
                EncryptionError::Decrypt(format!(
                    "Vault transit decrypt with key '{}' failed: {e}",
                    self.key_name
                ))
            })?;

        BASE64
            .decode(data.plaintext.as_bytes())
            .map(Zeroizing::new)
            .map_err(|_| EncryptionError::Decrypt("Vault returned malformed plaintext".to_string()))
    }
}

impl std::fmt::Debug for VaultTransitEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultTransitEncryptor")
            .field("address", &self.address)
            .field("key_name", &self.key_name)
            .finish_non_exhaustive()
    }
}
