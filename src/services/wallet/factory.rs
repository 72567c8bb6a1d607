//! Wallet-unit factory contract
//!
//! A factory is the per-blockchain strategy that knows how to generate and
//! validate mnemonics and how to turn a decrypted mnemonic into a live
//! [`WalletUnit`]. The pool only ever talks to these traits.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroizing;

/// Errors raised by a [`WalletUnitFactory`]
#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("Mnemonic generation failed: {0}")]
    Generation(String),

    #[error("Mnemonic is not valid: {0}")]
    InvalidMnemonic(String),

    #[error("Wallet unit construction failed: {0}")]
    Construction(String),
}

/// Errors raised by a loaded [`WalletUnit`]
#[derive(Error, Debug)]
pub enum WalletUnitError {
    #[error("Invalid account parameters: {0}")]
    InvalidParameters(String),

    #[error("Key derivation failed: {0}")]
    Derivation(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Wallet unload failed: {0}")]
    Unload(String),
}

/// Build metadata reported by a factory (informational only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FactoryInfo {
    pub name: String,
    pub release_tag: String,
    pub commit_id: String,
    pub short_commit_id: String,
    pub build_number: u64,
    pub build_date_ts: i64,
}

/// One derived account: its address plus the chain-specific parameters that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AccountIdentity {
    pub address: String,
    pub parameters: Value,
}

/// A blockchain-specific object able to derive and sign for one loaded mnemonic.
///
/// Units are owned exclusively by the wallet pool; no other component keeps a
/// reference to one. Parameters are opaque JSON values interpreted by the unit.
#[async_trait]
pub trait WalletUnit: Send + Sync {
    /// Wallet session identifier this unit was built for
    fn wallet_uuid(&self) -> Uuid;

    /// Release all key material held by the unit
    async fn unload(&mut self) -> Result<(), WalletUnitError>;

    /// Derive the address for one account
    async fn derive_address(&self, params: &Value) -> Result<String, WalletUnitError>;

    /// Derive a batch of accounts, returning the count and their identities
    async fn derive_multiple(
        &self,
        params: &Value,
    ) -> Result<(usize, Vec<AccountIdentity>), WalletUnitError>;

    /// Derive an account and keep its key resident for later signing
    async fn load_account(&mut self, params: &Value) -> Result<String, WalletUnitError>;

    /// Sign `data` with the account selected by `params`, returning `(address, signature)`
    async fn sign(
        &mut self,
        params: &Value,
        data: &[u8],
    ) -> Result<(String, Vec<u8>), WalletUnitError>;
}

/// Per-blockchain strategy producing [`WalletUnit`]s
pub trait WalletUnitFactory: Send + Sync {
    /// Build metadata for logging and the info endpoint
    fn info(&self) -> &FactoryInfo;

    /// Generate a fresh mnemonic phrase
    fn generate_mnemonic(&self) -> Result<Zeroizing<String>, FactoryError>;

    /// Check whether `phrase` is a valid mnemonic for this chain
    fn validate_mnemonic(&self, phrase: &str) -> bool;

    /// Construct a unit from decrypted mnemonic bytes.
    ///
    /// The caller owns `mnemonic` and wipes it after this returns; the unit must
    /// copy whatever it needs into its own zeroizing storage.
    fn new_unit(
        &self,
        wallet_uuid: Uuid,
        mnemonic: &[u8],
    ) -> Result<Box<dyn WalletUnit>, FactoryError>;
}
