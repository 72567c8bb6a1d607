//! EVM wallet-unit factory
//!
//! BIP-39 mnemonics and BIP-44 derivation (`m/44'/60'/{account}'/{internal}/{address_index}`)
//! through alloy's local mnemonic signer.
//!
//! The phrase is stretched into a BIP-32 master key once, when the unit is
//! built; every account is then a cheap child derivation from that key.

use alloy::primitives::keccak256;
use alloy::signers::local::coins_bip39::{English, Mnemonic};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::{Signer, SignerSync};
use async_trait::async_trait;
use coins_bip32::ecdsa::SigningKey;
use coins_bip32::xkeys::{Parent, XPriv};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::factory::{
    AccountIdentity, FactoryError, FactoryInfo, WalletUnit, WalletUnitError, WalletUnitFactory,
};

/// Upper bound on accounts derived by one `derive_multiple` call
pub const MAX_ACCOUNTS_PER_RANGE: u32 = 1000;

/// Word counts accepted for generated mnemonics
pub const SUPPORTED_WORD_COUNTS: [usize; 4] = [15, 18, 21, 24];

/// Parameters selecting one EVM account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvmAccountParams {
    #[serde(default)]
    pub account_index: u32,
    #[serde(default)]
    pub internal_index: u32,
    #[serde(default)]
    pub address_index: u32,
}

impl EvmAccountParams {
    pub fn derivation_path(&self) -> String {
        format!(
            "{}/{}",
            branch_path(self.account_index, self.internal_index),
            self.address_index
        )
    }
}

fn branch_path(account_index: u32, internal_index: u32) -> String {
    format!("m/44'/60'/{account_index}'/{internal_index}")
}

/// Inclusive range of address indexes under one account/internal pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmAccountRangeParams {
    #[serde(default)]
    pub account_index: u32,
    #[serde(default)]
    pub internal_index: u32,
    pub from_address_index: u32,
    pub to_address_index: u32,
}

fn parse_params<T: for<'de> Deserialize<'de>>(params: &Value) -> Result<T, WalletUnitError> {
    serde_json::from_value(params.clone())
        .map_err(|e| WalletUnitError::InvalidParameters(e.to_string()))
}

/// Factory producing [`EvmWalletUnit`]s
#[derive(Debug, Clone)]
pub struct EvmWalletFactory {
    info: FactoryInfo,
    chain_id: Option<u64>,
    words_count: usize,
}

impl EvmWalletFactory {
    pub fn new(chain_id: Option<u64>, words_count: usize) -> Result<Self, FactoryError> {
        if !SUPPORTED_WORD_COUNTS.contains(&words_count) {
            return Err(FactoryError::Construction(format!(
                "unsupported mnemonic word count {words_count}, expected one of {SUPPORTED_WORD_COUNTS:?}"
            )));
        }

        Ok(Self {
            info: FactoryInfo {
                name: "evm".to_string(),
                release_tag: env!("CARGO_PKG_VERSION").to_string(),
                commit_id: option_env!("GIT_COMMIT").unwrap_or("unknown").to_string(),
                short_commit_id: option_env!("GIT_COMMIT")
                    .map(|c| c.chars().take(8).collect())
                    .unwrap_or_else(|| "unknown".to_string()),
                build_number: option_env!("BUILD_NUMBER")
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0),
                build_date_ts: option_env!("BUILD_DATE_TS")
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0),
            },
            chain_id,
            words_count,
        })
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn words_count(&self) -> usize {
        self.words_count
    }
}

impl WalletUnitFactory for EvmWalletFactory {
    fn info(&self) -> &FactoryInfo {
        &self.info
    }

    fn generate_mnemonic(&self) -> Result<Zeroizing<String>, FactoryError> {
        let mnemonic = Mnemonic::<English>::new_with_count(&mut rand::thread_rng(), self.words_count)
            .map_err(|e| FactoryError::Generation(e.to_string()))?;

        Ok(Zeroizing::new(mnemonic.to_phrase()))
    }

    fn validate_mnemonic(&self, phrase: &str) -> bool {
        Mnemonic::<English>::new_from_phrase(phrase).is_ok()
    }

    fn new_unit(
        &self,
        wallet_uuid: Uuid,
        mnemonic: &[u8],
    ) -> Result<Box<dyn WalletUnit>, FactoryError> {
        let phrase = std::str::from_utf8(mnemonic)
            .map_err(|_| FactoryError::InvalidMnemonic("mnemonic is not valid UTF-8".to_string()))?;

        let mnemonic = Mnemonic::<English>::new_from_phrase(phrase).map_err(|_| {
            FactoryError::InvalidMnemonic("phrase failed BIP-39 validation".to_string())
        })?;

        // PBKDF2 seed stretching; runs once per loaded wallet
        let root = mnemonic
            .master_key(None)
            .map_err(|e| FactoryError::Construction(e.to_string()))?;

        Ok(Box::new(EvmWalletUnit {
            wallet_uuid,
            chain_id: self.chain_id,
            root: Some(root),
            accounts: HashMap::new(),
        }))
    }
}

/// One loaded EVM mnemonic plus the accounts kept resident for signing
pub struct EvmWalletUnit {
    wallet_uuid: Uuid,
    chain_id: Option<u64>,
    // BIP-32 master key; the signing key wipes its scalar on drop
    root: Option<XPriv>,
    accounts: HashMap<EvmAccountParams, PrivateKeySigner>,
}

fn signer_from_key(key: &XPriv) -> Result<PrivateKeySigner, WalletUnitError> {
    let signing_key: &SigningKey = key.as_ref();
    PrivateKeySigner::from_slice(&signing_key.to_bytes())
        .map_err(|e| WalletUnitError::Derivation(e.to_string()))
}

/// Derive every address of `range`.
///
/// CPU bound; run it on the blocking pool so a call timeout can abandon it.
fn derive_range(
    root: &XPriv,
    range: EvmAccountRangeParams,
) -> Result<Vec<AccountIdentity>, WalletUnitError> {
    let branch = root
        .derive_path(branch_path(range.account_index, range.internal_index).as_str())
        .map_err(|e| WalletUnitError::Derivation(e.to_string()))?;

    (range.from_address_index..=range.to_address_index)
        .map(|address_index| {
            let key = branch
                .derive_child(address_index)
                .map_err(|e| WalletUnitError::Derivation(e.to_string()))?;
            let params = EvmAccountParams {
                account_index: range.account_index,
                internal_index: range.internal_index,
                address_index,
            };

            Ok(AccountIdentity {
                address: signer_from_key(&key)?.address().to_checksum(None),
                parameters: serde_json::to_value(params)
                    .map_err(|e| WalletUnitError::Derivation(e.to_string()))?,
            })
        })
        .collect()
}

impl EvmWalletUnit {
    fn root(&self) -> Result<&XPriv, WalletUnitError> {
        self.root
            .as_ref()
            .ok_or_else(|| WalletUnitError::Derivation("wallet already unloaded".to_string()))
    }

    fn derive_signer(&self, params: &EvmAccountParams) -> Result<PrivateKeySigner, WalletUnitError> {
        let key = self
            .root()?
            .derive_path(params.derivation_path().as_str())
            .map_err(|e| WalletUnitError::Derivation(e.to_string()))?;

        Ok(signer_from_key(&key)?.with_chain_id(self.chain_id))
    }

    fn signer_for(&self, params: &EvmAccountParams) -> Result<PrivateKeySigner, WalletUnitError> {
        match self.accounts.get(params) {
            Some(signer) => Ok(signer.clone()),
            None => self.derive_signer(params),
        }
    }
}

#[async_trait]
impl WalletUnit for EvmWalletUnit {
    fn wallet_uuid(&self) -> Uuid {
        self.wallet_uuid
    }

    async fn unload(&mut self) -> Result<(), WalletUnitError> {
        self.accounts.clear();
        self.root = None;
        Ok(())
    }

    async fn derive_address(&self, params: &Value) -> Result<String, WalletUnitError> {
        let params: EvmAccountParams = parse_params(params)?;
        Ok(self.signer_for(&params)?.address().to_checksum(None))
    }

    async fn derive_multiple(
        &self,
        params: &Value,
    ) -> Result<(usize, Vec<AccountIdentity>), WalletUnitError> {
        let range: EvmAccountRangeParams = parse_params(params)?;

        if range.to_address_index < range.from_address_index {
            return Err(WalletUnitError::InvalidParameters(format!(
                "to_address_index {} is below from_address_index {}",
                range.to_address_index, range.from_address_index
            )));
        }
        if range.to_address_index - range.from_address_index >= MAX_ACCOUNTS_PER_RANGE {
            return Err(WalletUnitError::InvalidParameters(format!(
                "range exceeds {MAX_ACCOUNTS_PER_RANGE} accounts"
            )));
        }

        let root = self.root()?.clone();
        let accounts = tokio::task::spawn_blocking(move || derive_range(&root, range))
            .await
            .map_err(|e| WalletUnitError::Derivation(format!("derivation task failed: {e}")))??;

        Ok((accounts.len(), accounts))
    }

    async fn load_account(&mut self, params: &Value) -> Result<String, WalletUnitError> {
        let params: EvmAccountParams = parse_params(params)?;

        if let Some(signer) = self.accounts.get(&params) {
            return Ok(signer.address().to_checksum(None));
        }

        let signer = self.derive_signer(&params)?;
        let address = signer.address().to_checksum(None);
        self.accounts.insert(params, signer);

        tracing::debug!(
            wallet_uuid = %self.wallet_uuid,
            path = %params.derivation_path(),
            "Account loaded"
        );

        Ok(address)
    }

    async fn sign(
        &mut self,
        params: &Value,
        data: &[u8],
    ) -> Result<(String, Vec<u8>), WalletUnitError> {
        let params: EvmAccountParams = parse_params(params)?;
        let signer = self.signer_for(&params)?;

        let signature = signer
            .sign_hash_sync(&keccak256(data))
            .map_err(|e| WalletUnitError::Signing(e.to_string()))?;

        Ok((
            signer.address().to_checksum(None),
            signature.as_bytes().to_vec(),
        ))
    }
}

impl std::fmt::Debug for EvmWalletUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmWalletUnit")
            .field("wallet_uuid", &self.wallet_uuid)
            .field("chain_id", &self.chain_id)
            .field("loaded_accounts", &self.accounts.len())
            .finish_non_exhaustive()
    }
}
