//! Mock wallet-unit factory for testing
//!
//! Produces units that answer with a configured address and counts every
//! construction and unload, so pool behaviour can be asserted without real
//! key derivation.

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::factory::{
    AccountIdentity, FactoryError, FactoryInfo, WalletUnit, WalletUnitError, WalletUnitFactory,
};

/// Phrase returned by [`MockWalletFactory::generate_mnemonic`] unless overridden
pub const MOCK_PHRASE: &str =
    "legal winner thank year wave sausage worth useful legal winner thank yellow";

const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

#[derive(Debug, Default)]
struct MockCounters {
    constructions: AtomicUsize,
    unloads: AtomicUsize,
    fail_construction: AtomicBool,
    fail_unload: AtomicBool,
}

/// Mock factory with shared construction/unload counters
#[derive(Debug, Clone)]
pub struct MockWalletFactory {
    info: FactoryInfo,
    address: String,
    generated_phrase: String,
    call_delay: Option<Duration>,
    counters: Arc<MockCounters>,
}

impl MockWalletFactory {
    /// Create a mock whose units derive `address` for every account
    pub fn new(address: &str) -> Self {
        Self {
            info: FactoryInfo {
                name: "mock".to_string(),
                release_tag: "v0.0.0-test".to_string(),
                commit_id: "0000000000000000000000000000000000000000".to_string(),
                short_commit_id: "00000000".to_string(),
                build_number: 0,
                build_date_ts: 0,
            },
            address: address.to_string(),
            generated_phrase: MOCK_PHRASE.to_string(),
            call_delay: None,
            counters: Arc::new(MockCounters::default()),
        }
    }

    /// Override the phrase returned by `generate_mnemonic`
    pub fn with_generated_phrase(mut self, phrase: &str) -> Self {
        self.generated_phrase = phrase.to_string();
        self
    }

    /// Make every derive/load/sign call sleep before answering
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Make subsequent `new_unit` calls fail
    pub fn fail_construction(&self, fail: bool) {
        self.counters.fail_construction.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `unload` calls report an error (the unit still counts the call)
    pub fn fail_unload(&self, fail: bool) {
        self.counters.fail_unload.store(fail, Ordering::SeqCst);
    }

    /// Number of units constructed so far
    pub fn constructions(&self) -> usize {
        self.counters.constructions.load(Ordering::SeqCst)
    }

    /// Number of unit unloads so far
    pub fn unloads(&self) -> usize {
        self.counters.unloads.load(Ordering::SeqCst)
    }
}

impl WalletUnitFactory for MockWalletFactory {
    fn info(&self) -> &FactoryInfo {
        &self.info
    }

    fn generate_mnemonic(&self) -> Result<Zeroizing<String>, FactoryError> {
        Ok(Zeroizing::new(self.generated_phrase.clone()))
    }

    fn validate_mnemonic(&self, phrase: &str) -> bool {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        VALID_WORD_COUNTS.contains(&words.len())
            && words
                .iter()
                .all(|w| w.chars().all(|c| c.is_ascii_lowercase()))
    }

    fn new_unit(
        &self,
        wallet_uuid: Uuid,
        mnemonic: &[u8],
    ) -> Result<Box<dyn WalletUnit>, FactoryError> {
        if self.counters.fail_construction.load(Ordering::SeqCst) {
            return Err(FactoryError::Construction(
                "mock construction failure".to_string(),
            ));
        }

        let valid = std::str::from_utf8(mnemonic).is_ok_and(|p| self.validate_mnemonic(p));
        if !valid {
            return Err(FactoryError::InvalidMnemonic(
                "mock validator rejected phrase".to_string(),
            ));
        }

        self.counters.constructions.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockWalletUnit {
            wallet_uuid,
            address: self.address.clone(),
            call_delay: self.call_delay,
            counters: Arc::clone(&self.counters),
            loaded: true,
        }))
    }
}

/// Unit produced by [`MockWalletFactory`]
#[derive(Debug)]
pub struct MockWalletUnit {
    wallet_uuid: Uuid,
    address: String,
    call_delay: Option<Duration>,
    counters: Arc<MockCounters>,
    loaded: bool,
}

impl MockWalletUnit {
    async fn answer(&self) -> Result<(), WalletUnitError> {
        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }
        if !self.loaded {
            return Err(WalletUnitError::Derivation("mock unit unloaded".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl WalletUnit for MockWalletUnit {
    fn wallet_uuid(&self) -> Uuid {
        self.wallet_uuid
    }

    async fn unload(&mut self) -> Result<(), WalletUnitError> {
        self.counters.unloads.fetch_add(1, Ordering::SeqCst);
        self.loaded = false;

        if self.counters.fail_unload.load(Ordering::SeqCst) {
            return Err(WalletUnitError::Unload("mock unload failure".to_string()));
        }
        Ok(())
    }

    async fn derive_address(&self, _params: &Value) -> Result<String, WalletUnitError> {
        self.answer().await?;
        Ok(self.address.clone())
    }

    async fn derive_multiple(
        &self,
        params: &Value,
    ) -> Result<(usize, Vec<AccountIdentity>), WalletUnitError> {
        self.answer().await?;

        let count = match params.get("count") {
            None => 1,
            Some(v) => v.as_u64().ok_or_else(|| {
                WalletUnitError::InvalidParameters("count must be an unsigned integer".to_string())
            })? as usize,
        };

        let accounts = (0..count)
            .map(|i| AccountIdentity {
                address: format!("{}-{i}", self.address),
                parameters: serde_json::json!({ "index": i }),
            })
            .collect::<Vec<_>>();

        Ok((accounts.len(), accounts))
    }

    async fn load_account(&mut self, _params: &Value) -> Result<String, WalletUnitError> {
        self.answer().await?;
        Ok(self.address.clone())
    }

    async fn sign(
        &mut self,
        _params: &Value,
        data: &[u8],
    ) -> Result<(String, Vec<u8>), WalletUnitError> {
        self.answer().await?;
        Ok((self.address.clone(), Sha256::digest(data).to_vec()))
    }
}
