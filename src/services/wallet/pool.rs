//! In-memory wallet pool
//!
//! Owns every loaded wallet unit, keyed by wallet session UUID. A single
//! pool-wide lock guards both map mutation and delegated unit calls, so at most
//! one unit is ever under construction for a given identifier. A background
//! reaper removes entries once their eviction watcher has shut the unit down.

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::factory::{AccountIdentity, FactoryError, WalletUnitError, WalletUnitFactory};
use super::unit::{EvictionNotice, HandleState, UnitHandle, UnitSlot};
use crate::services::encryption::{EncryptionError, Encryptor};

/// Errors raised by [`WalletPool`] operations
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Failed to decrypt mnemonic: {0}")]
    Decryption(#[source] EncryptionError),

    #[error("Failed to construct wallet unit: {0}")]
    UnitConstruction(#[source] FactoryError),

    #[error("Wallet {0} is not loaded")]
    WalletNotFound(Uuid),

    #[error("Wallet unit call failed: {0}")]
    Unit(#[from] WalletUnitError),

    #[error("Wallet unit call timed out after {0:?}")]
    UnitTimeout(Duration),

    #[error("Wallet pool is shutting down")]
    ShuttingDown,

    #[error("No wallet identifiers given")]
    EmptyIdentifierList,
}

/// Result of a successful [`WalletPool::admit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// A new unit was constructed and armed
    Loaded,
    /// The wallet was already loaded; its lease was extended if the new deadline is later
    Extended,
}

/// Tunables for [`WalletPool`]
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// How long shutdown waits for loaded wallets to be evicted and acknowledged
    pub shutdown_grace: Duration,
    /// Bound on a single delegated unit call; `None` disables it
    pub unit_call_timeout: Option<Duration>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            shutdown_grace: Duration::from_secs(10),
            unit_call_timeout: Some(Duration::from_secs(30)),
        }
    }
}

type Entries = Arc<Mutex<HashMap<Uuid, UnitHandle>>>;

/// Pool of loaded wallet units with per-entry leases
pub struct WalletPool {
    factory: Arc<dyn WalletUnitFactory>,
    encryptor: Arc<dyn Encryptor>,
    entries: Entries,
    notices: mpsc::Sender<EvictionNotice>,
    lifetime: CancellationToken,
    generation: AtomicU64,
    settings: PoolSettings,
    reaper: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl WalletPool {
    /// Create the pool and spawn its reaper. Must be called inside a Tokio runtime.
    pub fn new(
        factory: Arc<dyn WalletUnitFactory>,
        application_encryptor: Arc<dyn Encryptor>,
        settings: PoolSettings,
    ) -> Self {
        let entries: Entries = Arc::new(Mutex::new(HashMap::new()));
        // Capacity 1 plus the ack makes each eviction a rendezvous with the reaper
        let (notices, receiver) = mpsc::channel(1);
        let lifetime = CancellationToken::new();

        let reaper = tokio::spawn(reap(
            Arc::clone(&entries),
            receiver,
            lifetime.clone(),
            settings.shutdown_grace,
        ));

        tracing::info!(
            factory = %factory.info().name,
            shutdown_grace_secs = settings.shutdown_grace.as_secs(),
            "Wallet pool started"
        );

        Self {
            factory,
            encryptor: application_encryptor,
            entries,
            notices,
            lifetime,
            generation: AtomicU64::new(0),
            settings,
            reaper: std::sync::Mutex::new(Some(reaper)),
        }
    }

    pub fn factory(&self) -> &Arc<dyn WalletUnitFactory> {
        &self.factory
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    /// Load a wallet, or extend the lease of an already loaded one.
    ///
    /// The lease is only ever moved forward. On return the eviction timer of
    /// the entry is armed.
    pub async fn admit(
        &self,
        wallet_uuid: Uuid,
        ttl: Duration,
        encrypted_mnemonic: &[u8],
    ) -> Result<AdmitOutcome, PoolError> {
        if self.is_shutting_down() {
            return Err(PoolError::ShuttingDown);
        }

        let mut entries = self.entries.lock().await;
        if self.is_shutting_down() {
            return Err(PoolError::ShuttingDown);
        }

        if let Some(handle) = entries.get(&wallet_uuid)
            && handle.extend_lease(ttl)
        {
            tracing::debug!(
                wallet_uuid = %wallet_uuid,
                ttl_secs = ttl.as_secs(),
                "Wallet already loaded, lease extended"
            );
            return Ok(AdmitOutcome::Extended);
        }

        let unit = {
            let mnemonic = self
                .encryptor
                .decrypt(encrypted_mnemonic)
                .await
                .map_err(PoolError::Decryption)?;

            // Key stretching is CPU bound
            let factory = Arc::clone(&self.factory);
            tokio::task::spawn_blocking(move || factory.new_unit(wallet_uuid, &mnemonic))
                .await
                .map_err(|e| {
                    PoolError::UnitConstruction(FactoryError::Construction(format!(
                        "construction task failed: {e}"
                    )))
                })?
                .map_err(PoolError::UnitConstruction)?
        };

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let handle = UnitHandle::arm(
            unit,
            generation,
            ttl,
            &self.lifetime,
            self.notices.clone(),
        )
        .await;

        if let Some(previous) = entries.insert(wallet_uuid, handle) {
            tracing::debug!(
                wallet_uuid = %wallet_uuid,
                generation = previous.generation(),
                "Replaced entry that was already evicting"
            );
        }

        tracing::info!(
            wallet_uuid = %wallet_uuid,
            ttl_secs = ttl.as_secs(),
            generation,
            "Wallet loaded"
        );

        Ok(AdmitOutcome::Loaded)
    }

    /// Trigger eviction of one wallet; `None` if it was not loaded
    pub async fn release(&self, wallet_uuid: Uuid) -> Option<Uuid> {
        let entries = self.entries.lock().await;
        let handle = entries.get(&wallet_uuid)?;

        handle.release();
        tracing::info!(wallet_uuid = %wallet_uuid, "Wallet unload requested");
        Some(wallet_uuid)
    }

    /// Trigger eviction of every loaded wallet in `wallet_uuids`, skipping the rest.
    ///
    /// Returns how many were released.
    pub async fn release_many(&self, wallet_uuids: &[Uuid]) -> Result<usize, PoolError> {
        if wallet_uuids.is_empty() {
            return Err(PoolError::EmptyIdentifierList);
        }

        let entries = self.entries.lock().await;
        let mut released = 0;
        for wallet_uuid in wallet_uuids {
            if let Some(handle) = entries.get(wallet_uuid) {
                handle.release();
                released += 1;
            }
        }

        tracing::info!(
            requested = wallet_uuids.len(),
            released,
            "Multiple wallets unload requested"
        );
        Ok(released)
    }

    /// Derive one address; `Ok(None)` if the wallet is not loaded
    pub async fn derive_address(
        &self,
        wallet_uuid: Uuid,
        params: &Value,
    ) -> Result<Option<String>, PoolError> {
        let entries = self.entries.lock().await;
        let Some(mut slot) = checkout(&entries, wallet_uuid).await else {
            return Ok(None);
        };
        let Some(unit) = slot.as_deref_mut() else {
            return Ok(None);
        };

        self.bounded(unit.derive_address(params)).await.map(Some)
    }

    /// Derive a batch of accounts; `Ok(None)` if the wallet is not loaded
    pub async fn derive_multiple(
        &self,
        wallet_uuid: Uuid,
        params: &Value,
    ) -> Result<Option<(usize, Vec<AccountIdentity>)>, PoolError> {
        let entries = self.entries.lock().await;
        let Some(mut slot) = checkout(&entries, wallet_uuid).await else {
            return Ok(None);
        };
        let Some(unit) = slot.as_deref_mut() else {
            return Ok(None);
        };

        self.bounded(unit.derive_multiple(params)).await.map(Some)
    }

    /// Load an account for signing; `Ok(None)` if the wallet is not loaded
    pub async fn load_account(
        &self,
        wallet_uuid: Uuid,
        params: &Value,
    ) -> Result<Option<String>, PoolError> {
        let entries = self.entries.lock().await;
        let Some(mut slot) = checkout(&entries, wallet_uuid).await else {
            return Ok(None);
        };
        let Some(unit) = slot.as_deref_mut() else {
            return Ok(None);
        };

        self.bounded(unit.load_account(params)).await.map(Some)
    }

    /// Sign `data`, returning `(address, signature)`.
    ///
    /// Unlike the read accessors, a wallet that is not loaded is an error
    /// ([`PoolError::WalletNotFound`]).
    pub async fn sign(
        &self,
        wallet_uuid: Uuid,
        params: &Value,
        data: &[u8],
    ) -> Result<(String, Vec<u8>), PoolError> {
        let entries = self.entries.lock().await;
        let Some(mut slot) = checkout(&entries, wallet_uuid).await else {
            return Err(PoolError::WalletNotFound(wallet_uuid));
        };
        let Some(unit) = slot.as_deref_mut() else {
            return Err(PoolError::WalletNotFound(wallet_uuid));
        };

        self.bounded(unit.sign(params, data)).await
    }

    /// Number of entries currently in the map (including ones being evicted)
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn contains(&self, wallet_uuid: Uuid) -> bool {
        self.entries.lock().await.contains_key(&wallet_uuid)
    }

    pub async fn state_of(&self, wallet_uuid: Uuid) -> Option<HandleState> {
        self.entries
            .lock()
            .await
            .get(&wallet_uuid)
            .map(UnitHandle::state)
    }

    pub async fn deadline_of(&self, wallet_uuid: Uuid) -> Option<Instant> {
        self.entries
            .lock()
            .await
            .get(&wallet_uuid)
            .map(UnitHandle::deadline)
    }

    /// Evict every loaded wallet and wait for the reaper's bounded drain
    pub async fn shutdown(&self) {
        let loaded = self.len().await;
        tracing::info!(loaded, "Shutting down wallet pool");
        self.lifetime.cancel();

        let reaper = self
            .reaper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(reaper) = reaper
            && let Err(e) = reaper.await
        {
            tracing::error!("Wallet pool reaper failed: {}", e);
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, WalletUnitError>>,
    ) -> Result<T, PoolError> {
        match self.settings.unit_call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| PoolError::UnitTimeout(limit))?
                .map_err(PoolError::Unit),
            None => call.await.map_err(PoolError::Unit),
        }
    }
}

impl Drop for WalletPool {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

impl std::fmt::Debug for WalletPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletPool")
            .field("factory", &self.factory.info().name)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

async fn checkout(
    entries: &HashMap<Uuid, UnitHandle>,
    wallet_uuid: Uuid,
) -> Option<OwnedMutexGuard<UnitSlot>> {
    entries.get(&wallet_uuid)?.checkout().await
}

async fn remove_evicted(entries: &Entries, notice: EvictionNotice) {
    {
        let mut entries = entries.lock().await;
        let current = entries
            .get(&notice.wallet_uuid)
            .is_some_and(|h| h.generation() == notice.generation);

        if current && let Some(handle) = entries.remove(&notice.wallet_uuid) {
            handle.mark_removed();
            tracing::debug!(
                wallet_uuid = %notice.wallet_uuid,
                generation = notice.generation,
                remaining = entries.len(),
                "Evicted wallet removed from pool"
            );
        }
    }

    let _ = notice.ack.send(());
}

async fn reap(
    entries: Entries,
    mut notices: mpsc::Receiver<EvictionNotice>,
    lifetime: CancellationToken,
    grace: Duration,
) {
    loop {
        tokio::select! {
            Some(notice) = notices.recv() => remove_evicted(&entries, notice).await,
            _ = lifetime.cancelled() => break,
        }
    }

    // Every watcher is a child of `lifetime`, so each remaining entry will report in
    let drain = async {
        while !entries.lock().await.is_empty() {
            match notices.recv().await {
                Some(notice) => remove_evicted(&entries, notice).await,
                None => break,
            }
        }
    };

    if tokio::time::timeout(grace, drain).await.is_err() {
        let remaining = entries.lock().await.len();
        tracing::warn!(
            remaining,
            grace_secs = grace.as_secs(),
            "Wallet pool shutdown grace period elapsed with wallets still loaded"
        );
    } else {
        tracing::info!("Wallet pool drained");
    }
}
