//! Unit handle: one live wallet unit plus its lease and eviction watcher
//!
//! State machine:
//!
//! ```text
//! Armed --(deadline reached | release | pool shutdown)--> Evicting
//! Evicting --(unit unloaded and dropped)--> ShutdownComplete
//! ShutdownComplete --(reaper removed the map entry)--> Removed
//! ```
//!
//! The first trigger wins; the lease can only be extended while `Armed`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedMutexGuard, mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::factory::WalletUnit;

/// Leases longer than this are clamped
const MAX_LEASE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Lifecycle phase of a [`UnitHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Armed,
    Evicting,
    ShutdownComplete,
    Removed,
}

/// Sent by a watcher once its unit is shut down; the reaper acknowledges after removal
#[derive(Debug)]
pub(crate) struct EvictionNotice {
    pub wallet_uuid: Uuid,
    pub generation: u64,
    pub ack: oneshot::Sender<()>,
}

pub(crate) type UnitSlot = Option<Box<dyn WalletUnit>>;

#[derive(Debug)]
struct Lease {
    deadline: Instant,
    state: HandleState,
}

struct HandleShared {
    wallet_uuid: Uuid,
    generation: u64,
    lifetime: CancellationToken,
    lease: Mutex<Lease>,
    unit: Arc<tokio::sync::Mutex<UnitSlot>>,
}

impl HandleShared {
    fn lease(&self) -> MutexGuard<'_, Lease> {
        self.lease.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: HandleState) {
        self.lease().state = state;
    }

    /// Armed -> Evicting; returns false if eviction had already started
    fn begin_eviction(&self) -> bool {
        let mut lease = self.lease();
        if lease.state == HandleState::Armed {
            lease.state = HandleState::Evicting;
            true
        } else {
            false
        }
    }
}

fn deadline_after(ttl: Duration) -> Instant {
    Instant::now() + ttl.min(MAX_LEASE)
}

/// Pool-owned wrapper around one wallet unit
pub struct UnitHandle {
    shared: Arc<HandleShared>,
}

impl UnitHandle {
    /// Wrap `unit` and start its eviction watcher.
    ///
    /// Returns only once the watcher is running, so the lease timer is armed
    /// before the caller can observe the handle.
    pub(crate) async fn arm(
        unit: Box<dyn WalletUnit>,
        generation: u64,
        ttl: Duration,
        pool_lifetime: &CancellationToken,
        notices: mpsc::Sender<EvictionNotice>,
    ) -> Self {
        let shared = Arc::new(HandleShared {
            wallet_uuid: unit.wallet_uuid(),
            generation,
            lifetime: pool_lifetime.child_token(),
            lease: Mutex::new(Lease {
                deadline: deadline_after(ttl),
                state: HandleState::Armed,
            }),
            unit: Arc::new(tokio::sync::Mutex::new(Some(unit))),
        });

        let (armed_tx, armed_rx) = oneshot::channel();
        tokio::spawn(watch(Arc::clone(&shared), notices, armed_tx));
        if armed_rx.await.is_err() {
            tracing::error!(
                wallet_uuid = %shared.wallet_uuid,
                "Eviction watcher exited before arming"
            );
        }

        Self { shared }
    }

    pub fn wallet_uuid(&self) -> Uuid {
        self.shared.wallet_uuid
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation
    }

    pub fn state(&self) -> HandleState {
        self.shared.lease().state
    }

    pub fn deadline(&self) -> Instant {
        self.shared.lease().deadline
    }

    /// Push the deadline to `now + ttl` if that is later than the current one.
    ///
    /// Returns false when the handle is no longer `Armed` and cannot be extended.
    pub(crate) fn extend_lease(&self, ttl: Duration) -> bool {
        let mut lease = self.shared.lease();
        if lease.state != HandleState::Armed {
            return false;
        }

        let candidate = deadline_after(ttl);
        if candidate > lease.deadline {
            lease.deadline = candidate;
        }
        true
    }

    /// Trigger eviction; teardown completes asynchronously on the watcher
    pub(crate) fn release(&self) {
        self.shared.begin_eviction();
        self.shared.lifetime.cancel();
    }

    pub(crate) fn mark_removed(&self) {
        self.shared.set_state(HandleState::Removed);
    }

    /// Lock the unit for a delegated call, or `None` once eviction has started
    pub(crate) async fn checkout(&self) -> Option<OwnedMutexGuard<UnitSlot>> {
        if self.state() != HandleState::Armed {
            return None;
        }

        let guard = Arc::clone(&self.shared.unit).lock_owned().await;
        guard.is_some().then_some(guard)
    }
}

impl std::fmt::Debug for UnitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitHandle")
            .field("wallet_uuid", &self.shared.wallet_uuid)
            .field("generation", &self.shared.generation)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Expired,
    Cancelled,
}

async fn watch(
    shared: Arc<HandleShared>,
    notices: mpsc::Sender<EvictionNotice>,
    armed: oneshot::Sender<()>,
) {
    let _ = armed.send(());

    let trigger = loop {
        let deadline = shared.lease().deadline;

        tokio::select! {
            biased;

            _ = shared.lifetime.cancelled() => {
                shared.begin_eviction();
                break Trigger::Cancelled;
            }
            _ = tokio::time::sleep_until(deadline) => {
                let mut lease = shared.lease();
                if lease.deadline > deadline {
                    // extended while sleeping
                    continue;
                }
                if lease.state == HandleState::Armed {
                    lease.state = HandleState::Evicting;
                }
                break Trigger::Expired;
            }
        }
    };

    tracing::info!(
        wallet_uuid = %shared.wallet_uuid,
        generation = shared.generation,
        trigger = ?trigger,
        "Evicting wallet"
    );

    shared.lifetime.cancel();

    let unit = shared.unit.lock().await.take();
    if let Some(mut unit) = unit {
        if let Err(e) = unit.unload().await {
            tracing::warn!(
                wallet_uuid = %shared.wallet_uuid,
                "Wallet unit unload reported an error: {}",
                e
            );
        }
        drop(unit);
    }
    shared.set_state(HandleState::ShutdownComplete);

    let (ack_tx, ack_rx) = oneshot::channel();
    let notice = EvictionNotice {
        wallet_uuid: shared.wallet_uuid,
        generation: shared.generation,
        ack: ack_tx,
    };

    if notices.send(notice).await.is_err() {
        tracing::warn!(
            wallet_uuid = %shared.wallet_uuid,
            "Reaper stopped before eviction could be acknowledged"
        );
        return;
    }

    if ack_rx.await.is_err() {
        tracing::warn!(
            wallet_uuid = %shared.wallet_uuid,
            "Reaper dropped eviction acknowledgement"
        );
    }
}
