//! Wallet custody: loaded units, their leases, and the factories that build them
//!
//! - WalletUnitFactory / WalletUnit: per-blockchain strategy the pool consumes
//! - EvmWalletFactory: statically linked EVM strategy (key `evm`)
//! - UnitHandle: one live unit with its lease and eviction watcher
//! - WalletPool: map of loaded units plus the reaper that removes evicted ones

pub mod evm;
pub mod factory;
pub mod mock;
pub mod pool;
pub mod unit;

pub use evm::{EvmAccountParams, EvmAccountRangeParams, EvmWalletFactory};
pub use factory::{
    AccountIdentity, FactoryError, FactoryInfo, WalletUnit, WalletUnitError, WalletUnitFactory,
};
pub use mock::{MockWalletFactory, MockWalletUnit};
pub use pool::{AdmitOutcome, PoolError, PoolSettings, WalletPool};
pub use unit::{HandleState, UnitHandle};
