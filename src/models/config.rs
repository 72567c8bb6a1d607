use std::env;
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::services::encryption::{
    AesGcmEncryptor, EncryptionBoundary, Encryptor, VaultTransitEncryptor,
};
use crate::services::wallet::evm::SUPPORTED_WORD_COUNTS;
use crate::services::wallet::{EvmWalletFactory, PoolSettings, WalletUnitFactory};

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Staging,
    Development,
    Local,
}

impl Environment {
    fn parse(value: &str) -> Result<Self, String> {
        match value.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            "local" => Ok(Self::Local),
            _ => Err(format!(
                "Invalid ENV value '{value}'. Must be 'production', 'staging', 'development', or 'local'"
            )),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Statically linked wallet-unit strategies, selected by `HDWALLET_CHAIN`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    Evm,
}

impl ChainKind {
    fn parse(value: &str) -> Result<Self, String> {
        match value.to_lowercase().as_str() {
            "evm" => Ok(Self::Evm),
            _ => Err(format!(
                "Unknown HDWALLET_CHAIN '{value}'. Supported chains: 'evm'"
            )),
        }
    }
}

/// Where the transit and application keys live
#[derive(Clone)]
pub enum EncryptionBackend {
    /// Two hex-encoded AES-256 keys held in process
    Local {
        transit_key: Zeroizing<String>,
        app_key: Zeroizing<String>,
    },
    /// Two named keys in a Vault transit engine
    Vault {
        address: String,
        token: Zeroizing<String>,
        transit_key_name: String,
        app_key_name: String,
    },
}

impl std::fmt::Debug for EncryptionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local { .. } => f.debug_struct("Local").finish_non_exhaustive(),
            Self::Vault {
                address,
                transit_key_name,
                app_key_name,
                ..
            } => f
                .debug_struct("Vault")
                .field("address", address)
                .field("transit_key_name", transit_key_name)
                .field("app_key_name", app_key_name)
                .finish_non_exhaustive(),
        }
    }
}

/// Service configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct KeyKeeperConfig {
    pub environment: Environment,
    pub chain: ChainKind,
    /// EIP-155 chain id attached to derived EVM signers
    pub chain_id: Option<u64>,
    /// Word count of generated mnemonics
    pub words_count: usize,
    pub encryption: EncryptionBackend,
    pub shutdown_grace: Duration,
    pub unit_call_timeout: Option<Duration>,
}

fn required(name: &str) -> Result<String, String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| format!("{name} environment variable not set"))
}

fn parse_secs(name: &str, default: u64) -> Result<u64, String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("Invalid {name} value '{v}': {e}")),
        _ => Ok(default),
    }
}

impl KeyKeeperConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let environment = Environment::parse(&required("ENV")?)?;

        let chain = ChainKind::parse(
            &env::var("HDWALLET_CHAIN").unwrap_or_else(|_| "evm".to_string()),
        )?;

        let chain_id = match env::var("HDWALLET_CHAIN_ID") {
            Ok(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse::<u64>()
                    .map_err(|e| format!("Invalid HDWALLET_CHAIN_ID value '{v}': {e}"))?,
            ),
            _ => None,
        };

        let words_count = match env::var("HDWALLET_WORDS_COUNT") {
            Ok(v) if !v.trim().is_empty() => v
                .trim()
                .parse::<usize>()
                .map_err(|e| format!("Invalid HDWALLET_WORDS_COUNT value '{v}': {e}"))?,
            _ => 24,
        };
        if !SUPPORTED_WORD_COUNTS.contains(&words_count) {
            return Err(format!(
                "Invalid HDWALLET_WORDS_COUNT {words_count}. Must be one of {SUPPORTED_WORD_COUNTS:?}"
            ));
        }
        if environment.is_production() && words_count <= 18 {
            return Err(format!(
                "HDWALLET_WORDS_COUNT {words_count} is too weak for production. Must be greater than 18"
            ));
        }

        let backend = env::var("ENCRYPTION_BACKEND").unwrap_or_else(|_| "local".to_string());
        let encryption = match backend.to_lowercase().as_str() {
            "local" => {
                let transit_key = Zeroizing::new(required("TRANSIT_ENCRYPTION_KEY")?);
                let app_key = Zeroizing::new(required("APP_ENCRYPTION_KEY")?);
                if transit_key.trim().trim_start_matches("0x").to_lowercase()
                    == app_key.trim().trim_start_matches("0x").to_lowercase()
                {
                    return Err(
                        "TRANSIT_ENCRYPTION_KEY and APP_ENCRYPTION_KEY must be different keys"
                            .to_string(),
                    );
                }
                EncryptionBackend::Local {
                    transit_key,
                    app_key,
                }
            }
            "vault" => {
                let transit_key_name = required("VAULT_COMMON_TRANSIT_KEY")?;
                let app_key_name = required("VAULT_APP_ENCRYPTION_KEY")?;
                if transit_key_name == app_key_name {
                    return Err(
                        "VAULT_COMMON_TRANSIT_KEY and VAULT_APP_ENCRYPTION_KEY must name different keys"
                            .to_string(),
                    );
                }
                EncryptionBackend::Vault {
                    address: required("VAULT_ADDR")?,
                    token: Zeroizing::new(required("VAULT_TOKEN")?),
                    transit_key_name,
                    app_key_name,
                }
            }
            _ => {
                return Err(format!(
                    "Invalid ENCRYPTION_BACKEND value '{backend}'. Must be 'local' or 'vault'"
                ));
            }
        };

        let unit_call_timeout = match parse_secs("WALLET_UNIT_CALL_TIMEOUT_SECS", 30)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            environment,
            chain,
            chain_id,
            words_count,
            encryption,
            shutdown_grace: Duration::from_secs(parse_secs("WALLET_POOL_SHUTDOWN_GRACE_SECS", 10)?),
            unit_call_timeout,
        })
    }

    /// Build the wallet-unit factory selected by `HDWALLET_CHAIN`
    pub fn build_factory(&self) -> Result<Arc<dyn WalletUnitFactory>, String> {
        match self.chain {
            ChainKind::Evm => {
                let factory = EvmWalletFactory::new(self.chain_id, self.words_count)
                    .map_err(|e| format!("Failed to build EVM wallet factory: {e}"))?;
                Ok(Arc::new(factory))
            }
        }
    }

    /// Build the transit/application encryptor pair
    pub fn build_encryption_boundary(&self) -> Result<EncryptionBoundary, String> {
        let (transit, application): (Arc<dyn Encryptor>, Arc<dyn Encryptor>) =
            match &self.encryption {
                EncryptionBackend::Local {
                    transit_key,
                    app_key,
                } => (
                    Arc::new(
                        AesGcmEncryptor::from_hex(transit_key)
                            .map_err(|e| format!("Invalid TRANSIT_ENCRYPTION_KEY: {e}"))?,
                    ),
                    Arc::new(
                        AesGcmEncryptor::from_hex(app_key)
                            .map_err(|e| format!("Invalid APP_ENCRYPTION_KEY: {e}"))?,
                    ),
                ),
                EncryptionBackend::Vault {
                    address,
                    token,
                    transit_key_name,
                    app_key_name,
                } => (
                    Arc::new(
                        VaultTransitEncryptor::new(
                            address.clone(),
                            token.as_str().to_string(),
                            transit_key_name.clone(),
                        )
                        .map_err(|e| format!("Failed to build Vault transit encryptor: {e}"))?,
                    ),
                    Arc::new(
                        VaultTransitEncryptor::new(
                            address.clone(),
                            token.as_str().to_string(),
                            app_key_name.clone(),
                        )
                        .map_err(|e| format!("Failed to build Vault app encryptor: {e}"))?,
                    ),
                ),
            };

        Ok(EncryptionBoundary::new(transit, application))
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            shutdown_grace: self.shutdown_grace,
            unit_call_timeout: self.unit_call_timeout,
        }
    }
}
