use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::services::encryption::EncryptionBoundary;
use crate::services::wallet::{FactoryInfo, WalletPool, WalletUnitFactory};

/// API endpoint information for documentation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
    pub description: String,
}

/// Central registry of all API endpoints
pub struct ApiEndpoints;

impl ApiEndpoints {
    pub fn get_all() -> Vec<EndpointInfo> {
        [
            ("GET", "/", "Service info: wallet factory, loaded wallets, endpoints"),
            (
                "POST",
                "/generate_mnemonic",
                "Generate a mnemonic, returned encrypted with the application key",
            ),
            (
                "POST",
                "/validate_mnemonic",
                "Check that an application-encrypted mnemonic is valid for this chain",
            ),
            (
                "POST",
                "/load_mnemonic",
                "Load a wallet into memory for a lease, or extend its lease",
            ),
            ("POST", "/unload_mnemonic", "Unload one wallet"),
            (
                "POST",
                "/unload_multiple_mnemonics",
                "Unload several wallets, skipping ones that are not loaded",
            ),
            (
                "POST",
                "/encrypt_mnemonic",
                "Re-encrypt a transit-encrypted mnemonic with the application key",
            ),
            ("POST", "/get_account", "Derive one account address"),
            (
                "POST",
                "/get_multiple_accounts",
                "Derive a range of account addresses",
            ),
            (
                "POST",
                "/load_account",
                "Derive an account and keep it resident for signing",
            ),
            ("POST", "/sign_data", "Sign data with a loaded wallet account"),
        ]
        .into_iter()
        .map(|(method, path, description)| EndpointInfo {
            method: method.to_string(),
            path: path.to_string(),
            description: description.to_string(),
        })
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ServiceInfo {
    pub factory: FactoryInfo,
    pub loaded_wallets: usize,
    pub total_endpoints: usize,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Clone)]
pub struct AppState {
    // Loaded wallet units and their leases
    pub wallet_pool: Arc<WalletPool>,

    // Transit + application encryptors
    pub encryption: EncryptionBoundary,
}

impl AppState {
    pub fn factory(&self) -> &dyn WalletUnitFactory {
        self.wallet_pool.factory().as_ref()
    }
}
