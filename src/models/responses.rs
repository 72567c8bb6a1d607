use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::services::wallet::AccountIdentity;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

/// Application-encrypted mnemonic handed back to the caller
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EncryptedMnemonicResponse {
    pub wallet_uuid: String,
    pub wallet_hash: String,          // hex SHA-256 of the phrase
    pub encrypted_mnemonic: String,   // base64
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidateMnemonicResponse {
    pub wallet_uuid: String,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoadMnemonicResponse {
    pub wallet_uuid: String,
    /// True when the wallet was already loaded and only its lease was extended
    pub already_loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UnloadMnemonicResponse {
    pub wallet_uuid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UnloadMultipleMnemonicsResponse {
    pub requested: usize,
    pub unloaded: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AccountResponse {
    pub wallet_uuid: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MultipleAccountsResponse {
    pub wallet_uuid: String,
    pub account_identities_count: usize,
    pub account_identities: Vec<AccountIdentity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SignDataResponse {
    pub wallet_uuid: String,
    pub address: String,
    pub signed_data: String, // hex, 0x-prefixed
}
