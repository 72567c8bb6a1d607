use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Every field is optional at the serde level so that handlers can answer a
// missing field with a 400 and a message naming it.

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct GenerateMnemonicRequest {
    pub wallet_uuid: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ValidateMnemonicRequest {
    pub wallet_uuid: Option<String>,
    pub encrypted_mnemonic: Option<String>, // base64, application key
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LoadMnemonicRequest {
    pub wallet_uuid: Option<String>,
    /// Lease length in seconds, must be greater than zero
    pub time_to_live_secs: Option<u64>,
    pub encrypted_mnemonic: Option<String>, // base64, application key
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UnloadMnemonicRequest {
    pub wallet_uuid: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UnloadMultipleMnemonicsRequest {
    pub wallet_uuids: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct EncryptMnemonicRequest {
    pub wallet_uuid: Option<String>,
    pub transit_encrypted_mnemonic: Option<String>, // base64, transit key
}

/// Shared by `/get_account` and `/load_account`
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct AccountRequest {
    pub wallet_uuid: Option<String>,
    /// Chain-specific account selector, e.g. `{"account_index":0,"internal_index":0,"address_index":3}` for EVM
    pub account_parameters: Option<Value>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetMultipleAccountsRequest {
    pub wallet_uuid: Option<String>,
    /// Chain-specific range selector, e.g. `{"from_address_index":0,"to_address_index":9}` for EVM
    pub accounts_parameters: Option<Value>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct SignDataRequest {
    pub wallet_uuid: Option<String>,
    pub account_parameters: Option<Value>,
    pub data_for_signing: Option<String>, // hex, optional 0x prefix
}
