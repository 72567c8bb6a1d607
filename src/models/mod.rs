pub mod app_state;
pub mod config;
pub mod requests;
pub mod responses;

pub use app_state::{ApiEndpoints, AppState, EndpointInfo, ServiceInfo};
pub use config::{ChainKind, EncryptionBackend, Environment, KeyKeeperConfig};
pub use requests::{
    AccountRequest, EncryptMnemonicRequest, GenerateMnemonicRequest, GetMultipleAccountsRequest,
    LoadMnemonicRequest, SignDataRequest, UnloadMnemonicRequest, UnloadMultipleMnemonicsRequest,
    ValidateMnemonicRequest,
};
pub use responses::{
    AccountResponse, ApiResponse, EncryptedMnemonicResponse, LoadMnemonicResponse,
    MultipleAccountsResponse, SignDataResponse, UnloadMnemonicResponse,
    UnloadMultipleMnemonicsResponse, ValidateMnemonicResponse,
};
