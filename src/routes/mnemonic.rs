use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rocket::serde::json::Json;
use rocket::{State, http::Status, post};
use rocket_okapi::openapi;
use std::time::Duration;
use uuid::Uuid;

use super::{
    ApiResult, decode_base64, mnemonic_error, not_loaded, parse_wallet_uuid, pool_error, reject,
    require, sentry_scope, success,
};
use crate::models::{
    AppState, EncryptMnemonicRequest, EncryptedMnemonicResponse, GenerateMnemonicRequest,
    LoadMnemonicRequest, LoadMnemonicResponse, UnloadMnemonicRequest, UnloadMnemonicResponse,
    UnloadMultipleMnemonicsRequest, UnloadMultipleMnemonicsResponse, ValidateMnemonicRequest,
    ValidateMnemonicResponse,
};
use crate::services::wallet::AdmitOutcome;

/// Generates a new mnemonic.
///
/// The phrase is validated, encrypted with the application key and returned
/// together with its SHA-256 hash. Plaintext never leaves the service.
#[openapi(tag = "Mnemonic")]
#[post("/generate_mnemonic", format = "json", data = "<request>")]
pub async fn generate_mnemonic(
    state: &State<AppState>,
    request: Json<GenerateMnemonicRequest>,
) -> ApiResult<EncryptedMnemonicResponse> {
    tracing::info!("Received request: POST /generate_mnemonic");
    let wallet_uuid = parse_wallet_uuid(&request.wallet_uuid)?;
    let _guard = sentry_scope("/generate_mnemonic", Some(wallet_uuid));

    let generated = state
        .encryption
        .generate_mnemonic(state.factory())
        .await
        .map_err(|e| mnemonic_error("GenerateMnemonic", e))?;

    tracing::info!(
        wallet_uuid = %wallet_uuid,
        wallet_hash = %generated.wallet_hash,
        "Mnemonic generated"
    );

    success(
        EncryptedMnemonicResponse {
            wallet_uuid: wallet_uuid.to_string(),
            wallet_hash: generated.wallet_hash,
            encrypted_mnemonic: BASE64.encode(&generated.encrypted_mnemonic),
        },
        "Mnemonic generated",
    )
}

/// Validates an application-encrypted mnemonic against this chain's rules.
#[openapi(tag = "Mnemonic")]
#[post("/validate_mnemonic", format = "json", data = "<request>")]
pub async fn validate_mnemonic(
    state: &State<AppState>,
    request: Json<ValidateMnemonicRequest>,
) -> ApiResult<ValidateMnemonicResponse> {
    tracing::info!("Received request: POST /validate_mnemonic");
    let wallet_uuid = parse_wallet_uuid(&request.wallet_uuid)?;
    let encrypted = decode_base64(&request.encrypted_mnemonic, "encrypted_mnemonic")?;
    let _guard = sentry_scope("/validate_mnemonic", Some(wallet_uuid));

    let is_valid = state
        .encryption
        .validate_mnemonic(state.factory(), &encrypted)
        .await
        .map_err(|e| mnemonic_error("ValidateMnemonic", e))?;

    success(
        ValidateMnemonicResponse {
            wallet_uuid: wallet_uuid.to_string(),
            is_valid,
        },
        if is_valid {
            "Mnemonic is valid"
        } else {
            "Mnemonic is not valid"
        },
    )
}

/// Re-encrypts a transit-encrypted mnemonic with the application key.
#[openapi(tag = "Mnemonic")]
#[post("/encrypt_mnemonic", format = "json", data = "<request>")]
pub async fn encrypt_mnemonic(
    state: &State<AppState>,
    request: Json<EncryptMnemonicRequest>,
) -> ApiResult<EncryptedMnemonicResponse> {
    tracing::info!("Received request: POST /encrypt_mnemonic");
    let wallet_uuid = parse_wallet_uuid(&request.wallet_uuid)?;
    let transit = decode_base64(
        &request.transit_encrypted_mnemonic,
        "transit_encrypted_mnemonic",
    )?;
    let _guard = sentry_scope("/encrypt_mnemonic", Some(wallet_uuid));

    let encrypted = state
        .encryption
        .encrypt_transit_mnemonic(state.factory(), &transit)
        .await
        .map_err(|e| mnemonic_error("EncryptMnemonic", e))?;

    success(
        EncryptedMnemonicResponse {
            wallet_uuid: wallet_uuid.to_string(),
            wallet_hash: encrypted.wallet_hash,
            encrypted_mnemonic: BASE64.encode(&encrypted.encrypted_mnemonic),
        },
        "Mnemonic encrypted",
    )
}

/// Loads a wallet into memory for `time_to_live_secs`.
///
/// Loading an already loaded wallet extends its lease if the new deadline is
/// later; it never shortens it.
#[openapi(tag = "Mnemonic")]
#[post("/load_mnemonic", format = "json", data = "<request>")]
pub async fn load_mnemonic(
    state: &State<AppState>,
    request: Json<LoadMnemonicRequest>,
) -> ApiResult<LoadMnemonicResponse> {
    tracing::info!("Received request: POST /load_mnemonic");
    let wallet_uuid = parse_wallet_uuid(&request.wallet_uuid)?;
    let ttl_secs = *require(&request.time_to_live_secs, "time_to_live_secs")?;
    if ttl_secs == 0 {
        return Err(reject(
            Status::BadRequest,
            "time_to_live_secs must be greater than zero",
        ));
    }
    let encrypted = decode_base64(&request.encrypted_mnemonic, "encrypted_mnemonic")?;
    let _guard = sentry_scope("/load_mnemonic", Some(wallet_uuid));

    let outcome = state
        .wallet_pool
        .admit(wallet_uuid, Duration::from_secs(ttl_secs), &encrypted)
        .await
        .map_err(|e| pool_error("LoadMnemonic", e))?;

    let already_loaded = outcome == AdmitOutcome::Extended;
    success(
        LoadMnemonicResponse {
            wallet_uuid: wallet_uuid.to_string(),
            already_loaded,
        },
        if already_loaded {
            "Wallet already loaded, lease extended"
        } else {
            "Wallet loaded"
        },
    )
}

/// Unloads one wallet. Teardown finishes in the background.
#[openapi(tag = "Mnemonic")]
#[post("/unload_mnemonic", format = "json", data = "<request>")]
pub async fn unload_mnemonic(
    state: &State<AppState>,
    request: Json<UnloadMnemonicRequest>,
) -> ApiResult<UnloadMnemonicResponse> {
    tracing::info!("Received request: POST /unload_mnemonic");
    let wallet_uuid = parse_wallet_uuid(&request.wallet_uuid)?;

    match state.wallet_pool.release(wallet_uuid).await {
        Some(released) => success(
            UnloadMnemonicResponse {
                wallet_uuid: released.to_string(),
            },
            "Wallet unload started",
        ),
        None => not_loaded(wallet_uuid),
    }
}

/// Unloads several wallets; identifiers that are not loaded are skipped.
#[openapi(tag = "Mnemonic")]
#[post("/unload_multiple_mnemonics", format = "json", data = "<request>")]
pub async fn unload_multiple_mnemonics(
    state: &State<AppState>,
    request: Json<UnloadMultipleMnemonicsRequest>,
) -> ApiResult<UnloadMultipleMnemonicsResponse> {
    tracing::info!("Received request: POST /unload_multiple_mnemonics");
    let raw = require(&request.wallet_uuids, "wallet_uuids")?;

    let wallet_uuids = raw
        .iter()
        .map(|id| {
            Uuid::parse_str(id.trim()).map_err(|e| {
                reject(
                    Status::BadRequest,
                    format!("Invalid wallet_uuid '{id}': {e}"),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let unloaded = state
        .wallet_pool
        .release_many(&wallet_uuids)
        .await
        .map_err(|e| pool_error("UnLoadMultipleMnemonics", e))?;

    success(
        UnloadMultipleMnemonicsResponse {
            requested: wallet_uuids.len(),
            unloaded,
        },
        format!("{unloaded} of {} wallets unload started", wallet_uuids.len()),
    )
}
