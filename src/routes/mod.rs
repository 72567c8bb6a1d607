use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rocket::http::Status;
use rocket::serde::json::Json;
use std::fmt::Display;
use uuid::Uuid;

use crate::models::ApiResponse;
use crate::services::encryption::MnemonicError;
use crate::services::wallet::{PoolError, WalletUnitError};

pub mod account;
pub mod info;
pub mod mnemonic;
pub mod sign;

pub use account::*;
pub use info::*;
pub use mnemonic::*;
pub use sign::*;

/// Answer for a wallet that was never loaded or whose lease already ran out
pub const NOT_LOADED_MESSAGE: &str = "wallet not loaded or session already expired";

/// Only message internal failures ever expose
pub const INTERNAL_ERROR_MESSAGE: &str = "something went wrong";

pub type ApiError<T> = (Status, Json<ApiResponse<T>>);
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError<T>>;

pub(crate) fn success<T>(data: T, message: impl Into<String>) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        success: true,
        data: Some(data),
        message: message.into(),
    }))
}

/// 200 with `success: false`; absence is not an error for read-style calls
pub(crate) fn not_loaded<T>(wallet_uuid: Uuid) -> ApiResult<T> {
    tracing::info!(wallet_uuid = %wallet_uuid, "{}", NOT_LOADED_MESSAGE);
    Ok(Json(ApiResponse {
        success: false,
        data: None,
        message: NOT_LOADED_MESSAGE.to_string(),
    }))
}

pub(crate) fn reject<T>(status: Status, message: impl Into<String>) -> ApiError<T> {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            message: message.into(),
        }),
    )
}

/// Log and report the detail, answer with the generic message only
pub(crate) fn internal_error<T>(method: &str, detail: impl Display) -> ApiError<T> {
    tracing::error!(method, "Request failed: {}", detail);
    sentry::capture_message(&format!("{method} failed: {detail}"), sentry::Level::Error);
    reject(Status::InternalServerError, INTERNAL_ERROR_MESSAGE)
}

pub(crate) fn require<'a, R, T>(value: &'a Option<R>, field: &str) -> Result<&'a R, ApiError<T>> {
    value
        .as_ref()
        .ok_or_else(|| reject(Status::BadRequest, format!("Missing required field: {field}")))
}

pub(crate) fn parse_wallet_uuid<T>(value: &Option<String>) -> Result<Uuid, ApiError<T>> {
    let raw = require(value, "wallet_uuid")?;
    Uuid::parse_str(raw.trim())
        .map_err(|e| reject(Status::BadRequest, format!("Invalid wallet_uuid: {e}")))
}

pub(crate) fn decode_base64<T>(value: &Option<String>, field: &str) -> Result<Vec<u8>, ApiError<T>> {
    let raw = require(value, field)?;
    if raw.is_empty() {
        return Err(reject(Status::BadRequest, format!("Empty field: {field}")));
    }
    BASE64
        .decode(raw.trim())
        .map_err(|e| reject(Status::BadRequest, format!("Invalid base64 in {field}: {e}")))
}

pub(crate) fn decode_hex<T>(value: &Option<String>, field: &str) -> Result<Vec<u8>, ApiError<T>> {
    let raw = require(value, field)?;
    hex::decode(raw.trim().trim_start_matches("0x"))
        .map_err(|e| reject(Status::BadRequest, format!("Invalid hex in {field}: {e}")))
}

/// Attach the endpoint (and wallet, when known) to Sentry events raised while handling
pub(crate) fn sentry_scope(endpoint: &str, wallet_uuid: Option<Uuid>) -> sentry::ScopeGuard {
    let guard = sentry::Hub::current().push_scope();
    sentry::configure_scope(|scope| {
        scope.set_tag("endpoint", endpoint);
        if let Some(wallet_uuid) = wallet_uuid {
            scope.set_extra("wallet_uuid", wallet_uuid.to_string().into());
        }
    });
    guard
}

pub(crate) fn pool_error<T>(method: &str, error: PoolError) -> ApiError<T> {
    match error {
        PoolError::WalletNotFound(wallet_uuid) => {
            tracing::info!(method, wallet_uuid = %wallet_uuid, "Wallet not loaded");
            reject(Status::NotFound, NOT_LOADED_MESSAGE)
        }
        PoolError::Unit(WalletUnitError::InvalidParameters(detail)) => reject(
            Status::BadRequest,
            format!("Invalid account parameters: {detail}"),
        ),
        PoolError::EmptyIdentifierList => reject(Status::BadRequest, error.to_string()),
        PoolError::ShuttingDown | PoolError::UnitTimeout(_) => {
            tracing::warn!(method, "Wallet pool unavailable: {}", error);
            reject(Status::ServiceUnavailable, error.to_string())
        }
        PoolError::Decryption(_) | PoolError::UnitConstruction(_) | PoolError::Unit(_) => {
            internal_error(method, error)
        }
    }
}

pub(crate) fn mnemonic_error<T>(method: &str, error: MnemonicError) -> ApiError<T> {
    match error {
        MnemonicError::InvalidMnemonic => {
            reject(Status::UnprocessableEntity, error.to_string())
        }
        other => internal_error(method, other),
    }
}
