use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::openapi;

use super::{ApiResult, decode_hex, parse_wallet_uuid, pool_error, require, sentry_scope, success};
use crate::models::{AppState, SignDataRequest, SignDataResponse};

/// Signs data with an account of a loaded wallet.
///
/// A wallet that is not loaded is answered with 404, unlike the read
/// endpoints which report it with `success: false`.
#[openapi(tag = "Sign")]
#[post("/sign_data", format = "json", data = "<request>")]
pub async fn sign_data(
    state: &State<AppState>,
    request: Json<SignDataRequest>,
) -> ApiResult<SignDataResponse> {
    tracing::info!("Received request: POST /sign_data");
    let wallet_uuid = parse_wallet_uuid(&request.wallet_uuid)?;
    let params = require(&request.account_parameters, "account_parameters")?;
    let data = decode_hex(&request.data_for_signing, "data_for_signing")?;
    let _guard = sentry_scope("/sign_data", Some(wallet_uuid));

    let (address, signature) = state
        .wallet_pool
        .sign(wallet_uuid, params, &data)
        .await
        .map_err(|e| pool_error("SignData", e))?;

    tracing::info!(
        wallet_uuid = %wallet_uuid,
        address = %address,
        data_len = data.len(),
        "Data signed"
    );

    success(
        SignDataResponse {
            wallet_uuid: wallet_uuid.to_string(),
            address,
            signed_data: format!("0x{}", hex::encode(signature)),
        },
        "Data signed",
    )
}
