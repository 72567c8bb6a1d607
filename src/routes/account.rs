use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::openapi;

use super::{ApiResult, not_loaded, parse_wallet_uuid, pool_error, require, sentry_scope, success};
use crate::models::{
    AccountRequest, AccountResponse, AppState, GetMultipleAccountsRequest,
    MultipleAccountsResponse,
};

/// Derives the address of one account of a loaded wallet.
#[openapi(tag = "Account")]
#[post("/get_account", format = "json", data = "<request>")]
pub async fn get_account(
    state: &State<AppState>,
    request: Json<AccountRequest>,
) -> ApiResult<AccountResponse> {
    tracing::info!("Received request: POST /get_account");
    let wallet_uuid = parse_wallet_uuid(&request.wallet_uuid)?;
    let params = require(&request.account_parameters, "account_parameters")?;
    let _guard = sentry_scope("/get_account", Some(wallet_uuid));

    match state
        .wallet_pool
        .derive_address(wallet_uuid, params)
        .await
        .map_err(|e| pool_error("GetAccount", e))?
    {
        Some(address) => success(
            AccountResponse {
                wallet_uuid: wallet_uuid.to_string(),
                address,
            },
            "Account derived",
        ),
        None => not_loaded(wallet_uuid),
    }
}

/// Derives a batch of accounts of a loaded wallet.
#[openapi(tag = "Account")]
#[post("/get_multiple_accounts", format = "json", data = "<request>")]
pub async fn get_multiple_accounts(
    state: &State<AppState>,
    request: Json<GetMultipleAccountsRequest>,
) -> ApiResult<MultipleAccountsResponse> {
    tracing::info!("Received request: POST /get_multiple_accounts");
    let wallet_uuid = parse_wallet_uuid(&request.wallet_uuid)?;
    let params = require(&request.accounts_parameters, "accounts_parameters")?;
    let _guard = sentry_scope("/get_multiple_accounts", Some(wallet_uuid));

    match state
        .wallet_pool
        .derive_multiple(wallet_uuid, params)
        .await
        .map_err(|e| pool_error("GetMultipleAccounts", e))?
    {
        // An empty batch is answered like an unloaded wallet
        Some((count, accounts)) if count > 0 => success(
            MultipleAccountsResponse {
                wallet_uuid: wallet_uuid.to_string(),
                account_identities_count: count,
                account_identities: accounts,
            },
            format!("{count} accounts derived"),
        ),
        _ => not_loaded(wallet_uuid),
    }
}

/// Derives an account and keeps its key resident for signing.
#[openapi(tag = "Account")]
#[post("/load_account", format = "json", data = "<request>")]
pub async fn load_account(
    state: &State<AppState>,
    request: Json<AccountRequest>,
) -> ApiResult<AccountResponse> {
    tracing::info!("Received request: POST /load_account");
    let wallet_uuid = parse_wallet_uuid(&request.wallet_uuid)?;
    let params = require(&request.account_parameters, "account_parameters")?;
    let _guard = sentry_scope("/load_account", Some(wallet_uuid));

    match state
        .wallet_pool
        .load_account(wallet_uuid, params)
        .await
        .map_err(|e| pool_error("LoadAccount", e))?
    {
        Some(address) => success(
            AccountResponse {
                wallet_uuid: wallet_uuid.to_string(),
                address,
            },
            "Account loaded",
        ),
        None => not_loaded(wallet_uuid),
    }
}
