use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use std::sync::Arc;

pub mod fairings;
pub mod models;
pub mod routes;
pub mod services;

use crate::models::{AppState, KeyKeeperConfig};
use crate::services::wallet::WalletPool;

/// Mount every endpoint (plus `/openapi.json`) and the fairings on `rocket`
pub fn mount_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(fairings::RequestLogger)
        .attach(fairings::PanicCatcher)
        .attach(AdHoc::on_shutdown("Wallet pool shutdown", |rocket| {
            Box::pin(async move {
                if let Some(state) = rocket.state::<AppState>() {
                    state.wallet_pool.shutdown().await;
                }
            })
        }))
        .mount(
            "/",
            rocket_okapi::openapi_get_routes![
                routes::index,
                routes::generate_mnemonic,
                routes::validate_mnemonic,
                routes::load_mnemonic,
                routes::unload_mnemonic,
                routes::unload_multiple_mnemonics,
                routes::encrypt_mnemonic,
                routes::get_account,
                routes::get_multiple_accounts,
                routes::load_account,
                routes::sign_data,
            ],
        )
}

/// Build a Rocket instance around an existing state
pub fn rocket_with_state(app_state: AppState) -> Rocket<Build> {
    mount_routes(rocket::build().manage(app_state))
}

pub async fn create_rocket() -> Rocket<Build> {
    // Load and cache environment variables
    dotenvy::dotenv().ok();

    let config =
        KeyKeeperConfig::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {e}"));

    let factory = config
        .build_factory()
        .unwrap_or_else(|e| panic!("Failed to build wallet factory: {e}"));
    let encryption = config
        .build_encryption_boundary()
        .unwrap_or_else(|e| panic!("Failed to build encryption boundary: {e}"));

    let info = factory.info();
    tracing::info!("Keykeeper configured:");
    tracing::info!("  - ENV: {:?}", config.environment);
    tracing::info!("  - Chain: {} ({})", info.name, info.release_tag);
    tracing::info!("  - Chain ID: {:?}", config.chain_id);
    tracing::info!("  - Mnemonic words: {}", config.words_count);
    tracing::info!("  - Encryption: {:?}", config.encryption);
    tracing::info!("  - Unit call timeout: {:?}", config.unit_call_timeout);

    let wallet_pool = Arc::new(WalletPool::new(
        factory,
        encryption.application(),
        config.pool_settings(),
    ));

    rocket_with_state(AppState {
        wallet_pool,
        encryption,
    })
}
