use rocket::serde::json::Json;
use rocket::{State, get};
use rocket_okapi::openapi;

use crate::models::{ApiEndpoints, ApiResponse, AppState, ServiceInfo};

/// Service summary: wallet factory metadata, loaded wallet count and endpoints.
#[openapi(tag = "Info")]
#[get("/")]
pub async fn index(state: &State<AppState>) -> Json<ApiResponse<ServiceInfo>> {
    tracing::info!("Received request: GET /");

    let endpoints = ApiEndpoints::get_all();
    let factory = state.factory().info().clone();
    let loaded_wallets = state.wallet_pool.len().await;

    let message = format!(
        "Welcome to the HD wallet keykeeper! Chain '{}', {} wallets loaded, {} endpoints available",
        factory.name,
        loaded_wallets,
        endpoints.len()
    );

    Json(ApiResponse {
        success: true,
        data: Some(ServiceInfo {
            factory,
            loaded_wallets,
            total_endpoints: endpoints.len(),
            endpoints,
        }),
        message,
    })
}
