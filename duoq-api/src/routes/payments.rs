use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use duoq_shared::clients::checkout::{CheckoutSession, PriceTier};
use duoq_shared::errors::AppResult;
use duoq_shared::types::auth::AuthUser;
use duoq_shared::types::ApiResponse;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    pub product_id: String,
    pub price_type: PriceTier,
}

/// POST /payments/checkout - create a premium checkout session.
///
/// Pass-through to the provider; nothing is written locally, so a failed
/// call leaves no state to roll back.
pub async fn create_checkout(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutSession>>> {
    let success_url = format!("{}/upgrade-success", state.config.frontend_url);

    let session = state
        .checkout
        .create_checkout(&req.product_id, req.price_type, user.id, &success_url)
        .await?;

    tracing::info!(user_id = %user.id, tier = req.price_type.as_str(), "checkout session created");

    Ok(Json(ApiResponse::ok(session)))
}
