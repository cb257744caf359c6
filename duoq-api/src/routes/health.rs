use axum::Json;
use duoq_shared::types::api::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("duoq-api", env!("CARGO_PKG_VERSION")))
}
