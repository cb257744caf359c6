use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use duoq_shared::clients::checkout::CheckoutClient;
use duoq_shared::clients::db::{create_pool, DbPool};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub checkout: CheckoutClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    duoq_shared::middleware::init_tracing("duoq-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url)?;
    let checkout = CheckoutClient::new(&config.polar_api_url, &config.polar_access_token);

    let state = Arc::new(AppState { db, config, checkout });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .route("/profiles/me", get(routes::profiles::get_profile).put(routes::profiles::update_profile))
        .route("/profiles/discover", get(routes::profiles::discover))
        .route("/profiles/:user_id", get(routes::profiles::get_by_user_id))
        .route("/matches", get(routes::matches::list_matches))
        .route("/matches/swipe", post(routes::matches::swipe))
        .route("/matches/:id", get(routes::matches::get_match))
        .route("/matches/:id/messages", get(routes::messages::list_messages).post(routes::messages::post_message))
        .route("/payments/checkout", post(routes::payments::create_checkout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "duoq-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
