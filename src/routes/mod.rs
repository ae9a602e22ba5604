use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::state::AppState;

pub mod auth;
pub mod calls;
pub mod campaign;
pub mod health;
pub mod leads;
pub mod webhook;

fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let Some(list) = allowed_origins else {
        return base.allow_origin(AllowOrigin::mirror_request());
    };

    let origins: Vec<HeaderValue> = list
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let leads_routes = Router::new()
        .route("/", get(leads::list_leads))
        .route("/upload", post(leads::upload_leads));

    let calls_routes = Router::new()
        .route("/", get(calls::list_calls))
        .route("/test", post(calls::test_call));

    let campaign_routes = Router::new()
        .route("/start", post(campaign::start_campaign))
        .route("/status", get(campaign::campaign_status));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/leads", leads_routes)
        .nest("/api/calls", calls_routes)
        .nest("/api/campaign", campaign_routes)
        .route("/api/stats", get(campaign::stats))
        .route("/api/webhook", post(webhook::webhook))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 16))
}
