//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use imagestore_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::constants::{API_PREFIX, MULTIPART_OVERHEAD_BYTES};
use crate::handlers;
use crate::state::AppState;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/images",
            post(handlers::image_upload::upload_image).get(handlers::image_get::list_images),
        )
        .route(
            "/images/{id}",
            get(handlers::image_get::get_image).delete(handlers::image_delete::delete_image),
        )
        .route("/images/{id}/url", get(handlers::image_get::get_image_url));

    // The multipart extractor has its own 2 MB default; the layer below is the real cap.
    let body_limit = config
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        body_limit = body_limit,
        "HTTP limit layers enabled"
    );

    Router::new()
        .nest(API_PREFIX, api_routes)
        .route("/images/{id}", get(handlers::image_download::download_image))
        .route("/health", get(handlers::health::health))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
