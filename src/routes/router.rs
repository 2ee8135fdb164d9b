use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::middleware::{request_id_middleware, ClientIpKeyExtractor};
use crate::routes::helpers::X_TOTAL_COUNT;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method, Uri};
use axum::middleware;
use axum::routing::get;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::categories::{self, Level};
use super::{banners, health, import, offers, orders, products, reports, settings, uploads, users};
use super::AppState;

/// Create application router
pub fn create_router(
    state: Arc<AppState>,
    allowed_origins: Vec<String>,
    rate_limit_config: RateLimitConfig,
    body_limit_bytes: usize,
) -> axum::Router {
    // Strict limits for auth, uploads and bulk import (client-IP keyed)
    let governor_layer_strict = GovernorLayer::new(
        tower_governor::governor::GovernorConfigBuilder::default()
            .per_millisecond(60000 / rate_limit_config.requests_per_minute)
            .burst_size(rate_limit_config.burst_size)
            .key_extractor(ClientIpKeyExtractor)
            .finish()
            .expect("Failed to build strict governor config"),
    );

    // More lenient limits for the public catalog endpoints
    let governor_layer_lenient = GovernorLayer::new(
        tower_governor::governor::GovernorConfigBuilder::default()
            .per_millisecond(60000 / (rate_limit_config.requests_per_minute * 2))
            .burst_size(rate_limit_config.burst_size * 2)
            .key_extractor(ClientIpKeyExtractor)
            .finish()
            .expect("Failed to build lenient governor config"),
    );

    // Fixed method and header sets; pagination headers are exposed so the
    // storefront's tables can read them. Credentials stay disabled.
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_RANGE, X_TOTAL_COUNT]);
    let cors = if allowed_origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|s| s.parse::<HeaderValue>().ok())
            .collect();
        cors.allow_origin(origins)
    };

    let sensitive_api = axum::Router::new()
        .nest("/users", users::router())
        .nest("/upload", uploads::router())
        .nest("/import", import::router())
        .layer(governor_layer_strict);

    let public_api = axum::Router::new()
        .nest("/products", products::router())
        .nest("/categories", categories::router(Level::Category))
        .nest("/subcategories", categories::router(Level::Subcategory))
        .nest("/subsubcategories", categories::router(Level::Subsubcategory))
        .nest("/orders", orders::router())
        .nest("/offers", offers::router())
        .nest("/banners", banners::router())
        .nest("/settings", settings::router())
        .nest("/reports", reports::router())
        .layer(governor_layer_lenient);

    // Health check endpoint (no rate limiting)
    axum::Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", sensitive_api.merge(public_api))
        .fallback(not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Terminal handler for unmatched paths
async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("{} {}", method, uri.path()))
}
