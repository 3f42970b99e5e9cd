//! Application state and router assembly.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::feature_flags::FeatureFlags;
use crate::middleware::{self, RateLimiter};
use crate::routes;
use crate::services::EmailService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub flags: Arc<FeatureFlags>,
    pub auth_limiter: Arc<RateLimiter>,
    pub api_limiter: Arc<RateLimiter>,
    pub email: EmailService,
}

/// Builds the full application router.
pub fn create_app(config: Config, pool: PgPool, flags: FeatureFlags) -> Router {
    let window = Duration::from_secs(config.security.rate_limit_window_secs);
    let auth_limiter = Arc::new(RateLimiter::new(
        config.security.auth_rate_limit,
        window,
        "Too many authentication attempts, please try again later.",
    ));
    let api_limiter = Arc::new(RateLimiter::new(
        config.security.api_rate_limit,
        window,
        "Too many requests, please try again later.",
    ));

    let email = EmailService::new(config.email.clone());
    let request_timeout = Duration::from_secs(config.server.request_timeout_secs);
    let cors = build_cors(&config.security.cors_origins);

    let state = AppState {
        pool,
        config: Arc::new(config),
        flags: Arc::new(flags),
        auth_limiter,
        api_limiter,
        email,
    };

    // Operational endpoints bypass the rate limiters
    let ops_routes = Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/health/ready", get(routes::health::ready))
        .route("/api/health/live", get(routes::health::live))
        .route("/metrics", get(middleware::metrics_handler));

    let auth_routes = Router::new()
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route(
            "/api/auth/password-reset/request",
            post(routes::auth::password_reset_request),
        )
        .route(
            "/api/auth/password-reset/confirm",
            post(routes::auth::password_reset_confirm),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth_rate_limit,
        ));

    // The whole approval surface sits behind the feature gate
    let approval_routes = routes::product_approval::router().route_layer(from_fn_with_state(
        state.clone(),
        middleware::require_product_approval,
    ));

    let api_routes = Router::new()
        .route(
            "/api/products",
            get(routes::products::list_products).post(routes::products::create_product),
        )
        .route(
            "/api/products/:product_id",
            get(routes::products::get_product),
        )
        .route(
            "/api/feature-flags/status",
            get(routes::feature_flags::flag_status),
        )
        .nest("/api/superAdmin/product-approval", approval_routes)
        .route(
            "/api/superAdmin/feature-flags/emergency-disable",
            post(routes::feature_flags::emergency_disable),
        )
        .route(
            "/api/superAdmin/feature-flags/:flag",
            put(routes::feature_flags::update_flag),
        )
        .route(
            "/api/superAdmin/analytics/revenue",
            get(routes::analytics::revenue_report),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::api_rate_limit,
        ));

    Router::new()
        .merge(ops_routes)
        .merge(auth_routes)
        .merge(api_routes)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(middleware::trace_id))
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_cors_with_origins() {
        // Invalid origins are silently dropped
        let _permissive = build_cors(&[]);
        let _restricted = build_cors(&[
            "https://shop.example.com".to_string(),
            "not a header value\u{7f}".to_string(),
        ]);
    }
}
