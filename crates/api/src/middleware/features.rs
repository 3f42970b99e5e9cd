//! Feature gate middleware.
//!
//! The gate re-reads the flag registry on every request, so flipping a flag
//! (or hitting the emergency kill switch) takes effect immediately for
//! in-flight sessions.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;

/// Middleware that rejects requests while the product approval feature is
/// switched off. Returns 503 with `featureEnabled: false` so clients can
/// distinguish "temporarily disabled" from a genuine error.
pub async fn require_product_approval(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.flags.is_product_approval_enabled() {
        return ApiError::FeatureDisabled("Product approval system is disabled".to_string())
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use crate::error::ApiError;

    #[test]
    fn test_feature_disabled_response_status() {
        let response =
            ApiError::FeatureDisabled("Product approval system is disabled".to_string())
                .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
