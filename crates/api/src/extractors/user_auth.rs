//! User JWT authentication extractors.
//!
//! `UserAuth` validates the Bearer token in the Authorization header.
//! `SuperAdmin` wraps it and additionally rejects non-superadmin roles, so
//! role checks happen on every call rather than being cached per session.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::user_auth::UserAuth as UserAuthData;
use domain::models::UserRole;

/// Authenticated user information from JWT.
pub type UserAuth = UserAuthData;

#[async_trait]
impl FromRequestParts<AppState> for UserAuthData {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Auth info may already have been validated by middleware
        if let Some(auth) = parts.extensions.get::<UserAuthData>() {
            return Ok(auth.clone());
        }

        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        let jwt_config = UserAuthData::create_jwt_config(&state.config.jwt)
            .map_err(ApiError::Internal)?;

        let auth = UserAuthData::validate(&jwt_config, token)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(auth)
    }
}

/// Authenticated SuperAdmin. Any other role is rejected with 403.
#[derive(Debug, Clone)]
pub struct SuperAdmin(pub UserAuthData);

#[async_trait]
impl FromRequestParts<AppState> for SuperAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = UserAuthData::from_request_parts(parts, state).await?;

        if auth.role != UserRole::SuperAdmin {
            return Err(ApiError::Forbidden(
                "SuperAdmin access required".to_string(),
            ));
        }

        Ok(SuperAdmin(auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_super_admin_wraps_auth() {
        let auth = UserAuthData {
            user_id: Uuid::new_v4(),
            role: UserRole::SuperAdmin,
            jti: "jti".to_string(),
        };
        let admin = SuperAdmin(auth.clone());
        assert_eq!(admin.0.user_id, auth.user_id);
        assert_eq!(admin.0.role, UserRole::SuperAdmin);
    }
}
