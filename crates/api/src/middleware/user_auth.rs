//! JWT authentication support shared by the extractors.

use domain::models::UserRole;
use shared::jwt::JwtConfig;
use uuid::Uuid;

use crate::config::JwtAuthConfig;

/// Authenticated user information extracted from a validated JWT.
#[derive(Debug, Clone)]
pub struct UserAuth {
    /// User ID from the JWT subject claim.
    pub user_id: Uuid,
    /// Role carried in the token, checked for role-gated endpoints.
    pub role: UserRole,
    /// JWT ID (jti) for session tracking.
    pub jti: String,
}

impl UserAuth {
    /// Validates an access token and returns user authentication info.
    pub fn validate(jwt_config: &JwtConfig, token: &str) -> Result<Self, String> {
        let claims = jwt_config
            .validate_access_token(token)
            .map_err(|e| format!("Invalid token: {}", e))?;

        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token".to_string())?;

        let role =
            UserRole::parse(&claims.role).ok_or_else(|| "Invalid role in token".to_string())?;

        Ok(UserAuth {
            user_id,
            role,
            jti: claims.jti,
        })
    }

    /// Creates a JwtConfig from the service configuration.
    pub fn create_jwt_config(config: &JwtAuthConfig) -> Result<JwtConfig, String> {
        JwtConfig::with_leeway(
            &config.private_key,
            &config.public_key,
            config.access_token_expiry_secs,
            config.refresh_token_expiry_secs,
            config.leeway_secs,
        )
        .map_err(|e| format!("Failed to initialize JWT config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_auth_struct() {
        let auth = UserAuth {
            user_id: Uuid::new_v4(),
            role: UserRole::Vendor,
            jti: "test_jti".to_string(),
        };
        assert!(!auth.jti.is_empty());
        assert_eq!(auth.role, UserRole::Vendor);
    }

    #[test]
    fn test_user_auth_clone() {
        let auth = UserAuth {
            user_id: Uuid::new_v4(),
            role: UserRole::SuperAdmin,
            jti: "test_jti".to_string(),
        };
        let cloned = auth.clone();
        assert_eq!(auth.user_id, cloned.user_id);
        assert_eq!(auth.role, cloned.role);
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        let config = JwtConfig::new_for_testing("middleware_test_secret");
        assert!(UserAuth::validate(&config, "not.a.token").is_err());
    }

    #[test]
    fn test_validate_carries_role() {
        let config = JwtConfig::new_for_testing("middleware_test_secret");
        let user_id = Uuid::new_v4();
        let (token, _) = config.generate_access_token(user_id, "superadmin").unwrap();

        let auth = UserAuth::validate(&config, &token).unwrap();
        assert_eq!(auth.user_id, user_id);
        assert_eq!(auth.role, UserRole::SuperAdmin);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let config = JwtConfig::new_for_testing("middleware_test_secret");
        let (token, _) = config
            .generate_access_token(Uuid::new_v4(), "warehouse")
            .unwrap();

        assert!(UserAuth::validate(&config, &token).is_err());
    }
}
