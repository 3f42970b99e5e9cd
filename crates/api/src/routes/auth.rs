//! Authentication routes: registration, login and password resets.
//!
//! Login failures and unknown reset emails both return non-committal
//! responses so the endpoints cannot be used to enumerate accounts.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use validator::Validate;

use domain::models::{
    AuthResponse, LoginRequest, PasswordResetConfirmRequest, PasswordResetRequest,
    RegisterRequest, TokensResponse, UserResponse, UserRole,
};
use persistence::entities::{UserEntity, UserRoleDb};
use persistence::repositories::{PasswordResetRepository, UserRepository};
use shared::{password, tokens};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::user_auth::UserAuth;

const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

/// Register a new customer or vendor account.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    request.validate()?;

    let role = match request.role {
        Some(UserRole::SuperAdmin) => {
            return Err(ApiError::Validation(
                "SuperAdmin accounts cannot be self-registered".to_string(),
            ))
        }
        Some(role) => role,
        None => UserRole::Customer,
    };

    let password_hash =
        password::hash_password(&request.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    let users = UserRepository::new(state.pool.clone());
    let user = users
        .create(
            &request.email,
            &request.display_name,
            &password_hash,
            role_db(role),
        )
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505") => {
                ApiError::Conflict("Email already registered".to_string())
            }
            other => other.into(),
        })?;

    info!(user_id = %user.id, role = %user.role.as_str(), "User registered");

    let tokens = issue_tokens(&state, &user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user_response(&user),
            tokens,
        }),
    ))
}

/// Authenticate with email and password.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    request.validate()?;

    let users = UserRepository::new(state.pool.clone());
    let user = users
        .find_by_email(&request.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let valid = password::verify_password(&request.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !valid {
        return Err(invalid_credentials());
    }

    info!(user_id = %user.id, "User logged in");

    let tokens = issue_tokens(&state, &user)?;
    Ok(Json(AuthResponse {
        user: user_response(&user),
        tokens,
    }))
}

/// Start a password reset. Responds 202 regardless of whether the email is
/// registered; the reset link is only sent when it is.
pub async fn password_reset_request(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    request.validate()?;

    let users = UserRepository::new(state.pool.clone());
    if let Some(user) = users.find_by_email(&request.email).await? {
        let token = tokens::generate_token();
        let token_hash = tokens::hash_token(&token);
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        PasswordResetRepository::new(state.pool.clone())
            .create(user.id, &token_hash, expires_at)
            .await?;

        if let Err(e) = state
            .email
            .send_password_reset_email(&user.email, Some(&user.display_name), &token)
            .await
        {
            warn!(user_id = %user.id, error = %e, "Failed to send password reset email");
        }
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "If the email is registered, a reset link has been sent".to_string(),
        }),
    ))
}

/// Complete a password reset with the token from the email.
pub async fn password_reset_confirm(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetConfirmRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request.validate()?;

    let token_hash = tokens::hash_token(&request.token);
    let resets = PasswordResetRepository::new(state.pool.clone());

    let reset = resets
        .find_valid(&token_hash)
        .await?
        .ok_or_else(invalid_reset_token)?;

    if !resets.mark_used(reset.id).await? {
        return Err(invalid_reset_token());
    }

    let password_hash = password::hash_password(&request.new_password)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let users = UserRepository::new(state.pool.clone());
    if !users.update_password(reset.user_id, &password_hash).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    info!(user_id = %reset.user_id, "Password reset completed");

    Ok(Json(MessageResponse {
        message: "Password has been reset".to_string(),
    }))
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".to_string())
}

fn invalid_reset_token() -> ApiError {
    ApiError::Validation("Invalid or expired reset token".to_string())
}

fn issue_tokens(state: &AppState, user: &UserEntity) -> Result<TokensResponse, ApiError> {
    let jwt = UserAuth::create_jwt_config(&state.config.jwt).map_err(ApiError::Internal)?;

    let (access_token, _) = jwt
        .generate_access_token(user.id, user.role.as_str())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let (refresh_token, _) = jwt
        .generate_refresh_token(user.id, user.role.as_str())
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(TokensResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt.access_token_expiry_secs,
    })
}

fn user_response(user: &UserEntity) -> UserResponse {
    UserResponse {
        id: user.id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        role: user_role(user.role),
        created_at: user.created_at,
    }
}

fn role_db(role: UserRole) -> UserRoleDb {
    match role {
        UserRole::Customer => UserRoleDb::Customer,
        UserRole::Vendor => UserRoleDb::Vendor,
        UserRole::SuperAdmin => UserRoleDb::Superadmin,
    }
}

fn user_role(role: UserRoleDb) -> UserRole {
    match role {
        UserRoleDb::Customer => UserRole::Customer,
        UserRoleDb::Vendor => UserRole::Vendor,
        UserRoleDb::Superadmin => UserRole::SuperAdmin,
    }
}
