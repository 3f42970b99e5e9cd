use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A state transition was attempted on a row that is no longer in the
    /// expected state. Carries the current state so clients can recover.
    #[error("Invalid transition, current status is {current}")]
    InvalidTransition { current: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        retry_after_secs: u64,
        message: String,
    },

    /// The feature guarding this endpoint is switched off.
    #[error("Feature disabled: {0}")]
    FeatureDisabled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    feature_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl ErrorBody {
    fn new(error: &str, message: String) -> Self {
        Self {
            error: error.to_string(),
            message,
            feature_enabled: None,
            current_status: None,
            retry_after: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("unauthorized", msg.clone()),
            ),
            ApiError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorBody::new("forbidden", msg.clone()),
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody::new("not_found", msg.clone()),
            ),
            ApiError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody::new("conflict", msg.clone()),
            ),
            ApiError::InvalidTransition { current } => (
                StatusCode::CONFLICT,
                ErrorBody {
                    current_status: Some(current.clone()),
                    ..ErrorBody::new(
                        "conflict",
                        format!("Product has already been reviewed (status: {})", current),
                    )
                },
            ),
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("validation_error", msg.clone()),
            ),
            ApiError::RateLimited {
                retry_after_secs,
                message,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody {
                    retry_after: Some(*retry_after_secs),
                    ..ErrorBody::new("rate_limited", message.clone())
                },
            ),
            ApiError::FeatureDisabled(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    feature_enabled: Some(false),
                    ..ErrorBody::new("feature_disabled", msg.clone())
                },
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("internal_error", "An internal error occurred".into()),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => ApiError::Conflict("Resource already exists".into()),
                        "23503" => ApiError::NotFound("Referenced resource not found".into()),
                        _ => ApiError::Internal(format!("Database error: {}", db_err)),
                    }
                } else {
                    ApiError::Internal(format!("Database error: {}", db_err))
                }
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
            })
            .collect();

        let message = if messages.len() == 1 {
            messages[0].clone()
        } else {
            format!("{} validation errors", messages.len())
        };

        ApiError::Validation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(error: ApiError) -> serde_json::Value {
        let response = error.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                ApiError::Unauthorized("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                ApiError::InvalidTransition {
                    current: "approved".into(),
                },
                StatusCode::CONFLICT,
            ),
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::RateLimited {
                    retry_after_secs: 30,
                    message: "slow down".into(),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                ApiError::FeatureDisabled("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_feature_disabled_body_carries_flag() {
        let json = body_json(ApiError::FeatureDisabled(
            "Product approval system is disabled".into(),
        ))
        .await;
        assert_eq!(json["error"], "feature_disabled");
        assert_eq!(json["featureEnabled"], false);
    }

    #[tokio::test]
    async fn test_invalid_transition_body_carries_status() {
        let json = body_json(ApiError::InvalidTransition {
            current: "approved".into(),
        })
        .await;
        assert_eq!(json["error"], "conflict");
        assert_eq!(json["currentStatus"], "approved");
    }

    #[tokio::test]
    async fn test_rate_limited_body_carries_retry_after() {
        let json = body_json(ApiError::RateLimited {
            retry_after_secs: 42,
            message: "Too many login attempts".into(),
        })
        .await;
        assert_eq!(json["retryAfter"], 42);
        assert_eq!(json["message"], "Too many login attempts");
    }

    #[tokio::test]
    async fn test_internal_message_is_elided() {
        let json = body_json(ApiError::Internal("secret pool details".into())).await;
        assert_eq!(json["message"], "An internal error occurred");
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let error: ApiError = sqlx::Error::RowNotFound.into();
        match error {
            ApiError::NotFound(msg) => assert_eq!(msg, "Resource not found"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_from_validation_errors() {
        use validator::Validate;

        #[derive(Validate)]
        struct Probe {
            #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
            password: String,
        }

        let probe = Probe {
            password: "short".into(),
        };
        let error: ApiError = probe.validate().unwrap_err().into();
        match error {
            ApiError::Validation(msg) => {
                assert_eq!(msg, "Password must be at least 8 characters")
            }
            _ => panic!("Expected Validation error"),
        }
    }
}
