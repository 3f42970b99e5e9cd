//! Feature flag diagnostics and runtime controls.
//!
//! The status dump is unauthenticated so operators and smoke tests can see
//! the effective configuration. Mutations are SuperAdmin-only, take effect
//! on the next flag query, and do not persist across restarts.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::SuperAdmin;
use crate::feature_flags::FlagValue;

/// Full dump of all flags with their current values.
pub async fn flag_status(State(state): State<AppState>) -> Json<HashMap<String, FlagValue>> {
    Json(state.flags.snapshot())
}

#[derive(Debug, Deserialize)]
pub struct UpdateFlagRequest {
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFlagResponse {
    pub flag: String,
    pub value: FlagValue,
}

/// Overwrite a single flag at runtime.
pub async fn update_flag(
    State(state): State<AppState>,
    SuperAdmin(admin): SuperAdmin,
    Path(flag): Path<String>,
    Json(request): Json<UpdateFlagRequest>,
) -> Result<Json<UpdateFlagResponse>, ApiError> {
    let value = parse_flag_value(&request.value).ok_or_else(|| {
        ApiError::Validation(
            "Flag value must be a boolean, integer or list of strings".to_string(),
        )
    })?;

    info!(flag = %flag, admin_id = %admin.user_id, "Feature flag update requested");
    state.flags.update_flag(&flag, value.clone());

    Ok(Json(UpdateFlagResponse { flag, value }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyDisableResponse {
    pub message: String,
    pub flags: HashMap<String, FlagValue>,
}

/// Kill switch: force-disables the master switch and all gated features.
pub async fn emergency_disable(
    State(state): State<AppState>,
    SuperAdmin(admin): SuperAdmin,
) -> Json<EmergencyDisableResponse> {
    warn!(admin_id = %admin.user_id, "Emergency feature disable requested");
    state.flags.emergency_disable_all();

    Json(EmergencyDisableResponse {
        message: "All gated features disabled".to_string(),
        flags: state.flags.snapshot(),
    })
}

fn parse_flag_value(value: &serde_json::Value) -> Option<FlagValue> {
    match value {
        serde_json::Value::Bool(b) => Some(FlagValue::Bool(*b)),
        serde_json::Value::Number(n) => n.as_i64().map(FlagValue::Int),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(|s| s.to_string()))
            .collect::<Option<Vec<_>>>()
            .map(FlagValue::List),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bool_and_int() {
        assert_eq!(parse_flag_value(&json!(true)), Some(FlagValue::Bool(true)));
        assert_eq!(parse_flag_value(&json!(42)), Some(FlagValue::Int(42)));
    }

    #[test]
    fn test_parse_string_list() {
        assert_eq!(
            parse_flag_value(&json!(["image/png", "image/jpeg"])),
            Some(FlagValue::List(vec![
                "image/png".to_string(),
                "image/jpeg".to_string()
            ]))
        );
    }

    #[test]
    fn test_rejects_unsupported_values() {
        assert_eq!(parse_flag_value(&json!("enabled")), None);
        assert_eq!(parse_flag_value(&json!(1.5)), None);
        assert_eq!(parse_flag_value(&json!([1, 2, 3])), None);
        assert_eq!(parse_flag_value(&json!({"nested": true})), None);
        assert_eq!(parse_flag_value(&json!(null)), None);
    }
}
