//! Runtime feature-flag registry.
//!
//! Flags are read once from the environment at startup and held in memory
//! for the process lifetime. Queries never fail; unknown flags evaluate as
//! disabled. The two runtime mutations exist for incident response only and
//! are logged whenever invoked.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Flag names, matching the environment variables they are loaded from.
pub const PRODUCT_APPROVAL_ENABLED: &str = "PRODUCT_APPROVAL_ENABLED";
pub const REQUIRE_APPROVAL_FOR_NEW_PRODUCTS: &str = "REQUIRE_APPROVAL_FOR_NEW_PRODUCTS";
pub const AUTO_APPROVE_TRUSTED_ADMINS: &str = "AUTO_APPROVE_TRUSTED_ADMINS";
pub const MESSAGING_SYSTEM_ENABLED: &str = "MESSAGING_SYSTEM_ENABLED";
pub const ENABLE_AUDIO_MESSAGES: &str = "ENABLE_AUDIO_MESSAGES";
pub const ENABLE_VIDEO_MESSAGES: &str = "ENABLE_VIDEO_MESSAGES";
pub const ENABLE_NEW_FEATURES: &str = "ENABLE_NEW_FEATURES";
pub const MAX_MESSAGE_LENGTH: &str = "MAX_MESSAGE_LENGTH";
pub const MAX_FILE_SIZE_MB: &str = "MAX_FILE_SIZE_MB";
pub const ALLOWED_FILE_TYPES: &str = "ALLOWED_FILE_TYPES";

/// Value of a single flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    List(Vec<String>),
}

impl FlagValue {
    /// Boolean view of the flag. Only `Bool(true)` is truthy; integer and
    /// list flags are configuration values, not switches.
    fn as_bool(&self) -> bool {
        matches!(self, FlagValue::Bool(true))
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            FlagValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

/// Reason a file upload was refused, in check order.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadRejection {
    #[error("Messaging system is disabled")]
    MessagingDisabled,

    #[error("File type '{0}' is not allowed")]
    TypeNotAllowed(String),

    #[error("Audio messages are disabled")]
    AudioDisabled,

    #[error("Video messages are disabled")]
    VideoDisabled,

    #[error("File exceeds the maximum size of {max_mb} MB")]
    TooLarge { max_mb: i64 },
}

/// In-memory feature-flag registry. Constructed once and shared through
/// `AppState` behind an `Arc`.
pub struct FeatureFlags {
    flags: RwLock<HashMap<String, FlagValue>>,
}

impl FeatureFlags {
    /// Builds the registry from environment variables, falling back to
    /// defaults for missing or unparsable values.
    pub fn from_env() -> Self {
        let mut flags = HashMap::new();

        for (name, default) in [
            (PRODUCT_APPROVAL_ENABLED, true),
            (REQUIRE_APPROVAL_FOR_NEW_PRODUCTS, true),
            (AUTO_APPROVE_TRUSTED_ADMINS, false),
            (MESSAGING_SYSTEM_ENABLED, true),
            (ENABLE_AUDIO_MESSAGES, true),
            (ENABLE_VIDEO_MESSAGES, false),
            (ENABLE_NEW_FEATURES, true),
        ] {
            flags.insert(name.to_string(), FlagValue::Bool(env_bool(name, default)));
        }

        flags.insert(
            MAX_MESSAGE_LENGTH.to_string(),
            FlagValue::Int(env_int(MAX_MESSAGE_LENGTH, 1000)),
        );
        flags.insert(
            MAX_FILE_SIZE_MB.to_string(),
            FlagValue::Int(env_int(MAX_FILE_SIZE_MB, 10)),
        );
        flags.insert(
            ALLOWED_FILE_TYPES.to_string(),
            FlagValue::List(env_list(
                ALLOWED_FILE_TYPES,
                &["image/jpeg", "image/png", "audio/mpeg", "video/mp4"],
            )),
        );

        Self {
            flags: RwLock::new(flags),
        }
    }

    /// Raw boolean value of a flag. Unknown names are false.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.flags
            .read()
            .expect("feature flag lock poisoned")
            .get(name)
            .map(FlagValue::as_bool)
            .unwrap_or(false)
    }

    /// Integer value of a flag, if it is an integer flag.
    pub fn int_value(&self, name: &str) -> Option<i64> {
        self.flags
            .read()
            .expect("feature flag lock poisoned")
            .get(name)
            .and_then(FlagValue::as_int)
    }

    /// Product approval is gated behind both its own switch and the master
    /// switch, so one master flip can kill every gated feature at once.
    pub fn is_product_approval_enabled(&self) -> bool {
        self.is_enabled(PRODUCT_APPROVAL_ENABLED) && self.is_enabled(ENABLE_NEW_FEATURES)
    }

    /// Same two-key gate as product approval, against the messaging switch.
    pub fn is_messaging_enabled(&self) -> bool {
        self.is_enabled(MESSAGING_SYSTEM_ENABLED) && self.is_enabled(ENABLE_NEW_FEATURES)
    }

    /// Validates a prospective file upload. Checks run in order and the
    /// first failure wins: messaging enabled, type allow-listed, the
    /// audio/video sub-flag, then the size ceiling.
    pub fn validate_file_upload(
        &self,
        file_type: &str,
        size_mb: f64,
    ) -> Result<(), UploadRejection> {
        if !self.is_messaging_enabled() {
            return Err(UploadRejection::MessagingDisabled);
        }

        let allowed = {
            let flags = self.flags.read().expect("feature flag lock poisoned");
            match flags.get(ALLOWED_FILE_TYPES) {
                Some(FlagValue::List(types)) => types.iter().any(|t| t == file_type),
                _ => false,
            }
        };
        if !allowed {
            return Err(UploadRejection::TypeNotAllowed(file_type.to_string()));
        }

        if file_type.starts_with("audio/") && !self.is_enabled(ENABLE_AUDIO_MESSAGES) {
            return Err(UploadRejection::AudioDisabled);
        }
        if file_type.starts_with("video/") && !self.is_enabled(ENABLE_VIDEO_MESSAGES) {
            return Err(UploadRejection::VideoDisabled);
        }

        let max_mb = self.int_value(MAX_FILE_SIZE_MB).unwrap_or(10);
        if size_mb > max_mb as f64 {
            return Err(UploadRejection::TooLarge { max_mb });
        }

        Ok(())
    }

    /// Overwrites a single flag at runtime. Takes effect on the next query.
    pub fn update_flag(&self, name: &str, value: FlagValue) {
        warn!(flag = %name, value = ?value, "Feature flag updated at runtime");
        self.flags
            .write()
            .expect("feature flag lock poisoned")
            .insert(name.to_string(), value);
    }

    /// Incident-response kill switch: force-disables the master switch and
    /// both gated feature switches in one call.
    pub fn emergency_disable_all(&self) {
        warn!("Emergency disable invoked: master and feature switches forced off");
        let mut flags = self.flags.write().expect("feature flag lock poisoned");
        for name in [
            ENABLE_NEW_FEATURES,
            PRODUCT_APPROVAL_ENABLED,
            MESSAGING_SYSTEM_ENABLED,
        ] {
            flags.insert(name.to_string(), FlagValue::Bool(false));
        }
    }

    /// Deterministic percentage rollout. The user identifier hashes to a
    /// stable 0-99 bucket; the user is allowed through only when the flag is
    /// globally enabled and their bucket falls below the rollout percentage.
    pub fn is_enabled_for_user(&self, name: &str, user_id: &str, rollout_pct: u8) -> bool {
        if !self.is_enabled(name) {
            return false;
        }
        bucket_of(user_id) < rollout_pct as u64
    }

    /// Trust-list auto-approval hook. The upstream trust mechanism was never
    /// built, so this always declines; product submissions fall through to
    /// the normal pending queue.
    pub fn should_auto_approve(&self, _vendor_id: &str) -> bool {
        false
    }

    /// Full dump of all flags for the diagnostics endpoint.
    pub fn snapshot(&self) -> HashMap<String, FlagValue> {
        self.flags
            .read()
            .expect("feature flag lock poisoned")
            .clone()
    }
}

/// Polynomial string hash (h = h*31 + byte) reduced to a 0-99 bucket.
fn bucket_of(user_id: &str) -> u64 {
    let mut h: u64 = 0;
    for byte in user_id.bytes() {
        h = h.wrapping_mul(31).wrapping_add(byte as u64);
    }
    h % 100
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => v.eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}

fn env_int(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(name: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(name) {
        Ok(v) => v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags_with(pairs: &[(&str, FlagValue)]) -> FeatureFlags {
        let flags = FeatureFlags::from_env();
        for (name, value) in pairs {
            flags.update_flag(name, value.clone());
        }
        flags
    }

    #[test]
    fn test_unknown_flag_is_disabled() {
        let flags = FeatureFlags::from_env();
        assert!(!flags.is_enabled("NO_SUCH_FLAG"));
    }

    #[test]
    fn test_int_flags_are_not_truthy() {
        let flags = FeatureFlags::from_env();
        assert!(!flags.is_enabled(MAX_MESSAGE_LENGTH));
        assert!(!flags.is_enabled(ALLOWED_FILE_TYPES));
    }

    #[test]
    fn test_approval_and_gate() {
        let cases = [
            (false, false, false),
            (false, true, false),
            (true, false, false),
            (true, true, true),
        ];
        for (approval, master, expected) in cases {
            let flags = flags_with(&[
                (PRODUCT_APPROVAL_ENABLED, FlagValue::Bool(approval)),
                (ENABLE_NEW_FEATURES, FlagValue::Bool(master)),
            ]);
            assert_eq!(
                flags.is_product_approval_enabled(),
                expected,
                "approval={} master={}",
                approval,
                master
            );
        }
    }

    #[test]
    fn test_messaging_and_gate() {
        let flags = flags_with(&[
            (MESSAGING_SYSTEM_ENABLED, FlagValue::Bool(true)),
            (ENABLE_NEW_FEATURES, FlagValue::Bool(false)),
        ]);
        assert!(!flags.is_messaging_enabled());
    }

    #[test]
    fn test_update_flag_takes_effect_on_next_query() {
        let flags = flags_with(&[(PRODUCT_APPROVAL_ENABLED, FlagValue::Bool(true))]);
        flags.update_flag(ENABLE_NEW_FEATURES, FlagValue::Bool(true));
        assert!(flags.is_product_approval_enabled());

        flags.update_flag(PRODUCT_APPROVAL_ENABLED, FlagValue::Bool(false));
        assert!(!flags.is_product_approval_enabled());
    }

    #[test]
    fn test_emergency_disable_all() {
        let flags = flags_with(&[
            (ENABLE_NEW_FEATURES, FlagValue::Bool(true)),
            (PRODUCT_APPROVAL_ENABLED, FlagValue::Bool(true)),
            (MESSAGING_SYSTEM_ENABLED, FlagValue::Bool(true)),
        ]);

        flags.emergency_disable_all();

        assert!(!flags.is_enabled(ENABLE_NEW_FEATURES));
        assert!(!flags.is_product_approval_enabled());
        assert!(!flags.is_messaging_enabled());
    }

    #[test]
    fn test_upload_validation_order() {
        let flags = flags_with(&[
            (ENABLE_NEW_FEATURES, FlagValue::Bool(true)),
            (MESSAGING_SYSTEM_ENABLED, FlagValue::Bool(false)),
        ]);
        // Messaging check fires first even though the type is also bad
        assert_eq!(
            flags.validate_file_upload("application/x-evil", 1.0),
            Err(UploadRejection::MessagingDisabled)
        );

        flags.update_flag(MESSAGING_SYSTEM_ENABLED, FlagValue::Bool(true));
        assert_eq!(
            flags.validate_file_upload("application/x-evil", 1.0),
            Err(UploadRejection::TypeNotAllowed("application/x-evil".into()))
        );
    }

    #[test]
    fn test_upload_subflag_checks() {
        let flags = flags_with(&[
            (ENABLE_NEW_FEATURES, FlagValue::Bool(true)),
            (MESSAGING_SYSTEM_ENABLED, FlagValue::Bool(true)),
            (ENABLE_AUDIO_MESSAGES, FlagValue::Bool(false)),
            (ENABLE_VIDEO_MESSAGES, FlagValue::Bool(false)),
        ]);
        assert_eq!(
            flags.validate_file_upload("audio/mpeg", 1.0),
            Err(UploadRejection::AudioDisabled)
        );
        assert_eq!(
            flags.validate_file_upload("video/mp4", 1.0),
            Err(UploadRejection::VideoDisabled)
        );

        // Image uploads are not gated by the audio/video sub-flags
        assert_eq!(flags.validate_file_upload("image/png", 1.0), Ok(()));
    }

    #[test]
    fn test_upload_size_ceiling() {
        let flags = flags_with(&[
            (ENABLE_NEW_FEATURES, FlagValue::Bool(true)),
            (MESSAGING_SYSTEM_ENABLED, FlagValue::Bool(true)),
            (MAX_FILE_SIZE_MB, FlagValue::Int(10)),
        ]);
        assert_eq!(flags.validate_file_upload("image/png", 10.0), Ok(()));
        assert_eq!(
            flags.validate_file_upload("image/png", 10.5),
            Err(UploadRejection::TooLarge { max_mb: 10 })
        );
    }

    #[test]
    fn test_rollout_is_deterministic() {
        let flags = flags_with(&[(ENABLE_NEW_FEATURES, FlagValue::Bool(true))]);
        let first = flags.is_enabled_for_user(ENABLE_NEW_FEATURES, "user-42", 50);
        for _ in 0..10 {
            assert_eq!(
                flags.is_enabled_for_user(ENABLE_NEW_FEATURES, "user-42", 50),
                first
            );
        }
    }

    #[test]
    fn test_rollout_boundaries() {
        let flags = flags_with(&[(ENABLE_NEW_FEATURES, FlagValue::Bool(true))]);
        // 0% lets nobody through, 100% lets everybody through
        assert!(!flags.is_enabled_for_user(ENABLE_NEW_FEATURES, "user-42", 0));
        assert!(flags.is_enabled_for_user(ENABLE_NEW_FEATURES, "user-42", 100));
    }

    #[test]
    fn test_rollout_requires_global_enable() {
        let flags = flags_with(&[(ENABLE_NEW_FEATURES, FlagValue::Bool(false))]);
        assert!(!flags.is_enabled_for_user(ENABLE_NEW_FEATURES, "user-42", 100));
    }

    #[test]
    fn test_bucket_of_is_stable() {
        assert_eq!(bucket_of("user-42"), bucket_of("user-42"));
        assert!(bucket_of("user-42") < 100);
    }

    #[test]
    fn test_should_auto_approve_declines() {
        let flags = FeatureFlags::from_env();
        assert!(!flags.should_auto_approve("any-vendor"));
    }

    #[test]
    fn test_snapshot_contains_all_flags() {
        let flags = FeatureFlags::from_env();
        let snapshot = flags.snapshot();
        for name in [
            PRODUCT_APPROVAL_ENABLED,
            REQUIRE_APPROVAL_FOR_NEW_PRODUCTS,
            AUTO_APPROVE_TRUSTED_ADMINS,
            MESSAGING_SYSTEM_ENABLED,
            ENABLE_AUDIO_MESSAGES,
            ENABLE_VIDEO_MESSAGES,
            ENABLE_NEW_FEATURES,
            MAX_MESSAGE_LENGTH,
            MAX_FILE_SIZE_MB,
            ALLOWED_FILE_TYPES,
        ] {
            assert!(snapshot.contains_key(name), "missing {}", name);
        }
    }

    #[test]
    fn test_flag_value_serialization() {
        assert_eq!(
            serde_json::to_string(&FlagValue::Bool(true)).unwrap(),
            "true"
        );
        assert_eq!(serde_json::to_string(&FlagValue::Int(10)).unwrap(), "10");
        assert_eq!(
            serde_json::to_string(&FlagValue::List(vec!["a".into(), "b".into()])).unwrap(),
            r#"["a","b"]"#
        );
    }
}
