//! Validation policy.
//!
//! A [`Policy`] bundles the switches a caller can flip per validation call.
//! It is a small `Copy` value that derives `serde` traits so hosts can keep
//! it in their own configuration files.

use serde::{Deserialize, Serialize};

/// How record validation treats keys that no field declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraFields {
    /// Keep unknown keys in the output unchanged.
    #[default]
    Allow,
    /// Report each unknown key as an `additional_properties` error.
    Forbid,
    /// Drop unknown keys from the output silently.
    Ignore,
}

/// Caller-supplied validation behaviour.
///
/// # Example
///
/// ```rust
/// use schemata::{ExtraFields, Policy};
///
/// let policy = Policy::default()
///     .with_coerce(true)
///     .with_extra_fields(ExtraFields::Forbid);
///
/// assert!(policy.coerce);
/// assert!(policy.case_sensitive_keys);
///
/// let loaded: Policy = serde_json::from_str(r#"{"coerce": true, "extra_fields": "ignore"}"#).unwrap();
/// assert_eq!(loaded.extra_fields, ExtraFields::Ignore);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Attempt conversion when a value fails a primitive's strict check.
    pub coerce: bool,
    /// Treatment of undeclared record keys.
    pub extra_fields: ExtraFields,
    /// Match record keys to field names exactly (`true`) or ignoring case.
    pub case_sensitive_keys: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            coerce: false,
            extra_fields: ExtraFields::Allow,
            case_sensitive_keys: true,
        }
    }
}

impl Policy {
    pub fn with_coerce(mut self, coerce: bool) -> Self {
        self.coerce = coerce;
        self
    }

    pub fn with_extra_fields(mut self, extra_fields: ExtraFields) -> Self {
        self.extra_fields = extra_fields;
        self
    }

    pub fn with_case_sensitive_keys(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive_keys = case_sensitive;
        self
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<Policy>();
    assert_sync::<Policy>();
};
