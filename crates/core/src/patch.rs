//! Merge-patch helpers.
//!
//! Patch payloads are plain structs. Optional columns use [`Nullable`] so that
//! "absent" (leave untouched) and `null` (clear) stay distinguishable:
//!
//! ```ignore
//! #[derive(Serialize, Deserialize, Default)]
//! struct AccountPatch {
//!     #[serde(default, skip_serializing_if = "Option::is_none")]
//!     name: Option<String>,
//!     #[serde(default, deserialize_with = "crm_core::patch::present", skip_serializing_if = "Option::is_none")]
//!     industry: Nullable<String>,
//! }
//! ```
//!
//! Required columns use a plain `Option`, so `null` reads as "absent" and can
//! never clear them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{DomainError, DomainResult};

/// `None` = absent, `Some(None)` = explicit null, `Some(Some(v))` = new value.
pub type Nullable<T> = Option<Option<T>>;

/// Fields owned by the server; stripped from every patch document.
pub const PROTECTED_FIELDS: &[&str] = &["id", "organization_id", "created_by", "created_at"];

/// `deserialize_with` hook that maps a present field (even `null`) to `Some`.
pub fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Serialize a patch into the object of fields it actually sets.
pub fn patch_document<P: Serialize>(patch: &P) -> DomainResult<Map<String, Value>> {
    match serde_json::to_value(patch) {
        Ok(Value::Object(mut map)) => {
            for field in PROTECTED_FIELDS {
                map.remove(*field);
            }
            Ok(map)
        }
        Ok(_) => Err(DomainError::validation("patch must be a JSON object")),
        Err(e) => Err(DomainError::validation(format!("invalid patch: {e}"))),
    }
}

/// Overwrite top-level fields of `target` with the ones in `changes`.
pub fn merge(target: &mut Value, changes: Map<String, Value>) {
    if let Value::Object(fields) = target {
        for (key, value) in changes {
            fields.insert(key, value);
        }
    }
}

/// A required text field: present and not blank.
pub fn required_text(field: &'static str, value: Option<String>) -> DomainResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DomainError::validation(format!("{field} is required"))),
    }
}

/// A required text field of an existing record: not blank.
pub fn non_blank(field: &'static str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(())
}

/// A required non-text field: present.
pub fn required<T>(field: &'static str, value: Option<T>) -> DomainResult<T> {
    value.ok_or_else(|| DomainError::validation(format!("{field} is required")))
}
