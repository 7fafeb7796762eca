// crates/fedcloud-info-core/src/lenient.rs
// ============================================================================
// Module: Lenient Scalar Decoding
// Description: Serde helpers for loosely-typed scalar fields.
// Purpose: Accept numbers published as strings (and vice versa) at the edge.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Site documents, the VO portal and object listings publish the same logical
//! scalar either as a JSON number or as a string. These helpers fold both
//! shapes into one Rust type so the rest of the crate never sees the variance.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;
use serde_json::Value;

// ============================================================================
// SECTION: Deserializers
// ============================================================================

/// Decodes a `u64` given either as a JSON number or a numeric string.
///
/// # Errors
///
/// Returns a deserializer error for negative, fractional, or non-numeric input.
pub fn u64_from_scalar<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_to_u64(&value)
        .ok_or_else(|| D::Error::custom(format!("expected unsigned integer, got {value}")))
}

/// Decodes an optional `u64`; `null` and absent values map to `None`.
///
/// # Errors
///
/// Returns a deserializer error for present values that are not unsigned integers.
pub fn opt_u64_from_scalar<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_to_u64(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected unsigned integer, got {value}"))),
    }
}

/// Decodes a string from any JSON scalar; `null` and absent values map to "".
///
/// # Errors
///
/// Returns a deserializer error for arrays and objects.
pub fn string_from_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(value) => scalar_to_string(&value)
            .ok_or_else(|| D::Error::custom(format!("expected scalar, got {value}"))),
    }
}

// ============================================================================
// SECTION: Value Helpers
// ============================================================================

/// Converts a JSON scalar into a string.
#[must_use]
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Converts a JSON number or numeric string into a `u64`.
fn scalar_to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
