//! Typed parameter extraction from `serde_json::Value` objects.
//!
//! Each helper takes a JSON value, a key and a default. Missing keys and
//! wrong types yield the default, so callers always get a usable value.

use serde_json::Value;

/// Reads `params[name]` as `f64`. Integers are accepted.
pub fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// Reads `params[name]` as `f64`, treating 0 and NaN like a missing key.
///
/// For settings where zero is never meaningful, such as noise step sizes
/// and particle spawn coordinates, an explicit 0 still yields `default`.
pub fn param_nonzero_f64(params: &Value, name: &str, default: f64) -> f64 {
    match param_f64(params, name, default) {
        v if v == 0.0 || v.is_nan() => default,
        v => v,
    }
}

/// Reads `params[name]` as a non-negative integer.
pub fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

/// Reads `params[name]` as a string.
pub fn param_string(params: &Value, name: &str, default: &str) -> String {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| default.to_owned())
}
