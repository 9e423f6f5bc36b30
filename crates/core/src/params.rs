//! Helpers for reading typed values out of `serde_json::Value` configs.
//!
//! The `param_*` getters never fail: a missing or mistyped key yields the
//! supplied default. The `require_*` getters are used by the pipeline
//! validators and fail with `RenderError::Configuration` instead.

use glam::Vec3;
use serde_json::Value;

use crate::error::RenderError;

/// Extracts an `f32` from `params[name]`, returning `default` if missing or wrong type.
///
/// Accepts both JSON floats and integers.
pub fn param_f32(params: &Value, name: &str, default: f32) -> f32 {
    params
        .get(name)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .unwrap_or(default)
}

/// Extracts a `u32` from `params[name]`, returning `default` if missing,
/// negative, fractional or too large.
pub fn param_u32(params: &Value, name: &str, default: u32) -> u32 {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(default)
}

/// Extracts a three-element numeric array as a `Vec3`.
pub fn param_vec3(params: &Value, name: &str, default: Vec3) -> Vec3 {
    let Some(items) = params.get(name).and_then(Value::as_array) else {
        return default;
    };
    match items.as_slice() {
        [x, y, z] => match (x.as_f64(), y.as_f64(), z.as_f64()) {
            (Some(x), Some(y), Some(z)) => Vec3::new(x as f32, y as f32, z as f32),
            _ => default,
        },
        _ => default,
    }
}

/// Returns `params[name]` as a number.
///
/// # Errors
///
/// `RenderError::Configuration` if the key is absent or not numeric.
pub fn require_f64(params: &Value, name: &str) -> Result<f64, RenderError> {
    let value = params
        .get(name)
        .ok_or_else(|| RenderError::Configuration(format!("missing key '{name}'")))?;
    value
        .as_f64()
        .ok_or_else(|| RenderError::Configuration(format!("'{name}' must be a number, got {value}")))
}

/// Fails unless every key in `names` is present in `params`.
///
/// # Errors
///
/// `RenderError::Configuration` naming the missing keys.
pub fn require_keys(params: &Value, names: &[&str]) -> Result<(), RenderError> {
    let missing: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| params.get(name).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RenderError::Configuration(format!(
            "missing keys: {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- param_f32 --

    #[test]
    fn param_f32_extracts_existing_float() {
        let params = json!({"fov": 45.5});
        assert_eq!(param_f32(&params, "fov", 60.0), 45.5);
    }

    #[test]
    fn param_f32_extracts_integer() {
        let params = json!({"fov": 90});
        assert_eq!(param_f32(&params, "fov", 60.0), 90.0);
    }

    #[test]
    fn param_f32_returns_default_for_wrong_type() {
        let params = json!({"fov": "wide"});
        assert_eq!(param_f32(&params, "fov", 60.0), 60.0);
    }

    // -- param_u32 --

    #[test]
    fn param_u32_extracts_existing_integer() {
        let params = json!({"max_steps": 128});
        assert_eq!(param_u32(&params, "max_steps", 64), 128);
    }

    #[test]
    fn param_u32_returns_default_for_negative_or_fractional() {
        assert_eq!(param_u32(&json!({"max_steps": -3}), "max_steps", 64), 64);
        assert_eq!(param_u32(&json!({"max_steps": 2.5}), "max_steps", 64), 64);
    }

    #[test]
    fn param_u32_returns_default_when_out_of_range() {
        let params = json!({"max_steps": 5_000_000_000u64});
        assert_eq!(param_u32(&params, "max_steps", 64), 64);
    }

    // -- param_vec3 --

    #[test]
    fn param_vec3_reads_three_numbers() {
        let params = json!({"position": [1, 2.5, -3]});
        assert_eq!(
            param_vec3(&params, "position", Vec3::ZERO),
            Vec3::new(1.0, 2.5, -3.0)
        );
    }

    #[test]
    fn param_vec3_returns_default_for_wrong_length() {
        let params = json!({"position": [1, 2]});
        assert_eq!(param_vec3(&params, "position", Vec3::ONE), Vec3::ONE);
    }

    #[test]
    fn param_vec3_returns_default_for_non_numeric_entry() {
        let params = json!({"position": [1, "two", 3]});
        assert_eq!(param_vec3(&params, "position", Vec3::ONE), Vec3::ONE);
    }

    // -- require_* --

    #[test]
    fn require_f64_reports_missing_key() {
        let err = require_f64(&json!({}), "min_distance").unwrap_err();
        assert!(err.to_string().contains("min_distance"), "got: {err}");
    }

    #[test]
    fn require_f64_reports_non_numeric_value() {
        let err = require_f64(&json!({"fov": null}), "fov").unwrap_err();
        assert!(matches!(err, RenderError::Configuration(_)));
    }

    #[test]
    fn require_keys_lists_every_missing_key() {
        let err = require_keys(&json!({"fov": 60}), &["fov", "up", "target"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("up") && msg.contains("target"), "got: {msg}");
        assert!(!msg.contains("fov"), "present key reported: {msg}");
    }

    #[test]
    fn require_keys_accepts_complete_config() {
        assert!(require_keys(&json!({"a": 1, "b": null}), &["a", "b"]).is_ok());
    }
}
