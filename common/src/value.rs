//! Lenient conversions from stored JSON scalars.
//!
//! Values in the configuration document are written by several clients
//! (management form posts arrive as strings, the control loop writes native
//! numbers), so readers coerce instead of matching on exact JSON types.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoerceError {
    #[error("value is missing")]
    Missing,
    #[error("cannot read {value} as {target}")]
    Unsupported { value: String, target: &'static str },
}

impl CoerceError {
    fn unsupported(value: &Value, target: &'static str) -> Self {
        Self::Unsupported {
            value: value.to_string(),
            target,
        }
    }
}

pub fn as_bool(value: &Value) -> Result<bool, CoerceError> {
    match value {
        Value::Null => Err(CoerceError::Missing),
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(n) => Ok(n >= 1),
            None => Err(CoerceError::unsupported(value, "bool")),
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(CoerceError::unsupported(value, "bool")),
        },
        _ => Err(CoerceError::unsupported(value, "bool")),
    }
}

pub fn as_int(value: &Value) -> Result<i64, CoerceError> {
    match value {
        Value::Null => Err(CoerceError::Missing),
        Value::Bool(flag) => Ok(i64::from(*flag)),
        Value::Number(number) => {
            if let Some(n) = number.as_i64() {
                return Ok(n);
            }
            match number.as_f64() {
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
                _ => Err(CoerceError::unsupported(value, "int")),
            }
        }
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| CoerceError::unsupported(value, "int")),
        _ => Err(CoerceError::unsupported(value, "int")),
    }
}

pub fn as_float(value: &Value) -> Result<f64, CoerceError> {
    match value {
        Value::Null => Err(CoerceError::Missing),
        Value::Bool(flag) => Ok(if *flag { 1.0 } else { 0.0 }),
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| CoerceError::unsupported(value, "float")),
        Value::String(text) => match text.trim().parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => Ok(parsed),
            _ => Err(CoerceError::unsupported(value, "float")),
        },
        _ => Err(CoerceError::unsupported(value, "float")),
    }
}

/// Round to `decimals` places, the way readings are stored.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10_f64.powi(decimals as i32);
    (value * scale).round() / scale
}
