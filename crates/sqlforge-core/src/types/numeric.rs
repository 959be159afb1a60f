//! Integer, float and decimal converters.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::{ParameterKind, TypeConverter, rejected};
use crate::error::{CastError, Result};
use crate::value::Value;

/// 2^63, the first float above `i64::MAX`. `i64::MIN` is exactly `-2^63`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// The integral part of `f`, when it is finite and fits in an `i64`.
fn truncate_to_i64(f: f64) -> Option<i64> {
    let t = f.trunc();
    (t.is_finite() && (-I64_BOUND..I64_BOUND).contains(&t)).then_some(t as i64)
}

/// Integers of every width. Registered as `integer`, `tinyinteger`,
/// `smallinteger` and `biginteger`.
#[derive(Debug, Clone)]
pub struct IntegerType {
    name: String,
}

impl IntegerType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn cast(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Int(v) => Ok(Value::Int(*v)),
            Value::Bool(v) => Ok(Value::Int(i64::from(*v))),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => truncate_to_i64(*f)
                .map(Value::Int)
                .ok_or_else(|| CastError::new(value, &self.name).with_reason("out of range").into()),
            Value::Text(s) | Value::Decimal(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| CastError::new(value, &self.name).with_reason(e).into()),
            other => Err(CastError::new(other, &self.name).into()),
        }
    }
}

impl TypeConverter for IntegerType {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Int
    }

    fn to_database(&self, value: &Value) -> Result<Value> {
        self.cast(value)
    }

    fn to_domain(&self, value: &Value) -> Result<Value> {
        self.cast(value)
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        match input {
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(truncate_to_i64))
                .map_or_else(|| rejected(&self.name, input), Value::Int),
            serde_json::Value::String(s) if s.trim().is_empty() => Value::Null,
            serde_json::Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(truncate_to_i64))
                    .map_or_else(|| rejected(&self.name, input), Value::Int)
            }
            serde_json::Value::Null => Value::Null,
            _ => rejected(&self.name, input),
        }
    }
}

/// Double precision floats. Registered as `float`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatType;

impl FloatType {
    fn cast(value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Float(f) => Ok(Value::Float(*f)),
            Value::Int(v) => Ok(Value::Float(*v as f64)),
            Value::Text(s) | Value::Decimal(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| CastError::new(value, "float").with_reason(e).into()),
            other => Err(CastError::new(other, "float").into()),
        }
    }
}

impl TypeConverter for FloatType {
    fn name(&self) -> &str {
        "float"
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Str
    }

    fn to_database(&self, value: &Value) -> Result<Value> {
        Self::cast(value)
    }

    fn to_domain(&self, value: &Value) -> Result<Value> {
        Self::cast(value)
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        match input {
            serde_json::Value::Number(n) => n
                .as_f64()
                .map_or_else(|| rejected("float", input), Value::Float),
            serde_json::Value::String(s) if s.trim().is_empty() => Value::Null,
            serde_json::Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_or_else(|_| rejected("float", input), Value::Float),
            serde_json::Value::Null => Value::Null,
            _ => rejected("float", input),
        }
    }
}

/// Arbitrary precision decimals. Registered as `decimal`.
///
/// Values are normalized on the way in and out (`1.500` becomes `1.5`), so
/// the round trip is lossy in textual precision only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalType;

impl DecimalType {
    fn parse(value: &Value) -> Result<Value> {
        let decimal = match value {
            Value::Null => return Ok(Value::Null),
            Value::Int(v) => Decimal::from(*v),
            Value::Float(f) => Decimal::try_from(*f)
                .map_err(|e| CastError::new(value, "decimal").with_reason(e))?,
            Value::Text(s) | Value::Decimal(s) => Decimal::from_str(s.trim())
                .map_err(|e| CastError::new(value, "decimal").with_reason(e))?,
            other => return Err(CastError::new(other, "decimal").into()),
        };
        Ok(Value::Decimal(decimal.normalize().to_string()))
    }
}

impl TypeConverter for DecimalType {
    fn name(&self) -> &str {
        "decimal"
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Str
    }

    fn to_database(&self, value: &Value) -> Result<Value> {
        Self::parse(value)
    }

    fn to_domain(&self, value: &Value) -> Result<Value> {
        Self::parse(value)
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        let text = match input {
            serde_json::Value::Null => return Value::Null,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) if s.trim().is_empty() => return Value::Null,
            serde_json::Value::String(s) => s.clone(),
            _ => return rejected("decimal", input),
        };
        Self::parse(&Value::Text(text)).unwrap_or_else(|_| rejected("decimal", input))
    }
}
