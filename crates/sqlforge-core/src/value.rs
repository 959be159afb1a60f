//! Dynamic SQL values.

use serde::{Deserialize, Serialize};

use crate::error::{CastError, Error};

/// A dynamically-typed SQL value.
///
/// `Value` carries both domain values (what application code binds and reads
/// back) and wire values (what a type converter hands to the executor). The
/// temporal variants use fixed epochs so they stay `Copy`-cheap and orderable:
///
/// - `Date`: days since 1970-01-01
/// - `Time`: microseconds since midnight
/// - `Timestamp`: microseconds since 1970-01-01T00:00:00 UTC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,

    /// Boolean value
    Bool(bool),

    /// Signed integer (all integer widths are widened to 64 bits)
    Int(i64),

    /// Double precision floating point
    Float(f64),

    /// Arbitrary precision decimal (stored as its textual form)
    Decimal(String),

    /// Text string
    Text(String),

    /// Binary data
    Bytes(Vec<u8>),

    /// Date (days since epoch)
    Date(i32),

    /// Time (microseconds since midnight)
    Time(i64),

    /// Timestamp (microseconds since epoch, UTC)
    Timestamp(i64),

    /// UUID (as 16 bytes)
    Uuid([u8; 16]),

    /// JSON document
    Json(serde_json::Value),

    /// List of values, expanded into one placeholder per element by `IN` comparisons
    Array(Vec<Value>),
}

impl Value {
    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a list.
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Get the SQL-ish name of this value's variant.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::Decimal(_) => "DECIMAL",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BLOB",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::Uuid(_) => "UUID",
            Value::Json(_) => "JSON",
            Value::Array(_) => "ARRAY",
        }
    }

    /// Infer the logical type name a converter would be registered under.
    ///
    /// Used when a value is bound without an explicit type. Lists infer from
    /// their first non-null element and carry the `[]` suffix. `Null` has no
    /// logical type.
    pub fn logical_type(&self) -> Option<String> {
        let name = match self {
            Value::Null => return None,
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "string",
            Value::Bytes(_) => "binary",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "datetime",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Array(items) => {
                let inner = items.iter().find_map(Value::logical_type)?;
                return Some(format!("{inner}[]"));
            }
        };
        Some(name.to_string())
    }

    /// Try to convert this value to a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Try to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Binary data. Byte vectors converted with `From` become lists; use
    /// this (or `From<&[u8]>`) for `BYTEA`/`BLOB` values.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(data.into())
    }

    /// A UUID from its 16 raw bytes.
    pub fn uuid(bytes: [u8; 16]) -> Self {
        Value::Uuid(bytes)
    }

    /// Borrow the elements of a list value.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! int_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

int_from!(i8, i16, i32, i64, u8, u16, u32);

impl TryFrom<u64> for Value {
    type Error = Error;

    fn try_from(v: u64) -> Result<Self, Self::Error> {
        i64::try_from(v).map(Value::Int).map_err(|_| {
            Error::Cast(
                CastError::new(&Value::Text(v.to_string()), "integer")
                    .with_reason("value exceeds i64::MAX"),
            )
        })
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

// TryFrom implementations for extracting values

fn mismatch(value: &Value, expected: &str) -> Error {
    Error::Cast(CastError::new(value, expected))
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_bool().ok_or_else(|| mismatch(&value, "bool"))
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_i64().ok_or_else(|| mismatch(&value, "i64"))
    }
}

impl TryFrom<Value> for i32 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let wide = value.as_i64().ok_or_else(|| mismatch(&value, "i32"))?;
        i32::try_from(wide).map_err(|e| Error::Cast(CastError::new(&value, "i32").with_reason(e)))
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_f64().ok_or_else(|| mismatch(&value, "f64"))
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) | Value::Decimal(s) => Ok(s),
            other => Err(mismatch(&other, "String")),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch(&other, "Vec<u8>")),
        }
    }
}

impl TryFrom<Value> for serde_json::Value {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Json(v) => Ok(v),
            Value::Text(s) => serde_json::from_str(&s).map_err(|e| {
                Error::Cast(CastError::new(&Value::Text(s.clone()), "json").with_reason(e))
            }),
            other => Err(mismatch(&other, "serde_json::Value")),
        }
    }
}

impl TryFrom<Value> for [u8; 16] {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Uuid(v) => Ok(v),
            Value::Bytes(ref b) if b.len() == 16 => {
                let mut out = [0u8; 16];
                out.copy_from_slice(b);
                Ok(out)
            }
            other => Err(mismatch(&other, "[u8; 16]")),
        }
    }
}

impl<T> TryFrom<Value> for Option<T>
where
    T: TryFrom<Value, Error = Error>,
{
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        if value.is_null() {
            Ok(None)
        } else {
            T::try_from(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_integers_widen() {
        assert_eq!(Value::from(42i8), Value::Int(42));
        assert_eq!(Value::from(42i16), Value::Int(42));
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(42u32), Value::Int(42));
        assert_eq!(Value::from(42i64), Value::Int(42));
    }

    #[test]
    fn test_try_from_u64() {
        assert_eq!(Value::try_from(7u64).unwrap(), Value::Int(7));
        assert!(Value::try_from(u64::MAX).is_err());
    }

    #[test]
    fn test_from_option_and_lists() {
        assert_eq!(Value::from(Some(3)), Value::Int(3));
        assert_eq!(Value::from(Option::<i32>::None), Value::Null);
        assert_eq!(
            Value::from(vec![1, 2]),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(
            Value::from(["a", "b"]),
            Value::Array(vec![Value::Text("a".into()), Value::Text("b".into())])
        );
    }

    #[test]
    fn test_byte_containers_are_lists_unless_explicit() {
        assert_eq!(
            Value::from(vec![1u8, 2]),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(Value::from(&[1u8, 2][..]), Value::Bytes(vec![1, 2]));
        assert_eq!(Value::bytes(vec![1u8, 2]), Value::Bytes(vec![1, 2]));
        assert_eq!(Value::uuid([7; 16]), Value::Uuid([7; 16]));
    }

    #[test]
    fn test_logical_type_inference() {
        assert_eq!(Value::Int(1).logical_type().as_deref(), Some("integer"));
        assert_eq!(Value::Bool(true).logical_type().as_deref(), Some("boolean"));
        assert_eq!(Value::Timestamp(0).logical_type().as_deref(), Some("datetime"));
        assert_eq!(Value::Null.logical_type(), None);
        assert_eq!(
            Value::Array(vec![Value::Null, Value::Int(1)])
                .logical_type()
                .as_deref(),
            Some("integer[]")
        );
        assert_eq!(Value::Array(vec![]).logical_type(), None);
    }

    #[test]
    fn test_try_from_extractors() {
        assert!(bool::try_from(Value::Int(1)).unwrap());
        assert_eq!(i64::try_from(Value::Int(-5)).unwrap(), -5);
        assert!(i32::try_from(Value::Int(i64::MAX)).is_err());
        assert_eq!(String::try_from(Value::Text("x".into())).unwrap(), "x");
        assert!(String::try_from(Value::Int(1)).is_err());
        assert_eq!(Option::<i64>::try_from(Value::Null).unwrap(), None);
        assert_eq!(
            serde_json::Value::try_from(Value::Text("{\"a\":1}".into())).unwrap(),
            serde_json::json!({"a": 1})
        );
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Decimal("1.5".into()).as_f64(), Some(1.5));
        assert_eq!(Value::Text("abc".into()).as_bytes(), Some(&b"abc"[..]));
        assert!(Value::Null.is_null());
        assert!(Value::Array(vec![]).is_array());
        assert_eq!(Value::Json(serde_json::json!(null)).type_name(), "JSON");
    }
}
