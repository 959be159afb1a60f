//! Boolean, string, binary, UUID and JSON converters.

use uuid::Uuid;

use super::{ParameterKind, TypeConverter, rejected};
use crate::error::{CastError, Result};
use crate::value::Value;

/// Booleans. Registered as `boolean`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolType;

impl BoolType {
    fn parse_word(word: &str) -> Option<bool> {
        match word.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Some(true),
            "0" | "false" | "off" | "no" => Some(false),
            _ => None,
        }
    }

    fn cast(value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int(v) => Ok(Value::Bool(*v != 0)),
            Value::Text(s) => Self::parse_word(s)
                .map(Value::Bool)
                .ok_or_else(|| CastError::new(value, "boolean").into()),
            other => Err(CastError::new(other, "boolean").into()),
        }
    }
}

impl TypeConverter for BoolType {
    fn name(&self) -> &str {
        "boolean"
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Bool
    }

    fn to_database(&self, value: &Value) -> Result<Value> {
        Self::cast(value)
    }

    fn to_domain(&self, value: &Value) -> Result<Value> {
        Self::cast(value)
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        match input {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map_or_else(|| rejected("boolean", input), |f| Value::Bool(f != 0.0)),
            serde_json::Value::String(s) if s.is_empty() => Value::Null,
            serde_json::Value::String(s) => Self::parse_word(s)
                .map_or_else(|| rejected("boolean", input), Value::Bool),
            _ => rejected("boolean", input),
        }
    }
}

/// Character data. Registered as `string`, `text` and `char`.
#[derive(Debug, Clone)]
pub struct StringType {
    name: String,
}

impl StringType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn cast(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Text(s) | Value::Decimal(s) => Ok(Value::Text(s.clone())),
            Value::Int(v) => Ok(Value::Text(v.to_string())),
            Value::Float(f) => Ok(Value::Text(f.to_string())),
            Value::Bool(b) => Ok(Value::Text(if *b { "1" } else { "0" }.to_string())),
            Value::Bytes(b) => String::from_utf8(b.clone())
                .map(Value::Text)
                .map_err(|e| CastError::new(value, &self.name).with_reason(e).into()),
            other => Err(CastError::new(other, &self.name).into()),
        }
    }
}

impl TypeConverter for StringType {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Str
    }

    fn to_database(&self, value: &Value) -> Result<Value> {
        self.cast(value)
    }

    fn to_domain(&self, value: &Value) -> Result<Value> {
        self.cast(value)
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        match input {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Number(n) => Value::Text(n.to_string()),
            serde_json::Value::Bool(b) => Value::Text(if *b { "1" } else { "0" }.to_string()),
            _ => rejected(&self.name, input),
        }
    }
}

/// Raw bytes. Registered as `binary`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryType;

impl BinaryType {
    fn cast(value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Bytes(b) => Ok(Value::Bytes(b.clone())),
            Value::Text(s) => Ok(Value::Bytes(s.as_bytes().to_vec())),
            Value::Uuid(u) => Ok(Value::Bytes(u.to_vec())),
            other => Err(CastError::new(other, "binary").into()),
        }
    }
}

impl TypeConverter for BinaryType {
    fn name(&self) -> &str {
        "binary"
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Lob
    }

    fn to_database(&self, value: &Value) -> Result<Value> {
        Self::cast(value)
    }

    fn to_domain(&self, value: &Value) -> Result<Value> {
        Self::cast(value)
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        match input {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::String(s) => Value::Bytes(s.as_bytes().to_vec()),
            _ => rejected("binary", input),
        }
    }
}

fn parse_uuid(value: &Value, target: &str) -> Result<Uuid> {
    match value {
        Value::Uuid(bytes) => Ok(Uuid::from_bytes(*bytes)),
        Value::Bytes(b) => {
            Uuid::from_slice(b).map_err(|e| CastError::new(value, target).with_reason(e).into())
        }
        Value::Text(s) => Uuid::parse_str(s.trim())
            .map_err(|e| CastError::new(value, target).with_reason(e).into()),
        other => Err(CastError::new(other, target).into()),
    }
}

fn marshal_uuid(input: &serde_json::Value, target: &str) -> Value {
    match input {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::String(s) if s.is_empty() => Value::Null,
        serde_json::Value::String(s) => Uuid::parse_str(s.trim())
            .map_or_else(|_| rejected(target, input), |u| Value::Uuid(u.into_bytes())),
        _ => rejected(target, input),
    }
}

/// UUIDs stored as hyphenated text. Registered as `uuid`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidType;

impl TypeConverter for UuidType {
    fn name(&self) -> &str {
        "uuid"
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Str
    }

    fn to_database(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let uuid = parse_uuid(value, "uuid")?;
        Ok(Value::Text(uuid.hyphenated().to_string()))
    }

    fn to_domain(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Uuid(parse_uuid(value, "uuid")?.into_bytes()))
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        marshal_uuid(input, "uuid")
    }
}

/// UUIDs stored as 16 raw bytes. Registered as `binaryuuid`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryUuidType;

impl TypeConverter for BinaryUuidType {
    fn name(&self) -> &str {
        "binaryuuid"
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Lob
    }

    fn to_database(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Bytes(parse_uuid(value, "binaryuuid")?.as_bytes().to_vec()))
    }

    fn to_domain(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Uuid(parse_uuid(value, "binaryuuid")?.into_bytes()))
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        marshal_uuid(input, "binaryuuid")
    }
}

fn value_to_json(value: &Value) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(v) => serde_json::Value::from(*v),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| CastError::new(value, "json").with_reason("non-finite float"))?,
        Value::Text(s) | Value::Decimal(s) => serde_json::Value::String(s.clone()),
        Value::Json(v) => v.clone(),
        Value::Array(items) => serde_json::Value::Array(
            items.iter().map(value_to_json).collect::<Result<_>>()?,
        ),
        other => return Err(CastError::new(other, "json").into()),
    })
}

/// JSON documents stored as text. Registered as `json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonType;

impl TypeConverter for JsonType {
    fn name(&self) -> &str {
        "json"
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Str
    }

    fn to_database(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Text(value_to_json(value)?.to_string()))
    }

    fn to_domain(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Json(v) => Ok(Value::Json(v.clone())),
            Value::Text(s) => serde_json::from_str(s)
                .map(Value::Json)
                .map_err(|e| CastError::new(value, "json").with_reason(e).into()),
            Value::Bytes(b) => serde_json::from_slice(b)
                .map(Value::Json)
                .map_err(|e| CastError::new(value, "json").with_reason(e).into()),
            other => Err(CastError::new(other, "json").into()),
        }
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        match input {
            serde_json::Value::Null => Value::Null,
            other => Value::Json(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool_words() {
        assert_eq!(BoolType.to_database(&Value::Text("yes".into())).unwrap(), Value::Bool(true));
        assert_eq!(BoolType.to_domain(&Value::Int(0)).unwrap(), Value::Bool(false));
        assert!(BoolType.to_database(&Value::Text("maybe".into())).is_err());
        assert_eq!(BoolType.marshal(&json!("off")), Value::Bool(false));
        assert_eq!(BoolType.marshal(&json!("maybe")), Value::Null);
        assert_eq!(BoolType.marshal(&json!(1)), Value::Bool(true));
    }

    #[test]
    fn test_string_casts() {
        let t = StringType::new("string");
        assert_eq!(t.to_database(&Value::Int(5)).unwrap(), Value::Text("5".into()));
        assert!(t.to_database(&Value::Bytes(vec![0xff, 0xfe])).is_err());
        assert_eq!(t.marshal(&json!(3)), Value::Text("3".into()));
        assert_eq!(t.marshal(&json!({"a": 1})), Value::Null);
    }

    #[test]
    fn test_uuid_text_and_binary() {
        let text = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let wire = UuidType.to_database(&Value::Text(text.to_uppercase())).unwrap();
        assert_eq!(wire, Value::Text(text.to_string()));

        let domain = UuidType.to_domain(&wire).unwrap();
        let bin = BinaryUuidType.to_database(&domain).unwrap();
        assert!(matches!(bin, Value::Bytes(ref b) if b.len() == 16));
        assert_eq!(BinaryUuidType.to_domain(&bin).unwrap(), domain);

        assert!(UuidType.to_database(&Value::Text("nope".into())).is_err());
        assert_eq!(UuidType.marshal(&json!("nope")), Value::Null);
    }

    #[test]
    fn test_json_encodes_scalars() {
        assert_eq!(
            JsonType.to_database(&Value::Text("x".into())).unwrap(),
            Value::Text("\"x\"".into())
        );
        assert_eq!(
            JsonType.to_database(&Value::Array(vec![Value::Int(1), Value::Bool(false)])).unwrap(),
            Value::Text("[1,false]".into())
        );
        assert!(JsonType.to_database(&Value::Float(f64::NAN)).is_err());
        assert!(JsonType.to_domain(&Value::Text("{".into())).is_err());
        assert_eq!(JsonType.marshal(&json!([1])), Value::Json(json!([1])));
    }
}
