//! Logical types and the converter registry.
//!
//! A logical type (`integer`, `datetime`, `json`, ...) is a backend-neutral
//! name resolved through a [`TypeRegistry`] to a [`TypeConverter`]. Converters
//! cast values in three directions:
//!
//! - domain -> wire via [`TypeConverter::to_database`] (strict, fails with `CastError`)
//! - wire -> domain via [`TypeConverter::to_domain`]
//! - untrusted external input -> domain via [`TypeConverter::marshal`] (lenient, never fails)

mod numeric;
mod temporal;
mod text;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use crate::connection::Param;
use crate::error::{Error, Result, UnknownTypeError};
use crate::row::Row;
use crate::value::Value;

pub use numeric::{DecimalType, FloatType, IntegerType};
pub use temporal::{DateTimeType, DateType, TimeType};
pub use text::{BinaryType, BinaryUuidType, BoolType, JsonType, StringType, UuidType};

/// Driver-level kind of a bound statement parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    Null,
    Int,
    Bool,
    Str,
    /// Large object / binary data
    Lob,
}

/// Bidirectional value caster for one logical type.
pub trait TypeConverter: Send + Sync + fmt::Debug {
    /// The logical type name this converter was built for.
    fn name(&self) -> &str;

    /// Parameter kind used for non-null values.
    fn parameter_kind(&self) -> ParameterKind;

    /// Convert a domain value into its wire representation.
    fn to_database(&self, value: &Value) -> Result<Value>;

    /// Convert a wire value back into its domain representation.
    fn to_domain(&self, value: &Value) -> Result<Value>;

    /// Leniently convert external input. Unrecognized input maps to `Value::Null`.
    fn marshal(&self, input: &serde_json::Value) -> Value;

    /// Parameter kind for a specific value. `NULL` always binds as [`ParameterKind::Null`].
    fn to_parameter_kind(&self, value: &Value) -> ParameterKind {
        if value.is_null() {
            ParameterKind::Null
        } else {
            self.parameter_kind()
        }
    }

    /// Convert many wire values at once. Must agree with per-value `to_domain`.
    fn batch_to_domain(&self, values: &[Value]) -> Result<Vec<Value>> {
        values.iter().map(|v| self.to_domain(v)).collect()
    }

    /// Convert one named column across a set of rows in place.
    fn batch_rows_to_domain(&self, rows: &mut [Row], column: &str) -> Result<()> {
        let wire: Vec<Value> = rows
            .iter()
            .map(|row| row.get_by_name(column).cloned().unwrap_or(Value::Null))
            .collect();
        let domain = self.batch_to_domain(&wire)?;
        for (row, value) in rows.iter_mut().zip(domain) {
            row.set(column, value);
        }
        Ok(())
    }
}

/// Log a marshal rejection and return the null sentinel.
pub(crate) fn rejected(type_name: &str, input: &serde_json::Value) -> Value {
    tracing::warn!(type_name, input = %input, "marshal rejected input; using NULL");
    Value::Null
}

/// Registry of converters keyed by logical type name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    converters: HashMap<String, Arc<dyn TypeConverter>>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in converter registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for name in ["integer", "tinyinteger", "smallinteger", "biginteger"] {
            registry.register(name, Arc::new(IntegerType::new(name)));
        }
        registry.register("float", Arc::new(FloatType));
        registry.register("decimal", Arc::new(DecimalType));
        registry.register("boolean", Arc::new(BoolType));
        for name in ["string", "text", "char"] {
            registry.register(name, Arc::new(StringType::new(name)));
        }
        registry.register("binary", Arc::new(BinaryType));
        registry.register("uuid", Arc::new(UuidType));
        registry.register("binaryuuid", Arc::new(BinaryUuidType));
        registry.register("json", Arc::new(JsonType));
        registry.register("date", Arc::new(DateType));
        registry.register("time", Arc::new(TimeType));
        registry.register("datetime", Arc::new(DateTimeType::seconds("datetime")));
        registry.register("timestamp", Arc::new(DateTimeType::seconds("timestamp")));
        registry.register(
            "datetimefractional",
            Arc::new(DateTimeType::fractional("datetimefractional")),
        );
        registry
    }

    /// Register (or replace) the converter for a logical type name.
    pub fn register(&mut self, name: impl Into<String>, converter: Arc<dyn TypeConverter>) {
        self.converters.insert(name.into(), converter);
    }

    /// Look up a converter. A trailing `[]` (list type) resolves to the element type.
    pub fn get(&self, name: &str) -> Result<Arc<dyn TypeConverter>> {
        let base = name.strip_suffix("[]").unwrap_or(name);
        self.converters.get(base).cloned().ok_or_else(|| {
            Error::UnknownType(UnknownTypeError {
                name: name.to_string(),
            })
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.converters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Convert one binding to a wire parameter.
    ///
    /// Without an explicit type the logical type is inferred from the value;
    /// an untyped `NULL` binds as [`ParameterKind::Null`].
    pub fn to_param(&self, value: &Value, type_name: Option<&str>) -> Result<Param> {
        let inferred;
        let type_name = match type_name {
            Some(name) => name,
            None => match value.logical_type() {
                Some(name) => {
                    inferred = name;
                    inferred.as_str()
                }
                None => return Ok(Param::new(value.clone(), ParameterKind::Null)),
            },
        };
        let converter = self.get(type_name)?;
        let wire = match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| converter.to_database(item))
                    .collect::<Result<_>>()?,
            ),
            other => converter.to_database(other)?,
        };
        let kind = converter.to_parameter_kind(&wire);
        Ok(Param::new(wire, kind))
    }

    /// Convert an ordered list of `(value, type)` bindings to wire parameters.
    pub fn to_params<'a, I>(&self, bindings: I) -> Result<Vec<Param>>
    where
        I: IntoIterator<Item = (&'a Value, Option<&'a str>)>,
    {
        bindings
            .into_iter()
            .map(|(value, type_name)| self.to_param(value, type_name))
            .collect()
    }

    /// Cast result rows to domain values, one declared column type at a time.
    pub fn cast_rows<'a, I>(&self, rows: &mut [Row], column_types: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (column, type_name) in column_types {
            self.get(type_name)?.batch_rows_to_domain(rows, column)?;
        }
        Ok(())
    }
}

fn global_cell() -> &'static RwLock<TypeRegistry> {
    static REGISTRY: OnceLock<RwLock<TypeRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(TypeRegistry::with_defaults()))
}

/// A snapshot of the process-global registry.
pub fn global() -> TypeRegistry {
    global_cell()
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Register a converter in the process-global registry.
pub fn register(name: impl Into<String>, converter: Arc<dyn TypeConverter>) {
    global_cell()
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .register(name, converter);
}

/// Look up a converter in the process-global registry.
pub fn get(name: &str) -> Result<Arc<dyn TypeConverter>> {
    global_cell()
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_registered() {
        let registry = TypeRegistry::with_defaults();
        for name in [
            "integer",
            "biginteger",
            "float",
            "decimal",
            "boolean",
            "string",
            "text",
            "binary",
            "uuid",
            "binaryuuid",
            "json",
            "date",
            "time",
            "datetime",
            "timestamp",
            "datetimefractional",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(registry.contains("integer[]"));
        assert!(matches!(
            registry.get("geometry"),
            Err(Error::UnknownType(UnknownTypeError { ref name })) if name == "geometry"
        ));
    }

    #[test]
    fn test_null_always_binds_as_null_kind() {
        let registry = TypeRegistry::with_defaults();
        let converter = registry.get("integer").unwrap();
        assert_eq!(converter.to_parameter_kind(&Value::Null), ParameterKind::Null);
        assert_eq!(converter.to_parameter_kind(&Value::Int(1)), ParameterKind::Int);

        let param = registry.to_param(&Value::Null, Some("boolean")).unwrap();
        assert_eq!(param.kind, ParameterKind::Null);
        let param = registry.to_param(&Value::Null, None).unwrap();
        assert_eq!(param.kind, ParameterKind::Null);
    }

    #[test]
    fn test_to_params_infers_and_casts() {
        let registry = TypeRegistry::with_defaults();
        let five = Value::Int(5);
        let yes = Value::Bool(true);
        let word = Value::Text("12".into());
        let params = registry
            .to_params([
                (&five, Some("integer")),
                (&yes, None),
                (&word, Some("integer")),
            ])
            .unwrap();
        assert_eq!(params[0], Param::new(Value::Int(5), ParameterKind::Int));
        assert_eq!(params[1], Param::new(Value::Bool(true), ParameterKind::Bool));
        assert_eq!(params[2], Param::new(Value::Int(12), ParameterKind::Int));

        let bad = Value::Text("abc".into());
        assert!(matches!(
            registry.to_param(&bad, Some("integer")),
            Err(Error::Cast(_))
        ));
    }

    #[test]
    fn test_cast_rows_uses_declared_types() {
        let registry = TypeRegistry::with_defaults();
        let mut rows = vec![
            Row::new(
                vec!["id".into(), "flag".into()],
                vec![Value::Text("1".into()), Value::Int(1)],
            ),
            Row::new(
                vec!["id".into(), "flag".into()],
                vec![Value::Text("2".into()), Value::Int(0)],
            ),
        ];
        registry
            .cast_rows(&mut rows, [("id", "integer"), ("flag", "boolean")])
            .unwrap();
        assert_eq!(rows[0].get_by_name("id"), Some(&Value::Int(1)));
        assert_eq!(rows[1].get_by_name("flag"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_batch_matches_per_value() {
        let registry = TypeRegistry::with_defaults();
        for (name, wire) in [
            ("integer", vec![Value::Int(1), Value::Text("2".into()), Value::Null]),
            ("date", vec![Value::Text("2024-02-29".into()), Value::Null]),
            ("json", vec![Value::Text("{\"a\":[1]}".into())]),
        ] {
            let converter = registry.get(name).unwrap();
            let batch = converter.batch_to_domain(&wire).unwrap();
            let single: Vec<Value> = wire.iter().map(|v| converter.to_domain(v).unwrap()).collect();
            assert_eq!(batch, single, "{name}");
        }
    }

    #[test]
    fn test_round_trip_law() {
        let registry = TypeRegistry::with_defaults();
        let cases = [
            ("integer", Value::Int(-42)),
            ("float", Value::Float(2.5)),
            ("boolean", Value::Bool(true)),
            ("string", Value::Text("héllo".into())),
            ("binary", Value::Bytes(vec![0, 1, 255])),
            ("uuid", Value::Uuid([7; 16])),
            ("binaryuuid", Value::Uuid([9; 16])),
            ("json", Value::Json(json!({"k": [1, 2, null]}))),
            ("date", Value::Date(19_782)),
            ("time", Value::Time(3_723_000_000)),
            ("datetime", Value::Timestamp(1_700_000_000_000_000)),
            ("datetimefractional", Value::Timestamp(1_700_000_000_123_456)),
        ];
        for (name, value) in cases {
            let converter = registry.get(name).unwrap();
            let wire = converter.to_database(&value).unwrap();
            assert_eq!(converter.to_domain(&wire).unwrap(), value, "{name}");
        }
    }

    #[test]
    fn test_global_registry_accepts_custom_converters() {
        register("money", Arc::new(DecimalType));
        assert!(get("money").is_ok());
        assert!(global().contains("money"));
        assert!(get("integer").is_ok());
    }
}
