//! Result rows handed back by a statement executor.

use std::collections::HashMap;
use std::sync::Arc;

use crate::Result;
use crate::error::{CastError, Error};
use crate::value::Value;

/// Column metadata shared across all rows in a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    names: Vec<String>,
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create new column info from a list of column names.
    pub fn new(names: Vec<String>) -> Self {
        let name_to_index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            names,
            name_to_index,
        }
    }

    /// Get the index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single row returned from the executor.
///
/// Rows from the same result set share their `ColumnInfo`. Values are
/// mutable in place so result casting can rewrite wire values into domain
/// values without rebuilding the row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a new row with its own column metadata.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        let columns = Arc::new(ColumnInfo::new(column_names));
        Self { values, columns }
    }

    /// Create a new row with shared column metadata.
    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Replace the value of a named column. Returns `false` when the column is absent.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.columns.index_of(name) {
            Some(i) if i < self.values.len() => {
                self.values[i] = value;
                true
            }
            _ => false,
        }
    }

    /// Get a typed value by column name.
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self
            .get_by_name(name)
            .ok_or_else(|| Error::Custom(format!("column '{}' not found", name)))?;
        T::from_value(value)
    }

    /// Iterate over (column_name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Trait for converting from a borrowed `Value` to a typed value.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

impl<T> FromValue for T
where
    T: TryFrom<Value, Error = Error>,
{
    fn from_value(value: &Value) -> Result<Self> {
        T::try_from(value.clone()).map_err(|e| match e {
            Error::Cast(c) => Error::Cast(c),
            other => Error::Cast(
                CastError::new(value, std::any::type_name::<T>()).with_reason(other),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row::new(
            vec!["id".into(), "title".into()],
            vec![Value::Int(1), Value::Text("Hello".into())],
        )
    }

    #[test]
    fn test_access_by_index_and_name() {
        let row = sample();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(&Value::Int(1)));
        assert_eq!(row.get_by_name("title"), Some(&Value::Text("Hello".into())));
        assert_eq!(row.get_by_name("missing"), None);
        assert_eq!(row.get_named::<i64>("id").unwrap(), 1);
        assert!(row.get_named::<i64>("title").is_err());
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut row = sample();
        assert!(row.set("id", Value::Int(9)));
        assert!(!row.set("nope", Value::Null));
        assert_eq!(row.get_by_name("id"), Some(&Value::Int(9)));
        let pairs: Vec<_> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(pairs, vec!["id", "title"]);
    }

    #[test]
    fn test_shared_columns() {
        let row = sample();
        let other = Row::with_columns(row.column_info(), vec![Value::Int(2), Value::Null]);
        assert!(Arc::ptr_eq(&row.column_info(), &other.column_info()));
    }
}
