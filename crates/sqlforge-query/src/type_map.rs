//! Per-field default logical types.

use std::collections::HashMap;

/// Maps field names to logical type names so callers do not have to repeat
/// the type on every condition.
///
/// Lookups try the name as given, then the unqualified column
/// (`articles.id` falls back to `id`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeMap {
    defaults: HashMap<String, String>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.add(field, type_name);
        self
    }

    pub fn add(&mut self, field: impl Into<String>, type_name: impl Into<String>) {
        self.defaults.insert(field.into(), type_name.into());
    }

    /// Replace all defaults.
    pub fn set_defaults<K, V, I>(&mut self, types: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.defaults.clear();
        self.add_defaults(types);
    }

    /// Merge defaults, replacing existing entries for the same field.
    pub fn add_defaults<K, V, I>(&mut self, types: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (field, type_name) in types {
            self.add(field, type_name);
        }
    }

    pub fn type_of(&self, field: &str) -> Option<&str> {
        let field = field.trim();
        if let Some(t) = self.defaults.get(field) {
            return Some(t);
        }
        let (_, column) = field.rsplit_once('.')?;
        self.defaults.get(column).map(String::as_str)
    }

    pub fn defaults(&self) -> &HashMap<String, String> {
        &self.defaults
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_falls_back_to_column() {
        let map = TypeMap::new().with("id", "integer").with("a.created", "datetime");
        assert_eq!(map.type_of("id"), Some("integer"));
        assert_eq!(map.type_of("articles.id"), Some("integer"));
        assert_eq!(map.type_of("a.created"), Some("datetime"));
        assert_eq!(map.type_of("b.created"), None);
        assert_eq!(map.type_of("title"), None);
    }

    #[test]
    fn test_set_and_add_defaults() {
        let mut map = TypeMap::new().with("id", "integer");
        map.add_defaults([("title", "string")]);
        assert_eq!(map.defaults().len(), 2);
        map.set_defaults([("published", "boolean")]);
        assert_eq!(map.type_of("id"), None);
        assert_eq!(map.type_of("published"), Some("boolean"));
    }
}
