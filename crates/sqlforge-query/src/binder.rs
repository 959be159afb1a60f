//! Placeholder allocation and parameter storage.

use sqlforge_core::Value;

/// How placeholder tokens are spelled in the emitted SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (MySQL, SQLite)
    #[default]
    Positional,
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
    /// `:c0`, `:c1`, ...
    Named,
}

impl PlaceholderStyle {
    /// Token for the zero-based parameter `index`.
    pub fn token(self, index: usize) -> String {
        match self {
            PlaceholderStyle::Positional => "?".to_string(),
            PlaceholderStyle::Numbered => format!("${}", index + 1),
            PlaceholderStyle::Named => format!(":c{index}"),
        }
    }
}

/// One bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub placeholder: String,
    pub value: Value,
    /// Logical type name, explicit or inferred from the value
    pub type_name: Option<String>,
}

/// Allocates placeholders and records the value bound to each one, in order.
///
/// A binder is scoped to exactly one compile pass. Queries create a fresh one
/// every time they recompile, so tokens always start from the first index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueBinder {
    style: PlaceholderStyle,
    bindings: Vec<Binding>,
    counter: usize,
}

impl ValueBinder {
    pub fn new(style: PlaceholderStyle) -> Self {
        Self {
            style,
            bindings: Vec::new(),
            counter: 0,
        }
    }

    pub fn style(&self) -> PlaceholderStyle {
        self.style
    }

    /// Allocate the next placeholder token.
    pub fn placeholder(&mut self) -> String {
        let token = self.style.token(self.counter);
        self.counter += 1;
        token
    }

    /// Record a value for a token.
    ///
    /// Named tokens are unique, so binding an existing named token replaces
    /// its value. Positional tokens always append.
    pub fn bind(&mut self, placeholder: impl Into<String>, value: Value, type_name: Option<String>) {
        let placeholder = placeholder.into();
        if self.style != PlaceholderStyle::Positional {
            if let Some(existing) = self
                .bindings
                .iter_mut()
                .find(|b| b.placeholder == placeholder)
            {
                existing.value = value;
                existing.type_name = type_name;
                return;
            }
        }
        self.bindings.push(Binding {
            placeholder,
            value,
            type_name,
        });
    }

    /// Allocate a token and bind `value` to it. Without an explicit type the
    /// logical type is inferred from the value.
    pub fn push(&mut self, value: Value, type_name: Option<&str>) -> String {
        let type_name = type_name
            .map(str::to_string)
            .or_else(|| value.logical_type());
        let token = self.placeholder();
        self.bind(token.clone(), value, type_name);
        token
    }

    /// Bind every element of a list, one token per element.
    ///
    /// A list type such as `integer[]` binds each element as `integer`.
    pub fn push_list(&mut self, values: &[Value], type_name: Option<&str>) -> Vec<String> {
        let element_type = type_name.map(|t| t.strip_suffix("[]").unwrap_or(t));
        values
            .iter()
            .map(|value| self.push(value.clone(), element_type))
            .collect()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Bound values in token order.
    pub fn values(&self) -> Vec<Value> {
        self.bindings.iter().map(|b| b.value.clone()).collect()
    }

    /// `(value, type)` pairs in token order, ready for `TypeRegistry::to_params`.
    pub fn typed_values(&self) -> impl Iterator<Item = (&Value, Option<&str>)> {
        self.bindings
            .iter()
            .map(|b| (&b.value, b.type_name.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Discard all bindings and restart the token sequence.
    pub fn reset(&mut self) {
        self.bindings.clear();
        self.counter = 0;
    }
}
