//! Map-style condition input for `where` and `having`.
//!
//! A [`Conditions`] value is an ordered list of `"field op" => value` entries
//! plus nested `AND` / `OR` / `NOT` groups. It is lowered to an expression tree
//! when handed to a query, at which point each field's logical type is looked
//! up in the query's [`TypeMap`].

use sqlforge_core::Value;

use crate::expr::{BoolOp, Comparison, Conjunction, Expr};
use crate::type_map::TypeMap;

#[derive(Debug, Clone)]
enum Entry {
    Pair { key: String, value: Value },
    Group { op: GroupOp, conditions: Conditions },
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupOp {
    And,
    Or,
    Not,
}

/// Ordered field/value conditions, conjoined with `AND`.
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    entries: Vec<Entry>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `"field"` or `"field op"` entry, e.g. `("created >=", date)`.
    pub fn add(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push(Entry::Pair {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Nested group joined with `AND` (the reserved `AND` key).
    pub fn and(mut self, conditions: Conditions) -> Self {
        self.entries.push(Entry::Group {
            op: GroupOp::And,
            conditions,
        });
        self
    }

    /// Nested group joined with `OR` (the reserved `OR` key).
    pub fn or(mut self, conditions: Conditions) -> Self {
        self.entries.push(Entry::Group {
            op: GroupOp::Or,
            conditions,
        });
        self
    }

    /// Negated group (the reserved `NOT` key).
    pub fn not(mut self, conditions: Conditions) -> Self {
        self.entries.push(Entry::Group {
            op: GroupOp::Not,
            conditions,
        });
        self
    }

    /// Add a ready-made expression.
    pub fn expr(mut self, expr: impl Into<Expr>) -> Self {
        self.entries.push(Entry::Expr(expr.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lower into expressions, one per entry.
    pub fn into_exprs(self, types: &TypeMap) -> Vec<Expr> {
        self.entries
            .into_iter()
            .map(|entry| match entry {
                Entry::Pair { key, value } => {
                    let (field, operator) = parse_key(&key);
                    let mut comparison = Comparison::new(field.as_str(), operator, value);
                    if let Some(type_name) = types.type_of(&field) {
                        comparison.type_name = Some(if comparison_is_list(&comparison) {
                            format!("{type_name}[]")
                        } else {
                            type_name.to_string()
                        });
                    }
                    Expr::Comparison(comparison)
                }
                Entry::Group { op, conditions } => {
                    let children = conditions.into_exprs(types);
                    match op {
                        GroupOp::And => Conjunction::with_children(BoolOp::And, children).into(),
                        GroupOp::Or => Conjunction::with_children(BoolOp::Or, children).into(),
                        GroupOp::Not => {
                            Expr::not(Conjunction::with_children(BoolOp::And, children))
                        }
                    }
                }
                Entry::Expr(expr) => expr,
            })
            .collect()
    }

    /// Lower into a single `AND` conjunction.
    pub fn into_conjunction(self, types: &TypeMap) -> Conjunction {
        Conjunction::with_children(BoolOp::And, self.into_exprs(types))
    }
}

fn comparison_is_list(comparison: &Comparison) -> bool {
    matches!(
        comparison.value,
        crate::expr::Operand::Value(Value::Array(_))
    ) || matches!(
        comparison.normalized_operator().as_str(),
        "IN" | "NOT IN"
    )
}

/// Split a condition key into field and operator.
///
/// `"id"` is an equality, `"age >"` uses the trailing operator, and
/// two-word operators ending in `NOT ...` or `IS NOT` are kept together.
pub fn parse_key(key: &str) -> (String, String) {
    let parts: Vec<&str> = key.split_whitespace().collect();
    match parts.len() {
        0 => (String::new(), "=".to_string()),
        1 => (parts[0].to_string(), "=".to_string()),
        2 => (parts[0].to_string(), parts[1].to_string()),
        n => {
            let second_last = parts[n - 2].to_ascii_lowercase();
            let last = parts[n - 1].to_ascii_lowercase();
            let two_word = second_last == "not" || (second_last == "is" && last == "not");
            let split = if two_word { n - 2 } else { n - 1 };
            (parts[..split].join(" "), parts[split..].join(" "))
        }
    }
}

/// Input accepted by `where` / `having`.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Field/value map, conjoined with `AND`
    Map(Conditions),
    /// Trusted SQL, not escaped further
    Raw(String),
    Expr(Expr),
}

impl From<Conditions> for Condition {
    fn from(c: Conditions) -> Self {
        Condition::Map(c)
    }
}

impl From<&str> for Condition {
    fn from(sql: &str) -> Self {
        Condition::Raw(sql.to_string())
    }
}

impl From<String> for Condition {
    fn from(sql: String) -> Self {
        Condition::Raw(sql)
    }
}

impl From<Expr> for Condition {
    fn from(e: Expr) -> Self {
        Condition::Expr(e)
    }
}

impl From<Conjunction> for Condition {
    fn from(c: Conjunction) -> Self {
        Condition::Expr(Expr::Conjunction(c))
    }
}

impl From<Comparison> for Condition {
    fn from(c: Comparison) -> Self {
        Condition::Expr(Expr::Comparison(c))
    }
}

/// Build [`Conditions`] from `"key" => value` pairs.
///
/// ```ignore
/// let c = conditions! { "author_id" => 5, "published" => true };
/// ```
#[macro_export]
macro_rules! conditions {
    () => {
        $crate::Conditions::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::Conditions::new()$(.add($key, $value))+
    };
}
