//! SQL expression trees.
//!
//! Every node renders itself against a [`ValueBinder`] and can be walked with
//! [`Expr::visit`] / [`Expr::visit_mut`]. Walks are depth-first and post-order:
//! children are visited before their parent, so a transformation applied to a
//! parent sees already-transformed children. Embedded sub-queries are leaves;
//! they are translated by their own compile.

use sqlforge_core::{Error, Result, Value};

use crate::binder::ValueBinder;
use crate::query::Query;

/// Discriminant of an [`Expr`], used to key dialect expression hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Comparison,
    Conjunction,
    Not,
    Between,
    Function,
    OrderBy,
    ValueList,
    Identifier,
    Raw,
    SubQuery,
}

/// A SQL expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// `field <op> value`
    Comparison(Comparison),
    /// Children joined by `AND` / `OR`
    Conjunction(Conjunction),
    /// `NOT (...)`
    Not(Box<Expr>),
    /// `field BETWEEN low AND high`
    Between(Between),
    /// `NAME(args)`
    Function(FunctionCall),
    /// `ORDER BY ...`
    OrderBy(OrderByList),
    /// `VALUES (...), (...)` rows for an insert
    ValueList(ValueList),
    /// Column, table or other identifier text; quoted by the dialect
    Identifier(String),
    /// Trusted SQL emitted as-is
    Raw(String),
    /// A nested query, rendered in parentheses
    SubQuery(Box<Query>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    pub fn not(inner: impl Into<Expr>) -> Self {
        Expr::Not(Box::new(inner.into()))
    }

    pub fn subquery(query: Query) -> Self {
        Expr::SubQuery(Box::new(query))
    }

    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Comparison(_) => ExprKind::Comparison,
            Expr::Conjunction(_) => ExprKind::Conjunction,
            Expr::Not(_) => ExprKind::Not,
            Expr::Between(_) => ExprKind::Between,
            Expr::Function(_) => ExprKind::Function,
            Expr::OrderBy(_) => ExprKind::OrderBy,
            Expr::ValueList(_) => ExprKind::ValueList,
            Expr::Identifier(_) => ExprKind::Identifier,
            Expr::Raw(_) => ExprKind::Raw,
            Expr::SubQuery(_) => ExprKind::SubQuery,
        }
    }

    /// Whether this expression renders to nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::Conjunction(c) => c.is_empty(),
            Expr::Not(inner) => inner.is_empty(),
            Expr::OrderBy(o) => o.items.is_empty(),
            Expr::ValueList(v) => v.is_empty(),
            Expr::Raw(sql) | Expr::Identifier(sql) => sql.trim().is_empty(),
            _ => false,
        }
    }

    /// Render this expression, binding values through `binder`.
    pub fn to_sql(&self, binder: &mut ValueBinder) -> Result<String> {
        match self {
            Expr::Comparison(c) => c.to_sql(binder),
            Expr::Conjunction(c) => c.to_sql(binder),
            Expr::Not(inner) => {
                let sql = inner.to_sql(binder)?;
                if sql.is_empty() {
                    Ok(String::new())
                } else {
                    Ok(format!("NOT ({sql})"))
                }
            }
            Expr::Between(b) => b.to_sql(binder),
            Expr::Function(f) => f.to_sql(binder),
            Expr::OrderBy(o) => o.to_sql(binder),
            Expr::ValueList(v) => v.to_sql(binder),
            Expr::Identifier(name) => Ok(name.clone()),
            Expr::Raw(sql) => Ok(sql.clone()),
            Expr::SubQuery(query) => Ok(format!("({})", query.sql_with(binder)?)),
        }
    }

    /// Visit every node, children before parents.
    pub fn visit(&self, f: &mut dyn FnMut(&Expr)) {
        match self {
            Expr::Comparison(c) => {
                c.field.visit(f);
                if let Operand::Expr(value) = &c.value {
                    value.visit(f);
                }
            }
            Expr::Conjunction(c) => {
                for child in &c.children {
                    child.visit(f);
                }
            }
            Expr::Not(inner) => inner.visit(f),
            Expr::Between(b) => b.field.visit(f),
            Expr::Function(func) => {
                for arg in &func.args {
                    if let FunctionArg::Expr(e) = arg {
                        e.visit(f);
                    }
                }
            }
            Expr::OrderBy(o) => {
                for item in &o.items {
                    if let OrderTarget::Expr(e) = &item.target {
                        e.visit(f);
                    }
                }
            }
            Expr::ValueList(_) | Expr::Identifier(_) | Expr::Raw(_) | Expr::SubQuery(_) => {}
        }
        f(self);
    }

    /// Mutable post-order walk.
    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        match self {
            Expr::Comparison(c) => {
                c.field.visit_mut(f);
                if let Operand::Expr(value) = &mut c.value {
                    value.visit_mut(f);
                }
            }
            Expr::Conjunction(c) => {
                for child in &mut c.children {
                    child.visit_mut(f);
                }
            }
            Expr::Not(inner) => inner.visit_mut(f),
            Expr::Between(b) => b.field.visit_mut(f),
            Expr::Function(func) => {
                for arg in &mut func.args {
                    if let FunctionArg::Expr(e) = arg {
                        e.visit_mut(f);
                    }
                }
            }
            Expr::OrderBy(o) => {
                for item in &mut o.items {
                    if let OrderTarget::Expr(e) = &mut item.target {
                        e.visit_mut(f);
                    }
                }
            }
            Expr::ValueList(_) | Expr::Identifier(_) | Expr::Raw(_) | Expr::SubQuery(_) => {}
        }
        f(self);
    }
}

/// Identifier text, e.g. a column name.
impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::Identifier(name.to_string())
    }
}

impl From<String> for Expr {
    fn from(name: String) -> Self {
        Expr::Identifier(name)
    }
}

impl From<Comparison> for Expr {
    fn from(c: Comparison) -> Self {
        Expr::Comparison(c)
    }
}

impl From<Conjunction> for Expr {
    fn from(c: Conjunction) -> Self {
        Expr::Conjunction(c)
    }
}

impl From<Between> for Expr {
    fn from(b: Between) -> Self {
        Expr::Between(b)
    }
}

impl From<FunctionCall> for Expr {
    fn from(f: FunctionCall) -> Self {
        Expr::Function(f)
    }
}

impl From<OrderByList> for Expr {
    fn from(o: OrderByList) -> Self {
        Expr::OrderBy(o)
    }
}

impl From<ValueList> for Expr {
    fn from(v: ValueList) -> Self {
        Expr::ValueList(v)
    }
}

impl From<Query> for Expr {
    fn from(q: Query) -> Self {
        Expr::SubQuery(Box::new(q))
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone)]
pub enum Operand {
    /// Bound through the value binder
    Value(Value),
    /// Rendered inline
    Expr(Box<Expr>),
}

/// `field <op> value`.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub field: Box<Expr>,
    pub operator: String,
    pub value: Operand,
    pub type_name: Option<String>,
}

impl Comparison {
    /// Compare a field with a bound value.
    pub fn new(field: impl Into<Expr>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: Box::new(field.into()),
            operator: operator.into(),
            value: Operand::Value(value.into()),
            type_name: None,
        }
    }

    /// Compare a field with an inline expression (another column, a sub-query, ...).
    pub fn with_expr(
        field: impl Into<Expr>,
        operator: impl Into<String>,
        value: impl Into<Expr>,
    ) -> Self {
        Self {
            field: Box::new(field.into()),
            operator: operator.into(),
            value: Operand::Expr(Box::new(value.into())),
            type_name: None,
        }
    }

    /// Set the logical type used to bind the value.
    pub fn typed(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Operator in canonical upper case.
    pub fn normalized_operator(&self) -> String {
        self.operator
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase()
    }

    fn is_list(&self, op: &str) -> bool {
        matches!(self.value, Operand::Value(Value::Array(_)))
            || self.type_name.as_deref().is_some_and(|t| t.ends_with("[]"))
            || matches!(op, "IN" | "NOT IN")
    }

    pub fn to_sql(&self, binder: &mut ValueBinder) -> Result<String> {
        let field = self.field.to_sql(binder)?;
        let op = self.normalized_operator();
        let value = match &self.value {
            Operand::Expr(e) => {
                let rhs = e.to_sql(binder)?;
                return Ok(format!("{field} {op} {rhs}"));
            }
            Operand::Value(value) => value,
        };

        if value.is_null() {
            match op.as_str() {
                "=" | "IS" => return Ok(format!("{field} IS NULL")),
                "!=" | "<>" | "IS NOT" => return Ok(format!("{field} IS NOT NULL")),
                _ => {}
            }
        }

        if self.is_list(&op) {
            let items = match value {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            if items.is_empty() {
                return Err(Error::InvalidExpression(format!(
                    "`{field} {op}` requires at least one value"
                )));
            }
            let op = match op.as_str() {
                "=" => "IN".to_string(),
                "!=" | "<>" => "NOT IN".to_string(),
                _ => op,
            };
            let tokens = binder.push_list(&items, self.type_name.as_deref());
            return Ok(format!("{field} {op} ({})", tokens.join(", ")));
        }

        let token = binder.push(value.clone(), self.type_name.as_deref());
        Ok(format!("{field} {op} {token}"))
    }
}

/// Boolean connective of a [`Conjunction`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoolOp {
    #[default]
    And,
    Or,
}

impl BoolOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            BoolOp::And => "AND",
            BoolOp::Or => "OR",
        }
    }
}

/// Children joined by one boolean operator.
///
/// Also the fluent condition builder handed to `where_fn` callbacks. A nested
/// conjunction with more than one rendered child is parenthesized; the
/// outermost one is not. Empty children render to nothing and are skipped.
#[derive(Debug, Clone, Default)]
pub struct Conjunction {
    pub op: BoolOp,
    pub children: Vec<Expr>,
}

impl Conjunction {
    pub fn new(op: BoolOp) -> Self {
        Self {
            op,
            children: Vec::new(),
        }
    }

    pub fn and() -> Self {
        Self::new(BoolOp::And)
    }

    pub fn or() -> Self {
        Self::new(BoolOp::Or)
    }

    pub fn with_children(op: BoolOp, children: Vec<Expr>) -> Self {
        Self { op, children }
    }

    /// Append any expression.
    pub fn add(mut self, expr: impl Into<Expr>) -> Self {
        self.children.push(expr.into());
        self
    }

    pub fn push(&mut self, expr: impl Into<Expr>) {
        self.children.push(expr.into());
    }

    pub fn compare(self, field: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.add(Comparison::new(field, operator, value))
    }

    pub fn compare_typed(
        self,
        field: &str,
        operator: &str,
        value: impl Into<Value>,
        type_name: &str,
    ) -> Self {
        self.add(Comparison::new(field, operator, value).typed(type_name))
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.compare(field, "=", value)
    }

    pub fn not_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.compare(field, "!=", value)
    }

    pub fn gt(self, field: &str, value: impl Into<Value>) -> Self {
        self.compare(field, ">", value)
    }

    pub fn gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.compare(field, ">=", value)
    }

    pub fn lt(self, field: &str, value: impl Into<Value>) -> Self {
        self.compare(field, "<", value)
    }

    pub fn lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.compare(field, "<=", value)
    }

    pub fn like(self, field: &str, pattern: impl Into<Value>) -> Self {
        self.compare(field, "LIKE", pattern)
    }

    pub fn not_like(self, field: &str, pattern: impl Into<Value>) -> Self {
        self.compare(field, "NOT LIKE", pattern)
    }

    /// Case-insensitive LIKE. Rewritten by dialects without native `ILIKE`.
    pub fn ilike(self, field: &str, pattern: impl Into<Value>) -> Self {
        self.compare(field, "ILIKE", pattern)
    }

    pub fn in_list(self, field: &str, values: impl Into<Value>) -> Self {
        self.compare(field, "IN", values)
    }

    pub fn not_in_list(self, field: &str, values: impl Into<Value>) -> Self {
        self.compare(field, "NOT IN", values)
    }

    pub fn is_null(self, field: &str) -> Self {
        self.compare(field, "=", Value::Null)
    }

    pub fn is_not_null(self, field: &str) -> Self {
        self.compare(field, "!=", Value::Null)
    }

    pub fn between(self, field: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.add(Between::new(field, low, high))
    }

    /// Compare two columns, e.g. in join conditions.
    pub fn column_eq(self, left: &str, right: &str) -> Self {
        self.add(Comparison::with_expr(left, "=", Expr::ident(right)))
    }

    /// Append a nested group.
    pub fn group(self, group: Conjunction) -> Self {
        self.add(group)
    }

    /// Append `NOT (expr)`.
    pub fn not(self, expr: impl Into<Expr>) -> Self {
        self.add(Expr::not(expr))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True when no child renders anything.
    pub fn is_empty(&self) -> bool {
        self.children.iter().all(Expr::is_empty)
    }

    fn render_parts(&self, binder: &mut ValueBinder) -> Result<Vec<String>> {
        let mut parts = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let sql = match child {
                Expr::Conjunction(nested) => {
                    let nested_parts = nested.render_parts(binder)?;
                    match nested_parts.len() {
                        0 => continue,
                        1 => nested_parts.concat(),
                        _ => format!("({})", nested_parts.join(nested.separator())),
                    }
                }
                other => other.to_sql(binder)?,
            };
            if !sql.is_empty() {
                parts.push(sql);
            }
        }
        Ok(parts)
    }

    fn separator(&self) -> &'static str {
        match self.op {
            BoolOp::And => " AND ",
            BoolOp::Or => " OR ",
        }
    }

    pub fn to_sql(&self, binder: &mut ValueBinder) -> Result<String> {
        Ok(self.render_parts(binder)?.join(self.separator()))
    }
}

/// `field BETWEEN low AND high`.
#[derive(Debug, Clone)]
pub struct Between {
    pub field: Box<Expr>,
    pub low: Value,
    pub high: Value,
    pub type_name: Option<String>,
}

impl Between {
    pub fn new(field: impl Into<Expr>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self {
            field: Box::new(field.into()),
            low: low.into(),
            high: high.into(),
            type_name: None,
        }
    }

    pub fn typed(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn to_sql(&self, binder: &mut ValueBinder) -> Result<String> {
        let field = self.field.to_sql(binder)?;
        let low = binder.push(self.low.clone(), self.type_name.as_deref());
        let high = binder.push(self.high.clone(), self.type_name.as_deref());
        Ok(format!("{field} BETWEEN {low} AND {high}"))
    }
}

/// One argument of a [`FunctionCall`].
///
/// Strings and other values convert to bound [`FunctionArg::Value`]s. Column
/// names must be marked with [`FunctionArg::identifier`] and trusted SQL with
/// [`FunctionArg::literal`]; nothing else is ever inlined.
#[derive(Debug, Clone)]
pub enum FunctionArg {
    /// Trusted SQL inlined as-is
    Literal(String),
    /// Column or table name, quoted by the dialect
    Identifier(String),
    /// Bound value
    Value {
        value: Value,
        type_name: Option<String>,
    },
    /// Nested expression
    Expr(Box<Expr>),
}

impl FunctionArg {
    pub fn literal(sql: impl Into<String>) -> Self {
        FunctionArg::Literal(sql.into())
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        FunctionArg::Identifier(name.into())
    }

    pub fn value(value: impl Into<Value>) -> Self {
        FunctionArg::Value {
            value: value.into(),
            type_name: None,
        }
    }

    pub fn typed(value: impl Into<Value>, type_name: impl Into<String>) -> Self {
        FunctionArg::Value {
            value: value.into(),
            type_name: Some(type_name.into()),
        }
    }
}

impl From<&str> for FunctionArg {
    fn from(text: &str) -> Self {
        FunctionArg::value(text)
    }
}

impl From<String> for FunctionArg {
    fn from(text: String) -> Self {
        FunctionArg::value(text)
    }
}

impl From<Value> for FunctionArg {
    fn from(value: Value) -> Self {
        FunctionArg::Value {
            value,
            type_name: None,
        }
    }
}

impl From<Expr> for FunctionArg {
    fn from(expr: Expr) -> Self {
        FunctionArg::Expr(Box::new(expr))
    }
}

impl From<FunctionCall> for FunctionArg {
    fn from(call: FunctionCall) -> Self {
        FunctionArg::Expr(Box::new(Expr::Function(call)))
    }
}

/// `NAME(arg, arg, ...)`.
///
/// An empty name renders just the parenthesized argument list, which lets a
/// dialect turn `CONCAT(a, b)` into `(a || b)` by clearing the name and
/// changing the separator.
#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<FunctionArg>,
    pub separator: String,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Vec<FunctionArg>) -> Self {
        Self {
            name: name.into(),
            args,
            separator: ", ".to_string(),
        }
    }

    pub fn arg(mut self, arg: impl Into<FunctionArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn to_sql(&self, binder: &mut ValueBinder) -> Result<String> {
        let mut rendered = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            rendered.push(match arg {
                FunctionArg::Literal(sql) | FunctionArg::Identifier(sql) => sql.clone(),
                FunctionArg::Value { value, type_name } => {
                    binder.push(value.clone(), type_name.as_deref())
                }
                FunctionArg::Expr(e) => e.to_sql(binder)?,
            });
        }
        Ok(format!("{}({})", self.name, rendered.join(&self.separator)))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// What an order entry sorts by.
#[derive(Debug, Clone)]
pub enum OrderTarget {
    /// Field name, or raw text such as `title DESC` when no direction is given
    Field(String),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub target: OrderTarget,
    pub direction: Option<Direction>,
}

/// Ordered list of sort entries.
#[derive(Debug, Clone, Default)]
pub struct OrderByList {
    pub items: Vec<OrderItem>,
}

impl OrderByList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target: OrderTarget, direction: Option<Direction>) {
        self.items.push(OrderItem { target, direction });
    }

    pub fn to_sql(&self, binder: &mut ValueBinder) -> Result<String> {
        if self.items.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let target = match &item.target {
                OrderTarget::Field(name) => name.clone(),
                OrderTarget::Expr(e) => e.to_sql(binder)?,
            };
            parts.push(match item.direction {
                Some(direction) => format!("{target} {}", direction.as_str()),
                None => target,
            });
        }
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}

/// Rows of an insert, or the query that produces them.
#[derive(Debug, Clone, Default)]
pub struct ValueList {
    pub columns: Vec<String>,
    pub types: Vec<Option<String>>,
    pub rows: Vec<Vec<Value>>,
    pub query: Option<Box<Query>>,
}

impl ValueList {
    pub fn new(columns: Vec<String>, types: Vec<Option<String>>) -> Self {
        Self {
            columns,
            types,
            rows: Vec::new(),
            query: None,
        }
    }

    /// Append a row given as column/value pairs. Columns the row does not
    /// mention bind `NULL`; unknown columns are ignored.
    pub fn add_row<K, V, I>(&mut self, row: I)
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut values = vec![Value::Null; self.columns.len()];
        for (key, value) in row {
            if let Some(i) = self.columns.iter().position(|c| c == key.as_ref()) {
                values[i] = value.into();
            }
        }
        self.rows.push(values);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.query.is_none()
    }

    pub fn to_sql(&self, binder: &mut ValueBinder) -> Result<String> {
        if let Some(query) = &self.query {
            return query.sql_with(binder);
        }
        if self.rows.is_empty() {
            return Ok(String::new());
        }
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let tokens: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    let type_name = self.types.get(i).and_then(|t| t.as_deref());
                    binder.push(value.clone(), type_name)
                })
                .collect();
            rows.push(format!("({})", tokens.join(", ")));
        }
        Ok(format!("VALUES {}", rows.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::PlaceholderStyle;

    fn binder() -> ValueBinder {
        ValueBinder::new(PlaceholderStyle::Positional)
    }

    #[test]
    fn test_comparison_binds_value() {
        let mut b = binder();
        let sql = Comparison::new("age", ">", 18).to_sql(&mut b).unwrap();
        assert_eq!(sql, "age > ?");
        assert_eq!(b.values(), vec![Value::Int(18)]);
        assert_eq!(b.bindings()[0].type_name.as_deref(), Some("integer"));
    }

    #[test]
    fn test_null_comparison_renders_is_null() {
        let mut b = binder();
        let expr = Conjunction::and().is_null("deleted").is_not_null("created");
        assert_eq!(
            expr.to_sql(&mut b).unwrap(),
            "deleted IS NULL AND created IS NOT NULL"
        );
        assert!(b.is_empty());
    }

    #[test]
    fn test_in_expands_one_placeholder_per_element() {
        let mut b = binder();
        let sql = Comparison::new("id", "IN", vec![1, 2, 3])
            .typed("integer[]")
            .to_sql(&mut b)
            .unwrap();
        assert_eq!(sql, "id IN (?, ?, ?)");
        assert_eq!(b.values(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(
            b.bindings()
                .iter()
                .all(|x| x.type_name.as_deref() == Some("integer"))
        );
    }

    #[test]
    fn test_equals_with_list_becomes_in() {
        let mut b = ValueBinder::new(PlaceholderStyle::Numbered);
        let sql = Comparison::new("id", "=", vec![4, 5]).to_sql(&mut b).unwrap();
        assert_eq!(sql, "id IN ($1, $2)");
        let sql = Comparison::new("id", "!=", vec![6]).to_sql(&mut b).unwrap();
        assert_eq!(sql, "id NOT IN ($3)");
    }

    #[test]
    fn test_empty_in_list_is_an_error() {
        let mut b = binder();
        let err = Comparison::new("id", "in", Vec::<i64>::new())
            .to_sql(&mut b)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidExpression(_)));
    }

    #[test]
    fn test_nested_conjunctions_are_parenthesized() {
        let mut b = binder();
        let expr = Conjunction::and()
            .eq("a", 1)
            .group(Conjunction::or().eq("b", 2).eq("c", 3))
            .group(Conjunction::or().eq("d", 4))
            .group(Conjunction::and());
        assert_eq!(
            expr.to_sql(&mut b).unwrap(),
            "a = ? AND (b = ? OR c = ?) AND d = ?"
        );
    }

    #[test]
    fn test_empty_conjunction_renders_nothing() {
        let mut b = binder();
        let expr = Conjunction::and().group(Conjunction::or());
        assert!(expr.is_empty());
        assert_eq!(expr.to_sql(&mut b).unwrap(), "");
        assert_eq!(Expr::not(Conjunction::and()).to_sql(&mut b).unwrap(), "");
    }

    #[test]
    fn test_not_and_between() {
        let mut b = binder();
        let expr = Conjunction::and()
            .between("price", 10, 20)
            .not(Conjunction::or().eq("x", 1).eq("y", 2));
        assert_eq!(
            expr.to_sql(&mut b).unwrap(),
            "price BETWEEN ? AND ? AND NOT (x = ? OR y = ?)"
        );
        assert_eq!(b.len(), 4);
    }

    #[test]
    fn test_function_arguments() {
        let mut b = binder();
        let call = FunctionCall::new("COALESCE", vec![])
            .arg(FunctionArg::identifier("nickname"))
            .arg(FunctionArg::literal("'anon'"))
            .arg("x");
        assert_eq!(call.to_sql(&mut b).unwrap(), "COALESCE(nickname, 'anon', ?)");
        assert_eq!(b.values(), vec![Value::Text("x".into())]);

        let mut concat = FunctionCall::new(
            "",
            vec![FunctionArg::identifier("a"), FunctionArg::identifier("b")],
        );
        concat.separator = " || ".to_string();
        assert_eq!(concat.to_sql(&mut b).unwrap(), "(a || b)");
    }

    #[test]
    fn test_string_arguments_are_bound() {
        let mut b = binder();
        let call = FunctionCall::new("COALESCE", vec![])
            .arg(FunctionArg::identifier("nickname"))
            .arg("x' OR '1'='1")
            .arg(String::from("guest"));
        assert_eq!(call.to_sql(&mut b).unwrap(), "COALESCE(nickname, ?, ?)");
        assert_eq!(
            b.values(),
            vec![Value::Text("x' OR '1'='1".into()), Value::Text("guest".into())]
        );
    }

    #[test]
    fn test_order_by_list() {
        let mut b = binder();
        let mut order = OrderByList::new();
        order.push(OrderTarget::Field("title".into()), Some(Direction::Asc));
        order.push(OrderTarget::Field("created DESC".into()), None);
        assert_eq!(
            order.to_sql(&mut b).unwrap(),
            "ORDER BY title ASC, created DESC"
        );
        assert_eq!(OrderByList::new().to_sql(&mut b).unwrap(), "");
    }

    #[test]
    fn test_value_list_fills_missing_columns() {
        let mut b = binder();
        let mut values = ValueList::new(
            vec!["title".into(), "body".into()],
            vec![Some("string".into()), None],
        );
        values.add_row([("title", "First")]);
        values.add_row([("title", "Second"), ("body", "Text")]);
        assert_eq!(values.to_sql(&mut b).unwrap(), "VALUES (?, ?), (?, ?)");
        assert_eq!(b.bindings()[1].value, Value::Null);
        assert_eq!(b.bindings()[0].type_name.as_deref(), Some("string"));
    }

    #[test]
    fn test_visit_is_post_order() {
        let expr: Expr = Conjunction::and()
            .eq("a", 1)
            .group(Conjunction::or().eq("b", 2))
            .into();
        let mut kinds = Vec::new();
        expr.visit(&mut |e| kinds.push(e.kind()));
        assert_eq!(
            kinds,
            vec![
                ExprKind::Identifier,
                ExprKind::Comparison,
                ExprKind::Identifier,
                ExprKind::Comparison,
                ExprKind::Conjunction,
                ExprKind::Conjunction,
            ]
        );
    }

    #[test]
    fn test_visit_mut_rewrites_identifiers() {
        let mut expr: Expr = Conjunction::and().eq("a", 1).column_eq("b", "c").into();
        expr.visit_mut(&mut |e| {
            if let Expr::Identifier(name) = e {
                *name = format!("t.{name}");
            }
        });
        let mut b = binder();
        assert_eq!(expr.to_sql(&mut b).unwrap(), "t.a = ? AND t.b = t.c");
    }
}
