//! Clause names, statement kinds and the structured clause values.

use std::fmt;

use sqlforge_core::Value;
use sqlforge_core::identifiers::{IdentifierShape, classify};

use crate::expr::{Expr, FunctionCall, ValueList};
use crate::query::Query;

/// The four statement shapes a query can take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatementKind {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        }
    }

    /// Clauses compiled for this kind, in emission order.
    pub const fn clause_order(self) -> &'static [ClauseName] {
        use ClauseName::{
            Delete, From, Group, Having, Insert, Join, Limit, Offset, Order, Select, Set, Union,
            Update, Values, Where,
        };
        match self {
            StatementKind::Select => &[
                Select, From, Join, Where, Group, Having, Order, Limit, Offset, Union,
            ],
            StatementKind::Insert => &[Insert, Values],
            StatementKind::Update => &[Update, Set, Where],
            StatementKind::Delete => &[Delete, From, Where],
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named clause slots of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseName {
    Select,
    Distinct,
    From,
    Join,
    Where,
    Group,
    Having,
    Order,
    Limit,
    Offset,
    Union,
    Insert,
    Values,
    Update,
    Set,
    Delete,
}

impl ClauseName {
    pub const fn as_str(self) -> &'static str {
        match self {
            ClauseName::Select => "select",
            ClauseName::Distinct => "distinct",
            ClauseName::From => "from",
            ClauseName::Join => "join",
            ClauseName::Where => "where",
            ClauseName::Group => "group",
            ClauseName::Having => "having",
            ClauseName::Order => "order",
            ClauseName::Limit => "limit",
            ClauseName::Offset => "offset",
            ClauseName::Union => "union",
            ClauseName::Insert => "insert",
            ClauseName::Values => "values",
            ClauseName::Update => "update",
            ClauseName::Set => "set",
            ClauseName::Delete => "delete",
        }
    }

    /// Parse a clause name as used by `Query::clause_named`.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name.trim().to_ascii_lowercase().as_str() {
            "select" => ClauseName::Select,
            "distinct" => ClauseName::Distinct,
            "from" => ClauseName::From,
            "join" => ClauseName::Join,
            "where" => ClauseName::Where,
            "group" => ClauseName::Group,
            "having" => ClauseName::Having,
            "order" => ClauseName::Order,
            "limit" => ClauseName::Limit,
            "offset" => ClauseName::Offset,
            "union" => ClauseName::Union,
            "insert" => ClauseName::Insert,
            "values" => ClauseName::Values,
            "update" => ClauseName::Update,
            "set" => ClauseName::Set,
            "delete" => ClauseName::Delete,
            _ => return None,
        })
    }
}

impl fmt::Display for ClauseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expression with an optional alias: a select field or a table source.
#[derive(Debug, Clone)]
pub struct Field {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl Field {
    pub fn new(expr: impl Into<Expr>) -> Self {
        Self {
            expr: expr.into(),
            alias: None,
        }
    }

    pub fn aliased(expr: impl Into<Expr>, alias: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: Some(alias.into()),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Output column name: the alias, else the last segment of an identifier.
    pub fn output_name(&self) -> Option<&str> {
        if let Some(alias) = &self.alias {
            return Some(alias);
        }
        match &self.expr {
            Expr::Identifier(name) => match classify(name.trim()) {
                IdentifierShape::Aliased { alias, .. } => Some(alias),
                IdentifierShape::Bare(name) | IdentifierShape::Dotted(name) => {
                    let column = name.rsplit_once('.').map_or(name, |(_, c)| c);
                    (!column.is_empty()).then_some(column)
                }
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<&str> for Field {
    fn from(name: &str) -> Self {
        Field::new(name)
    }
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        Field::new(name)
    }
}

impl From<Expr> for Field {
    fn from(expr: Expr) -> Self {
        Field::new(expr)
    }
}

impl From<FunctionCall> for Field {
    fn from(call: FunctionCall) -> Self {
        Field::new(call)
    }
}

impl From<Query> for Field {
    fn from(query: Query) -> Self {
        Field::new(query)
    }
}

/// `DISTINCT` state of a select.
#[derive(Debug, Clone, Default)]
pub enum Distinct {
    #[default]
    No,
    /// `SELECT DISTINCT`
    All,
    /// `SELECT DISTINCT ON (...)`; rewritten to `GROUP BY` where unsupported
    On(Vec<Expr>),
}

impl Distinct {
    pub fn is_set(&self) -> bool {
        !matches!(self, Distinct::No)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub const fn as_str(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        }
    }
}

/// One `JOIN` entry. Joins are keyed by alias.
#[derive(Debug, Clone)]
pub struct Join {
    pub table: Expr,
    pub alias: Option<String>,
    pub join_type: JoinType,
    pub conditions: Option<Expr>,
}

impl Join {
    pub fn new(table: impl Into<Expr>) -> Self {
        Self {
            table: table.into(),
            alias: None,
            join_type: JoinType::Inner,
            conditions: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    pub fn on(mut self, conditions: impl Into<Expr>) -> Self {
        self.conditions = Some(conditions.into());
        self
    }
}

/// `LIMIT` / `OFFSET` value.
#[derive(Debug, Clone)]
pub enum Paging {
    Count(i64),
    Expr(Expr),
}

impl From<i64> for Paging {
    fn from(n: i64) -> Self {
        Paging::Count(n)
    }
}

impl From<i32> for Paging {
    fn from(n: i32) -> Self {
        Paging::Count(i64::from(n))
    }
}

impl From<u32> for Paging {
    fn from(n: u32) -> Self {
        Paging::Count(i64::from(n))
    }
}

impl From<u64> for Paging {
    fn from(n: u64) -> Self {
        Paging::Count(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<usize> for Paging {
    fn from(n: usize) -> Self {
        Paging::Count(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<Expr> for Paging {
    fn from(e: Expr) -> Self {
        Paging::Expr(e)
    }
}

/// Text is coerced to an integer by its leading digits (`"10 rows"` is 10,
/// `"abc"` is 0).
impl From<&str> for Paging {
    fn from(text: &str) -> Self {
        let text = text.trim();
        let (sign, digits) = match text.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, text.strip_prefix('+').unwrap_or(text)),
        };
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        let n = digits[..end].parse::<i64>().unwrap_or(0);
        Paging::Count(sign * n)
    }
}

impl From<Value> for Paging {
    fn from(value: Value) -> Self {
        match value {
            Value::Int(n) => Paging::Count(n),
            Value::Float(f) => Paging::Count(f as i64),
            Value::Bool(b) => Paging::Count(i64::from(b)),
            Value::Text(s) | Value::Decimal(s) => Paging::from(s.as_str()),
            _ => Paging::Count(0),
        }
    }
}

/// Source of a `UNION` entry.
#[derive(Debug, Clone)]
pub enum UnionSource {
    Query(Box<Query>),
    Raw(String),
}

#[derive(Debug, Clone)]
pub struct Union {
    pub all: bool,
    pub source: UnionSource,
}

/// `INSERT INTO table (columns)`.
#[derive(Debug, Clone)]
pub struct InsertTarget {
    pub table: String,
    pub columns: Vec<String>,
}

/// One `SET` entry of an update.
#[derive(Debug, Clone)]
pub enum SetEntry {
    /// `field = value`, bound
    Assign {
        field: String,
        value: Value,
        type_name: Option<String>,
    },
    /// `field = <expr>`
    AssignExpr { field: String, expr: Expr },
    /// Free-standing expression such as `count = count + 1`
    Expr(Expr),
}

/// Stored clause values of one query.
#[derive(Debug, Clone, Default)]
pub struct Clauses {
    pub select: Vec<Field>,
    pub distinct: Distinct,
    pub from: Vec<Field>,
    pub join: Vec<Join>,
    pub where_: Option<Expr>,
    pub group: Vec<Expr>,
    pub having: Option<Expr>,
    pub order: Option<Expr>,
    pub limit: Option<Paging>,
    pub offset: Option<Paging>,
    pub union: Vec<Union>,
    pub insert: Option<InsertTarget>,
    pub values: Option<ValueList>,
    pub update: Vec<Field>,
    pub set: Vec<SetEntry>,
    pub delete: Vec<Field>,
}

/// Borrowed view of one clause, handed to `Query::traverse` visitors.
#[derive(Debug, Clone, Copy)]
pub enum ClauseRef<'a> {
    /// select, from, update, delete
    Fields(&'a [Field]),
    Distinct(&'a Distinct),
    Joins(&'a [Join]),
    /// group
    Exprs(&'a [Expr]),
    /// where, having, order
    Expr(Option<&'a Expr>),
    /// limit, offset
    Paging(Option<&'a Paging>),
    Unions(&'a [Union]),
    Insert(Option<&'a InsertTarget>),
    Values(Option<&'a ValueList>),
    Set(&'a [SetEntry]),
}

impl ClauseRef<'_> {
    /// Whether the clause holds nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            ClauseRef::Fields(f) => f.is_empty(),
            ClauseRef::Distinct(d) => !d.is_set(),
            ClauseRef::Joins(j) => j.is_empty(),
            ClauseRef::Exprs(e) => e.is_empty(),
            ClauseRef::Expr(e) => e.is_none_or(|e| e.is_empty()),
            ClauseRef::Paging(p) => p.is_none(),
            ClauseRef::Unions(u) => u.is_empty(),
            ClauseRef::Insert(i) => i.is_none(),
            ClauseRef::Values(v) => v.is_none_or(|v| v.is_empty()),
            ClauseRef::Set(s) => s.is_empty(),
        }
    }
}

impl Clauses {
    pub fn get(&self, name: ClauseName) -> ClauseRef<'_> {
        match name {
            ClauseName::Select => ClauseRef::Fields(&self.select),
            ClauseName::Distinct => ClauseRef::Distinct(&self.distinct),
            ClauseName::From => ClauseRef::Fields(&self.from),
            ClauseName::Join => ClauseRef::Joins(&self.join),
            ClauseName::Where => ClauseRef::Expr(self.where_.as_ref()),
            ClauseName::Group => ClauseRef::Exprs(&self.group),
            ClauseName::Having => ClauseRef::Expr(self.having.as_ref()),
            ClauseName::Order => ClauseRef::Expr(self.order.as_ref()),
            ClauseName::Limit => ClauseRef::Paging(self.limit.as_ref()),
            ClauseName::Offset => ClauseRef::Paging(self.offset.as_ref()),
            ClauseName::Union => ClauseRef::Unions(&self.union),
            ClauseName::Insert => ClauseRef::Insert(self.insert.as_ref()),
            ClauseName::Values => ClauseRef::Values(self.values.as_ref()),
            ClauseName::Update => ClauseRef::Fields(&self.update),
            ClauseName::Set => ClauseRef::Set(&self.set),
            ClauseName::Delete => ClauseRef::Fields(&self.delete),
        }
    }
}
