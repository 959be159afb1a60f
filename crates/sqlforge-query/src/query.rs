//! The clause store and its fluent builder API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sqlforge_core::identifiers::{IdentifierShape, classify};
use sqlforge_core::types::{self, TypeRegistry};
use sqlforge_core::{
    Connection, Cx, Error, Outcome, Param, Result, Row, SequencingError, StatementKindError, Value,
};

use crate::binder::{Binding, ValueBinder};
use crate::clause::{
    ClauseName, ClauseRef, Clauses, Distinct, Field, InsertTarget, Join, JoinType, Paging,
    SetEntry, StatementKind, Union, UnionSource,
};
use crate::compiler::QueryCompiler;
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::expr::{
    BoolOp, Comparison, Conjunction, Direction, Expr, OrderByList, OrderTarget, ValueList,
};
use crate::functions::FunctionsBuilder;
use crate::type_map::TypeMap;

const WHERE_KINDS: &[StatementKind] = &[
    StatementKind::Select,
    StatementKind::Update,
    StatementKind::Delete,
];

static GENERATION: AtomicU64 = AtomicU64::new(1);

/// Every mutation stamps the query with a fresh, process-unique generation.
fn next_generation() -> u64 {
    GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Builder misuse recorded at the offending call and reported on compile.
#[derive(Debug, Clone)]
enum BuildError {
    Sequencing(SequencingError),
    StatementKind(StatementKindError),
    Invalid(String),
}

impl From<BuildError> for Error {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Sequencing(e) => Error::Sequencing(e),
            BuildError::StatementKind(e) => Error::StatementKind(e),
            BuildError::Invalid(msg) => Error::InvalidExpression(msg),
        }
    }
}

/// SQL text plus the binder holding its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    sql: String,
    binder: ValueBinder,
}

impl Compiled {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binder(&self) -> &ValueBinder {
        &self.binder
    }

    pub fn bindings(&self) -> &[Binding] {
        self.binder.bindings()
    }

    /// Cast every binding to its wire form through `registry`.
    pub fn params(&self, registry: &TypeRegistry) -> Result<Vec<Param>> {
        registry.to_params(self.binder.typed_values())
    }

    pub fn into_parts(self) -> (String, ValueBinder) {
        (self.sql, self.binder)
    }
}

#[derive(Debug, Default)]
struct Cache {
    translated: Option<(u64, Arc<Query>)>,
    compiled: Option<(u64, Compiled)>,
}

/// Conditions lowered from a [`Condition`]: map entries stay separate so they
/// can be appended as siblings of a matching `AND` root.
enum Lowered {
    Many(Vec<Expr>),
    One(Expr),
}

impl Lowered {
    fn into_expr(self) -> Expr {
        match self {
            Lowered::Many(mut exprs) if exprs.len() == 1 => exprs.remove(0),
            Lowered::Many(exprs) => Conjunction::with_children(BoolOp::And, exprs).into(),
            Lowered::One(expr) => expr,
        }
    }
}

/// Combine a new condition with an existing clause root.
///
/// When the root is already a conjunction of the requested kind the new
/// condition becomes a sibling (a conjunction of the same kind is spliced in);
/// otherwise both sides are wrapped in a new root.
fn conjoin(existing: Option<Expr>, addition: Lowered, op: BoolOp) -> Option<Expr> {
    let mut additions = match addition {
        Lowered::Many(exprs) if op == BoolOp::And => exprs,
        Lowered::One(Expr::Conjunction(c)) if c.op == op => c.children,
        other => vec![other.into_expr()],
    };
    if additions.is_empty() {
        return existing;
    }
    match existing {
        Some(Expr::Conjunction(mut root)) if root.op == op => {
            root.children.extend(additions);
            Some(root.into())
        }
        Some(old) => {
            let mut children = Vec::with_capacity(additions.len() + 1);
            children.push(old);
            children.extend(additions);
            Some(Conjunction::with_children(op, children).into())
        }
        None if additions.len() == 1 && matches!(additions[0], Expr::Conjunction(_)) => {
            additions.pop()
        }
        None => Some(Conjunction::with_children(op, additions).into()),
    }
}

/// A SQL statement under construction.
///
/// Setters consume and return the query. Setters append to the existing
/// clause value; each has a `*_with` twin taking an explicit `overwrite`
/// flag. Every setter stamps a new generation, which invalidates the cached
/// translation and compiled SQL.
///
/// Misuse (for example `values()` before `insert()`, or `set()` on a select)
/// does not break the chain: the first such error is recorded and returned
/// by [`Query::sql`], [`Query::compile`] and [`Query::execute`].
///
/// # Example
///
/// ```ignore
/// let query = Query::new(Arc::new(Dialect::mysql()))
///     .select(["id", "title"])
///     .from(["articles"])
///     .where_(conditions! { "author_id" => 5, "published" => true });
/// assert_eq!(
///     query.sql()?,
///     "SELECT `id`, `title` FROM `articles` WHERE `author_id` = ? AND `published` = ?"
/// );
/// ```
#[derive(Debug)]
pub struct Query {
    dialect: Arc<Dialect>,
    kind: StatementKind,
    clauses: Clauses,
    type_map: TypeMap,
    generation: u64,
    pending: Option<BuildError>,
    cache: Mutex<Cache>,
}

impl Clone for Query {
    fn clone(&self) -> Self {
        Self {
            dialect: Arc::clone(&self.dialect),
            kind: self.kind,
            clauses: self.clauses.clone(),
            type_map: self.type_map.clone(),
            generation: self.generation,
            pending: self.pending.clone(),
            cache: Mutex::new(Cache::default()),
        }
    }
}

impl Query {
    /// Create an empty select query bound to a dialect.
    pub fn new(dialect: Arc<Dialect>) -> Self {
        Self {
            dialect,
            kind: StatementKind::Select,
            clauses: Clauses::default(),
            type_map: TypeMap::new(),
            generation: next_generation(),
            pending: None,
            cache: Mutex::new(Cache::default()),
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }

    /// Current generation stamp.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the query changed since it was last compiled.
    pub fn is_dirty(&self) -> bool {
        !matches!(&self.lock_cache().compiled, Some((g, _)) if *g == self.generation)
    }

    /// A fresh, empty condition builder.
    pub fn new_expr(&self) -> Conjunction {
        Conjunction::and()
    }

    /// SQL function builder.
    pub fn func(&self) -> FunctionsBuilder {
        FunctionsBuilder
    }

    // ==================== Clause access ====================

    /// Raw stored value of a clause. Does not compile anything.
    pub fn clause(&self, name: ClauseName) -> ClauseRef<'_> {
        self.clauses.get(name)
    }

    /// Like [`Query::clause`] but by textual name.
    pub fn clause_named(&self, name: &str) -> Option<ClauseRef<'_>> {
        ClauseName::parse(name).map(|n| self.clauses.get(n))
    }

    pub fn clauses(&self) -> &Clauses {
        &self.clauses
    }

    pub(crate) fn clauses_mut(&mut self) -> &mut Clauses {
        &mut self.clauses
    }

    /// Visit the clauses of this statement kind, in emission order. The
    /// visitor receives the clause value first, then its name.
    pub fn traverse<E, F>(&self, mut visitor: F) -> std::result::Result<(), E>
    where
        F: FnMut(ClauseRef<'_>, ClauseName) -> std::result::Result<(), E>,
    {
        for &name in self.kind.clause_order() {
            visitor(self.clauses.get(name), name)?;
        }
        Ok(())
    }

    /// Visit every expression reachable from this statement's clauses, in
    /// clause order, children before parents.
    pub fn visit_expressions(&self, f: &mut dyn FnMut(&Expr)) {
        let c = &self.clauses;
        for &name in self.kind.clause_order() {
            match name {
                ClauseName::Select => {
                    c.select.iter().for_each(|field| field.expr.visit(f));
                    if let Distinct::On(cols) = &c.distinct {
                        cols.iter().for_each(|e| e.visit(f));
                    }
                }
                ClauseName::From => c.from.iter().for_each(|t| t.expr.visit(f)),
                ClauseName::Update => c.update.iter().for_each(|t| t.expr.visit(f)),
                ClauseName::Delete => c.delete.iter().for_each(|t| t.expr.visit(f)),
                ClauseName::Join => {
                    for join in &c.join {
                        join.table.visit(f);
                        if let Some(on) = &join.conditions {
                            on.visit(f);
                        }
                    }
                }
                ClauseName::Where => c.where_.iter().for_each(|e| e.visit(f)),
                ClauseName::Having => c.having.iter().for_each(|e| e.visit(f)),
                ClauseName::Order => c.order.iter().for_each(|e| e.visit(f)),
                ClauseName::Group => c.group.iter().for_each(|e| e.visit(f)),
                ClauseName::Limit | ClauseName::Offset => {
                    let paging = if name == ClauseName::Limit { &c.limit } else { &c.offset };
                    if let Some(Paging::Expr(e)) = paging {
                        e.visit(f);
                    }
                }
                ClauseName::Set => {
                    for entry in &c.set {
                        match entry {
                            SetEntry::AssignExpr { expr, .. } | SetEntry::Expr(expr) => {
                                expr.visit(f);
                            }
                            SetEntry::Assign { .. } => {}
                        }
                    }
                }
                ClauseName::Distinct
                | ClauseName::Union
                | ClauseName::Insert
                | ClauseName::Values => {}
            }
        }
    }

    /// Mutable counterpart of [`Query::visit_expressions`].
    pub(crate) fn visit_expressions_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        let kind = self.kind;
        let c = &mut self.clauses;
        for &name in kind.clause_order() {
            match name {
                ClauseName::Select => {
                    c.select.iter_mut().for_each(|field| field.expr.visit_mut(f));
                    if let Distinct::On(cols) = &mut c.distinct {
                        cols.iter_mut().for_each(|e| e.visit_mut(f));
                    }
                }
                ClauseName::From => c.from.iter_mut().for_each(|t| t.expr.visit_mut(f)),
                ClauseName::Update => c.update.iter_mut().for_each(|t| t.expr.visit_mut(f)),
                ClauseName::Delete => c.delete.iter_mut().for_each(|t| t.expr.visit_mut(f)),
                ClauseName::Join => {
                    for join in &mut c.join {
                        join.table.visit_mut(f);
                        if let Some(on) = &mut join.conditions {
                            on.visit_mut(f);
                        }
                    }
                }
                ClauseName::Where => c.where_.iter_mut().for_each(|e| e.visit_mut(f)),
                ClauseName::Having => c.having.iter_mut().for_each(|e| e.visit_mut(f)),
                ClauseName::Order => c.order.iter_mut().for_each(|e| e.visit_mut(f)),
                ClauseName::Group => c.group.iter_mut().for_each(|e| e.visit_mut(f)),
                ClauseName::Limit => {
                    if let Some(Paging::Expr(e)) = &mut c.limit {
                        e.visit_mut(f);
                    }
                }
                ClauseName::Offset => {
                    if let Some(Paging::Expr(e)) = &mut c.offset {
                        e.visit_mut(f);
                    }
                }
                ClauseName::Set => {
                    for entry in &mut c.set {
                        match entry {
                            SetEntry::AssignExpr { expr, .. } | SetEntry::Expr(expr) => {
                                expr.visit_mut(f);
                            }
                            SetEntry::Assign { .. } => {}
                        }
                    }
                }
                ClauseName::Distinct
                | ClauseName::Union
                | ClauseName::Insert
                | ClauseName::Values => {}
            }
        }
    }

    // ==================== Bookkeeping ====================

    fn touch(&mut self) {
        self.generation = next_generation();
        *self.cache.get_mut().unwrap_or_else(PoisonError::into_inner) = Cache::default();
    }

    fn lock_cache(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&mut self, err: BuildError) {
        if self.pending.is_none() {
            self.pending = Some(err);
        }
    }

    /// Record a statement-kind error unless the current kind is in `kinds`.
    fn allow(&mut self, clause: &'static str, kinds: &[StatementKind]) -> bool {
        self.touch();
        if kinds.contains(&self.kind) {
            return true;
        }
        let kind = self.kind.as_str();
        self.record(BuildError::StatementKind(StatementKindError { clause, kind }));
        false
    }

    fn lower(&self, condition: Condition) -> Lowered {
        match condition {
            Condition::Map(conditions) => Lowered::Many(conditions.into_exprs(&self.type_map)),
            Condition::Raw(sql) => Lowered::One(Expr::Raw(sql)),
            Condition::Expr(expr) => Lowered::One(expr),
        }
    }

    // ==================== Default types ====================

    pub fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    /// Replace the per-field default types.
    pub fn set_default_types<K, V, I>(mut self, types: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.type_map.set_defaults(types);
        self.touch();
        self
    }

    /// Merge per-field default types.
    pub fn add_default_types<K, V, I>(mut self, types: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.type_map.add_defaults(types);
        self.touch();
        self
    }

    /// Logical types of the selected columns, keyed by output column name.
    pub fn result_types(&self) -> Vec<(String, String)> {
        self.clauses
            .select
            .iter()
            .filter_map(|field| {
                let name = field.output_name()?;
                let by_alias = field.alias.as_deref().and_then(|a| self.type_map.type_of(a));
                let by_expr = match &field.expr {
                    Expr::Identifier(ident) => match classify(ident) {
                        IdentifierShape::Aliased { expr, alias } => self
                            .type_map
                            .type_of(alias)
                            .or_else(|| self.type_map.type_of(expr)),
                        _ => self.type_map.type_of(ident),
                    },
                    _ => None,
                };
                by_alias
                    .or(by_expr)
                    .map(|t| (name.to_string(), t.to_string()))
            })
            .collect()
    }

    // ==================== SELECT ====================

    /// Append select fields. Also makes this a select statement.
    pub fn select<I, F>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Field>,
    {
        self.select_with(fields, false)
    }

    pub fn select_with<I, F>(mut self, fields: I, overwrite: bool) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Field>,
    {
        self.touch();
        self.kind = StatementKind::Select;
        if overwrite {
            self.clauses.select.clear();
        }
        self.clauses.select.extend(fields.into_iter().map(Into::into));
        self
    }

    /// `SELECT DISTINCT`.
    pub fn distinct(mut self) -> Self {
        if self.allow("distinct", &[StatementKind::Select]) {
            self.clauses.distinct = Distinct::All;
        }
        self
    }

    /// `SELECT DISTINCT ON (...)`.
    pub fn distinct_on<I, E>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        self.distinct_on_with(fields, false)
    }

    pub fn distinct_on_with<I, E>(mut self, fields: I, overwrite: bool) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        if self.allow("distinct", &[StatementKind::Select]) {
            let mut columns = match std::mem::take(&mut self.clauses.distinct) {
                Distinct::On(existing) if !overwrite => existing,
                _ => Vec::new(),
            };
            columns.extend(fields.into_iter().map(Into::into));
            self.clauses.distinct = Distinct::On(columns);
        }
        self
    }

    /// Clear any `DISTINCT`.
    pub fn no_distinct(mut self) -> Self {
        self.touch();
        self.clauses.distinct = Distinct::No;
        self
    }

    pub fn from<I, T>(self, tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Field>,
    {
        self.from_with(tables, false)
    }

    pub fn from_with<I, T>(mut self, tables: I, overwrite: bool) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Field>,
    {
        if self.allow("from", &[StatementKind::Select, StatementKind::Delete]) {
            if overwrite {
                self.clauses.from.clear();
            }
            self.clauses.from.extend(tables.into_iter().map(Into::into));
        }
        self
    }

    /// Add a join. A join whose alias matches an existing join replaces it.
    pub fn join(self, join: Join) -> Self {
        self.join_with([join], false)
    }

    pub fn join_with<I>(mut self, joins: I, overwrite: bool) -> Self
    where
        I: IntoIterator<Item = Join>,
    {
        if self.allow("join", &[StatementKind::Select]) {
            if overwrite {
                self.clauses.join.clear();
            }
            for join in joins {
                let slot = join.alias.as_ref().and_then(|alias| {
                    self.clauses
                        .join
                        .iter()
                        .position(|j| j.alias.as_ref() == Some(alias))
                });
                match slot {
                    Some(i) => self.clauses.join[i] = join,
                    None => self.clauses.join.push(join),
                }
            }
        }
        self
    }

    fn typed_join(
        self,
        join_type: JoinType,
        table: &str,
        alias: &str,
        conditions: impl Into<Condition>,
    ) -> Self {
        let on = self.lower(conditions.into()).into_expr();
        let join = Join::new(table).alias(alias).join_type(join_type).on(on);
        self.join(join)
    }

    pub fn inner_join(self, table: &str, alias: &str, on: impl Into<Condition>) -> Self {
        self.typed_join(JoinType::Inner, table, alias, on)
    }

    pub fn left_join(self, table: &str, alias: &str, on: impl Into<Condition>) -> Self {
        self.typed_join(JoinType::Left, table, alias, on)
    }

    pub fn right_join(self, table: &str, alias: &str, on: impl Into<Condition>) -> Self {
        self.typed_join(JoinType::Right, table, alias, on)
    }

    /// Remove the join registered under `alias`.
    pub fn remove_join(mut self, alias: &str) -> Self {
        self.touch();
        self.clauses
            .join
            .retain(|j| j.alias.as_deref() != Some(alias));
        self
    }

    // ==================== WHERE ====================

    /// Add conditions, combined with any existing ones by `AND`.
    pub fn where_(self, condition: impl Into<Condition>) -> Self {
        self.where_with(condition, false)
    }

    pub fn where_with(mut self, condition: impl Into<Condition>, overwrite: bool) -> Self {
        if overwrite && self.allow("where", WHERE_KINDS) {
            self.clauses.where_ = None;
        }
        self.conjoin_where(condition.into(), BoolOp::And)
    }

    pub fn and_where(self, condition: impl Into<Condition>) -> Self {
        self.conjoin_where(condition.into(), BoolOp::And)
    }

    pub fn or_where(self, condition: impl Into<Condition>) -> Self {
        self.conjoin_where(condition.into(), BoolOp::Or)
    }

    /// Build conditions with a callback receiving a fresh builder and the query.
    pub fn where_fn<F, R>(self, build: F) -> Self
    where
        F: FnOnce(Conjunction, &Query) -> R,
        R: Into<Condition>,
    {
        self.where_fn_with(build, false)
    }

    pub fn where_fn_with<F, R>(mut self, build: F, overwrite: bool) -> Self
    where
        F: FnOnce(Conjunction, &Query) -> R,
        R: Into<Condition>,
    {
        if overwrite && self.allow("where", WHERE_KINDS) {
            self.clauses.where_ = None;
        }
        let condition = build(self.new_expr(), &self).into();
        self.conjoin_where(condition, BoolOp::And)
    }

    pub fn where_in_list(self, field: &str, values: impl Into<Value>) -> Self {
        let comparison = self.list_comparison(field, "IN", values.into());
        self.where_(comparison)
    }

    pub fn where_not_in_list(self, field: &str, values: impl Into<Value>) -> Self {
        let comparison = self.list_comparison(field, "NOT IN", values.into());
        self.where_(comparison)
    }

    pub fn where_null(self, field: &str) -> Self {
        self.where_(Comparison::new(field, "=", Value::Null))
    }

    pub fn where_not_null(self, field: &str) -> Self {
        self.where_(Comparison::new(field, "!=", Value::Null))
    }

    fn list_comparison(&self, field: &str, operator: &str, values: Value) -> Comparison {
        let comparison = Comparison::new(field, operator, values);
        match self.type_map.type_of(field) {
            Some(t) => comparison.typed(format!("{t}[]")),
            None => comparison,
        }
    }

    fn conjoin_where(mut self, condition: Condition, op: BoolOp) -> Self {
        if self.allow("where", WHERE_KINDS) {
            let lowered = self.lower(condition);
            self.clauses.where_ = conjoin(self.clauses.where_.take(), lowered, op);
        }
        self
    }

    // ==================== GROUP / HAVING ====================

    pub fn group<I, E>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        self.group_with(fields, false)
    }

    pub fn group_with<I, E>(mut self, fields: I, overwrite: bool) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        if self.allow("group", &[StatementKind::Select]) {
            if overwrite {
                self.clauses.group.clear();
            }
            self.clauses.group.extend(fields.into_iter().map(Into::into));
        }
        self
    }

    pub fn having(self, condition: impl Into<Condition>) -> Self {
        self.having_with(condition, false)
    }

    pub fn having_with(mut self, condition: impl Into<Condition>, overwrite: bool) -> Self {
        if overwrite && self.allow("having", &[StatementKind::Select]) {
            self.clauses.having = None;
        }
        self.conjoin_having(condition.into(), BoolOp::And)
    }

    /// Like [`Query::where_fn`], for `HAVING`.
    pub fn having_fn<F, R>(self, build: F) -> Self
    where
        F: FnOnce(Conjunction, &Query) -> R,
        R: Into<Condition>,
    {
        self.having_fn_with(build, false)
    }

    pub fn having_fn_with<F, R>(mut self, build: F, overwrite: bool) -> Self
    where
        F: FnOnce(Conjunction, &Query) -> R,
        R: Into<Condition>,
    {
        if overwrite && self.allow("having", &[StatementKind::Select]) {
            self.clauses.having = None;
        }
        let condition = build(self.new_expr(), &self).into();
        self.conjoin_having(condition, BoolOp::And)
    }

    pub fn and_having(self, condition: impl Into<Condition>) -> Self {
        self.conjoin_having(condition.into(), BoolOp::And)
    }

    pub fn or_having(self, condition: impl Into<Condition>) -> Self {
        self.conjoin_having(condition.into(), BoolOp::Or)
    }

    fn conjoin_having(mut self, condition: Condition, op: BoolOp) -> Self {
        if self.allow("having", &[StatementKind::Select]) {
            let lowered = self.lower(condition);
            self.clauses.having = conjoin(self.clauses.having.take(), lowered, op);
        }
        self
    }

    // ==================== ORDER ====================

    /// Order by raw text such as `"title"` or `"created DESC"`.
    pub fn order(self, text: &str) -> Self {
        self.push_order(OrderTarget::Field(text.to_string()), None)
    }

    pub fn order_asc(self, field: &str) -> Self {
        self.push_order(OrderTarget::Field(field.to_string()), Some(Direction::Asc))
    }

    pub fn order_desc(self, field: &str) -> Self {
        self.push_order(OrderTarget::Field(field.to_string()), Some(Direction::Desc))
    }

    /// Order by an expression.
    pub fn order_by(self, expr: impl Into<Expr>, direction: Direction) -> Self {
        self.push_order(OrderTarget::Expr(Box::new(expr.into())), Some(direction))
    }

    /// Append (or replace with) a whole order list.
    pub fn order_with(mut self, list: OrderByList, overwrite: bool) -> Self {
        if !self.allow("order", &[StatementKind::Select]) {
            return self;
        }
        if !overwrite {
            if let Some(Expr::OrderBy(existing)) = &mut self.clauses.order {
                existing.items.extend(list.items);
                return self;
            }
        }
        self.clauses.order = Some(Expr::OrderBy(list));
        self
    }

    fn push_order(self, target: OrderTarget, direction: Option<Direction>) -> Self {
        let mut list = OrderByList::new();
        list.push(target, direction);
        self.order_with(list, false)
    }

    // ==================== LIMIT / OFFSET ====================

    pub fn limit(mut self, limit: impl Into<Paging>) -> Self {
        if self.allow("limit", &[StatementKind::Select]) {
            self.clauses.limit = Some(limit.into());
        }
        self
    }

    pub fn offset(mut self, offset: impl Into<Paging>) -> Self {
        if self.allow("offset", &[StatementKind::Select]) {
            self.clauses.offset = Some(offset.into());
        }
        self
    }

    /// Set `LIMIT limit OFFSET (page - 1) * limit`. Pages start at 1.
    pub fn page(mut self, page: i64, limit: i64) -> Self {
        if page < 1 {
            self.touch();
            self.record(BuildError::Invalid(format!(
                "pages start at 1, got {page}"
            )));
            return self;
        }
        let offset = (page - 1).saturating_mul(limit);
        self.limit(limit).offset(offset)
    }

    // ==================== UNION ====================

    pub fn union(self, query: Query) -> Self {
        self.union_with(
            Union {
                all: false,
                source: UnionSource::Query(Box::new(query)),
            },
            false,
        )
    }

    pub fn union_all(self, query: Query) -> Self {
        self.union_with(
            Union {
                all: true,
                source: UnionSource::Query(Box::new(query)),
            },
            false,
        )
    }

    pub fn union_raw(self, sql: impl Into<String>, all: bool) -> Self {
        self.union_with(
            Union {
                all,
                source: UnionSource::Raw(sql.into()),
            },
            false,
        )
    }

    pub fn union_with(mut self, union: Union, overwrite: bool) -> Self {
        if self.allow("union", &[StatementKind::Select]) {
            if overwrite {
                self.clauses.union.clear();
            }
            self.clauses.union.push(union);
        }
        self
    }

    // ==================== INSERT ====================

    /// Declare insert columns. Makes this an insert statement.
    pub fn insert<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.touch();
        self.kind = StatementKind::Insert;
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let types = columns
            .iter()
            .map(|c| self.type_map.type_of(c).map(str::to_string))
            .collect();
        let table = self
            .clauses
            .insert
            .take()
            .map(|t| t.table)
            .unwrap_or_default();
        self.clauses.values = Some(ValueList::new(columns.clone(), types));
        self.clauses.insert = Some(InsertTarget { table, columns });
        self
    }

    /// Set the insert target table.
    pub fn into_table(mut self, table: impl Into<String>) -> Self {
        self.touch();
        self.kind = StatementKind::Insert;
        let table = table.into();
        match &mut self.clauses.insert {
            Some(target) => target.table = table,
            None => {
                self.clauses.insert = Some(InsertTarget {
                    table,
                    columns: Vec::new(),
                });
            }
        }
        self
    }

    /// Append a row of values given as column/value pairs.
    pub fn values<K, V, I>(mut self, row: I) -> Self
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.touch();
        match (&self.clauses.insert, &mut self.clauses.values) {
            (Some(target), Some(values)) if !target.columns.is_empty() => values.add_row(row),
            _ => self.record(BuildError::Sequencing(SequencingError {
                operation: "values",
                requires: "insert",
            })),
        }
        self
    }

    /// Insert the rows produced by a select (`INSERT ... SELECT`).
    pub fn values_from(mut self, query: Query) -> Self {
        self.touch();
        match (&self.clauses.insert, &mut self.clauses.values) {
            (Some(target), Some(values)) if !target.columns.is_empty() => {
                values.rows.clear();
                values.query = Some(Box::new(query));
            }
            _ => self.record(BuildError::Sequencing(SequencingError {
                operation: "values",
                requires: "insert",
            })),
        }
        self
    }

    // ==================== UPDATE ====================

    /// Set the table to update. Makes this an update statement.
    pub fn update(mut self, table: impl Into<Field>) -> Self {
        self.touch();
        self.kind = StatementKind::Update;
        self.clauses.update = vec![table.into()];
        self
    }

    /// `SET field = value`, typed from the default types.
    pub fn set(self, field: &str, value: impl Into<Value>) -> Self {
        let type_name = self.type_map.type_of(field).map(str::to_string);
        self.push_set(SetEntry::Assign {
            field: field.to_string(),
            value: value.into(),
            type_name,
        })
    }

    pub fn set_typed(self, field: &str, value: impl Into<Value>, type_name: &str) -> Self {
        self.push_set(SetEntry::Assign {
            field: field.to_string(),
            value: value.into(),
            type_name: Some(type_name.to_string()),
        })
    }

    /// `SET field = <expr>`.
    pub fn set_expr(self, field: &str, expr: impl Into<Expr>) -> Self {
        self.push_set(SetEntry::AssignExpr {
            field: field.to_string(),
            expr: expr.into(),
        })
    }

    /// Free-form `SET` entry, e.g. `Expr::raw("count = count + 1")`.
    pub fn set_raw(self, expr: impl Into<Expr>) -> Self {
        self.push_set(SetEntry::Expr(expr.into()))
    }

    pub fn set_with<I>(mut self, entries: I, overwrite: bool) -> Self
    where
        I: IntoIterator<Item = SetEntry>,
    {
        if self.allow("set", &[StatementKind::Update]) {
            if overwrite {
                self.clauses.set.clear();
            }
            self.clauses.set.extend(entries);
        }
        self
    }

    fn push_set(self, entry: SetEntry) -> Self {
        self.set_with([entry], false)
    }

    // ==================== DELETE ====================

    /// Make this a delete statement on `table`.
    pub fn delete(mut self, table: impl Into<Field>) -> Self {
        self.touch();
        self.kind = StatementKind::Delete;
        self.clauses.from = vec![table.into()];
        self
    }

    /// Tables named between `DELETE` and `FROM` (multi-table deletes).
    pub fn delete_with<I, T>(mut self, tables: I, overwrite: bool) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Field>,
    {
        if self.allow("delete", &[StatementKind::Delete]) {
            if overwrite {
                self.clauses.delete.clear();
            }
            self.clauses.delete.extend(tables.into_iter().map(Into::into));
        }
        self
    }

    // ==================== Compilation ====================

    fn check(&self) -> Result<()> {
        if let Some(err) = &self.pending {
            return Err(err.clone().into());
        }
        if self.kind == StatementKind::Insert
            && self.clauses.insert.as_ref().is_none_or(|t| t.table.is_empty())
        {
            return Err(SequencingError {
                operation: "sql",
                requires: "into",
            }
            .into());
        }
        Ok(())
    }

    /// The dialect-translated form of this query, cached per generation.
    pub fn translated(&self) -> Arc<Query> {
        if let Some((generation, query)) = &self.lock_cache().translated {
            if *generation == self.generation {
                return Arc::clone(query);
            }
        }
        let translated = Arc::new(self.dialect.translate(self.clone()));
        self.lock_cache().translated = Some((self.generation, Arc::clone(&translated)));
        translated
    }

    /// Compile to SQL text and bindings.
    ///
    /// The result is cached until the next mutation; repeated calls return
    /// identical SQL and identical bindings.
    #[tracing::instrument(level = "trace", skip(self), fields(kind = %self.kind))]
    pub fn compile(&self) -> Result<Compiled> {
        self.check()?;
        if let Some((generation, compiled)) = &self.lock_cache().compiled {
            if *generation == self.generation {
                return Ok(compiled.clone());
            }
        }
        let translated = self.translated();
        let mut binder = self.dialect.new_binder();
        let sql = QueryCompiler::new().compile(&translated, &mut binder)?;
        tracing::trace!(sql = %sql, params = binder.len(), "compiled query");
        let compiled = Compiled { sql, binder };
        self.lock_cache().compiled = Some((self.generation, compiled.clone()));
        Ok(compiled)
    }

    /// Compiled SQL text.
    pub fn sql(&self) -> Result<String> {
        Ok(self.compile()?.sql)
    }

    /// Render into a caller-supplied binder, continuing its token sequence.
    /// Used for sub-queries, which share the outer query's binder.
    pub fn sql_with(&self, binder: &mut ValueBinder) -> Result<String> {
        self.check()?;
        let translated = self.translated();
        QueryCompiler::new().compile(&translated, binder)
    }

    /// Compile and cast bindings to wire parameters.
    pub fn prepare(&self, registry: &TypeRegistry) -> Result<(String, Vec<Param>)> {
        let compiled = self.compile()?;
        let params = compiled.params(registry)?;
        Ok((compiled.sql, params))
    }

    // ==================== Execution ====================

    /// Execute a statement and return the number of affected rows.
    #[tracing::instrument(level = "debug", skip(self, cx, conn), fields(kind = %self.kind))]
    pub async fn execute<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<u64, Error> {
        let (sql, params) = match self.prepare(&types::global()) {
            Ok(prepared) => prepared,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, params = params.len(), "executing statement");
        let outcome = conn.execute(cx, &sql, &params).await;
        if let Outcome::Ok(affected) = &outcome {
            tracing::debug!(rows_affected = affected, "statement executed");
        }
        outcome
    }

    /// Run a select and return its rows, cast to domain values using the
    /// logical types of the selected columns.
    #[tracing::instrument(level = "debug", skip(self, cx, conn), fields(kind = %self.kind))]
    pub async fn all<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<Vec<Row>, Error> {
        let registry = types::global();
        let (sql, params) = match self.prepare(&registry) {
            Ok(prepared) => prepared,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %sql, params = params.len(), "running query");
        let rows = conn.query(cx, &sql, &params).await;

        rows.and_then(|mut rows| {
            tracing::debug!(row_count = rows.len(), "query returned rows");
            let result_types = self.result_types();
            let column_types = result_types.iter().map(|(c, t)| (c.as_str(), t.as_str()));
            match registry.cast_rows(&mut rows, column_types) {
                Ok(()) => Outcome::Ok(rows),
                Err(e) => Outcome::Err(e),
            }
        })
    }
}
