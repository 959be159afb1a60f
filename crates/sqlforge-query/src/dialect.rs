//! Dialect translation.
//!
//! A [`Dialect`] rewrites a copy of a query before it is compiled:
//!
//! 1. identifiers are quoted (unless disabled in [`DialectConfig`])
//! 2. the statement-kind rewrite runs (for selects: `DISTINCT ON` emulation
//!    and `OFFSET` without `LIMIT`)
//! 3. expression hooks run over every expression, children first
//!
//! The caller's query is never modified.

use sqlforge_core::{Value, quote_identifier, quote_name};

use crate::binder::{PlaceholderStyle, ValueBinder};
use crate::clause::{Distinct, Paging, StatementKind};
use crate::expr::{Expr, ExprKind, FunctionArg, FunctionCall, Operand};
use crate::query::Query;
use crate::quoter::IdentifierQuoter;

/// Largest value MySQL accepts for `LIMIT`, used when only an offset is set.
const MYSQL_MAX_LIMIT: &str = "18446744073709551615";

/// Supported database backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    /// PostgreSQL (`$1`, `$2` placeholders)
    #[default]
    Postgres,
    /// SQLite (`?` placeholders)
    Sqlite,
    /// MySQL (`?` placeholders)
    Mysql,
}

impl Backend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::Sqlite => "sqlite",
            Backend::Mysql => "mysql",
        }
    }

    pub const fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Backend::Postgres => PlaceholderStyle::Numbered,
            Backend::Sqlite | Backend::Mysql => PlaceholderStyle::Positional,
        }
    }

    /// Opening and closing identifier quote characters.
    pub const fn quote_chars(self) -> (char, char) {
        match self {
            Backend::Postgres | Backend::Sqlite => ('"', '"'),
            Backend::Mysql => ('`', '`'),
        }
    }

    /// String concatenation operator, if the backend has one.
    pub const fn concat_op(self) -> Option<&'static str> {
        match self {
            Backend::Postgres | Backend::Sqlite => Some("||"),
            Backend::Mysql => None,
        }
    }

    pub const fn supports_ilike(self) -> bool {
        matches!(self, Backend::Postgres)
    }

    pub const fn supports_distinct_on(self) -> bool {
        matches!(self, Backend::Postgres)
    }
}

/// Dialect options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectConfig {
    /// Quote identifiers during translation
    pub quote_identifiers: bool,
    /// Override the backend's placeholder style
    pub placeholder: Option<PlaceholderStyle>,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self {
            quote_identifiers: true,
            placeholder: None,
        }
    }
}

impl DialectConfig {
    pub fn quote_identifiers(mut self, enabled: bool) -> Self {
        self.quote_identifiers = enabled;
        self
    }

    pub fn placeholder(mut self, style: PlaceholderStyle) -> Self {
        self.placeholder = Some(style);
        self
    }
}

/// Rewrites one kind of expression in place.
pub type ExpressionHook = fn(&mut Expr, &Dialect);

/// Backend-specific translation rules.
#[derive(Debug, Clone)]
pub struct Dialect {
    backend: Backend,
    config: DialectConfig,
    start_quote: char,
    end_quote: char,
    expression_hooks: Vec<(ExprKind, ExpressionHook)>,
}

impl Dialect {
    pub fn new(backend: Backend, config: DialectConfig) -> Self {
        let (start_quote, end_quote) = backend.quote_chars();
        let mut expression_hooks: Vec<(ExprKind, ExpressionHook)> = Vec::new();
        if backend.concat_op().is_some() {
            expression_hooks.push((ExprKind::Function, concat_to_operator));
        }
        if !backend.supports_ilike() {
            expression_hooks.push((ExprKind::Comparison, ilike_to_lower_like));
        }
        Self {
            backend,
            config,
            start_quote,
            end_quote,
            expression_hooks,
        }
    }

    pub fn mysql() -> Self {
        Self::new(Backend::Mysql, DialectConfig::default())
    }

    pub fn postgres() -> Self {
        Self::new(Backend::Postgres, DialectConfig::default())
    }

    pub fn sqlite() -> Self {
        Self::new(Backend::Sqlite, DialectConfig::default())
    }

    /// Register an extra rewrite for one expression kind. Hooks run in
    /// registration order, after the built-in ones.
    pub fn with_expression_hook(mut self, kind: ExprKind, hook: ExpressionHook) -> Self {
        self.expression_hooks.push((kind, hook));
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn config(&self) -> &DialectConfig {
        &self.config
    }

    pub fn expression_hooks(&self) -> &[(ExprKind, ExpressionHook)] {
        &self.expression_hooks
    }

    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.config
            .placeholder
            .unwrap_or_else(|| self.backend.placeholder_style())
    }

    /// A fresh binder using this dialect's placeholder style.
    pub fn new_binder(&self) -> ValueBinder {
        ValueBinder::new(self.placeholder_style())
    }

    /// Quote an identifier expression (`a.b`, `t.*`, `f(x)`, `x AS y`).
    pub fn quote_identifier(&self, identifier: &str) -> String {
        quote_identifier(identifier, self.start_quote, self.end_quote)
    }

    /// Quote a single name such as an alias.
    pub fn quote_name(&self, name: &str) -> String {
        quote_name(name, self.start_quote, self.end_quote)
    }

    /// Translate a copy of `query` for this backend.
    #[tracing::instrument(level = "trace", skip(self, query), fields(backend = self.backend.as_str()))]
    pub fn translate(&self, mut query: Query) -> Query {
        if self.config.quote_identifiers {
            IdentifierQuoter::new(self).quote(&mut query);
        }

        match query.kind() {
            StatementKind::Select => self.rewrite_select(&mut query),
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete => {}
        }

        if !self.expression_hooks.is_empty() {
            query.visit_expressions_mut(&mut |expr| {
                for (kind, hook) in &self.expression_hooks {
                    if expr.kind() == *kind {
                        hook(expr, self);
                    }
                }
            });
        }
        query
    }

    fn rewrite_select(&self, query: &mut Query) {
        let clauses = query.clauses_mut();

        if !self.backend.supports_distinct_on() && matches!(clauses.distinct, Distinct::On(_)) {
            if let Distinct::On(columns) = std::mem::take(&mut clauses.distinct) {
                tracing::debug!(
                    backend = self.backend.as_str(),
                    columns = columns.len(),
                    "emulating DISTINCT ON with GROUP BY"
                );
                clauses.group = columns;
            }
        }

        if clauses.offset.is_some() && clauses.limit.is_none() {
            let limit = match self.backend {
                Backend::Mysql => Some(Paging::Expr(Expr::raw(MYSQL_MAX_LIMIT))),
                Backend::Sqlite => Some(Paging::Count(-1)),
                Backend::Postgres => None,
            };
            if limit.is_some() {
                tracing::debug!(
                    backend = self.backend.as_str(),
                    "adding LIMIT for OFFSET without LIMIT"
                );
                clauses.limit = limit;
            }
        }
    }
}

/// `CONCAT(a, b)` becomes `(a || b)`.
fn concat_to_operator(expr: &mut Expr, dialect: &Dialect) {
    let (Expr::Function(call), Some(op)) = (expr, dialect.backend.concat_op()) else {
        return;
    };
    if call.name.eq_ignore_ascii_case("CONCAT") {
        call.name.clear();
        call.separator = format!(" {op} ");
    }
}

/// `field ILIKE value` becomes `LOWER(field) LIKE LOWER(value)`.
fn ilike_to_lower_like(expr: &mut Expr, _dialect: &Dialect) {
    let Expr::Comparison(comparison) = expr else {
        return;
    };
    let operator = match comparison.normalized_operator().as_str() {
        "ILIKE" => "LIKE",
        "NOT ILIKE" => "NOT LIKE",
        _ => return,
    };

    let field = std::mem::replace(&mut comparison.field, Box::new(Expr::raw("")));
    comparison.field = Box::new(lower(FunctionArg::Expr(field)));

    let value = std::mem::replace(&mut comparison.value, Operand::Value(Value::Null));
    let arg = match value {
        Operand::Value(value) => FunctionArg::Value {
            value,
            type_name: comparison.type_name.take(),
        },
        Operand::Expr(e) => FunctionArg::Expr(e),
    };
    comparison.value = Operand::Expr(Box::new(lower(arg)));
    comparison.operator = operator.to_string();
}

fn lower(arg: FunctionArg) -> Expr {
    FunctionCall::new("LOWER", vec![arg]).into()
}
