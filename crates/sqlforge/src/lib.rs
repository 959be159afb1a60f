//! SQLForge - database-agnostic SQL construction and compilation.
//!
//! SQLForge builds SQL statements from fluent builder calls and compiles them
//! into dialect-specific SQL text plus an ordered list of bound parameters:
//!
//! - Clause store with a fixed emission order per statement kind
//! - Expression trees for WHERE/HAVING conditions
//! - Placeholder allocation (`?`, `$n`, `:cN`) with typed bindings
//! - Dialect translation for MySQL, PostgreSQL and SQLite
//! - Logical types that cast values to and from their wire form
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use sqlforge::prelude::*;
//!
//! let query = Query::new(Arc::new(Dialect::mysql()))
//!     .select(["id", "title"])
//!     .from(["articles"])
//!     .add_default_types([("author_id", "integer"), ("published", "boolean")])
//!     .where_(conditions! { "author_id" => 5, "published" => true });
//!
//! let compiled = query.compile()?;
//! assert_eq!(
//!     compiled.sql(),
//!     "SELECT `id`, `title` FROM `articles` WHERE `author_id` = ? AND `published` = ?"
//! );
//!
//! // At the execution boundary bindings are cast to wire parameters.
//! async fn run(cx: &Cx, conn: &impl Connection, query: &Query) {
//!     let rows = query.all(cx, conn).await;
//! }
//! ```

pub use sqlforge_core::{
    // asupersync re-exports
    Cx,
    Outcome,
    // Core types
    CastError,
    ColumnInfo,
    Connection,
    Error,
    FromValue,
    Param,
    ParameterKind,
    QueryError,
    QueryErrorKind,
    Result,
    Row,
    SequencingError,
    StatementKindError,
    TypeConverter,
    TypeRegistry,
    UnknownTypeError,
    Value,
};
pub use sqlforge_core::{identifiers, types};

pub use sqlforge_query::{
    Backend, Between, Binding, BoolOp, ClauseName, ClauseRef, Comparison, Compiled, Condition,
    Conditions, Conjunction, Dialect, DialectConfig, Direction, Distinct, Expr, ExprKind,
    ExpressionHook, Field, FunctionArg, FunctionCall, FunctionsBuilder, IdentifierQuoter, Join,
    JoinType, OrderByList, Paging, PlaceholderStyle, Query, QueryCompiler, SetEntry,
    StatementKind, TypeMap, ValueBinder, conditions,
};

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        // asupersync
        Cx,
        Outcome,
        // Core
        Connection,
        Error,
        Result,
        Row,
        TypeRegistry,
        Value,
        // Query building
        Backend,
        Comparison,
        Conditions,
        Conjunction,
        Dialect,
        DialectConfig,
        Direction,
        Expr,
        Field,
        FunctionArg,
        FunctionCall,
        Join,
        JoinType,
        Query,
        // Macros
        conditions,
    };
}
