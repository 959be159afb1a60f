//! Query construction and SQL compilation for SQLForge.
//!
//! `sqlforge-query` is the **query construction layer**. It turns fluent
//! builder calls into a clause store, translates that store for a database
//! dialect, and compiles it into SQL text plus ordered bindings.
//!
//! # Role In The Architecture
//!
//! - **Clause store**: [`Query`] holds the raw clause values and the statement kind.
//! - **Expression tree**: [`Expr`] and [`Conjunction`] build WHERE/HAVING conditions.
//! - **Value binder**: [`ValueBinder`] allocates placeholders in textual order.
//! - **Dialects**: [`Dialect`] quotes identifiers and rewrites unsupported constructs
//!   for MySQL, PostgreSQL and SQLite.
//! - **Compiler**: [`QueryCompiler`] emits clauses in the fixed order of the
//!   statement kind, eliding empty ones.
//!
//! Compiled queries execute through the `Connection` trait from `sqlforge-core`.
//! Most users access these builders via the `sqlforge` facade crate.

pub mod binder;
pub mod clause;
pub mod compiler;
pub mod condition;
pub mod dialect;
pub mod expr;
pub mod functions;
pub mod query;
pub mod quoter;
pub mod type_map;

pub use binder::{Binding, PlaceholderStyle, ValueBinder};
pub use clause::{
    ClauseName, ClauseRef, Clauses, Distinct, Field, InsertTarget, Join, JoinType, Paging,
    SetEntry, StatementKind, Union, UnionSource,
};
pub use compiler::QueryCompiler;
pub use condition::{Condition, Conditions, parse_key};
pub use dialect::{Backend, Dialect, DialectConfig, ExpressionHook};
pub use expr::{
    Between, BoolOp, Comparison, Conjunction, Direction, Expr, ExprKind, FunctionArg,
    FunctionCall, Operand, OrderByList, OrderItem, OrderTarget, ValueList,
};
pub use functions::FunctionsBuilder;
pub use query::{Compiled, Query};
pub use quoter::IdentifierQuoter;
pub use type_map::TypeMap;
