//! Core types for SQLForge.
//!
//! This crate is the leaf of the workspace:
//!
//! - `Value` and `Row` for domain and wire data
//! - the error taxonomy shared by every crate
//! - textual identifier quoting
//! - logical types: `TypeConverter`, the built-in converters and `TypeRegistry`
//! - `Connection`, the narrow executor interface used at the execution boundary

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod error;
pub mod identifiers;
pub mod row;
pub mod types;
pub mod value;

pub use connection::{Connection, Param};
pub use error::{
    CastError, Error, QueryError, QueryErrorKind, Result, SequencingError, StatementKindError,
    UnknownTypeError,
};
pub use identifiers::{IdentifierShape, quote_identifier, quote_name};
pub use row::{ColumnInfo, FromValue, Row};
pub use types::{ParameterKind, TypeConverter, TypeRegistry};
pub use value::Value;
