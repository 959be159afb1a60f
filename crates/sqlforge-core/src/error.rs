//! Error types for query construction, compilation and type casting.

use std::fmt;

use crate::value::Value;

/// The primary error type for all SQLForge operations.
#[derive(Debug)]
pub enum Error {
    /// A builder method was called before the method it depends on
    Sequencing(SequencingError),
    /// A clause was used against a statement kind that does not have it
    StatementKind(StatementKindError),
    /// A logical type name was not found in the type registry
    UnknownType(UnknownTypeError),
    /// A value could not be represented in the target type
    Cast(CastError),
    /// An expression that cannot be rendered to SQL
    InvalidExpression(String),
    /// Errors reported by the statement executor
    Query(QueryError),
    /// Custom error with message
    Custom(String),
}

/// Raised when an operation runs before the one it requires, e.g. `values()` before `insert()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencingError {
    /// The operation that was attempted
    pub operation: &'static str,
    /// The operation that must happen first
    pub requires: &'static str,
}

/// Raised when a clause is set on a query whose statement kind does not support it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementKindError {
    /// Clause name (e.g. `set`, `join`)
    pub clause: &'static str,
    /// The statement kind of the query at the time of the call
    pub kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTypeError {
    pub name: String,
}

/// A value that a converter cannot represent in its target type.
#[derive(Debug, Clone, PartialEq)]
pub struct CastError {
    /// The offending value
    pub value: Value,
    /// Logical type name the value was cast to
    pub target_type: String,
    /// Optional detail from the underlying parser
    pub reason: Option<String>,
}

impl CastError {
    pub fn new(value: &Value, target_type: impl Into<String>) -> Self {
        Self {
            value: value.clone(),
            target_type: target_type.into(),
            reason: None,
        }
    }

    /// Attach a parser message.
    pub fn with_reason(mut self, reason: impl fmt::Display) -> Self {
        self.reason = Some(reason.to_string());
        self
    }
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table or column not found
    NotFound,
    /// Transport-level failure, including malformed protocol chunks
    Transport,
    /// Other database error
    Database,
}

impl Error {
    /// Is this a builder misuse error (sequencing or statement kind)?
    pub fn is_builder_error(&self) -> bool {
        matches!(self, Error::Sequencing(_) | Error::StatementKind(_))
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Sequencing(e) => write!(f, "Sequencing error: {}", e),
            Error::StatementKind(e) => write!(f, "Wrong statement kind: {}", e),
            Error::UnknownType(e) => write!(f, "Unknown type: {}", e),
            Error::Cast(e) => write!(f, "Cast error: {}", e),
            Error::InvalidExpression(msg) => write!(f, "Invalid expression: {}", msg),
            Error::Query(e) => write!(f, "Query error: {}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for SequencingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` cannot be called before `{}`",
            self.operation, self.requires
        )
    }
}

impl fmt::Display for StatementKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clause `{}` is not valid for {} statements",
            self.clause, self.kind
        )
    }
}

impl fmt::Display for UnknownTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no converter registered for logical type '{}'", self.name)
    }
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot convert {} value to '{}'",
            self.value.type_name(),
            self.target_type
        )?;
        if let Some(reason) = &self.reason {
            write!(f, " ({})", reason)?;
        }
        Ok(())
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<SequencingError> for Error {
    fn from(err: SequencingError) -> Self {
        Error::Sequencing(err)
    }
}

impl From<StatementKindError> for Error {
    fn from(err: StatementKindError) -> Self {
        Error::StatementKind(err)
    }
}

impl From<UnknownTypeError> for Error {
    fn from(err: UnknownTypeError) -> Self {
        Error::UnknownType(err)
    }
}

impl From<CastError> for Error {
    fn from(err: CastError) -> Self {
        Error::Cast(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

/// Result type alias for SQLForge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_error_display_includes_type_and_reason() {
        let err = CastError::new(&Value::Text("abc".to_string()), "integer")
            .with_reason("invalid digit found in string");
        assert_eq!(
            err.to_string(),
            "cannot convert TEXT value to 'integer' (invalid digit found in string)"
        );

        let err: Error = err.into();
        assert!(matches!(err, Error::Cast(_)));
        assert!(!err.is_builder_error());
    }

    #[test]
    fn builder_errors_are_flagged() {
        let seq: Error = SequencingError {
            operation: "values",
            requires: "insert",
        }
        .into();
        assert!(seq.is_builder_error());
        assert_eq!(
            seq.to_string(),
            "Sequencing error: `values` cannot be called before `insert`"
        );

        let kind: Error = StatementKindError {
            clause: "set",
            kind: "SELECT",
        }
        .into();
        assert!(kind.is_builder_error());
        assert_eq!(
            kind.to_string(),
            "Wrong statement kind: clause `set` is not valid for SELECT statements"
        );
    }

    #[test]
    fn query_error_exposes_sql_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated chunk");
        let err = Error::Query(QueryError {
            kind: QueryErrorKind::Transport,
            sql: Some("SELECT 1".to_string()),
            message: "malformed chunk".to_string(),
            source: Some(Box::new(io)),
        });
        assert_eq!(err.sql(), Some("SELECT 1"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
