//! Statement executor interface.
//!
//! The compiler never talks to a socket. At the execution boundary it hands
//! the final SQL text and an ordered list of [`Param`]s to a [`Connection`]
//! implementation supplied by the caller. All operations integrate with
//! asupersync's structured concurrency via `Cx` for cancellation and timeouts.

use asupersync::{Cx, Outcome};

use crate::row::Row;
use crate::types::ParameterKind;
use crate::value::Value;

/// A bound statement parameter in wire form.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Wire value produced by the type converter's `to_database`
    pub value: Value,
    /// Driver-level parameter kind
    pub kind: ParameterKind,
}

impl Param {
    pub fn new(value: Value, kind: ParameterKind) -> Self {
        Self { value, kind }
    }
}

/// A database connection capable of executing compiled statements.
///
/// Implementations must be `Send + Sync` for use across async boundaries.
///
/// # Example
///
/// ```rust,ignore
/// let compiled = query.compile()?;
/// let params = registry.to_params(compiled.bindings())?;
/// let rows = conn.query(&cx, compiled.sql(), &params).await;
/// ```
pub trait Connection: Send + Sync {
    /// Execute a statement that returns rows.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = Outcome<Vec<Row>, crate::Error>> + Send;

    /// Execute a statement (INSERT, UPDATE, DELETE) and return rows affected.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = Outcome<u64, crate::Error>> + Send;

    /// Execute a statement and return the first row, if any.
    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = Outcome<Option<Row>, crate::Error>> + Send {
        async move {
            match self.query(cx, sql, params).await {
                Outcome::Ok(rows) => Outcome::Ok(rows.into_iter().next()),
                Outcome::Err(e) => Outcome::Err(e),
                Outcome::Cancelled(r) => Outcome::Cancelled(r),
                Outcome::Panicked(p) => Outcome::Panicked(p),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asupersync::runtime::RuntimeBuilder;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingConnection {
        seen: Mutex<Vec<(String, Vec<Param>)>>,
    }

    impl Connection for RecordingConnection {
        fn query(
            &self,
            _cx: &Cx,
            sql: &str,
            params: &[Param],
        ) -> impl Future<Output = Outcome<Vec<Row>, crate::Error>> + Send {
            self.seen
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            let rows = vec![
                Row::new(vec!["n".into()], vec![Value::Int(1)]),
                Row::new(vec!["n".into()], vec![Value::Int(2)]),
            ];
            async move { Outcome::Ok(rows) }
        }

        fn execute(
            &self,
            _cx: &Cx,
            _sql: &str,
            params: &[Param],
        ) -> impl Future<Output = Outcome<u64, crate::Error>> + Send {
            let n = params.len() as u64;
            async move { Outcome::Ok(n) }
        }
    }

    #[test]
    fn query_one_returns_first_row() {
        let rt = RuntimeBuilder::current_thread().build().unwrap();
        let cx = Cx::for_testing();
        let conn = RecordingConnection::default();
        let params = [Param::new(Value::Int(5), ParameterKind::Int)];

        rt.block_on(async {
            match conn.query_one(&cx, "SELECT n FROM t WHERE a = ?", &params).await {
                Outcome::Ok(Some(row)) => assert_eq!(row.get(0), Some(&Value::Int(1))),
                other => panic!("unexpected outcome: {other:?}"),
            }
            match conn.execute(&cx, "DELETE FROM t WHERE a = ?", &params).await {
                Outcome::Ok(n) => assert_eq!(n, 1),
                other => panic!("unexpected outcome: {other:?}"),
            }
        });

        let seen = conn.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1[0].kind, ParameterKind::Int);
    }
}
