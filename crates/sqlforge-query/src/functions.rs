//! Builders for common SQL functions.

use crate::expr::{FunctionArg, FunctionCall};

/// Creates [`FunctionCall`] expressions. Returned by `Query::func()`.
///
/// Single-column helpers (`count`, `sum`, ..., `upper`) take a column name.
/// The variadic ones take [`FunctionArg`]s, where plain strings are bound as
/// values; mark columns with [`FunctionArg::identifier`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionsBuilder;

impl FunctionsBuilder {
    /// Any function by name.
    pub fn call<I, A>(&self, name: &str, args: I) -> FunctionCall
    where
        I: IntoIterator<Item = A>,
        A: Into<FunctionArg>,
    {
        FunctionCall::new(name, args.into_iter().map(Into::into).collect())
    }

    fn column_call(&self, name: &str, column: &str) -> FunctionCall {
        FunctionCall::new(name, vec![FunctionArg::identifier(column)])
    }

    /// `COUNT(column)`; pass `"*"` for `COUNT(*)`.
    pub fn count(&self, column: &str) -> FunctionCall {
        self.column_call("COUNT", column)
    }

    pub fn sum(&self, column: &str) -> FunctionCall {
        self.column_call("SUM", column)
    }

    pub fn avg(&self, column: &str) -> FunctionCall {
        self.column_call("AVG", column)
    }

    pub fn min(&self, column: &str) -> FunctionCall {
        self.column_call("MIN", column)
    }

    pub fn max(&self, column: &str) -> FunctionCall {
        self.column_call("MAX", column)
    }

    pub fn lower(&self, column: &str) -> FunctionCall {
        self.column_call("LOWER", column)
    }

    pub fn upper(&self, column: &str) -> FunctionCall {
        self.column_call("UPPER", column)
    }

    /// `CONCAT(...)`; rewritten to `||` on backends that have the operator.
    pub fn concat<I, A>(&self, args: I) -> FunctionCall
    where
        I: IntoIterator<Item = A>,
        A: Into<FunctionArg>,
    {
        self.call("CONCAT", args)
    }

    pub fn coalesce<I, A>(&self, args: I) -> FunctionCall
    where
        I: IntoIterator<Item = A>,
        A: Into<FunctionArg>,
    {
        self.call("COALESCE", args)
    }

    pub fn now(&self) -> FunctionCall {
        FunctionCall::new("NOW", Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sqlforge_core::Value;

    use crate::clause::Field;
    use crate::dialect::Dialect;
    use crate::expr::Comparison;
    use crate::query::Query;

    #[test]
    fn test_aggregate_in_select() {
        let q = Query::new(Arc::new(Dialect::mysql()));
        let count = q.func().count("*");
        let total = q.func().sum("amount");
        let q = q
            .select([Field::aliased(count, "n"), Field::aliased(total, "total")])
            .from(["orders"])
            .group(["customer_id"]);
        assert_eq!(
            q.sql().unwrap(),
            "SELECT COUNT(*) AS `n`, SUM(`amount`) AS `total` FROM `orders` GROUP BY `customer_id`"
        );
    }

    #[test]
    fn test_coalesce_binds_values() {
        let q = Query::new(Arc::new(Dialect::postgres()));
        let name = q
            .func()
            .coalesce([FunctionArg::identifier("nickname"), FunctionArg::from("anonymous")]);
        let compiled = q.select([name]).from(["users"]).compile().unwrap();
        assert_eq!(
            compiled.sql(),
            "SELECT COALESCE(\"nickname\", $1) FROM \"users\""
        );
        assert_eq!(compiled.binder().values(), vec![Value::from("anonymous")]);
    }

    #[test]
    fn test_concat_and_now() {
        let f = FunctionsBuilder;
        let q = Query::new(Arc::new(Dialect::postgres()))
            .select([f.concat([FunctionArg::identifier("first"), FunctionArg::identifier("last")])])
            .select([f.now()]);
        assert_eq!(q.sql().unwrap(), "SELECT (\"first\" || \"last\"), NOW()");
    }

    #[test]
    fn test_string_arguments_never_reach_sql_text() {
        let q = Query::new(Arc::new(Dialect::mysql()));
        let fallback = q.func().coalesce(["nickname", "x' OR '1'='1"]);
        let compiled = q
            .select(["id"])
            .from(["users"])
            .where_(Comparison::with_expr("name", "=", fallback))
            .compile()
            .unwrap();
        assert_eq!(
            compiled.sql(),
            "SELECT `id` FROM `users` WHERE `name` = COALESCE(?, ?)"
        );
        assert_eq!(
            compiled.binder().values(),
            vec![Value::from("nickname"), Value::from("x' OR '1'='1")]
        );
    }
}
