//! SQL text generation from a translated query.

use sqlforge_core::Result;

use crate::binder::ValueBinder;
use crate::clause::{
    ClauseName, ClauseRef, Distinct, Field, InsertTarget, Join, Paging, SetEntry, Union,
    UnionSource,
};
use crate::expr::{Expr, ValueList};
use crate::query::Query;

/// Walks the clauses of a (translated) query in emission order and renders
/// each non-empty one. Values are bound through the supplied binder as they
/// are encountered, so placeholder order matches textual order.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryCompiler;

impl QueryCompiler {
    pub fn new() -> Self {
        Self
    }

    pub fn compile(&self, query: &Query, binder: &mut ValueBinder) -> Result<String> {
        let mut sql = String::new();
        query.traverse::<sqlforge_core::Error, _>(|clause, name| {
            // SELECT and DELETE always lead their statement.
            let keyword = matches!(name, ClauseName::Select | ClauseName::Delete);
            if clause.is_empty() && !keyword {
                return Ok(());
            }
            let part = match (name, clause) {
                (ClauseName::Select, ClauseRef::Fields(fields)) => {
                    Self::select(fields, &query.clauses().distinct, binder)?
                }
                (ClauseName::From, ClauseRef::Fields(tables)) => {
                    format!(" FROM {}", Self::fields(tables, binder)?)
                }
                (ClauseName::Join, ClauseRef::Joins(joins)) => Self::joins(joins, binder)?,
                (ClauseName::Where, ClauseRef::Expr(Some(expr))) => {
                    Self::template(" WHERE ", expr, binder)?
                }
                (ClauseName::Having, ClauseRef::Expr(Some(expr))) => {
                    Self::template(" HAVING ", expr, binder)?
                }
                (ClauseName::Order, ClauseRef::Expr(Some(expr))) => {
                    Self::template(" ", expr, binder)?
                }
                (ClauseName::Group, ClauseRef::Exprs(exprs)) => {
                    format!(" GROUP BY {}", Self::exprs(exprs, binder)?)
                }
                (ClauseName::Limit, ClauseRef::Paging(Some(paging))) => {
                    format!(" LIMIT {}", Self::paging(paging, binder)?)
                }
                (ClauseName::Offset, ClauseRef::Paging(Some(paging))) => {
                    format!(" OFFSET {}", Self::paging(paging, binder)?)
                }
                (ClauseName::Union, ClauseRef::Unions(unions)) => Self::unions(unions, binder)?,
                (ClauseName::Insert, ClauseRef::Insert(Some(target))) => Self::insert(target),
                (ClauseName::Values, ClauseRef::Values(Some(values))) => {
                    Self::values(values, binder)?
                }
                (ClauseName::Update, ClauseRef::Fields(tables)) => {
                    format!("UPDATE {}", Self::fields(tables, binder)?)
                }
                (ClauseName::Set, ClauseRef::Set(entries)) => Self::set(entries, binder)?,
                (ClauseName::Delete, ClauseRef::Fields(tables)) => {
                    if tables.is_empty() {
                        "DELETE".to_string()
                    } else {
                        format!("DELETE {}", Self::fields(tables, binder)?)
                    }
                }
                _ => String::new(),
            };
            sql.push_str(&part);
            Ok(())
        })?;
        Ok(sql)
    }

    fn template(prefix: &str, expr: &Expr, binder: &mut ValueBinder) -> Result<String> {
        let rendered = expr.to_sql(binder)?;
        if rendered.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{prefix}{rendered}"))
    }

    fn select(fields: &[Field], distinct: &Distinct, binder: &mut ValueBinder) -> Result<String> {
        let mut sql = String::from("SELECT");
        match distinct {
            Distinct::No => {}
            Distinct::All => sql.push_str(" DISTINCT"),
            Distinct::On(columns) => {
                sql.push_str(&format!(" DISTINCT ON ({})", Self::exprs(columns, binder)?));
            }
        }
        if fields.is_empty() {
            sql.push_str(" *");
        } else {
            sql.push(' ');
            sql.push_str(&Self::fields(fields, binder)?);
        }
        Ok(sql)
    }

    /// Comma-separated fields, each with an optional ` AS alias`.
    fn fields(fields: &[Field], binder: &mut ValueBinder) -> Result<String> {
        let mut parts = Vec::with_capacity(fields.len());
        for field in fields {
            let expr = field.expr.to_sql(binder)?;
            parts.push(match &field.alias {
                Some(alias) => format!("{expr} AS {alias}"),
                None => expr,
            });
        }
        Ok(parts.join(", "))
    }

    fn exprs(exprs: &[Expr], binder: &mut ValueBinder) -> Result<String> {
        let mut parts = Vec::with_capacity(exprs.len());
        for expr in exprs {
            parts.push(expr.to_sql(binder)?);
        }
        Ok(parts.join(", "))
    }

    fn joins(joins: &[Join], binder: &mut ValueBinder) -> Result<String> {
        let mut sql = String::new();
        for join in joins {
            let table = join.table.to_sql(binder)?;
            let on = match &join.conditions {
                Some(expr) => expr.to_sql(binder)?,
                None => String::new(),
            };
            let on = if on.is_empty() { "1 = 1".to_string() } else { on };
            sql.push_str(&format!(" {} JOIN {table}", join.join_type.as_str()));
            if let Some(alias) = &join.alias {
                sql.push(' ');
                sql.push_str(alias);
            }
            sql.push_str(&format!(" ON {on}"));
        }
        Ok(sql)
    }

    fn paging(paging: &Paging, binder: &mut ValueBinder) -> Result<String> {
        match paging {
            Paging::Count(n) => Ok(n.to_string()),
            Paging::Expr(expr) => expr.to_sql(binder),
        }
    }

    fn unions(unions: &[Union], binder: &mut ValueBinder) -> Result<String> {
        let mut sql = String::new();
        for union in unions {
            let inner = match &union.source {
                UnionSource::Query(query) => query.sql_with(binder)?,
                UnionSource::Raw(raw) => raw.clone(),
            };
            let keyword = if union.all { "UNION ALL" } else { "UNION" };
            sql.push_str(&format!("\n{keyword} {}", strip_outer_parens(&inner)));
        }
        Ok(sql)
    }

    fn insert(target: &InsertTarget) -> String {
        format!(
            "INSERT INTO {} ({})",
            target.table,
            target.columns.join(", ")
        )
    }

    fn values(values: &ValueList, binder: &mut ValueBinder) -> Result<String> {
        let rendered = values.to_sql(binder)?;
        if rendered.is_empty() {
            return Ok(String::new());
        }
        Ok(format!(" {rendered}"))
    }

    fn set(entries: &[SetEntry], binder: &mut ValueBinder) -> Result<String> {
        let mut parts = Vec::with_capacity(entries.len());
        for entry in entries {
            parts.push(match entry {
                SetEntry::Assign {
                    field,
                    value,
                    type_name,
                } => {
                    let token = binder.push(value.clone(), type_name.as_deref());
                    format!("{field} = {token}")
                }
                SetEntry::AssignExpr { field, expr } => {
                    format!("{field} = {}", expr.to_sql(binder)?)
                }
                SetEntry::Expr(expr) => strip_outer_parens(&expr.to_sql(binder)?).to_string(),
            });
        }
        Ok(format!(" SET {}", parts.join(", ")))
    }
}

/// Remove one layer of parentheses wrapping the whole string.
fn strip_outer_parens(sql: &str) -> &str {
    let trimmed = sql.trim();
    match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) if balanced(inner) => inner.trim(),
        _ => trimmed,
    }
}

fn balanced(sql: &str) -> bool {
    let mut depth = 0usize;
    for c in sql.chars() {
        match c {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sqlforge_core::Value;

    use crate::conditions;
    use crate::dialect::{Backend, Dialect, DialectConfig};
    use crate::expr::{Comparison, Conjunction};

    fn plain() -> Query {
        Query::new(Arc::new(Dialect::new(
            Backend::Sqlite,
            DialectConfig::default().quote_identifiers(false),
        )))
    }

    #[test]
    fn test_strip_outer_parens() {
        assert_eq!(strip_outer_parens("(a = 1)"), "a = 1");
        assert_eq!(strip_outer_parens("((a))"), "(a)");
        assert_eq!(strip_outer_parens("(a) + (b)"), "(a) + (b)");
        assert_eq!(strip_outer_parens(" b "), "b");
    }

    #[test]
    fn test_empty_select() {
        assert_eq!(plain().sql().unwrap(), "SELECT *");
        assert_eq!(plain().distinct().from(["t"]).sql().unwrap(), "SELECT DISTINCT * FROM t");
    }

    #[test]
    fn test_empty_clauses_are_elided() {
        let q = plain()
            .from(["t"])
            .where_(crate::expr::Conjunction::and())
            .group(Vec::<Expr>::new())
            .order_with(crate::expr::OrderByList::new(), true);
        assert_eq!(q.sql().unwrap(), "SELECT * FROM t");
    }

    #[test]
    fn test_binder_follows_text_order() {
        let compiled = Query::new(Arc::new(Dialect::postgres()))
            .select([Field::aliased(Expr::raw("1"), "one")])
            .from(["t"])
            .where_(conditions! { "a" => 1 })
            .having(conditions! { "COUNT(*) >" => 2 })
            .limit(Expr::raw("5"))
            .compile()
            .unwrap();
        assert_eq!(
            compiled.sql(),
            "SELECT 1 AS \"one\" FROM \"t\" WHERE \"a\" = $1 HAVING COUNT(*) > $2 LIMIT 5"
        );
        assert_eq!(compiled.binder().values(), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_union_strips_one_paren_layer() {
        let q = plain()
            .select(["a"])
            .from(["t"])
            .union_raw("(SELECT a FROM u)", true)
            .union(plain().select(["a"]).from(["v"]).where_(conditions! { "x" => 1 }));
        let compiled = q.compile().unwrap();
        assert_eq!(
            compiled.sql(),
            "SELECT a FROM t\nUNION ALL SELECT a FROM u\nUNION SELECT a FROM v WHERE x = ?"
        );
        assert_eq!(compiled.bindings().len(), 1);
    }

    #[test]
    fn test_set_expression_loses_outer_parens() {
        let q = plain()
            .update("t")
            .set_raw(Conjunction::and().group(Conjunction::or().eq("a", 1).eq("b", 2)))
            .set_raw(Expr::raw("(hits = hits + 1)"))
            .set_raw(Expr::raw("(x) + (y)"));
        let compiled = q.compile().unwrap();
        assert_eq!(compiled.sql(), "UPDATE t SET a = ? OR b = ?, hits = hits + 1, (x) + (y)");
        assert_eq!(compiled.binder().values(), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_comparison_with_inline_operands() {
        let sub = plain().select(["id"]).from(["u"]).where_(conditions! { "x" => 1 });
        let q = plain()
            .from(["t"])
            .where_(Comparison::with_expr("a", "=", Expr::ident("b")))
            .and_where(Comparison::with_expr("c", "IN", sub));
        let compiled = q.compile().unwrap();
        assert_eq!(
            compiled.sql(),
            "SELECT * FROM t WHERE a = b AND c IN (SELECT id FROM u WHERE x = ?)"
        );
        assert_eq!(compiled.binder().values(), vec![Value::Int(1)]);
    }

    #[test]
    fn test_delete_with_tables() {
        let q = plain()
            .delete("articles")
            .delete_with(["articles"], false)
            .where_(conditions! { "id" => 3 });
        assert_eq!(q.sql().unwrap(), "DELETE articles FROM articles WHERE id = ?");
    }
}
