//! Identifier quoting pass run during dialect translation.

use sqlforge_core::identifiers::{IdentifierShape, classify};

use crate::clause::{Clauses, Distinct, Field, SetEntry};
use crate::dialect::Dialect;
use crate::expr::{Expr, FunctionArg, OrderTarget};
use crate::query::Query;

/// Quotes every identifier position of a query in place.
///
/// Raw SQL fragments and bound values are left alone. Sub-queries are
/// skipped; they are quoted when they are compiled themselves.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierQuoter<'a> {
    dialect: &'a Dialect,
}

impl<'a> IdentifierQuoter<'a> {
    pub fn new(dialect: &'a Dialect) -> Self {
        Self { dialect }
    }

    pub fn quote(&self, query: &mut Query) {
        let clauses = query.clauses_mut();
        self.quote_fields(&mut clauses.select);
        if let Distinct::On(columns) = &mut clauses.distinct {
            columns.iter_mut().for_each(|e| self.quote_expr(e));
        }
        self.quote_fields(&mut clauses.from);
        self.quote_fields(&mut clauses.update);
        self.quote_fields(&mut clauses.delete);
        self.quote_joins(clauses);
        self.quote_conditions(clauses);
        self.quote_insert(clauses);
        self.quote_set(&mut clauses.set);
    }

    fn quote_fields(&self, fields: &mut [Field]) {
        for field in fields {
            self.quote_expr(&mut field.expr);
            if let Some(alias) = &mut field.alias {
                *alias = self.dialect.quote_name(alias);
            }
        }
    }

    fn quote_joins(&self, clauses: &mut Clauses) {
        for join in &mut clauses.join {
            self.quote_expr(&mut join.table);
            if let Some(alias) = &mut join.alias {
                *alias = self.dialect.quote_name(alias);
            }
            if let Some(on) = &mut join.conditions {
                self.quote_expr(on);
            }
        }
    }

    fn quote_conditions(&self, clauses: &mut Clauses) {
        for expr in [&mut clauses.where_, &mut clauses.having, &mut clauses.order]
            .into_iter()
            .flatten()
        {
            self.quote_expr(expr);
        }
        clauses.group.iter_mut().for_each(|e| self.quote_expr(e));
    }

    fn quote_insert(&self, clauses: &mut Clauses) {
        let Some(target) = &mut clauses.insert else {
            return;
        };
        target.table = self.dialect.quote_identifier(&target.table);
        for column in &mut target.columns {
            *column = self.dialect.quote_identifier(column);
        }
    }

    fn quote_set(&self, entries: &mut [SetEntry]) {
        for entry in entries {
            match entry {
                SetEntry::Assign { field, .. } => *field = self.dialect.quote_identifier(field),
                SetEntry::AssignExpr { field, expr } => {
                    *field = self.dialect.quote_identifier(field);
                    self.quote_expr(expr);
                }
                SetEntry::Expr(expr) => self.quote_expr(expr),
            }
        }
    }

    fn quote_expr(&self, expr: &mut Expr) {
        expr.visit_mut(&mut |node| match node {
            Expr::Identifier(name) => *name = self.dialect.quote_identifier(name),
            Expr::Function(call) => {
                for arg in &mut call.args {
                    // Unrecognized shapes are quoted whole instead of passed through.
                    if let FunctionArg::Identifier(name) = arg {
                        *name = match classify(name) {
                            IdentifierShape::Unrecognized(_) => self.dialect.quote_name(name.trim()),
                            _ => self.dialect.quote_identifier(name),
                        };
                    }
                }
            }
            Expr::OrderBy(list) => {
                for item in &mut list.items {
                    // Text without a direction may carry its own, e.g. "title DESC".
                    if let OrderTarget::Field(name) = &mut item.target {
                        if item.direction.is_some() || !name.contains(char::is_whitespace) {
                            *name = self.dialect.quote_identifier(name);
                        }
                    }
                }
            }
            _ => {}
        });
    }
}
