use hysteria_core::HysteriaResult;

use super::{qualify, SqlFragment};
use crate::model::ModelMeta;
use crate::query::dialect::{Dialect, PLACEHOLDER};
use crate::value::Value;

/// Comparison operators accepted by `where` conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    /// Case-insensitive LIKE; plain LIKE outside Postgres.
    ILike,
    NotILike,
}

impl Op {
    pub fn sql(self, dialect: Dialect) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::ILike => dialect.ilike_operator(false),
            Self::NotILike => dialect.ilike_operator(true),
        }
    }
}

/// Generates single WHERE conditions, without the `WHERE` keyword or any
/// joining `AND`/`OR`. Columns are qualified with the model's table unless
/// they already name one.
#[derive(Debug, Clone, Copy)]
pub struct WhereTemplate<'m> {
    dialect: Dialect,
    meta: &'m ModelMeta,
}

impl<'m> WhereTemplate<'m> {
    pub const fn new(dialect: Dialect, meta: &'m ModelMeta) -> Self {
        Self { dialect, meta }
    }

    pub(crate) fn column(&self, column: &str) -> String {
        qualify(self.meta, self.meta.table(), column)
    }

    /// `col <op> ?`. JSON documents are compared as whole documents; a null
    /// value turns `=`/`!=` into `IS NULL`/`IS NOT NULL`.
    pub fn condition(&self, column: &str, op: Op, value: Value) -> SqlFragment {
        let column = self.column(column);
        match (&value, op) {
            (Value::Null, Op::Eq) => SqlFragment::raw(format!("{column} IS NULL")),
            (Value::Null, Op::NotEq) => SqlFragment::raw(format!("{column} IS NOT NULL")),
            (Value::Json(_), _) => SqlFragment::new(
                self.dialect.json_comparison(&column, op.sql(self.dialect)),
                vec![value],
            ),
            _ => SqlFragment::new(
                format!("{column} {} {PLACEHOLDER}", op.sql(self.dialect)),
                vec![value],
            ),
        }
    }

    /// `col [NOT] BETWEEN ? AND ?`.
    pub fn between(&self, column: &str, min: Value, max: Value, negate: bool) -> SqlFragment {
        let not = if negate { "NOT " } else { "" };
        SqlFragment::new(
            format!(
                "{} {not}BETWEEN {PLACEHOLDER} AND {PLACEHOLDER}",
                self.column(column)
            ),
            vec![min, max],
        )
    }

    /// `col [NOT] IN (?, ...)`. An empty list matches nothing for IN and
    /// everything for NOT IN.
    pub fn in_list(&self, column: &str, values: Vec<Value>, negate: bool) -> SqlFragment {
        if values.is_empty() {
            return SqlFragment::raw(if negate { "1 = 1" } else { "1 = 0" });
        }
        let not = if negate { "NOT " } else { "" };
        let placeholders = vec![PLACEHOLDER; values.len()].join(", ");
        SqlFragment::new(
            format!("{} {not}IN ({placeholders})", self.column(column)),
            values,
        )
    }

    /// `col IS [NOT] NULL`.
    pub fn null(&self, column: &str, negate: bool) -> SqlFragment {
        let not = if negate { "NOT " } else { "" };
        SqlFragment::raw(format!("{} IS {not}NULL", self.column(column)))
    }

    /// `col REGEXP ?` in the dialect's spelling.
    pub fn regex(&self, column: &str, pattern: &str, negate: bool) -> HysteriaResult<SqlFragment> {
        let op = self.dialect.regex_operator(negate)?;
        Ok(SqlFragment::new(
            format!("{} {op} {PLACEHOLDER}", self.column(column)),
            vec![Value::from(pattern)],
        ))
    }
}
