use std::fmt;

use crate::model::ModelMeta;
use crate::query::dialect::Dialect;

/// Functions whose calls are passed through `select` untouched.
const PASS_THROUGH_FUNCTIONS: &[&str] = &[
    "COUNT", "SUM", "AVG", "MIN", "MAX", "CAST", "NOW", "UPPER", "LOWER", "COALESCE", "CONCAT",
    "LENGTH", "ROUND", "ABS", "DISTINCT",
];

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        })
    }
}

/// Generates SELECT heads and the ORDER/GROUP tails.
#[derive(Debug, Clone, Copy)]
pub struct SelectTemplate<'m> {
    dialect: Dialect,
    meta: &'m ModelMeta,
}

impl<'m> SelectTemplate<'m> {
    pub const fn new(dialect: Dialect, meta: &'m ModelMeta) -> Self {
        Self { dialect, meta }
    }

    /// `SELECT <table>.* FROM <table>`, or the given column expressions.
    /// Columns must already be converted with [`Self::column`].
    pub fn select(&self, columns: &[String]) -> String {
        let table = self.meta.table();
        if columns.is_empty() {
            format!("SELECT {table}.* FROM {table}")
        } else {
            format!("SELECT {} FROM {table}", columns.join(", "))
        }
    }

    /// `SELECT COUNT(*) AS total FROM <table>`.
    pub fn count(&self) -> String {
        format!("SELECT COUNT(*) AS total FROM {}", self.meta.table())
    }

    /// `SELECT SUM(<column>) AS total FROM <table>`. Postgres sums integers
    /// as NUMERIC, so the total is cast to a double there.
    pub fn sum(&self, column: &str) -> String {
        let sum = format!("SUM({})", self.column(column));
        let total = match self.dialect {
            Dialect::Postgres => format!("CAST({sum} AS DOUBLE PRECISION)"),
            _ => sum,
        };
        format!("SELECT {total} AS total FROM {}", self.meta.table())
    }

    /// Converts one select expression to the database convention.
    ///
    /// `*`, function calls, and anything starting with a known SQL function
    /// are passed through. `a as b` converts both sides. A dotted
    /// reference only has its column part converted.
    pub fn column(&self, expr: &str) -> String {
        let trimmed = expr.trim();
        if trimmed == "*" || trimmed.contains('(') || is_function(trimmed) {
            return trimmed.to_string();
        }
        if let Some((source, alias)) = split_alias(trimmed) {
            return format!("{} AS {}", self.reference(source), self.meta.to_database_case(alias));
        }
        self.reference(trimmed)
    }

    fn reference(&self, column: &str) -> String {
        match column.split_once('.') {
            Some((table, "*")) => format!("{table}.*"),
            Some((table, name)) => format!("{table}.{}", self.meta.to_database_case(name)),
            None => self.meta.to_database_case(column),
        }
    }

    /// `ORDER BY a ASC, b DESC` from already qualified entries.
    pub fn order_by(entries: &[String]) -> String {
        if entries.is_empty() {
            String::new()
        } else {
            format!("ORDER BY {}", entries.join(", "))
        }
    }

    /// The LIMIT/OFFSET tail.
    pub fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        self.dialect.limit_offset(limit, offset)
    }

    /// `GROUP BY a, b` from already qualified columns.
    pub fn group_by(columns: &[String]) -> String {
        if columns.is_empty() {
            String::new()
        } else {
            format!("GROUP BY {}", columns.join(", "))
        }
    }
}

fn is_function(expr: &str) -> bool {
    let upper = expr.to_ascii_uppercase();
    // Upper-case `DATE_` only, so `date_created` style columns still convert.
    if upper.starts_with("CURRENT_") || expr.starts_with("DATE_") {
        return true;
    }
    PASS_THROUGH_FUNCTIONS.iter().any(|f| {
        upper.starts_with(f)
            && upper[f.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_ascii_alphanumeric() && c != '_')
    })
}

/// Splits `expr as alias`, matching `as` case-insensitively.
pub(crate) fn split_alias(expr: &str) -> Option<(&str, &str)> {
    let lower = expr.to_ascii_lowercase();
    lower
        .find(" as ")
        .map(|idx| (expr[..idx].trim(), expr[idx + 4..].trim()))
}
