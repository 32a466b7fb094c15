//! SQL dialects.
//!
//! [`Dialect`] is the one place where the supported databases differ:
//! placeholder style, JSON functions, the regex operator, `RETURNING`
//! support, literal rendering, and how inserted ids are reported. The
//! template generators in [`templates`](super::templates) ask the dialect
//! instead of branching on the database themselves.
//!
//! Fragments are built with the literal [`PLACEHOLDER`] token and rewritten
//! to the dialect's native style by [`Dialect::convert_placeholders`] right
//! before a statement is sent to the driver.

use std::fmt::Write as _;
use std::str::FromStr;

use hysteria_core::{DatabaseType, HysteriaError, HysteriaResult};

use crate::value::Value;

/// The positional token used while composing statements.
pub const PLACEHOLDER: &str = "PLACEHOLDER";

/// A SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    MariaDb,
    Postgres,
    Sqlite,
}

/// Where the id reported after an INSERT sits within the inserted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertId {
    /// Rows come back through `RETURNING *`; no id is needed.
    Returning,
    /// The driver reports the id of the first row of the batch.
    FirstOfBatch,
    /// The driver reports the id of the last row of the batch.
    LastOfBatch,
}

impl TryFrom<DatabaseType> for Dialect {
    type Error = HysteriaError;

    fn try_from(db_type: DatabaseType) -> Result<Self, Self::Error> {
        match db_type {
            DatabaseType::Mysql => Ok(Self::MySql),
            DatabaseType::Mariadb => Ok(Self::MariaDb),
            DatabaseType::Postgres => Ok(Self::Postgres),
            DatabaseType::Sqlite => Ok(Self::Sqlite),
            DatabaseType::Mongo => Err(HysteriaError::UnsupportedDatabase(
                "mongo has no SQL dialect".to_string(),
            )),
        }
    }
}

impl FromStr for Dialect {
    type Err = HysteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.parse::<DatabaseType>()?)
    }
}

impl Dialect {
    /// Returns `true` for `$1, $2, ...` placeholders, `false` for `?`.
    pub const fn uses_numbered_placeholders(self) -> bool {
        matches!(self, Self::Postgres)
    }

    /// Rewrites every [`PLACEHOLDER`] token in `query` to the native style.
    /// Numbered placeholders start at `start_index`.
    ///
    /// ```
    /// use hysteria_db::query::dialect::Dialect;
    ///
    /// let sql = "a = PLACEHOLDER AND b = PLACEHOLDER";
    /// assert_eq!(Dialect::Postgres.convert_placeholders(sql, 1), "a = $1 AND b = $2");
    /// assert_eq!(Dialect::MySql.convert_placeholders(sql, 1), "a = ? AND b = ?");
    /// ```
    pub fn convert_placeholders(self, query: &str, start_index: usize) -> String {
        if !self.uses_numbered_placeholders() {
            return query.replace(PLACEHOLDER, "?");
        }
        let mut out = String::with_capacity(query.len());
        let mut parts = query.split(PLACEHOLDER);
        if let Some(first) = parts.next() {
            out.push_str(first);
        }
        for (offset, part) in parts.enumerate() {
            let _ = write!(out, "${}", start_index + offset);
            out.push_str(part);
        }
        out
    }

    /// The placeholder expression for a JSON document parameter.
    pub fn json_placeholder(self) -> String {
        match self {
            Self::Postgres => format!("{PLACEHOLDER}::jsonb"),
            _ => PLACEHOLDER.to_string(),
        }
    }

    /// Compares a JSON column against a JSON document parameter.
    pub fn json_comparison(self, column: &str, operator: &str) -> String {
        match self {
            Self::Postgres => format!("{column}::jsonb {operator} {PLACEHOLDER}::jsonb"),
            Self::MySql | Self::MariaDb => format!(
                "JSON_UNQUOTE(JSON_EXTRACT({column}, '$')) {operator} JSON_UNQUOTE(JSON_EXTRACT({PLACEHOLDER}, '$'))"
            ),
            Self::Sqlite => {
                format!("JSON_EXTRACT({column}, '$') {operator} JSON_EXTRACT({PLACEHOLDER}, '$')")
            }
        }
    }

    /// The regular-expression match operator.
    pub fn regex_operator(self, negate: bool) -> HysteriaResult<&'static str> {
        match (self, negate) {
            (Self::MySql | Self::MariaDb, false) => Ok("REGEXP"),
            (Self::MySql | Self::MariaDb, true) => Ok("NOT REGEXP"),
            (Self::Postgres, false) => Ok("~"),
            (Self::Postgres, true) => Ok("!~"),
            (Self::Sqlite, _) => Err(HysteriaError::UnsupportedOperation(
                "REGEXP is not supported by sqlite".to_string(),
            )),
        }
    }

    /// The case-insensitive LIKE operator. Only Postgres has `ILIKE`; the
    /// default collations of the others already compare case-insensitively.
    pub const fn ilike_operator(self, negate: bool) -> &'static str {
        match (self, negate) {
            (Self::Postgres, false) => "ILIKE",
            (Self::Postgres, true) => "NOT ILIKE",
            (_, false) => "LIKE",
            (_, true) => "NOT LIKE",
        }
    }

    /// Returns `true` if INSERT/UPDATE can return the written rows.
    pub const fn supports_returning(self) -> bool {
        matches!(self, Self::Postgres)
    }

    pub const fn supports_right_join(self) -> bool {
        !matches!(self, Self::Sqlite)
    }

    /// How the written rows of an INSERT are recovered.
    pub const fn insert_id(self) -> InsertId {
        match self {
            Self::Postgres => InsertId::Returning,
            Self::MySql | Self::MariaDb => InsertId::FirstOfBatch,
            Self::Sqlite => InsertId::LastOfBatch,
        }
    }

    /// Builds a JSON object from `(key, expression)` pairs.
    pub fn json_object(self, pairs: &[(String, String)]) -> String {
        let body = pairs
            .iter()
            .map(|(key, expr)| format!("'{key}', {expr}"))
            .collect::<Vec<_>>()
            .join(", ");
        match self {
            Self::Postgres => format!("json_build_object({body})"),
            _ => format!("JSON_OBJECT({body})"),
        }
    }

    /// Aggregates `expr` into a JSON array per group, in `order` when given.
    ///
    /// `MySQL`'s `JSON_ARRAYAGG` takes no ORDER BY; there the rows must
    /// already arrive in order (see [`Self::orders_within_aggregate`]).
    pub fn json_aggregate(self, expr: &str, order: Option<&str>) -> String {
        let order = match order {
            Some(order) if self.orders_within_aggregate() => format!(" ORDER BY {order}"),
            _ => String::new(),
        };
        match self {
            Self::Postgres => format!("json_agg({expr}{order})"),
            Self::MySql | Self::MariaDb => format!("JSON_ARRAYAGG({expr}{order})"),
            Self::Sqlite => format!("JSON_GROUP_ARRAY({expr}{order})"),
        }
    }

    pub const fn orders_within_aggregate(self) -> bool {
        !matches!(self, Self::MySql)
    }

    pub const fn bool_literal(self, value: bool) -> &'static str {
        match (self, value) {
            (Self::Postgres, true) => "TRUE",
            (Self::Postgres, false) => "FALSE",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    /// Renders `value` as an inline SQL literal. Strings are single-quoted
    /// with embedded quotes doubled.
    pub fn literal(self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.bool_literal(*b).to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bytes(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                match self {
                    Self::Postgres => format!("'\\x{hex}'::bytea"),
                    _ => format!("X'{hex}'"),
                }
            }
            other => self.quote(&other.to_string()),
        }
    }

    fn quote(self, text: &str) -> String {
        let escaped = text.replace('\'', "''");
        match self {
            Self::MySql | Self::MariaDb => format!("'{}'", escaped.replace('\\', "\\\\")),
            _ => format!("'{escaped}'"),
        }
    }

    /// Renders the LIMIT/OFFSET tail. An offset without a limit still needs
    /// a LIMIT on `MySQL` and `SQLite`.
    pub fn limit_offset(self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (None, None) => String::new(),
            (Some(limit), None) => format!("LIMIT {limit}"),
            (Some(limit), Some(offset)) => format!("LIMIT {limit} OFFSET {offset}"),
            (None, Some(offset)) => match self {
                Self::Postgres => format!("OFFSET {offset}"),
                Self::Sqlite => format!("LIMIT -1 OFFSET {offset}"),
                Self::MySql | Self::MariaDb => {
                    format!("LIMIT 18446744073709551615 OFFSET {offset}")
                }
            },
        }
    }
}
