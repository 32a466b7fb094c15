//! SQL template generators.
//!
//! One generator per statement family, each bound to a [`Dialect`] and the
//! metadata of the model being queried. Generators return [`SqlFragment`]s
//! that still carry [`PLACEHOLDER`](super::dialect::PLACEHOLDER) tokens;
//! callers convert them once the full statement is assembled. Identifiers
//! are emitted unquoted.

mod delete;
mod insert;
mod join;
mod relation;
mod select;
mod update;
mod where_clause;

pub use delete::DeleteTemplate;
pub use insert::InsertTemplate;
pub use join::{JoinKind, JoinTemplate};
pub use relation::{RelationQuery, RelationTemplate, RELATION_DATA, RELATION_KEY, ROW_NUMBER};
pub use select::{Direction, SelectTemplate};
pub use update::UpdateTemplate;
pub use where_clause::{Op, WhereTemplate};

use serde_json::Value as JsonValue;

use super::dialect::{Dialect, PLACEHOLDER};
use crate::model::{ModelMeta, Record};
use crate::value::Value;

/// A piece of SQL together with the parameters its placeholders bind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

impl SqlFragment {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A fragment without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

impl Dialect {
    pub const fn select(self, meta: &ModelMeta) -> SelectTemplate<'_> {
        SelectTemplate::new(self, meta)
    }

    pub const fn where_clause(self, meta: &ModelMeta) -> WhereTemplate<'_> {
        WhereTemplate::new(self, meta)
    }

    pub const fn insert(self, meta: &ModelMeta) -> InsertTemplate<'_> {
        InsertTemplate::new(self, meta)
    }

    pub const fn update(self, meta: &ModelMeta) -> UpdateTemplate<'_> {
        UpdateTemplate::new(self, meta)
    }

    pub const fn delete(self, meta: &ModelMeta) -> DeleteTemplate<'_> {
        DeleteTemplate::new(meta)
    }

    pub const fn join(self, meta: &ModelMeta) -> JoinTemplate<'_> {
        JoinTemplate::new(self, meta)
    }

    pub const fn relation(self, meta: &ModelMeta) -> RelationTemplate<'_> {
        RelationTemplate::new(self, meta)
    }
}

/// Qualifies a column reference with `table` and converts it to the
/// database convention. A reference that already names a table keeps it and
/// only has its column part converted.
pub(crate) fn qualify(meta: &ModelMeta, table: &str, column: &str) -> String {
    match column.split_once('.') {
        Some((prefix, name)) => format!("{prefix}.{}", meta.to_database_case(name)),
        None => format!("{table}.{}", meta.to_database_case(column)),
    }
}

/// The stored columns of a record and their bindable values, in the
/// database convention.
///
/// Relation, dynamic, and `$additionalColumns` keys are dropped, as is a
/// null primary key so the database can assign one. Each column's prepare
/// transform is applied first.
pub(crate) fn writable_columns(
    dialect: Dialect,
    meta: &ModelMeta,
    record: &Record,
) -> Vec<(String, String, Value)> {
    record
        .iter()
        .filter(|(key, _)| !meta.is_virtual(key))
        .filter(|(key, value)| !(value.is_null() && meta.primary_key() == Some(key.as_str())))
        .map(|(key, value)| {
            let value = meta
                .column(key)
                .map_or_else(|| value.clone(), |c| c.prepare_value(value.clone()));
            let placeholder = match &value {
                JsonValue::Object(_) | JsonValue::Array(_) => dialect.json_placeholder(),
                _ => PLACEHOLDER.to_string(),
            };
            (meta.to_database_case(key), placeholder, Value::from_json(&value))
        })
        .collect()
}
