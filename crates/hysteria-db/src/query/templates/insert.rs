use hysteria_core::{HysteriaError, HysteriaResult};

use super::{writable_columns, SqlFragment};
use crate::model::{ModelMeta, Record};
use crate::query::dialect::{Dialect, PLACEHOLDER};
use crate::value::Value;

/// Generates INSERT statements. Postgres statements end in `RETURNING *`.
#[derive(Debug, Clone, Copy)]
pub struct InsertTemplate<'m> {
    dialect: Dialect,
    meta: &'m ModelMeta,
}

impl<'m> InsertTemplate<'m> {
    pub const fn new(dialect: Dialect, meta: &'m ModelMeta) -> Self {
        Self { dialect, meta }
    }

    /// Inserts one record.
    pub fn insert(&self, record: &Record) -> HysteriaResult<SqlFragment> {
        self.insert_many(std::slice::from_ref(record))
    }

    /// Inserts several records in one statement. The column list is the
    /// union of the records' columns in first-seen order; records lacking a
    /// column bind NULL for it.
    pub fn insert_many(&self, records: &[Record]) -> HysteriaResult<SqlFragment> {
        if records.is_empty() {
            return Err(HysteriaError::Configuration(format!(
                "insert into {} needs at least one record",
                self.meta.table()
            )));
        }

        let rows: Vec<_> = records
            .iter()
            .map(|r| writable_columns(self.dialect, self.meta, r))
            .collect();

        let mut columns: Vec<(String, bool)> = Vec::new();
        for row in &rows {
            for (name, placeholder, _) in row {
                let is_json = placeholder != PLACEHOLDER;
                match columns.iter_mut().find(|(c, _)| c == name) {
                    Some(entry) => entry.1 |= is_json,
                    None => columns.push((name.clone(), is_json)),
                }
            }
        }

        let table = self.meta.table();
        if columns.is_empty() {
            if records.len() > 1 {
                return Err(HysteriaError::Configuration(format!(
                    "insert into {table} has no columns to write"
                )));
            }
            let sql = match self.dialect {
                Dialect::MySql | Dialect::MariaDb => format!("INSERT INTO {table} () VALUES ()"),
                Dialect::Postgres | Dialect::Sqlite => format!("INSERT INTO {table} DEFAULT VALUES"),
            };
            return Ok(SqlFragment::raw(self.with_returning(sql)));
        }

        let mut params = Vec::new();
        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            let mut slots = Vec::with_capacity(columns.len());
            for (name, is_json) in &columns {
                let value = row
                    .iter()
                    .find(|(c, _, _)| c == name)
                    .map_or(Value::Null, |(_, _, v)| v.clone());
                slots.push(if *is_json {
                    self.dialect.json_placeholder()
                } else {
                    PLACEHOLDER.to_string()
                });
                params.push(value);
            }
            tuples.push(format!("({})", slots.join(", ")));
        }

        let names: Vec<&str> = columns.iter().map(|(c, _)| c.as_str()).collect();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES {}",
            names.join(", "),
            tuples.join(", ")
        );
        Ok(SqlFragment::new(self.with_returning(sql), params))
    }

    fn with_returning(&self, sql: String) -> String {
        if self.dialect.supports_returning() {
            format!("{sql} RETURNING *")
        } else {
            sql
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::query::templates::fixtures::User;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_insert_sqlite() {
        let t = InsertTemplate::new(Dialect::Sqlite, User::meta());
        let frag = t.insert(&record(json!({"userName": "ann", "posts": []}))).unwrap();
        assert_eq!(frag.sql, "INSERT INTO users (user_name) VALUES (PLACEHOLDER)");
        assert_eq!(frag.params, vec![Value::from("ann")]);
    }

    #[test]
    fn test_insert_postgres_returning_and_json() {
        let t = InsertTemplate::new(Dialect::Postgres, User::meta());
        let frag = t
            .insert(&record(json!({"userName": "ann", "settings": {"a": 1}})))
            .unwrap();
        assert_eq!(
            frag.sql,
            "INSERT INTO users (settings, user_name) VALUES (PLACEHOLDER::jsonb, PLACEHOLDER) RETURNING *"
        );
        assert_eq!(frag.params[0], Value::Json(json!({"a": 1})));
    }

    #[test]
    fn test_insert_many_unions_columns() {
        let t = InsertTemplate::new(Dialect::MySql, User::meta());
        let frag = t
            .insert_many(&[
                record(json!({"userName": "a"})),
                record(json!({"userName": "b", "email": "B@X"})),
            ])
            .unwrap();
        assert_eq!(
            frag.sql,
            "INSERT INTO users (user_name, email) VALUES (PLACEHOLDER, PLACEHOLDER), (PLACEHOLDER, PLACEHOLDER)"
        );
        assert_eq!(
            frag.params,
            vec![Value::from("a"), Value::Null, Value::from("b"), Value::from("b@x")]
        );
    }

    #[test]
    fn test_insert_defaults() {
        let t = InsertTemplate::new(Dialect::Sqlite, User::meta());
        let frag = t.insert(&record(json!({"id": null}))).unwrap();
        assert_eq!(frag.sql, "INSERT INTO users DEFAULT VALUES");
        let t = InsertTemplate::new(Dialect::MySql, User::meta());
        assert_eq!(t.insert(&Record::new()).unwrap().sql, "INSERT INTO users () VALUES ()");
    }

    #[test]
    fn test_insert_many_empty_is_error() {
        let t = InsertTemplate::new(Dialect::Sqlite, User::meta());
        assert!(t.insert_many(&[]).is_err());
    }
}
