use hysteria_core::{HysteriaError, HysteriaResult};

use super::{writable_columns, SqlFragment};
use crate::model::{ModelMeta, Record};
use crate::query::dialect::Dialect;

/// Generates UPDATE statements.
#[derive(Debug, Clone, Copy)]
pub struct UpdateTemplate<'m> {
    dialect: Dialect,
    meta: &'m ModelMeta,
}

impl<'m> UpdateTemplate<'m> {
    pub const fn new(dialect: Dialect, meta: &'m ModelMeta) -> Self {
        Self { dialect, meta }
    }

    /// `UPDATE <table> SET a = ?, ... <where>`. `filter` is a complete
    /// WHERE clause (keyword included) or empty; its params follow the SET
    /// params.
    pub fn update(&self, record: &Record, filter: &SqlFragment) -> HysteriaResult<SqlFragment> {
        let columns = writable_columns(self.dialect, self.meta, record);
        if columns.is_empty() {
            return Err(HysteriaError::Configuration(format!(
                "update of {} has no columns to write",
                self.meta.table()
            )));
        }

        let mut assignments = Vec::with_capacity(columns.len());
        let mut params = Vec::with_capacity(columns.len() + filter.params.len());
        for (name, placeholder, value) in columns {
            assignments.push(format!("{name} = {placeholder}"));
            params.push(value);
        }
        params.extend(filter.params.iter().cloned());

        let mut sql = format!("UPDATE {} SET {}", self.meta.table(), assignments.join(", "));
        if !filter.is_empty() {
            sql.push(' ');
            sql.push_str(&filter.sql);
        }
        Ok(SqlFragment::new(sql, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::query::templates::fixtures::User;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_update_with_filter() {
        let t = UpdateTemplate::new(Dialect::Postgres, User::meta());
        let record = json!({"userName": "bob", "posts": []});
        let filter = SqlFragment::new("WHERE users.id = PLACEHOLDER", vec![Value::Int(4)]);
        let frag = t.update(record.as_object().unwrap(), &filter).unwrap();
        assert_eq!(frag.sql, "UPDATE users SET user_name = PLACEHOLDER WHERE users.id = PLACEHOLDER");
        assert_eq!(frag.params, vec![Value::from("bob"), Value::Int(4)]);
    }

    #[test]
    fn test_update_json_column() {
        let t = UpdateTemplate::new(Dialect::Postgres, User::meta());
        let record = json!({"settings": {"a": true}});
        let frag = t.update(record.as_object().unwrap(), &SqlFragment::default()).unwrap();
        assert_eq!(frag.sql, "UPDATE users SET settings = PLACEHOLDER::jsonb");
    }

    #[test]
    fn test_update_nothing_to_write() {
        let t = UpdateTemplate::new(Dialect::Sqlite, User::meta());
        let record = json!({"$additionalColumns": {}});
        assert!(t.update(record.as_object().unwrap(), &SqlFragment::default()).is_err());
    }
}
