//! Turning raw driver rows into model records.
//!
//! Column names are converted to the model's case convention, hidden
//! columns are dropped, and each declared column's serialize transform is
//! applied. When a model declares its columns, anything else the query
//! returned is collected under [`ADDITIONAL_COLUMNS`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use hysteria_core::{HysteriaError, HysteriaResult};

use crate::model::{ModelMeta, Record, ADDITIONAL_COLUMNS};
use crate::row::Row;

/// Serializes one raw row.
pub fn serialize_row(meta: &ModelMeta, row: &Row) -> Record {
    serialize_pairs(
        meta,
        row.iter()
            .map(|(column, value)| (column.to_string(), value.to_json())),
    )
}

/// Serializes `(database column, value)` pairs.
pub fn serialize_pairs(
    meta: &ModelMeta,
    pairs: impl IntoIterator<Item = (String, JsonValue)>,
) -> Record {
    let mut record = Record::new();
    let mut additional = Record::new();
    let declared = !meta.columns().is_empty();

    for (column, value) in pairs {
        let key = meta.to_model_case(&column);
        match meta.column(&key) {
            Some(c) if c.is_hidden() => {}
            Some(c) => {
                record.insert(key, c.serialize_value(value));
            }
            None if declared => {
                additional.insert(key, value);
            }
            None => {
                record.insert(key, value);
            }
        }
    }

    if !additional.is_empty() {
        record.insert(ADDITIONAL_COLUMNS.to_string(), JsonValue::Object(additional));
    }
    record
}

/// Computes the named dynamic columns onto every record.
pub fn add_dynamic_columns(
    meta: &ModelMeta,
    records: &mut [Record],
    names: &[String],
) -> HysteriaResult<()> {
    for name in names {
        let column = meta.dynamic_column(name)?;
        for record in records.iter_mut() {
            let value = column.compute(record);
            record.insert(name.clone(), value);
        }
    }
    Ok(())
}

/// Converts a model instance to a record.
pub fn to_record<T: Serialize>(value: &T) -> HysteriaResult<Record> {
    match serde_json::to_value(value)? {
        JsonValue::Object(map) => Ok(map),
        other => Err(HysteriaError::Configuration(format!(
            "models must serialize to an object, got {other}"
        ))),
    }
}

/// Converts a record back to a model instance.
pub fn from_record<T: DeserializeOwned>(record: Record) -> HysteriaResult<T> {
    Ok(serde_json::from_value(JsonValue::Object(record))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::mock::row;
    use crate::model::Model;
    use crate::query::templates::fixtures::{Post, User};
    use crate::value::Value;
    use serde_json::json;

    fn user_row() -> Row {
        row(&[
            ("id", Value::Int(1)),
            ("user_name", Value::from("ann")),
            ("password", Value::from("secret")),
            ("post_count", Value::Int(3)),
        ])
    }

    #[test]
    fn test_row_is_model_cased_and_hidden_dropped() {
        let record = serialize_row(User::meta(), &user_row());
        assert_eq!(record["userName"], json!("ann"));
        assert!(!record.contains_key("password"));
        assert_eq!(record[ADDITIONAL_COLUMNS], json!({"postCount": 3}));
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let row = user_row();
        let first = serialize_row(User::meta(), &row);
        let second = serialize_row(User::meta(), &row);
        assert_eq!(first, second);
        assert!(!second.contains_key("password"));
    }

    #[test]
    fn test_undeclared_model_keeps_everything() {
        let meta = ModelMeta::builder("Event").build().unwrap();
        let record = serialize_pairs(&meta, [("created_at".to_string(), json!("x"))]);
        assert_eq!(record["createdAt"], json!("x"));
        assert!(!record.contains_key(ADDITIONAL_COLUMNS));
    }

    #[test]
    fn test_dynamic_columns() {
        let meta = ModelMeta::builder("Item")
            .dynamic_column("double", |r| json!(r["n"].as_i64().unwrap_or(0) * 2))
            .build()
            .unwrap();
        let mut records = vec![serialize_pairs(&meta, [("n".to_string(), json!(4))])];
        add_dynamic_columns(&meta, &mut records, &["double".to_string()]).unwrap();
        assert_eq!(records[0]["double"], json!(8));
        assert!(add_dynamic_columns(&meta, &mut records, &["nope".to_string()]).is_err());
    }

    #[test]
    fn test_record_conversion() {
        let post: Post = from_record(
            json!({"id": 2, "userId": 1, "title": "t", "extra": true})
                .as_object()
                .unwrap()
                .clone(),
        )
        .unwrap();
        assert_eq!(post.title, "t");
        let record = to_record(&post).unwrap();
        assert_eq!(record["userId"], json!(1));
        assert!(to_record(&3).is_err());
    }
}
