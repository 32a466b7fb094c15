//! Relation loading.
//!
//! Each relation requested with `with` is fetched for the whole batch of
//! parent rows in one secondary query, then merged back onto the parents by
//! key. Relations are resolved one after another in request order.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use hysteria_core::{HysteriaError, HysteriaResult};

use super::templates::{RelationQuery, RELATION_DATA, RELATION_KEY, ROW_NUMBER};
use crate::executor::DbExecutor;
use crate::model::{ModelMeta, Record, Relation, RelationKind};
use crate::row::Row;
use crate::serializer::{add_dynamic_columns, serialize_pairs};
use crate::value::Value;

/// A relation requested on a query, with the state captured from its
/// sub-query.
#[derive(Debug, Clone)]
pub struct RelationRequest {
    name: String,
    query: RelationQuery,
    dynamic_columns: Vec<String>,
    ignore_hooks: bool,
}

impl RelationRequest {
    /// Requests the relation `name` with no extra shaping.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: RelationQuery::default(),
            dynamic_columns: Vec::new(),
            ignore_hooks: false,
        }
    }

    pub(crate) fn with_query(
        mut self,
        query: RelationQuery,
        dynamic_columns: Vec<String>,
        ignore_hooks: bool,
    ) -> Self {
        self.query = query;
        self.dynamic_columns = dynamic_columns;
        self.ignore_hooks = ignore_hooks;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Resolves every request and attaches the results to `records`, which
/// must be the serialized form of `rows`, in the same order.
pub(crate) async fn resolve_relations(
    db: &dyn DbExecutor,
    meta: &ModelMeta,
    rows: &[Row],
    records: &mut [Record],
    requests: &[RelationRequest],
) -> HysteriaResult<()> {
    if rows.is_empty() {
        return Ok(());
    }
    for request in requests {
        let relation = meta.relation(&request.name)?;
        resolve_one(db, meta, relation, request, rows, records).await?;
    }
    Ok(())
}

async fn resolve_one(
    db: &dyn DbExecutor,
    meta: &ModelMeta,
    relation: &Relation,
    request: &RelationRequest,
    rows: &[Row],
    records: &mut [Record],
) -> HysteriaResult<()> {
    let key_column = match relation.kind() {
        RelationKind::BelongsTo => meta.to_database_case(relation.foreign_key()),
        _ => meta.primary_key_column().ok_or_else(|| {
            HysteriaError::Configuration(format!(
                "Model {} has no primary key; relation {} requires one",
                meta.name(),
                relation.name()
            ))
        })?,
    };

    let parent_keys: Vec<Option<&Value>> = rows
        .iter()
        .map(|row| row.get_value(&key_column).filter(|v| is_present(v)))
        .collect();
    let mut keys: Vec<Value> = Vec::new();
    for key in parent_keys.iter().flatten() {
        if !keys.iter().any(|k| link_key(k) == link_key(key)) {
            keys.push((*key).clone());
        }
    }
    if keys.is_empty() {
        return Err(HysteriaError::Relation(format!(
            "Cannot resolve relation {} of {}: no row carries a value for {key_column}",
            relation.name(),
            meta.name()
        )));
    }

    let statement = db
        .dialect()
        .relation(meta)
        .build(relation, &request.query, &keys)?;
    let related_rows = db.query(&statement.sql, &statement.params).await?;

    let related = relation.related();
    let linked = match relation.kind() {
        RelationKind::ManyToMany => many_to_many_records(related, &related_rows)?,
        kind => {
            let link_column = if kind == RelationKind::BelongsTo {
                related.primary_key_column().unwrap_or_default()
            } else {
                related.to_database_case(relation.foreign_key())
            };
            related_rows
                .iter()
                .map(|row| {
                    let link = row
                        .get_value(&link_column)
                        .map(link_key)
                        .unwrap_or_default();
                    let record = serialize_pairs(
                        related,
                        row.iter()
                            .filter(|(column, _)| *column != ROW_NUMBER)
                            .map(|(column, value)| (column.to_string(), value.to_json())),
                    );
                    (link, record)
                })
                .collect()
        }
    };

    let linked = finish_related(relation, request, linked)?;
    let mut grouped: HashMap<String, Vec<Record>> = HashMap::new();
    for (link, record) in linked {
        grouped.entry(link).or_default().push(record);
    }

    for (record, key) in records.iter_mut().zip(&parent_keys) {
        let matches = key.and_then(|k| grouped.get(&link_key(k)));
        let value = match relation.kind() {
            RelationKind::BelongsTo | RelationKind::HasOne => matches
                .and_then(|m| m.last())
                .map_or(JsonValue::Null, |r| JsonValue::Object(r.clone())),
            RelationKind::HasMany | RelationKind::ManyToMany => JsonValue::Array(
                matches
                    .map(|m| m.iter().cloned().map(JsonValue::Object).collect())
                    .unwrap_or_default(),
            ),
        };
        record.insert(relation.name().to_string(), value);
    }
    Ok(())
}

/// Unpacks the aggregated JSON array of each parent key.
fn many_to_many_records(related: &ModelMeta, rows: &[Row]) -> HysteriaResult<Vec<(String, Record)>> {
    let mut linked = Vec::new();
    for row in rows {
        let link = row
            .get_value(RELATION_KEY)
            .map(link_key)
            .unwrap_or_default();
        let data = match row.get_value(RELATION_DATA) {
            Some(Value::String(text)) => serde_json::from_str(text)?,
            Some(Value::Json(json)) => json.clone(),
            Some(Value::Bytes(bytes)) => serde_json::from_slice(bytes)?,
            _ => JsonValue::Array(Vec::new()),
        };
        let JsonValue::Array(items) = data else {
            return Err(HysteriaError::Relation(format!(
                "expected a JSON array of {} rows, got {data}",
                related.name()
            )));
        };
        for item in items {
            if let JsonValue::Object(object) = item {
                linked.push((link.clone(), serialize_pairs(related, object)));
            }
        }
    }
    Ok(linked)
}

/// Runs the related model's `after_fetch` over the whole batch, then adds
/// the requested dynamic columns.
fn finish_related(
    relation: &Relation,
    request: &RelationRequest,
    linked: Vec<(String, Record)>,
) -> HysteriaResult<Vec<(String, Record)>> {
    let (links, mut records): (Vec<String>, Vec<Record>) = linked.into_iter().unzip();
    if !request.ignore_hooks {
        let expected = records.len();
        records = relation.run_related_after_fetch(records)?;
        if records.len() != expected {
            return Err(HysteriaError::Relation(format!(
                "after_fetch of {} changed the number of records loaded for relation {}",
                relation.related().name(),
                relation.name()
            )));
        }
    }
    add_dynamic_columns(relation.related(), &mut records, &request.dynamic_columns)?;
    Ok(links.into_iter().zip(records).collect())
}

/// The string parents and related rows are matched on. Integer and text
/// keys compare by their text so `1` and `"1"` still meet; binary keys are
/// hex-encoded behind a NUL tag since their display form is only a length.
fn link_key(value: &Value) -> String {
    match value {
        Value::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            format!("\0x{hex}")
        }
        other => other.to_string(),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
