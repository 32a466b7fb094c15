use hysteria_core::{HysteriaError, HysteriaResult};

use super::select::split_alias;
use super::SqlFragment;
use crate::model::{ModelMeta, Relation, RelationKind};
use crate::query::dialect::Dialect;
use crate::value::Value;

/// Column carrying the parent key in many-to-many results.
pub const RELATION_KEY: &str = "hysteria_key";
/// Column carrying the aggregated related rows in many-to-many results.
pub const RELATION_DATA: &str = "hysteria_data";
/// Column carrying the per-parent position in windowed results.
pub const ROW_NUMBER: &str = "row_num";

/// The parts of a relation request that shape its SQL, already expressed
/// against the related model: converted select expressions, a filter
/// fragment without the `WHERE` keyword, and qualified ORDER BY entries.
#[derive(Debug, Clone, Default)]
pub struct RelationQuery {
    pub columns: Vec<String>,
    pub filter: SqlFragment,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl RelationQuery {
    const fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }
}

/// Generates the one query that fetches a relation for a batch of parents.
///
/// Parent keys are inlined as literals. The returned fragment's SQL is
/// final: the filter's placeholders are already converted, numbered from 1.
#[derive(Debug, Clone, Copy)]
pub struct RelationTemplate<'m> {
    dialect: Dialect,
    meta: &'m ModelMeta,
}

impl<'m> RelationTemplate<'m> {
    pub const fn new(dialect: Dialect, meta: &'m ModelMeta) -> Self {
        Self { dialect, meta }
    }

    pub fn build(
        &self,
        relation: &Relation,
        query: &RelationQuery,
        keys: &[Value],
    ) -> HysteriaResult<SqlFragment> {
        let keys = keys
            .iter()
            .map(|k| self.dialect.literal(k))
            .collect::<Vec<_>>()
            .join(", ");
        let filter = if query.filter.is_empty() {
            String::new()
        } else {
            format!(
                " AND ({})",
                self.dialect.convert_placeholders(&query.filter.sql, 1)
            )
        };

        let sql = match relation.kind() {
            RelationKind::BelongsTo => {
                let related = relation.related();
                let pk = related_primary_key(relation)?;
                Self::plain(related, query, &pk, &keys, &filter)
            }
            RelationKind::HasOne => {
                let related = relation.related();
                let fk = related.to_database_case(relation.foreign_key());
                Self::plain(related, query, &fk, &keys, &filter)
            }
            RelationKind::HasMany => {
                let related = relation.related();
                let fk = related.to_database_case(relation.foreign_key());
                if query.is_paginated() {
                    Self::windowed(related, query, &fk, &keys, &filter)
                } else {
                    Self::plain(related, query, &fk, &keys, &filter)
                }
            }
            RelationKind::ManyToMany => self.many_to_many(relation, query, &keys, &filter)?,
        };

        Ok(SqlFragment::new(sql, query.filter.params.clone()))
    }

    /// `SELECT ... FROM r WHERE r.<key> IN (...) [AND (...)] [ORDER BY ...]`.
    fn plain(
        related: &ModelMeta,
        query: &RelationQuery,
        key: &str,
        keys: &str,
        filter: &str,
    ) -> String {
        let table = related.table();
        let mut sql = format!(
            "SELECT {} FROM {table} WHERE {table}.{key} IN ({keys}){filter}",
            columns_with_key(related, &query.columns, key)
        );
        if !query.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&query.order_by.join(", "));
        }
        sql
    }

    /// Ranks related rows per parent and keeps the requested window of each.
    fn windowed(
        related: &ModelMeta,
        query: &RelationQuery,
        fk: &str,
        keys: &str,
        filter: &str,
    ) -> String {
        let table = related.table();
        let order = window_order(related, query, &format!("{table}.{fk}"));
        let inner = format!(
            "SELECT {}, ROW_NUMBER() OVER (PARTITION BY {table}.{fk} ORDER BY {order}) AS {ROW_NUMBER} \
             FROM {table} WHERE {table}.{fk} IN ({keys}){filter}",
            columns_with_key(related, &query.columns, fk)
        );
        format!(
            "SELECT * FROM ({inner}) AS ranked WHERE {} ORDER BY ranked.{ROW_NUMBER}",
            row_bounds(query)
        )
    }

    /// Joins the pivot table and aggregates each parent's related rows into
    /// one JSON array.
    fn many_to_many(
        &self,
        relation: &Relation,
        query: &RelationQuery,
        keys: &str,
        filter: &str,
    ) -> HysteriaResult<String> {
        let related = relation.related();
        let table = related.table();
        let through = relation.through().ok_or_else(|| {
            HysteriaError::Configuration(format!(
                "Many-to-many relation {} has no pivot table",
                relation.name()
            ))
        })?;
        let reciprocal = related
            .relations()
            .iter()
            .find(|r| r.kind() == RelationKind::ManyToMany && r.through() == Some(through))
            .ok_or_else(|| {
                HysteriaError::Configuration(format!(
                    "Model {} declares no many-to-many relation through {through} \
                     reciprocal to {}.{}",
                    related.name(),
                    self.meta.name(),
                    relation.name()
                ))
            })?;
        let left = self.meta.to_database_case(relation.foreign_key());
        let right = related.to_database_case(reciprocal.foreign_key());
        let pk = related_primary_key(relation)?;

        let (exprs, names): (Vec<String>, Vec<String>) = if query.columns.is_empty() {
            if related.columns().is_empty() {
                return Err(HysteriaError::Configuration(format!(
                    "Model {} must declare its columns to be fetched through {}",
                    related.name(),
                    relation.name()
                )));
            }
            related
                .database_columns()
                .into_iter()
                .map(|c| (format!("{table}.{c}"), c))
                .unzip()
        } else {
            query
                .columns
                .iter()
                .map(|c| {
                    let expr = if is_identifier(c) {
                        format!("{table}.{c}")
                    } else {
                        c.clone()
                    };
                    (expr, output_name(c).to_string())
                })
                .unzip()
        };

        let ordered = !query.order_by.is_empty();
        let window = if query.is_paginated() || ordered {
            let order = window_order(related, query, &format!("{table}.{pk}"));
            format!(", ROW_NUMBER() OVER (PARTITION BY {through}.{left} ORDER BY {order}) AS {ROW_NUMBER}")
        } else {
            String::new()
        };
        let mut inner = format!(
            "SELECT {through}.{left} AS {RELATION_KEY}, {}{window} FROM {table} \
             INNER JOIN {through} ON {through}.{right} = {table}.{pk} \
             WHERE {through}.{left} IN ({keys}){filter}",
            exprs.join(", ")
        );
        if ordered && !self.dialect.orders_within_aggregate() {
            inner.push_str(&format!(" ORDER BY {RELATION_KEY}, {ROW_NUMBER}"));
        }

        let pairs: Vec<(String, String)> = names
            .into_iter()
            .map(|n| {
                let expr = format!("ranked.{n}");
                (n, expr)
            })
            .collect();
        let row_order = format!("ranked.{ROW_NUMBER}");
        let aggregate = self.dialect.json_aggregate(
            &self.dialect.json_object(&pairs),
            ordered.then_some(row_order.as_str()),
        );
        let bounds = if query.is_paginated() {
            format!(" WHERE {}", row_bounds(query))
        } else {
            String::new()
        };
        Ok(format!(
            "SELECT ranked.{RELATION_KEY}, {aggregate} AS {RELATION_DATA} FROM ({inner}) AS ranked\
             {bounds} GROUP BY ranked.{RELATION_KEY}"
        ))
    }
}

fn related_primary_key(relation: &Relation) -> HysteriaResult<String> {
    let related = relation.related();
    related.primary_key_column().ok_or_else(|| {
        HysteriaError::Configuration(format!(
            "Model {} has no primary key; relation {} requires one",
            related.name(),
            relation.name()
        ))
    })
}

/// The select list, making sure the column results are matched on is
/// present.
fn columns_with_key(related: &ModelMeta, columns: &[String], key: &str) -> String {
    let table = related.table();
    if columns.is_empty() {
        return format!("{table}.*");
    }
    let qualified = format!("{table}.{key}");
    let mut list = columns.to_vec();
    if !columns
        .iter()
        .any(|c| c == key || *c == qualified || c == "*" || *c == format!("{table}.*"))
    {
        list.push(qualified);
    }
    list.join(", ")
}

fn window_order(related: &ModelMeta, query: &RelationQuery, fallback: &str) -> String {
    if !query.order_by.is_empty() {
        return query.order_by.join(", ");
    }
    related
        .primary_key_column()
        .map_or_else(|| fallback.to_string(), |pk| format!("{}.{pk} ASC", related.table()))
}

fn row_bounds(query: &RelationQuery) -> String {
    let offset = query.offset.unwrap_or(0);
    match query.limit {
        Some(limit) => format!(
            "ranked.{ROW_NUMBER} > {offset} AND ranked.{ROW_NUMBER} <= {}",
            offset + limit
        ),
        None => format!("ranked.{ROW_NUMBER} > {offset}"),
    }
}

fn is_identifier(expr: &str) -> bool {
    expr.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// The name a select expression shows up under in the result set.
fn output_name(expr: &str) -> &str {
    if let Some((_, alias)) = split_alias(expr) {
        return alias;
    }
    expr.rsplit_once('.').map_or(expr, |(_, name)| name)
}
