//! The fluent query builder.
//!
//! A [`QueryBuilder`] accumulates select, join, where, group, having, order,
//! and paging state for one model, then runs it with one of its terminal
//! methods. Fetches serialize rows into records, resolve requested relations,
//! and run the model's fetch hooks; mutations run the update/delete hooks.
//!
//! Builder methods never fail. Errors found while building (an unknown
//! relation, a RIGHT JOIN on `SQLite`) are held back and returned by the
//! terminal method.

use std::marker::PhantomData;

use serde_json::Value as JsonValue;

use hysteria_core::{HysteriaError, HysteriaResult};

use super::dialect::{Dialect, PLACEHOLDER};
use super::pagination::{PaginatedData, PaginationMetadata};
use super::relations::{resolve_relations, RelationRequest};
use super::templates::{
    qualify, Direction, JoinKind, Op, RelationQuery, SelectTemplate, SqlFragment,
};
use super::where_builder::{Filterable, WhereQueryBuilder};
use crate::executor::{execute_fragment, query_fragment, DbExecutor};
use crate::model::{Model, ModelMeta, Record};
use crate::serializer::{add_dynamic_columns, from_record, serialize_row};
use crate::value::Value;

/// Format of the timestamp written by a soft delete.
pub const SOFT_DELETE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Options for [`QueryBuilder::soft_delete`].
#[derive(Debug, Clone, PartialEq)]
pub struct SoftDeleteOptions {
    /// The property set instead of deleting the row.
    pub column: String,
    /// The value written; the current local time when `None`.
    pub value: Option<JsonValue>,
}

impl Default for SoftDeleteOptions {
    fn default() -> Self {
        Self {
            column: "deletedAt".to_string(),
            value: None,
        }
    }
}

impl SoftDeleteOptions {
    pub fn column(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: None,
        }
    }

    fn record(&self) -> Record {
        let value = self.value.clone().unwrap_or_else(|| {
            JsonValue::String(chrono::Local::now().format(SOFT_DELETE_FORMAT).to_string())
        });
        let mut record = Record::new();
        record.insert(self.column.clone(), value);
        record
    }
}

/// Builds and runs queries against one model.
pub struct QueryBuilder<'a, M: Model> {
    db: &'a dyn DbExecutor,
    filters: WhereQueryBuilder,
    select: Vec<String>,
    joins: Vec<String>,
    group_by: Vec<String>,
    having: SqlFragment,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    relations: Vec<RelationRequest>,
    dynamic_columns: Vec<String>,
    ignore_hooks: bool,
    error: Option<HysteriaError>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> std::fmt::Debug for QueryBuilder<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("model", &M::meta().name())
            .field("filters", &self.filters)
            .field("relations", &self.relations)
            .finish_non_exhaustive()
    }
}

impl<M: Model> Filterable for QueryBuilder<'_, M> {
    fn filters(&mut self) -> &mut WhereQueryBuilder {
        &mut self.filters
    }
}

impl<'a, M: Model> QueryBuilder<'a, M> {
    pub fn new(db: &'a dyn DbExecutor) -> Self {
        Self {
            db,
            filters: WhereQueryBuilder::new(db.dialect(), M::meta()),
            select: Vec::new(),
            joins: Vec::new(),
            group_by: Vec::new(),
            having: SqlFragment::default(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            relations: Vec::new(),
            dynamic_columns: Vec::new(),
            ignore_hooks: false,
            error: None,
            _model: PhantomData,
        }
    }

    fn meta() -> &'static ModelMeta {
        M::meta()
    }

    fn dialect(&self) -> Dialect {
        self.filters.dialect()
    }

    fn fail(&mut self, error: HysteriaError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn take_error(&mut self) -> HysteriaResult<()> {
        self.error.take().map_or(Ok(()), Err)
    }

    // ── clause builders ────────────────────────────────────────────────

    /// Replaces the select list. Names are converted to the database
    /// convention; function calls and `*` pass through.
    pub fn select(mut self, columns: &[&str]) -> Self {
        let template = self.dialect().select(Self::meta());
        self.select = columns.iter().map(|c| template.column(c)).collect();
        self
    }

    /// Adds an ORDER BY entry.
    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        let column = if column.contains('(') {
            column.to_string()
        } else {
            qualify(Self::meta(), Self::meta().table(), column)
        };
        self.order_by.push(format!("{column} {direction}"));
        self
    }

    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn group_by(mut self, columns: &[&str]) -> Self {
        let meta = Self::meta();
        self.group_by
            .extend(columns.iter().map(|c| qualify(meta, meta.table(), c)));
        self
    }

    /// Adds a HAVING condition, joined to earlier ones with AND.
    pub fn having(mut self, column: &str, op: Op, value: impl Into<Value>) -> Self {
        let condition = if column.contains('(') {
            SqlFragment::new(
                format!("{column} {} {PLACEHOLDER}", op.sql(self.dialect())),
                vec![value.into()],
            )
        } else {
            self.filters.template().condition(column, op, value.into())
        };
        self.push_having(condition);
        self
    }

    /// Adds a raw HAVING fragment written with `PLACEHOLDER` tokens.
    pub fn having_raw(mut self, fragment: &str, params: Vec<Value>) -> Self {
        self.push_having(SqlFragment::new(fragment, params));
        self
    }

    fn push_having(&mut self, condition: SqlFragment) {
        if self.having.is_empty() {
            self.having = condition;
        } else {
            self.having.sql.push_str(" AND ");
            self.having.sql.push_str(&condition.sql);
            self.having.params.extend(condition.params);
        }
    }

    /// `INNER JOIN related ON primary = foreign`.
    pub fn join(self, related_table: &str, primary_column: &str, foreign_column: &str) -> Self {
        self.push_join(JoinKind::Inner, related_table, primary_column, foreign_column)
    }

    pub fn left_join(self, related_table: &str, primary_column: &str, foreign_column: &str) -> Self {
        self.push_join(JoinKind::Left, related_table, primary_column, foreign_column)
    }

    /// Not available on `SQLite`.
    pub fn right_join(self, related_table: &str, primary_column: &str, foreign_column: &str) -> Self {
        self.push_join(JoinKind::Right, related_table, primary_column, foreign_column)
    }

    fn push_join(
        mut self,
        kind: JoinKind,
        related_table: &str,
        primary_column: &str,
        foreign_column: &str,
    ) -> Self {
        match self
            .dialect()
            .join(Self::meta())
            .join(kind, related_table, primary_column, foreign_column)
        {
            Ok(join) => self.joins.push(join),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Loads the relation `name` alongside the results.
    pub fn with(mut self, name: &str) -> Self {
        match Self::meta().relation(name) {
            Ok(_) => self.relations.push(RelationRequest::new(name)),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Loads the relation `name`, shaped by a query over the related model.
    ///
    /// The sub-query's select list, filters, ordering, limit and offset,
    /// dynamic columns, and `ignore_hooks` flag apply to the related rows.
    /// For `has_many` and `many_to_many` the limit and offset apply per
    /// parent.
    pub fn with_query<R: Model>(
        mut self,
        name: &str,
        build: impl FnOnce(QueryBuilder<'a, R>) -> QueryBuilder<'a, R>,
    ) -> Self {
        let relation = match Self::meta().relation(name) {
            Ok(relation) => relation,
            Err(e) => {
                self.fail(e);
                return self;
            }
        };
        if relation.related().name() != R::meta().name() {
            self.fail(HysteriaError::Configuration(format!(
                "Relation {name} of {} points at {}, not {}",
                Self::meta().name(),
                relation.related().name(),
                R::meta().name()
            )));
            return self;
        }

        let mut sub = build(QueryBuilder::new(self.db));
        if let Err(e) = sub.take_error() {
            self.fail(e);
            return self;
        }
        let query = RelationQuery {
            columns: sub.select,
            filter: sub.filters.fragment().clone(),
            order_by: sub.order_by,
            limit: sub.limit,
            offset: sub.offset,
        };
        self.relations.push(
            RelationRequest::new(name).with_query(query, sub.dynamic_columns, sub.ignore_hooks),
        );
        self
    }

    /// Computes the named dynamic columns onto every fetched record.
    pub fn add_dynamic_columns(mut self, names: &[&str]) -> Self {
        self.dynamic_columns
            .extend(names.iter().map(ToString::to_string));
        self
    }

    /// Skips the model's lifecycle hooks for this query.
    pub const fn ignore_hooks(mut self) -> Self {
        self.ignore_hooks = true;
        self
    }

    // ── statement assembly ─────────────────────────────────────────────

    /// Everything after the FROM table, up to and excluding ORDER BY.
    fn body(&self) -> SqlFragment {
        let mut sql = String::new();
        let mut params = Vec::new();
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        let filter = self.filters.clause();
        if !filter.is_empty() {
            sql.push(' ');
            sql.push_str(&filter.sql);
            params.extend(filter.params);
        }
        if !self.group_by.is_empty() {
            sql.push(' ');
            sql.push_str(&SelectTemplate::group_by(&self.group_by));
        }
        if !self.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.having.sql);
            params.extend(self.having.params.iter().cloned());
        }
        SqlFragment::new(sql, params)
    }

    fn select_statement(&self) -> SqlFragment {
        let template = self.dialect().select(Self::meta());
        let body = self.body();
        let mut sql = template.select(&self.select);
        sql.push_str(&body.sql);
        let order_by = SelectTemplate::order_by(&self.order_by);
        if !order_by.is_empty() {
            sql.push(' ');
            sql.push_str(&order_by);
        }
        let tail = template.limit_offset(self.limit, self.offset);
        if !tail.is_empty() {
            sql.push(' ');
            sql.push_str(&tail);
        }
        SqlFragment::new(sql, body.params)
    }

    /// Grouped queries are counted as a subquery so the result is still one
    /// row.
    fn count_statement(&self) -> SqlFragment {
        let template = self.dialect().select(Self::meta());
        let body = self.body();
        if self.group_by.is_empty() {
            return SqlFragment::new(format!("{}{}", template.count(), body.sql), body.params);
        }
        let inner = format!("{}{}", template.select(&self.select), body.sql);
        SqlFragment::new(
            format!("SELECT COUNT(*) AS total FROM ({inner}) AS grouped"),
            body.params,
        )
    }

    /// The SELECT this builder would run, with placeholders converted.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let statement = self.select_statement();
        (
            self.dialect().convert_placeholders(&statement.sql, 1),
            statement.params,
        )
    }

    // ── fetching ───────────────────────────────────────────────────────

    fn before_fetch(&mut self) -> HysteriaResult<()> {
        self.take_error()?;
        if !self.ignore_hooks {
            M::before_fetch(self);
        }
        self.take_error()
    }

    async fn fetch(&self) -> HysteriaResult<Vec<Record>> {
        let meta = Self::meta();
        let rows = query_fragment(self.db, &self.select_statement()).await?;
        let mut records: Vec<Record> = rows.iter().map(|r| serialize_row(meta, r)).collect();
        resolve_relations(self.db, meta, &rows, &mut records, &self.relations).await?;
        if !self.ignore_hooks {
            records = M::after_fetch(records)?;
        }
        add_dynamic_columns(meta, &mut records, &self.dynamic_columns)?;
        Ok(records)
    }

    /// Fetches all matching records.
    pub async fn many_records(mut self) -> HysteriaResult<Vec<Record>> {
        self.before_fetch()?;
        self.fetch().await
    }

    /// Fetches all matching rows as model instances.
    pub async fn many(self) -> HysteriaResult<Vec<M>> {
        self.many_records()
            .await?
            .into_iter()
            .map(from_record)
            .collect()
    }

    /// Fetches the first matching record.
    pub async fn one_record(mut self) -> HysteriaResult<Option<Record>> {
        self.before_fetch()?;
        self.limit = Some(1);
        Ok(self.fetch().await?.into_iter().next())
    }

    /// Fetches the first matching row.
    pub async fn one(self) -> HysteriaResult<Option<M>> {
        self.one_record().await?.map(from_record).transpose()
    }

    /// Like [`Self::one`], failing with `RowNotFound` when nothing matches.
    pub async fn one_or_fail(self) -> HysteriaResult<M> {
        self.one().await?.ok_or(HysteriaError::RowNotFound)
    }

    /// Like [`Self::one`], failing with `error` when nothing matches.
    pub async fn one_or_fail_with(self, error: HysteriaError) -> HysteriaResult<M> {
        self.one().await?.ok_or(error)
    }

    /// Fetches one page of records with its metadata. Pages start at 1.
    pub async fn paginate_records(
        mut self,
        page: u64,
        limit: u64,
    ) -> HysteriaResult<PaginatedData<Record>> {
        self.before_fetch()?;
        let page = page.max(1);
        let limit = limit.max(1);
        let total = self.run_count().await?;
        self.limit = Some(limit);
        self.offset = Some((page - 1) * limit);
        let data = self.fetch().await?;
        Ok(PaginatedData {
            pagination_metadata: PaginationMetadata::new(page, limit, total),
            data,
        })
    }

    /// Fetches one page of model instances with its metadata.
    pub async fn paginate(self, page: u64, limit: u64) -> HysteriaResult<PaginatedData<M>> {
        let page = self.paginate_records(page, limit).await?;
        Ok(PaginatedData {
            pagination_metadata: page.pagination_metadata,
            data: page
                .data
                .into_iter()
                .map(from_record)
                .collect::<HysteriaResult<_>>()?,
        })
    }

    // ── aggregates ─────────────────────────────────────────────────────

    async fn run_count(&self) -> HysteriaResult<u64> {
        let rows = query_fragment(self.db, &self.count_statement()).await?;
        let total = rows
            .first()
            .and_then(|r| r.get_value("total"))
            .and_then(Value::as_int)
            .unwrap_or(0);
        Ok(u64::try_from(total).unwrap_or(0))
    }

    /// Counts the matching rows.
    pub async fn count(mut self) -> HysteriaResult<u64> {
        self.before_fetch()?;
        self.run_count().await
    }

    /// Sums `column` over the matching rows; 0 when nothing matches.
    pub async fn sum(mut self, column: &str) -> HysteriaResult<f64> {
        self.before_fetch()?;
        let head = self.dialect().select(Self::meta()).sum(column);
        let body = self.body();
        let statement = SqlFragment::new(format!("{head}{}", body.sql), body.params);
        let rows = query_fragment(self.db, &statement).await?;
        Ok(rows
            .first()
            .and_then(|r| r.get_value("total"))
            .and_then(Value::as_float)
            .unwrap_or(0.0))
    }

    // ── mutations ──────────────────────────────────────────────────────

    /// Updates the matching rows and returns the affected row count.
    pub async fn update(mut self, data: Record) -> HysteriaResult<u64> {
        self.take_error()?;
        if !self.ignore_hooks {
            M::before_update(&mut self);
        }
        self.take_error()?;
        let statement = self
            .dialect()
            .update(Self::meta())
            .update(&data, &self.filters.clause())?;
        execute_fragment(self.db, &statement).await
    }

    /// Deletes the matching rows and returns the affected row count.
    pub async fn delete(mut self) -> HysteriaResult<u64> {
        self.take_error()?;
        if !self.ignore_hooks {
            M::before_delete(&mut self);
        }
        self.take_error()?;
        let statement = self
            .dialect()
            .delete(Self::meta())
            .delete(&self.filters.clause());
        execute_fragment(self.db, &statement).await
    }

    /// Marks the matching rows deleted by writing a timestamp instead of
    /// removing them. Runs the update hook.
    pub async fn soft_delete(self, options: SoftDeleteOptions) -> HysteriaResult<u64> {
        self.update(options.record()).await
    }

    /// Rewrites the where state in place. Meant for lifecycle hooks, which
    /// only get a mutable reference.
    pub fn filter_in_place(&mut self, build: impl FnOnce(WhereQueryBuilder) -> WhereQueryBuilder) {
        let empty = self.filters.nested();
        let current = std::mem::replace(&mut self.filters, empty);
        self.filters = build(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::mock::{row, MockExecutor};
    use crate::query::templates::fixtures::{Post, Tag, User};
    use serde_json::json;

    #[test]
    fn test_to_sql_full_statement() {
        let db = MockExecutor::new(Dialect::Postgres);
        let (sql, params) = QueryBuilder::<User>::new(&db)
            .select(&["id", "userName as name"])
            .join("posts", "id", "userId")
            .where_("userName", Op::Eq, "ann")
            .or_where_in("id", [1, 2])
            .order_by("id", Direction::Desc)
            .limit(5)
            .offset(10)
            .to_sql();
        assert_eq!(
            sql,
            "SELECT id, user_name AS name FROM users INNER JOIN posts ON users.id = posts.user_id \
             WHERE users.user_name = $1 OR users.id IN ($2, $3) ORDER BY users.id DESC LIMIT 5 OFFSET 10"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_group_by_having_params_follow_where() {
        let db = MockExecutor::new(Dialect::Postgres);
        let (sql, params) = QueryBuilder::<Post>::new(&db)
            .select(&["userId", "COUNT(*) as total"])
            .where_("title", Op::NotEq, "draft")
            .group_by(&["userId"])
            .having("COUNT(*)", Op::Gt, 1)
            .to_sql();
        assert_eq!(
            sql,
            "SELECT user_id, COUNT(*) as total FROM posts WHERE posts.title != $1 \
             GROUP BY posts.user_id HAVING COUNT(*) > $2"
        );
        assert_eq!(params, vec![Value::from("draft"), Value::Int(1)]);
    }

    #[tokio::test]
    async fn test_many_serializes_and_resolves() {
        let db = MockExecutor::new(Dialect::Sqlite);
        db.push_rows(vec![row(&[("id", Value::Int(1)), ("user_name", Value::from("ann"))])]);
        db.push_rows(vec![row(&[
            ("id", Value::Int(3)),
            ("user_id", Value::Int(1)),
            ("title", Value::from("hello")),
        ])]);
        let records = QueryBuilder::<User>::new(&db)
            .with("posts")
            .many_records()
            .await
            .unwrap();
        assert_eq!(records[0]["posts"][0]["title"], json!("hello"));
        assert_eq!(db.sql().len(), 2);
    }

    #[tokio::test]
    async fn test_with_query_per_parent_window() {
        let db = MockExecutor::new(Dialect::Sqlite);
        db.push_rows(vec![row(&[("id", Value::Int(1)), ("user_name", Value::from("a"))])]);
        QueryBuilder::<User>::new(&db)
            .with_query::<Post>("posts", |q| {
                q.where_("title", Op::Like, "%a%")
                    .order_by("title", Direction::Asc)
                    .limit(1)
            })
            .many_records()
            .await
            .unwrap();
        let statements = db.statements();
        assert_eq!(
            statements[1].0,
            "SELECT * FROM (SELECT posts.*, ROW_NUMBER() OVER (PARTITION BY posts.user_id \
             ORDER BY posts.title ASC) AS row_num FROM posts WHERE posts.user_id IN (1) \
             AND (posts.title LIKE ?)) AS ranked WHERE ranked.row_num > 0 AND ranked.row_num <= 1 \
             ORDER BY ranked.row_num"
        );
        assert_eq!(statements[1].1, vec![Value::from("%a%")]);
    }

    #[tokio::test]
    async fn test_with_query_wrong_model_is_reported() {
        let db = MockExecutor::new(Dialect::Sqlite);
        let err = QueryBuilder::<User>::new(&db)
            .with_query::<Tag>("posts", |q| q)
            .many_records()
            .await
            .unwrap_err();
        assert!(matches!(err, HysteriaError::Configuration(_)));
        assert!(db.sql().is_empty());
    }

    #[tokio::test]
    async fn test_one_or_fail_not_found() {
        let db = MockExecutor::new(Dialect::MySql);
        let err = QueryBuilder::<User>::new(&db)
            .where_("id", Op::Eq, 9)
            .one_or_fail()
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(db.sql(), ["SELECT users.* FROM users WHERE users.id = ? LIMIT 1"]);

        let err = QueryBuilder::<User>::new(&db)
            .one_or_fail_with(HysteriaError::custom("no user"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no user");
    }

    #[tokio::test]
    async fn test_paginate_counts_then_fetches_page() {
        let db = MockExecutor::new(Dialect::Sqlite);
        db.push_rows(vec![row(&[("total", Value::Int(25))])]);
        let page = QueryBuilder::<User>::new(&db)
            .where_not_null("userName")
            .paginate_records(2, 10)
            .await
            .unwrap();
        assert_eq!(page.pagination_metadata.total, 25);
        assert_eq!(page.pagination_metadata.last_page, 3);
        assert_eq!(
            db.sql(),
            [
                "SELECT COUNT(*) AS total FROM users WHERE users.user_name IS NOT NULL",
                "SELECT users.* FROM users WHERE users.user_name IS NOT NULL LIMIT 10 OFFSET 10",
            ]
        );
    }

    #[tokio::test]
    async fn test_grouped_count_uses_subquery() {
        let db = MockExecutor::new(Dialect::Sqlite);
        db.push_rows(vec![row(&[("total", Value::Int(2))])]);
        let total = QueryBuilder::<Post>::new(&db)
            .select(&["userId"])
            .group_by(&["userId"])
            .count()
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(
            db.sql(),
            ["SELECT COUNT(*) AS total FROM (SELECT user_id FROM posts GROUP BY posts.user_id) AS grouped"]
        );
    }

    #[tokio::test]
    async fn test_sum_defaults_to_zero() {
        let db = MockExecutor::new(Dialect::Postgres);
        db.push_rows(vec![row(&[("total", Value::Null)])]);
        let total = QueryBuilder::<Post>::new(&db)
            .where_("userId", Op::Eq, 1)
            .sum("id")
            .await
            .unwrap();
        assert!(total.abs() < f64::EPSILON);
        assert_eq!(
            db.sql(),
            ["SELECT CAST(SUM(id) AS DOUBLE PRECISION) AS total FROM posts WHERE posts.user_id = $1"]
        );
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = MockExecutor::new(Dialect::Postgres);
        let mut data = Record::new();
        data.insert("userName".into(), json!("bob"));
        QueryBuilder::<User>::new(&db)
            .where_("id", Op::Eq, 1)
            .update(data)
            .await
            .unwrap();
        QueryBuilder::<User>::new(&db)
            .where_in("id", [1, 2])
            .delete()
            .await
            .unwrap();
        let statements = db.statements();
        assert_eq!(statements[0].0, "UPDATE users SET user_name = $1 WHERE users.id = $2");
        assert_eq!(statements[0].1, vec![Value::from("bob"), Value::Int(1)]);
        assert_eq!(statements[1].0, "DELETE FROM users WHERE users.id IN ($1, $2)");
    }

    #[tokio::test]
    async fn test_soft_delete_writes_timestamp() {
        let db = MockExecutor::new(Dialect::Sqlite);
        QueryBuilder::<User>::new(&db)
            .where_("id", Op::Eq, 1)
            .soft_delete(SoftDeleteOptions::default())
            .await
            .unwrap();
        let (sql, params) = db.statements().remove(0);
        assert_eq!(sql, "UPDATE users SET deleted_at = ? WHERE users.id = ?");
        let stamp = params[0].as_str().unwrap().to_string();
        assert!(chrono::NaiveDateTime::parse_from_str(&stamp, SOFT_DELETE_FORMAT).is_ok());
    }

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Note {
        id: i64,
    }

    impl Model for Note {
        fn meta() -> &'static ModelMeta {
            static META: std::sync::LazyLock<ModelMeta> = std::sync::LazyLock::new(|| {
                ModelMeta::builder("Note")
                    .column(crate::model::Column::new("id").primary_key())
                    .build()
                    .unwrap()
            });
            &META
        }

        fn before_fetch(query: &mut QueryBuilder<'_, Self>) {
            query.filter_in_place(|w| w.where_null("deletedAt"));
        }

        fn after_fetch(mut records: Vec<Record>) -> HysteriaResult<Vec<Record>> {
            for record in &mut records {
                record.insert("seen".into(), json!(true));
            }
            Ok(records)
        }
    }

    #[tokio::test]
    async fn test_fetch_hooks_run_unless_ignored() {
        let db = MockExecutor::new(Dialect::Sqlite);
        db.push_rows(vec![row(&[("id", Value::Int(1))])]);
        let records = QueryBuilder::<Note>::new(&db)
            .where_("id", Op::Gt, 0)
            .many_records()
            .await
            .unwrap();
        assert_eq!(records[0]["seen"], json!(true));

        db.push_rows(vec![row(&[("id", Value::Int(1))])]);
        let records = QueryBuilder::<Note>::new(&db)
            .ignore_hooks()
            .many_records()
            .await
            .unwrap();
        assert!(records[0].get("seen").is_none());
        assert_eq!(
            db.sql(),
            [
                "SELECT notes.* FROM notes WHERE notes.id > ? AND notes.deleted_at IS NULL",
                "SELECT notes.* FROM notes",
            ]
        );
    }

    #[tokio::test]
    async fn test_right_join_error_deferred_to_terminal() {
        let db = MockExecutor::new(Dialect::Sqlite);
        let err = QueryBuilder::<User>::new(&db)
            .right_join("posts", "id", "userId")
            .count()
            .await
            .unwrap_err();
        assert!(matches!(err, HysteriaError::UnsupportedOperation(_)));
    }
}
