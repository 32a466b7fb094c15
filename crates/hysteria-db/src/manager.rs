//! The per-model CRUD facade.
//!
//! [`ModelManager`] wraps a [`QueryBuilder`] and the INSERT/UPDATE/DELETE
//! generators behind the operations application code calls most: find,
//! insert, update, and delete by record. Every method returns model
//! instances, never raw rows, and runs the model's lifecycle hooks.

use std::marker::PhantomData;

use hysteria_core::{HysteriaError, HysteriaResult};

use crate::executor::{insert_fragment, query_fragment, DbExecutor};
use crate::model::{Model, ModelMeta, Record};
use crate::query::builder::{QueryBuilder, SoftDeleteOptions};
use crate::query::dialect::InsertId;
use crate::query::templates::{Direction, Op};
use crate::query::where_builder::Filterable;
use crate::serializer::{from_record, serialize_row, to_record};
use crate::value::Value;

/// Options for [`ModelManager::find`] and friends.
///
/// ```
/// use hysteria_db::manager::FindOptions;
/// use hysteria_db::query::templates::Direction;
///
/// let options = FindOptions::new()
///     .where_("userName", "ann")
///     .order_by("id", Direction::Desc)
///     .with("posts")
///     .limit(10);
/// assert_eq!(options.limit, Some(10));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub select: Vec<String>,
    pub conditions: Vec<(String, Value)>,
    pub relations: Vec<String>,
    pub order_by: Vec<(String, Direction)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub ignore_hooks: bool,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.select = columns.iter().map(ToString::to_string).collect();
        self
    }

    /// Adds an equality condition.
    #[must_use]
    pub fn where_(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn with(mut self, relation: &str) -> Self {
        self.relations.push(relation.to_string());
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order_by.push((column.to_string(), direction));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub const fn ignore_hooks(mut self) -> Self {
        self.ignore_hooks = true;
        self
    }
}

/// CRUD operations for one model over one executor.
pub struct ModelManager<'a, M: Model> {
    db: &'a dyn DbExecutor,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> std::fmt::Debug for ModelManager<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("model", &M::meta().name())
            .field("dialect", &self.db.dialect())
            .finish()
    }
}

impl<'a, M: Model> ModelManager<'a, M> {
    pub fn new(db: &'a dyn DbExecutor) -> Self {
        Self {
            db,
            _model: PhantomData,
        }
    }

    fn meta() -> &'static ModelMeta {
        M::meta()
    }

    /// A fresh query builder over this manager's executor.
    pub fn query(&self) -> QueryBuilder<'a, M> {
        QueryBuilder::new(self.db)
    }

    fn apply(&self, options: FindOptions) -> QueryBuilder<'a, M> {
        let mut query = self.query();
        if !options.select.is_empty() {
            let columns: Vec<&str> = options.select.iter().map(String::as_str).collect();
            query = query.select(&columns);
        }
        for (column, value) in options.conditions {
            query = query.where_(&column, Op::Eq, value);
        }
        for relation in &options.relations {
            query = query.with(relation);
        }
        for (column, direction) in &options.order_by {
            query = query.order_by(column, *direction);
        }
        if let Some(limit) = options.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = options.offset {
            query = query.offset(offset);
        }
        if options.ignore_hooks {
            query = query.ignore_hooks();
        }
        query
    }

    // ── reads ──────────────────────────────────────────────────────────

    pub async fn find(&self, options: FindOptions) -> HysteriaResult<Vec<M>> {
        self.apply(options).many().await
    }

    pub async fn find_one(&self, options: FindOptions) -> HysteriaResult<Option<M>> {
        self.apply(options).one().await
    }

    /// Like [`Self::find_one`], failing with `RowNotFound`.
    pub async fn find_one_or_fail(&self, options: FindOptions) -> HysteriaResult<M> {
        self.apply(options).one_or_fail().await
    }

    pub async fn find_one_by_primary_key(&self, value: impl Into<Value>) -> HysteriaResult<Option<M>> {
        let pk = Self::meta().require_primary_key("find_one_by_primary_key")?;
        self.query().where_(pk, Op::Eq, value).one().await
    }

    // ── inserts ────────────────────────────────────────────────────────

    /// Inserts one model and returns it as stored.
    pub async fn insert(&self, model: &M) -> HysteriaResult<M> {
        from_record(self.insert_record(to_record(model)?).await?)
    }

    /// Inserts several models in one statement.
    pub async fn insert_many(&self, models: &[M]) -> HysteriaResult<Vec<M>> {
        let records = models.iter().map(to_record).collect::<HysteriaResult<Vec<_>>>()?;
        self.insert_many_records(records)
            .await?
            .into_iter()
            .map(from_record)
            .collect()
    }

    /// Inserts one record, which may leave out defaulted columns.
    pub async fn insert_record(&self, record: Record) -> HysteriaResult<Record> {
        self.insert_many_records(vec![record])
            .await?
            .into_iter()
            .next()
            .ok_or(HysteriaError::RowNotFound)
    }

    /// Inserts several records and returns them as stored.
    ///
    /// Postgres hands the rows back through `RETURNING *`. Elsewhere they
    /// are read back by primary key: the keys the records supplied, or the
    /// range derived from the driver's insert id.
    pub async fn insert_many_records(&self, mut records: Vec<Record>) -> HysteriaResult<Vec<Record>> {
        let meta = Self::meta();
        for record in &mut records {
            M::before_insert(record)?;
        }
        let statement = self.db.dialect().insert(meta).insert_many(&records)?;

        if self.db.dialect().insert_id() == InsertId::Returning {
            let rows = query_fragment(self.db, &statement).await?;
            return Ok(rows.iter().map(|r| serialize_row(meta, r)).collect());
        }

        let insert_id = insert_fragment(self.db, &statement).await?;
        let Some(pk) = meta.primary_key() else {
            return Ok(records);
        };
        let keys = self.inserted_keys(pk, &records, insert_id)?;
        if keys.is_empty() {
            return Ok(records);
        }

        let key_strings: Vec<String> = keys.iter().map(ToString::to_string).collect();
        let mut fetched = self
            .query()
            .where_in(pk, keys)
            .ignore_hooks()
            .many_records()
            .await?;
        fetched.sort_by_key(|r| {
            let key = r.get(pk).map(|v| Value::from_json(v).to_string());
            key_strings
                .iter()
                .position(|k| Some(k) == key.as_ref())
                .unwrap_or(usize::MAX)
        });
        Ok(fetched)
    }

    fn inserted_keys(
        &self,
        pk: &str,
        records: &[Record],
        insert_id: Option<i64>,
    ) -> HysteriaResult<Vec<Value>> {
        let supplied: Vec<Value> = records
            .iter()
            .filter_map(|r| r.get(pk))
            .filter(|v| !v.is_null())
            .map(Value::from_json)
            .collect();
        if supplied.len() == records.len() {
            return Ok(supplied);
        }
        let Some(id) = insert_id else {
            return Ok(Vec::new());
        };
        let count = i64::try_from(records.len()).map_err(|_| {
            HysteriaError::Operational("too many records in one insert".to_string())
        })?;
        let first = match self.db.dialect().insert_id() {
            InsertId::FirstOfBatch => id,
            InsertId::LastOfBatch | InsertId::Returning => id - count + 1,
        };
        Ok((first..first + count).map(Value::Int).collect())
    }

    // ── updates and deletes ────────────────────────────────────────────

    /// Primary key property and value of a stored model.
    fn key_of(record: &Record, operation: &str) -> HysteriaResult<(&'static str, Value)> {
        let pk = Self::meta().require_primary_key(operation)?;
        let value = record.get(pk).filter(|v| !v.is_null()).ok_or_else(|| {
            HysteriaError::Configuration(format!(
                "{operation} of {} needs a value for primary key {pk}",
                Self::meta().name()
            ))
        })?;
        Ok((pk, Value::from_json(value)))
    }

    /// Writes every column of `model` to its row and returns the row as
    /// stored.
    pub async fn update_record(&self, model: &M) -> HysteriaResult<M> {
        let mut record = to_record(model)?;
        let (pk, key) = Self::key_of(&record, "update_record")?;
        record.remove(pk);
        self.query()
            .where_(pk, Op::Eq, key.clone())
            .update(record)
            .await?;
        self.query()
            .where_(pk, Op::Eq, key)
            .one_or_fail()
            .await
    }

    /// Deletes the row of `model`.
    pub async fn delete_record(&self, model: &M) -> HysteriaResult<u64> {
        let record = to_record(model)?;
        let (pk, key) = Self::key_of(&record, "delete_record")?;
        self.query().where_(pk, Op::Eq, key).delete().await
    }

    /// Soft deletes the row of `model`.
    pub async fn soft_delete_record(
        &self,
        model: &M,
        options: SoftDeleteOptions,
    ) -> HysteriaResult<u64> {
        let record = to_record(model)?;
        let (pk, key) = Self::key_of(&record, "soft_delete_record")?;
        self.query()
            .where_(pk, Op::Eq, key)
            .soft_delete(options)
            .await
    }
}
