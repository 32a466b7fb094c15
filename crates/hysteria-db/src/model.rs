//! Model trait and metadata registry.
//!
//! Every model type implements [`Model`], which hands out a static
//! [`ModelMeta`] describing its table, columns, relations, and naming
//! conventions. Metadata is built once, usually inside a `LazyLock`, through
//! [`ModelMeta::builder`]. Relations point at the related model's metadata
//! through a function, so models may reference each other in both
//! directions without an initialization cycle.
//!
//! The lifecycle hooks on [`Model`] all have no-op defaults; override the
//! ones you need.
//!
//! # Examples
//!
//! ```
//! use std::sync::LazyLock;
//! use hysteria_db::model::{Column, Model, ModelMeta};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct User {
//!     id: Option<i64>,
//!     user_name: String,
//! }
//!
//! impl Model for User {
//!     fn meta() -> &'static ModelMeta {
//!         static META: LazyLock<ModelMeta> = LazyLock::new(|| {
//!             ModelMeta::builder("User")
//!                 .column(Column::new("id").primary_key())
//!                 .column(Column::new("userName"))
//!                 .build()
//!                 .expect("valid metadata")
//!         });
//!         &META
//!     }
//! }
//!
//! assert_eq!(User::meta().table(), "users");
//! assert_eq!(User::meta().primary_key_column().as_deref(), Some("id"));
//! ```

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use hysteria_core::utils::text::{convert_case, table_name_for, CaseConvention};
use hysteria_core::{HysteriaError, HysteriaResult};

use crate::query::builder::QueryBuilder;

/// A serialized model instance: property names in the model convention
/// mapped to JSON values.
pub type Record = serde_json::Map<String, JsonValue>;

/// Key under which columns without declared metadata are collected.
pub const ADDITIONAL_COLUMNS: &str = "$additionalColumns";

/// The core trait for all ORM models.
///
/// Instances travel through the ORM as [`Record`]s and are converted with
/// `serde`, so the struct's serialized field names must follow the model's
/// case convention (camelCase by default).
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Returns the static metadata for this model type.
    fn meta() -> &'static ModelMeta;

    /// Runs before every fetch issued through a query builder.
    fn before_fetch(_query: &mut QueryBuilder<'_, Self>) {}

    /// Runs over every batch of fetched records, including related records
    /// fetched for another model. Must return one record per input record.
    fn after_fetch(records: Vec<Record>) -> HysteriaResult<Vec<Record>> {
        Ok(records)
    }

    /// Runs on the serialized data before it is inserted.
    fn before_insert(_data: &mut Record) -> HysteriaResult<()> {
        Ok(())
    }

    /// Runs before an UPDATE built by a query builder.
    fn before_update(_query: &mut QueryBuilder<'_, Self>) {}

    /// Runs before a DELETE built by a query builder.
    fn before_delete(_query: &mut QueryBuilder<'_, Self>) {}
}

// ── Columns ────────────────────────────────────────────────────────────

/// A transform applied to a single column value.
pub type ValueTransform = fn(JsonValue) -> JsonValue;

/// Metadata for one declared column.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    primary_key: bool,
    hidden: bool,
    serialize: Option<ValueTransform>,
    prepare: Option<ValueTransform>,
}

impl Column {
    /// Declares a column by its property name in the model convention.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: false,
            hidden: false,
            serialize: None,
            prepare: None,
        }
    }

    /// Marks this column as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Omits this column from serialized records.
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Transforms the database value when a record is serialized.
    #[must_use]
    pub const fn serialize(mut self, f: ValueTransform) -> Self {
        self.serialize = Some(f);
        self
    }

    /// Transforms the model value before it is written.
    #[must_use]
    pub const fn prepare(mut self, f: ValueTransform) -> Self {
        self.prepare = Some(f);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub(crate) fn serialize_value(&self, value: JsonValue) -> JsonValue {
        match self.serialize {
            Some(f) => f(value),
            None => value,
        }
    }

    pub(crate) fn prepare_value(&self, value: JsonValue) -> JsonValue {
        match self.prepare {
            Some(f) => f(value),
            None => value,
        }
    }
}

// ── Relations ──────────────────────────────────────────────────────────

/// The four relation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The foreign key lives on this model's table.
    BelongsTo,
    /// The foreign key lives on the related table; at most one match.
    HasOne,
    /// The foreign key lives on the related table.
    HasMany,
    /// Linked through a pivot table.
    ManyToMany,
}

/// A declared relation to another model.
#[derive(Clone)]
pub struct Relation {
    kind: RelationKind,
    name: String,
    foreign_key: String,
    through: Option<String>,
    related: fn() -> &'static ModelMeta,
    related_after_fetch: fn(Vec<Record>) -> HysteriaResult<Vec<Record>>,
}

impl Relation {
    fn new<R: Model>(
        kind: RelationKind,
        name: impl Into<String>,
        foreign_key: impl Into<String>,
        through: Option<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            foreign_key: foreign_key.into(),
            through,
            related: R::meta,
            related_after_fetch: R::after_fetch,
        }
    }

    pub const fn kind(&self) -> RelationKind {
        self.kind
    }

    /// The property name the related data is attached under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The foreign key as declared: on this table for `BelongsTo`, on the
    /// related table for `HasOne`/`HasMany`, on the pivot table (pointing
    /// back at this model) for `ManyToMany`.
    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    /// The pivot table of a many-to-many relation.
    pub fn through(&self) -> Option<&str> {
        self.through.as_deref()
    }

    /// The related model's metadata.
    pub fn related(&self) -> &'static ModelMeta {
        (self.related)()
    }

    pub(crate) fn run_related_after_fetch(&self, records: Vec<Record>) -> HysteriaResult<Vec<Record>> {
        (self.related_after_fetch)(records)
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("foreign_key", &self.foreign_key)
            .field("through", &self.through)
            .field("related", &self.related().name())
            .finish_non_exhaustive()
    }
}

// ── Dynamic columns ────────────────────────────────────────────────────

/// A computed property added to serialized records on request.
#[derive(Clone)]
pub struct DynamicColumn {
    name: String,
    compute: fn(&Record) -> JsonValue,
}

impl DynamicColumn {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compute(&self, record: &Record) -> JsonValue {
        (self.compute)(record)
    }
}

impl fmt::Debug for DynamicColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicColumn")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ── ModelMeta ──────────────────────────────────────────────────────────

/// Static metadata for a model.
#[derive(Debug, Clone)]
pub struct ModelMeta {
    name: String,
    table: String,
    primary_key: Option<String>,
    model_case_convention: CaseConvention,
    database_case_convention: CaseConvention,
    columns: Vec<Column>,
    relations: Vec<Relation>,
    dynamic_columns: Vec<DynamicColumn>,
}

impl ModelMeta {
    /// Starts building metadata for the model called `name`.
    pub fn builder(name: impl Into<String>) -> ModelMetaBuilder {
        ModelMetaBuilder::new(name.into())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn dynamic_columns(&self) -> &[DynamicColumn] {
        &self.dynamic_columns
    }

    pub const fn model_case_convention(&self) -> &CaseConvention {
        &self.model_case_convention
    }

    pub const fn database_case_convention(&self) -> &CaseConvention {
        &self.database_case_convention
    }

    /// The primary key property name, in the model convention.
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// The primary key column name, in the database convention.
    pub fn primary_key_column(&self) -> Option<String> {
        self.primary_key.as_deref().map(|pk| self.to_database_case(pk))
    }

    /// Returns the primary key property name or a configuration error
    /// naming `operation`.
    pub fn require_primary_key(&self, operation: &str) -> HysteriaResult<&str> {
        self.primary_key().ok_or_else(|| {
            HysteriaError::Configuration(format!(
                "Model {} has no primary key; {operation} requires one",
                self.name
            ))
        })
    }

    /// Converts a name to the database convention.
    pub fn to_database_case(&self, name: &str) -> String {
        convert_case(name, &self.database_case_convention)
    }

    /// Converts a name to the model convention.
    pub fn to_model_case(&self, name: &str) -> String {
        convert_case(name, &self.model_case_convention)
    }

    /// Looks up a declared column by its model-convention name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The database names of all declared columns.
    pub fn database_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| self.to_database_case(&c.name))
            .collect()
    }

    /// Looks up a relation by name.
    pub fn relation(&self, name: &str) -> HysteriaResult<&Relation> {
        self.relations
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| {
                HysteriaError::Configuration(format!(
                    "Relation {name} not found in model {}",
                    self.name
                ))
            })
    }

    /// Looks up a dynamic column by name.
    pub fn dynamic_column(&self, name: &str) -> HysteriaResult<&DynamicColumn> {
        self.dynamic_columns
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| {
                HysteriaError::Configuration(format!(
                    "Dynamic column {name} not found in model {}",
                    self.name
                ))
            })
    }

    /// Returns `true` if `name` is a relation or a dynamic column rather
    /// than a stored column.
    pub(crate) fn is_virtual(&self, name: &str) -> bool {
        name == ADDITIONAL_COLUMNS
            || self.relations.iter().any(|r| r.name == name)
            || self.dynamic_columns.iter().any(|d| d.name == name)
    }
}

/// Builder for [`ModelMeta`].
#[derive(Debug)]
pub struct ModelMetaBuilder {
    name: String,
    table: Option<String>,
    model_case_convention: CaseConvention,
    database_case_convention: CaseConvention,
    columns: Vec<Column>,
    relations: Vec<Relation>,
    dynamic_columns: Vec<DynamicColumn>,
}

impl ModelMetaBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            table: None,
            model_case_convention: CaseConvention::Camel,
            database_case_convention: CaseConvention::Snake,
            columns: Vec::new(),
            relations: Vec::new(),
            dynamic_columns: Vec::new(),
        }
    }

    /// Overrides the derived table name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    #[must_use]
    pub fn model_case_convention(mut self, convention: CaseConvention) -> Self {
        self.model_case_convention = convention;
        self
    }

    #[must_use]
    pub fn database_case_convention(mut self, convention: CaseConvention) -> Self {
        self.database_case_convention = convention;
        self
    }

    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Declares that this table holds `foreign_key`, pointing at `R`.
    #[must_use]
    pub fn belongs_to<R: Model>(mut self, name: &str, foreign_key: &str) -> Self {
        self.relations
            .push(Relation::new::<R>(RelationKind::BelongsTo, name, foreign_key, None));
        self
    }

    /// Declares that `R`'s table holds `foreign_key`, at most one row per
    /// parent.
    #[must_use]
    pub fn has_one<R: Model>(mut self, name: &str, foreign_key: &str) -> Self {
        self.relations
            .push(Relation::new::<R>(RelationKind::HasOne, name, foreign_key, None));
        self
    }

    /// Declares that `R`'s table holds `foreign_key`.
    #[must_use]
    pub fn has_many<R: Model>(mut self, name: &str, foreign_key: &str) -> Self {
        self.relations
            .push(Relation::new::<R>(RelationKind::HasMany, name, foreign_key, None));
        self
    }

    /// Declares a relation to `R` through the pivot table `through`, whose
    /// `foreign_key` column points at this model. `R` must declare the
    /// reciprocal relation through the same pivot table.
    #[must_use]
    pub fn many_to_many<R: Model>(mut self, name: &str, through: &str, foreign_key: &str) -> Self {
        self.relations.push(Relation::new::<R>(
            RelationKind::ManyToMany,
            name,
            foreign_key,
            Some(through.to_string()),
        ));
        self
    }

    #[must_use]
    pub fn dynamic_column(mut self, name: &str, compute: fn(&Record) -> JsonValue) -> Self {
        self.dynamic_columns.push(DynamicColumn {
            name: name.to_string(),
            compute,
        });
        self
    }

    /// Validates and builds the metadata.
    pub fn build(self) -> HysteriaResult<ModelMeta> {
        let mut primary_key = None;
        for (idx, column) in self.columns.iter().enumerate() {
            if self.columns[..idx].iter().any(|c| c.name == column.name) {
                return Err(HysteriaError::Configuration(format!(
                    "Column {} is declared twice in model {}",
                    column.name, self.name
                )));
            }
            if column.primary_key {
                if primary_key.is_some() {
                    return Err(HysteriaError::Configuration(format!(
                        "Model {} declares more than one primary key",
                        self.name
                    )));
                }
                primary_key = Some(column.name.clone());
            }
        }

        Ok(ModelMeta {
            table: self.table.unwrap_or_else(|| table_name_for(&self.name)),
            name: self.name,
            primary_key,
            model_case_convention: self.model_case_convention,
            database_case_convention: self.database_case_convention,
            columns: self.columns,
            relations: self.relations,
            dynamic_columns: self.dynamic_columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::LazyLock;

    #[derive(Serialize, Deserialize)]
    struct Author {
        id: i64,
    }

    impl Model for Author {
        fn meta() -> &'static ModelMeta {
            static META: LazyLock<ModelMeta> = LazyLock::new(|| {
                ModelMeta::builder("Author")
                    .column(Column::new("id").primary_key())
                    .has_many::<Book>("books", "authorId")
                    .build()
                    .unwrap()
            });
            &META
        }
    }

    #[derive(Serialize, Deserialize)]
    struct Book {
        id: i64,
    }

    impl Model for Book {
        fn meta() -> &'static ModelMeta {
            static META: LazyLock<ModelMeta> = LazyLock::new(|| {
                ModelMeta::builder("Book")
                    .column(Column::new("id").primary_key())
                    .column(Column::new("authorId"))
                    .belongs_to::<Author>("author", "authorId")
                    .dynamic_column("label", |r| json!(format!("book-{}", r["id"])))
                    .build()
                    .unwrap()
            });
            &META
        }
    }

    #[test]
    fn test_derived_table_name() {
        assert_eq!(Author::meta().table(), "authors");
        let meta = ModelMeta::builder("UserProfile").build().unwrap();
        assert_eq!(meta.table(), "user_profiles");
        let meta = ModelMeta::builder("Person").table("people").build().unwrap();
        assert_eq!(meta.table(), "people");
    }

    #[test]
    fn test_duplicate_primary_key_rejected() {
        let err = ModelMeta::builder("Broken")
            .column(Column::new("id").primary_key())
            .column(Column::new("uuid").primary_key())
            .build()
            .unwrap_err();
        assert!(matches!(err, HysteriaError::Configuration(_)));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let err = ModelMeta::builder("Broken")
            .column(Column::new("name"))
            .column(Column::new("name"))
            .build()
            .unwrap_err();
        assert!(matches!(err, HysteriaError::Configuration(_)));
    }

    #[test]
    fn test_case_conversion() {
        let meta = Book::meta();
        assert_eq!(meta.to_database_case("authorId"), "author_id");
        assert_eq!(meta.to_model_case("author_id"), "authorId");
        assert_eq!(meta.database_columns(), ["id", "author_id"]);
    }

    #[test]
    fn test_relations_resolve_both_ways() {
        let books = Author::meta().relation("books").unwrap();
        assert_eq!(books.kind(), RelationKind::HasMany);
        assert_eq!(books.related().name(), "Book");
        let author = Book::meta().relation("author").unwrap();
        assert_eq!(author.related().table(), "authors");
    }

    #[test]
    fn test_unknown_relation_names_model() {
        let err = Author::meta().relation("comments").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("comments"));
        assert!(message.contains("Author"));
    }

    #[test]
    fn test_require_primary_key() {
        let meta = ModelMeta::builder("Log").build().unwrap();
        assert!(meta.primary_key_column().is_none());
        assert!(matches!(
            meta.require_primary_key("update"),
            Err(HysteriaError::Configuration(_))
        ));
        assert_eq!(Author::meta().require_primary_key("update").unwrap(), "id");
    }

    #[test]
    fn test_dynamic_column_and_virtual_names() {
        let meta = Book::meta();
        let mut record = Record::new();
        record.insert("id".into(), json!(3));
        let label = meta.dynamic_column("label").unwrap().compute(&record);
        assert_eq!(label, json!("book-3"));
        assert!(meta.is_virtual("author"));
        assert!(meta.is_virtual("label"));
        assert!(meta.is_virtual(ADDITIONAL_COLUMNS));
        assert!(!meta.is_virtual("authorId"));
    }

    #[test]
    fn test_column_transforms() {
        let column = Column::new("active").serialize(|v| json!(v == json!(1))).hidden();
        assert!(column.is_hidden());
        assert_eq!(column.serialize_value(json!(1)), json!(true));
        assert_eq!(Column::new("x").prepare_value(json!("a")), json!("a"));
    }
}
