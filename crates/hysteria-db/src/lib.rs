//! # hysteria-db
//!
//! The query layer of hysteria. Models describe themselves through a static
//! [`ModelMeta`]; queries are built with [`QueryBuilder`] or the
//! [`ModelManager`] facade and run through any [`DbExecutor`], which the
//! drivers in `hysteria-db-backends` and [`Transaction`] implement.
//!
//! ## Architecture
//!
//! Statements are composed from fragments carrying the dialect-neutral
//! `PLACEHOLDER` token. Fragments can be nested and reordered freely; only
//! when a statement is complete are the tokens rewritten to `?` or `$n` for
//! the target dialect.
//!
//! ## Module Overview
//!
//! - [`model`] - The [`Model`] trait and [`ModelMeta`] registry
//! - [`value`] / [`row`] - Bound parameters and raw result rows
//! - [`query`] - Dialects, templates, builders, relations, pagination
//! - [`serializer`] - Rows to model-cased records
//! - [`manager`] - The CRUD facade
//! - [`transactions`] - Dedicated-connection transactions
//! - [`executor`] - The driver seam

// These clippy lints are intentionally allowed for the query crate:
// - result_large_err: HysteriaError is the crate-wide error type
// - format_push_string: format! with push_str is clearer for SQL generation
// - doc_markdown: backtick requirements for documentation items are too strict
// - needless_pass_by_value: builder signatures take owned values
// - return_self_not_must_use: builder pattern methods are self-documenting
#![allow(clippy::result_large_err)]
#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
// significant_drop_tightening: false positives with async Mutex guards
#![allow(clippy::significant_drop_tightening)]

pub mod executor;
pub mod manager;
pub mod model;
pub mod query;
pub mod row;
pub mod serializer;
pub mod transactions;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use executor::DbExecutor;
pub use manager::{FindOptions, ModelManager};
pub use model::{Column, Model, ModelMeta, Record, RelationKind, ADDITIONAL_COLUMNS};
pub use query::{
    Dialect, Direction, Filterable, Op, PaginatedData, PaginationMetadata, QueryBuilder,
    SoftDeleteOptions, SqlFragment, WhereQueryBuilder,
};
pub use row::{FromValue, Row};
pub use transactions::{Transaction, TransactionConnection};
pub use value::Value;
