//! # hysteria
//!
//! A multi-dialect SQL ORM for Rust.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient access.
//! You can depend on `hysteria` to get the entire ORM, or depend on
//! individual crates for finer-grained control. Enable one or more of the
//! `postgres`, `mysql`, and `sqlite` features to get a driver.
//!
//! ```ignore
//! use hysteria::prelude::*;
//!
//! SqlDataSource::init(DataSourceInput::sqlite("app.db")).await?;
//! let adults = User::query()?.where_("age", Op::Gte, 18).many().await?;
//! ```

/// Errors, data source settings, logging, and case conversion.
pub use hysteria_core as core;

/// Models, the query builder, relations, the model manager, and transactions.
pub use hysteria_db as db;

/// Database drivers and the `SqlDataSource`.
pub use hysteria_db_backends as db_backends;

/// Versioned schema migrations.
#[cfg(feature = "db-migrations")]
pub use hysteria_db_migrations as db_migrations;

/// Third-party crates the public API is built on.
pub use {async_trait, chrono, serde, serde_json, tokio, tracing, tracing_subscriber};

/// The types most applications need.
pub mod prelude {
    pub use hysteria_core::{
        DataSourceInput, DataSourceSettings, DatabaseType, HysteriaError, HysteriaResult,
    };
    pub use hysteria_db::{
        Column, DbExecutor, Dialect, Direction, Filterable, FindOptions, Model, ModelManager,
        ModelMeta, Op, PaginatedData, QueryBuilder, Record, SoftDeleteOptions, Transaction,
        Value,
    };
    pub use hysteria_db_backends::{DatabaseBackend, ModelQuery, SqlDataSource};

    #[cfg(feature = "db-migrations")]
    pub use hysteria_db_migrations::{Migration, MigrationRunner, SqlMigration};
}
