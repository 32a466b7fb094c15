//! # hysteria-db-backends
//!
//! Database drivers for hysteria and the [`SqlDataSource`] that picks one
//! from resolved settings.
//!
//! Supported backends, each behind a cargo feature:
//! - `PostgreSQL` (`postgres`): `tokio-postgres` with `deadpool-postgres` pooling
//! - `MySQL` / `MariaDB` (`mysql`): `mysql_async`
//! - `SQLite` (`sqlite`): `rusqlite` on the blocking pool

#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
// significant_drop_tightening: false positives with async Mutex guards
#![allow(clippy::significant_drop_tightening)]

pub mod base;
pub mod data_source;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgresql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use base::DatabaseBackend;
pub use data_source::{ModelQuery, SqlDataSource};
#[cfg(feature = "mysql")]
pub use mysql::MySqlBackend;
#[cfg(feature = "postgres")]
pub use postgresql::PostgresBackend;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
