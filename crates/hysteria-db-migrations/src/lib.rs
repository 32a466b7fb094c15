//! # hysteria-db-migrations
//!
//! Versioned schema changes for hysteria. A [`Migration`] supplies forward
//! and reverse DDL; the [`MigrationRunner`] applies pending migrations in
//! registration order and records each one in the `migrations` table.
//!
//! ## Module Overview
//!
//! - [`migration`] - The [`Migration`] trait and [`SqlMigration`]
//! - [`recorder`] - The bookkeeping table
//! - [`runner`] - Apply and roll back

#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]

pub mod migration;
pub mod recorder;
pub mod runner;

pub use migration::{Migration, SqlMigration};
pub use recorder::{MigrationRecorder, MIGRATIONS_TABLE};
pub use runner::MigrationRunner;
