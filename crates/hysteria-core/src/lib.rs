//! # hysteria-core
//!
//! Core types for the hysteria ORM. This crate has no database dependencies
//! and provides the foundation for all other crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Data source settings resolved from input and environment
//! - [`settings_loader`] - Loading data source input from TOML or JSON files
//! - [`logging`] - Tracing-based logging integration
//! - [`utils`] - Case conversion and table-name helpers

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;

// Re-export the most commonly used types at the crate root.
pub use error::{HysteriaError, HysteriaResult};
pub use settings::{DataSourceInput, DataSourceSettings, DatabaseType};
pub use utils::text::{convert_case, CaseConvention};
