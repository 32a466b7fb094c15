//! Utility functions for hysteria.
//!
//! - [`text`]: case conversion and table-name pluralization.

pub mod text;

pub use text::{convert_case, CaseConvention};
