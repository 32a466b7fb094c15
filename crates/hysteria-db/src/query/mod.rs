//! Query building and execution.
//!
//! - [`dialect`] - The dialect strategy and placeholder conversion
//! - [`templates`] - SQL generators per statement family
//! - [`where_builder`] - Composable WHERE clauses
//! - [`builder`] - The fluent [`QueryBuilder`]
//! - [`relations`] - Batched relation loading
//! - [`pagination`] - Page metadata

pub mod builder;
pub mod dialect;
pub mod pagination;
pub mod relations;
pub mod templates;
pub mod where_builder;

pub use builder::{QueryBuilder, SoftDeleteOptions};
pub use dialect::{Dialect, PLACEHOLDER};
pub use pagination::{PaginatedData, PaginationMetadata};
pub use templates::{Direction, Op, SqlFragment};
pub use where_builder::{Filterable, WhereQueryBuilder};
