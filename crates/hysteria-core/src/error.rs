//! Core error types for hysteria.
//!
//! Every fallible operation in the ORM returns [`HysteriaResult`]. The variants
//! of [`HysteriaError`] separate configuration mistakes (bad model metadata,
//! unknown relations, missing settings) from failures reported by the
//! database driver and from transaction misuse.

use thiserror::Error;

/// The main error type for hysteria.
#[derive(Error, Debug)]
pub enum HysteriaError {
    // ── Configuration errors ───────────────────────────────────────────
    /// Invalid model metadata, unknown relation, missing setting, or a
    /// relation/primary key required by an operation is absent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested database type has no SQL driver.
    #[error("Unsupported database type: {0}")]
    UnsupportedDatabase(String),

    /// The active dialect cannot express the requested operation.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A relation could not be resolved for the fetched rows.
    #[error("Relation error: {0}")]
    Relation(String),

    // ── Lookup errors ──────────────────────────────────────────────────
    /// `one_or_fail` found no matching row.
    #[error("ROW_NOT_FOUND")]
    RowNotFound,

    /// A caller supplied error, raised by `one_or_fail_with` and friends.
    #[error("{0}")]
    Custom(String),

    // ── Database errors ────────────────────────────────────────────────
    /// A generic error reported by the database driver.
    #[error("Database error: {0}")]
    Database(String),

    /// The connection could not be established or was lost.
    #[error("Operational error: {0}")]
    Operational(String),

    /// The transaction was already committed or rolled back, or its
    /// control statements failed.
    #[error("Transaction error: {0}")]
    Transaction(String),

    // ── Serialization errors ───────────────────────────────────────────
    /// A record could not be converted to or from a model type.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HysteriaError {
    /// Creates a [`HysteriaError::Custom`] from any displayable message.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Returns `true` for [`HysteriaError::RowNotFound`].
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RowNotFound)
    }
}

/// A convenience type alias for `Result<T, HysteriaError>`.
pub type HysteriaResult<T> = Result<T, HysteriaError>;
