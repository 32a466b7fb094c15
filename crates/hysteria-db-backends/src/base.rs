//! The backend trait shared by the three drivers.
//!
//! Every driver is a [`DbExecutor`] over its shared connection (or pool) and
//! can additionally reserve a dedicated connection for a [`Transaction`].

use hysteria_core::HysteriaResult;
use hysteria_db::{DbExecutor, Transaction};

/// A connected database driver.
#[async_trait::async_trait]
pub trait DatabaseBackend: DbExecutor {
    /// Returns the vendor name (e.g., "postgresql", "sqlite", "mysql").
    fn vendor(&self) -> &'static str;

    /// This backend as a plain executor.
    fn as_executor(&self) -> &dyn DbExecutor;

    /// Reserves a dedicated connection and issues BEGIN on it.
    ///
    /// If BEGIN fails the connection is released before the error is
    /// returned.
    async fn begin_transaction(&self) -> HysteriaResult<Transaction>;

    /// Closes the connection or drains the pool.
    async fn close(&self) -> HysteriaResult<()>;
}
