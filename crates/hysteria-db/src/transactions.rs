//! Transactions over a dedicated connection.
//!
//! A backend opens a transaction by reserving one connection, issuing its
//! BEGIN, and wrapping the connection in a [`Transaction`]. Until it is
//! committed or rolled back the transaction is itself a [`DbExecutor`], so
//! model managers and query builders can be routed through it:
//!
//! ```ignore
//! let mut trx = data_source.start_transaction().await?;
//! trx.model_manager::<User>().insert(&user).await?;
//! trx.commit().await?;
//! ```
//!
//! Committing or rolling back releases the connection. A transaction is
//! finished after the first of those calls; any further use fails with
//! [`HysteriaError::Transaction`]. A transaction dropped while still active
//! is rolled back by its connection.

use async_trait::async_trait;
use hysteria_core::{HysteriaError, HysteriaResult};

use crate::executor::DbExecutor;
use crate::manager::ModelManager;
use crate::model::Model;
use crate::query::builder::QueryBuilder;
use crate::query::dialect::Dialect;
use crate::row::Row;
use crate::value::Value;

/// A connection reserved for one transaction, with BEGIN already issued.
#[async_trait]
pub trait TransactionConnection: DbExecutor {
    async fn commit(&self) -> HysteriaResult<()>;

    async fn rollback(&self) -> HysteriaResult<()>;
}

/// An open transaction.
pub struct Transaction {
    dialect: Dialect,
    connection: Option<Box<dyn TransactionConnection>>,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("dialect", &self.dialect)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Transaction {
    /// Wraps a connection whose BEGIN has succeeded.
    pub fn new(connection: Box<dyn TransactionConnection>) -> Self {
        tracing::debug!(dialect = ?connection.dialect(), "transaction started");
        Self {
            dialect: connection.dialect(),
            connection: Some(connection),
        }
    }

    pub const fn is_active(&self) -> bool {
        self.connection.is_some()
    }

    fn connection(&self) -> HysteriaResult<&dyn TransactionConnection> {
        self.connection.as_deref().ok_or_else(|| {
            HysteriaError::Transaction("transaction is no longer active".to_string())
        })
    }

    fn finish(&mut self, operation: &str) -> HysteriaResult<Box<dyn TransactionConnection>> {
        self.connection.take().ok_or_else(|| {
            HysteriaError::Transaction(format!(
                "cannot {operation}: transaction is no longer active"
            ))
        })
    }

    /// Commits and releases the connection.
    pub async fn commit(&mut self) -> HysteriaResult<()> {
        let connection = self.finish("commit")?;
        connection.commit().await?;
        tracing::debug!(dialect = ?self.dialect, "transaction committed");
        Ok(())
    }

    /// Rolls back and releases the connection.
    pub async fn rollback(&mut self) -> HysteriaResult<()> {
        let connection = self.finish("rollback")?;
        connection.rollback().await?;
        tracing::debug!(dialect = ?self.dialect, "transaction rolled back");
        Ok(())
    }

    /// A model manager bound to this transaction.
    pub fn model_manager<M: Model>(&self) -> ModelManager<'_, M> {
        ModelManager::new(self)
    }

    /// A query builder bound to this transaction.
    pub fn query_builder<M: Model>(&self) -> QueryBuilder<'_, M> {
        QueryBuilder::new(self)
    }
}

#[async_trait]
impl DbExecutor for Transaction {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn logs(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.logs())
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> HysteriaResult<u64> {
        self.connection()?.execute_sql(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> HysteriaResult<Vec<Row>> {
        self.connection()?.query(sql, params).await
    }

    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> HysteriaResult<Option<i64>> {
        self.connection()?.insert_returning_id(sql, params).await
    }
}
