//! The async database executor seam.
//!
//! [`DbExecutor`] is the bridge between the query layer and the concrete
//! drivers in `hysteria-db-backends`. Query builders and model managers
//! accept `&dyn DbExecutor`; the backends and
//! [`Transaction`](crate::transactions::Transaction) implement it, so any
//! operation can be routed through a transaction by handing it the
//! transaction instead of the data source.
//!
//! Statements reaching an executor have their placeholders already converted
//! to the dialect's bind markers.

use async_trait::async_trait;
use hysteria_core::HysteriaResult;

use crate::query::dialect::Dialect;
use crate::query::templates::SqlFragment;
use crate::row::Row;
use crate::value::Value;

/// Minimal async database executor.
#[async_trait]
pub trait DbExecutor: Send + Sync {
    /// The dialect statements must be generated for.
    fn dialect(&self) -> Dialect;

    /// Whether statements are logged at `info` rather than `trace`.
    fn logs(&self) -> bool {
        false
    }

    /// Runs a statement that returns no rows and reports the affected row
    /// count.
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> HysteriaResult<u64>;

    /// Runs a query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> HysteriaResult<Vec<Row>>;

    /// Runs an INSERT and returns the id the driver reports for it, if any.
    ///
    /// `MySQL` reports the first id of a multi-row insert, `SQLite` the last.
    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> HysteriaResult<Option<i64>>;
}

/// Converts a fragment's placeholders and runs it as a query.
pub(crate) async fn query_fragment(
    db: &dyn DbExecutor,
    fragment: &SqlFragment,
) -> HysteriaResult<Vec<Row>> {
    let sql = db.dialect().convert_placeholders(&fragment.sql, 1);
    db.query(&sql, &fragment.params).await
}

/// Converts a fragment's placeholders and runs it as a statement.
pub(crate) async fn execute_fragment(
    db: &dyn DbExecutor,
    fragment: &SqlFragment,
) -> HysteriaResult<u64> {
    let sql = db.dialect().convert_placeholders(&fragment.sql, 1);
    db.execute_sql(&sql, &fragment.params).await
}

/// Converts a fragment's placeholders and runs it as an INSERT.
pub(crate) async fn insert_fragment(
    db: &dyn DbExecutor,
    fragment: &SqlFragment,
) -> HysteriaResult<Option<i64>> {
    let sql = db.dialect().convert_placeholders(&fragment.sql, 1);
    db.insert_returning_id(&sql, &fragment.params).await
}

/// A recording executor with scripted results, for unit tests.
#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    pub(crate) struct MockExecutor {
        dialect: Dialect,
        statements: Mutex<Vec<(String, Vec<Value>)>>,
        results: Mutex<VecDeque<Vec<Row>>>,
        insert_id: Option<i64>,
    }

    impl MockExecutor {
        pub(crate) fn new(dialect: Dialect) -> Self {
            Self {
                dialect,
                statements: Mutex::new(Vec::new()),
                results: Mutex::new(VecDeque::new()),
                insert_id: None,
            }
        }

        pub(crate) const fn with_insert_id(mut self, id: i64) -> Self {
            self.insert_id = Some(id);
            self
        }

        /// Queues the rows returned by the next `query` call.
        pub(crate) fn push_rows(&self, rows: Vec<Row>) {
            self.results.lock().unwrap().push_back(rows);
        }

        pub(crate) fn statements(&self) -> Vec<(String, Vec<Value>)> {
            self.statements.lock().unwrap().clone()
        }

        pub(crate) fn sql(&self) -> Vec<String> {
            self.statements().into_iter().map(|(sql, _)| sql).collect()
        }

        fn record(&self, sql: &str, params: &[Value]) {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
        }
    }

    /// Builds a row from `(column, value)` pairs.
    pub(crate) fn row(pairs: &[(&str, Value)]) -> Row {
        let (columns, values) = pairs
            .iter()
            .map(|(c, v)| ((*c).to_string(), v.clone()))
            .unzip();
        Row::new(columns, values)
    }

    #[async_trait]
    impl DbExecutor for MockExecutor {
        fn dialect(&self) -> Dialect {
            self.dialect
        }

        async fn execute_sql(&self, sql: &str, params: &[Value]) -> HysteriaResult<u64> {
            self.record(sql, params);
            Ok(1)
        }

        async fn query(&self, sql: &str, params: &[Value]) -> HysteriaResult<Vec<Row>> {
            self.record(sql, params);
            Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn insert_returning_id(
            &self,
            sql: &str,
            params: &[Value],
        ) -> HysteriaResult<Option<i64>> {
            self.record(sql, params);
            Ok(self.insert_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{row, MockExecutor};
    use super::*;

    #[tokio::test]
    async fn test_fragments_are_converted_before_execution() {
        let db = MockExecutor::new(Dialect::Postgres);
        let fragment = SqlFragment::new(
            "SELECT * FROM users WHERE id = PLACEHOLDER OR id = PLACEHOLDER",
            vec![Value::Int(1), Value::Int(2)],
        );
        query_fragment(&db, &fragment).await.unwrap();
        execute_fragment(&db, &SqlFragment::raw("DELETE FROM users"))
            .await
            .unwrap();
        assert_eq!(
            db.sql(),
            [
                "SELECT * FROM users WHERE id = $1 OR id = $2",
                "DELETE FROM users"
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_returns_scripted_rows() {
        let db = MockExecutor::new(Dialect::Sqlite).with_insert_id(7);
        db.push_rows(vec![row(&[("id", Value::Int(1))])]);
        let rows = db.query("SELECT 1", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(db.query("SELECT 1", &[]).await.unwrap().is_empty());
        let id = insert_fragment(&db, &SqlFragment::raw("INSERT INTO t DEFAULT VALUES"))
            .await
            .unwrap();
        assert_eq!(id, Some(7));
    }
}
