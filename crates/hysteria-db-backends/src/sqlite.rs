//! SQLite database backend using `rusqlite`.
//!
//! This module provides the [`SqliteBackend`] which implements
//! [`DbExecutor`] and [`DatabaseBackend`] using `rusqlite` wrapped in
//! `tokio::task::spawn_blocking` for async compatibility.
//!
//! Features:
//! - WAL mode and foreign keys enabled on open
//! - In-memory database support via `:memory:` path (great for testing)
//! - Simple `Mutex`-based concurrency control
//!
//! There is a single connection. A transaction takes the connection's lock
//! for its whole lifetime, so statements sent to the backend itself while a
//! transaction is open wait until it is committed or rolled back.

use std::path::PathBuf;
use std::sync::Arc;

use hysteria_core::logging::log_query;
use hysteria_core::{HysteriaError, HysteriaResult};
use hysteria_db::{DbExecutor, Dialect, Row, Transaction, TransactionConnection, Value};
use rusqlite::Connection;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::base::DatabaseBackend;

/// A SQLite database backend.
///
/// Uses `rusqlite` for database access with a `Mutex`-based concurrency
/// model. All operations are run via `tokio::task::spawn_blocking` to
/// avoid blocking the async runtime.
pub struct SqliteBackend {
    /// The path to the database file (or ":memory:").
    path: PathBuf,
    /// The connection, guarded by an async mutex.
    conn: Arc<Mutex<Connection>>,
    logs: bool,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("path", &self.path)
            .field("logs", &self.logs)
            .finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Opens a SQLite database at the given path.
    ///
    /// If the path is `:memory:`, an in-memory database is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> HysteriaResult<Self> {
        let path = path.into();
        let conn = if path.to_str() == Some(":memory:") {
            Connection::open_in_memory()
        } else {
            Connection::open(&path)
        }
        .map_err(|e| HysteriaError::Operational(format!("SQLite open failed: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| HysteriaError::Operational(format!("Failed to set pragmas: {e}")))?;

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
            logs: false,
        })
    }

    /// Opens an in-memory database (convenience constructor).
    pub fn memory() -> HysteriaResult<Self> {
        Self::open(":memory:")
    }

    /// Turns statement logging at `info` on or off.
    #[must_use]
    pub const fn with_logs(mut self, logs: bool) -> Self {
        self.logs = logs;
        self
    }

    /// Returns the database file path.
    pub const fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Runs `f` against the shared connection on the blocking pool.
    async fn with_connection<T, F>(&self, f: F) -> HysteriaResult<T>
    where
        F: FnOnce(&Connection) -> HysteriaResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(join_error)?
    }
}

/// Binds ORM `Value` types to a `rusqlite` statement.
fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> HysteriaResult<()> {
    for (i, param) in params.iter().enumerate() {
        let idx = i + 1;
        match param {
            Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
            Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
            Value::Int(v) => stmt.raw_bind_parameter(idx, v),
            Value::Float(v) => stmt.raw_bind_parameter(idx, v),
            Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
            Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
            Value::Date(d) => stmt.raw_bind_parameter(idx, d.to_string().as_str()),
            Value::DateTime(dt) => stmt.raw_bind_parameter(idx, dt.to_string().as_str()),
            Value::DateTimeTz(dt) => stmt.raw_bind_parameter(idx, dt.to_rfc3339().as_str()),
            Value::Time(t) => stmt.raw_bind_parameter(idx, t.to_string().as_str()),
            Value::Uuid(u) => stmt.raw_bind_parameter(idx, u.to_string().as_str()),
            Value::Json(j) => stmt.raw_bind_parameter(idx, j.to_string().as_str()),
        }
        .map_err(|e| HysteriaError::Database(format!("Bind error: {e}")))?;
    }
    Ok(())
}

/// Converts a `rusqlite::Row` to our generic `Row`.
fn convert_row(sqlite_row: &rusqlite::Row<'_>, column_names: &[String]) -> Row {
    use rusqlite::types::ValueRef;

    let values: Vec<Value> = (0..column_names.len())
        .map(|i| match sqlite_row.get_ref(i).unwrap_or(ValueRef::Null) {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Int(v),
            ValueRef::Real(v) => Value::Float(v),
            ValueRef::Text(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
        })
        .collect();

    Row::new(column_names.to_vec(), values)
}

fn database_error(e: rusqlite::Error) -> HysteriaError {
    HysteriaError::Database(e.to_string())
}

fn join_error(e: tokio::task::JoinError) -> HysteriaError {
    HysteriaError::Database(format!("Task join error: {e}"))
}

fn run_execute(conn: &Connection, sql: &str, params: &[Value]) -> HysteriaResult<u64> {
    let mut stmt = conn.prepare(sql).map_err(database_error)?;
    bind_params(&mut stmt, params)?;
    let count = stmt.raw_execute().map_err(database_error)?;
    Ok(count as u64)
}

fn run_query(conn: &Connection, sql: &str, params: &[Value]) -> HysteriaResult<Vec<Row>> {
    let mut stmt = conn.prepare(sql).map_err(database_error)?;
    let column_names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    bind_params(&mut stmt, params)?;

    let mut raw_rows = stmt.raw_query();
    let mut rows = Vec::new();
    while let Some(row) = raw_rows.next().map_err(database_error)? {
        rows.push(convert_row(row, &column_names));
    }
    Ok(rows)
}

/// SQLite reports the rowid of the last row of a multi-row insert.
fn run_insert(conn: &Connection, sql: &str, params: &[Value]) -> HysteriaResult<Option<i64>> {
    let count = run_execute(conn, sql, params)?;
    Ok((count > 0).then(|| conn.last_insert_rowid()))
}

#[async_trait::async_trait]
impl DbExecutor for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn logs(&self) -> bool {
        self.logs
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> HysteriaResult<u64> {
        log_query(self.logs, sql, &params);
        let (sql, params) = (sql.to_string(), params.to_vec());
        self.with_connection(move |conn| run_execute(conn, &sql, &params))
            .await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> HysteriaResult<Vec<Row>> {
        log_query(self.logs, sql, &params);
        let (sql, params) = (sql.to_string(), params.to_vec());
        self.with_connection(move |conn| run_query(conn, &sql, &params))
            .await
    }

    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> HysteriaResult<Option<i64>> {
        log_query(self.logs, sql, &params);
        let (sql, params) = (sql.to_string(), params.to_vec());
        self.with_connection(move |conn| run_insert(conn, &sql, &params))
            .await
    }
}

#[async_trait::async_trait]
impl DatabaseBackend for SqliteBackend {
    fn vendor(&self) -> &'static str {
        "sqlite"
    }

    fn as_executor(&self) -> &dyn DbExecutor {
        self
    }

    async fn begin_transaction(&self) -> HysteriaResult<Transaction> {
        let connection =
            SqliteTransactionConnection::begin(Arc::clone(&self.conn), self.logs).await?;
        Ok(Transaction::new(Box::new(connection)))
    }

    async fn close(&self) -> HysteriaResult<()> {
        // The connection closes when the last handle to the backend drops;
        // waiting for the lock lets in-flight statements finish first.
        drop(self.conn.lock().await);
        tracing::debug!(path = %self.path.display(), "sqlite backend closed");
        Ok(())
    }
}

// ── Transactions ───────────────────────────────────────────────────────

/// Exclusive use of the SQLite connection for one transaction.
///
/// The guard is handed to the blocking pool for each statement and put back
/// afterwards. Once COMMIT or ROLLBACK has run, the guard is dropped and the
/// connection becomes available to the backend again.
pub struct SqliteTransactionConnection {
    guard: Mutex<Option<OwnedMutexGuard<Connection>>>,
    logs: bool,
}

impl SqliteTransactionConnection {
    async fn begin(conn: Arc<Mutex<Connection>>, logs: bool) -> HysteriaResult<Self> {
        let guard = conn.lock_owned().await;
        log_query(logs, "BEGIN", &Vec::<Value>::new());
        let (guard, result) = tokio::task::spawn_blocking(move || {
            let result = guard.execute_batch("BEGIN");
            (guard, result)
        })
        .await
        .map_err(join_error)?;

        match result {
            Ok(()) => Ok(Self {
                guard: Mutex::new(Some(guard)),
                logs,
            }),
            Err(e) => {
                drop(guard);
                Err(HysteriaError::Transaction(format!("BEGIN failed: {e}")))
            }
        }
    }

    async fn with_connection<T, F>(&self, f: F) -> HysteriaResult<T>
    where
        F: FnOnce(&Connection) -> HysteriaResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut slot = self.guard.lock().await;
        let guard = slot.take().ok_or_else(released)?;
        let (guard, result) = tokio::task::spawn_blocking(move || {
            let result = f(&guard);
            (guard, result)
        })
        .await
        .map_err(join_error)?;
        *slot = Some(guard);
        result
    }

    async fn finish(&self, statement: &'static str) -> HysteriaResult<()> {
        let guard = self.guard.lock().await.take().ok_or_else(released)?;
        log_query(self.logs, statement, &Vec::<Value>::new());
        tokio::task::spawn_blocking(move || {
            let result = guard.execute_batch(statement);
            // Never hand the shared connection back mid-transaction.
            if result.is_err() && !guard.is_autocommit() {
                if let Err(e) = guard.execute_batch("ROLLBACK") {
                    tracing::warn!(error = %e, "rollback after failed {statement} failed");
                }
            }
            result
        })
        .await
        .map_err(join_error)?
        .map_err(|e| HysteriaError::Transaction(format!("{statement} failed: {e}")))
    }
}

fn released() -> HysteriaError {
    HysteriaError::Transaction("transaction connection already released".to_string())
}

impl Drop for SqliteTransactionConnection {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.get_mut().take() {
            if !guard.is_autocommit() {
                if let Err(e) = guard.execute_batch("ROLLBACK") {
                    tracing::warn!(error = %e, "rollback of abandoned sqlite transaction failed");
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl DbExecutor for SqliteTransactionConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn logs(&self) -> bool {
        self.logs
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> HysteriaResult<u64> {
        log_query(self.logs, sql, &params);
        let (sql, params) = (sql.to_string(), params.to_vec());
        self.with_connection(move |conn| run_execute(conn, &sql, &params))
            .await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> HysteriaResult<Vec<Row>> {
        log_query(self.logs, sql, &params);
        let (sql, params) = (sql.to_string(), params.to_vec());
        self.with_connection(move |conn| run_query(conn, &sql, &params))
            .await
    }

    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> HysteriaResult<Option<i64>> {
        log_query(self.logs, sql, &params);
        let (sql, params) = (sql.to_string(), params.to_vec());
        self.with_connection(move |conn| run_insert(conn, &sql, &params))
            .await
    }
}

#[async_trait::async_trait]
impl TransactionConnection for SqliteTransactionConnection {
    async fn commit(&self) -> HysteriaResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(&self) -> HysteriaResult<()> {
        self.finish("ROLLBACK").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn backend_with_table() -> SqliteBackend {
        let backend = SqliteBackend::memory().unwrap();
        backend
            .execute_sql(
                "CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT, bio TEXT)",
                &[],
            )
            .await
            .unwrap();
        backend
    }

    async fn count(db: &dyn DbExecutor) -> i64 {
        let rows = db.query("SELECT COUNT(*) AS n FROM test", &[]).await.unwrap();
        rows[0].get::<i64>("n").unwrap()
    }

    #[tokio::test]
    async fn test_sqlite_memory_open() {
        let backend = SqliteBackend::memory().unwrap();
        assert_eq!(backend.vendor(), "sqlite");
        assert_eq!(backend.dialect(), Dialect::Sqlite);
        assert_eq!(backend.path().to_str(), Some(":memory:"));
    }

    #[tokio::test]
    async fn test_sqlite_insert_and_query() {
        let backend = backend_with_table().await;
        let id = backend
            .insert_returning_id(
                "INSERT INTO test (name, bio) VALUES (?, ?)",
                &[Value::from("Alice"), Value::Null],
            )
            .await
            .unwrap();
        assert_eq!(id, Some(1));

        let rows = backend
            .query("SELECT id, name, bio FROM test", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get::<String>("name").unwrap(), "Alice");
        assert_eq!(rows[0].get_value("bio"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_sqlite_null_into_integer_column() {
        let backend = SqliteBackend::memory().unwrap();
        backend
            .execute_sql("CREATE TABLE scores (id INTEGER PRIMARY KEY, points INTEGER)", &[])
            .await
            .unwrap();
        backend
            .execute_sql("INSERT INTO scores (points) VALUES (?)", &[Value::Null])
            .await
            .unwrap();
        let rows = backend
            .query("SELECT points FROM scores WHERE points IS NULL", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_value("points"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_sqlite_multi_row_insert_reports_last_id() {
        let backend = backend_with_table().await;
        let id = backend
            .insert_returning_id(
                "INSERT INTO test (name) VALUES (?), (?), (?)",
                &[Value::from("a"), Value::from("b"), Value::from("c")],
            )
            .await
            .unwrap();
        assert_eq!(id, Some(3));
    }

    #[tokio::test]
    async fn test_sqlite_driver_error_is_propagated() {
        let backend = SqliteBackend::memory().unwrap();
        let err = backend.query("SELECT * FROM missing", &[]).await.unwrap_err();
        assert!(matches!(err, HysteriaError::Database(ref msg) if msg.contains("missing")));
    }

    #[tokio::test]
    async fn test_sqlite_transaction_commit() {
        let backend = backend_with_table().await;
        let mut trx = backend.begin_transaction().await.unwrap();
        trx.execute_sql("INSERT INTO test (name) VALUES (?)", &[Value::from("x")])
            .await
            .unwrap();
        trx.commit().await.unwrap();
        assert_eq!(count(&backend).await, 1);
    }

    #[tokio::test]
    async fn test_sqlite_transaction_rollback() {
        let backend = backend_with_table().await;
        let mut trx = backend.begin_transaction().await.unwrap();
        trx.execute_sql("INSERT INTO test (name) VALUES (?)", &[Value::from("x")])
            .await
            .unwrap();
        assert_eq!(count(&trx).await, 1);
        trx.rollback().await.unwrap();
        assert_eq!(count(&backend).await, 0);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let backend = backend_with_table().await;
        {
            let trx = backend.begin_transaction().await.unwrap();
            trx.execute_sql("INSERT INTO test (name) VALUES (?)", &[Value::from("x")])
                .await
                .unwrap();
        }
        assert_eq!(count(&backend).await, 0);
    }

    #[tokio::test]
    async fn test_failed_begin_releases_connection() {
        let backend = backend_with_table().await;
        backend.execute_sql("BEGIN", &[]).await.unwrap();

        let err = backend.begin_transaction().await.unwrap_err();
        assert!(matches!(err, HysteriaError::Transaction(_)));

        // The shared connection is usable again.
        backend.execute_sql("ROLLBACK", &[]).await.unwrap();
        assert_eq!(count(&backend).await, 0);
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back_and_releases_connection() {
        let backend = backend_with_table().await;
        backend
            .execute_sql(
                "CREATE TABLE child (id INTEGER PRIMARY KEY, test_id INTEGER \
                 REFERENCES test (id) DEFERRABLE INITIALLY DEFERRED)",
                &[],
            )
            .await
            .unwrap();
        backend.execute_sql("PRAGMA foreign_keys = ON", &[]).await.unwrap();

        let mut trx = backend.begin_transaction().await.unwrap();
        trx.execute_sql("INSERT INTO test (name) VALUES (?)", &[Value::from("x")])
            .await
            .unwrap();
        trx.execute_sql("INSERT INTO child (test_id) VALUES (?)", &[Value::Int(99)])
            .await
            .unwrap();
        let err = trx.commit().await.unwrap_err();
        assert!(matches!(err, HysteriaError::Transaction(ref msg) if msg.starts_with("COMMIT")));

        assert_eq!(count(&backend).await, 0);
    }
}
