//! PostgreSQL database backend using `tokio-postgres` and `deadpool-postgres`.
//!
//! This module provides the [`PostgresBackend`] which implements
//! [`DbExecutor`] and [`DatabaseBackend`] using connection pooling via
//! `deadpool-postgres`. A transaction checks one client out of the pool and
//! keeps it until COMMIT or ROLLBACK.
//!
//! Parameters are bound with their natural Rust types (`i64` as INT8, `f64`
//! as FLOAT8, JSON as JSONB), so integer columns written through the ORM are
//! expected to be BIGINT.

use deadpool_postgres::{Object, Pool};
use hysteria_core::logging::log_query;
use hysteria_core::{DataSourceSettings, HysteriaError, HysteriaResult};
use hysteria_db::{DbExecutor, Dialect, Row, Transaction, TransactionConnection, Value};
use tokio::sync::Mutex;
use tokio_postgres::types::{IsNull, ToSql, Type};

use crate::base::DatabaseBackend;

type SqlParam = Box<dyn ToSql + Sync + Send>;

/// A PostgreSQL database backend.
///
/// Uses `deadpool-postgres` for connection pooling and `tokio-postgres` for
/// query execution.
pub struct PostgresBackend {
    pool: Pool,
    logs: bool,
}

impl std::fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("logs", &self.logs)
            .finish_non_exhaustive()
    }
}

impl PostgresBackend {
    /// Creates a new `PostgresBackend` from a `deadpool-postgres` pool.
    pub const fn new(pool: Pool) -> Self {
        Self { pool, logs: false }
    }

    /// Creates a new backend from resolved settings.
    ///
    /// The pool connects lazily; no connection is made here.
    pub fn from_settings(settings: &DataSourceSettings) -> HysteriaResult<Self> {
        let mut pg_config = deadpool_postgres::Config::new();
        pg_config.dbname = Some(settings.database.clone());
        pg_config.host = Some(settings.host.clone());
        pg_config.port = settings.port;
        pg_config.user = Some(settings.username.clone());
        pg_config.password = Some(settings.password.clone());

        let pool = pg_config
            .create_pool(
                Some(deadpool_postgres::Runtime::Tokio1),
                tokio_postgres::NoTls,
            )
            .map_err(|e| HysteriaError::Operational(format!("Failed to create pool: {e}")))?;

        Ok(Self {
            pool,
            logs: settings.logs,
        })
    }

    /// Turns statement logging at `info` on or off.
    #[must_use]
    pub const fn with_logs(mut self, logs: bool) -> Self {
        self.logs = logs;
        self
    }

    async fn client(&self) -> HysteriaResult<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| HysteriaError::Operational(format!("Pool error: {e}")))
    }
}

/// An untyped SQL NULL.
///
/// `Option::<T>::None` is still type-checked against the column, so a NULL
/// bound that way only fits columns of `T`'s type.
#[derive(Debug)]
struct Null;

impl ToSql for Null {
    fn to_sql(
        &self,
        _ty: &Type,
        _out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

/// Converts ORM `Value` types to `tokio-postgres` parameters.
fn value_to_sql_params(params: &[Value]) -> Vec<SqlParam> {
    params
        .iter()
        .map(|v| -> SqlParam {
            match v {
                Value::Null => Box::new(Null),
                Value::Bool(b) => Box::new(*b),
                Value::Int(i) => Box::new(*i),
                Value::Float(f) => Box::new(*f),
                Value::String(s) => Box::new(s.clone()),
                Value::Bytes(b) => Box::new(b.clone()),
                Value::Date(d) => Box::new(*d),
                Value::DateTime(dt) => Box::new(*dt),
                Value::DateTimeTz(dt) => Box::new(*dt),
                Value::Time(t) => Box::new(*t),
                Value::Uuid(u) => Box::new(*u),
                Value::Json(j) => Box::new(j.clone()),
            }
        })
        .collect()
}

fn param_refs(params: &[SqlParam]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|p| p.as_ref() as &(dyn ToSql + Sync))
        .collect()
}

/// Converts a `tokio_postgres::Row` to our generic `Row`.
fn convert_row(pg_row: &tokio_postgres::Row) -> Row {
    fn get<'a, T: tokio_postgres::types::FromSql<'a>>(
        row: &'a tokio_postgres::Row,
        i: usize,
    ) -> Option<T> {
        row.try_get::<_, Option<T>>(i).ok().flatten()
    }

    let columns: Vec<String> = pg_row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let values: Vec<Value> = pg_row
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| match *col.type_() {
            Type::BOOL => get(pg_row, i).map_or(Value::Null, Value::Bool),
            Type::INT2 => get::<i16>(pg_row, i).map_or(Value::Null, |v| Value::Int(i64::from(v))),
            Type::INT4 => get::<i32>(pg_row, i).map_or(Value::Null, |v| Value::Int(i64::from(v))),
            Type::INT8 => get(pg_row, i).map_or(Value::Null, Value::Int),
            Type::FLOAT4 => {
                get::<f32>(pg_row, i).map_or(Value::Null, |v| Value::Float(f64::from(v)))
            }
            Type::FLOAT8 => get(pg_row, i).map_or(Value::Null, Value::Float),
            Type::BYTEA => get(pg_row, i).map_or(Value::Null, Value::Bytes),
            Type::UUID => get(pg_row, i).map_or(Value::Null, Value::Uuid),
            Type::DATE => get(pg_row, i).map_or(Value::Null, Value::Date),
            Type::TIMESTAMP => get(pg_row, i).map_or(Value::Null, Value::DateTime),
            Type::TIMESTAMPTZ => get(pg_row, i).map_or(Value::Null, Value::DateTimeTz),
            Type::TIME => get(pg_row, i).map_or(Value::Null, Value::Time),
            Type::JSON | Type::JSONB => get(pg_row, i).map_or(Value::Null, Value::Json),
            // TEXT, VARCHAR and anything else readable as text.
            _ => get(pg_row, i).map_or(Value::Null, Value::String),
        })
        .collect();

    Row::new(columns, values)
}

fn database_error(e: tokio_postgres::Error) -> HysteriaError {
    HysteriaError::Database(e.to_string())
}

async fn run_execute(
    client: &tokio_postgres::Client,
    sql: &str,
    params: &[Value],
) -> HysteriaResult<u64> {
    let sql_params = value_to_sql_params(params);
    client
        .execute(sql, &param_refs(&sql_params))
        .await
        .map_err(database_error)
}

async fn run_query(
    client: &tokio_postgres::Client,
    sql: &str,
    params: &[Value],
) -> HysteriaResult<Vec<Row>> {
    let sql_params = value_to_sql_params(params);
    let rows = client
        .query(sql, &param_refs(&sql_params))
        .await
        .map_err(database_error)?;
    Ok(rows.iter().map(convert_row).collect())
}

/// Postgres has no insert id; with a RETURNING clause the first returned
/// column of the first row is reported.
async fn run_insert(
    client: &tokio_postgres::Client,
    sql: &str,
    params: &[Value],
) -> HysteriaResult<Option<i64>> {
    let rows = run_query(client, sql, params).await?;
    Ok(rows
        .first()
        .and_then(|row| row.iter().next().and_then(|(_, value)| value.as_int())))
}

#[async_trait::async_trait]
impl DbExecutor for PostgresBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn logs(&self) -> bool {
        self.logs
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> HysteriaResult<u64> {
        log_query(self.logs, sql, &params);
        let client = self.client().await?;
        run_execute(&client, sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> HysteriaResult<Vec<Row>> {
        log_query(self.logs, sql, &params);
        let client = self.client().await?;
        run_query(&client, sql, params).await
    }

    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> HysteriaResult<Option<i64>> {
        log_query(self.logs, sql, &params);
        let client = self.client().await?;
        run_insert(&client, sql, params).await
    }
}

#[async_trait::async_trait]
impl DatabaseBackend for PostgresBackend {
    fn vendor(&self) -> &'static str {
        "postgresql"
    }

    fn as_executor(&self) -> &dyn DbExecutor {
        self
    }

    async fn begin_transaction(&self) -> HysteriaResult<Transaction> {
        let client = self.client().await?;
        log_query(self.logs, "BEGIN", &Vec::<Value>::new());
        if let Err(e) = client.batch_execute("BEGIN").await {
            drop(client);
            return Err(HysteriaError::Transaction(format!("BEGIN failed: {e}")));
        }
        Ok(Transaction::new(Box::new(PostgresTransactionConnection {
            client: Mutex::new(Some(client)),
            logs: self.logs,
        })))
    }

    async fn close(&self) -> HysteriaResult<()> {
        self.pool.close();
        tracing::debug!("postgres pool closed");
        Ok(())
    }
}

// ── Transactions ───────────────────────────────────────────────────────

/// A pooled client checked out for one transaction.
pub struct PostgresTransactionConnection {
    client: Mutex<Option<Object>>,
    logs: bool,
}

impl PostgresTransactionConnection {
    async fn finish(&self, statement: &'static str) -> HysteriaResult<()> {
        let client = self.client.lock().await.take().ok_or_else(released)?;
        log_query(self.logs, statement, &Vec::<Value>::new());
        match client.batch_execute(statement).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Keep a client in an unknown state out of the pool.
                drop(Object::take(client));
                Err(HysteriaError::Transaction(format!("{statement} failed: {e}")))
            }
        }
    }
}

fn released() -> HysteriaError {
    HysteriaError::Transaction("transaction connection already released".to_string())
}

impl Drop for PostgresTransactionConnection {
    fn drop(&mut self) {
        // Closing the connection makes the server abort the open transaction.
        if let Some(client) = self.client.get_mut().take() {
            tracing::warn!("postgres transaction dropped while active; discarding its connection");
            drop(Object::take(client));
        }
    }
}

#[async_trait::async_trait]
impl DbExecutor for PostgresTransactionConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn logs(&self) -> bool {
        self.logs
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> HysteriaResult<u64> {
        log_query(self.logs, sql, &params);
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or_else(released)?;
        run_execute(client, sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> HysteriaResult<Vec<Row>> {
        log_query(self.logs, sql, &params);
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or_else(released)?;
        run_query(client, sql, params).await
    }

    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> HysteriaResult<Option<i64>> {
        log_query(self.logs, sql, &params);
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or_else(released)?;
        run_insert(client, sql, params).await
    }
}

#[async_trait::async_trait]
impl TransactionConnection for PostgresTransactionConnection {
    async fn commit(&self) -> HysteriaResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(&self) -> HysteriaResult<()> {
        self.finish("ROLLBACK").await
    }
}
