//! The SQL data source and its ambient singleton.
//!
//! [`SqlDataSource`] resolves its settings (explicit input over the `DB_*`
//! environment), opens the matching driver, and hands out model managers
//! and query builders bound to its connection. One data source can be
//! installed process-wide with [`SqlDataSource::init`]; the [`ModelQuery`]
//! extension trait uses it so models can be queried without passing an
//! executor around:
//!
//! ```ignore
//! SqlDataSource::init(DataSourceInput::sqlite("app.db")).await?;
//! let users = User::query()?.where_("userName", Op::Eq, "ann").many().await?;
//! ```
//!
//! Drivers are behind the `postgres`, `sqlite` and `mysql` features. Naming
//! a database whose feature is disabled, or `mongo`, fails with
//! [`HysteriaError::UnsupportedDatabase`].

use std::sync::OnceLock;

use hysteria_core::{DataSourceInput, DataSourceSettings, DatabaseType, HysteriaError, HysteriaResult};
use hysteria_db::{
    DbExecutor, Dialect, FindOptions, Model, ModelManager, QueryBuilder, Row, SoftDeleteOptions,
    Transaction, Value,
};

use crate::base::DatabaseBackend;

static INSTANCE: OnceLock<SqlDataSource> = OnceLock::new();

/// A connected SQL database.
pub struct SqlDataSource {
    settings: DataSourceSettings,
    backend: Box<dyn DatabaseBackend>,
}

impl std::fmt::Debug for SqlDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlDataSource")
            .field("db_type", &self.settings.db_type)
            .field("host", &self.settings.host)
            .field("database", &self.settings.database)
            .finish_non_exhaustive()
    }
}

impl SqlDataSource {
    /// Resolves `input` over the environment and connects.
    pub async fn connect(input: DataSourceInput) -> HysteriaResult<Self> {
        Self::from_settings(DataSourceSettings::resolve(input)?).await
    }

    /// Connects with already resolved settings. The connection is verified
    /// with a trivial query before the data source is returned.
    pub async fn from_settings(settings: DataSourceSettings) -> HysteriaResult<Self> {
        let backend = open_backend(&settings)?;
        backend.query("SELECT 1", &[]).await?;
        tracing::info!(
            db_type = %settings.db_type,
            host = %settings.host,
            database = %settings.database,
            "data source connected"
        );
        Ok(Self { settings, backend })
    }

    /// Wraps an already opened backend.
    pub fn from_backend(settings: DataSourceSettings, backend: Box<dyn DatabaseBackend>) -> Self {
        Self { settings, backend }
    }

    /// Connects and installs the result as the process-wide data source.
    ///
    /// The singleton can be installed once; a second call fails with
    /// [`HysteriaError::Configuration`] and leaves the first in place.
    pub async fn init(input: DataSourceInput) -> HysteriaResult<&'static Self> {
        if INSTANCE.get().is_some() {
            return Err(already_initialized());
        }
        let data_source = Self::connect(input).await?;
        INSTANCE.set(data_source).map_err(|_| already_initialized())?;
        Self::instance()
    }

    /// The process-wide data source installed by [`Self::init`].
    pub fn instance() -> HysteriaResult<&'static Self> {
        INSTANCE.get().ok_or_else(|| {
            HysteriaError::Configuration(
                "no data source initialized; call SqlDataSource::init first".to_string(),
            )
        })
    }

    pub const fn settings(&self) -> &DataSourceSettings {
        &self.settings
    }

    pub fn dialect(&self) -> Dialect {
        self.backend.dialect()
    }

    /// The connection as an executor, for builders constructed by hand.
    pub fn executor(&self) -> &dyn DbExecutor {
        self.backend.as_executor()
    }

    /// A model manager bound to this data source.
    pub fn get_model_manager<M: Model>(&self) -> ModelManager<'_, M> {
        ModelManager::new(self.executor())
    }

    /// A query builder bound to this data source.
    pub fn query<M: Model>(&self) -> QueryBuilder<'_, M> {
        QueryBuilder::new(self.executor())
    }

    /// Reserves a dedicated connection and begins a transaction on it.
    pub async fn start_transaction(&self) -> HysteriaResult<Transaction> {
        self.backend.begin_transaction().await
    }

    /// Runs a raw statement and returns its rows. `PLACEHOLDER` tokens are
    /// rewritten to the dialect's markers; native markers pass through.
    pub async fn raw_query(&self, sql: &str, params: &[Value]) -> HysteriaResult<Vec<Row>> {
        let sql = self.dialect().convert_placeholders(sql, 1);
        self.backend.query(&sql, params).await
    }

    /// Closes the underlying connection or pool.
    pub async fn close(&self) -> HysteriaResult<()> {
        self.backend.close().await?;
        tracing::info!(db_type = %self.settings.db_type, "data source closed");
        Ok(())
    }
}

fn already_initialized() -> HysteriaError {
    HysteriaError::Configuration("data source singleton is already initialized".to_string())
}

fn open_backend(settings: &DataSourceSettings) -> HysteriaResult<Box<dyn DatabaseBackend>> {
    match settings.db_type {
        DatabaseType::Sqlite => open_sqlite(settings),
        DatabaseType::Postgres => open_postgres(settings),
        DatabaseType::Mysql | DatabaseType::Mariadb => open_mysql(settings),
        DatabaseType::Mongo => Err(HysteriaError::UnsupportedDatabase(
            "mongo has no SQL data source".to_string(),
        )),
    }
}

#[cfg(not(all(feature = "sqlite", feature = "postgres", feature = "mysql")))]
fn feature_disabled(db_type: DatabaseType, feature: &str) -> HysteriaError {
    HysteriaError::UnsupportedDatabase(format!(
        "{db_type} (enable the `{feature}` feature of hysteria-db-backends)"
    ))
}

#[cfg(feature = "sqlite")]
fn open_sqlite(settings: &DataSourceSettings) -> HysteriaResult<Box<dyn DatabaseBackend>> {
    let backend = crate::sqlite::SqliteBackend::open(&settings.database)?.with_logs(settings.logs);
    Ok(Box::new(backend))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(settings: &DataSourceSettings) -> HysteriaResult<Box<dyn DatabaseBackend>> {
    Err(feature_disabled(settings.db_type, "sqlite"))
}

#[cfg(feature = "postgres")]
fn open_postgres(settings: &DataSourceSettings) -> HysteriaResult<Box<dyn DatabaseBackend>> {
    Ok(Box::new(crate::postgresql::PostgresBackend::from_settings(settings)?))
}

#[cfg(not(feature = "postgres"))]
fn open_postgres(settings: &DataSourceSettings) -> HysteriaResult<Box<dyn DatabaseBackend>> {
    Err(feature_disabled(settings.db_type, "postgres"))
}

#[cfg(feature = "mysql")]
fn open_mysql(settings: &DataSourceSettings) -> HysteriaResult<Box<dyn DatabaseBackend>> {
    Ok(Box::new(crate::mysql::MySqlBackend::from_settings(settings)?))
}

#[cfg(not(feature = "mysql"))]
fn open_mysql(settings: &DataSourceSettings) -> HysteriaResult<Box<dyn DatabaseBackend>> {
    Err(feature_disabled(settings.db_type, "mysql"))
}

// ── Ambient model access ───────────────────────────────────────────────

/// Model-level shortcuts against the singleton data source.
///
/// Implemented for every [`Model`]. Each call fails with
/// [`HysteriaError::Configuration`] if [`SqlDataSource::init`] has not run.
/// To route a call through a transaction, use
/// [`Transaction::model_manager`] instead.
#[async_trait::async_trait]
pub trait ModelQuery: Model {
    fn query() -> HysteriaResult<QueryBuilder<'static, Self>> {
        Ok(SqlDataSource::instance()?.query::<Self>())
    }

    fn manager() -> HysteriaResult<ModelManager<'static, Self>> {
        Ok(SqlDataSource::instance()?.get_model_manager::<Self>())
    }

    async fn find(options: FindOptions) -> HysteriaResult<Vec<Self>> {
        Self::manager()?.find(options).await
    }

    async fn find_one(options: FindOptions) -> HysteriaResult<Option<Self>> {
        Self::manager()?.find_one(options).await
    }

    async fn find_one_or_fail(options: FindOptions) -> HysteriaResult<Self> {
        Self::manager()?.find_one_or_fail(options).await
    }

    async fn find_one_by_primary_key<V>(value: V) -> HysteriaResult<Option<Self>>
    where
        V: Into<Value> + Send,
    {
        Self::manager()?.find_one_by_primary_key(value).await
    }

    async fn insert(model: &Self) -> HysteriaResult<Self> {
        Self::manager()?.insert(model).await
    }

    async fn insert_many(models: &[Self]) -> HysteriaResult<Vec<Self>> {
        Self::manager()?.insert_many(models).await
    }

    async fn update_record(model: &Self) -> HysteriaResult<Self> {
        Self::manager()?.update_record(model).await
    }

    async fn delete_record(model: &Self) -> HysteriaResult<u64> {
        Self::manager()?.delete_record(model).await
    }

    async fn soft_delete_record(model: &Self, options: SoftDeleteOptions) -> HysteriaResult<u64> {
        Self::manager()?.soft_delete_record(model, options).await
    }
}

impl<M: Model> ModelQuery for M {}
