//! The `migrations` bookkeeping table.
//!
//! One row per applied migration: an auto-incrementing `id`, the migration
//! `name`, and the `timestamp` it was applied at. Only the primary key
//! declaration differs between dialects.

use hysteria_core::HysteriaResult;
use hysteria_db::query::PLACEHOLDER;
use hysteria_db::{DbExecutor, Dialect, Value};

/// Name of the bookkeeping table.
pub const MIGRATIONS_TABLE: &str = "migrations";

/// Reads and writes the bookkeeping table through an executor.
pub struct MigrationRecorder<'a> {
    db: &'a dyn DbExecutor,
}

impl<'a> MigrationRecorder<'a> {
    pub fn new(db: &'a dyn DbExecutor) -> Self {
        Self { db }
    }

    /// DDL creating the table if it is missing.
    pub fn ensure_schema_sql(dialect: Dialect) -> String {
        let id = match dialect {
            Dialect::Postgres => "SERIAL PRIMARY KEY",
            Dialect::MySql | Dialect::MariaDb => "INT AUTO_INCREMENT PRIMARY KEY",
            Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        };
        format!(
            "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (\
             id {id}, \
             name VARCHAR(255) NOT NULL, \
             timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)"
        )
    }

    pub async fn ensure_schema(&self) -> HysteriaResult<()> {
        let sql = Self::ensure_schema_sql(self.db.dialect());
        self.db.execute_sql(&sql, &[]).await?;
        Ok(())
    }

    /// Applied migration names, oldest first.
    pub async fn applied(&self) -> HysteriaResult<Vec<String>> {
        let sql = format!("SELECT name FROM {MIGRATIONS_TABLE} ORDER BY id");
        let rows = self.db.query(&sql, &[]).await?;
        rows.iter().map(|row| row.get::<String>("name")).collect()
    }

    pub async fn record(&self, name: &str) -> HysteriaResult<()> {
        let sql = self.db.dialect().convert_placeholders(
            &format!("INSERT INTO {MIGRATIONS_TABLE} (name) VALUES ({PLACEHOLDER})"),
            1,
        );
        self.db.execute_sql(&sql, &[Value::from(name)]).await?;
        Ok(())
    }

    pub async fn unrecord(&self, name: &str) -> HysteriaResult<()> {
        let sql = self.db.dialect().convert_placeholders(
            &format!("DELETE FROM {MIGRATIONS_TABLE} WHERE name = {PLACEHOLDER}"),
            1,
        );
        self.db.execute_sql(&sql, &[Value::from(name)]).await?;
        Ok(())
    }
}
