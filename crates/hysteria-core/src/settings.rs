//! Data source settings.
//!
//! A [`DataSourceInput`] carries whatever the caller passed explicitly. It is
//! merged over the `DB_*` environment variables into a resolved
//! [`DataSourceSettings`]; explicit input always wins.
//!
//! | Env Var | Field |
//! |---|---|
//! | `DB_TYPE` | `db_type` |
//! | `DB_HOST` | `host` |
//! | `DB_PORT` | `port` |
//! | `DB_USER` | `username` |
//! | `DB_PASSWORD` | `password` |
//! | `DB_DATABASE` | `database` |
//! | `DB_LOGS` | `logs` (`true`/`1`/`yes`) |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HysteriaError, HysteriaResult};

/// The database types a data source can name.
///
/// `Mongo` resolves as a settings value only; building a SQL data source
/// from it fails with [`HysteriaError::UnsupportedDatabase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `MySQL`.
    Mysql,
    /// `MariaDB`, driven through the `MySQL` driver.
    Mariadb,
    /// `PostgreSQL`.
    Postgres,
    /// `SQLite`.
    Sqlite,
    /// `MongoDB`.
    Mongo,
}

impl DatabaseType {
    /// The port used when neither the input nor `DB_PORT` names one.
    pub const fn default_port(self) -> Option<u16> {
        match self {
            Self::Mysql | Self::Mariadb => Some(3306),
            Self::Postgres => Some(5432),
            Self::Mongo => Some(27017),
            Self::Sqlite => None,
        }
    }

    /// Returns the lowercase name used in configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
            Self::Mongo => "mongo",
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseType {
    type Err = HysteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(Self::Mysql),
            "mariadb" => Ok(Self::Mariadb),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            "mongo" | "mongodb" => Ok(Self::Mongo),
            other => Err(HysteriaError::UnsupportedDatabase(other.to_string())),
        }
    }
}

/// Explicit connection input. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceInput {
    pub db_type: Option<DatabaseType>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub logs: Option<bool>,
}

impl DataSourceInput {
    /// Input for an in-memory `SQLite` database.
    pub fn sqlite_memory() -> Self {
        Self::sqlite(":memory:")
    }

    /// Input for a file-backed `SQLite` database.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            db_type: Some(DatabaseType::Sqlite),
            database: Some(path.into()),
            ..Self::default()
        }
    }

    /// Input for a `PostgreSQL` server.
    pub fn postgres(host: &str, database: &str, username: &str, password: &str) -> Self {
        Self::network(DatabaseType::Postgres, host, database, username, password)
    }

    /// Input for a `MySQL` server.
    pub fn mysql(host: &str, database: &str, username: &str, password: &str) -> Self {
        Self::network(DatabaseType::Mysql, host, database, username, password)
    }

    fn network(
        db_type: DatabaseType,
        host: &str,
        database: &str,
        username: &str,
        password: &str,
    ) -> Self {
        Self {
            db_type: Some(db_type),
            host: Some(host.to_string()),
            database: Some(database.to_string()),
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            ..Self::default()
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Turns query logging on or off.
    #[must_use]
    pub const fn with_logs(mut self, logs: bool) -> Self {
        self.logs = Some(logs);
        self
    }
}

/// Fully resolved data source settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceSettings {
    pub db_type: DatabaseType,
    pub host: String,
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    /// The database name, or the file path (or `:memory:`) for `SQLite`.
    pub database: String,
    pub logs: bool,
}

impl DataSourceSettings {
    /// Resolves `input` over the process environment.
    pub fn resolve(input: DataSourceInput) -> HysteriaResult<Self> {
        Self::resolve_with(input, |key| std::env::var(key).ok())
    }

    /// Resolves `input` over an arbitrary variable lookup.
    pub fn resolve_with(
        input: DataSourceInput,
        env: impl Fn(&str) -> Option<String>,
    ) -> HysteriaResult<Self> {
        let db_type = match input.db_type {
            Some(db_type) => db_type,
            None => env("DB_TYPE")
                .ok_or_else(|| {
                    HysteriaError::Configuration("database type is required (DB_TYPE)".into())
                })?
                .parse()?,
        };

        let port = match input.port {
            Some(port) => Some(port),
            None => match env("DB_PORT") {
                Some(raw) => Some(raw.trim().parse::<u16>().map_err(|_| {
                    HysteriaError::Configuration(format!("invalid DB_PORT: {raw}"))
                })?),
                None => db_type.default_port(),
            },
        };

        let database = input
            .database
            .or_else(|| env("DB_DATABASE"))
            .ok_or_else(|| {
                HysteriaError::Configuration("database name is required (DB_DATABASE)".into())
            })?;

        let logs = input.logs.unwrap_or_else(|| {
            env("DB_LOGS").is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        });

        Ok(Self {
            db_type,
            host: input
                .host
                .or_else(|| env("DB_HOST"))
                .unwrap_or_else(|| "localhost".to_string()),
            port,
            username: input.username.or_else(|| env("DB_USER")).unwrap_or_default(),
            password: input
                .password
                .or_else(|| env("DB_PASSWORD"))
                .unwrap_or_default(),
            database,
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_database_type_parse() {
        assert_eq!("postgres".parse::<DatabaseType>().unwrap(), DatabaseType::Postgres);
        assert_eq!("MariaDB".parse::<DatabaseType>().unwrap(), DatabaseType::Mariadb);
        assert_eq!("mongo".parse::<DatabaseType>().unwrap(), DatabaseType::Mongo);
        let err = "oracle".parse::<DatabaseType>().unwrap_err();
        assert!(matches!(err, HysteriaError::UnsupportedDatabase(_)));
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(DatabaseType::Mysql.default_port(), Some(3306));
        assert_eq!(DatabaseType::Mariadb.default_port(), Some(3306));
        assert_eq!(DatabaseType::Postgres.default_port(), Some(5432));
        assert_eq!(DatabaseType::Mongo.default_port(), Some(27017));
        assert_eq!(DatabaseType::Sqlite.default_port(), None);
    }

    #[test]
    fn test_resolve_from_env() {
        let env = env_of(&[
            ("DB_TYPE", "postgres"),
            ("DB_HOST", "db.internal"),
            ("DB_USER", "app"),
            ("DB_PASSWORD", "secret"),
            ("DB_DATABASE", "shop"),
            ("DB_LOGS", "yes"),
        ]);
        let settings = DataSourceSettings::resolve_with(DataSourceInput::default(), env).unwrap();
        assert_eq!(settings.db_type, DatabaseType::Postgres);
        assert_eq!(settings.host, "db.internal");
        assert_eq!(settings.port, Some(5432));
        assert_eq!(settings.username, "app");
        assert_eq!(settings.database, "shop");
        assert!(settings.logs);
    }

    #[test]
    fn test_explicit_input_wins() {
        let env = env_of(&[("DB_TYPE", "mysql"), ("DB_DATABASE", "env_db"), ("DB_PORT", "3307")]);
        let input = DataSourceInput::postgres("pg", "explicit_db", "u", "p")
            .with_port(6543)
            .with_logs(false);
        let settings = DataSourceSettings::resolve_with(input, env).unwrap();
        assert_eq!(settings.db_type, DatabaseType::Postgres);
        assert_eq!(settings.database, "explicit_db");
        assert_eq!(settings.port, Some(6543));
        assert!(!settings.logs);
    }

    #[test]
    fn test_env_port_overrides_default() {
        let env = env_of(&[("DB_TYPE", "mysql"), ("DB_DATABASE", "app"), ("DB_PORT", "3307")]);
        let settings = DataSourceSettings::resolve_with(DataSourceInput::default(), env).unwrap();
        assert_eq!(settings.port, Some(3307));
    }

    #[test]
    fn test_invalid_port_is_configuration_error() {
        let env = env_of(&[("DB_TYPE", "mysql"), ("DB_DATABASE", "app"), ("DB_PORT", "abc")]);
        let err = DataSourceSettings::resolve_with(DataSourceInput::default(), env).unwrap_err();
        assert!(matches!(err, HysteriaError::Configuration(_)));
    }

    #[test]
    fn test_missing_type_and_database() {
        let err = DataSourceSettings::resolve_with(DataSourceInput::default(), env_of(&[]))
            .unwrap_err();
        assert!(matches!(err, HysteriaError::Configuration(_)));

        let input = DataSourceInput {
            db_type: Some(DatabaseType::Sqlite),
            ..DataSourceInput::default()
        };
        let err = DataSourceSettings::resolve_with(input, env_of(&[])).unwrap_err();
        assert!(matches!(err, HysteriaError::Configuration(_)));
    }

    #[test]
    fn test_sqlite_memory_input() {
        let settings =
            DataSourceSettings::resolve_with(DataSourceInput::sqlite_memory(), env_of(&[])).unwrap();
        assert_eq!(settings.db_type, DatabaseType::Sqlite);
        assert_eq!(settings.database, ":memory:");
        assert_eq!(settings.port, None);
        assert!(!settings.logs);
    }

    #[test]
    fn test_logs_flag_values() {
        for (raw, expected) in [("true", true), ("1", true), ("YES", true), ("no", false)] {
            let env = env_of(&[("DB_TYPE", "sqlite"), ("DB_DATABASE", "x.db"), ("DB_LOGS", raw)]);
            let settings =
                DataSourceSettings::resolve_with(DataSourceInput::default(), env).unwrap();
            assert_eq!(settings.logs, expected, "DB_LOGS={raw}");
        }
    }
}
