//! The unit of schema change.
//!
//! A [`Migration`] is a named pair of DDL statement lists. Statements are
//! produced per [`Dialect`] so one migration can target every supported
//! database; [`SqlMigration`] covers the common case of fixed statements.

use hysteria_db::Dialect;

/// A named, reversible schema change.
pub trait Migration: Send + Sync {
    /// Unique name recorded in the bookkeeping table once applied.
    ///
    /// Names sort the way migrations should run, so a timestamp or counter
    /// prefix (`0001_create_users`) is the usual convention.
    fn name(&self) -> &str;

    /// Statements that apply the change.
    fn up(&self, dialect: Dialect) -> Vec<String>;

    /// Statements that revert [`up`](Self::up).
    fn down(&self, dialect: Dialect) -> Vec<String>;
}

/// A migration made of fixed statements, identical for every dialect.
///
/// # Examples
///
/// ```
/// use hysteria_db::Dialect;
/// use hysteria_db_migrations::{Migration, SqlMigration};
///
/// let m = SqlMigration::new("0001_create_users")
///     .up_sql("CREATE TABLE users (id INTEGER PRIMARY KEY)")
///     .down_sql("DROP TABLE users");
/// assert_eq!(m.up(Dialect::Sqlite).len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlMigration {
    name: String,
    up: Vec<String>,
    down: Vec<String>,
}

impl SqlMigration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            up: Vec::new(),
            down: Vec::new(),
        }
    }

    /// Appends a forward statement.
    #[must_use]
    pub fn up_sql(mut self, statement: impl Into<String>) -> Self {
        self.up.push(statement.into());
        self
    }

    /// Appends a reverse statement. Reverse statements run in the order added.
    #[must_use]
    pub fn down_sql(mut self, statement: impl Into<String>) -> Self {
        self.down.push(statement.into());
        self
    }
}

impl Migration for SqlMigration {
    fn name(&self) -> &str {
        &self.name
    }

    fn up(&self, _dialect: Dialect) -> Vec<String> {
        self.up.clone()
    }

    fn down(&self, _dialect: Dialect) -> Vec<String> {
        self.down.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_migration_keeps_statement_order() {
        let m = SqlMigration::new("0002_posts")
            .up_sql("CREATE TABLE posts (id INTEGER)")
            .up_sql("CREATE INDEX posts_id ON posts (id)")
            .down_sql("DROP INDEX posts_id")
            .down_sql("DROP TABLE posts");

        assert_eq!(Migration::name(&m), "0002_posts");
        assert_eq!(
            m.up(Dialect::Postgres),
            vec!["CREATE TABLE posts (id INTEGER)", "CREATE INDEX posts_id ON posts (id)"]
        );
        assert_eq!(m.down(Dialect::MySql)[0], "DROP INDEX posts_id");
    }

    struct PerDialect;

    impl Migration for PerDialect {
        fn name(&self) -> &str {
            "0003_events"
        }

        fn up(&self, dialect: Dialect) -> Vec<String> {
            let id = match dialect {
                Dialect::Postgres => "BIGSERIAL PRIMARY KEY",
                Dialect::MySql | Dialect::MariaDb => "BIGINT AUTO_INCREMENT PRIMARY KEY",
                Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            };
            vec![format!("CREATE TABLE events (id {id})")]
        }

        fn down(&self, _dialect: Dialect) -> Vec<String> {
            vec!["DROP TABLE events".to_string()]
        }
    }

    #[test]
    fn test_custom_migration_varies_by_dialect() {
        assert!(PerDialect.up(Dialect::Postgres)[0].contains("BIGSERIAL"));
        assert!(PerDialect.up(Dialect::Sqlite)[0].contains("AUTOINCREMENT"));
    }
}
