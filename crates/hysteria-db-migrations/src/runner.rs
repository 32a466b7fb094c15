//! Applying and reverting registered migrations.
//!
//! The runner executes statements one by one on the executor it was given,
//! without wrapping them in a transaction: several dialects commit DDL
//! implicitly. A migration is recorded only after every one of its
//! statements succeeded, so a failure leaves it pending.

use std::collections::HashSet;

use hysteria_core::{HysteriaError, HysteriaResult};
use hysteria_db::DbExecutor;

use crate::migration::Migration;
use crate::recorder::MigrationRecorder;

/// Runs an ordered set of migrations against one database.
///
/// # Examples
///
/// ```ignore
/// let mut runner = MigrationRunner::new(ds.executor());
/// runner.add(SqlMigration::new("0001_users").up_sql("CREATE TABLE users (id INTEGER)").down_sql("DROP TABLE users"));
/// let applied = runner.run_pending().await?;
/// ```
pub struct MigrationRunner<'a> {
    db: &'a dyn DbExecutor,
    migrations: Vec<Box<dyn Migration>>,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(db: &'a dyn DbExecutor) -> Self {
        Self {
            db,
            migrations: Vec::new(),
        }
    }

    /// Registers a migration. Migrations run in registration order.
    pub fn add(&mut self, migration: impl Migration + 'static) -> &mut Self {
        self.migrations.push(Box::new(migration));
        self
    }

    #[must_use]
    pub fn with_migration(mut self, migration: impl Migration + 'static) -> Self {
        self.add(migration);
        self
    }

    /// Names of the registered migrations, in run order.
    pub fn registered(&self) -> Vec<&str> {
        self.migrations.iter().map(|m| m.name()).collect()
    }

    fn recorder(&self) -> MigrationRecorder<'a> {
        MigrationRecorder::new(self.db)
    }

    /// Creates the bookkeeping table if it does not exist yet.
    pub async fn ensure_table(&self) -> HysteriaResult<()> {
        self.recorder().ensure_schema().await
    }

    /// Names of the applied migrations, oldest first.
    pub async fn applied(&self) -> HysteriaResult<Vec<String>> {
        self.ensure_table().await?;
        self.recorder().applied().await
    }

    /// Registered migrations that have not been applied.
    pub async fn pending(&self) -> HysteriaResult<Vec<&dyn Migration>> {
        self.check_unique_names()?;
        let applied: HashSet<String> = self.applied().await?.into_iter().collect();
        Ok(self
            .migrations
            .iter()
            .filter(|m| !applied.contains(m.name()))
            .map(|m| &**m)
            .collect())
    }

    /// Applies every pending migration in order and returns their names.
    ///
    /// Stops at the first failing statement; migrations applied before it
    /// stay recorded.
    pub async fn run_pending(&self) -> HysteriaResult<Vec<String>> {
        let pending = self.pending().await?;
        let dialect = self.db.dialect();
        let recorder = self.recorder();
        let mut done = Vec::with_capacity(pending.len());

        for migration in pending {
            for statement in migration.up(dialect) {
                self.db.execute_sql(&statement, &[]).await?;
            }
            recorder.record(migration.name()).await?;
            tracing::info!(migration = migration.name(), "Applied migration");
            done.push(migration.name().to_string());
        }

        if done.is_empty() {
            tracing::debug!("No pending migrations");
        }
        Ok(done)
    }

    /// Reverts the most recently applied migration and returns its name,
    /// or `None` when nothing is applied.
    pub async fn rollback_last(&self) -> HysteriaResult<Option<String>> {
        let Some(last) = self.applied().await?.pop() else {
            return Ok(None);
        };
        let migration = self
            .migrations
            .iter()
            .find(|m| m.name() == last)
            .ok_or_else(|| {
                HysteriaError::Configuration(format!(
                    "Applied migration `{last}` is not registered with the runner"
                ))
            })?;

        for statement in migration.down(self.db.dialect()) {
            self.db.execute_sql(&statement, &[]).await?;
        }
        self.recorder().unrecord(&last).await?;
        tracing::info!(migration = %last, "Reverted migration");
        Ok(Some(last))
    }

    fn check_unique_names(&self) -> HysteriaResult<()> {
        let mut seen = HashSet::new();
        for migration in &self.migrations {
            if !seen.insert(migration.name()) {
                return Err(HysteriaError::Configuration(format!(
                    "Duplicate migration name `{}`",
                    migration.name()
                )));
            }
        }
        Ok(())
    }
}
