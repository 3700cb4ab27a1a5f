//! The engine context: configuration, management store and target database
//! threaded through every operation, so tests can construct isolated
//! instances instead of sharing process-wide state.

use drift_schema::Table;
use drift_store::{Step, Store};

use crate::ddl::{generate_alters, Operation};
use crate::diff::{diff_tables, Differences};
use crate::error::Result;

/// Forward and backward DDL between a declarative target and the live
/// schema, with the delta that produced them.
#[derive(Debug, Clone)]
pub struct Plan {
    pub differences: Differences,
    pub forward: Vec<Operation>,
    pub backward: Vec<Operation>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }
}

pub fn plan(target: &[Table], live: &[Table]) -> Plan {
    let differences = diff_tables(target, live);
    let forward = generate_alters(&differences);
    let backward = generate_alters(&diff_tables(live, target));

    Plan {
        differences,
        forward,
        backward,
    }
}

/// Persist an identity row for every declarative entity that does not have
/// one yet, so migration steps can reference it before the entity exists in
/// the live database.
pub async fn register_schema_metadata(store: &Store, db_id: i64, tables: &[Table]) -> Result<()> {
    for table in tables {
        store.ensure_metadata(&table.meta, db_id).await?;

        for column in &table.columns {
            store.ensure_metadata(&column.meta, db_id).await?;
        }

        for index in table.indexes() {
            store.ensure_metadata(&index.meta, db_id).await?;
        }
    }

    Ok(())
}

/// Pair forward and backward operations index-wise into steps. A direction
/// with no counterpart at an index leaves that side of the step empty.
pub async fn build_steps(
    store: &Store,
    db_id: i64,
    forward: &[Operation],
    backward: &[Operation],
) -> Result<Vec<Step>> {
    let count = forward.len().max(backward.len());
    let mut steps = Vec::with_capacity(count);

    for i in 0..count {
        let Some(op) = forward.get(i).or_else(|| backward.get(i)) else {
            continue;
        };

        let row = store.ensure_metadata(&op.meta, db_id).await?;
        let mut step = Step::new(op.op, row.mdid, &op.name);

        if let Some(fwd) = forward.get(i) {
            step.forward = fwd.statement.clone();
        }

        if let Some(bwd) = backward.get(i) {
            step.backward = bwd.statement.clone();
        }

        steps.push(step);
    }

    Ok(steps)
}

#[cfg(feature = "mysql")]
mod context {
    use chrono::{DateTime, Utc};
    use drift_schema::{load_schema, validate, Table};
    use drift_store::{Migration, MySql, Status, Store, TargetDb};
    use sqlx::MySqlPool;
    use tracing::info;

    use crate::config::Config;
    use crate::error::Result;
    use crate::exec::{ExecOptions, ExecReport, Executor, MySqlRunner};
    use crate::live::{attach_metadata, read_all_tables};

    use super::{build_steps, plan, register_schema_metadata, Plan};

    /// Which schema side a validation run covers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SchemaSide {
        Yaml,
        MySql,
        Both,
    }

    /// One fully connected engine: management store, registered target
    /// database record, and a pool on the target itself.
    pub struct Drift {
        config: Config,
        store: Store,
        db: TargetDb,
        target: MySqlPool,
    }

    impl Drift {
        pub async fn connect(config: Config) -> Result<Self> {
            let mgmt = MySqlPool::connect(&config.management.dsn()).await?;
            MySql::setup(&mgmt).await?;
            let store = MySql::create(&mgmt);

            let db = match store
                .database_by_project(
                    &config.project,
                    &config.target.database,
                    &config.target.environment,
                )
                .await?
            {
                Some(db) => db,
                None => {
                    store
                        .register_database(
                            &config.project,
                            &config.target.database,
                            &config.target.environment,
                        )
                        .await?
                }
            };

            let target = MySqlPool::connect(&config.target.dsn()).await?;

            Ok(Self {
                config,
                store,
                db,
                target,
            })
        }

        pub fn store(&self) -> &Store {
            &self.store
        }

        pub fn db_id(&self) -> i64 {
            self.db.db_id
        }

        /// Load and validate the declarative side.
        pub fn declarative(&self) -> Result<Vec<Table>> {
            let tables = load_schema(&self.config.schema_path())?;
            validate(&tables, "declarative")?;

            Ok(tables)
        }

        /// Read, validate and identity-attach the live side.
        pub async fn live(&self) -> Result<Vec<Table>> {
            let mut tables = read_all_tables(&self.target).await?;
            attach_metadata(&self.store, self.db.db_id, &mut tables).await?;
            validate(&tables, "live")?;

            Ok(tables)
        }

        pub async fn validate(&self, side: SchemaSide) -> Result<()> {
            if matches!(side, SchemaSide::Yaml | SchemaSide::Both) {
                self.declarative()?;
            }

            if matches!(side, SchemaSide::MySql | SchemaSide::Both) {
                self.live().await?;
            }

            Ok(())
        }

        pub async fn diff(&self) -> Result<Plan> {
            let target = self.declarative()?;
            let live = self.live().await?;

            Ok(plan(&target, &live))
        }

        /// Full pipeline: read both sides, diff, generate both DDL batches
        /// and register the migration Unapproved.
        pub async fn create(
            &self,
            version: &str,
            version_ts: DateTime<Utc>,
            description: &str,
            rollback: bool,
        ) -> Result<Migration> {
            let target = self.declarative()?;
            let live = self.live().await?;

            register_schema_metadata(&self.store, self.db.db_id, &target).await?;

            let plan = plan(&target, &live);
            let steps = build_steps(&self.store, self.db.db_id, &plan.forward, &plan.backward).await?;

            self.store
                .create_migration(
                    self.db.db_id,
                    &self.config.project,
                    version,
                    version_ts,
                    description,
                    steps,
                    rollback,
                )
                .await
                .map_err(Into::into)
        }

        pub async fn exec(&self, options: ExecOptions) -> Result<ExecReport> {
            let runner =
                MySqlRunner::new(self.target.clone(), self.config.target.database.clone());

            Executor::new(self.store.clone(), runner).exec(options).await
        }

        /// Drop and recreate the target database, then replay every
        /// Approved/Complete/Forced migration in MID order with the
        /// latest-only and concurrency gates bypassed.
        pub async fn sandbox(&self) -> Result<Vec<ExecReport>> {
            let database = &self.config.target.database;
            let server = MySqlPool::connect(&self.config.target.server_dsn()).await?;

            sqlx::query(&format!("DROP DATABASE IF EXISTS `{database}`"))
                .execute(&server)
                .await?;
            sqlx::query(&format!("CREATE DATABASE `{database}`"))
                .execute(&server)
                .await?;

            info!(%database, "recreated target database for sandbox replay");

            let target = MySqlPool::connect(&self.config.target.dsn()).await?;
            let runner = MySqlRunner::new(target, database.clone());
            let executor = Executor::new(self.store.clone(), runner);

            let mut migrations = self.store.list(self.db.db_id, 0, i64::MAX).await?;
            migrations.sort_by_key(|m| m.mid);

            let mut reports = Vec::new();

            for migration in migrations {
                if !matches!(
                    migration.status,
                    Status::Approved | Status::Complete | Status::Forced
                ) {
                    continue;
                }

                let mid = migration.mid;
                let report = executor
                    .exec(ExecOptions {
                        mid,
                        migration_override: Some(migration),
                        force: true,
                        pto_disabled: true,
                        allow_destructive: true,
                        sandbox: true,
                        ..Default::default()
                    })
                    .await?;

                reports.push(report);
            }

            Ok(reports)
        }
    }
}

#[cfg(feature = "mysql")]
pub use context::*;
