//! Gated migration executor.
//!
//! At most one migration may be in flight per management database; the claim
//! is an atomic Approved → InProgress transition in the store. Steps run in
//! stored order and the first failure halts the migration. Each step's
//! metadata mutation is committed as soon as its DDL succeeds, so a halted
//! migration leaves the identities of its completed steps in sync with the
//! target database.

use async_trait::async_trait;
use drift_schema::PropertyKind;
use drift_store::{Migration, Status, Step, StepOp, Store};
use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::pto::split_alter;

/// Upper bound of the persisted step output column.
const OUTPUT_LIMIT: usize = 1024;

/// How a single DDL statement reaches the target database. The direct path
/// runs the statement as-is; the online path hands the ALTER body to the
/// external schema-change tool.
#[async_trait]
pub trait DdlRunner: Send + Sync {
    async fn direct(&self, statement: &str) -> Result<String>;

    async fn online(&self, table: &str, alter: &str) -> Result<String>;

    /// Dryrun rendition of the online invocation.
    fn describe_online(&self, table: &str, alter: &str) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub mid: i64,
    /// Run this migration instead of loading `mid` from the store; used by
    /// sandbox replay.
    pub migration_override: Option<Migration>,
    pub dryrun: bool,
    pub force: bool,
    pub rollback: bool,
    pub pto_disabled: bool,
    pub allow_destructive: bool,
    pub sandbox: bool,
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub sid: i64,
    pub name: String,
    pub op: StepOp,
    pub status: Status,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct ExecReport {
    pub mid: i64,
    pub status: Status,
    pub steps: Vec<StepReport>,
}

pub struct Executor<R> {
    store: Store,
    runner: R,
}

impl<R: DdlRunner> Executor<R> {
    pub fn new(store: Store, runner: R) -> Self {
        Self { store, runner }
    }

    pub async fn exec(&self, options: ExecOptions) -> Result<ExecReport> {
        let migration = match &options.migration_override {
            Some(migration) => migration.clone(),
            None => self.store.load(options.mid).await?,
        };

        let mid = migration.mid;
        // sandbox replay reconstructs the target database and must not
        // rewrite recorded history
        let persist = !options.dryrun && !options.sandbox;

        if !options.force && migration.status != Status::Approved {
            return Err(EngineError::NotApproved {
                mid,
                status: migration.status,
            });
        }

        if !options.rollback && !options.sandbox {
            if let Some(latest) = self.store.latest(migration.db_id).await? {
                if latest.version_ts > migration.version_ts {
                    if !options.dryrun {
                        self.store.depreciate(mid).await?;
                    }

                    return Err(EngineError::Depreciated(mid));
                }
            }
        }

        if !options.sandbox {
            let in_progress = self.store.in_progress_id(migration.db_id).await?;

            if in_progress != 0 {
                return Err(EngineError::InProgress(in_progress));
            }
        }

        if persist {
            if options.force {
                self.store.set_status(mid, Status::InProgress).await?;
            } else if !self.store.claim(mid).await? {
                return Err(EngineError::State(format!(
                    "migration {mid} was claimed by another run"
                )));
            }
        }

        info!(
            mid,
            version = %migration.version,
            dryrun = options.dryrun,
            rollback = options.rollback,
            "executing migration"
        );

        let mut steps = migration.steps.clone();
        let mut reports = Vec::with_capacity(steps.len());

        for step in &mut steps {
            match self.exec_step(step, &options).await {
                Ok(report) => {
                    if persist && matches!(step.status, Status::Complete | Status::Forced) {
                        self.apply_metadata(step, options.rollback).await?;
                    }

                    reports.push(report);
                }
                Err(err) => {
                    if persist {
                        self.store.set_status(mid, Status::Failed).await?;
                    }

                    return Err(err);
                }
            }
        }

        let all_skipped =
            !steps.is_empty() && steps.iter().all(|s| s.status == Status::Skipped);

        let status = if options.dryrun {
            migration.status
        } else if all_skipped {
            Status::Skipped
        } else if options.force {
            Status::Forced
        } else {
            Status::Complete
        };

        if persist {
            self.store.set_status(mid, status).await?;
        }

        Ok(ExecReport {
            mid,
            status,
            steps: reports,
        })
    }

    async fn exec_step(&self, step: &mut Step, options: &ExecOptions) -> Result<StepReport> {
        let persist = !options.dryrun && !options.sandbox;

        let statement = if options.rollback {
            step.backward.clone()
        } else {
            step.forward.clone()
        };

        // unpaired direction, nothing to run
        if statement.is_empty() {
            step.status = Status::Skipped;

            if persist {
                self.store.update_step(step).await?;
            }

            return Ok(report(step, String::new()));
        }

        let op = effective_op(step.op, options.rollback);

        let kind = match self.store.metadata(step.mdid).await? {
            Some(row) => Some(row.kind),
            // a replayed Del step already erased its identity row; the
            // statement is still valid
            None if options.sandbox => None,
            None => {
                step.status = Status::Failed;
                step.output = format!("metadata record {} not found", step.mdid);

                if persist {
                    self.store.update_step(step).await?;
                }

                return Err(EngineError::Execution {
                    step: statement,
                    output: step.output.clone(),
                });
            }
        };

        if op.is_destructive() && !options.allow_destructive {
            warn!(sid = step.sid, name = %step.name, "skipping destructive step");
            step.status = Status::Skipped;

            if persist {
                self.store.update_step(step).await?;
            }

            return Ok(report(step, String::new()));
        }

        // whole-table create/drop always goes direct; everything else can use
        // the online tool
        let online = match kind {
            Some(kind) => {
                !options.pto_disabled
                    && !(kind == PropertyKind::Table && matches!(op, StepOp::Add | StepOp::Del))
            }
            None => false,
        };

        if options.dryrun {
            let output = if online {
                let (table, alter) = split_alter(&statement)?;
                self.runner.describe_online(&table, &alter)
            } else {
                statement
            };

            return Ok(StepReport {
                sid: step.sid,
                name: step.name.clone(),
                op: step.op,
                status: Status::Complete,
                output,
            });
        }

        step.status = Status::InProgress;

        if persist {
            self.store.update_step(step).await?;
        }

        let result = if online {
            match split_alter(&statement) {
                Ok((table, alter)) => self.runner.online(&table, &alter).await,
                Err(err) => Err(err),
            }
        } else {
            self.runner.direct(&statement).await
        };

        match result {
            Ok(output) => {
                step.output = clip(&output);
                step.status = if options.force {
                    Status::Forced
                } else {
                    Status::Complete
                };

                if persist {
                    self.store.update_step(step).await?;
                }

                Ok(report(step, output))
            }
            Err(err) => {
                step.output = clip(&err.to_string());
                step.status = Status::Failed;

                if persist {
                    self.store.update_step(step).await?;
                }

                Err(EngineError::Execution {
                    step: statement,
                    output: step.output.clone(),
                })
            }
        }
    }

    /// Commit the identity change a completed step implies. Rollback inverts
    /// the op: a rolled-back Add marks the property gone again rather than
    /// deleting its identity, and a rolled-back Del resurrects it.
    async fn apply_metadata(&self, step: &Step, rollback: bool) -> Result<()> {
        let Some(mut row) = self.store.metadata(step.mdid).await? else {
            return Ok(());
        };

        match effective_op(step.op, rollback) {
            StepOp::Add if rollback => {
                row.exists = true;
                self.store.update_metadata(&row).await?;
            }
            StepOp::Add => {
                row.exists = true;

                let children = if row.kind == PropertyKind::Table {
                    self.store
                        .metadata_children(row.db_id, &row.property_id)
                        .await?
                } else {
                    Vec::new()
                };

                self.store.update_metadata(&row).await?;

                for mut child in children {
                    child.exists = true;
                    self.store.update_metadata(&child).await?;
                }
            }
            StepOp::Del if rollback => {
                row.exists = false;
                self.store.update_metadata(&row).await?;
            }
            StepOp::Del => {
                if row.kind == PropertyKind::Table {
                    for child in self
                        .store
                        .metadata_children(row.db_id, &row.property_id)
                        .await?
                    {
                        self.store.delete_metadata(child.mdid).await?;
                    }
                }

                self.store.delete_metadata(row.mdid).await?;
            }
            StepOp::Mod => {
                // the stored name is the post-migration one only forwards
                if !rollback && row.name != step.name {
                    row.name = step.name.clone();
                    self.store.update_metadata(&row).await?;
                }
            }
        }

        Ok(())
    }
}

/// The op a statement actually performs: running the backward batch of an Add
/// step drops the property, and vice versa.
fn effective_op(op: StepOp, rollback: bool) -> StepOp {
    if !rollback {
        return op;
    }

    match op {
        StepOp::Add => StepOp::Del,
        StepOp::Del => StepOp::Add,
        StepOp::Mod => StepOp::Mod,
    }
}

fn report(step: &Step, output: String) -> StepReport {
    StepReport {
        sid: step.sid,
        name: step.name.clone(),
        op: step.op,
        status: step.status,
        output,
    }
}

/// Truncate to the persisted column width in bytes, never splitting a
/// character.
fn clip(text: &str) -> String {
    if text.len() <= OUTPUT_LIMIT {
        return text.to_owned();
    }

    let mut end = OUTPUT_LIMIT;

    while !text.is_char_boundary(end) {
        end -= 1;
    }

    text[..end].to_owned()
}

#[cfg(feature = "mysql")]
mod runner {
    use async_trait::async_trait;
    use sqlx::MySqlPool;

    use crate::error::Result;
    use crate::pto::PtoRunner;

    use super::DdlRunner;

    /// Production runner: direct DDL through a target-database pool, online
    /// alterations through `pt-online-schema-change`.
    #[derive(Clone)]
    pub struct MySqlRunner {
        pool: MySqlPool,
        pto: PtoRunner,
    }

    impl MySqlRunner {
        pub fn new(pool: MySqlPool, database: impl Into<String>) -> Self {
            Self {
                pool,
                pto: PtoRunner::new(database),
            }
        }
    }

    #[async_trait]
    impl DdlRunner for MySqlRunner {
        async fn direct(&self, statement: &str) -> Result<String> {
            let result = sqlx::query(statement).execute(&self.pool).await?;

            Ok(format!("rows affected: {}", result.rows_affected()))
        }

        async fn online(&self, table: &str, alter: &str) -> Result<String> {
            self.pto.run(table, alter).await
        }

        fn describe_online(&self, table: &str, alter: &str) -> String {
            self.pto.command_line(table, alter)
        }
    }
}

#[cfg(feature = "mysql")]
pub use runner::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_inverts_add_and_del() {
        assert_eq!(effective_op(StepOp::Add, true), StepOp::Del);
        assert_eq!(effective_op(StepOp::Del, true), StepOp::Add);
        assert_eq!(effective_op(StepOp::Mod, true), StepOp::Mod);
        assert_eq!(effective_op(StepOp::Add, false), StepOp::Add);
    }

    #[test]
    fn output_is_clipped_to_the_column_width() {
        let long = "x".repeat(3000);
        assert_eq!(clip(&long).len(), 1024);
        assert_eq!(clip("short"), "short");
    }

    #[test]
    fn clip_respects_character_boundaries() {
        // three bytes per character, so the limit falls mid-character
        let long = "\u{2713}".repeat(400);
        let clipped = clip(&long);

        assert!(clipped.len() <= 1024);
        assert_eq!(clipped.len() % 3, 0);
        assert_eq!(clipped, "\u{2713}".repeat(341));
    }
}
