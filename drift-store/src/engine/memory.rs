use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::database::TargetDb;
use crate::engine::Engine;
use crate::error::Result;
use crate::metadata::MetadataRow;
use crate::migration::{Migration, Status, Step};
use crate::store::Store;

/// In-memory engine with the exact semantics of the MySQL backend, used by
/// tests and dry development setups.
#[derive(Debug, Clone, Default)]
pub struct Memory(Arc<RwLock<Inner>>);

impl Memory {
    pub fn create() -> Store {
        Store::new(Self::default())
    }
}

#[derive(Debug, Default)]
struct Inner {
    databases: Vec<TargetDb>,
    metadata: Vec<MetadataRow>,
    migrations: Vec<Migration>,
    next_dbid: i64,
    next_mdid: i64,
    next_mid: i64,
    next_sid: i64,
}

#[async_trait]
impl Engine for Memory {
    async fn database_register(
        &self,
        project: &str,
        name: &str,
        environment: &str,
    ) -> Result<TargetDb> {
        if let Some(db) = self.database_by_project(project, name, environment).await? {
            return Ok(db);
        }

        let mut inner = self.0.write();
        inner.next_dbid += 1;

        let mut db = TargetDb::new(project, name, environment);
        db.db_id = inner.next_dbid;
        inner.databases.push(db.clone());

        Ok(db)
    }

    async fn database_load(&self, db_id: i64) -> Result<Option<TargetDb>> {
        Ok(self
            .0
            .read()
            .databases
            .iter()
            .find(|d| d.db_id == db_id)
            .cloned())
    }

    async fn database_by_project(
        &self,
        project: &str,
        name: &str,
        environment: &str,
    ) -> Result<Option<TargetDb>> {
        Ok(self
            .0
            .read()
            .databases
            .iter()
            .find(|d| d.project == project && d.name == name && d.environment == environment)
            .cloned())
    }

    async fn metadata_load(&self, mdid: i64) -> Result<Option<MetadataRow>> {
        Ok(self
            .0
            .read()
            .metadata
            .iter()
            .find(|m| m.mdid == mdid)
            .cloned())
    }

    async fn metadata_by_property(
        &self,
        db_id: i64,
        property_id: &str,
    ) -> Result<Option<MetadataRow>> {
        Ok(self
            .0
            .read()
            .metadata
            .iter()
            .find(|m| m.db_id == db_id && m.property_id == property_id)
            .cloned())
    }

    async fn metadata_by_name(
        &self,
        db_id: i64,
        name: &str,
        parent_id: &str,
    ) -> Result<Option<MetadataRow>> {
        Ok(self
            .0
            .read()
            .metadata
            .iter()
            .find(|m| m.db_id == db_id && m.name == name && m.parent_id == parent_id)
            .cloned())
    }

    async fn metadata_children(&self, db_id: i64, parent_id: &str) -> Result<Vec<MetadataRow>> {
        Ok(self
            .0
            .read()
            .metadata
            .iter()
            .filter(|m| m.db_id == db_id && m.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn metadata_insert(&self, mut row: MetadataRow) -> Result<MetadataRow> {
        let mut inner = self.0.write();
        inner.next_mdid += 1;
        row.mdid = inner.next_mdid;
        inner.metadata.push(row.clone());

        Ok(row)
    }

    async fn metadata_update(&self, row: &MetadataRow) -> Result<()> {
        let mut inner = self.0.write();

        if let Some(existing) = inner.metadata.iter_mut().find(|m| m.mdid == row.mdid) {
            *existing = row.clone();
        }

        Ok(())
    }

    async fn metadata_delete(&self, mdid: i64) -> Result<()> {
        self.0.write().metadata.retain(|m| m.mdid != mdid);

        Ok(())
    }

    async fn table_registered(&self, db_id: i64, name: &str) -> Result<bool> {
        Ok(self
            .metadata_by_name(db_id, name, "")
            .await?
            .is_some())
    }

    async fn migration_insert(&self, mut migration: Migration) -> Result<Migration> {
        let mut inner = self.0.write();
        inner.next_mid += 1;
        migration.mid = inner.next_mid;

        for step in migration.steps.iter_mut() {
            inner.next_sid += 1;
            step.sid = inner.next_sid;
            step.mid = migration.mid;
        }

        inner.migrations.push(migration.clone());

        Ok(migration)
    }

    async fn migration_load(&self, mid: i64) -> Result<Option<Migration>> {
        Ok(self
            .0
            .read()
            .migrations
            .iter()
            .find(|m| m.mid == mid)
            .cloned())
    }

    async fn migration_latest(&self, db_id: i64) -> Result<Option<Migration>> {
        Ok(self
            .0
            .read()
            .migrations
            .iter()
            .filter(|m| m.db_id == db_id)
            .max_by_key(|m| m.version_ts)
            .cloned())
    }

    async fn migration_list(&self, db_id: i64, offset: i64, limit: i64) -> Result<Vec<Migration>> {
        let inner = self.0.read();
        let mut list: Vec<Migration> = inner
            .migrations
            .iter()
            .filter(|m| m.db_id == db_id)
            .cloned()
            .collect();

        list.sort_by_key(|m| std::cmp::Reverse(m.mid));

        Ok(list
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn has_migrations(&self, db_id: i64) -> Result<bool> {
        Ok(self.0.read().migrations.iter().any(|m| m.db_id == db_id))
    }

    async fn version_exists(&self, db_id: i64, version: &str) -> Result<bool> {
        Ok(self
            .0
            .read()
            .migrations
            .iter()
            .any(|m| m.db_id == db_id && m.version == version))
    }

    async fn in_progress_id(&self, db_id: i64) -> Result<i64> {
        Ok(self
            .0
            .read()
            .migrations
            .iter()
            .find(|m| m.db_id == db_id && m.status == Status::InProgress)
            .map(|m| m.mid)
            .unwrap_or(0))
    }

    async fn migration_set_status(&self, mid: i64, status: Status) -> Result<()> {
        let mut inner = self.0.write();

        if let Some(migration) = inner.migrations.iter_mut().find(|m| m.mid == mid) {
            migration.status = status;
        }

        Ok(())
    }

    async fn claim(&self, mid: i64) -> Result<bool> {
        let mut inner = self.0.write();

        match inner
            .migrations
            .iter_mut()
            .find(|m| m.mid == mid && m.status == Status::Approved)
        {
            Some(migration) => {
                migration.status = Status::InProgress;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn step_update(&self, step: &Step) -> Result<()> {
        let mut inner = self.0.write();

        if let Some(existing) = inner
            .migrations
            .iter_mut()
            .find(|m| m.mid == step.mid)
            .and_then(|m| m.steps.iter_mut().find(|s| s.sid == step.sid))
        {
            *existing = step.clone();
        }

        Ok(())
    }
}
