use chrono::{DateTime, Utc};
use drift_schema::Metadata;
use tracing::info;

use crate::database::TargetDb;
use crate::engine::Engine;
use crate::error::{Result, StoreError};
use crate::metadata::MetadataRow;
use crate::migration::{Migration, Status, Step};

/// Facade over a management-database [`Engine`], adding the validation the
/// raw backends do not enforce: version uniqueness and latest-only ordering.
#[derive(Clone)]
pub struct Store {
    engine: Box<dyn Engine>,
}

impl Store {
    pub fn new<E: Engine + 'static>(engine: E) -> Self {
        Self {
            engine: Box::new(engine),
        }
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub async fn register_database(
        &self,
        project: &str,
        name: &str,
        environment: &str,
    ) -> Result<TargetDb> {
        self.engine.database_register(project, name, environment).await
    }

    pub async fn database(&self, db_id: i64) -> Result<TargetDb> {
        self.engine
            .database_load(db_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("target database {db_id}")))
    }

    pub async fn database_by_project(
        &self,
        project: &str,
        name: &str,
        environment: &str,
    ) -> Result<Option<TargetDb>> {
        self.engine.database_by_project(project, name, environment).await
    }

    /// Register a new migration after checking ordering constraints:
    /// the version must be unused, and unless `rollback` is set the version
    /// timestamp must be newer than anything already known.
    pub async fn create_migration(
        &self,
        db_id: i64,
        project: &str,
        version: &str,
        version_ts: DateTime<Utc>,
        description: &str,
        steps: Vec<Step>,
        rollback: bool,
    ) -> Result<Migration> {
        if self.engine.version_exists(db_id, version).await? {
            return Err(StoreError::VersionExists(version.to_owned()));
        }

        if !rollback && !self.is_latest(db_id, version_ts).await? {
            return Err(StoreError::NotLatest(version.to_owned()));
        }

        let mut migration = Migration::new(db_id, project, version, version_ts, description);
        migration.steps = steps;

        let migration = self.engine.migration_insert(migration).await?;

        info!(
            mid = migration.mid,
            version = %migration.version,
            steps = migration.steps.len(),
            "registered migration"
        );

        Ok(migration)
    }

    pub async fn load(&self, mid: i64) -> Result<Migration> {
        self.engine
            .migration_load(mid)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("migration {mid}")))
    }

    pub async fn latest(&self, db_id: i64) -> Result<Option<Migration>> {
        self.engine.migration_latest(db_id).await
    }

    pub async fn list(&self, db_id: i64, offset: i64, limit: i64) -> Result<Vec<Migration>> {
        self.engine.migration_list(db_id, offset, limit).await
    }

    pub async fn has_migrations(&self, db_id: i64) -> Result<bool> {
        self.engine.has_migrations(db_id).await
    }

    pub async fn version_exists(&self, db_id: i64, version: &str) -> Result<bool> {
        self.engine.version_exists(db_id, version).await
    }

    /// Whether `version_ts` is newer than every known migration; trivially
    /// true on an empty store.
    pub async fn is_latest(&self, db_id: i64, version_ts: DateTime<Utc>) -> Result<bool> {
        match self.engine.migration_latest(db_id).await? {
            Some(latest) => Ok(latest.version_ts < version_ts),
            None => Ok(true),
        }
    }

    pub async fn in_progress_id(&self, db_id: i64) -> Result<i64> {
        self.engine.in_progress_id(db_id).await
    }

    pub async fn approve(&self, mid: i64) -> Result<()> {
        self.set_status(mid, Status::Approved).await
    }

    pub async fn depreciate(&self, mid: i64) -> Result<()> {
        self.set_status(mid, Status::Depreciated).await
    }

    pub async fn set_status(&self, mid: i64, status: Status) -> Result<()> {
        self.engine.migration_set_status(mid, status).await
    }

    /// Atomic Approved → InProgress transition; the single-writer gate.
    pub async fn claim(&self, mid: i64) -> Result<bool> {
        self.engine.claim(mid).await
    }

    pub async fn update_step(&self, step: &Step) -> Result<()> {
        self.engine.step_update(step).await
    }

    pub async fn metadata(&self, mdid: i64) -> Result<Option<MetadataRow>> {
        self.engine.metadata_load(mdid).await
    }

    pub async fn metadata_by_property(
        &self,
        db_id: i64,
        property_id: &str,
    ) -> Result<Option<MetadataRow>> {
        self.engine.metadata_by_property(db_id, property_id).await
    }

    pub async fn metadata_by_name(
        &self,
        db_id: i64,
        name: &str,
        parent_id: &str,
    ) -> Result<Option<MetadataRow>> {
        self.engine.metadata_by_name(db_id, name, parent_id).await
    }

    pub async fn metadata_children(&self, db_id: i64, parent_id: &str) -> Result<Vec<MetadataRow>> {
        self.engine.metadata_children(db_id, parent_id).await
    }

    pub async fn insert_metadata(&self, row: MetadataRow) -> Result<MetadataRow> {
        self.engine.metadata_insert(row).await
    }

    pub async fn update_metadata(&self, row: &MetadataRow) -> Result<()> {
        self.engine.metadata_update(row).await
    }

    pub async fn delete_metadata(&self, mdid: i64) -> Result<()> {
        self.engine.metadata_delete(mdid).await
    }

    pub async fn table_registered(&self, db_id: i64, name: &str) -> Result<bool> {
        self.engine.table_registered(db_id, name).await
    }

    /// Look up the persisted identity for a property, inserting a fresh row
    /// on first sight. Returns the row as stored.
    pub async fn ensure_metadata(&self, meta: &Metadata, db_id: i64) -> Result<MetadataRow> {
        if let Some(row) = self
            .engine
            .metadata_by_property(db_id, &meta.property_id)
            .await?
        {
            return Ok(row);
        }

        self.engine
            .metadata_insert(MetadataRow::from_meta(meta, db_id))
            .await
    }
}
