use async_trait::async_trait;
use dyn_clone::DynClone;

use crate::database::TargetDb;
use crate::error::Result;
use crate::metadata::MetadataRow;
use crate::migration::{Migration, Status, Step};

#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "mysql")]
mod mysql;

#[cfg(feature = "memory")]
pub use memory::*;
#[cfg(feature = "mysql")]
pub use mysql::*;

/// Storage backend for the management database.
///
/// Every operation is scoped by the target database's `db_id`; a
/// `parent_id` of `""` selects tables.
#[async_trait]
pub trait Engine: DynClone + Send + Sync {
    async fn database_register(
        &self,
        project: &str,
        name: &str,
        environment: &str,
    ) -> Result<TargetDb>;

    async fn database_load(&self, db_id: i64) -> Result<Option<TargetDb>>;

    async fn database_by_project(
        &self,
        project: &str,
        name: &str,
        environment: &str,
    ) -> Result<Option<TargetDb>>;

    async fn metadata_load(&self, mdid: i64) -> Result<Option<MetadataRow>>;

    async fn metadata_by_property(
        &self,
        db_id: i64,
        property_id: &str,
    ) -> Result<Option<MetadataRow>>;

    async fn metadata_by_name(
        &self,
        db_id: i64,
        name: &str,
        parent_id: &str,
    ) -> Result<Option<MetadataRow>>;

    async fn metadata_children(&self, db_id: i64, parent_id: &str) -> Result<Vec<MetadataRow>>;

    async fn metadata_insert(&self, row: MetadataRow) -> Result<MetadataRow>;

    async fn metadata_update(&self, row: &MetadataRow) -> Result<()>;

    async fn metadata_delete(&self, mdid: i64) -> Result<()>;

    async fn table_registered(&self, db_id: i64, name: &str) -> Result<bool>;

    async fn migration_insert(&self, migration: Migration) -> Result<Migration>;

    async fn migration_load(&self, mid: i64) -> Result<Option<Migration>>;

    /// The migration with the newest version timestamp, steps included.
    async fn migration_latest(&self, db_id: i64) -> Result<Option<Migration>>;

    async fn migration_list(&self, db_id: i64, offset: i64, limit: i64) -> Result<Vec<Migration>>;

    async fn has_migrations(&self, db_id: i64) -> Result<bool>;

    async fn version_exists(&self, db_id: i64, version: &str) -> Result<bool>;

    /// MID of the single in-flight migration, or 0 when none is running.
    async fn in_progress_id(&self, db_id: i64) -> Result<i64>;

    async fn migration_set_status(&self, mid: i64, status: Status) -> Result<()>;

    /// Atomically move an Approved migration to InProgress. Returns false
    /// when the migration was not in the Approved state, in which case
    /// nothing changed.
    async fn claim(&self, mid: i64) -> Result<bool>;

    async fn step_update(&self, step: &Step) -> Result<()>;
}

dyn_clone::clone_trait_object!(Engine);
