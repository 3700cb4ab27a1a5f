use async_trait::async_trait;
use sqlx::MySqlPool;

use crate::database::TargetDb;
use crate::engine::Engine;
use crate::error::Result;
use crate::metadata::MetadataRow;
use crate::migration::{Migration, Status, Step};
use crate::store::Store;

/// Management-database engine backed by a MySQL pool.
///
/// The management schema is separate from any target database; nothing here
/// ever touches target tables.
#[derive(Debug, Clone)]
pub struct MySql {
    pool: MySqlPool,
}

const SETUP: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS target_database (
        dbid BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        project VARCHAR(255) NOT NULL,
        name VARCHAR(255) NOT NULL,
        env VARCHAR(64) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS metadata (
        mdid BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        db BIGINT NOT NULL,
        property_id VARCHAR(255) NOT NULL,
        parent_id VARCHAR(255) NOT NULL,
        `type` VARCHAR(32) NOT NULL,
        name VARCHAR(255) NOT NULL,
        `exists` TINYINT(1) NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS migration (
        mid BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        db BIGINT NOT NULL,
        project VARCHAR(255) NOT NULL,
        version VARCHAR(255) NOT NULL,
        version_timestamp DATETIME NOT NULL,
        version_description TEXT NOT NULL,
        status INT NOT NULL,
        timestamp DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS migration_steps (
        sid BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        mid BIGINT NOT NULL,
        op INT NOT NULL,
        mdid BIGINT NOT NULL,
        name VARCHAR(255) NOT NULL,
        forward TEXT NOT NULL,
        backward TEXT NOT NULL,
        output VARCHAR(1024) NOT NULL DEFAULT '',
        status INT NOT NULL
    )",
];

impl MySql {
    pub fn create(pool: &MySqlPool) -> Store {
        Store::new(Self { pool: pool.clone() })
    }

    /// Create the management tables if absent.
    pub async fn setup(pool: &MySqlPool) -> Result<()> {
        for ddl in SETUP {
            sqlx::query(ddl).execute(pool).await?;
        }

        Ok(())
    }

    async fn load_steps(&self, mid: i64) -> Result<Vec<Step>> {
        Ok(sqlx::query_as::<_, Step>(
            "SELECT * FROM migration_steps WHERE mid = ? ORDER BY sid ASC",
        )
        .bind(mid)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn with_steps(&self, migration: Option<Migration>) -> Result<Option<Migration>> {
        match migration {
            Some(mut migration) => {
                migration.steps = self.load_steps(migration.mid).await?;
                Ok(Some(migration))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Engine for MySql {
    async fn database_register(
        &self,
        project: &str,
        name: &str,
        environment: &str,
    ) -> Result<TargetDb> {
        if let Some(db) = self.database_by_project(project, name, environment).await? {
            return Ok(db);
        }

        let done = sqlx::query("INSERT INTO target_database (project, name, env) VALUES (?, ?, ?)")
            .bind(project)
            .bind(name)
            .bind(environment)
            .execute(&self.pool)
            .await?;

        Ok(TargetDb {
            db_id: done.last_insert_id() as i64,
            project: project.to_owned(),
            name: name.to_owned(),
            environment: environment.to_owned(),
        })
    }

    async fn database_load(&self, db_id: i64) -> Result<Option<TargetDb>> {
        Ok(
            sqlx::query_as::<_, TargetDb>("SELECT * FROM target_database WHERE dbid = ?")
                .bind(db_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn database_by_project(
        &self,
        project: &str,
        name: &str,
        environment: &str,
    ) -> Result<Option<TargetDb>> {
        Ok(sqlx::query_as::<_, TargetDb>(
            "SELECT * FROM target_database WHERE project = ? AND name = ? AND env = ?",
        )
        .bind(project)
        .bind(name)
        .bind(environment)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn metadata_load(&self, mdid: i64) -> Result<Option<MetadataRow>> {
        Ok(
            sqlx::query_as::<_, MetadataRow>("SELECT * FROM metadata WHERE mdid = ?")
                .bind(mdid)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn metadata_by_property(
        &self,
        db_id: i64,
        property_id: &str,
    ) -> Result<Option<MetadataRow>> {
        Ok(sqlx::query_as::<_, MetadataRow>(
            "SELECT * FROM metadata WHERE db = ? AND property_id = ?",
        )
        .bind(db_id)
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn metadata_by_name(
        &self,
        db_id: i64,
        name: &str,
        parent_id: &str,
    ) -> Result<Option<MetadataRow>> {
        Ok(sqlx::query_as::<_, MetadataRow>(
            "SELECT * FROM metadata WHERE db = ? AND name = ? AND parent_id = ?",
        )
        .bind(db_id)
        .bind(name)
        .bind(parent_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn metadata_children(&self, db_id: i64, parent_id: &str) -> Result<Vec<MetadataRow>> {
        Ok(sqlx::query_as::<_, MetadataRow>(
            "SELECT * FROM metadata WHERE db = ? AND parent_id = ?",
        )
        .bind(db_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn metadata_insert(&self, mut row: MetadataRow) -> Result<MetadataRow> {
        let done = sqlx::query(
            "INSERT INTO metadata (db, property_id, parent_id, `type`, name, `exists`)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(row.db_id)
        .bind(&row.property_id)
        .bind(&row.parent_id)
        .bind(row.kind.as_str())
        .bind(&row.name)
        .bind(row.exists)
        .execute(&self.pool)
        .await?;

        row.mdid = done.last_insert_id() as i64;

        Ok(row)
    }

    async fn metadata_update(&self, row: &MetadataRow) -> Result<()> {
        sqlx::query(
            "UPDATE metadata SET property_id = ?, parent_id = ?, `type` = ?, name = ?, `exists` = ?
             WHERE mdid = ?",
        )
        .bind(&row.property_id)
        .bind(&row.parent_id)
        .bind(row.kind.as_str())
        .bind(&row.name)
        .bind(row.exists)
        .bind(row.mdid)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn metadata_delete(&self, mdid: i64) -> Result<()> {
        sqlx::query("DELETE FROM metadata WHERE mdid = ?")
            .bind(mdid)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn table_registered(&self, db_id: i64, name: &str) -> Result<bool> {
        Ok(self.metadata_by_name(db_id, name, "").await?.is_some())
    }

    async fn migration_insert(&self, mut migration: Migration) -> Result<Migration> {
        let mut tx = self.pool.begin().await?;

        let done = sqlx::query(
            "INSERT INTO migration (db, project, version, version_timestamp, version_description, status)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(migration.db_id)
        .bind(&migration.project)
        .bind(&migration.version)
        .bind(migration.version_ts)
        .bind(&migration.description)
        .bind(migration.status)
        .execute(&mut *tx)
        .await?;

        migration.mid = done.last_insert_id() as i64;

        for step in migration.steps.iter_mut() {
            step.mid = migration.mid;

            let done = sqlx::query(
                "INSERT INTO migration_steps (mid, op, mdid, name, forward, backward, output, status)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(step.mid)
            .bind(step.op)
            .bind(step.mdid)
            .bind(&step.name)
            .bind(&step.forward)
            .bind(&step.backward)
            .bind(&step.output)
            .bind(step.status)
            .execute(&mut *tx)
            .await?;

            step.sid = done.last_insert_id() as i64;
        }

        tx.commit().await?;

        Ok(migration)
    }

    async fn migration_load(&self, mid: i64) -> Result<Option<Migration>> {
        let migration = sqlx::query_as::<_, Migration>("SELECT * FROM migration WHERE mid = ?")
            .bind(mid)
            .fetch_optional(&self.pool)
            .await?;

        self.with_steps(migration).await
    }

    async fn migration_latest(&self, db_id: i64) -> Result<Option<Migration>> {
        let migration = sqlx::query_as::<_, Migration>(
            "SELECT * FROM migration WHERE db = ? ORDER BY version_timestamp DESC LIMIT 1",
        )
        .bind(db_id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_steps(migration).await
    }

    async fn migration_list(&self, db_id: i64, offset: i64, limit: i64) -> Result<Vec<Migration>> {
        let mut migrations = sqlx::query_as::<_, Migration>(
            "SELECT * FROM migration WHERE db = ? ORDER BY mid DESC LIMIT ? OFFSET ?",
        )
        .bind(db_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        for migration in migrations.iter_mut() {
            migration.steps = self.load_steps(migration.mid).await?;
        }

        Ok(migrations)
    }

    async fn has_migrations(&self, db_id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM migration WHERE db = ?")
            .bind(db_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    async fn version_exists(&self, db_id: i64, version: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM migration WHERE db = ? AND version = ?")
                .bind(db_id)
                .bind(version)
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    async fn in_progress_id(&self, db_id: i64) -> Result<i64> {
        let mid: Option<i64> =
            sqlx::query_scalar("SELECT mid FROM migration WHERE db = ? AND status = ? LIMIT 1")
                .bind(db_id)
                .bind(Status::InProgress)
                .fetch_optional(&self.pool)
                .await?;

        Ok(mid.unwrap_or(0))
    }

    async fn migration_set_status(&self, mid: i64, status: Status) -> Result<()> {
        sqlx::query("UPDATE migration SET status = ? WHERE mid = ?")
            .bind(status)
            .bind(mid)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn claim(&self, mid: i64) -> Result<bool> {
        let done = sqlx::query("UPDATE migration SET status = ? WHERE mid = ? AND status = ?")
            .bind(Status::InProgress)
            .bind(mid)
            .bind(Status::Approved)
            .execute(&self.pool)
            .await?;

        Ok(done.rows_affected() == 1)
    }

    async fn step_update(&self, step: &Step) -> Result<()> {
        sqlx::query(
            "UPDATE migration_steps SET name = ?, forward = ?, backward = ?, output = ?, status = ?
             WHERE sid = ?",
        )
        .bind(&step.name)
        .bind(&step.forward)
        .bind(&step.backward)
        .bind(&step.output)
        .bind(step.status)
        .bind(step.sid)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
