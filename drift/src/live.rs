//! Live-side schema reading: pull CREATE TABLE text out of the target
//! database, parse it, and reconcile the fresh parse with persisted
//! identities.

use drift_schema::{Metadata, Table};
use drift_store::{MetadataRow, Store};
use tracing::debug;

use crate::error::Result;

/// Replace the parser's freshly generated PropertyIDs with the persisted
/// ones, looked up by (name, parent). An entity seen for the first time keeps
/// its fresh ID and gets a metadata row inserted, so the next read returns
/// the same identity.
pub async fn attach_metadata(store: &Store, db_id: i64, tables: &mut [Table]) -> Result<()> {
    for table in tables {
        adopt(store, db_id, &mut table.meta, "").await?;

        let parent = table.meta.property_id.clone();

        for column in &mut table.columns {
            adopt(store, db_id, &mut column.meta, &parent).await?;
        }

        if let Some(primary) = &mut table.primary {
            adopt(store, db_id, &mut primary.meta, &parent).await?;
        }

        for index in &mut table.secondary {
            adopt(store, db_id, &mut index.meta, &parent).await?;
        }
    }

    Ok(())
}

async fn adopt(store: &Store, db_id: i64, meta: &mut Metadata, parent_id: &str) -> Result<()> {
    meta.parent_id = parent_id.to_owned();
    meta.exists = true;
    meta.db_id = db_id;

    match store.metadata_by_name(db_id, &meta.name, parent_id).await? {
        Some(row) => {
            meta.property_id = row.property_id;
        }
        None => {
            debug!(name = %meta.name, kind = %meta.kind, "first sight, persisting identity");
            store
                .insert_metadata(MetadataRow::from_meta(meta, db_id))
                .await?;
        }
    }

    Ok(())
}

#[cfg(feature = "mysql")]
mod reader {
    use drift_schema::{parse_create_table, Table};
    use sqlx::{MySqlPool, Row};

    use crate::error::Result;

    /// `SHOW TABLES` then `SHOW CREATE TABLE` per table, parsed into the
    /// schema model. Identities are still the parser's fresh ones; run
    /// [`super::attach_metadata`] afterwards.
    pub async fn read_all_tables(pool: &MySqlPool) -> Result<Vec<Table>> {
        let rows = sqlx::query("SHOW TABLES").fetch_all(pool).await?;
        let mut tables = Vec::with_capacity(rows.len());

        for row in rows {
            let name: String = row.try_get(0)?;
            let create = sqlx::query(&format!("SHOW CREATE TABLE `{name}`"))
                .fetch_one(pool)
                .await?;
            let ddl: String = create.try_get(1)?;

            tables.push(parse_create_table(&ddl)?);
        }

        Ok(tables)
    }
}

#[cfg(feature = "mysql")]
pub use reader::*;

#[cfg(test)]
mod tests {
    use super::*;
    use drift_schema::parse_create_table;
    use drift_store::Memory;

    const DDL: &str = "CREATE TABLE test (id int(11) NOT NULL, name varchar(64) NOT NULL, \
                       PRIMARY KEY (id), KEY idx_id_name (id,name)) \
                       ENGINE=InnoDB DEFAULT CHARSET=latin1";

    #[tokio::test]
    async fn repeated_reads_keep_the_same_identity() {
        let store = Memory::create();
        let db = store.register_database("shop", "shop_prod", "test").await.unwrap();

        let mut first = vec![parse_create_table(DDL).unwrap()];
        attach_metadata(&store, db.db_id, &mut first).await.unwrap();

        let mut second = vec![parse_create_table(DDL).unwrap()];
        attach_metadata(&store, db.db_id, &mut second).await.unwrap();

        assert_eq!(first[0].meta.property_id, second[0].meta.property_id);
        assert_eq!(
            first[0].columns[0].meta.property_id,
            second[0].columns[0].meta.property_id
        );
        assert_eq!(
            first[0].secondary[0].meta.property_id,
            second[0].secondary[0].meta.property_id
        );
    }

    #[tokio::test]
    async fn children_are_linked_to_the_table_identity() {
        let store = Memory::create();
        let db = store.register_database("shop", "shop_prod", "test").await.unwrap();

        let mut tables = vec![parse_create_table(DDL).unwrap()];
        attach_metadata(&store, db.db_id, &mut tables).await.unwrap();

        let table_id = tables[0].meta.property_id.clone();
        assert!(tables[0]
            .columns
            .iter()
            .all(|c| c.meta.parent_id == table_id));

        let children = store.metadata_children(db.db_id, &table_id).await.unwrap();
        // two columns, one primary, one secondary
        assert_eq!(children.len(), 4);
        assert!(children.iter().all(|c| c.exists));
        assert!(store.table_registered(db.db_id, "test").await.unwrap());
    }
}
