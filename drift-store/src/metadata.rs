use drift_schema::{Metadata, PropertyKind};
use serde::{Deserialize, Serialize};

/// Persisted form of a [`Metadata`] record, the durable identity mapping
/// PropertyID ↔ live entity. The metadata store is the only writer to this
/// table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "mysql", derive(sqlx::FromRow))]
pub struct MetadataRow {
    pub mdid: i64,
    #[cfg_attr(feature = "mysql", sqlx(rename = "db"))]
    pub db_id: i64,
    pub property_id: String,
    pub parent_id: String,
    #[cfg_attr(feature = "mysql", sqlx(rename = "type", try_from = "String"))]
    pub kind: PropertyKind,
    pub name: String,
    pub exists: bool,
}

impl MetadataRow {
    pub fn from_meta(meta: &Metadata, db_id: i64) -> Self {
        Self {
            mdid: 0,
            db_id,
            property_id: meta.property_id.clone(),
            parent_id: meta.parent_id.clone(),
            kind: meta.kind,
            name: meta.name.clone(),
            exists: meta.exists,
        }
    }

    pub fn to_meta(&self) -> Metadata {
        Metadata {
            property_id: self.property_id.clone(),
            parent_id: self.parent_id.clone(),
            kind: self.kind,
            name: self.name.clone(),
            exists: self.exists,
            db_id: self.db_id,
        }
    }
}
