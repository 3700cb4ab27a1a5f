use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of schema property a [`Metadata`] record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    Table,
    Column,
    Index,
    PrimaryKey,
}

impl PropertyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "Table",
            Self::Column => "Column",
            Self::Index => "Index",
            Self::PrimaryKey => "PrimaryKey",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Table" => Ok(Self::Table),
            "Column" => Ok(Self::Column),
            "Index" => Ok(Self::Index),
            "PrimaryKey" => Ok(Self::PrimaryKey),
            other => Err(format!("unknown property kind `{other}`")),
        }
    }
}

impl TryFrom<String> for PropertyKind {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Durable identity record for one schema property.
///
/// The `property_id` is assigned once, the first time an entity is observed,
/// and is never rewritten afterwards. All differencing is keyed on it; the
/// `name` is just the property's current label and may change freely across
/// a rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub property_id: String,
    /// PropertyID of the owning table; empty for tables themselves.
    pub parent_id: String,
    pub kind: PropertyKind,
    pub name: String,
    /// True once the last successful migration step confirmed the entity in
    /// the live database.
    pub exists: bool,
    pub db_id: i64,
}

impl Metadata {
    pub fn new(kind: PropertyKind, name: impl Into<String>) -> Self {
        Self {
            property_id: String::new(),
            parent_id: String::new(),
            kind,
            name: name.into(),
            exists: false,
            db_id: 0,
        }
    }

    /// A metadata record with a freshly generated PropertyID. Any
    /// collision-resistant scheme satisfies the uniqueness invariant; a
    /// random v4 uuid is used here.
    pub fn generate(kind: PropertyKind, name: impl Into<String>) -> Self {
        Self {
            property_id: Uuid::new_v4().to_string(),
            ..Self::new(kind, name)
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = parent_id.into();
        self
    }

    pub fn with_property_id(mut self, property_id: impl Into<String>) -> Self {
        self.property_id = property_id.into();
        self
    }
}
