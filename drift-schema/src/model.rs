use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::metadata::{Metadata, PropertyKind};
use crate::types::ColumnType;

/// Sentinel name shared by every primary index.
pub const PRIMARY_KEY_NAME: &str = "PrimaryKey";

/// One column of an index, with an optional prefix length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<u32>,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
        }
    }

    pub fn with_prefix(name: impl Into<String>, prefix: u32) -> Self {
        Self {
            name: name.into(),
            prefix: Some(prefix),
        }
    }

    fn to_ddl(&self) -> String {
        match self.prefix {
            Some(p) => format!("{}({p})", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub is_primary: bool,
    pub is_unique: bool,
    pub meta: Metadata,
}

impl Index {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();

        Self {
            meta: Metadata::new(PropertyKind::Index, name.clone()),
            name,
            columns: Vec::new(),
            is_primary: false,
            is_unique: false,
        }
    }

    pub fn primary() -> Self {
        Self {
            name: PRIMARY_KEY_NAME.to_owned(),
            columns: Vec::new(),
            is_primary: true,
            is_unique: false,
            meta: Metadata::new(PropertyKind::PrimaryKey, PRIMARY_KEY_NAME),
        }
    }

    pub fn column(mut self, column: IndexColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn column_ddl(&self) -> String {
        self.columns
            .iter()
            .map(IndexColumn::to_ddl)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn to_ddl(&self) -> String {
        if self.is_primary {
            format!("PRIMARY KEY ({})", self.column_ddl())
        } else if self.is_unique {
            format!("UNIQUE KEY {} ({})", self.name, self.column_ddl())
        } else {
            format!("KEY {} ({})", self.name, self.column_ddl())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ctype: ColumnType,
    /// Zero, one or two dimensions depending on the type.
    pub size: Vec<u32>,
    pub nullable: bool,
    pub auto_inc: bool,
    /// Textual default; `NULL` is the literal text `NULL`.
    pub default: Option<String>,
    pub meta: Metadata,
}

impl Column {
    pub fn new(name: impl Into<String>, ctype: ColumnType) -> Self {
        let name = name.into();

        Self {
            meta: Metadata::new(PropertyKind::Column, name.clone()),
            name,
            ctype,
            size: Vec::new(),
            nullable: true,
            auto_inc: false,
            default: None,
        }
    }

    pub fn size(mut self, size: Vec<u32>) -> Self {
        self.size = size;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn auto_inc(mut self) -> Self {
        self.auto_inc = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// The `type(size)` fragment, without the column name.
    pub fn type_ddl(&self) -> String {
        if self.size.is_empty() {
            self.ctype.to_string()
        } else {
            let dims = self
                .size
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");

            format!("{}({})", self.ctype, dims)
        }
    }

    pub fn to_ddl(&self) -> String {
        let mut ddl = format!("{} {}", self.name, self.type_ddl());

        if !self.nullable {
            ddl.push_str(" NOT NULL");
        }

        if let Some(default) = &self.default {
            let _ = write!(ddl, " DEFAULT {default}");
        }

        if self.auto_inc {
            ddl.push_str(" AUTO_INCREMENT");
        }

        ddl
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub engine: String,
    pub charset: String,
    pub auto_inc: Option<u64>,
    pub columns: Vec<Column>,
    pub primary: Option<Index>,
    pub secondary: Vec<Index>,
    /// Directory-derived prefix currently applied to `name`; empty when the
    /// table sits at the schema root.
    pub namespace: String,
    pub meta: Metadata,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();

        Self {
            meta: Metadata::new(PropertyKind::Table, name.clone()),
            name,
            engine: "InnoDB".to_owned(),
            charset: "latin1".to_owned(),
            auto_inc: None,
            columns: Vec::new(),
            primary: None,
            secondary: Vec::new(),
            namespace: String::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, index: Index) -> Self {
        self.primary = Some(index);
        self
    }

    pub fn index(mut self, index: Index) -> Self {
        self.secondary.push(index);
        self
    }

    pub fn column_by_property(&self, property_id: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.meta.property_id == property_id)
    }

    /// Prefix the table name with the directory segments of its on-disk
    /// origin, joined with `_`, so tables from different subtrees get unique
    /// live names.
    pub fn namespaceify(&mut self, rel_dir: &Path) {
        let segments: Vec<String> = rel_dir
            .components()
            .filter_map(|c| c.as_os_str().to_str().map(str::to_owned))
            .collect();

        if segments.is_empty() {
            return;
        }

        self.namespace = segments.join("_");
        self.name = format!("{}_{}", self.namespace, self.name);
        self.meta.name = self.name.clone();
    }

    /// Inverse of [`Table::namespaceify`]: restore the bare name for
    /// round-trip file output.
    pub fn strip_namespace(&mut self) {
        if self.namespace.is_empty() {
            return;
        }

        let prefix = format!("{}_", self.namespace);

        if let Some(bare) = self.name.strip_prefix(&prefix) {
            self.name = bare.to_owned();
            self.meta.name = self.name.clone();
        }

        self.namespace.clear();
    }

    /// Every index of the table, primary first.
    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.primary.iter().chain(self.secondary.iter())
    }

    pub fn to_ddl(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(Column::to_ddl).collect();
        parts.extend(self.indexes().map(Index::to_ddl));

        let mut ddl = format!(
            "CREATE TABLE {} ({}) ENGINE={}",
            self.name,
            parts.join(", "),
            self.engine
        );

        if let Some(auto_inc) = self.auto_inc {
            let _ = write!(ddl, " AUTO_INCREMENT={auto_inc}");
        }

        let _ = write!(ddl, " DEFAULT CHARSET={}", self.charset);

        ddl
    }
}
