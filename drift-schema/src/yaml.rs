//! Declarative schema files: one table per YAML file, collected recursively
//! from a working directory. The directory hierarchy becomes the table's
//! namespace prefix so identically named tables in different subtrees get
//! unique live names.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::metadata::{Metadata, PropertyKind};
use crate::model::{Column, Index, IndexColumn, Table, PRIMARY_KEY_NAME};
use crate::types::ColumnType;

const EXTENSIONS: [&str; 2] = ["yaml", "yml"];

#[derive(Debug, Serialize, Deserialize)]
struct SchemaFile {
    table: TableDef,
    #[serde(default)]
    columns: Vec<ColumnDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    primarykey: Option<IndexDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    indexes: Vec<IndexDef>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableDef {
    name: String,
    #[serde(default = "default_engine")]
    engine: String,
    #[serde(default = "default_charset")]
    charset: String,
    #[serde(default)]
    propertyid: String,
}

fn default_engine() -> String {
    "InnoDB".to_owned()
}

fn default_charset() -> String {
    "latin1".to_owned()
}

#[derive(Debug, Serialize, Deserialize)]
struct ColumnDef {
    name: String,
    #[serde(rename = "type")]
    ctype: ColumnType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    size: Vec<u32>,
    #[serde(default = "default_true")]
    nullable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    autoinc: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<String>,
    #[serde(default)]
    propertyid: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexDef {
    #[serde(default)]
    name: String,
    #[serde(default)]
    columns: Vec<IndexColumn>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    unique: bool,
    #[serde(default)]
    propertyid: String,
}

/// Load every declarative table under `root`, namespaced by its directory.
///
/// Tables whose PropertyID is empty are skipped with a warning; the identity
/// validator is the place where that becomes a hard error.
pub fn load_schema(root: &Path) -> Result<Vec<Table>> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    let mut tables = Vec::new();

    for file in files {
        let text = fs::read_to_string(&file)?;
        let def: SchemaFile = serde_yaml::from_str(&text)?;

        if def.table.propertyid.is_empty() {
            warn!(
                file = %file.display(),
                table = %def.table.name,
                "skipping table without a PropertyID"
            );
            continue;
        }

        let mut table = to_table(def);

        let rel_dir = file
            .parent()
            .and_then(|d| d.strip_prefix(root).ok())
            .unwrap_or_else(|| Path::new(""));

        table.namespaceify(rel_dir);
        tables.push(table);
    }

    Ok(tables)
}

/// Write one table back as a YAML file under `root`, in its namespace
/// directory, with the bare (namespace-stripped) name. Used to persist
/// freshly assigned PropertyIDs after a pull.
pub fn save_schema(table: &Table, root: &Path) -> Result<PathBuf> {
    let mut table = table.clone();
    let namespace = table.namespace.clone();
    table.strip_namespace();

    let mut dir = root.to_path_buf();

    for segment in namespace.split('_').filter(|s| !s.is_empty()) {
        dir.push(segment);
    }

    fs::create_dir_all(&dir)?;

    let path = dir.join(format!("{}.yaml", table.name));
    let text = serde_yaml::to_string(&from_table(&table))?;
    fs::write(&path, text)?;

    Ok(path)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_files(&path, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| EXTENSIONS.contains(&e))
        {
            out.push(path);
        }
    }

    Ok(())
}

fn to_table(def: SchemaFile) -> Table {
    let mut table = Table::new(def.table.name);
    table.engine = def.table.engine;
    table.charset = def.table.charset;
    table.meta = Metadata::new(PropertyKind::Table, table.name.clone())
        .with_property_id(def.table.propertyid);

    for col in def.columns {
        let mut column = Column::new(col.name, col.ctype).size(col.size);
        column.nullable = col.nullable;
        column.auto_inc = col.autoinc;
        column.default = col.default;
        column.meta = Metadata::new(PropertyKind::Column, column.name.clone())
            .with_property_id(col.propertyid)
            .with_parent(table.meta.property_id.clone());
        table.columns.push(column);
    }

    if let Some(pk) = def.primarykey {
        // normalise: a primary index with columns always takes the sentinel
        // name and the primary flag, whatever the file says
        if !pk.columns.is_empty() {
            let mut primary = Index::primary();
            primary.columns = pk.columns;
            primary.meta = Metadata::new(PropertyKind::PrimaryKey, PRIMARY_KEY_NAME)
                .with_property_id(pk.propertyid)
                .with_parent(table.meta.property_id.clone());
            table.primary = Some(primary);
        }
    }

    for idx in def.indexes {
        let mut index = Index::new(idx.name);
        index.columns = idx.columns;
        index.is_unique = idx.unique;
        index.meta = Metadata::new(PropertyKind::Index, index.name.clone())
            .with_property_id(idx.propertyid)
            .with_parent(table.meta.property_id.clone());
        table.secondary.push(index);
    }

    table
}

fn from_table(table: &Table) -> SchemaFile {
    SchemaFile {
        table: TableDef {
            name: table.name.clone(),
            engine: table.engine.clone(),
            charset: table.charset.clone(),
            propertyid: table.meta.property_id.clone(),
        },
        columns: table
            .columns
            .iter()
            .map(|c| ColumnDef {
                name: c.name.clone(),
                ctype: c.ctype,
                size: c.size.clone(),
                nullable: c.nullable,
                autoinc: c.auto_inc,
                default: c.default.clone(),
                propertyid: c.meta.property_id.clone(),
            })
            .collect(),
        primarykey: table.primary.as_ref().map(|pk| IndexDef {
            name: pk.name.clone(),
            columns: pk.columns.clone(),
            unique: false,
            propertyid: pk.meta.property_id.clone(),
        }),
        indexes: table
            .secondary
            .iter()
            .map(|i| IndexDef {
                name: i.name.clone(),
                columns: i.columns.clone(),
                unique: i.is_unique,
                propertyid: i.meta.property_id.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: &str = "\
table:
  name: users
  engine: InnoDB
  charset: utf8
  propertyid: tbl-users
columns:
  - name: id
    type: int
    size: [11]
    nullable: false
    autoinc: true
    propertyid: col-id
  - name: email
    type: varchar
    size: [128]
    nullable: false
    propertyid: col-email
primarykey:
  columns:
    - name: id
  propertyid: pk-users
indexes:
  - name: idx_email
    columns:
      - name: email
    unique: true
    propertyid: idx-email
";

    const ORPHAN: &str = "\
table:
  name: orphan
columns:
  - name: id
    type: int
    propertyid: col-orphan-id
";

    #[test]
    fn loads_and_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("billing")).unwrap();
        fs::write(dir.path().join("users.yaml"), USERS).unwrap();
        fs::write(dir.path().join("billing/users.yaml"), USERS).unwrap();

        let tables = load_schema(dir.path()).unwrap();
        assert_eq!(tables.len(), 2);

        let namespaced = tables.iter().find(|t| t.name == "billing_users").unwrap();
        assert_eq!(namespaced.namespace, "billing");
        assert_eq!(namespaced.meta.property_id, "tbl-users");
        assert_eq!(namespaced.meta.name, "billing_users");

        let root = tables.iter().find(|t| t.name == "users").unwrap();
        assert!(root.namespace.is_empty());
        assert_eq!(root.columns.len(), 2);
        assert!(!root.columns[0].nullable);
        assert!(root.columns[0].auto_inc);
        assert_eq!(root.columns[0].meta.parent_id, "tbl-users");
    }

    #[test]
    fn primary_index_is_normalised() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("users.yaml"), USERS).unwrap();

        let tables = load_schema(dir.path()).unwrap();
        let primary = tables[0].primary.as_ref().unwrap();

        assert!(primary.is_primary);
        assert_eq!(primary.name, PRIMARY_KEY_NAME);
        assert_eq!(primary.meta.kind, PropertyKind::PrimaryKey);
    }

    #[test]
    fn table_without_property_id_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("orphan.yaml"), ORPHAN).unwrap();
        fs::write(dir.path().join("users.yaml"), USERS).unwrap();

        let tables = load_schema(dir.path()).unwrap();

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "users");
    }

    #[test]
    fn save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("billing")).unwrap();
        fs::write(dir.path().join("billing/users.yaml"), USERS).unwrap();

        let tables = load_schema(dir.path()).unwrap();

        let out = tempfile::tempdir().unwrap();
        let path = save_schema(&tables[0], out.path()).unwrap();
        assert!(path.ends_with("billing/users.yaml"));

        let again = load_schema(out.path()).unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].name, "billing_users");
        assert_eq!(again[0].meta.property_id, "tbl-users");
        assert_eq!(again[0].columns, tables[0].columns);
    }
}
