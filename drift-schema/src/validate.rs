//! Identity validation: PropertyIDs must be present and globally unique,
//! and names must be unique within their scope (tables globally, columns
//! and indexes within their table).

use std::collections::HashMap;

use crate::error::ValidationError;
use crate::metadata::Metadata;
use crate::model::Table;

struct Scope<'a> {
    ids: HashMap<&'a str, String>,
    names: HashMap<(&'a str, &'a str), String>,
    issues: Vec<String>,
}

impl<'a> Scope<'a> {
    fn new() -> Self {
        Self {
            ids: HashMap::new(),
            names: HashMap::new(),
            issues: Vec::new(),
        }
    }

    /// Register one entity; `scope` names the name-uniqueness scope (empty
    /// for tables, the table name for its members).
    fn register(&mut self, meta: &'a Metadata, scope: &'a str, what: String) {
        if meta.property_id.is_empty() {
            self.issues.push(format!("{what} has an empty PropertyID"));
        } else if let Some(holder) = self
            .ids
            .insert(meta.property_id.as_str(), what.clone())
        {
            self.issues.push(format!(
                "{what} and {holder} share PropertyID `{}`",
                meta.property_id
            ));
        }

        if let Some(holder) = self.names.insert((scope, meta.name.as_str()), what.clone()) {
            self.issues
                .push(format!("{what} and {holder} share the name `{}`", meta.name));
        }
    }
}

pub fn validate(tables: &[Table], label: &str) -> Result<(), ValidationError> {
    let mut scope = Scope::new();

    for table in tables {
        scope.register(&table.meta, "", format!("table `{}`", table.name));

        for column in &table.columns {
            scope.register(
                &column.meta,
                &table.name,
                format!("column `{}.{}`", table.name, column.name),
            );
        }

        for index in table.indexes() {
            scope.register(
                &index.meta,
                &table.name,
                format!("index `{}.{}`", table.name, index.name),
            );
        }
    }

    if scope.issues.is_empty() {
        return Ok(());
    }

    Err(ValidationError {
        label: label.to_owned(),
        count: scope.issues.len(),
        issues: scope.issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, Index, IndexColumn};
    use crate::types::ColumnType;

    fn table(name: &str, id: &str) -> Table {
        let mut t = Table::new(name);
        t.meta.property_id = id.to_owned();
        t
    }

    fn column(name: &str, id: &str) -> Column {
        let mut c = Column::new(name, ColumnType::Int).size(vec![11]);
        c.meta.property_id = id.to_owned();
        c
    }

    #[test]
    fn clean_schema_passes() {
        let t = table("users", "tbl-1")
            .column(column("id", "col-1"))
            .column(column("name", "col-2"));

        assert!(validate(&[t], "yaml").is_ok());
    }

    #[test]
    fn empty_property_id_counts_one_error() {
        let t = table("users", "tbl-1").column(column("id", ""));

        let err = validate(&[t], "yaml").unwrap_err();
        assert_eq!(err.count, 1);
        assert!(err.issues[0].contains("empty PropertyID"));
    }

    #[test]
    fn duplicate_id_across_tables_is_caught() {
        let a = table("users", "tbl-1").column(column("id", "col-1"));
        let b = table("orders", "tbl-2").column(column("id", "col-1"));

        let err = validate(&[a, b], "yaml").unwrap_err();
        assert_eq!(err.count, 1);
        assert!(err.issues[0].contains("col-1"));
        assert!(err.issues[0].contains("users.id"));
        assert!(err.issues[0].contains("orders.id"));
    }

    #[test]
    fn same_column_name_in_different_tables_is_fine() {
        let a = table("users", "tbl-1").column(column("id", "col-1"));
        let b = table("orders", "tbl-2").column(column("id", "col-2"));

        assert!(validate(&[a, b], "yaml").is_ok());
    }

    #[test]
    fn column_and_index_may_not_share_a_name() {
        let mut idx = Index::new("id").column(IndexColumn::new("id"));
        idx.meta.property_id = "idx-1".to_owned();

        let t = table("users", "tbl-1")
            .column(column("id", "col-1"))
            .index(idx);

        let err = validate(&[t], "yaml").unwrap_err();
        assert_eq!(err.count, 1);
        assert!(err.issues[0].contains("share the name `id`"));
    }

    #[test]
    fn duplicate_table_names_are_caught() {
        let a = table("users", "tbl-1");
        let b = table("users", "tbl-2");

        let err = validate(&[a, b], "both").unwrap_err();
        assert_eq!(err.count, 1);
        assert_eq!(err.label, "both");
    }
}
