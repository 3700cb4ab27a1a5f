//! PropertyID-keyed schema differencing.
//!
//! Entities on the two sides are paired by `Metadata.property_id`, never by
//! name, so a rename of a same-ID entity is a `Mod` on its `Name` field and
//! never an `Add`+`Del` pair. Each entity kind has its own comparator
//! returning tagged changes, which keeps the field lists exhaustive at
//! compile time.

use drift_schema::{Column, Index, Metadata, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableField {
    Name,
    Engine,
    CharSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnField {
    Name,
    Type,
    Size,
    Nullable,
    AutoInc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexField {
    Name,
    Columns,
    IsPrimary,
    IsUnique,
}

/// One change inside a matched table pair.
#[derive(Debug, Clone)]
pub enum Change {
    Table {
        field: TableField,
        from: String,
        to: String,
    },
    ColumnAdded(Column),
    ColumnDropped(Column),
    ColumnAltered {
        field: ColumnField,
        from: Column,
        to: Column,
    },
    IndexAdded(Index),
    IndexDropped(Index),
    IndexAltered {
        field: IndexField,
        from: Index,
        to: Index,
    },
}

/// Diff of one table between the two sides.
#[derive(Debug, Clone)]
pub enum TableDiff {
    Added(Table),
    Dropped(Table),
    Altered(TableAlter),
}

#[derive(Debug, Clone)]
pub struct TableAlter {
    /// Name the table is addressed by in emitted DDL: the target name, so
    /// that statements following a rename keep working.
    pub name: String,
    pub meta: Metadata,
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Default)]
pub struct Differences {
    pub tables: Vec<TableDiff>,
}

impl Differences {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of individual changes, counting a whole-table add or
    /// drop as one.
    pub fn len(&self) -> usize {
        self.tables
            .iter()
            .map(|t| match t {
                TableDiff::Added(_) | TableDiff::Dropped(_) => 1,
                TableDiff::Altered(alter) => alter.changes.len(),
            })
            .sum()
    }
}

/// Compute the delta that turns `from` into `to`.
pub fn diff_tables(to: &[Table], from: &[Table]) -> Differences {
    let mut diffs = Differences::default();

    for target in to {
        match from
            .iter()
            .find(|t| t.meta.property_id == target.meta.property_id)
        {
            Some(live) => {
                let changes = diff_table_pair(target, live);

                if !changes.is_empty() {
                    diffs.tables.push(TableDiff::Altered(TableAlter {
                        name: target.name.clone(),
                        meta: target.meta.clone(),
                        changes,
                    }));
                }
            }
            None => diffs.tables.push(TableDiff::Added(target.clone())),
        }
    }

    for live in from {
        let matched = to
            .iter()
            .any(|t| t.meta.property_id == live.meta.property_id);

        if !matched {
            diffs.tables.push(TableDiff::Dropped(live.clone()));
        }
    }

    diffs
}

fn diff_table_pair(to: &Table, from: &Table) -> Vec<Change> {
    let mut changes = Vec::new();

    let scalars = [
        (TableField::Name, &from.name, &to.name),
        (TableField::Engine, &from.engine, &to.engine),
        (TableField::CharSet, &from.charset, &to.charset),
    ];

    for (field, from_value, to_value) in scalars {
        if from_value != to_value {
            changes.push(Change::Table {
                field,
                from: from_value.clone(),
                to: to_value.clone(),
            });
        }
    }

    diff_columns(&mut changes, &to.columns, &from.columns);
    diff_primary(&mut changes, to.primary.as_ref(), from.primary.as_ref());
    diff_secondary(&mut changes, &to.secondary, &from.secondary);

    changes
}

fn diff_columns(changes: &mut Vec<Change>, to: &[Column], from: &[Column]) {
    for target in to {
        match from
            .iter()
            .find(|c| c.meta.property_id == target.meta.property_id)
        {
            Some(live) => diff_column_pair(changes, target, live),
            None => changes.push(Change::ColumnAdded(target.clone())),
        }
    }

    for live in from {
        let matched = to
            .iter()
            .any(|c| c.meta.property_id == live.meta.property_id);

        if !matched {
            changes.push(Change::ColumnDropped(live.clone()));
        }
    }
}

fn diff_column_pair(changes: &mut Vec<Change>, to: &Column, from: &Column) {
    let altered = |field| {
        Change::ColumnAltered {
            field,
            from: from.clone(),
            to: to.clone(),
        }
    };

    if from.name != to.name {
        changes.push(altered(ColumnField::Name));
    }

    if from.ctype != to.ctype {
        changes.push(altered(ColumnField::Type));
    }

    if from.size != to.size {
        changes.push(altered(ColumnField::Size));
    }

    if from.nullable != to.nullable {
        changes.push(altered(ColumnField::Nullable));
    }

    if from.auto_inc != to.auto_inc {
        changes.push(altered(ColumnField::AutoInc));
    }
}

fn diff_primary(changes: &mut Vec<Change>, to: Option<&Index>, from: Option<&Index>) {
    match (to, from) {
        (Some(target), Some(live)) => {
            if target.meta.property_id != live.meta.property_id {
                changes.push(Change::IndexDropped(live.clone()));
                changes.push(Change::IndexAdded(target.clone()));
                return;
            }

            // order-significant comparison; a swap of two columns is a diff
            if target.columns != live.columns {
                changes.push(Change::IndexAltered {
                    field: IndexField::Columns,
                    from: live.clone(),
                    to: target.clone(),
                });
            }

            if target.is_primary != live.is_primary {
                changes.push(Change::IndexAltered {
                    field: IndexField::IsPrimary,
                    from: live.clone(),
                    to: target.clone(),
                });
            }
        }
        (Some(target), None) => changes.push(Change::IndexAdded(target.clone())),
        (None, Some(live)) => changes.push(Change::IndexDropped(live.clone())),
        (None, None) => {}
    }
}

fn diff_secondary(changes: &mut Vec<Change>, to: &[Index], from: &[Index]) {
    for target in to {
        match from
            .iter()
            .find(|i| i.meta.property_id == target.meta.property_id)
        {
            Some(live) => diff_index_pair(changes, target, live),
            None => changes.push(Change::IndexAdded(target.clone())),
        }
    }

    for live in from {
        let matched = to
            .iter()
            .any(|i| i.meta.property_id == live.meta.property_id);

        if !matched {
            changes.push(Change::IndexDropped(live.clone()));
        }
    }
}

fn diff_index_pair(changes: &mut Vec<Change>, to: &Index, from: &Index) {
    let altered = |field| {
        Change::IndexAltered {
            field,
            from: from.clone(),
            to: to.clone(),
        }
    };

    if from.name != to.name {
        changes.push(altered(IndexField::Name));
    }

    if from.columns != to.columns {
        changes.push(altered(IndexField::Columns));
    }

    if from.is_primary != to.is_primary {
        changes.push(altered(IndexField::IsPrimary));
    }

    if from.is_unique != to.is_unique {
        changes.push(altered(IndexField::IsUnique));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_schema::{ColumnType, IndexColumn};

    fn column(name: &str, id: &str) -> Column {
        let mut c = Column::new(name, ColumnType::Int).size(vec![11]).not_null();
        c.meta.property_id = id.to_owned();
        c
    }

    fn table(name: &str, id: &str) -> Table {
        let mut t = Table::new(name);
        t.meta.property_id = id.to_owned();
        t
    }

    fn index(name: &str, id: &str, columns: &[&str]) -> Index {
        let mut i = Index::new(name);
        i.columns = columns.iter().map(|c| IndexColumn::new(*c)).collect();
        i.meta.property_id = id.to_owned();
        i
    }

    #[test]
    fn identical_schemas_have_no_diff() {
        let a = [table("test", "tbl-1").column(column("id", "col-1"))];
        let b = [table("test", "tbl-1").column(column("id", "col-1"))];

        assert!(diff_tables(&a, &b).is_empty());
    }

    #[test]
    fn rename_same_id_is_a_single_mod() {
        let to = [table("test", "tbl-1").column(column("uid", "col-1"))];
        let from = [table("test", "tbl-1").column(column("id", "col-1"))];

        let diffs = diff_tables(&to, &from);
        assert_eq!(diffs.len(), 1);

        let TableDiff::Altered(alter) = &diffs.tables[0] else {
            panic!("expected an altered table");
        };

        match &alter.changes[0] {
            Change::ColumnAltered { field, from, to } => {
                assert_eq!(*field, ColumnField::Name);
                assert_eq!(from.name, "id");
                assert_eq!(to.name, "uid");
            }
            other => panic!("expected a column name change, got {other:?}"),
        }
    }

    #[test]
    fn different_ids_same_name_are_add_and_del() {
        let to = [table("test", "tbl-1").column(column("id", "col-2"))];
        let from = [table("test", "tbl-1").column(column("id", "col-1"))];

        let diffs = diff_tables(&to, &from);
        let TableDiff::Altered(alter) = &diffs.tables[0] else {
            panic!("expected an altered table");
        };

        assert_eq!(alter.changes.len(), 2);
        assert!(matches!(&alter.changes[0], Change::ColumnAdded(c) if c.meta.property_id == "col-2"));
        assert!(matches!(&alter.changes[1], Change::ColumnDropped(c) if c.meta.property_id == "col-1"));
    }

    #[test]
    fn index_column_order_is_significant() {
        let to = [table("test", "tbl-1").index(index("idx", "idx-1", &["name", "id"]))];
        let from = [table("test", "tbl-1").index(index("idx", "idx-1", &["id", "name"]))];

        let diffs = diff_tables(&to, &from);
        assert_eq!(diffs.len(), 1);

        let TableDiff::Altered(alter) = &diffs.tables[0] else {
            panic!("expected an altered table");
        };

        assert!(matches!(
            &alter.changes[0],
            Change::IndexAltered {
                field: IndexField::Columns,
                ..
            }
        ));
    }

    #[test]
    fn unmatched_tables_are_whole_table_diffs() {
        let to = [table("a", "tbl-a")];
        let from = [table("b", "tbl-b")];

        let diffs = diff_tables(&to, &from);
        assert_eq!(diffs.tables.len(), 2);
        assert!(matches!(&diffs.tables[0], TableDiff::Added(t) if t.name == "a"));
        assert!(matches!(&diffs.tables[1], TableDiff::Dropped(t) if t.name == "b"));
    }

    #[test]
    fn table_rename_is_keyed_by_id() {
        let to = [table("fresh", "tbl-1")];
        let from = [table("stale", "tbl-1")];

        let diffs = diff_tables(&to, &from);
        assert_eq!(diffs.len(), 1);

        let TableDiff::Altered(alter) = &diffs.tables[0] else {
            panic!("expected an altered table");
        };

        assert!(matches!(
            &alter.changes[0],
            Change::Table {
                field: TableField::Name,
                ..
            }
        ));
    }

    #[test]
    fn nullable_and_size_changes_are_separate_mods() {
        let mut wide = column("id", "col-1");
        wide.size = vec![20];
        wide.nullable = true;

        let to = [table("test", "tbl-1").column(wide)];
        let from = [table("test", "tbl-1").column(column("id", "col-1"))];

        let diffs = diff_tables(&to, &from);
        let TableDiff::Altered(alter) = &diffs.tables[0] else {
            panic!("expected an altered table");
        };

        let fields: Vec<ColumnField> = alter
            .changes
            .iter()
            .map(|c| match c {
                Change::ColumnAltered { field, .. } => *field,
                other => panic!("unexpected change {other:?}"),
            })
            .collect();

        assert_eq!(fields, vec![ColumnField::Size, ColumnField::Nullable]);
    }
}
