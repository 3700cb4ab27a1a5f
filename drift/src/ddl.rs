//! Turns a [`Differences`] delta into an ordered list of DDL operations.
//!
//! Rename-vs-rebuild is decided here: a name change on a same-ID entity
//! becomes a rename statement, while any other index modification is a drop
//! plus re-add of the same index (MySQL cannot alter an index in place).

use drift_schema::{Column, Index, Metadata, Table};
use drift_store::StepOp;

use crate::diff::{Change, ColumnField, Differences, IndexField, TableDiff, TableField};

/// One emitted DDL operation with the property it acts on and the name that
/// property carries once the operation has been applied.
#[derive(Debug, Clone)]
pub struct Operation {
    pub statement: String,
    pub op: StepOp,
    pub meta: Metadata,
    pub name: String,
}

impl Operation {
    fn new(statement: String, op: StepOp, meta: &Metadata, name: &str) -> Self {
        Self {
            statement,
            op,
            meta: meta.clone(),
            name: name.to_owned(),
        }
    }
}

pub fn generate_alters(diffs: &Differences) -> Vec<Operation> {
    let mut ops = Vec::new();

    for diff in &diffs.tables {
        match diff {
            TableDiff::Added(table) => {
                ops.push(Operation::new(
                    table.to_ddl(),
                    StepOp::Add,
                    &table.meta,
                    &table.name,
                ));
            }
            TableDiff::Dropped(table) => {
                ops.push(Operation::new(
                    format!("DROP TABLE {}", table.name),
                    StepOp::Del,
                    &table.meta,
                    &table.name,
                ));
            }
            TableDiff::Altered(alter) => {
                let mut modified: Vec<String> = Vec::new();

                for change in &alter.changes {
                    match change {
                        // one statement per column carries its full target
                        // definition, so every altered field of that column
                        // collapses into it
                        Change::ColumnAltered { from, to, .. } => {
                            if modified.contains(&to.meta.property_id) {
                                continue;
                            }

                            modified.push(to.meta.property_id.clone());
                            ops.push(column_mod(&alter.name, &alter.changes, from, to));
                        }
                        _ => emit_change(&mut ops, &alter.name, &alter.meta, change),
                    }
                }
            }
        }
    }

    ops
}

fn emit_change(ops: &mut Vec<Operation>, table: &str, table_meta: &Metadata, change: &Change) {
    match change {
        Change::Table { field, from, to } => {
            let statement = match field {
                TableField::Name => format!("ALTER TABLE {from} RENAME TO {to}"),
                TableField::Engine => format!("ALTER TABLE {table} ENGINE={to}"),
                TableField::CharSet => format!("ALTER TABLE {table} DEFAULT CHARSET={to}"),
            };

            let name = match field {
                TableField::Name => to.as_str(),
                _ => table,
            };

            ops.push(Operation::new(statement, StepOp::Mod, table_meta, name));
        }
        Change::ColumnAdded(column) => {
            ops.push(Operation::new(
                format!("ALTER TABLE {table} ADD COLUMN {}", column.to_ddl()),
                StepOp::Add,
                &column.meta,
                &column.name,
            ));
        }
        Change::ColumnDropped(column) => {
            ops.push(Operation::new(
                format!("ALTER TABLE {table} DROP COLUMN {}", column.name),
                StepOp::Del,
                &column.meta,
                &column.name,
            ));
        }
        // coalesced per column in generate_alters
        Change::ColumnAltered { .. } => {}
        Change::IndexAdded(index) => {
            ops.push(Operation::new(
                format!("ALTER TABLE {table} ADD {}", add_index_ddl(index)),
                StepOp::Add,
                &index.meta,
                &index.name,
            ));
        }
        Change::IndexDropped(index) => {
            ops.push(Operation::new(
                format!("ALTER TABLE {table} DROP {}", drop_index_ddl(index)),
                StepOp::Del,
                &index.meta,
                &index.name,
            ));
        }
        Change::IndexAltered { field, from, to } => match field {
            IndexField::Name => {
                ops.push(Operation::new(
                    format!("ALTER TABLE {table} RENAME INDEX {} TO {}", from.name, to.name),
                    StepOp::Mod,
                    &to.meta,
                    &to.name,
                ));
            }
            _ => {
                // index rebuild: drop the live index, add the target one
                ops.push(Operation::new(
                    format!("ALTER TABLE {table} DROP {}", drop_index_ddl(from)),
                    StepOp::Mod,
                    &to.meta,
                    &to.name,
                ));
                ops.push(Operation::new(
                    format!("ALTER TABLE {table} ADD {}", add_index_ddl(to)),
                    StepOp::Mod,
                    &to.meta,
                    &to.name,
                ));
            }
        },
    }
}

/// The single statement covering every altered field of one column. A rename
/// uses CHANGE COLUMN, which re-states the full definition and therefore
/// subsumes any type, size or nullability change; everything else is one
/// MODIFY COLUMN with the target definition.
fn column_mod(table: &str, changes: &[Change], from: &Column, to: &Column) -> Operation {
    let renamed = changes.iter().any(|change| {
        matches!(
            change,
            Change::ColumnAltered {
                field: ColumnField::Name,
                to: c,
                ..
            } if c.meta.property_id == to.meta.property_id
        )
    });

    let statement = if renamed {
        format!("ALTER TABLE {table} CHANGE COLUMN {} {}", from.name, to.to_ddl())
    } else {
        format!("ALTER TABLE {table} MODIFY COLUMN {}", to.to_ddl())
    };

    Operation::new(statement, StepOp::Mod, &to.meta, &to.name)
}

fn add_index_ddl(index: &Index) -> String {
    if index.is_primary {
        format!("PRIMARY KEY ({})", index.column_ddl())
    } else if index.is_unique {
        format!("UNIQUE KEY {} ({})", index.name, index.column_ddl())
    } else {
        format!("KEY {} ({})", index.name, index.column_ddl())
    }
}

fn drop_index_ddl(index: &Index) -> String {
    if index.is_primary {
        "PRIMARY KEY".to_owned()
    } else {
        format!("KEY {}", index.name)
    }
}

/// Forward and backward DDL for one migration; the backward batch comes from
/// diffing with the arguments swapped.
pub fn generate_migration(to: &[Table], from: &[Table]) -> (Vec<Operation>, Vec<Operation>) {
    let forward = generate_alters(&crate::diff::diff_tables(to, from));
    let backward = generate_alters(&crate::diff::diff_tables(from, to));

    (forward, backward)
}
