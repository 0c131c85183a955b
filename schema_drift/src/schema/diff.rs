//! Schema difference calculator
//!
//! This module compares a declared schema against a live schema and lists
//! every discrepancy as a [`DiffAction`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::Result;
use crate::schema::report::Severity;
use crate::schema::types::{
    ColumnModel, DefaultValue, IndexModel, SchemaModel, TableModel, TypeDescriptor,
};

/// One unit of drift
///
/// "Add" means the declared schema has something the live database lacks;
/// "remove" means the live database has something that is not declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DiffAction {
    AddTable {
        table: String,
    },
    RemoveTable {
        table: String,
    },
    AddColumn {
        table: String,
        column: ColumnModel,
    },
    RemoveColumn {
        table: String,
        column: ColumnModel,
    },
    ModifyColumnType {
        table: String,
        column: String,
        declared: TypeDescriptor,
        live: TypeDescriptor,
    },
    ModifyColumnNullability {
        table: String,
        column: String,
        declared: bool,
        live: bool,
    },
    ModifyColumnDefault {
        table: String,
        column: String,
        declared: Option<DefaultValue>,
        live: Option<DefaultValue>,
    },
    AddIndex {
        table: String,
        index: IndexModel,
    },
    RemoveIndex {
        table: String,
        index: IndexModel,
    },
    ModifyIndex {
        table: String,
        index: String,
        declared: IndexModel,
        live: IndexModel,
    },
}

/// The kind of a [`DiffAction`], for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    AddTable,
    RemoveTable,
    AddColumn,
    RemoveColumn,
    ModifyColumnType,
    ModifyColumnNullability,
    ModifyColumnDefault,
    AddIndex,
    RemoveIndex,
    ModifyIndex,
}

impl DiffAction {
    pub fn kind(&self) -> DiffKind {
        match self {
            DiffAction::AddTable { .. } => DiffKind::AddTable,
            DiffAction::RemoveTable { .. } => DiffKind::RemoveTable,
            DiffAction::AddColumn { .. } => DiffKind::AddColumn,
            DiffAction::RemoveColumn { .. } => DiffKind::RemoveColumn,
            DiffAction::ModifyColumnType { .. } => DiffKind::ModifyColumnType,
            DiffAction::ModifyColumnNullability { .. } => DiffKind::ModifyColumnNullability,
            DiffAction::ModifyColumnDefault { .. } => DiffKind::ModifyColumnDefault,
            DiffAction::AddIndex { .. } => DiffKind::AddIndex,
            DiffAction::RemoveIndex { .. } => DiffKind::RemoveIndex,
            DiffAction::ModifyIndex { .. } => DiffKind::ModifyIndex,
        }
    }

    /// The table every action belongs to
    pub fn table(&self) -> &str {
        match self {
            DiffAction::AddTable { table }
            | DiffAction::RemoveTable { table }
            | DiffAction::AddColumn { table, .. }
            | DiffAction::RemoveColumn { table, .. }
            | DiffAction::ModifyColumnType { table, .. }
            | DiffAction::ModifyColumnNullability { table, .. }
            | DiffAction::ModifyColumnDefault { table, .. }
            | DiffAction::AddIndex { table, .. }
            | DiffAction::RemoveIndex { table, .. }
            | DiffAction::ModifyIndex { table, .. } => table,
        }
    }

    /// The column an action refers to, if any
    pub fn column(&self) -> Option<&str> {
        match self {
            DiffAction::AddColumn { column, .. } | DiffAction::RemoveColumn { column, .. } => {
                Some(&column.name)
            }
            DiffAction::ModifyColumnType { column, .. }
            | DiffAction::ModifyColumnNullability { column, .. }
            | DiffAction::ModifyColumnDefault { column, .. } => Some(column),
            _ => None,
        }
    }

    /// `+` for something the live database is missing, `-` for an undeclared extra, `~` for a change
    pub fn symbol(&self) -> char {
        match self {
            DiffAction::AddTable { .. }
            | DiffAction::AddColumn { .. }
            | DiffAction::AddIndex { .. } => '+',
            DiffAction::RemoveTable { .. }
            | DiffAction::RemoveColumn { .. }
            | DiffAction::RemoveIndex { .. } => '-',
            _ => '~',
        }
    }

    /// Missing or incompatible structure is an error; extras, defaults and indexes are warnings
    pub fn severity(&self) -> Severity {
        match self {
            DiffAction::AddTable { .. }
            | DiffAction::AddColumn { .. }
            | DiffAction::ModifyColumnType { .. }
            | DiffAction::ModifyColumnNullability { .. } => Severity::Error,
            DiffAction::RemoveTable { .. }
            | DiffAction::RemoveColumn { .. }
            | DiffAction::ModifyColumnDefault { .. }
            | DiffAction::AddIndex { .. }
            | DiffAction::RemoveIndex { .. }
            | DiffAction::ModifyIndex { .. } => Severity::Warning,
        }
    }
}

fn describe_nullable(nullable: bool) -> &'static str {
    if nullable {
        "NULL"
    } else {
        "NOT NULL"
    }
}

fn describe_default(default: &Option<DefaultValue>) -> String {
    default
        .as_ref()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

fn describe_column(column: &ColumnModel) -> String {
    let mut description = column
        .data_type
        .as_ref()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "(untyped)".to_string());

    description.push(' ');
    description.push_str(describe_nullable(column.nullable));
    if let Some(default) = &column.default {
        description.push_str(&format!(" DEFAULT {}", default));
    }

    description
}

impl fmt::Display for DiffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.symbol();

        match self {
            DiffAction::AddTable { table } | DiffAction::RemoveTable { table } => {
                write!(f, "{} table {}", symbol, table)
            }
            DiffAction::AddColumn { table, column } | DiffAction::RemoveColumn { table, column } => {
                write!(
                    f,
                    "{} column {}.{} {}",
                    symbol,
                    table,
                    column.name,
                    describe_column(column)
                )
            }
            DiffAction::ModifyColumnType {
                table,
                column,
                declared,
                live,
            } => write!(
                f,
                "{} column {}.{} type: declared {}, live {}",
                symbol, table, column, declared, live
            ),
            DiffAction::ModifyColumnNullability {
                table,
                column,
                declared,
                live,
            } => write!(
                f,
                "{} column {}.{} nullability: declared {}, live {}",
                symbol,
                table,
                column,
                describe_nullable(*declared),
                describe_nullable(*live)
            ),
            DiffAction::ModifyColumnDefault {
                table,
                column,
                declared,
                live,
            } => write!(
                f,
                "{} column {}.{} default: declared {}, live {}",
                symbol,
                table,
                column,
                describe_default(declared),
                describe_default(live)
            ),
            DiffAction::AddIndex { table, index } | DiffAction::RemoveIndex { table, index } => {
                write!(f, "{} index {}.{} {}", symbol, table, index.name, index)
            }
            DiffAction::ModifyIndex {
                table,
                index,
                declared,
                live,
            } => write!(
                f,
                "{} index {}.{}: declared {}, live {}",
                symbol, table, index, declared, live
            ),
        }
    }
}

/// Computes the drift between two normalized schemas
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine;

impl DiffEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compare a declared schema against a live schema
    ///
    /// Output is grouped by table in lexical order. Within a table the order is
    /// add-table, remove-table, add-column, remove-column, column modifications
    /// (per column: type, nullability, default), then add-index, remove-index,
    /// modify-index, each in lexical order of name. A wholly added or removed
    /// table produces no column or index actions.
    pub fn compare(&self, declared: &SchemaModel, live: &SchemaModel) -> Result<Vec<DiffAction>> {
        validate_types(declared)?;
        validate_types(live)?;

        let table_names: BTreeSet<&String> =
            declared.tables.keys().chain(live.tables.keys()).collect();

        let mut actions = Vec::new();
        for name in table_names {
            match (declared.tables.get(name), live.tables.get(name)) {
                (Some(_), None) => actions.push(DiffAction::AddTable {
                    table: name.clone(),
                }),
                (None, Some(_)) => actions.push(DiffAction::RemoveTable {
                    table: name.clone(),
                }),
                (Some(declared_table), Some(live_table)) => {
                    diff_table(name, declared_table, live_table, &mut actions)?;
                }
                (None, None) => {}
            }
        }

        tracing::debug!(
            declared_tables = declared.tables.len(),
            live_tables = live.tables.len(),
            actions = actions.len(),
            "Compared schemas"
        );

        Ok(actions)
    }
}

/// Every column on both sides must carry a type, including tables that are
/// only on one side
fn validate_types(schema: &SchemaModel) -> Result<()> {
    for table in schema.tables.values() {
        for column in table.columns.values() {
            column.require_type(&table.name)?;
        }
    }
    Ok(())
}

fn diff_table(
    table: &str,
    declared: &TableModel,
    live: &TableModel,
    actions: &mut Vec<DiffAction>,
) -> Result<()> {
    let declared_columns: BTreeSet<&String> = declared.columns.keys().collect();
    let live_columns: BTreeSet<&String> = live.columns.keys().collect();

    for name in declared_columns.difference(&live_columns) {
        actions.push(DiffAction::AddColumn {
            table: table.to_string(),
            column: declared.columns[name.as_str()].clone(),
        });
    }

    for name in live_columns.difference(&declared_columns) {
        actions.push(DiffAction::RemoveColumn {
            table: table.to_string(),
            column: live.columns[name.as_str()].clone(),
        });
    }

    for name in declared_columns.intersection(&live_columns) {
        diff_column(
            table,
            &declared.columns[name.as_str()],
            &live.columns[name.as_str()],
            actions,
        )?;
    }

    diff_indexes(table, declared, live, actions);

    Ok(())
}

fn diff_column(
    table: &str,
    declared: &ColumnModel,
    live: &ColumnModel,
    actions: &mut Vec<DiffAction>,
) -> Result<()> {
    let declared_type = declared.require_type(table)?;
    let live_type = live.require_type(table)?;

    if declared_type != live_type {
        actions.push(DiffAction::ModifyColumnType {
            table: table.to_string(),
            column: declared.name.clone(),
            declared: declared_type.clone(),
            live: live_type.clone(),
        });
    }

    if declared.nullable != live.nullable {
        actions.push(DiffAction::ModifyColumnNullability {
            table: table.to_string(),
            column: declared.name.clone(),
            declared: declared.nullable,
            live: live.nullable,
        });
    }

    if declared.default != live.default {
        actions.push(DiffAction::ModifyColumnDefault {
            table: table.to_string(),
            column: declared.name.clone(),
            declared: declared.default.clone(),
            live: live.default.clone(),
        });
    }

    Ok(())
}

fn diff_indexes(
    table: &str,
    declared: &TableModel,
    live: &TableModel,
    actions: &mut Vec<DiffAction>,
) {
    let declared_indexes: BTreeSet<&String> = declared.indexes.keys().collect();
    let live_indexes: BTreeSet<&String> = live.indexes.keys().collect();

    for name in declared_indexes.difference(&live_indexes) {
        actions.push(DiffAction::AddIndex {
            table: table.to_string(),
            index: declared.indexes[name.as_str()].clone(),
        });
    }

    for name in live_indexes.difference(&declared_indexes) {
        actions.push(DiffAction::RemoveIndex {
            table: table.to_string(),
            index: live.indexes[name.as_str()].clone(),
        });
    }

    for name in declared_indexes.intersection(&live_indexes) {
        let declared_index = &declared.indexes[name.as_str()];
        let live_index = &live.indexes[name.as_str()];

        if !declared_index.same_definition(live_index) {
            actions.push(DiffAction::ModifyIndex {
                table: table.to_string(),
                index: (*name).clone(),
                declared: declared_index.clone(),
                live: live_index.clone(),
            });
        }
    }
}
