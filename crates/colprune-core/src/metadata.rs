//! # Query Metadata
//!
//! The metadata registry owns the identity of every table and column a query refers
//! to. Columns are introduced by scans, projections, aggregations and row numbering;
//! each introduction allocates a fresh [`ColumnId`] that is never reused. Pruning only
//! ever compares and removes identifiers, so the registry is only consulted by plan
//! builders registering tables and synthesizing new columns.

use crate::colset::{ColSet, ColumnId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a table registered in the metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    pub id: TableId,
    pub name: String,
    /// Columns in table order.
    pub columns: Vec<ColumnId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub id: ColumnId,
    pub label: String,
    /// The table the column was read from, if any.
    pub table: Option<TableId>,
}

/// Registry of tables and columns for one query.
///
/// Column ids start at 1; zero is never handed out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    tables: Vec<TableMeta>,
    columns: Vec<ColumnMeta>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table and allocate one column per label.
    pub fn add_table(&mut self, name: impl Into<String>, labels: &[&str]) -> TableId {
        let id = TableId(self.tables.len() as u32 + 1);
        let columns = labels
            .iter()
            .map(|label| self.alloc_column(label, Some(id)))
            .collect();
        self.tables.push(TableMeta {
            id,
            name: name.into(),
            columns,
        });
        id
    }

    /// Allocate a column that is not backed by a table (projection, aggregate, ...).
    pub fn add_column(&mut self, label: &str) -> ColumnId {
        self.alloc_column(label, None)
    }

    fn alloc_column(&mut self, label: &str, table: Option<TableId>) -> ColumnId {
        let id = ColumnId(self.columns.len() as u32 + 1);
        self.columns.push(ColumnMeta {
            id,
            label: label.to_string(),
            table,
        });
        id
    }

    pub fn table(&self, id: TableId) -> Option<&TableMeta> {
        id.0.checked_sub(1).and_then(|i| self.tables.get(i as usize))
    }

    pub fn column(&self, id: ColumnId) -> Option<&ColumnMeta> {
        id.0.checked_sub(1).and_then(|i| self.columns.get(i as usize))
    }

    /// All columns of a table as a set (the scan's full candidate output).
    pub fn table_cols(&self, id: TableId) -> ColSet {
        self.table(id)
            .map(|t| t.columns.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Look up a table column by label.
    pub fn table_column(&self, id: TableId, label: &str) -> Option<ColumnId> {
        let table = self.table(id)?;
        table
            .columns
            .iter()
            .copied()
            .find(|&c| self.column(c).is_some_and(|m| m.label == label))
    }

}
