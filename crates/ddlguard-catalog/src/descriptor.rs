//! Change descriptors produced by ALTER TABLE
//!
//! A descriptor is a before/after snapshot of the one object a sub-action
//! touched. It is returned directly from [`crate::Catalog::apply_alter`] and
//! lives only as long as classification needs it.

use ddlguard_core::{Column, Index};

/// Table identity and defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    pub database: String,
    pub name: String,
    pub charset: String,
    pub collation: String,
}

/// A column before and after one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
    /// `None` when the column was added
    pub before: Option<Column>,

    /// `None` when the column was dropped
    pub after: Option<Column>,

    /// Indexes that referenced the column before the action
    pub indexes: Vec<Index>,
}

/// An index before and after one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexChange {
    /// `None` when the index was added
    pub before: Option<Index>,

    /// `None` when the index was dropped
    pub after: Option<Index>,

    /// Covered columns as they were before the action
    pub columns: Vec<Column>,
}

/// Table-level options before and after one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChange {
    pub before: TableOptions,
    pub after: TableOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Column(ColumnChange),
    Index(IndexChange),
    Table(TableChange),
}

/// One object affected by one ALTER TABLE sub-action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDescriptor {
    /// Qualified name of the table when the action ran
    pub table: String,

    /// Action that produced the change (`modify column`, `drop index`, ...)
    pub action: &'static str,

    pub change: Change,
}

impl ChangeDescriptor {
    /// Name of the column or index the change is about
    pub fn subject(&self) -> Option<&str> {
        match &self.change {
            Change::Column(change) => change
                .after
                .as_ref()
                .or(change.before.as_ref())
                .map(|c| c.name.as_str()),
            Change::Index(change) => change
                .after
                .as_ref()
                .or(change.before.as_ref())
                .map(|i| i.name.as_str()),
            Change::Table(_) => None,
        }
    }

    pub fn as_column(&self) -> Option<&ColumnChange> {
        match &self.change {
            Change::Column(change) => Some(change),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<&IndexChange> {
        match &self.change {
            Change::Index(change) => Some(change),
            _ => None,
        }
    }
}
