//! Schema catalog for the lossy DDL precheck
//!
//! Holds the databases and tables built up from CREATE statements and
//! applies ALTER TABLE actions, returning a [`ChangeDescriptor`] for every
//! action so the caller can classify it.
//!
//! ## Example
//!
//! ```rust
//! use ddlguard_catalog::Catalog;
//! use ddlguard_core::{AlterAction, AlterTable, Column, ColumnDef, ColumnType, CreateDatabase, CreateTable, ObjectName};
//!
//! let mut catalog = Catalog::new(true);
//! catalog.create_database(&CreateDatabase::new("shop")).unwrap();
//! catalog.create_table(&CreateTable::new(
//!     ObjectName::qualified("shop", "orders"),
//!     vec![ColumnDef::new(Column::new("note", ColumnType::varchar(20)))],
//! )).unwrap();
//!
//! let changes = catalog.apply_alter(&AlterTable::new(
//!     ObjectName::qualified("shop", "orders"),
//!     vec![AlterAction::DropColumn { name: "note".into() }],
//! ));
//! assert!(changes.is_err()); // a table keeps at least one column
//! ```

mod catalog;
pub mod descriptor;
mod editor;
pub mod error;

pub use catalog::{Catalog, Database};
pub use descriptor::{Change, ChangeDescriptor, ColumnChange, IndexChange, TableChange, TableOptions};
pub use error::{CatalogError, ObjectKind};
