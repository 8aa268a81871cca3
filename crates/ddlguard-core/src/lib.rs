//! ddlguard core
//!
//! Core domain model with stable, versioned types.
//! Never rename diagnostic codes - they are part of the public API.

pub mod collation;
pub mod config;
pub mod diagnostic;
pub mod report;
pub mod schema;
pub mod statement;

pub use collation::CollationError;
pub use config::{AllowlistRules, Config, ConfigError, OutputFormat};
pub use diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
pub use report::{Outcome, Report, ReportSummary, ReportVersion};
pub use schema::{Column, ColumnType, Index, TableSchema, TypeFamily, TypeKind, TypeParseError};
pub use statement::{
    AlterAction, AlterTable, ColumnDef, ColumnPosition, CreateDatabase, CreateTable, IndexDef,
    ObjectName, Statement, StatementKind,
};
