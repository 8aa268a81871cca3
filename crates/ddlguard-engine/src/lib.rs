//! ddlguard engine - lossy DDL precheck
//!
//! This crate implements the precheck itself:
//! - Statement applier (builds a fresh catalog statement by statement)
//! - Lossy classifier (rule table over change descriptors)
//! - Run context (verdict accumulation, findings, first error)
//!
//! ## Example
//!
//! ```rust
//! use ddlguard_core::{AlterAction, AlterTable, Column, ColumnDef, ColumnType, CreateDatabase, CreateTable, ObjectName, Statement};
//! use ddlguard_engine::{precheck, RunOptions, Verdict};
//!
//! let table = ObjectName::qualified("d", "t");
//! let statements = vec![
//!     Statement::CreateDatabase(CreateDatabase::new("d")),
//!     Statement::CreateTable(CreateTable::new(
//!         table.clone(),
//!         vec![ColumnDef::new(Column::new("name", ColumnType::varchar(20)))],
//!     )),
//!     Statement::AlterTable(AlterTable::new(
//!         table,
//!         vec![AlterAction::ModifyColumn {
//!             column: ColumnDef::new(Column::new("name", ColumnType::varchar(5))),
//!             position: None,
//!         }],
//!     )),
//! ];
//!
//! assert_eq!(precheck(&statements, &RunOptions::default()), Ok(Verdict::Lossy));
//! ```

pub mod applier;
pub mod classifier;
pub mod context;
pub mod error;

pub use applier::{ApplierState, StatementApplier};
pub use classifier::Classification;
pub use context::{Analysis, RunContext, RunOptions, Verdict};
pub use error::PrecheckError;

use ddlguard_core::{ReportSummary, Statement};

/// Run the precheck and return the verdict or the first error
pub fn precheck(statements: &[Statement], options: &RunOptions) -> Result<Verdict, PrecheckError> {
    analyze(statements, options).result
}

/// Run the precheck and keep every lossy finding
///
/// Each call works on its own catalog and context; identical inputs always
/// produce identical analyses.
pub fn analyze(statements: &[Statement], options: &RunOptions) -> Analysis {
    let analysis = match StatementApplier::new(statements, *options) {
        Ok(applier) => applier.run(),
        Err(error) => Analysis {
            result: Err(error),
            findings: Vec::new(),
            summary: ReportSummary {
                statements: statements.len(),
                ..ReportSummary::default()
            },
        },
    };

    match &analysis.result {
        Ok(verdict) => tracing::info!(
            %verdict,
            alter_statements = analysis.summary.alter_statements,
            lossy_changes = analysis.summary.lossy_changes,
            "precheck finished"
        ),
        Err(error) => tracing::info!(code = error.code().as_str(), %error, "precheck failed"),
    }
    analysis
}
