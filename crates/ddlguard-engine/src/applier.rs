//! Statement applier
//!
//! Consumes statements strictly in input order, one per [`StatementApplier::step`].
//! CREATE statements mutate the catalog; every ALTER TABLE additionally has
//! its change descriptors classified and folded into the run context.
//!
//! ```text
//! Idle --step--> Applying --last statement ok--> Done
//!                   |
//!                   +------any failure---------> Failed
//! ```

use crate::classifier::Classification;
use crate::context::{Analysis, RunContext, RunOptions};
use crate::error::PrecheckError;
use ddlguard_catalog::Catalog;
use ddlguard_core::{AlterTable, Statement, StatementKind};

/// Lifecycle of an applier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplierState {
    /// Constructed, nothing applied yet
    Idle,
    /// At least one statement applied, more remain
    Applying,
    /// Every statement applied
    Done,
    /// A statement failed; the run is over
    Failed,
}

impl ApplierState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Check the input shape before anything is applied
pub fn validate(statements: &[Statement]) -> Result<(), PrecheckError> {
    match statements.last() {
        None => Err(PrecheckError::precondition("statement list is empty")),
        Some(Statement::AlterTable(_)) => Ok(()),
        Some(last) => Err(PrecheckError::PreconditionViolation {
            reason: format!("last statement must be ALTER TABLE, found {}", last.kind()),
            index: Some(statements.len() - 1),
            kind: Some(last.kind()),
            object: Some(last.object_name()),
        }),
    }
}

/// Applies a statement sequence to a fresh catalog
pub struct StatementApplier<'a> {
    statements: &'a [Statement],
    catalog: Catalog,
    context: RunContext,
    next: usize,
    state: ApplierState,
}

impl<'a> StatementApplier<'a> {
    /// Validate the input and prepare an empty catalog
    pub fn new(statements: &'a [Statement], options: RunOptions) -> Result<Self, PrecheckError> {
        validate(statements)?;
        Ok(Self {
            statements,
            catalog: Catalog::new(options.new_collation_enabled),
            context: RunContext::new(options, statements.len()),
            next: 0,
            state: ApplierState::Idle,
        })
    }

    pub fn state(&self) -> ApplierState {
        self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Apply the next statement
    ///
    /// Stepping a terminal applier is a no-op that returns the same state.
    pub fn step(&mut self) -> Result<ApplierState, PrecheckError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        let index = self.next;
        let statements = self.statements;
        let Some(statement) = statements.get(index) else {
            self.state = ApplierState::Done;
            return Ok(self.state);
        };

        tracing::debug!(
            statement = index,
            kind = %statement.kind(),
            object = %statement.object_name(),
            "applying statement"
        );

        match self.apply(index, statement) {
            Ok(()) => {
                self.context.record_applied();
                self.next += 1;
                self.state = if self.next == self.statements.len() {
                    ApplierState::Done
                } else {
                    ApplierState::Applying
                };
                Ok(self.state)
            }
            Err(error) => {
                tracing::debug!(statement = index, %error, "statement failed");
                self.context.record_error(error.clone());
                self.state = ApplierState::Failed;
                Err(error)
            }
        }
    }

    fn apply(&mut self, index: usize, statement: &Statement) -> Result<(), PrecheckError> {
        let catalog_error = |source| PrecheckError::Statement {
            index,
            kind: statement.kind(),
            object: statement.object_name(),
            source,
        };

        match statement {
            Statement::CreateDatabase(def) => {
                self.catalog.create_database(def).map_err(catalog_error)?;
            }
            Statement::CreateTable(def) => {
                self.catalog.create_table(def).map_err(catalog_error)?;
            }
            Statement::AlterTable(alter) => self.apply_alter(index, alter)?,
            Statement::Unsupported { keyword, object } => {
                return Err(PrecheckError::UnsupportedStatementKind {
                    index,
                    keyword: keyword.clone(),
                    object: object.as_ref().map(ToString::to_string),
                });
            }
        }
        Ok(())
    }

    fn apply_alter(&mut self, index: usize, alter: &AlterTable) -> Result<(), PrecheckError> {
        let changes = self
            .catalog
            .apply_alter(alter)
            .map_err(|source| PrecheckError::Statement {
                index,
                kind: StatementKind::AlterTable,
                object: alter.name.to_string(),
                source,
            })?;

        if changes.is_empty() {
            return Err(PrecheckError::ClassifierInconsistency {
                index,
                object: alter.name.to_string(),
            });
        }

        let enabled = self.context.options().new_collation_enabled;
        let classifications: Vec<Classification> = changes
            .iter()
            .map(|change| Classification::classify(change, enabled))
            .collect();

        let lossy = self.context.record_alter(index, classifications);
        tracing::debug!(statement = index, table = %alter.name, changes = changes.len(), lossy, "classified alteration");
        Ok(())
    }

    /// Step until a terminal state and close the run
    pub fn run(mut self) -> Analysis {
        while !self.state.is_terminal() {
            if self.step().is_err() {
                break;
            }
        }
        self.context.finish()
    }
}
