//! Precheck error types

use ddlguard_catalog::CatalogError;
use ddlguard_core::{Diagnostic, DiagnosticCode, Location, Severity, StatementKind};

/// A terminal failure of a precheck run
///
/// Statement indexes are zero-based positions in the input sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrecheckError {
    /// The input shape is wrong; the offending statement, if any, is the last one
    #[error("Precondition violated: {reason}")]
    PreconditionViolation {
        reason: String,
        index: Option<usize>,
        kind: Option<StatementKind>,
        object: Option<String>,
    },

    #[error("Statement #{index} ({kind} {object}): {source}")]
    Statement {
        index: usize,
        kind: StatementKind,
        object: String,
        #[source]
        source: CatalogError,
    },

    #[error("Statement #{index}: unsupported statement kind '{keyword}'")]
    UnsupportedStatementKind {
        index: usize,
        keyword: String,
        object: Option<String>,
    },

    #[error("Statement #{index} (ALTER TABLE {object}): alteration produced no change to classify")]
    ClassifierInconsistency { index: usize, object: String },
}

impl PrecheckError {
    /// A precondition failure not tied to any statement
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            reason: reason.into(),
            index: None,
            kind: None,
            object: None,
        }
    }

    /// Stable diagnostic code for this error
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::PreconditionViolation { .. } => DiagnosticCode::PreconditionViolation,
            Self::Statement { source, .. } => source.code(),
            Self::UnsupportedStatementKind { .. } => DiagnosticCode::UnsupportedStatementKind,
            Self::ClassifierInconsistency { .. } => DiagnosticCode::ClassifierInconsistency,
        }
    }

    /// Index of the failing statement, if the failure belongs to one
    pub fn statement_index(&self) -> Option<usize> {
        match self {
            Self::PreconditionViolation { index, .. } => *index,
            Self::Statement { index, .. }
            | Self::UnsupportedStatementKind { index, .. }
            | Self::ClassifierInconsistency { index, .. } => Some(*index),
        }
    }

    /// Convert to a report diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::new(self.code(), Severity::Error, self.to_string());
        let location = match self {
            Self::PreconditionViolation {
                index: Some(index),
                object: Some(object),
                ..
            } => Location::new(*index, object.clone()),
            Self::PreconditionViolation { .. } => return diagnostic,
            Self::Statement { index, object, .. } | Self::ClassifierInconsistency { index, object } => {
                Location::new(*index, object.clone())
            }
            Self::UnsupportedStatementKind { index, keyword, object } => {
                Location::new(*index, object.as_deref().unwrap_or(keyword))
            }
        };
        diagnostic.with_location(location)
    }
}
