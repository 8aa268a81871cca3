//! Catalog error types

use ddlguard_core::{CollationError, DiagnosticCode, TypeParseError};
use std::fmt;

/// Kind of schema object named in an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Database,
    Table,
    Column,
    Index,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => write!(f, "Database"),
            Self::Table => write!(f, "Table"),
            Self::Column => write!(f, "Column"),
            Self::Index => write!(f, "Index"),
        }
    }
}

/// Errors that can occur while mutating the catalog
///
/// A failed operation never leaves a partial mutation behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Unknown database '{0}'")]
    UnknownDatabase(String),

    #[error("No database selected for table '{0}'")]
    NoDatabaseSelected(String),

    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    #[error("Unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Unknown index '{index}' in table '{table}'")]
    UnknownIndex { table: String, index: String },

    #[error("{object} '{name}' already exists")]
    DuplicateDefinition { object: ObjectKind, name: String },

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),
}

impl CatalogError {
    /// Stable diagnostic code for this error
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::UnknownDatabase(_) | Self::NoDatabaseSelected(_) => DiagnosticCode::UnknownDatabase,
            Self::UnknownTable(_) => DiagnosticCode::UnknownTable,
            Self::UnknownColumn { .. } => DiagnosticCode::UnknownColumn,
            Self::UnknownIndex { .. } => DiagnosticCode::UnknownIndex,
            Self::DuplicateDefinition { .. } => DiagnosticCode::DuplicateDefinition,
            Self::InvalidDefinition(_) => DiagnosticCode::InvalidDefinition,
        }
    }

    pub(crate) fn duplicate(object: ObjectKind, name: impl Into<String>) -> Self {
        Self::DuplicateDefinition {
            object,
            name: name.into(),
        }
    }
}

impl From<CollationError> for CatalogError {
    fn from(error: CollationError) -> Self {
        Self::InvalidDefinition(error.to_string())
    }
}

impl From<TypeParseError> for CatalogError {
    fn from(error: TypeParseError) -> Self {
        Self::InvalidDefinition(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let err = CatalogError::duplicate(ObjectKind::Column, "id");
        assert_eq!(err.to_string(), "Column 'id' already exists");
        assert_eq!(err.code(), DiagnosticCode::DuplicateDefinition);

        let err = CatalogError::UnknownColumn {
            table: "d.t".into(),
            column: "x".into(),
        };
        assert_eq!(err.to_string(), "Unknown column 'x' in table 'd.t'");
        assert_eq!(err.code(), DiagnosticCode::UnknownColumn);
    }

    #[test]
    fn collation_errors_are_invalid_definitions() {
        let err: CatalogError = CollationError::UnknownCharset("x".into()).into();
        assert_eq!(err.code(), DiagnosticCode::InvalidDefinition);
    }
}
