//! Diagnostic codes and error reporting
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    /// Length, precision, scale or integer width decreased
    LossyTypeNarrowed,

    /// Type changed to a different storage representation
    LossyTypeIncompatible,

    /// Integer or decimal signedness toggled
    LossySignednessChanged,

    /// DECIMAL precision or scale changed
    LossyDecimalChanged,

    /// Fixed-length BINARY changed length
    LossyBinaryLengthChanged,

    /// ENUM/SET members removed, renamed or reordered
    LossyMembersChanged,

    /// CHAR converted to VARCHAR or back
    LossyCharVarcharConversion,

    /// Nullable column made NOT NULL without a default
    LossyNotNullWithoutDefault,

    /// Character set changed to a non-superset encoding
    LossyCharsetChanged,

    /// Collation changed to one with a different ordering
    LossyCollationChanged,

    /// Column dropped
    LossyColumnDropped,

    /// Column referenced by an index dropped
    LossyIndexedColumnDropped,

    /// Unique or primary index dropped
    LossyUniqueIndexDropped,

    /// Primary key added over a nullable column
    LossyPrimaryKeyOnNullable,

    /// Input does not end with ALTER TABLE or is empty
    PreconditionViolation,

    /// Referenced database does not exist
    UnknownDatabase,

    /// Referenced table does not exist
    UnknownTable,

    /// Referenced column does not exist
    UnknownColumn,

    /// Referenced index does not exist
    UnknownIndex,

    /// Database, table, column or index already exists
    DuplicateDefinition,

    /// Definition rejected by the catalog
    InvalidDefinition,

    /// Statement kind outside CREATE DATABASE / CREATE TABLE / ALTER TABLE
    UnsupportedStatementKind,

    /// ALTER TABLE produced no change to classify
    ClassifierInconsistency,

    /// SQL text could not be parsed
    SqlParseError,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LossyTypeNarrowed => "LOSSY_TYPE_NARROWED",
            Self::LossyTypeIncompatible => "LOSSY_TYPE_INCOMPATIBLE",
            Self::LossySignednessChanged => "LOSSY_SIGNEDNESS_CHANGED",
            Self::LossyDecimalChanged => "LOSSY_DECIMAL_CHANGED",
            Self::LossyBinaryLengthChanged => "LOSSY_BINARY_LENGTH_CHANGED",
            Self::LossyMembersChanged => "LOSSY_MEMBERS_CHANGED",
            Self::LossyCharVarcharConversion => "LOSSY_CHAR_VARCHAR_CONVERSION",
            Self::LossyNotNullWithoutDefault => "LOSSY_NOT_NULL_WITHOUT_DEFAULT",
            Self::LossyCharsetChanged => "LOSSY_CHARSET_CHANGED",
            Self::LossyCollationChanged => "LOSSY_COLLATION_CHANGED",
            Self::LossyColumnDropped => "LOSSY_COLUMN_DROPPED",
            Self::LossyIndexedColumnDropped => "LOSSY_INDEXED_COLUMN_DROPPED",
            Self::LossyUniqueIndexDropped => "LOSSY_UNIQUE_INDEX_DROPPED",
            Self::LossyPrimaryKeyOnNullable => "LOSSY_PRIMARY_KEY_ON_NULLABLE",
            Self::PreconditionViolation => "PRECONDITION_VIOLATION",
            Self::UnknownDatabase => "UNKNOWN_DATABASE",
            Self::UnknownTable => "UNKNOWN_TABLE",
            Self::UnknownColumn => "UNKNOWN_COLUMN",
            Self::UnknownIndex => "UNKNOWN_INDEX",
            Self::DuplicateDefinition => "DUPLICATE_DEFINITION",
            Self::InvalidDefinition => "INVALID_DEFINITION",
            Self::UnsupportedStatementKind => "UNSUPPORTED_STATEMENT_KIND",
            Self::ClassifierInconsistency => "CLASSIFIER_INCONSISTENCY",
            Self::SqlParseError => "SQL_PARSE_ERROR",
        }
    }

    /// Whether the code describes a lossy change rather than a failure
    pub fn is_lossy(&self) -> bool {
        self.as_str().starts_with("LOSSY_")
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - blocking issue that should fail the gate
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Where in the input a diagnostic originates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Zero-based statement index
    pub statement: usize,

    /// Qualified object name (table, database or statement keyword)
    pub object: String,

    /// Column or index within the object, when relevant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Location {
    pub fn new(statement: usize, object: impl Into<String>) -> Self {
        Self {
            statement,
            object: object.into(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "statement #{} ({}", self.statement, self.object)?;
        if let Some(subject) = &self.subject {
            write!(f, ".{}", subject)?;
        }
        write!(f, ")")
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Statement location (best-effort)
    pub location: Option<Location>,

    /// Definition before the change
    pub before: Option<String>,

    /// Definition after the change
    pub after: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            before: None,
            after: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set before/after definitions
    pub fn with_comparison(mut self, before: impl Into<String>, after: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self.after = Some(after.into());
        self
    }
}
