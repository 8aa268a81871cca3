//! Report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::diagnostic::Diagnostic;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Three-way precheck outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The alteration can be applied without touching stored data
    Safe,

    /// The alteration rewrites or invalidates stored data
    Lossy,

    /// The input could not be evaluated
    Error,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Lossy => write!(f, "lossy"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Statements in the input
    pub statements: usize,

    /// Statements applied before the run finished or failed
    pub statements_applied: usize,

    /// ALTER TABLE statements evaluated
    pub alter_statements: usize,

    /// Change descriptors classified
    pub changes: usize,

    /// Change descriptors classified as lossy
    pub lossy_changes: usize,
}

/// Precheck report (report.json v1)
///
/// This is the stable output format.
/// All fields are versioned and backward-compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Overall outcome
    pub outcome: Outcome,

    /// Error message when the outcome is `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// SHA-256 of the analysed input, hex encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_digest: Option<String>,

    /// Summary statistics
    pub summary: ReportSummary,

    /// Lossy findings and the terminal error, in input order
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Create a new empty report with the given outcome
    pub fn new(outcome: Outcome) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            outcome,
            error: None,
            input_digest: None,
            summary: ReportSummary::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Create an error report for input that never reached the engine
    pub fn from_error(diagnostic: Diagnostic) -> Self {
        let mut report = Self::new(Outcome::Error);
        report.error = Some(diagnostic.message.clone());
        report.diagnostics.push(diagnostic);
        report
    }

    /// Record the digest of the raw input
    pub fn with_input(mut self, input: &[u8]) -> Self {
        use sha2::{Digest, Sha256};

        self.input_digest = Some(hex::encode(Sha256::digest(input)));
        self
    }

    pub fn with_summary(mut self, summary: ReportSummary) -> Self {
        self.summary = summary;
        self
    }

    /// Add a diagnostic to the report
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_lossy(&self) -> bool {
        self.outcome == Outcome::Lossy
    }

    /// Check if the report records a processing error
    pub fn has_errors(&self) -> bool {
        self.outcome == Outcome::Error
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}
