//! Per-run configuration and result aggregation

use crate::classifier::Classification;
use crate::error::PrecheckError;
use ddlguard_core::{Diagnostic, Location, Outcome, Report, ReportSummary};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Options fixed before the first statement is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Compare collations with the new collation framework
    ///
    /// Also selects Unicode (enabled) or ASCII-only (disabled) identifier
    /// folding.
    pub new_collation_enabled: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            new_collation_enabled: true,
        }
    }
}

/// Overall verdict of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Safe,
    Lossy,
}

impl Verdict {
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Lossy)
    }
}

impl From<bool> for Verdict {
    fn from(lossy: bool) -> Self {
        if lossy {
            Self::Lossy
        } else {
            Self::Safe
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Lossy => write!(f, "lossy"),
        }
    }
}

/// Accumulators for one precheck call
#[derive(Debug, Clone)]
pub struct RunContext {
    options: RunOptions,
    has_lossy_change: bool,
    error: Option<PrecheckError>,
    findings: Vec<Diagnostic>,
    summary: ReportSummary,
}

impl RunContext {
    pub fn new(options: RunOptions, statements: usize) -> Self {
        Self {
            options,
            has_lossy_change: false,
            error: None,
            findings: Vec::new(),
            summary: ReportSummary {
                statements,
                ..ReportSummary::default()
            },
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn has_lossy_change(&self) -> bool {
        self.has_lossy_change
    }

    pub fn error(&self) -> Option<&PrecheckError> {
        self.error.as_ref()
    }

    pub fn findings(&self) -> &[Diagnostic] {
        &self.findings
    }

    pub fn summary(&self) -> &ReportSummary {
        &self.summary
    }

    /// Count a successfully applied statement
    pub fn record_applied(&mut self) {
        self.summary.statements_applied += 1;
    }

    /// Fold the classifications of one ALTER TABLE into the run
    ///
    /// Returns whether this statement alone was lossy. The run verdict is
    /// the OR over every ALTER TABLE; later statements are still evaluated
    /// once a lossy one was seen.
    pub fn record_alter(&mut self, index: usize, classifications: Vec<Classification>) -> bool {
        self.summary.alter_statements += 1;
        self.summary.changes += classifications.len();

        let mut lossy = false;
        for classification in classifications {
            if !classification.is_lossy() {
                continue;
            }
            lossy = true;
            self.summary.lossy_changes += 1;

            let mut location = Location::new(index, classification.table);
            if let Some(subject) = classification.subject {
                location = location.with_subject(subject);
            }
            for diagnostic in classification.diagnostics {
                tracing::warn!(
                    statement = index,
                    code = diagnostic.code.as_str(),
                    "{}",
                    diagnostic.message
                );
                self.findings.push(diagnostic.with_location(location.clone()));
            }
        }

        self.has_lossy_change |= lossy;
        lossy
    }

    /// Keep the first hard error; later ones are ignored
    pub fn record_error(&mut self, error: PrecheckError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Close the run: the first error wins over any verdict
    pub fn finish(self) -> Analysis {
        let result = match self.error {
            Some(error) => Err(error),
            None => Ok(Verdict::from(self.has_lossy_change)),
        };
        Analysis {
            result,
            findings: self.findings,
            summary: self.summary,
        }
    }
}

/// Full outcome of a precheck run
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Verdict, or the first error (never both)
    pub result: Result<Verdict, PrecheckError>,

    /// Every lossy finding, located by statement, table and subject
    pub findings: Vec<Diagnostic>,

    pub summary: ReportSummary,
}

impl Analysis {
    pub fn verdict(&self) -> Option<Verdict> {
        self.result.as_ref().ok().copied()
    }

    /// Build the versioned report
    pub fn into_report(self) -> Report {
        let (outcome, error) = match &self.result {
            Ok(Verdict::Safe) => (Outcome::Safe, None),
            Ok(Verdict::Lossy) => (Outcome::Lossy, None),
            Err(error) => (Outcome::Error, Some(error)),
        };

        let mut report = Report::new(outcome).with_summary(self.summary);
        for finding in self.findings {
            report.add_diagnostic(finding);
        }
        if let Some(error) = error {
            report.error = Some(error.to_string());
            report.add_diagnostic(error.to_diagnostic());
        }
        report
    }
}
