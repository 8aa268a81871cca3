//! Lossy change classifier
//!
//! Decides whether a single change can be applied in place or needs existing
//! rows to be rewritten (or would invalidate them). The rules follow the
//! storage engine's instant-versus-reorganise decision for column type
//! changes and extend it to nullability, charset/collation, dropped columns
//! and indexes.

use ddlguard_catalog::{Change, ChangeDescriptor, ColumnChange, IndexChange};
use ddlguard_core::collation::{is_charset_compatible, is_collation_compatible, max_bytes_per_char};
use ddlguard_core::{Column, ColumnType, Diagnostic, DiagnosticCode, Severity, TypeFamily, TypeKind};

/// Verdict for one change descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Table the change was made on
    pub table: String,

    /// Column or index the change is about
    pub subject: Option<String>,

    /// One diagnostic per lossy reason; empty when the change is safe
    pub diagnostics: Vec<Diagnostic>,
}

impl Classification {
    /// Classify one change
    pub fn classify(change: &ChangeDescriptor, new_collation_enabled: bool) -> Self {
        let diagnostics = match &change.change {
            Change::Column(column) => classify_column(column, new_collation_enabled),
            Change::Index(index) => classify_index(index),
            // Table defaults only affect columns defined later
            Change::Table(_) => Vec::new(),
        };

        Self {
            table: change.table.clone(),
            subject: change.subject().map(str::to_string),
            diagnostics,
        }
    }

    pub fn is_lossy(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Diagnostic codes of every lossy reason
    pub fn codes(&self) -> Vec<DiagnosticCode> {
        self.diagnostics.iter().map(|d| d.code).collect()
    }
}

fn lossy(code: DiagnosticCode, message: String) -> Diagnostic {
    Diagnostic::new(code, Severity::Warn, message)
}

fn classify_column(change: &ColumnChange, new_collation_enabled: bool) -> Vec<Diagnostic> {
    let (before, after) = match (&change.before, &change.after) {
        (None, _) => return Vec::new(),
        (Some(before), None) => return vec![dropped_column(before, change)],
        (Some(before), Some(after)) => (before, after),
    };

    let mut diagnostics = Vec::new();

    let widths = (char_width(before), char_width(after));
    if let Some((code, reason)) = type_change(&before.column_type, &after.column_type, widths) {
        diagnostics.push(
            lossy(code, format!("Column '{}': {}", before.name, reason))
                .with_comparison(before.column_type.to_string(), after.column_type.to_string()),
        );
    }

    if before.nullable && !after.nullable && !after.has_default() {
        diagnostics.push(
            lossy(
                DiagnosticCode::LossyNotNullWithoutDefault,
                format!(
                    "Column '{}' becomes NOT NULL without a default; existing NULL values cannot be kept",
                    after.name
                ),
            )
            .with_comparison("NULL", "NOT NULL"),
        );
    }

    if let Some(diagnostic) = charset_change(before, after, new_collation_enabled) {
        diagnostics.push(diagnostic);
    }

    diagnostics
}

fn dropped_column(before: &Column, change: &ColumnChange) -> Diagnostic {
    if change.indexes.is_empty() {
        lossy(
            DiagnosticCode::LossyColumnDropped,
            format!("Column '{}' is dropped together with its data", before.name),
        )
    } else {
        let names: Vec<&str> = change.indexes.iter().map(|i| i.name.as_str()).collect();
        lossy(
            DiagnosticCode::LossyIndexedColumnDropped,
            format!(
                "Column '{}' is dropped while referenced by index {}",
                before.name,
                names.join(", ")
            ),
        )
    }
}

fn charset_change(before: &Column, after: &Column, new_collation_enabled: bool) -> Option<Diagnostic> {
    // Kind changes into or out of string types are reported as type changes
    let (Some(from), Some(to)) = (before.charset.as_deref(), after.charset.as_deref()) else {
        return None;
    };

    if !is_charset_compatible(from, to) {
        return Some(
            lossy(
                DiagnosticCode::LossyCharsetChanged,
                format!(
                    "Column '{}' changes character set from {} to {}; stored bytes must be converted",
                    after.name, from, to
                ),
            )
            .with_comparison(from, to),
        );
    }

    let (from, to) = (before.collation.as_deref()?, after.collation.as_deref()?);
    if !is_collation_compatible(from, to, new_collation_enabled) {
        return Some(
            lossy(
                DiagnosticCode::LossyCollationChanged,
                format!(
                    "Column '{}' changes collation from {} to {}; ordering and uniqueness change",
                    after.name, from, to
                ),
            )
            .with_comparison(from, to),
        );
    }

    None
}

/// Fixed-length kinds that pad stored values
fn is_fixed_length(kind: TypeKind) -> bool {
    matches!(kind, TypeKind::Char | TypeKind::Binary)
}

fn is_variable_length(kind: TypeKind) -> bool {
    matches!(kind, TypeKind::Varchar | TypeKind::Varbinary)
}

/// Whether a member list is the old one with members appended
fn members_appended(before: &[String], after: &[String]) -> bool {
    after.len() >= before.len() && before.iter().zip(after).all(|(a, b)| a == b)
}

/// Bytes per character for a column's character set
fn char_width(column: &Column) -> u64 {
    column
        .charset
        .as_deref()
        .and_then(max_bytes_per_char)
        .unwrap_or(1)
}

/// Whether an upper bound shrinks; `None` is unbounded
fn bound_narrows<T: Ord>(from: Option<T>, to: Option<T>) -> bool {
    match (from, to) {
        (None, Some(_)) => true,
        (Some(from), Some(to)) => to < from,
        (_, None) => false,
    }
}

/// Storage limit in bytes; CHAR and VARCHAR lengths count characters
fn byte_capacity(ty: &ColumnType, char_width: u64) -> Option<u64> {
    let length = ty.effective_length()?;
    match ty.kind {
        TypeKind::Char | TypeKind::Varchar => Some(length.saturating_mul(char_width)),
        _ => Some(length),
    }
}

/// Precision or scale decrease, or a signedness toggle
fn truncation_or_sign(before: &ColumnType, after: &ColumnType) -> Option<(DiagnosticCode, String)> {
    if before.unsigned != after.unsigned {
        return Some((
            DiagnosticCode::LossySignednessChanged,
            "signedness changes".to_string(),
        ));
    }

    if bound_narrows(before.precision_bound(), after.precision_bound())
        || bound_narrows(before.scale_bound(), after.scale_bound())
    {
        return Some((
            DiagnosticCode::LossyTypeNarrowed,
            format!("type narrows from {} to {}", before, after),
        ));
    }

    None
}

/// Rule table for column type changes
///
/// Returns the lossy reason, or `None` when existing values are kept
/// byte-for-byte. `widths` are the bytes per character of the old and new
/// character sets.
fn type_change(
    before: &ColumnType,
    after: &ColumnType,
    widths: (u64, u64),
) -> Option<(DiagnosticCode, String)> {
    if before.kind == after.kind {
        return match before.family() {
            TypeFamily::Decimal => {
                let changed = before.effective_length() != after.effective_length()
                    || before.effective_scale() != after.effective_scale()
                    || before.unsigned != after.unsigned;
                changed.then(|| {
                    (
                        DiagnosticCode::LossyDecimalChanged,
                        format!("DECIMAL definition changes from {} to {}", before, after),
                    )
                })
            }
            TypeFamily::Enum | TypeFamily::Set => {
                (!members_appended(&before.members, &after.members)).then(|| {
                    (
                        DiagnosticCode::LossyMembersChanged,
                        format!("{} members removed, reordered or renamed", before.kind),
                    )
                })
            }
            TypeFamily::Integer => (before.unsigned != after.unsigned).then(|| {
                (
                    DiagnosticCode::LossySignednessChanged,
                    "signedness changes".to_string(),
                )
            }),
            _ if before.kind == TypeKind::Binary => {
                (before.effective_length() != after.effective_length()).then(|| {
                    (
                        DiagnosticCode::LossyBinaryLengthChanged,
                        format!("BINARY length changes from {} to {}; values are zero-padded", before, after),
                    )
                })
            }
            _ => truncation_or_sign(before, after),
        };
    }

    let fixed_variable_swap = (is_fixed_length(before.kind) && is_variable_length(after.kind))
        || (is_variable_length(before.kind) && is_fixed_length(after.kind));
    if fixed_variable_swap && before.family() == after.family() {
        return Some((
            DiagnosticCode::LossyCharVarcharConversion,
            format!("conversion between {} and {} changes padding", before.kind, after.kind),
        ));
    }

    match (before.family(), after.family()) {
        (TypeFamily::Text, TypeFamily::Text) | (TypeFamily::Binary, TypeFamily::Binary) => {
            let from = byte_capacity(before, widths.0);
            let to = byte_capacity(after, widths.1);
            bound_narrows(from, to).then(|| {
                (
                    DiagnosticCode::LossyTypeNarrowed,
                    format!(
                        "type narrows from {} to {} ({} to {} bytes)",
                        before,
                        after,
                        from.unwrap_or_default(),
                        to.unwrap_or_default()
                    ),
                )
            })
        }
        (TypeFamily::Integer, TypeFamily::Integer) => {
            if before.unsigned != after.unsigned {
                Some((
                    DiagnosticCode::LossySignednessChanged,
                    "signedness changes".to_string(),
                ))
            } else if after.kind.default_length() < before.kind.default_length() {
                Some((
                    DiagnosticCode::LossyTypeNarrowed,
                    format!("integer narrows from {} to {}", before.kind, after.kind),
                ))
            } else {
                None
            }
        }
        _ => Some((
            DiagnosticCode::LossyTypeIncompatible,
            format!("{} and {} use different storage representations", before.kind, after.kind),
        )),
    }
}

fn classify_index(change: &IndexChange) -> Vec<Diagnostic> {
    match (&change.before, &change.after) {
        (None, Some(index)) if index.primary => change
            .columns
            .iter()
            .filter(|c| c.nullable)
            .map(|c| {
                lossy(
                    DiagnosticCode::LossyPrimaryKeyOnNullable,
                    format!(
                        "PRIMARY KEY added over nullable column '{}'; existing NULL values violate it",
                        c.name
                    ),
                )
            })
            .collect(),
        (Some(index), None) if index.unique || index.primary => {
            let kind = if index.primary { "PRIMARY KEY" } else { "UNIQUE index" };
            vec![lossy(
                DiagnosticCode::LossyUniqueIndexDropped,
                format!("{} '{}' is dropped; uniqueness is no longer enforced", kind, index.name),
            )]
        }
        _ => Vec::new(),
    }
}
