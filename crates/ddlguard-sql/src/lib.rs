//! SQL front end
//!
//! This crate handles:
//! - Parsing MySQL-compatible DDL using sqlparser
//! - Lowering the AST into precheck statements
//! - Converting parse failures into report diagnostics

pub mod lower;
pub mod parser;

pub use lower::{lower_statement, lower_statements, LowerError};
pub use parser::{ParseError, ParseErrorKind, ParsedSql, SqlParser};

use ddlguard_core::{Diagnostic, Statement};
use thiserror::Error;

/// Either stage of turning SQL text into statements
#[derive(Debug, Error)]
pub enum SqlError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Lower(#[from] LowerError),
}

impl SqlError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Parse(e) => e.to_diagnostic(),
            Self::Lower(e) => e.to_diagnostic(),
        }
    }
}

/// Parse and lower a script in one step
pub fn parse_statements(sql: &str) -> Result<Vec<Statement>, SqlError> {
    let parsed = SqlParser::new().parse(sql, None)?;
    Ok(parsed.lower()?)
}
