//! SQL parsing using sqlparser's MySQL dialect
//!
//! Parses DDL text into an AST and provides error handling with diagnostics.

use crate::lower::{lower_statements, LowerError};
use ddlguard_core::{Diagnostic, DiagnosticCode, Severity};
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, MySqlDialect};
use sqlparser::keywords::Keyword;
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::{Token, Tokenizer};
use std::path::Path;

/// SQL parser with configurable dialect
pub struct SqlParser {
    dialect: Box<dyn Dialect>,
}

impl SqlParser {
    /// Create a parser for MySQL-compatible DDL
    pub fn new() -> Self {
        Self::with_dialect(Box::new(MySqlDialect {}))
    }

    pub fn with_dialect(dialect: Box<dyn Dialect>) -> Self {
        Self { dialect }
    }

    /// Parse SQL string into AST
    ///
    /// Empty input and input containing NUL bytes are rejected before the
    /// parser runs.
    pub fn parse(&self, sql: &str, file_path: Option<&Path>) -> Result<ParsedSql, ParseError> {
        let file_path = file_path.map(|p| p.to_path_buf());
        let invalid = |reason: &str| ParseError {
            kind: ParseErrorKind::InvalidInput,
            error: ParserError::ParserError(reason.to_string()),
            file_path: file_path.clone(),
        };

        if sql.trim().is_empty() {
            return Err(invalid("input is empty"));
        }
        if sql.contains('\0') {
            return Err(invalid("input contains a NUL byte"));
        }

        let result = self
            .preprocess(sql)
            .and_then(|sql| Parser::parse_sql(&*self.dialect, &sql));

        match result {
            Ok(statements) => Ok(ParsedSql {
                sql: sql.to_string(),
                statements,
                file_path,
            }),
            Err(error) => Err(ParseError {
                kind: ParseErrorKind::Syntax,
                error,
                file_path,
            }),
        }
    }

    /// Rewrite `ALTER TABLE ... DROP {INDEX|KEY} name` as `DROP CONSTRAINT name`
    ///
    /// The parser only understands the constraint spelling. Input without
    /// such a clause is returned unchanged.
    fn preprocess(&self, sql: &str) -> Result<String, ParserError> {
        let mut tokens = Tokenizer::new(&*self.dialect, sql).tokenize()?;
        let mut in_alter = false;
        let mut after_drop = false;
        let mut rewritten = false;

        for token in tokens.iter_mut() {
            match token {
                Token::Whitespace(_) => continue,
                Token::SemiColon => in_alter = false,
                Token::Word(word) if word.quote_style.is_none() => match word.keyword {
                    Keyword::ALTER => in_alter = true,
                    Keyword::INDEX | Keyword::KEY if in_alter && after_drop => {
                        *token = Token::make_keyword("CONSTRAINT");
                        rewritten = true;
                    }
                    _ => {}
                },
                _ => {}
            }
            after_drop = matches!(token, Token::Word(word) if word.keyword == Keyword::DROP);
        }

        if !rewritten {
            return Ok(sql.to_string());
        }
        Ok(tokens.iter().map(render_token).collect())
    }
}

/// Render a token so that it tokenizes back to itself
fn render_token(token: &Token) -> String {
    let escape = |s: &str, quote: char| {
        s.replace('\\', "\\\\")
            .replace(quote, &format!("{}{}", quote, quote))
    };
    match token {
        Token::SingleQuotedString(s) => format!("'{}'", escape(s, '\'')),
        Token::DoubleQuotedString(s) => format!("\"{}\"", escape(s, '"')),
        other => other.to_string(),
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Successfully parsed SQL with AST
#[derive(Debug, Clone)]
pub struct ParsedSql {
    /// Original SQL string
    pub sql: String,

    /// Parsed statements
    pub statements: Vec<Statement>,

    /// Source file path (if parsed from file)
    pub file_path: Option<std::path::PathBuf>,
}

impl ParsedSql {
    /// Count the number of statements
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// Lower the AST into precheck statements
    pub fn lower(&self) -> Result<Vec<ddlguard_core::Statement>, LowerError> {
        lower_statements(&self.statements)
    }
}

/// Why parsing failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input rejected before parsing (empty or containing NUL bytes)
    InvalidInput,

    /// Text is not valid SQL for the dialect
    Syntax,
}

/// SQL parsing error with diagnostic information
#[derive(Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,

    /// Parser error from sqlparser
    pub error: ParserError,

    /// Source file path
    pub file_path: Option<std::path::PathBuf>,
}

impl ParseError {
    /// Convert to a report diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(DiagnosticCode::SqlParseError, Severity::Error, self.to_string())
    }

    pub fn is_invalid_input(&self) -> bool {
        self.kind == ParseErrorKind::InvalidInput
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.kind {
            ParseErrorKind::InvalidInput => "Invalid input",
            ParseErrorKind::Syntax => "SQL parse error",
        };
        match &self.file_path {
            Some(path) => write!(f, "{} in {}: {}", prefix, path.display(), self.error),
            None => write!(f, "{}: {}", prefix, self.error),
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_ddl() {
        let parser = SqlParser::new();
        let sql = "CREATE DATABASE d; CREATE TABLE d.t (id INT); ALTER TABLE d.t ADD COLUMN note TEXT";

        let parsed = parser.parse(sql, None).unwrap();
        assert_eq!(parsed.statement_count(), 3);
    }

    #[test]
    fn reject_invalid_input() {
        let parser = SqlParser::new();

        let error = parser.parse("   \n", None).unwrap_err();
        assert!(error.is_invalid_input());

        let error = parser.parse("ALTER TABLE d.t\0", None).unwrap_err();
        assert!(error.is_invalid_input());
        assert_eq!(error.to_diagnostic().code, DiagnosticCode::SqlParseError);
    }

    #[test]
    fn parse_invalid_sql() {
        let parser = SqlParser::new();
        let error = parser.parse("ALTER TABLE", None).unwrap_err();
        assert_eq!(error.kind, ParseErrorKind::Syntax);
        assert!(error.to_string().starts_with("SQL parse error"));
    }

    #[test]
    fn drop_index_is_rewritten() {
        let parser = SqlParser::new();
        let sql = "ALTER TABLE d.t DROP INDEX idx_a, DROP KEY idx_b, ALTER COLUMN c SET DEFAULT 'it''s'";

        let parsed = parser.parse(sql, None).unwrap();
        let rendered = parsed.statements[0].to_string();
        assert!(rendered.contains("DROP CONSTRAINT idx_a"));
        assert!(rendered.contains("DROP CONSTRAINT idx_b"));
    }

    #[test]
    fn unrelated_sql_is_untouched() {
        let parser = SqlParser::new();
        let sql = "CREATE TABLE d.t (id INT, KEY idx (id))";
        assert_eq!(parser.preprocess(sql).unwrap(), sql);
    }
}
