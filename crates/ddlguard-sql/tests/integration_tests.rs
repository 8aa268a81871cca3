//! SQL scripts through the full precheck
//!
//! ```bash
//! cargo test -p ddlguard-sql --test integration_tests
//! ```

use ddlguard_core::{DiagnosticCode, StatementKind};
use ddlguard_engine::{analyze, precheck, PrecheckError, RunOptions, Verdict};
use ddlguard_sql::{parse_statements, SqlError};
use pretty_assertions::assert_eq;

const SCHEMA: &str = "
    CREATE DATABASE shop;
    CREATE TABLE shop.users (
        id BIGINT UNSIGNED NOT NULL PRIMARY KEY,
        email VARCHAR(255) NOT NULL,
        name VARCHAR(100),
        score INT,
        status ENUM('new', 'active'),
        UNIQUE KEY uk_email (email)
    );
";

fn check(alter: &str) -> Result<Verdict, PrecheckError> {
    let statements = parse_statements(&format!("{}{}", SCHEMA, alter)).unwrap();
    precheck(&statements, &RunOptions::default())
}

// =============================================================================
// Verdicts
// =============================================================================

#[test]
fn test_safe_alterations() {
    assert_eq!(check("ALTER TABLE shop.users ADD COLUMN note TEXT"), Ok(Verdict::Safe));
    assert_eq!(check("ALTER TABLE shop.users MODIFY name VARCHAR(200)"), Ok(Verdict::Safe));
    assert_eq!(check("ALTER TABLE shop.users MODIFY score BIGINT"), Ok(Verdict::Safe));
    assert_eq!(
        check("ALTER TABLE shop.users MODIFY status ENUM('new', 'active', 'banned')"),
        Ok(Verdict::Safe)
    );
    assert_eq!(check("ALTER TABLE shop.users ADD INDEX idx_name (name)"), Ok(Verdict::Safe));
    assert_eq!(check("ALTER TABLE shop.users RENAME COLUMN name TO full_name"), Ok(Verdict::Safe));
}

#[test]
fn test_lossy_alterations() {
    assert_eq!(check("ALTER TABLE shop.users MODIFY name VARCHAR(10)"), Ok(Verdict::Lossy));
    assert_eq!(check("ALTER TABLE shop.users MODIFY score SMALLINT"), Ok(Verdict::Lossy));
    assert_eq!(check("ALTER TABLE shop.users MODIFY score INT UNSIGNED"), Ok(Verdict::Lossy));
    assert_eq!(check("ALTER TABLE shop.users MODIFY status ENUM('active', 'new')"), Ok(Verdict::Lossy));
    assert_eq!(check("ALTER TABLE shop.users DROP COLUMN name"), Ok(Verdict::Lossy));
    assert_eq!(check("ALTER TABLE shop.users DROP INDEX uk_email"), Ok(Verdict::Lossy));
    assert_eq!(check("ALTER TABLE shop.users MODIFY name VARCHAR(100) NOT NULL"), Ok(Verdict::Lossy));
}

#[test]
fn test_text_targets_measure_bytes() {
    // 100 utf8mb4 characters need up to 400 bytes
    assert_eq!(check("ALTER TABLE shop.users MODIFY name TINYTEXT"), Ok(Verdict::Lossy));
    assert_eq!(check("ALTER TABLE shop.users MODIFY name TEXT"), Ok(Verdict::Safe));
}

#[test]
fn test_findings_are_located() {
    let sql = format!("{}ALTER TABLE shop.users DROP COLUMN email", SCHEMA);
    let statements = parse_statements(&sql).unwrap();
    let analysis = analyze(&statements, &RunOptions::default());

    assert_eq!(analysis.result, Ok(Verdict::Lossy));
    let codes: Vec<_> = analysis.findings.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![DiagnosticCode::LossyIndexedColumnDropped]);

    let location = analysis.findings[0].location.as_ref().unwrap();
    assert_eq!(location.statement, 2);
    assert_eq!(location.to_string(), "statement #2 (shop.users.email)");
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_unknown_column() {
    let err = check("ALTER TABLE shop.users MODIFY ghost INT").unwrap_err();
    assert_eq!(err.code(), DiagnosticCode::UnknownColumn);
    assert_eq!(err.statement_index(), Some(2));
}

#[test]
fn test_unsupported_statement_in_script() {
    let sql = format!("{}DROP TABLE shop.users; ALTER TABLE shop.users DROP PRIMARY KEY", SCHEMA);
    let statements = parse_statements(&sql).unwrap();
    assert_eq!(statements[2].kind(), StatementKind::Unsupported);

    let err = precheck(&statements, &RunOptions::default()).unwrap_err();
    assert_eq!(
        err,
        PrecheckError::UnsupportedStatementKind {
            index: 2,
            keyword: "DROP TABLE".into(),
            object: Some("shop.users".into()),
        }
    );
    assert_eq!(err.to_diagnostic().location.unwrap().object, "shop.users");
}

#[test]
fn test_script_must_end_with_alter() {
    let statements = parse_statements(SCHEMA).unwrap();
    let err = precheck(&statements, &RunOptions::default()).unwrap_err();
    assert_eq!(err.code(), DiagnosticCode::PreconditionViolation);
    assert_eq!(err.statement_index(), Some(1));
    assert!(matches!(
        err,
        PrecheckError::PreconditionViolation { kind: Some(StatementKind::CreateTable), .. }
    ));
}

#[test]
fn test_syntax_errors() {
    let err = parse_statements("ALTER TABLE shop.users MODIFY").unwrap_err();
    assert!(matches!(err, SqlError::Parse(_)));
    assert_eq!(err.to_diagnostic().code, DiagnosticCode::SqlParseError);

    assert!(matches!(parse_statements(""), Err(SqlError::Parse(e)) if e.is_invalid_input()));
}
