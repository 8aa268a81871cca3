//! End-to-end precheck scenarios
//!
//! ```bash
//! cargo test -p ddlguard-engine --test integration_tests
//! ```

use ddlguard_catalog::CatalogError;
use ddlguard_core::{
    AlterAction, AlterTable, Column, ColumnDef, ColumnType, CreateDatabase, CreateTable,
    DiagnosticCode, IndexDef, ObjectName, Outcome, Statement, StatementKind, TypeKind,
};
use ddlguard_engine::{analyze, precheck, PrecheckError, RunOptions, Verdict};
use pretty_assertions::assert_eq;

// =============================================================================
// Helper Functions
// =============================================================================

fn t() -> ObjectName {
    ObjectName::qualified("d", "t")
}

fn create_db() -> Statement {
    Statement::CreateDatabase(CreateDatabase::new("d"))
}

/// `CREATE TABLE d.t (id INT, name VARCHAR(20))`
fn create_t() -> Statement {
    Statement::CreateTable(CreateTable::new(
        t(),
        vec![
            ColumnDef::new(Column::new("id", ColumnType::new(TypeKind::Int))),
            ColumnDef::new(Column::new("name", ColumnType::varchar(20))),
        ],
    ))
}

fn alter_t(actions: Vec<AlterAction>) -> Statement {
    Statement::AlterTable(AlterTable::new(t(), actions))
}

fn modify(column: Column) -> AlterAction {
    AlterAction::ModifyColumn {
        column: ColumnDef::new(column),
        position: None,
    }
}

fn run(statements: &[Statement]) -> Result<Verdict, PrecheckError> {
    precheck(statements, &RunOptions::default())
}

fn finding_codes(statements: &[Statement]) -> Vec<DiagnosticCode> {
    analyze(statements, &RunOptions::default())
        .findings
        .iter()
        .map(|d| d.code)
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_narrowing_varchar_is_lossy() {
    let statements = vec![
        create_db(),
        create_t(),
        alter_t(vec![modify(Column::new("name", ColumnType::varchar(5)))]),
    ];
    assert_eq!(run(&statements), Ok(Verdict::Lossy));
    assert_eq!(finding_codes(&statements), vec![DiagnosticCode::LossyTypeNarrowed]);
}

#[test]
fn test_adding_nullable_column_is_safe() {
    let statements = vec![
        create_db(),
        Statement::CreateTable(CreateTable::new(
            t(),
            vec![ColumnDef::new(Column::new("id", ColumnType::new(TypeKind::Int)))],
        )),
        alter_t(vec![AlterAction::AddColumn {
            column: ColumnDef::new(Column::new("note", ColumnType::varchar(100))),
            position: None,
        }]),
    ];
    assert_eq!(run(&statements), Ok(Verdict::Safe));
}

#[test]
fn test_create_table_without_database() {
    let statements = vec![create_t(), alter_t(vec![AlterAction::DropPrimaryKey])];
    let err = run(&statements).unwrap_err();

    assert_eq!(
        err,
        PrecheckError::Statement {
            index: 0,
            kind: StatementKind::CreateTable,
            object: "d.t".into(),
            source: CatalogError::UnknownDatabase("d".into()),
        }
    );
    assert_eq!(err.code(), DiagnosticCode::UnknownDatabase);
}

#[test]
fn test_last_statement_must_alter() {
    let statements = vec![create_db(), create_t()];
    assert_eq!(
        run(&statements),
        Err(PrecheckError::PreconditionViolation {
            reason: "last statement must be ALTER TABLE, found CREATE TABLE".into(),
            index: Some(1),
            kind: Some(StatementKind::CreateTable),
            object: Some("d.t".into()),
        })
    );
    assert_eq!(run(&[]), Err(PrecheckError::precondition("statement list is empty")));

    let analysis = analyze(&statements, &RunOptions::default());
    assert_eq!(analysis.summary.statements, 2);
    assert_eq!(analysis.summary.statements_applied, 0);
}

#[test]
fn test_dropping_uniquely_indexed_column() {
    let statements = vec![
        create_db(),
        Statement::CreateTable(
            CreateTable::new(
                t(),
                vec![
                    ColumnDef::new(Column::new("id", ColumnType::new(TypeKind::Int))),
                    ColumnDef::new(Column::new("email", ColumnType::varchar(255))),
                ],
            )
            .with_indexes(vec![IndexDef::new(Some("uk_email".into()), vec!["email".into()]).unique()]),
        ),
        alter_t(vec![AlterAction::DropColumn { name: "email".into() }]),
    ];

    let analysis = analyze(&statements, &RunOptions::default());
    assert_eq!(analysis.result, Ok(Verdict::Lossy));
    assert_eq!(analysis.findings[0].code, DiagnosticCode::LossyIndexedColumnDropped);
    assert!(analysis.findings[0].message.contains("uk_email"));
}

#[test]
fn test_identical_runs_are_deterministic() {
    let statements = vec![
        create_db(),
        create_t(),
        alter_t(vec![
            modify(Column::new("name", ColumnType::varchar(5))),
            AlterAction::DropColumn { name: "id".into() },
        ]),
    ];

    let first = analyze(&statements, &RunOptions::default());
    let second = analyze(&statements, &RunOptions::default());
    assert_eq!(first, second);
}

#[test]
fn test_collation_change_depends_on_framework() {
    let statements = vec![
        create_db(),
        create_t(),
        alter_t(vec![modify(
            Column::new("name", ColumnType::varchar(20)).with_collation("utf8mb4_general_ci"),
        )]),
    ];

    let enabled = RunOptions {
        new_collation_enabled: true,
    };
    let disabled = RunOptions {
        new_collation_enabled: false,
    };
    assert_eq!(precheck(&statements, &enabled), Ok(Verdict::Lossy));
    assert_eq!(precheck(&statements, &disabled), Ok(Verdict::Safe));
}

// =============================================================================
// Accumulation and fail-fast
// =============================================================================

#[test]
fn test_verdict_is_or_across_alters() {
    let statements = vec![
        create_db(),
        create_t(),
        alter_t(vec![modify(Column::new("name", ColumnType::varchar(5)))]),
        alter_t(vec![AlterAction::AddColumn {
            column: ColumnDef::new(Column::new("note", ColumnType::new(TypeKind::Text))),
            position: None,
        }]),
    ];

    let analysis = analyze(&statements, &RunOptions::default());
    assert_eq!(analysis.result, Ok(Verdict::Lossy));
    assert_eq!(analysis.summary.alter_statements, 2);
    assert_eq!(analysis.summary.statements_applied, 4);
    assert_eq!(analysis.findings[0].location.as_ref().unwrap().statement, 2);
}

#[test]
fn test_later_alters_observe_earlier_ones() {
    let statements = vec![
        create_db(),
        create_t(),
        alter_t(vec![modify(Column::new("name", ColumnType::varchar(50)))]),
        alter_t(vec![modify(Column::new("name", ColumnType::varchar(30)))]),
    ];
    assert_eq!(finding_codes(&statements), vec![DiagnosticCode::LossyTypeNarrowed]);
}

#[test]
fn test_unsupported_statement_fails_fast() {
    let statements = vec![
        create_db(),
        Statement::Unsupported {
            keyword: "DROP TABLE".into(),
            object: Some(t()),
        },
        create_t(),
        alter_t(vec![AlterAction::DropPrimaryKey]),
    ];

    let analysis = analyze(&statements, &RunOptions::default());
    assert_eq!(
        analysis.result,
        Err(PrecheckError::UnsupportedStatementKind {
            index: 1,
            keyword: "DROP TABLE".into(),
            object: Some("d.t".into()),
        })
    );
    assert_eq!(analysis.summary.statements_applied, 1);
}

#[test]
fn test_leading_unsupported_statement() {
    let statements = vec![
        Statement::Unsupported {
            keyword: "DROP TABLE".into(),
            object: None,
        },
        alter_t(vec![AlterAction::DropPrimaryKey]),
    ];

    let err = run(&statements).unwrap_err();
    assert_eq!(
        err,
        PrecheckError::UnsupportedStatementKind {
            index: 0,
            keyword: "DROP TABLE".into(),
            object: None,
        }
    );
    assert_eq!(err.statement_index(), Some(0));
    assert_eq!(err.to_diagnostic().location.unwrap().object, "DROP TABLE");
}

#[test]
fn test_error_after_lossy_alter_wins() {
    let statements = vec![
        create_db(),
        create_t(),
        alter_t(vec![modify(Column::new("name", ColumnType::varchar(5)))]),
        alter_t(vec![AlterAction::DropColumn { name: "ghost".into() }]),
    ];

    let analysis = analyze(&statements, &RunOptions::default());
    assert!(matches!(
        analysis.result,
        Err(PrecheckError::Statement {
            index: 3,
            source: CatalogError::UnknownColumn { .. },
            ..
        })
    ));

    let report = analysis.into_report();
    assert_eq!(report.outcome, Outcome::Error);
    assert_eq!(report.diagnostics.len(), 2);
    assert_eq!(report.diagnostics[1].code, DiagnosticCode::UnknownColumn);
}

#[test]
fn test_duplicate_database_is_terminal() {
    let statements = vec![create_db(), create_db(), create_t(), alter_t(vec![AlterAction::DropPrimaryKey])];
    let err = run(&statements).unwrap_err();
    assert_eq!(err.code(), DiagnosticCode::DuplicateDefinition);
    assert_eq!(err.statement_index(), Some(1));
}

// =============================================================================
// Rule coverage through the full pipeline
// =============================================================================

#[test]
fn test_safe_alterations() {
    let statements = vec![
        create_db(),
        create_t(),
        alter_t(vec![
            AlterAction::RenameColumn {
                old_name: "name".into(),
                new_name: "title".into(),
            },
            modify(Column::new("title", ColumnType::varchar(200))),
            AlterAction::AddIndex(IndexDef::new(None, vec!["title".into()])),
            AlterAction::DropIndex { name: "title".into() },
            AlterAction::SetDefault {
                column: "id".into(),
                default: "0".into(),
            },
            AlterAction::SetTableOptions {
                charset: Some("latin1".into()),
                collation: None,
            },
            AlterAction::RenameTable {
                new_name: ObjectName::qualified("d", "t2"),
            },
        ]),
    ];

    let analysis = analyze(&statements, &RunOptions::default());
    assert_eq!(analysis.result, Ok(Verdict::Safe));
    assert_eq!(analysis.summary.changes, 7);
    assert!(analysis.findings.is_empty());
}

#[test]
fn test_primary_key_rules() {
    let add_pk = vec![
        create_db(),
        create_t(),
        alter_t(vec![AlterAction::AddIndex(IndexDef::primary(vec!["id".into()]))]),
    ];
    assert_eq!(finding_codes(&add_pk), vec![DiagnosticCode::LossyPrimaryKeyOnNullable]);

    let drop_pk = vec![
        create_db(),
        Statement::CreateTable(CreateTable::new(
            t(),
            vec![
                ColumnDef::new(Column::new("id", ColumnType::new(TypeKind::Int))).primary_key(),
                ColumnDef::new(Column::new("name", ColumnType::varchar(20))),
            ],
        )),
        alter_t(vec![AlterAction::DropPrimaryKey]),
    ];
    assert_eq!(finding_codes(&drop_pk), vec![DiagnosticCode::LossyUniqueIndexDropped]);
}

#[test]
fn test_not_null_rules() {
    let statements = vec![
        create_db(),
        create_t(),
        alter_t(vec![
            AlterAction::SetNotNull { column: "id".into() },
            modify(Column::new("name", ColumnType::varchar(20)).not_null().with_default("''")),
        ]),
    ];
    assert_eq!(finding_codes(&statements), vec![DiagnosticCode::LossyNotNullWithoutDefault]);
}

#[test]
fn test_relaxing_constraints_is_safe() {
    let statements = vec![
        create_db(),
        Statement::CreateTable(CreateTable::new(
            t(),
            vec![
                ColumnDef::new(Column::new("id", ColumnType::new(TypeKind::Int))),
                ColumnDef::new(Column::new("name", ColumnType::varchar(20)).not_null().with_default("''")),
            ],
        )),
        alter_t(vec![
            AlterAction::DropNotNull { column: "name".into() },
            AlterAction::DropDefault { column: "name".into() },
        ]),
    ];

    let analysis = analyze(&statements, &RunOptions::default());
    assert_eq!(analysis.result, Ok(Verdict::Safe));
    assert_eq!(analysis.summary.changes, 2);
}

#[test]
fn test_statements_from_json() {
    let json = r#"[
        {"kind": "create_database", "name": "d"},
        {"kind": "create_table", "name": {"database": "d", "name": "t"},
         "columns": [
            {"name": "id", "type": "BIGINT UNSIGNED", "nullable": false, "primary_key": true},
            {"name": "status", "type": "ENUM('new','paid')"}
         ]},
        {"kind": "alter_table", "name": {"database": "d", "name": "t"},
         "actions": [
            {"action": "modify_column", "column": {"name": "status", "type": "ENUM('new','paid','void')"}}
         ]}
    ]"#;

    let statements: Vec<Statement> = serde_json::from_str(json).unwrap();
    assert_eq!(run(&statements), Ok(Verdict::Safe));
}
