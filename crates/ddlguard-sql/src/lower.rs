//! Lowering from the sqlparser AST to precheck statements
//!
//! Only CREATE DATABASE (and its CREATE SCHEMA synonym), CREATE TABLE and
//! ALTER TABLE are lowered structurally. Every other statement becomes
//! [`Statement::Unsupported`] carrying its leading keywords, so the engine
//! can reject it at the right position. Column types are lowered through
//! their SQL spelling.

use ddlguard_core::{
    AlterAction, AlterTable, Column, ColumnDef, ColumnPosition, ColumnType, CreateDatabase,
    CreateTable, Diagnostic, DiagnosticCode, IndexDef, ObjectName, Severity, Statement,
    TypeParseError,
};
use sqlparser::ast::{
    self, AlterColumnOperation, AlterTableOperation, ColumnOption, DataType, Ident,
    MySQLColumnPosition, SchemaName, TableConstraint,
};
use thiserror::Error;

/// Errors raised while lowering a parsed statement
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LowerError {
    #[error("Statement #{index}: unsupported type '{spelling}' for column '{column}': {source}")]
    UnsupportedType {
        index: usize,
        column: String,
        spelling: String,
        #[source]
        source: TypeParseError,
    },

    #[error("Statement #{index}: invalid object name '{name}'")]
    InvalidName { index: usize, name: String },

    #[error("Statement #{index}: unsupported ALTER TABLE operation: {operation}")]
    UnsupportedOperation { index: usize, operation: String },
}

impl LowerError {
    pub fn statement_index(&self) -> usize {
        match self {
            Self::UnsupportedType { index, .. }
            | Self::InvalidName { index, .. }
            | Self::UnsupportedOperation { index, .. } => *index,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(DiagnosticCode::SqlParseError, Severity::Error, self.to_string())
    }
}

/// Lower every statement, stopping at the first one that cannot be expressed
pub fn lower_statements(statements: &[ast::Statement]) -> Result<Vec<Statement>, LowerError> {
    statements
        .iter()
        .enumerate()
        .map(|(index, statement)| lower_statement(index, statement))
        .collect()
}

/// Lower a single statement found at position `index`
pub fn lower_statement(index: usize, statement: &ast::Statement) -> Result<Statement, LowerError> {
    let lowered = match statement {
        ast::Statement::CreateDatabase {
            db_name,
            if_not_exists,
            ..
        } => Statement::CreateDatabase(CreateDatabase {
            if_not_exists: *if_not_exists,
            ..CreateDatabase::new(database_name(index, db_name)?)
        }),

        ast::Statement::CreateSchema {
            schema_name: SchemaName::Simple(name),
            if_not_exists,
            ..
        } => Statement::CreateDatabase(CreateDatabase {
            if_not_exists: *if_not_exists,
            ..CreateDatabase::new(database_name(index, name)?)
        }),

        ast::Statement::CreateTable(create) => {
            let mut columns = Vec::with_capacity(create.columns.len());
            for column in &create.columns {
                columns.push(lower_column(
                    index,
                    &column.name,
                    &column.data_type,
                    column.collation.as_ref(),
                    column.options.iter().map(|def| &def.option),
                )?);
            }

            Statement::CreateTable(CreateTable {
                name: object_name(index, &create.name)?,
                if_not_exists: create.if_not_exists,
                columns,
                indexes: create.constraints.iter().filter_map(lower_constraint).collect(),
                charset: create.default_charset.clone(),
                collation: create.collation.clone(),
            })
        }

        ast::Statement::AlterTable {
            name, operations, ..
        } => {
            let actions = operations
                .iter()
                .map(|operation| lower_operation(index, operation))
                .collect::<Result<Vec<_>, _>>()?;
            Statement::AlterTable(AlterTable::new(object_name(index, name)?, actions))
        }

        other => Statement::Unsupported {
            keyword: leading_keyword(other),
            object: target_object(other).and_then(|name| object_name(index, name).ok()),
        },
    };

    tracing::trace!(statement = index, kind = %lowered.kind(), "lowered statement");
    Ok(lowered)
}

fn lower_operation(index: usize, operation: &AlterTableOperation) -> Result<AlterAction, LowerError> {
    let action = match operation {
        AlterTableOperation::AddColumn {
            column_def,
            column_position,
            ..
        } => AlterAction::AddColumn {
            column: lower_column(
                index,
                &column_def.name,
                &column_def.data_type,
                column_def.collation.as_ref(),
                column_def.options.iter().map(|def| &def.option),
            )?,
            position: column_position.as_ref().map(lower_position),
        },

        AlterTableOperation::DropColumn { column_name, .. } => AlterAction::DropColumn {
            name: column_name.value.clone(),
        },

        AlterTableOperation::ModifyColumn {
            col_name,
            data_type,
            options,
            column_position,
            ..
        } => AlterAction::ModifyColumn {
            column: lower_column(index, col_name, data_type, None, options.iter())?,
            position: column_position.as_ref().map(lower_position),
        },

        AlterTableOperation::ChangeColumn {
            old_name,
            new_name,
            data_type,
            options,
            column_position,
            ..
        } => AlterAction::ChangeColumn {
            old_name: old_name.value.clone(),
            column: lower_column(index, new_name, data_type, None, options.iter())?,
            position: column_position.as_ref().map(lower_position),
        },

        AlterTableOperation::RenameColumn {
            old_column_name,
            new_column_name,
            ..
        } => AlterAction::RenameColumn {
            old_name: old_column_name.value.clone(),
            new_name: new_column_name.value.clone(),
        },

        AlterTableOperation::RenameTable { table_name } => AlterAction::RenameTable {
            new_name: object_name(index, table_name)?,
        },

        AlterTableOperation::AlterColumn { column_name, op } => {
            let column = column_name.value.clone();
            match op {
                AlterColumnOperation::SetNotNull => AlterAction::SetNotNull { column },
                AlterColumnOperation::DropNotNull => AlterAction::DropNotNull { column },
                AlterColumnOperation::SetDefault { value } => AlterAction::SetDefault {
                    column,
                    default: value.to_string(),
                },
                AlterColumnOperation::DropDefault => AlterAction::DropDefault { column },
                other => {
                    return Err(LowerError::UnsupportedOperation {
                        index,
                        operation: format!("ALTER COLUMN {} {}", column, other),
                    })
                }
            }
        }

        AlterTableOperation::AddConstraint(constraint) => match lower_constraint(constraint) {
            Some(index_def) => AlterAction::AddIndex(index_def),
            None => return Err(unsupported(index, operation)),
        },

        // `DROP INDEX` and `DROP KEY` arrive here after preprocessing
        AlterTableOperation::DropConstraint { name, .. } => AlterAction::DropIndex {
            name: name.value.clone(),
        },

        AlterTableOperation::DropPrimaryKey => AlterAction::DropPrimaryKey,

        _ => return Err(unsupported(index, operation)),
    };
    Ok(action)
}

fn unsupported(index: usize, operation: &AlterTableOperation) -> LowerError {
    LowerError::UnsupportedOperation {
        index,
        operation: operation.to_string(),
    }
}

fn lower_column<'a>(
    index: usize,
    name: &Ident,
    data_type: &DataType,
    collation: Option<&ast::ObjectName>,
    options: impl Iterator<Item = &'a ColumnOption>,
) -> Result<ColumnDef, LowerError> {
    let spelling = data_type.to_string();
    let column_type: ColumnType = spelling.parse().map_err(|source| LowerError::UnsupportedType {
        index,
        column: name.value.clone(),
        spelling: spelling.clone(),
        source,
    })?;

    let mut def = ColumnDef::new(Column::new(name.value.clone(), column_type));
    def.column.collation = collation.map(|c| c.to_string());

    for option in options {
        match option {
            ColumnOption::Null => def.column.nullable = true,
            ColumnOption::NotNull => def.column.nullable = false,
            ColumnOption::Default(expr) => def.column.default = Some(expr.to_string()),
            ColumnOption::Unique { is_primary: true, .. } => def.primary_key = true,
            ColumnOption::Unique { is_primary: false, .. } => def.unique = true,
            ColumnOption::CharacterSet(charset) => def.column.charset = Some(charset.to_string()),
            // Comments, checks, references and generation clauses do not
            // affect stored data
            _ => {}
        }
    }
    Ok(def)
}

fn lower_position(position: &MySQLColumnPosition) -> ColumnPosition {
    match position {
        MySQLColumnPosition::First => ColumnPosition::First,
        MySQLColumnPosition::After(column) => ColumnPosition::After(column.value.clone()),
    }
}

/// Index-bearing constraints; checks and foreign keys yield `None`
fn lower_constraint(constraint: &TableConstraint) -> Option<IndexDef> {
    let names = |columns: &[Ident]| columns.iter().map(|c| c.value.clone()).collect::<Vec<_>>();

    match constraint {
        TableConstraint::PrimaryKey { columns, .. } => Some(IndexDef::primary(names(columns))),
        TableConstraint::Unique {
            name,
            index_name,
            columns,
            ..
        } => {
            let name = index_name.as_ref().or(name.as_ref()).map(|n| n.value.clone());
            Some(IndexDef::new(name, names(columns)).unique())
        }
        TableConstraint::Index { name, columns, .. } => Some(IndexDef::new(
            name.as_ref().map(|n| n.value.clone()),
            names(columns),
        )),
        TableConstraint::FulltextOrSpatial {
            opt_index_name,
            columns,
            ..
        } => Some(IndexDef::new(
            opt_index_name.as_ref().map(|n| n.value.clone()),
            names(columns),
        )),
        _ => None,
    }
}

fn object_name(index: usize, name: &ast::ObjectName) -> Result<ObjectName, LowerError> {
    match name.0.as_slice() {
        [table] => Ok(ObjectName::bare(table.value.clone())),
        [database, table] => Ok(ObjectName::qualified(database.value.clone(), table.value.clone())),
        _ => Err(LowerError::InvalidName {
            index,
            name: name.to_string(),
        }),
    }
}

fn database_name(index: usize, name: &ast::ObjectName) -> Result<String, LowerError> {
    match name.0.as_slice() {
        [database] => Ok(database.value.clone()),
        _ => Err(LowerError::InvalidName {
            index,
            name: name.to_string(),
        }),
    }
}

/// Object named by a statement that is not lowered structurally
fn target_object(statement: &ast::Statement) -> Option<&ast::ObjectName> {
    match statement {
        ast::Statement::Drop { names, .. } => names.first(),
        ast::Statement::Truncate { table_names, .. } => table_names.first().map(|target| &target.name),
        ast::Statement::CreateIndex(create) => Some(&create.table_name),
        ast::Statement::CreateView { name, .. } => Some(name),
        _ => None,
    }
}

/// `DROP TABLE`, `INSERT`, `CREATE INDEX` ...
fn leading_keyword(statement: &ast::Statement) -> String {
    let sql = statement.to_string();
    let mut words = sql.split_whitespace().map(|w| w.to_ascii_uppercase());

    let Some(first) = words.next() else {
        return String::new();
    };
    match first.as_str() {
        "CREATE" | "DROP" | "ALTER" | "TRUNCATE" | "RENAME" => match words.next() {
            Some(second) => format!("{} {}", first, second),
            None => first,
        },
        _ => first,
    }
}
