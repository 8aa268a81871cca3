//! Typed DDL statement nodes
//!
//! Statements arrive already parsed, either lowered from SQL text or
//! deserialized from JSON. The set of kinds is closed: anything other than
//! CREATE DATABASE, CREATE TABLE or ALTER TABLE is carried as
//! [`Statement::Unsupported`] so the engine can reject it with context.

use crate::schema::Column;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A possibly database-qualified object name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectName {
    /// Owning database; required for tables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Object name
    pub name: String,
}

impl ObjectName {
    /// Create a `database.name` reference
    pub fn qualified(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            name: name.into(),
        }
    }

    /// Create an unqualified reference
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            database: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(database) => write!(f, "{}.{}", database, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Column definition as written in CREATE TABLE or ALTER TABLE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    #[serde(flatten)]
    pub column: Column,

    /// Inline `PRIMARY KEY`
    #[serde(default)]
    pub primary_key: bool,

    /// Inline `UNIQUE`
    #[serde(default)]
    pub unique: bool,
}

impl ColumnDef {
    pub fn new(column: Column) -> Self {
        Self {
            column,
            primary_key: false,
            unique: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

impl From<Column> for ColumnDef {
    fn from(column: Column) -> Self {
        Self::new(column)
    }
}

/// Index definition as written in CREATE TABLE or ALTER TABLE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name; generated from the first column when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Referenced column names in key order
    pub columns: Vec<String>,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub primary: bool,
}

impl IndexDef {
    pub fn new(name: Option<String>, columns: Vec<String>) -> Self {
        Self {
            name,
            columns,
            unique: false,
            primary: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary(columns: Vec<String>) -> Self {
        Self {
            name: None,
            columns,
            unique: true,
            primary: true,
        }
    }
}

/// Placement of an added or redefined column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPosition {
    First,
    After(String),
}

/// CREATE DATABASE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDatabase {
    pub name: String,

    #[serde(default)]
    pub if_not_exists: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
}

impl CreateDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            if_not_exists: false,
            charset: None,
            collation: None,
        }
    }
}

/// CREATE TABLE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTable {
    pub name: ObjectName,

    #[serde(default)]
    pub if_not_exists: bool,

    pub columns: Vec<ColumnDef>,

    #[serde(default)]
    pub indexes: Vec<IndexDef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
}

impl CreateTable {
    pub fn new(name: ObjectName, columns: Vec<ColumnDef>) -> Self {
        Self {
            name,
            if_not_exists: false,
            columns,
            indexes: Vec::new(),
            charset: None,
            collation: None,
        }
    }

    pub fn with_indexes(mut self, indexes: Vec<IndexDef>) -> Self {
        self.indexes = indexes;
        self
    }
}

/// One sub-action of an ALTER TABLE statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AlterAction {
    AddColumn {
        column: ColumnDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<ColumnPosition>,
    },
    DropColumn {
        name: String,
    },
    /// `MODIFY [COLUMN]`: redefine a column keeping its name
    ModifyColumn {
        column: ColumnDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<ColumnPosition>,
    },
    /// `CHANGE [COLUMN]`: rename and redefine a column
    ChangeColumn {
        old_name: String,
        column: ColumnDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<ColumnPosition>,
    },
    RenameColumn {
        old_name: String,
        new_name: String,
    },
    SetDefault {
        column: String,
        default: String,
    },
    DropDefault {
        column: String,
    },
    SetNotNull {
        column: String,
    },
    DropNotNull {
        column: String,
    },
    AddIndex(IndexDef),
    DropIndex {
        name: String,
    },
    DropPrimaryKey,
    RenameTable {
        new_name: ObjectName,
    },
    /// Change the table's default character set and/or collation
    SetTableOptions {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        charset: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        collation: Option<String>,
    },
}

impl AlterAction {
    /// Short human-readable action name
    pub fn describe(&self) -> &'static str {
        match self {
            Self::AddColumn { .. } => "add column",
            Self::DropColumn { .. } => "drop column",
            Self::ModifyColumn { .. } => "modify column",
            Self::ChangeColumn { .. } => "change column",
            Self::RenameColumn { .. } => "rename column",
            Self::SetDefault { .. } => "set default",
            Self::DropDefault { .. } => "drop default",
            Self::SetNotNull { .. } => "set not null",
            Self::DropNotNull { .. } => "drop not null",
            Self::AddIndex(def) if def.primary => "add primary key",
            Self::AddIndex(_) => "add index",
            Self::DropIndex { .. } => "drop index",
            Self::DropPrimaryKey => "drop primary key",
            Self::RenameTable { .. } => "rename table",
            Self::SetTableOptions { .. } => "set table options",
        }
    }
}

/// ALTER TABLE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterTable {
    pub name: ObjectName,
    pub actions: Vec<AlterAction>,
}

impl AlterTable {
    pub fn new(name: ObjectName, actions: Vec<AlterAction>) -> Self {
        Self { name, actions }
    }
}

/// A parsed statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    CreateDatabase(CreateDatabase),
    CreateTable(CreateTable),
    AlterTable(AlterTable),
    /// Any other statement; `keyword` names it for diagnostics (`DROP TABLE`)
    Unsupported {
        keyword: String,
        /// Object the statement targets, when it names one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        object: Option<ObjectName>,
    },
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::CreateDatabase(_) => StatementKind::CreateDatabase,
            Self::CreateTable(_) => StatementKind::CreateTable,
            Self::AlterTable(_) => StatementKind::AlterTable,
            Self::Unsupported { .. } => StatementKind::Unsupported,
        }
    }

    /// Name of the object the statement targets
    pub fn object_name(&self) -> String {
        match self {
            Self::CreateDatabase(create) => create.name.clone(),
            Self::CreateTable(create) => create.name.to_string(),
            Self::AlterTable(alter) => alter.name.to_string(),
            Self::Unsupported { keyword, object } => object
                .as_ref()
                .map_or_else(|| keyword.clone(), ObjectName::to_string),
        }
    }

    pub fn is_alter_table(&self) -> bool {
        matches!(self, Self::AlterTable(_))
    }
}

/// Statement kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    CreateDatabase,
    CreateTable,
    AlterTable,
    Unsupported,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDatabase => write!(f, "CREATE DATABASE"),
            Self::CreateTable => write!(f, "CREATE TABLE"),
            Self::AlterTable => write!(f, "ALTER TABLE"),
            Self::Unsupported => write!(f, "UNSUPPORTED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnType, TypeKind};

    #[test]
    fn object_name_display() {
        assert_eq!(ObjectName::qualified("d", "t").to_string(), "d.t");
        assert_eq!(ObjectName::bare("t").to_string(), "t");
    }

    #[test]
    fn statement_json_shape() {
        let json = r#"[
            {"kind": "create_database", "name": "d"},
            {"kind": "create_table", "name": {"database": "d", "name": "t"},
             "columns": [{"name": "id", "type": "INT", "primary_key": true}]},
            {"kind": "alter_table", "name": {"database": "d", "name": "t"},
             "actions": [
                {"action": "add_column", "column": {"name": "note", "type": "VARCHAR(100)"},
                 "position": {"after": "id"}},
                {"action": "drop_primary_key"}
             ]},
            {"kind": "unsupported", "keyword": "DROP TABLE"},
            {"kind": "unsupported", "keyword": "TRUNCATE TABLE", "object": {"database": "d", "name": "t"}}
        ]"#;

        let statements: Vec<Statement> = serde_json::from_str(json).unwrap();
        assert_eq!(statements.len(), 5);
        assert_eq!(statements[0].kind(), StatementKind::CreateDatabase);

        let Statement::CreateTable(create) = &statements[1] else {
            panic!("expected CREATE TABLE");
        };
        assert!(create.columns[0].primary_key);
        assert_eq!(create.columns[0].column.column_type.kind, TypeKind::Int);

        let Statement::AlterTable(alter) = &statements[2] else {
            panic!("expected ALTER TABLE");
        };
        assert_eq!(
            alter.actions[0],
            AlterAction::AddColumn {
                column: ColumnDef::new(Column::new("note", ColumnType::varchar(100))),
                position: Some(ColumnPosition::After("id".to_string())),
            }
        );
        assert_eq!(alter.actions[1], AlterAction::DropPrimaryKey);
        assert_eq!(statements[3].object_name(), "DROP TABLE");
        assert_eq!(statements[4].object_name(), "d.t");
        assert_eq!(statements[4].kind(), StatementKind::Unsupported);
    }

    #[test]
    fn statement_json_roundtrip() {
        let stmt = Statement::AlterTable(AlterTable::new(
            ObjectName::qualified("d", "t"),
            vec![AlterAction::AddIndex(IndexDef::new(Some("idx".into()), vec!["a".into()]).unique())],
        ));

        let json = serde_json::to_string(&stmt).unwrap();
        let parsed: Statement = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stmt);
    }
}
