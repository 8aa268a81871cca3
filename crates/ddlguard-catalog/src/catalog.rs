//! In-memory registry of databases and tables

use crate::descriptor::ChangeDescriptor;
use crate::editor::TableEditor;
use crate::error::{CatalogError, ObjectKind};
use ddlguard_core::collation::{self, fold_identifier, DEFAULT_CHARSET, DEFAULT_COLLATION};
use ddlguard_core::{AlterAction, AlterTable, CreateDatabase, CreateTable, ObjectName, TableSchema};
use std::collections::BTreeMap;

/// A database and the tables it owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    /// Name as first declared
    pub name: String,

    /// Default character set for new tables
    pub charset: String,

    /// Default collation for new tables
    pub collation: String,

    /// Tables keyed by folded name
    tables: BTreeMap<String, TableSchema>,
}

impl Database {
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// Schema state built up from CREATE/ALTER statements
///
/// Database, table, column and index names are compared case-insensitively
/// using the folding rule selected by `new_collation_enabled`. Every
/// operation either succeeds completely or leaves the catalog untouched.
#[derive(Debug, Clone)]
pub struct Catalog {
    databases: BTreeMap<String, Database>,
    new_collation_enabled: bool,
}

impl Catalog {
    pub fn new(new_collation_enabled: bool) -> Self {
        Self {
            databases: BTreeMap::new(),
            new_collation_enabled,
        }
    }

    pub fn new_collation_enabled(&self) -> bool {
        self.new_collation_enabled
    }

    pub fn database(&self, name: &str) -> Option<&Database> {
        self.databases.get(&self.fold(name))
    }

    fn fold(&self, name: &str) -> String {
        fold_identifier(name, self.new_collation_enabled)
    }

    fn require_database(&self, name: &str) -> Result<&Database, CatalogError> {
        self.database(name)
            .ok_or_else(|| CatalogError::UnknownDatabase(name.to_string()))
    }

    fn database_of<'a>(&self, name: &'a ObjectName) -> Result<&'a str, CatalogError> {
        name.database
            .as_deref()
            .ok_or_else(|| CatalogError::NoDatabaseSelected(name.name.clone()))
    }

    /// Register a database
    ///
    /// Returns `false` when `IF NOT EXISTS` skipped an existing database.
    pub fn create_database(&mut self, def: &CreateDatabase) -> Result<bool, CatalogError> {
        let key = self.fold(&def.name);
        if self.databases.contains_key(&key) {
            if def.if_not_exists {
                tracing::debug!(database = %def.name, "database exists, skipping");
                return Ok(false);
            }
            return Err(CatalogError::duplicate(ObjectKind::Database, &def.name));
        }

        let (charset, collation) = collation::resolve(
            def.charset.as_deref(),
            def.collation.as_deref(),
            (DEFAULT_CHARSET, DEFAULT_COLLATION),
        )?;

        tracing::debug!(database = %def.name, %charset, %collation, "created database");
        self.databases.insert(
            key,
            Database {
                name: def.name.clone(),
                charset,
                collation,
                tables: BTreeMap::new(),
            },
        );
        Ok(true)
    }

    /// Register a table with its initial columns and indexes
    ///
    /// Returns `false` when `IF NOT EXISTS` skipped an existing table.
    pub fn create_table(&mut self, def: &CreateTable) -> Result<bool, CatalogError> {
        let database_name = self.database_of(&def.name)?;
        let database = self.require_database(database_name)?;
        let table_key = self.fold(&def.name.name);

        if database.tables.contains_key(&table_key) {
            if def.if_not_exists {
                tracing::debug!(table = %def.name, "table exists, skipping");
                return Ok(false);
            }
            return Err(CatalogError::duplicate(ObjectKind::Table, def.name.to_string()));
        }

        if def.columns.is_empty() {
            return Err(CatalogError::InvalidDefinition(format!(
                "table '{}' must have at least one column",
                def.name
            )));
        }

        let (charset, collation) = collation::resolve(
            def.charset.as_deref(),
            def.collation.as_deref(),
            (&database.charset, &database.collation),
        )?;

        let mut editor = TableEditor::new(
            TableSchema {
                database: database.name.clone(),
                name: def.name.name.clone(),
                columns: Vec::with_capacity(def.columns.len()),
                indexes: Vec::new(),
                charset,
                collation,
            },
            self.new_collation_enabled,
        );

        for column in &def.columns {
            editor.add_column(column, None)?;
        }
        for index in &def.indexes {
            editor.add_index(index)?;
        }

        let table = editor.finish();
        tracing::debug!(
            table = %table.qualified_name(),
            columns = table.columns.len(),
            indexes = table.indexes.len(),
            "created table"
        );

        let database_key = self.fold(database_name);
        if let Some(database) = self.databases.get_mut(&database_key) {
            database.tables.insert(table_key, table);
        }
        Ok(true)
    }

    /// Look up a table by qualified name
    pub fn get_table(&self, name: &ObjectName) -> Result<&TableSchema, CatalogError> {
        let database = self.require_database(self.database_of(name)?)?;
        database
            .tables
            .get(&self.fold(&name.name))
            .ok_or_else(|| CatalogError::UnknownTable(name.to_string()))
    }

    /// Check that `target` can receive the table currently stored as `source`
    fn check_rename_target(
        &self,
        source: (&str, &str),
        target: &ObjectName,
    ) -> Result<(String, String), CatalogError> {
        let database_name = target.database.as_deref().unwrap_or(source.0);
        let database = self.require_database(database_name)?;
        let target_key = (self.fold(database_name), self.fold(&target.name));
        let source_key = (self.fold(source.0), self.fold(source.1));

        if target_key != source_key && database.tables.contains_key(&target_key.1) {
            return Err(CatalogError::duplicate(
                ObjectKind::Table,
                format!("{}.{}", database.name, target.name),
            ));
        }
        Ok((database.name.clone(), target.name.clone()))
    }

    /// Apply every action of an ALTER TABLE to a working copy
    ///
    /// Returns one descriptor per action in order. The stored table is
    /// replaced only when all actions succeed.
    pub fn apply_alter(&mut self, alter: &AlterTable) -> Result<Vec<ChangeDescriptor>, CatalogError> {
        let original = self.get_table(&alter.name)?;
        let source_key = (self.fold(&original.database), self.fold(&original.name));
        let mut editor = TableEditor::new(original.clone(), self.new_collation_enabled);
        let mut changes = Vec::with_capacity(alter.actions.len());

        for action in &alter.actions {
            let change = match action {
                AlterAction::AddColumn { column, position } => {
                    editor.add_column(column, position.as_ref())?
                }
                AlterAction::DropColumn { name } => editor.drop_column(name)?,
                AlterAction::ModifyColumn { column, position } => editor.change_column(
                    action.describe(),
                    &column.column.name,
                    column,
                    position.as_ref(),
                )?,
                AlterAction::ChangeColumn {
                    old_name,
                    column,
                    position,
                } => editor.change_column(action.describe(), old_name, column, position.as_ref())?,
                AlterAction::RenameColumn { old_name, new_name } => {
                    editor.rename_column(old_name, new_name)?
                }
                AlterAction::SetDefault { column, default } => editor.set_default(column, default)?,
                AlterAction::DropDefault { column } => editor.drop_default(column)?,
                AlterAction::SetNotNull { column } => editor.set_not_null(column)?,
                AlterAction::DropNotNull { column } => editor.drop_not_null(column)?,
                AlterAction::AddIndex(index) => editor.add_index(index)?,
                AlterAction::DropIndex { name } => editor.drop_index(name)?,
                AlterAction::DropPrimaryKey => editor.drop_primary_key()?,
                AlterAction::RenameTable { new_name } => {
                    let current = editor.table();
                    let (database, name) = self.check_rename_target(
                        (&current.database, &current.name),
                        new_name,
                    )?;
                    editor.rename(&database, &name)
                }
                AlterAction::SetTableOptions { charset, collation } => {
                    editor.set_options(charset.as_deref(), collation.as_deref())?
                }
            };
            changes.push(change);
        }

        let table = editor.finish();
        let target_key = (self.fold(&table.database), self.fold(&table.name));

        if target_key != source_key {
            // Guard against a rename into a slot claimed by an earlier action
            let occupied = self
                .databases
                .get(&target_key.0)
                .is_some_and(|db| db.tables.contains_key(&target_key.1));
            if occupied {
                return Err(CatalogError::duplicate(ObjectKind::Table, table.qualified_name()));
            }
            if let Some(database) = self.databases.get_mut(&source_key.0) {
                database.tables.remove(&source_key.1);
            }
        }

        tracing::debug!(table = %table.qualified_name(), actions = changes.len(), "altered table");
        if let Some(database) = self.databases.get_mut(&target_key.0) {
            database.tables.insert(target_key.1, table);
        }
        Ok(changes)
    }
}
