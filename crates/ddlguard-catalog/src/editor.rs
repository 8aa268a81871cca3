//! Working copy of a table used while applying definitions
//!
//! Every mutation of a table goes through a [`TableEditor`]. The editor owns
//! a clone of the stored [`TableSchema`]; the catalog swaps the clone back in
//! only once every action succeeded, which makes alterations all-or-nothing.

use crate::descriptor::{Change, ChangeDescriptor, ColumnChange, IndexChange, TableChange, TableOptions};
use crate::error::{CatalogError, ObjectKind};
use ddlguard_core::collation::{self, fold_identifier};
use ddlguard_core::{Column, ColumnDef, ColumnPosition, IndexDef, Index, TableSchema, TypeFamily, TypeKind};

const MAX_DECIMAL_PRECISION: u64 = 65;
const MAX_DECIMAL_SCALE: u32 = 30;
const MAX_FSP: u32 = 6;
const MAX_FIXED_LENGTH: u64 = 255;
const MAX_BIT_LENGTH: u64 = 64;

pub(crate) struct TableEditor {
    table: TableSchema,
    new_collation_enabled: bool,
}

impl TableEditor {
    pub(crate) fn new(table: TableSchema, new_collation_enabled: bool) -> Self {
        Self {
            table,
            new_collation_enabled,
        }
    }

    pub(crate) fn table(&self) -> &TableSchema {
        &self.table
    }

    pub(crate) fn finish(self) -> TableSchema {
        self.table
    }

    fn same_name(&self, a: &str, b: &str) -> bool {
        fold_identifier(a, self.new_collation_enabled) == fold_identifier(b, self.new_collation_enabled)
    }

    fn find_column(&self, name: &str) -> Option<usize> {
        self.table.columns.iter().position(|c| self.same_name(&c.name, name))
    }

    fn require_column(&self, name: &str) -> Result<usize, CatalogError> {
        self.find_column(name).ok_or_else(|| CatalogError::UnknownColumn {
            table: self.table.qualified_name(),
            column: name.to_string(),
        })
    }

    fn find_index(&self, name: &str) -> Option<usize> {
        self.table.indexes.iter().position(|i| self.same_name(&i.name, name))
    }

    fn primary_key(&self) -> Option<&Index> {
        self.table.indexes.iter().find(|i| i.primary)
    }

    fn is_primary_key_column(&self, column: &str) -> bool {
        self.primary_key()
            .is_some_and(|pk| pk.columns.iter().any(|c| self.same_name(c, column)))
    }

    fn indexes_referencing(&self, column: &str) -> Vec<Index> {
        self.table
            .indexes
            .iter()
            .filter(|i| i.columns.iter().any(|c| self.same_name(c, column)))
            .cloned()
            .collect()
    }

    fn options(&self) -> TableOptions {
        TableOptions {
            database: self.table.database.clone(),
            name: self.table.name.clone(),
            charset: self.table.charset.clone(),
            collation: self.table.collation.clone(),
        }
    }

    fn descriptor(&self, action: &'static str, change: Change) -> ChangeDescriptor {
        ChangeDescriptor {
            table: self.table.qualified_name(),
            action,
            change,
        }
    }

    fn invalid(&self, column: &str, reason: impl std::fmt::Display) -> CatalogError {
        CatalogError::InvalidDefinition(format!(
            "column '{}' in table '{}': {}",
            column,
            self.table.qualified_name(),
            reason
        ))
    }

    /// Validate a column definition and resolve its effective charset
    fn normalize_column(&self, def: &ColumnDef) -> Result<Column, CatalogError> {
        let mut column = def.column.clone();
        let ty = &column.column_type;

        match ty.family() {
            TypeFamily::Decimal => {
                let precision = ty.effective_length().unwrap_or(10);
                let scale = ty.effective_scale();
                if precision == 0 || precision > MAX_DECIMAL_PRECISION {
                    return Err(self.invalid(&column.name, format!("DECIMAL precision {} out of range", precision)));
                }
                if scale > MAX_DECIMAL_SCALE || u64::from(scale) > precision {
                    return Err(self.invalid(&column.name, format!("DECIMAL scale {} out of range", scale)));
                }
            }
            TypeFamily::Time | TypeFamily::Datetime | TypeFamily::Timestamp => {
                if ty.effective_scale() > MAX_FSP {
                    return Err(self.invalid(&column.name, format!("fractional seconds precision {} exceeds {}", ty.effective_scale(), MAX_FSP)));
                }
            }
            TypeFamily::Bit => {
                let length = ty.effective_length().unwrap_or(1);
                if length == 0 || length > MAX_BIT_LENGTH {
                    return Err(self.invalid(&column.name, format!("BIT length {} out of range", length)));
                }
            }
            _ => {}
        }

        if matches!(ty.kind, TypeKind::Char | TypeKind::Binary)
            && ty.effective_length().is_some_and(|l| l > MAX_FIXED_LENGTH)
        {
            return Err(self.invalid(&column.name, format!("{} length exceeds {}", ty.kind, MAX_FIXED_LENGTH)));
        }

        if column.column_type.is_string() {
            let (charset, collation) = collation::resolve(
                column.charset.as_deref(),
                column.collation.as_deref(),
                (&self.table.charset, &self.table.collation),
            )?;
            column.charset = Some(charset);
            column.collation = Some(collation);
        } else {
            column.charset = None;
            column.collation = None;
        }

        if def.primary_key {
            column.nullable = false;
        }

        if !column.nullable && column.default.is_some() && !column.has_default() {
            return Err(self.invalid(&column.name, "NOT NULL column cannot default to NULL"));
        }

        Ok(column)
    }

    fn insert_at(&mut self, column: Column, position: Option<&ColumnPosition>, fallback: usize) -> Result<(), CatalogError> {
        let at = match position {
            None => fallback,
            Some(ColumnPosition::First) => 0,
            Some(ColumnPosition::After(name)) => self.require_column(name)? + 1,
        };
        self.table.columns.insert(at, column);
        Ok(())
    }

    fn rename_in_indexes(&mut self, old: &str, new: &str) {
        let enabled = self.new_collation_enabled;
        let old = fold_identifier(old, enabled);
        for index in &mut self.table.indexes {
            for column in &mut index.columns {
                if fold_identifier(column, enabled) == old {
                    *column = new.to_string();
                }
            }
        }
    }

    /// Register inline `PRIMARY KEY` / `UNIQUE` of a column definition
    fn add_inline_indexes(&mut self, def: &ColumnDef) -> Result<(), CatalogError> {
        let name = def.column.name.clone();
        if def.primary_key {
            self.add_index(&IndexDef::primary(vec![name.clone()]))?;
        }
        if def.unique {
            self.add_index(&IndexDef::new(None, vec![name]).unique())?;
        }
        Ok(())
    }

    pub(crate) fn add_column(
        &mut self,
        def: &ColumnDef,
        position: Option<&ColumnPosition>,
    ) -> Result<ChangeDescriptor, CatalogError> {
        if self.find_column(&def.column.name).is_some() {
            return Err(CatalogError::duplicate(ObjectKind::Column, &def.column.name));
        }

        let column = self.normalize_column(def)?;
        let end = self.table.columns.len();
        self.insert_at(column.clone(), position, end)?;
        self.add_inline_indexes(def)?;

        Ok(self.descriptor(
            "add column",
            Change::Column(ColumnChange {
                before: None,
                after: Some(column),
                indexes: Vec::new(),
            }),
        ))
    }

    pub(crate) fn drop_column(&mut self, name: &str) -> Result<ChangeDescriptor, CatalogError> {
        let at = self.require_column(name)?;
        if self.table.columns.len() == 1 {
            return Err(CatalogError::InvalidDefinition(format!(
                "cannot drop '{}': table '{}' must keep at least one column",
                name,
                self.table.qualified_name()
            )));
        }

        let descriptor = self.descriptor(
            "drop column",
            Change::Column(ColumnChange {
                before: Some(self.table.columns[at].clone()),
                after: None,
                indexes: self.indexes_referencing(name),
            }),
        );

        let removed = self.table.columns.remove(at);
        let enabled = self.new_collation_enabled;
        let folded = fold_identifier(&removed.name, enabled);
        for index in &mut self.table.indexes {
            index.columns.retain(|c| fold_identifier(c, enabled) != folded);
        }
        self.table.indexes.retain(|i| !i.columns.is_empty());

        Ok(descriptor)
    }

    /// Redefine a column, optionally renaming it (`CHANGE` / `MODIFY`)
    pub(crate) fn change_column(
        &mut self,
        action: &'static str,
        old_name: &str,
        def: &ColumnDef,
        position: Option<&ColumnPosition>,
    ) -> Result<ChangeDescriptor, CatalogError> {
        let at = self.require_column(old_name)?;
        let new_name = &def.column.name;
        if !self.same_name(old_name, new_name) && self.find_column(new_name).is_some() {
            return Err(CatalogError::duplicate(ObjectKind::Column, new_name));
        }

        let before = self.table.columns[at].clone();
        let indexes = self.indexes_referencing(old_name);
        let mut def = def.clone();
        if self.is_primary_key_column(old_name) {
            def.column.nullable = false;
        }
        let after = self.normalize_column(&def)?;

        self.table.columns.remove(at);
        self.insert_at(after.clone(), position, at)?;
        self.rename_in_indexes(&before.name, &after.name);
        self.add_inline_indexes(&def)?;

        Ok(self.descriptor(
            action,
            Change::Column(ColumnChange {
                before: Some(before),
                after: Some(after),
                indexes,
            }),
        ))
    }

    pub(crate) fn rename_column(&mut self, old_name: &str, new_name: &str) -> Result<ChangeDescriptor, CatalogError> {
        let at = self.require_column(old_name)?;
        if !self.same_name(old_name, new_name) && self.find_column(new_name).is_some() {
            return Err(CatalogError::duplicate(ObjectKind::Column, new_name));
        }

        let before = self.table.columns[at].clone();
        let indexes = self.indexes_referencing(old_name);
        self.table.columns[at].name = new_name.to_string();
        self.rename_in_indexes(&before.name, new_name);

        Ok(self.descriptor(
            "rename column",
            Change::Column(ColumnChange {
                before: Some(before),
                after: Some(self.table.columns[at].clone()),
                indexes,
            }),
        ))
    }

    /// Apply an in-place edit to one column's attributes
    fn edit_column(
        &mut self,
        action: &'static str,
        name: &str,
        edit: impl FnOnce(&mut Column),
    ) -> Result<ChangeDescriptor, CatalogError> {
        let at = self.require_column(name)?;
        let before = self.table.columns[at].clone();
        let indexes = self.indexes_referencing(name);
        edit(&mut self.table.columns[at]);

        Ok(self.descriptor(
            action,
            Change::Column(ColumnChange {
                before: Some(before),
                after: Some(self.table.columns[at].clone()),
                indexes,
            }),
        ))
    }

    pub(crate) fn set_default(&mut self, column: &str, default: &str) -> Result<ChangeDescriptor, CatalogError> {
        let at = self.require_column(column)?;
        let target = &self.table.columns[at];
        if !target.nullable && default.trim().eq_ignore_ascii_case("null") {
            return Err(self.invalid(&target.name, "NOT NULL column cannot default to NULL"));
        }
        self.edit_column("set default", column, |c| c.default = Some(default.to_string()))
    }

    pub(crate) fn drop_default(&mut self, column: &str) -> Result<ChangeDescriptor, CatalogError> {
        self.edit_column("drop default", column, |c| c.default = None)
    }

    pub(crate) fn set_not_null(&mut self, column: &str) -> Result<ChangeDescriptor, CatalogError> {
        self.edit_column("set not null", column, |c| c.nullable = false)
    }

    pub(crate) fn drop_not_null(&mut self, column: &str) -> Result<ChangeDescriptor, CatalogError> {
        if self.is_primary_key_column(column) {
            return Err(self.invalid(column, "all parts of a PRIMARY KEY must be NOT NULL"));
        }
        self.edit_column("drop not null", column, |c| c.nullable = true)
    }

    /// Pick `col`, `col_2`, `col_3`... for an unnamed index
    fn generate_index_name(&self, first_column: &str) -> String {
        if self.find_index(first_column).is_none() && !self.same_name(first_column, Index::PRIMARY_NAME) {
            return first_column.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", first_column, n))
            .find(|candidate| self.find_index(candidate).is_none())
            .unwrap_or_else(|| first_column.to_string())
    }

    pub(crate) fn add_index(&mut self, def: &IndexDef) -> Result<ChangeDescriptor, CatalogError> {
        if def.columns.is_empty() {
            return Err(CatalogError::InvalidDefinition(format!(
                "index on table '{}' must reference at least one column",
                self.table.qualified_name()
            )));
        }

        let mut columns: Vec<String> = Vec::with_capacity(def.columns.len());
        let mut snapshots = Vec::with_capacity(def.columns.len());
        for name in &def.columns {
            let at = self.require_column(name)?;
            let column = &self.table.columns[at];
            if columns.iter().any(|c| self.same_name(c, &column.name)) {
                return Err(CatalogError::duplicate(ObjectKind::Column, &column.name));
            }
            columns.push(column.name.clone());
            snapshots.push(column.clone());
        }

        let index = if def.primary {
            if self.primary_key().is_some() {
                return Err(CatalogError::duplicate(ObjectKind::Index, Index::PRIMARY_NAME));
            }
            Index::primary(columns)
        } else {
            let name = match &def.name {
                Some(name) if self.same_name(name, Index::PRIMARY_NAME) => {
                    return Err(CatalogError::InvalidDefinition(format!(
                        "incorrect index name '{}'",
                        name
                    )));
                }
                Some(name) => {
                    if self.find_index(name).is_some() {
                        return Err(CatalogError::duplicate(ObjectKind::Index, name));
                    }
                    name.clone()
                }
                None => self.generate_index_name(&columns[0]),
            };
            let index = Index::new(name, columns);
            if def.unique {
                index.unique()
            } else {
                index
            }
        };

        if index.primary {
            for column in &mut self.table.columns {
                if index.columns.contains(&column.name) {
                    column.nullable = false;
                }
            }
        }

        let action = if index.primary { "add primary key" } else { "add index" };
        self.table.indexes.push(index.clone());

        Ok(self.descriptor(
            action,
            Change::Index(IndexChange {
                before: None,
                after: Some(index),
                columns: snapshots,
            }),
        ))
    }

    fn remove_index(&mut self, action: &'static str, at: usize) -> ChangeDescriptor {
        let index = self.table.indexes.remove(at);
        let columns = self
            .table
            .columns
            .iter()
            .filter(|c| index.columns.contains(&c.name))
            .cloned()
            .collect();

        self.descriptor(
            action,
            Change::Index(IndexChange {
                before: Some(index),
                after: None,
                columns,
            }),
        )
    }

    pub(crate) fn drop_index(&mut self, name: &str) -> Result<ChangeDescriptor, CatalogError> {
        let at = self.find_index(name).ok_or_else(|| CatalogError::UnknownIndex {
            table: self.table.qualified_name(),
            index: name.to_string(),
        })?;
        Ok(self.remove_index("drop index", at))
    }

    pub(crate) fn drop_primary_key(&mut self) -> Result<ChangeDescriptor, CatalogError> {
        let at = self
            .table
            .indexes
            .iter()
            .position(|i| i.primary)
            .ok_or_else(|| CatalogError::UnknownIndex {
                table: self.table.qualified_name(),
                index: Index::PRIMARY_NAME.to_string(),
            })?;
        Ok(self.remove_index("drop primary key", at))
    }

    /// Move the table to `database.name`; the catalog validates the target
    pub(crate) fn rename(&mut self, database: &str, name: &str) -> ChangeDescriptor {
        let before = self.options();
        let table = before.clone();
        self.table.database = database.to_string();
        self.table.name = name.to_string();

        ChangeDescriptor {
            table: format!("{}.{}", table.database, table.name),
            action: "rename table",
            change: Change::Table(TableChange {
                before,
                after: self.options(),
            }),
        }
    }

    /// Change the table defaults; existing columns keep their charset
    pub(crate) fn set_options(
        &mut self,
        charset: Option<&str>,
        collation: Option<&str>,
    ) -> Result<ChangeDescriptor, CatalogError> {
        let before = self.options();
        let (charset, collation) =
            collation::resolve(charset, collation, (&self.table.charset, &self.table.collation))?;
        self.table.charset = charset;
        self.table.collation = collation;

        Ok(self.descriptor(
            "set table options",
            Change::Table(TableChange {
                before,
                after: self.options(),
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddlguard_core::ColumnType;

    fn editor() -> TableEditor {
        let table = TableSchema {
            database: "d".into(),
            name: "t".into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            charset: "utf8mb4".into(),
            collation: "utf8mb4_bin".into(),
        };
        let mut editor = TableEditor::new(table, true);
        editor
            .add_column(&ColumnDef::new(Column::new("id", ColumnType::new(TypeKind::Int))), None)
            .unwrap();
        editor
            .add_column(&ColumnDef::new(Column::new("name", ColumnType::varchar(20))), None)
            .unwrap();
        editor
    }

    #[test]
    fn string_columns_inherit_table_charset() {
        let editor = editor();
        let name = &editor.table().columns[1];
        assert_eq!(name.charset.as_deref(), Some("utf8mb4"));
        assert_eq!(name.collation.as_deref(), Some("utf8mb4_bin"));
        assert_eq!(editor.table().columns[0].charset, None);
    }

    #[test]
    fn column_positions() {
        let mut editor = editor();
        editor
            .add_column(
                &ColumnDef::new(Column::new("first", ColumnType::new(TypeKind::Int))),
                Some(&ColumnPosition::First),
            )
            .unwrap();
        editor
            .add_column(
                &ColumnDef::new(Column::new("mid", ColumnType::new(TypeKind::Int))),
                Some(&ColumnPosition::After("ID".into())),
            )
            .unwrap();
        assert_eq!(editor.table().column_names(), vec!["first", "id", "mid", "name"]);
    }

    #[test]
    fn generated_index_names() {
        let mut editor = editor();
        for _ in 0..3 {
            editor.add_index(&IndexDef::new(None, vec!["name".into()])).unwrap();
        }
        let names: Vec<_> = editor.table().indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["name", "name_2", "name_3"]);
    }

    #[test]
    fn primary_key_forces_not_null() {
        let mut editor = editor();
        let change = editor.add_index(&IndexDef::primary(vec!["id".into()])).unwrap();
        assert_eq!(change.action, "add primary key");
        assert!(change.as_index().unwrap().columns[0].nullable);
        assert!(!editor.table().columns[0].nullable);

        assert!(matches!(
            editor.add_index(&IndexDef::primary(vec!["name".into()])),
            Err(CatalogError::DuplicateDefinition { object: ObjectKind::Index, .. })
        ));
        assert!(editor.drop_not_null("id").is_err());

        let null_default = ColumnDef::new(Column::new("id", ColumnType::new(TypeKind::BigInt)).with_default("NULL"));
        assert!(matches!(
            editor.change_column("modify column", "id", &null_default, None),
            Err(CatalogError::InvalidDefinition(_))
        ));
        assert_eq!(editor.table().columns[0].column_type.kind, TypeKind::Int);

        let widened = ColumnDef::new(Column::new("id", ColumnType::new(TypeKind::BigInt)));
        let change = editor.change_column("modify column", "id", &widened, None).unwrap();
        assert!(!change.as_column().unwrap().after.as_ref().unwrap().nullable);
    }

    #[test]
    fn change_column_renames_index_references() {
        let mut editor = editor();
        editor.add_index(&IndexDef::new(Some("idx".into()), vec!["name".into()])).unwrap();
        editor
            .change_column(
                "change column",
                "name",
                &ColumnDef::new(Column::new("title", ColumnType::varchar(40))),
                None,
            )
            .unwrap();
        assert_eq!(editor.table().indexes[0].columns, vec!["title"]);
        assert_eq!(editor.table().column_names(), vec!["id", "title"]);
    }

    #[test]
    fn invalid_definitions() {
        let mut editor = editor();
        let bad = ColumnDef::new(Column::new("amount", ColumnType::decimal(10, 12)));
        assert!(matches!(editor.add_column(&bad, None), Err(CatalogError::InvalidDefinition(_))));

        let bad = ColumnDef::new(Column::new("c", ColumnType::char(300)));
        assert!(matches!(editor.add_column(&bad, None), Err(CatalogError::InvalidDefinition(_))));

        let bad = ColumnDef::new(Column::new("c", ColumnType::new(TypeKind::Int)).not_null().with_default("NULL"));
        assert!(matches!(editor.add_column(&bad, None), Err(CatalogError::InvalidDefinition(_))));

        let bad = ColumnDef::new(Column::new("c", ColumnType::varchar(5)).with_charset("latin1").with_collation("utf8mb4_bin"));
        assert!(matches!(editor.add_column(&bad, None), Err(CatalogError::InvalidDefinition(_))));
    }
}
