//! Test fixtures for catalog integration tests
//!
//! Reusable statement definitions for the tables most tests start from.

#![allow(dead_code)]

use ddlguard_catalog::Catalog;
use ddlguard_core::{
    Column, ColumnDef, ColumnType, CreateDatabase, CreateTable, IndexDef, ObjectName, TypeKind,
};

pub fn shop() -> CreateDatabase {
    CreateDatabase::new("shop")
}

/// A users table with:
/// - Primary key (id)
/// - Unique email
/// - Nullable display name
pub fn users_table() -> CreateTable {
    CreateTable::new(
        ObjectName::qualified("shop", "users"),
        vec![
            ColumnDef::new(Column::new("id", ColumnType::new(TypeKind::BigInt).unsigned())).primary_key(),
            ColumnDef::new(Column::new("email", ColumnType::varchar(255)).not_null()).unique(),
            ColumnDef::new(Column::new("name", ColumnType::varchar(100))),
            ColumnDef::new(Column::new("created_at", ColumnType::new(TypeKind::Datetime)).not_null()),
        ],
    )
}

/// An orders table with a composite secondary index
pub fn orders_table() -> CreateTable {
    CreateTable::new(
        ObjectName::qualified("shop", "orders"),
        vec![
            ColumnDef::new(Column::new("id", ColumnType::new(TypeKind::BigInt))).primary_key(),
            ColumnDef::new(Column::new("user_id", ColumnType::new(TypeKind::BigInt)).not_null()),
            ColumnDef::new(Column::new("total", ColumnType::decimal(10, 2)).not_null().with_default("0")),
            ColumnDef::new(Column::new("status", ColumnType::varchar(16)).with_collation("utf8mb4_general_ci")),
        ],
    )
    .with_indexes(vec![IndexDef::new(
        Some("idx_user_status".into()),
        vec!["user_id".into(), "status".into()],
    )])
}

/// A catalog holding `shop.users` and `shop.orders`
pub fn shop_catalog() -> Catalog {
    let mut catalog = Catalog::new(true);
    catalog.create_database(&shop()).unwrap();
    catalog.create_table(&users_table()).unwrap();
    catalog.create_table(&orders_table()).unwrap();
    catalog
}

pub fn users() -> ObjectName {
    ObjectName::qualified("shop", "users")
}

pub fn orders() -> ObjectName {
    ObjectName::qualified("shop", "orders")
}
