//! Resolved catalog model: definition validated and flattened for runtime use.

use crate::config::{CacheConfig, ExtensionKind, FilterKind, Operation, ValidationRule};
use std::collections::HashMap;

/// Primary key type for parsing path ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PkType {
    Uuid,
    BigInt,
    Int,
    Text,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub is_pk: bool,
    pub nullable: bool,
    pub writable: bool,
    /// Whether the column has a DB default (e.g. NOW(), true).
    pub has_default: bool,
    /// PostgreSQL type name used for parameter casts (e.g. "integer", "varchar(255)").
    pub pg_type: String,
}

impl ColumnInfo {
    pub fn is_integer(&self) -> bool {
        let t = self.pg_type.to_lowercase();
        t.contains("int") || t.contains("serial")
    }

    pub fn is_boolean(&self) -> bool {
        self.pg_type.to_lowercase().starts_with("bool")
    }

    pub fn is_text(&self) -> bool {
        let t = self.pg_type.to_lowercase();
        t.starts_with("varchar") || t.starts_with("text") || t.starts_with("char")
    }
}

/// A table whose rows are removed with their owner (reference declared ON DELETE CASCADE).
#[derive(Clone, Debug)]
pub struct Dependent {
    pub table_name: String,
    pub foreign_key: String,
}

#[derive(Clone, Debug)]
pub struct ResolvedTable {
    pub schema_name: String,
    pub table_name: String,
    pub pk_column: String,
    pub pk_type: PkType,
    pub columns: Vec<ColumnInfo>,
    pub dependents: Vec<Dependent>,
}

impl ResolvedTable {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedFilter {
    /// Query parameter name (camelCase).
    pub property: String,
    pub column: String,
    pub kind: FilterKind,
}

#[derive(Clone, Debug)]
pub struct ResolvedEmbed {
    pub name: String,
    pub table: ResolvedTable,
    pub foreign_key: String,
    pub columns: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct NestedLink {
    pub parent_path: String,
    pub foreign_key: String,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub path_segment: String,
    pub table: ResolvedTable,
    pub operations: Vec<Operation>,
    pub filters: Vec<ResolvedFilter>,
    pub extensions: Vec<ExtensionKind>,
    pub embeds: Vec<ResolvedEmbed>,
    pub nested: Vec<NestedLink>,
    pub cache: Option<CacheConfig>,
    pub validation: HashMap<String, ValidationRule>,
}

impl ResolvedEntity {
    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    pub fn nested_under(&self, parent_path: &str) -> Option<&NestedLink> {
        self.nested.iter().find(|n| n.parent_path == parent_path)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub tables: HashMap<String, ResolvedTable>,
    pub entity_by_path: HashMap<String, ResolvedEntity>,
}

impl ResolvedModel {
    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.entity_by_path.get(path)
    }

    pub fn table(&self, name: &str) -> Option<&ResolvedTable> {
        self.tables.get(name)
    }
}
