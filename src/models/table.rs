//! Derived table model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::column::{Column, ColumnType};
use super::foreign_key::{ForeignKey, ForeignKeyKind};

/// How a table relates to its originating entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// Own table of a root entity, descriptor or enumeration
    Primary,
    Subclass,
    Extension,
    Restriction,
    /// Synthesized for a common or collection property
    Join,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: Uuid,
    pub name: String,
    pub schema: String,
    pub kind: TableKind,
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    /// Qualified name of the entity the table was derived from
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin: String,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, kind: TableKind) -> Self {
        let schema = schema.into();
        let name = name.into();
        // Deterministic UUID v5 so reruns produce identical tables
        let id = Self::generate_id(&schema, &name);
        Self {
            id,
            name,
            schema,
            kind,
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            documentation: String::new(),
            origin: String::new(),
        }
    }

    /// Generate a deterministic id from schema and name
    pub fn generate_id(schema: &str, name: &str) -> Uuid {
        let key = format!("{}.{}", schema, name);
        Uuid::new_v5(&Uuid::NAMESPACE_DNS, key.as_bytes())
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = documentation.into();
        self
    }

    pub fn is_join_table(&self) -> bool {
        self.kind == TableKind::Join
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Add a column, merging with an existing column of the same name
    pub fn add_column(&mut self, column: Column) {
        if let Some(existing) = self.columns.iter_mut().find(|c| c.name == column.name) {
            existing.merge(&column);
        } else {
            self.columns.push(column);
        }
    }

    /// Add a key column and append it to the primary key
    pub fn add_key_column(&mut self, name: impl Into<String>, column_type: ColumnType) {
        let name = name.into();
        self.add_column(Column::key(name.clone(), column_type));
        if !self.primary_key.contains(&name) {
            self.primary_key.push(name);
        }
    }

    /// Append id, createdate and lastmodifieddate
    pub fn add_resource_columns(&mut self) {
        self.add_column(Column::resource("id", ColumnType::Uuid));
        self.add_column(Column::resource("createdate", ColumnType::Timestamp));
        self.add_column(Column::resource("lastmodifieddate", ColumnType::Timestamp));
    }

    pub fn resource_column_count(&self) -> usize {
        self.columns.iter().filter(|c| c.is_resource).count()
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &Column> {
        self.primary_key.iter().filter_map(|name| self.column(name))
    }

    pub fn foreign_keys_of(&self, kind: ForeignKeyKind) -> impl Iterator<Item = &ForeignKey> {
        self.foreign_keys.iter().filter(move |fk| fk.kind == kind)
    }
}
