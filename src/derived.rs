//! Derived data attached to entities by passes
//!
//! Each concern keeps its records in its own typed slot keyed by entity, so authored entities
//! are never mutated. A slot is written by exactly one pass; later passes only read it.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::ResolveError;
use crate::models::{EntityId, ForeignKeyKind, NamespaceId, Table, TypeDescriptor};
use crate::resolve::{FlattenedItem, IdentityColumn};

/// Concern that owns a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Plugin {
    Flattening,
    Identity,
    Relational,
    SchemaTypes,
}

impl Plugin {
    pub fn label(&self) -> &'static str {
        match self {
            Plugin::Flattening => "flattened properties",
            Plugin::Identity => "identity columns",
            Plugin::Relational => "relational tables",
            Plugin::SchemaTypes => "schema types",
        }
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Records of one plugin, keyed by entity
#[derive(Debug, Clone, Serialize)]
pub struct PluginSlot<T> {
    plugin: Plugin,
    records: BTreeMap<EntityId, T>,
}

impl<T> PluginSlot<T> {
    fn new(plugin: Plugin) -> Self {
        Self {
            plugin,
            records: BTreeMap::new(),
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.records.get_mut(&id)
    }

    /// Record for `id`, or a missing-precomputed error naming `entity`
    pub fn require(&self, id: EntityId, entity: &str) -> Result<&T, ResolveError> {
        self.records
            .get(&id)
            .ok_or_else(|| ResolveError::MissingPrecomputed {
                entity: entity.to_string(),
                what: self.plugin.label(),
            })
    }

    pub fn insert(&mut self, id: EntityId, record: T) {
        self.records.insert(id, record);
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.records.contains_key(&id)
    }

    /// Records in entity order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.records.iter().map(|(id, r)| (*id, r))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.records.iter_mut().map(|(id, r)| (*id, r))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Relationship recorded during table synthesis and resolved by the foreign-key pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableLink {
    /// Name of the source table within the same record
    pub source_table: String,
    pub kind: ForeignKeyKind,
    pub target: LinkTarget,
    /// `(source column, target column)` pairs
    pub column_pairs: Vec<(String, String)>,
    /// Property that introduced the link, if any
    pub property: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LinkTarget {
    /// Main table of another entity
    Entity(EntityId),
    /// Another table of the same record
    Local(String),
    /// A specific table by schema and name
    Table { schema: String, name: String },
}

/// Tables of one entity: the main table first, then everything layered on it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationalData {
    pub main_table: String,
    pub tables: Vec<Table>,
    pub links: Vec<TableLink>,
}

impl RelationalData {
    pub fn main(&self) -> Option<&Table> {
        self.table(&self.main_table)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }
}

/// Side table of everything passes derive
#[derive(Debug, Clone, Serialize)]
pub struct DerivedStore {
    pub flattened: PluginSlot<Vec<FlattenedItem>>,
    pub identity: PluginSlot<Vec<IdentityColumn>>,
    pub relational: PluginSlot<RelationalData>,
    pub schema_types: PluginSlot<Vec<TypeDescriptor>>,
    /// Tables not owned by a single entity, such as the base descriptor table
    pub namespace_tables: BTreeMap<NamespaceId, Vec<Table>>,
    /// Types not owned by a single entity
    pub namespace_types: BTreeMap<NamespaceId, Vec<TypeDescriptor>>,
}

impl Default for DerivedStore {
    fn default() -> Self {
        Self {
            flattened: PluginSlot::new(Plugin::Flattening),
            identity: PluginSlot::new(Plugin::Identity),
            relational: PluginSlot::new(Plugin::Relational),
            schema_types: PluginSlot::new(Plugin::SchemaTypes),
            namespace_tables: BTreeMap::new(),
            namespace_types: BTreeMap::new(),
        }
    }
}

impl DerivedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table by schema and name, wherever it is stored
    pub fn find_table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.all_tables()
            .find(|t| t.schema == schema && t.name == name)
    }

    /// Every derived table
    pub fn all_tables(&self) -> impl Iterator<Item = &Table> {
        self.namespace_tables
            .values()
            .flatten()
            .chain(self.relational.iter().flat_map(|(_, r)| r.tables.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableKind;

    #[test]
    fn test_require_reports_missing_slot() {
        let store = DerivedStore::new();
        let err = store.identity.require(EntityId(3), "Student").unwrap_err();
        assert_eq!(
            err.to_string(),
            "'Student' has no identity columns computed by an earlier pass"
        );
    }

    #[test]
    fn test_find_table_across_slots() {
        let mut store = DerivedStore::new();
        store.namespace_tables.insert(
            NamespaceId(0),
            vec![Table::new("edfi", "descriptor", TableKind::Primary)],
        );
        store.relational.insert(
            EntityId(0),
            RelationalData {
                main_table: "student".into(),
                tables: vec![Table::new("edfi", "student", TableKind::Primary)],
                links: Vec::new(),
            },
        );

        assert!(store.find_table("edfi", "descriptor").is_some());
        assert!(store.find_table("edfi", "student").is_some());
        assert!(store.find_table("sample", "student").is_none());
        assert_eq!(store.all_tables().count(), 2);
    }
}
