//! Models module
//!
//! Authored input (namespaces, entities, properties) and derived output (tables, columns,
//! foreign keys, schema types).

pub mod column;
pub mod entity;
pub mod foreign_key;
pub mod graph;
pub mod loader;
pub mod namespace;
pub mod property;
pub mod schema_type;
pub mod table;

pub use column::{Column, ColumnType};
pub use entity::{Entity, EntityDraft, EntityId, EntityKind, EntityRef, EnumerationItem, KindFamily};
pub use foreign_key::{ForeignKey, ForeignKeyKind, OnDelete};
pub use graph::{EntityGraph, EntityGraphBuilder};
pub use namespace::{Namespace, NamespaceId};
pub use property::{Cardinality, EntityProperty, Facets, PropertyKind, ScalarType};
pub use schema_type::{
    Derivation, DerivationKind, ElementDescriptor, Particle, TypeBody, TypeDescriptor, TypeGroup,
};
pub use table::{Table, TableKind};
