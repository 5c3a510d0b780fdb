//! Deterministic table and column names
//!
//! Every name is a lower-cased concatenation of model names. Nothing here deconflicts names
//! that happen to overlap; overlap is reported by the table name validator instead.

use crate::models::EntityProperty;

/// Lower-cased role prefix of a property, empty when the role is absent or default
pub fn role_prefix(property: &EntityProperty) -> String {
    property
        .effective_role()
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Column for a scalar or shared simple property
pub fn scalar_column_name(property: &EntityProperty) -> String {
    format!("{}{}", role_prefix(property), property.metaed_name.to_lowercase())
}

pub fn descriptor_table_name(descriptor: &str) -> String {
    format!("{}descriptor", descriptor.to_lowercase())
}

/// Key column of a descriptor table
pub fn descriptor_key_name(descriptor: &str) -> String {
    format!("{}id", descriptor_table_name(descriptor))
}

/// Column referencing a descriptor from a property
pub fn descriptor_column_name(property: &EntityProperty) -> String {
    format!(
        "{}{}",
        role_prefix(property),
        descriptor_key_name(&property.metaed_name)
    )
}

/// Enumeration table; a trailing `type` is not doubled
pub fn enumeration_table_name(enumeration: &str) -> String {
    let lower = enumeration.to_lowercase();
    if lower.ends_with("type") {
        lower
    } else {
        format!("{}type", lower)
    }
}

pub fn enumeration_key_name(enumeration: &str) -> String {
    format!("{}id", enumeration_table_name(enumeration))
}

pub fn enumeration_column_name(property: &EntityProperty) -> String {
    format!(
        "{}{}",
        role_prefix(property),
        enumeration_key_name(&property.metaed_name)
    )
}

pub fn primary_table_name(entity_name: &str) -> String {
    entity_name.to_lowercase()
}

/// Join table chained onto its owner; `prefix` carries roles of enclosing inline structures
pub fn join_table_name(owner_table: &str, prefix: &str, property: &EntityProperty) -> String {
    format!(
        "{}{}{}{}",
        owner_table,
        prefix,
        role_prefix(property),
        property.metaed_name.to_lowercase()
    )
}

pub fn extension_table_name(base_name: &str) -> String {
    format!("{}extension", base_name.to_lowercase())
}

pub fn restriction_table_name(base_name: &str) -> String {
    format!("{}restriction", base_name.to_lowercase())
}

/// Join table for a common overridden by an extension
pub fn override_table_name(base_table: &str, property: &EntityProperty) -> String {
    format!(
        "{}{}{}extension",
        base_table,
        role_prefix(property),
        property.metaed_name.to_lowercase()
    )
}

pub fn foreign_key_name(table: &str, ordinal: usize) -> String {
    format!("fk_{}_{}", table, ordinal)
}
