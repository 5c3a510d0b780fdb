//! Schema-type track
//!
//! Hierarchical type descriptors for markup-schema emitters, derived alongside the relational
//! tables from the same flattened properties.

pub mod base;
pub mod types;

pub use base::{
    COMPLEX_OBJECT_TYPE, DESCRIPTOR_REFERENCE_TYPE, DESCRIPTOR_TYPE, DescriptorLayout, base_types,
};
pub use types::{
    SchemaTypeBuilder, builtin_type, enumeration_type_name, reference_type_name, sort_types,
};
