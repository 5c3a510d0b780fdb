//! Entity resolution
//!
//! Flattening of inherited and extended properties and computation of identity columns.

pub mod flatten;
pub mod identity;

pub use flatten::{FlattenedItem, flatten_properties, own_items};
pub use identity::{
    IdentityColumn, identity_columns, shared_column_type, subclass_identity_warnings,
};
