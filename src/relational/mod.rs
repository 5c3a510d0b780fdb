//! Relational derivation
//!
//! Naming rules, table synthesis and foreign-key resolution.

pub mod foreign_keys;
pub mod naming;
pub mod tables;

pub use foreign_keys::{ForeignKeyResolver, ResolvedKeys};
pub use tables::{BASE_DESCRIPTOR_KEY, BASE_DESCRIPTOR_TABLE, Synthesis, TableSynthesizer};
