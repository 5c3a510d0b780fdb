//! Validation functionality
//!
//! Provides validation logic for:
//! - Namespace dependencies (self dependencies, cycles)
//! - Common nesting (types that contain themselves)
//! - Derived table names (collisions, prefix overlap)

pub mod commons;
pub mod namespaces;
pub mod naming;

pub use commons::CommonNestingValidator;
pub use namespaces::NamespaceValidator;
pub use naming::TableNameValidator;

use crate::error::CompileResult;
use crate::models::EntityGraph;

/// Structural checks that must hold before any pass runs
pub fn validate_graph(graph: &EntityGraph) -> CompileResult<()> {
    NamespaceValidator::new().validate(graph)?;
    CommonNestingValidator::new().validate(graph)
}
