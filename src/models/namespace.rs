//! Namespaces and their dependency lists

use serde::{Deserialize, Serialize};

/// Arena index of a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespaceId(pub(crate) usize);

impl NamespaceId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Namespace {
    pub id: NamespaceId,
    pub name: String,
    pub project_extension: String,
    pub is_extension: bool,
    /// Dependency names as declared
    pub dependency_names: Vec<String>,
    /// Resolved dependencies in declared order; unknown names are dropped
    pub dependencies: Vec<NamespaceId>,
}

impl Namespace {
    /// Relational schema name
    pub fn schema_name(&self) -> String {
        self.name.to_lowercase()
    }
}
