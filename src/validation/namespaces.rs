//! Namespace dependency validation
//!
//! Dependencies must form a DAG. Self dependencies and cycles are fatal because lookup order
//! is undefined for them.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::{Directed, Graph};
use tracing::error;

use crate::error::{CompileError, CompileResult};
use crate::models::{EntityGraph, NamespaceId};

/// Namespace dependency validator
#[derive(Debug, Default)]
pub struct NamespaceValidator;

impl NamespaceValidator {
    pub fn new() -> Self {
        Self
    }

    /// Fail on the first self dependency or dependency cycle
    pub fn validate(&self, graph: &EntityGraph) -> CompileResult<()> {
        let mut deps = Graph::<NamespaceId, (), Directed>::new();
        let mut node_map: HashMap<NamespaceId, NodeIndex> = HashMap::new();

        for ns in graph.namespaces() {
            let node = deps.add_node(ns.id);
            node_map.insert(ns.id, node);
        }

        for ns in graph.namespaces() {
            for dep in &ns.dependencies {
                if *dep == ns.id {
                    error!(namespace = %ns.name, "Namespace depends on itself");
                    return Err(CompileError::SelfDependency(ns.name.clone()));
                }
                deps.add_edge(node_map[&ns.id], node_map[dep], ());
            }
        }

        if let Some(cycle) = tarjan_scc(&deps).into_iter().find(|scc| scc.len() > 1) {
            let mut members: Vec<NamespaceId> = cycle.into_iter().map(|n| deps[n]).collect();
            members.sort();
            let names: Vec<String> = members
                .into_iter()
                .map(|id| graph.namespace(id).name.clone())
                .collect();
            error!(namespaces = ?names, "Cyclic namespace dependency");
            return Err(CompileError::CyclicNamespaceDependency(names));
        }
        Ok(())
    }
}
