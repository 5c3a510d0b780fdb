//! Common nesting validation
//!
//! Commons, inline commons, choices and common extensions may nest each other but never
//! themselves, directly or through other nested types.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::{Directed, Graph};
use tracing::error;

use crate::error::{CompileError, CompileResult};
use crate::models::{EntityGraph, EntityId, EntityKind, PropertyKind};

fn is_nesting_kind(kind: EntityKind) -> bool {
    matches!(
        kind,
        EntityKind::Common
            | EntityKind::CommonExtension
            | EntityKind::InlineCommon
            | EntityKind::Choice
    )
}

/// Common nesting validator
#[derive(Debug, Default)]
pub struct CommonNestingValidator;

impl CommonNestingValidator {
    pub fn new() -> Self {
        Self
    }

    /// Fail when a nested type reaches itself; unresolved references are left to the passes
    pub fn validate(&self, graph: &EntityGraph) -> CompileResult<()> {
        let mut nesting = Graph::<EntityId, (), Directed>::new();
        let mut node_map: HashMap<EntityId, NodeIndex> = HashMap::new();

        for entity in graph.entities().filter(|e| is_nesting_kind(e.kind)) {
            node_map.insert(entity.id, nesting.add_node(entity.id));
        }

        for entity in graph.entities().filter(|e| is_nesting_kind(e.kind)) {
            for property in &entity.properties {
                if !matches!(
                    property.kind,
                    PropertyKind::Common | PropertyKind::InlineCommon | PropertyKind::Choice
                ) {
                    continue;
                }
                let Ok(Some(target)) = graph.resolve_property(entity, property) else {
                    continue;
                };
                if target == entity.id {
                    let name = graph.qualified_name(entity.id);
                    error!(common = %name, "Common contains itself");
                    return Err(CompileError::CyclicCommonNesting(vec![name]));
                }
                if let (Some(from), Some(to)) = (node_map.get(&entity.id), node_map.get(&target)) {
                    nesting.add_edge(*from, *to, ());
                }
            }
        }

        if let Some(cycle) = tarjan_scc(&nesting).into_iter().find(|scc| scc.len() > 1) {
            let mut members: Vec<EntityId> = cycle.into_iter().map(|n| nesting[n]).collect();
            members.sort();
            let names: Vec<String> =
                members.into_iter().map(|id| graph.qualified_name(id)).collect();
            error!(commons = ?names, "Cyclic common nesting");
            return Err(CompileError::CyclicCommonNesting(names));
        }
        Ok(())
    }
}
