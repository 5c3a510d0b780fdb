//! Property flattening and inheritance merge
//!
//! The flattened list of an entity is its base chain's flattened list (minus properties it
//! overrides) followed by its own properties. Commons stay as single items; choices become
//! groups of alternatives.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{ResolveError, ResolveResult};
use crate::models::{EntityGraph, EntityId, EntityProperty, PropertyKind};

/// One entry of a flattened property list
///
/// Items are handles into the graph rather than copies, so they can live in the derived-data
/// store independently of the graph borrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FlattenedItem {
    Property {
        declared_on: EntityId,
        index: usize,
    },
    /// Exactly one of the alternatives applies
    Choice {
        declared_on: EntityId,
        index: usize,
        choice: EntityId,
        alternatives: Vec<FlattenedItem>,
    },
}

impl FlattenedItem {
    pub fn declared_on(&self) -> EntityId {
        match self {
            FlattenedItem::Property { declared_on, .. }
            | FlattenedItem::Choice { declared_on, .. } => *declared_on,
        }
    }

    /// The declaring property
    pub fn property<'g>(&self, graph: &'g EntityGraph) -> &'g EntityProperty {
        match self {
            FlattenedItem::Property { declared_on, index }
            | FlattenedItem::Choice {
                declared_on, index, ..
            } => &graph.entity(*declared_on).properties[*index],
        }
    }
}

/// Effective ordered property list of an entity
pub fn flatten_properties(graph: &EntityGraph, id: EntityId) -> ResolveResult<Vec<FlattenedItem>> {
    flatten_chain(graph, id, &mut BTreeSet::new())
}

/// Own properties only, with choices expanded into groups
pub fn own_items(graph: &EntityGraph, id: EntityId) -> ResolveResult<Vec<FlattenedItem>> {
    let entity = graph.entity(id);
    let mut items = Vec::with_capacity(entity.properties.len());

    for (index, property) in entity.properties.iter().enumerate() {
        if property.kind == PropertyKind::Choice {
            let Some(choice) = graph.resolve_property(entity, property)? else {
                continue;
            };
            items.push(FlattenedItem::Choice {
                declared_on: id,
                index,
                choice,
                alternatives: flatten_properties(graph, choice)?,
            });
        } else {
            items.push(FlattenedItem::Property {
                declared_on: id,
                index,
            });
        }
    }
    Ok(items)
}

fn flatten_chain(
    graph: &EntityGraph,
    id: EntityId,
    visiting: &mut BTreeSet<EntityId>,
) -> ResolveResult<Vec<FlattenedItem>> {
    let entity = graph.entity(id);
    if !visiting.insert(id) {
        return Err(ResolveError::InheritanceCycle(entity.metaed_name.clone()));
    }

    let own = own_items(graph, id)?;
    let mut items = match graph.resolve_base(entity)? {
        Some(base) => {
            let overridden: BTreeSet<_> = own
                .iter()
                .map(|item| item.property(graph))
                .filter(|p| p.is_override)
                .map(EntityProperty::override_key)
                .collect();
            flatten_chain(graph, base, visiting)?
                .into_iter()
                .filter(|item| !overridden.contains(&item.property(graph).override_key()))
                .collect()
        }
        None => Vec::new(),
    };
    items.extend(own);

    visiting.remove(&id);
    Ok(items)
}
