//! Entity/namespace graph
//!
//! Entities are stored in an arena and addressed by [`EntityId`]. Base entities and reference
//! targets stay unresolved names until [`EntityGraph::lookup`] resolves them within the
//! namespace dependency rules.

use std::collections::{BTreeMap, HashSet, VecDeque};

use tracing::debug;

use super::entity::{Entity, EntityDraft, EntityId, EntityKind, EntityRef, KindFamily};
use super::namespace::{Namespace, NamespaceId};
use super::property::EntityProperty;
use crate::error::{ResolveError, ResolveResult};

/// All namespaces and entities of one compilation unit
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    namespaces: Vec<Namespace>,
    entities: Vec<Entity>,
    members: Vec<Vec<EntityId>>,
    by_name: BTreeMap<(NamespaceId, String), Vec<EntityId>>,
    build_errors: Vec<ResolveError>,
}

impl EntityGraph {
    pub fn builder() -> EntityGraphBuilder {
        EntityGraphBuilder::new()
    }

    pub fn namespace(&self, id: NamespaceId) -> &Namespace {
        &self.namespaces[id.0]
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    /// Namespaces in declaration order
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.iter()
    }

    /// Entities in declaration order across all namespaces
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Entities of one namespace in declaration order
    pub fn entities_in(&self, namespace: NamespaceId) -> impl Iterator<Item = &Entity> {
        self.members[namespace.0].iter().map(|id| &self.entities[id.0])
    }

    pub fn namespace_by_name(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|ns| ns.name == name)
    }

    /// Entity by namespace and name, any kind
    pub fn find(&self, namespace: &str, name: &str) -> Option<&Entity> {
        let ns = self.namespace_by_name(namespace)?;
        self.by_name
            .get(&(ns.id, name.to_string()))
            .and_then(|ids| ids.first())
            .map(|id| self.entity(*id))
    }

    /// Problems found while building, such as unknown dependency names
    pub fn build_errors(&self) -> &[ResolveError] {
        &self.build_errors
    }

    pub fn qualified_name(&self, id: EntityId) -> String {
        let entity = self.entity(id);
        format!("{}.{}", self.namespace(entity.namespace).name, entity.metaed_name)
    }

    /// The namespace itself, then its direct dependencies in declared order, then
    /// transitive dependencies breadth first; each namespace once
    pub fn dependency_closure(&self, namespace: NamespaceId) -> Vec<NamespaceId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([namespace]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            for dep in &self.namespace(current).dependencies {
                if !seen.contains(dep) {
                    queue.push_back(*dep);
                }
            }
        }
        order
    }

    /// Nearest non-extension namespace reachable from `namespace`
    pub fn core_namespace_of(&self, namespace: NamespaceId) -> Option<NamespaceId> {
        self.dependency_closure(namespace)
            .into_iter()
            .find(|ns| !self.namespace(*ns).is_extension)
    }

    /// Resolve a by-name reference from `from` to an entity of `family`
    pub fn lookup(
        &self,
        from: NamespaceId,
        reference: &EntityRef,
        family: KindFamily,
    ) -> ResolveResult<EntityId> {
        let closure = self.dependency_closure(from);
        let candidates: Vec<NamespaceId> = match &reference.namespace {
            Some(qualifier) => closure
                .into_iter()
                .filter(|ns| &self.namespace(*ns).name == qualifier)
                .collect(),
            None => closure,
        };

        for ns in candidates {
            if let Some(ids) = self.by_name.get(&(ns, reference.name.clone())) {
                if let Some(id) = ids.iter().find(|id| family.admits(self.entity(**id).kind)) {
                    debug!(
                        reference = %reference,
                        resolved = %self.qualified_name(*id),
                        "Resolved reference"
                    );
                    return Ok(*id);
                }
            }
        }

        Err(ResolveError::UnresolvedReference {
            reference: reference.to_string(),
            family: family.to_string(),
            namespace: self.namespace(from).name.clone(),
        })
    }

    /// Resolve the base entity of a subclass or extension
    pub fn resolve_base(&self, entity: &Entity) -> ResolveResult<Option<EntityId>> {
        let (Some(base), Some(family)) = (&entity.base, entity.kind.base_family()) else {
            return Ok(None);
        };
        self.lookup(entity.namespace, base, family)
            .map(Some)
            .map_err(|_| ResolveError::UnresolvedBase {
                entity: entity.metaed_name.clone(),
                base: base.to_string(),
            })
    }

    /// Resolve the target of a reference property declared on `owner`; `None` for scalars
    pub fn resolve_property(
        &self,
        owner: &Entity,
        property: &EntityProperty,
    ) -> ResolveResult<Option<EntityId>> {
        match (property.entity_ref(), property.kind.reference_family()) {
            (Some(reference), Some(family)) => {
                self.lookup(owner.namespace, &reference, family).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Like [`resolve_property`](Self::resolve_property) but a missing target is an error
    pub fn resolve_target(
        &self,
        owner: &Entity,
        property: &EntityProperty,
    ) -> ResolveResult<EntityId> {
        self.resolve_property(owner, property)?
            .ok_or_else(|| ResolveError::UnresolvedReference {
                reference: property.metaed_name.clone(),
                family: "entity".to_string(),
                namespace: self.namespace(owner.namespace).name.clone(),
            })
    }

    /// Common extension in `namespace` whose base resolves to `common`
    pub fn common_extension_of(
        &self,
        namespace: NamespaceId,
        common: EntityId,
    ) -> Option<EntityId> {
        self.entities_in(namespace)
            .filter(|e| e.kind == EntityKind::CommonExtension)
            .find(|e| matches!(self.resolve_base(e), Ok(Some(base)) if base == common))
            .map(|e| e.id)
    }
}

/// Builder for [`EntityGraph`]
#[derive(Debug, Default)]
pub struct EntityGraphBuilder {
    graph: EntityGraph,
}

impl EntityGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace; dependencies are names resolved when the graph is built
    pub fn add_namespace(
        &mut self,
        name: impl Into<String>,
        project_extension: impl Into<String>,
        is_extension: bool,
        dependencies: &[&str],
    ) -> NamespaceId {
        let id = NamespaceId(self.graph.namespaces.len());
        self.graph.namespaces.push(Namespace {
            id,
            name: name.into(),
            project_extension: project_extension.into(),
            is_extension,
            dependency_names: dependencies.iter().map(|d| d.to_string()).collect(),
            dependencies: Vec::new(),
        });
        self.graph.members.push(Vec::new());
        id
    }

    pub fn add_entity(&mut self, namespace: NamespaceId, draft: EntityDraft) -> EntityId {
        let id = EntityId(self.graph.entities.len());
        let entity = Entity::from_draft(id, namespace, draft);
        self.graph
            .by_name
            .entry((namespace, entity.metaed_name.clone()))
            .or_default()
            .push(id);
        self.graph.members[namespace.0].push(id);
        self.graph.entities.push(entity);
        id
    }

    pub fn build(mut self) -> EntityGraph {
        let by_name: BTreeMap<String, NamespaceId> = self
            .graph
            .namespaces
            .iter()
            .map(|ns| (ns.name.clone(), ns.id))
            .collect();

        for ns in &mut self.graph.namespaces {
            for dep in &ns.dependency_names {
                match by_name.get(dep) {
                    Some(id) => ns.dependencies.push(*id),
                    None => self.graph.build_errors.push(ResolveError::UnresolvedNamespace {
                        namespace: ns.name.clone(),
                        dependency: dep.clone(),
                    }),
                }
            }
        }
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::EntityDraft;

    fn layered_graph() -> EntityGraph {
        let mut builder = EntityGraph::builder();
        let core = builder.add_namespace("EdFi", "", false, &[]);
        let mid = builder.add_namespace("Mid", "MID", true, &["EdFi"]);
        let ext = builder.add_namespace("Ext", "EXT", true, &["Mid"]);
        builder.add_entity(core, EntityDraft::domain_entity("School"));
        builder.add_entity(core, EntityDraft::descriptor("School"));
        builder.add_entity(mid, EntityDraft::domain_entity("Program"));
        builder.add_entity(ext, EntityDraft::domain_entity("Program"));
        builder.build()
    }

    #[test]
    fn test_dependency_closure_is_breadth_first() {
        let graph = layered_graph();
        let ext = graph.namespace_by_name("Ext").unwrap().id;
        let names: Vec<_> = graph
            .dependency_closure(ext)
            .into_iter()
            .map(|ns| graph.namespace(ns).name.clone())
            .collect();
        assert_eq!(names, vec!["Ext", "Mid", "EdFi"]);
    }

    #[test]
    fn test_lookup_prefers_current_namespace() {
        let graph = layered_graph();
        let ext = graph.namespace_by_name("Ext").unwrap().id;
        let id = graph
            .lookup(ext, &EntityRef::new("Program"), KindFamily::DomainEntity)
            .unwrap();
        assert_eq!(graph.qualified_name(id), "Ext.Program");

        let id = graph
            .lookup(ext, &EntityRef::qualified("Mid", "Program"), KindFamily::DomainEntity)
            .unwrap();
        assert_eq!(graph.qualified_name(id), "Mid.Program");
    }

    #[test]
    fn test_lookup_filters_by_family() {
        let graph = layered_graph();
        let ext = graph.namespace_by_name("Ext").unwrap().id;
        let id = graph
            .lookup(ext, &EntityRef::new("School"), KindFamily::Descriptor)
            .unwrap();
        assert_eq!(graph.entity(id).kind, EntityKind::Descriptor);
    }

    #[test]
    fn test_lookup_does_not_reach_dependents() {
        let graph = layered_graph();
        let core = graph.namespace_by_name("EdFi").unwrap().id;
        let err = graph
            .lookup(core, &EntityRef::new("Program"), KindFamily::DomainEntity)
            .unwrap_err();
        assert_eq!(err.code(), "unresolved-reference");

        let err = graph
            .lookup(core, &EntityRef::qualified("Ext", "Program"), KindFamily::DomainEntity)
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_unknown_dependency_is_recorded() {
        let mut builder = EntityGraph::builder();
        builder.add_namespace("Ext", "EXT", true, &["Missing"]);
        let graph = builder.build();
        assert_eq!(graph.build_errors().len(), 1);
        assert_eq!(graph.build_errors()[0].code(), "unresolved-namespace");
    }
}
