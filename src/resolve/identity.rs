//! Identity and primary-key resolution

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::error::{Diagnostic, ResolveError, ResolveResult};
use crate::models::{
    ColumnType, Entity, EntityGraph, EntityId, EntityKind, EntityProperty, PropertyKind,
};
use crate::relational::naming;

/// A column contributed to an entity's primary key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityColumn {
    pub name: String,
    pub column_type: ColumnType,
    /// Property on the entity that contributed the column
    pub source_property: String,
    /// Matching column on the referenced or base table
    pub referenced_column: Option<String>,
    pub referenced_entity: Option<EntityId>,
}

impl IdentityColumn {
    fn local(name: String, column_type: ColumnType, source: &EntityProperty) -> Self {
        Self {
            name,
            column_type,
            source_property: source.metaed_name.clone(),
            referenced_column: None,
            referenced_entity: None,
        }
    }

    fn referencing(mut self, entity: EntityId, column: impl Into<String>) -> Self {
        self.referenced_entity = Some(entity);
        self.referenced_column = Some(column.into());
        self
    }
}

/// Ordered identity columns of an entity
pub fn identity_columns(graph: &EntityGraph, id: EntityId) -> ResolveResult<Vec<IdentityColumn>> {
    resolve(graph, id, &mut BTreeSet::new())
}

/// Warnings for identity declarations on a subclass that cannot take effect
pub fn subclass_identity_warnings(graph: &EntityGraph, id: EntityId) -> Vec<Diagnostic> {
    let entity = graph.entity(id);
    if !entity.kind.is_subclass() {
        return Vec::new();
    }
    let ns = &graph.namespace(entity.namespace).name;
    entity
        .identity_properties()
        .filter(|p| p.identity_rename_of.is_none())
        .map(|p| {
            Diagnostic::warning(
                "subclass-identity",
                format!(
                    "Subclass '{}' declares identity property '{}', only renames change its key",
                    entity.metaed_name, p.metaed_name
                ),
            )
            .with_entity(ns.clone(), entity.metaed_name.clone())
        })
        .collect()
}

fn resolve(
    graph: &EntityGraph,
    id: EntityId,
    visiting: &mut BTreeSet<EntityId>,
) -> ResolveResult<Vec<IdentityColumn>> {
    let entity = graph.entity(id);
    if !visiting.insert(id) {
        return Err(ResolveError::IdentityCycle(entity.metaed_name.clone()));
    }

    let columns = match entity.kind {
        EntityKind::Descriptor => vec![IdentityColumn {
            name: naming::descriptor_key_name(&entity.metaed_name),
            column_type: ColumnType::Integer,
            source_property: entity.metaed_name.clone(),
            referenced_column: None,
            referenced_entity: None,
        }],
        EntityKind::Enumeration => vec![IdentityColumn {
            name: naming::enumeration_key_name(&entity.metaed_name),
            column_type: ColumnType::Integer,
            source_property: entity.metaed_name.clone(),
            referenced_column: None,
            referenced_entity: None,
        }],
        kind if kind.is_subclass() => subclass_identity(graph, entity, visiting)?,
        kind if kind.is_extension() => {
            let base = base_of(graph, entity)?;
            resolve(graph, base, visiting)?
        }
        _ => {
            let mut columns = Vec::new();
            for property in entity.identity_properties() {
                columns.extend(contribution(graph, entity, property, visiting)?);
            }
            let mut columns = dedupe(columns);
            columns.sort_by(|a, b| a.name.cmp(&b.name));
            columns
        }
    };

    visiting.remove(&id);
    Ok(columns)
}

fn base_of(graph: &EntityGraph, entity: &Entity) -> ResolveResult<EntityId> {
    graph
        .resolve_base(entity)?
        .ok_or_else(|| ResolveError::UnresolvedBase {
            entity: entity.metaed_name.clone(),
            base: "(none)".to_string(),
        })
}

/// Base identity in base order, each column pointing at its base column; renames replace the
/// renamed columns in place
fn subclass_identity(
    graph: &EntityGraph,
    entity: &Entity,
    visiting: &mut BTreeSet<EntityId>,
) -> ResolveResult<Vec<IdentityColumn>> {
    let base = base_of(graph, entity)?;
    let mut columns: Vec<IdentityColumn> = resolve(graph, base, visiting)?
        .into_iter()
        .map(|c| {
            let name = c.name.clone();
            c.referencing(base, name)
        })
        .collect();

    for rename in entity.properties.iter() {
        let Some(original) = rename.identity_rename_of.as_deref() else {
            continue;
        };
        let Some(position) = columns
            .iter()
            .position(|c| c.source_property.eq_ignore_ascii_case(original))
        else {
            continue;
        };
        let replaced: Vec<IdentityColumn> = columns
            .iter()
            .filter(|c| c.source_property.eq_ignore_ascii_case(original))
            .cloned()
            .collect();
        let renamed = contribution(graph, entity, rename, visiting)?;

        columns.retain(|c| !c.source_property.eq_ignore_ascii_case(original));
        let renamed: Vec<IdentityColumn> = renamed
            .into_iter()
            .zip(replaced)
            .map(|(new, old)| {
                let base_column = old.referenced_column.unwrap_or(old.name);
                IdentityColumn {
                    column_type: old.column_type,
                    ..new
                }
                .referencing(base, base_column)
            })
            .collect();
        let at = position.min(columns.len());
        columns.splice(at..at, renamed);
    }
    Ok(columns)
}

fn contribution(
    graph: &EntityGraph,
    owner: &Entity,
    property: &EntityProperty,
    visiting: &mut BTreeSet<EntityId>,
) -> ResolveResult<Vec<IdentityColumn>> {
    let columns = match property.kind {
        PropertyKind::Scalar(scalar) => vec![IdentityColumn::local(
            naming::scalar_column_name(property),
            ColumnType::from_scalar(scalar, &property.facets),
            property,
        )],
        PropertyKind::SharedSimple => {
            let target = graph.resolve_target(owner, property)?;
            vec![IdentityColumn::local(
                naming::scalar_column_name(property),
                shared_column_type(graph.entity(target)),
                property,
            )]
        }
        PropertyKind::Descriptor => {
            let target = graph.resolve_target(owner, property)?;
            let target_name = &graph.entity(target).metaed_name;
            vec![
                IdentityColumn::local(
                    naming::descriptor_column_name(property),
                    ColumnType::Integer,
                    property,
                )
                .referencing(target, naming::descriptor_key_name(target_name)),
            ]
        }
        PropertyKind::Enumeration => {
            let target = graph.resolve_target(owner, property)?;
            let target_name = &graph.entity(target).metaed_name;
            vec![
                IdentityColumn::local(
                    naming::enumeration_column_name(property),
                    ColumnType::Integer,
                    property,
                )
                .referencing(target, naming::enumeration_key_name(target_name)),
            ]
        }
        PropertyKind::DomainEntity
        | PropertyKind::Association
        | PropertyKind::Common
        | PropertyKind::InlineCommon => {
            let target = graph.resolve_target(owner, property)?;
            let prefix = naming::role_prefix(property);
            resolve(graph, target, visiting)?
                .into_iter()
                .map(|c| {
                    IdentityColumn::local(format!("{}{}", prefix, c.name), c.column_type, property)
                        .referencing(target, c.name)
                })
                .collect()
        }
        PropertyKind::Choice => Vec::new(),
    };
    Ok(columns)
}

/// Column type of a shared simple type entity
pub fn shared_column_type(shared: &Entity) -> ColumnType {
    match shared.kind {
        EntityKind::SharedInteger if shared.facets.is_wide => ColumnType::BigInteger,
        EntityKind::SharedInteger => ColumnType::Integer,
        EntityKind::SharedDecimal => ColumnType::Decimal {
            precision: shared.facets.total_digits.unwrap_or(18),
            scale: shared.facets.decimal_places.unwrap_or(0),
        },
        _ => ColumnType::String {
            max_length: shared.facets.max_length,
        },
    }
}

/// First occurrence of each column name wins
fn dedupe(columns: Vec<IdentityColumn>) -> Vec<IdentityColumn> {
    let mut seen = HashSet::new();
    columns
        .into_iter()
        .filter(|c| seen.insert(c.name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityDraft;

    fn column_names(columns: &[IdentityColumn]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_reference_identities_are_sorted() {
        let mut b = EntityGraph::builder();
        let ns = b.add_namespace("EdFi", "", false, &[]);
        b.add_entity(
            ns,
            EntityDraft::domain_entity("DomainEntity1")
                .with_property(EntityProperty::integer("Id1").identity()),
        );
        let assoc = b.add_entity(
            ns,
            EntityDraft::association("Association")
                .with_property(EntityProperty::domain_entity("DomainEntity1").identity())
                .with_property(
                    EntityProperty::domain_entity("DomainEntity1")
                        .with_role("Context")
                        .identity(),
                ),
        );
        let graph = b.build();

        let columns = identity_columns(&graph, assoc).unwrap();
        assert_eq!(column_names(&columns), vec!["contextid1", "id1"]);
        assert_eq!(columns[0].referenced_column.as_deref(), Some("id1"));
    }

    #[test]
    fn test_overlapping_paths_are_deduplicated() {
        let mut b = EntityGraph::builder();
        let ns = b.add_namespace("EdFi", "", false, &[]);
        b.add_entity(
            ns,
            EntityDraft::domain_entity("School")
                .with_property(EntityProperty::integer("SchoolId").identity()),
        );
        b.add_entity(
            ns,
            EntityDraft::domain_entity("Session")
                .with_property(EntityProperty::domain_entity("School").identity())
                .with_property(EntityProperty::string("SessionName", 60).identity()),
        );
        let section = b.add_entity(
            ns,
            EntityDraft::domain_entity("Section")
                .with_property(EntityProperty::domain_entity("Session").identity())
                .with_property(EntityProperty::domain_entity("School").identity())
                .with_property(EntityProperty::string("SectionId", 255).identity()),
        );
        let graph = b.build();

        let columns = identity_columns(&graph, section).unwrap();
        assert_eq!(
            column_names(&columns),
            vec!["schoolid", "sectionid", "sessionname"]
        );
    }

    #[test]
    fn test_subclass_rename_keeps_position_and_link() {
        let mut b = EntityGraph::builder();
        let ns = b.add_namespace("EdFi", "", false, &[]);
        b.add_entity(
            ns,
            EntityDraft::domain_entity("Base")
                .abstract_entity()
                .with_property(EntityProperty::string("S", 30).identity())
                .with_property(EntityProperty::integer("T").identity()),
        );
        let sub = b.add_entity(
            ns,
            EntityDraft::subclass_of(EntityKind::DomainEntitySubclass, "Sub", "Base")
                .with_property(EntityProperty::string("S2", 30).renames_identity("S")),
        );
        let graph = b.build();

        let columns = identity_columns(&graph, sub).unwrap();
        assert_eq!(column_names(&columns), vec!["s2", "t"]);
        assert_eq!(columns[0].referenced_column.as_deref(), Some("s"));
        assert_eq!(columns[1].referenced_column.as_deref(), Some("t"));
    }

    #[test]
    fn test_descriptor_and_empty_identity() {
        let mut b = EntityGraph::builder();
        let ns = b.add_namespace("EdFi", "", false, &[]);
        let desc = b.add_entity(ns, EntityDraft::descriptor("GradeLevel"));
        let common = b.add_entity(
            ns,
            EntityDraft::common("Note").with_property(EntityProperty::string("Text", 100)),
        );
        let graph = b.build();

        let columns = identity_columns(&graph, desc).unwrap();
        assert_eq!(column_names(&columns), vec!["gradeleveldescriptorid"]);
        assert!(identity_columns(&graph, common).unwrap().is_empty());
    }

    #[test]
    fn test_extension_identity_equals_base() {
        let mut b = EntityGraph::builder();
        let core = b.add_namespace("EdFi", "", false, &[]);
        let ext = b.add_namespace("Sample", "SAMPLE", true, &["EdFi"]);
        let student = b.add_entity(
            core,
            EntityDraft::domain_entity("Student")
                .with_property(EntityProperty::integer("StudentUsi").identity()),
        );
        let extension = b.add_entity(
            ext,
            EntityDraft::subclass_of(EntityKind::DomainEntityExtension, "Student", "Student"),
        );
        let graph = b.build();

        assert_eq!(
            identity_columns(&graph, extension).unwrap(),
            identity_columns(&graph, student).unwrap()
        );
    }

    #[test]
    fn test_identity_cycle() {
        let mut b = EntityGraph::builder();
        let ns = b.add_namespace("EdFi", "", false, &[]);
        let a = b.add_entity(
            ns,
            EntityDraft::domain_entity("A")
                .with_property(EntityProperty::domain_entity("B").identity()),
        );
        b.add_entity(
            ns,
            EntityDraft::domain_entity("B")
                .with_property(EntityProperty::domain_entity("A").identity()),
        );
        let graph = b.build();

        assert!(matches!(
            identity_columns(&graph, a),
            Err(ResolveError::IdentityCycle(_))
        ));
    }

    #[test]
    fn test_subclass_warning_for_plain_identity() {
        let mut b = EntityGraph::builder();
        let ns = b.add_namespace("EdFi", "", false, &[]);
        b.add_entity(
            ns,
            EntityDraft::domain_entity("Base")
                .with_property(EntityProperty::integer("Id").identity()),
        );
        let sub = b.add_entity(
            ns,
            EntityDraft::subclass_of(EntityKind::DomainEntitySubclass, "Sub", "Base")
                .with_property(EntityProperty::integer("Extra").identity()),
        );
        let graph = b.build();

        let warnings = subclass_identity_warnings(&graph, sub);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "subclass-identity");
        assert_eq!(column_names(&identity_columns(&graph, sub).unwrap()), vec!["id"]);
    }
}
