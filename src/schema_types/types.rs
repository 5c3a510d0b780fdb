//! Per-entity schema types
//!
//! Complex and simple type descriptors derived from flattened properties. Element names keep
//! the model's casing; reference types carry the identity elements of their entity.

use tracing::debug;

use crate::derived::DerivedStore;
use crate::error::ResolveResult;
use crate::models::{
    Derivation, ElementDescriptor, Entity, EntityGraph, EntityId, EntityKind, EntityProperty,
    Particle, PropertyKind, ScalarType, TypeBody, TypeDescriptor, TypeGroup,
};
use crate::resolve::FlattenedItem;

use super::base::{COMPLEX_OBJECT_TYPE, DESCRIPTOR_REFERENCE_TYPE, DESCRIPTOR_TYPE};

/// Builtin type of a scalar
pub fn builtin_type(scalar: ScalarType, is_wide: bool) -> &'static str {
    match scalar {
        ScalarType::Integer if is_wide => "xs:long",
        ScalarType::Integer => "xs:int",
        ScalarType::Short => "xs:short",
        ScalarType::Decimal | ScalarType::Currency | ScalarType::Percent => "xs:decimal",
        ScalarType::String => "xs:string",
        ScalarType::Boolean => "xs:boolean",
        ScalarType::Date => "xs:date",
        ScalarType::Time => "xs:time",
        ScalarType::Datetime => "xs:dateTime",
        ScalarType::Year => "xs:gYear",
        ScalarType::Duration => "xs:duration",
    }
}

pub fn reference_type_name(entity_name: &str) -> String {
    format!("{}ReferenceType", entity_name)
}

pub fn enumeration_type_name(entity_name: &str) -> String {
    if entity_name.ends_with("Type") {
        entity_name.to_string()
    } else {
        format!("{}Type", entity_name)
    }
}

/// Derives schema types for entities
pub struct SchemaTypeBuilder<'a> {
    graph: &'a EntityGraph,
    store: &'a DerivedStore,
}

impl<'a> SchemaTypeBuilder<'a> {
    pub fn new(graph: &'a EntityGraph, store: &'a DerivedStore) -> Self {
        Self { graph, store }
    }

    /// Types owned by one entity; inline commons and choices have none of their own
    pub fn entity_types(&self, id: EntityId) -> ResolveResult<Vec<TypeDescriptor>> {
        let entity = self.graph.entity(id);
        let group = entity.kind.type_group();
        let types = match entity.kind {
            EntityKind::DomainEntity | EntityKind::Association => {
                let items = self.flattened(entity)?;
                let mut main = self.complex(entity, entity.metaed_name.clone(), group);
                set_complex(
                    &mut main,
                    entity.is_abstract,
                    Some(Derivation::extension(COMPLEX_OBJECT_TYPE)),
                    self.particles(items)?,
                );
                vec![main, self.reference_type(entity, items)?]
            }
            EntityKind::DomainEntitySubclass | EntityKind::AssociationSubclass => {
                let base = self.base_name(entity)?;
                let items = self.flattened(entity)?;
                let own_items = own(items, id);
                let mut main = self.complex(entity, entity.metaed_name.clone(), group);
                set_complex(
                    &mut main,
                    entity.is_abstract,
                    Some(Derivation::extension(base)),
                    self.particles(&own_items)?,
                );
                vec![main, self.reference_type(entity, items)?]
            }
            EntityKind::DomainEntityExtension
            | EntityKind::AssociationExtension
            | EntityKind::CommonExtension => self.extension_types(entity, group)?,
            EntityKind::Common => {
                let items = self.flattened(entity)?;
                let mut main = self.complex(entity, entity.metaed_name.clone(), group);
                set_complex(&mut main, false, None, self.particles(items)?);
                vec![main]
            }
            EntityKind::Descriptor => {
                let items = self.flattened(entity)?;
                let name = format!("{}Descriptor", entity.metaed_name);
                let mut main = self.complex(entity, name, group);
                set_complex(
                    &mut main,
                    false,
                    Some(Derivation::extension(DESCRIPTOR_TYPE)),
                    self.particles(items)?,
                );
                vec![main]
            }
            EntityKind::Enumeration => vec![TypeDescriptor {
                name: enumeration_type_name(&entity.metaed_name),
                group,
                documentation: entity.documentation.clone(),
                body: TypeBody::Enumeration {
                    items: entity.items.iter().map(|i| i.short_description.clone()).collect(),
                },
            }],
            EntityKind::SharedString | EntityKind::SharedInteger | EntityKind::SharedDecimal => {
                vec![TypeDescriptor {
                    name: entity.metaed_name.clone(),
                    group: TypeGroup::Simple,
                    documentation: entity.documentation.clone(),
                    body: TypeBody::Simple {
                        base: shared_builtin(entity).to_string(),
                        facets: entity.facets.clone(),
                    },
                }]
            }
            EntityKind::InlineCommon | EntityKind::Choice => Vec::new(),
        };
        debug!(
            entity = %self.graph.qualified_name(id),
            types = types.len(),
            "Derived schema types"
        );
        Ok(types)
    }

    /// `<Name>Extension`, preceded by `<Name>Restriction` when inherited commons are overridden
    fn extension_types(
        &self,
        entity: &Entity,
        group: TypeGroup,
    ) -> ResolveResult<Vec<TypeDescriptor>> {
        let base = self.base_name(entity)?;
        let items = self.flattened(entity)?;
        let own_items = own(items, entity.id);
        let overrides = own_items
            .iter()
            .any(|item| item.property(self.graph).is_override);

        let mut types = Vec::new();
        let parent = if overrides {
            let inherited: Vec<FlattenedItem> = items
                .iter()
                .filter(|item| item.declared_on() != entity.id)
                .cloned()
                .collect();
            let name = format!("{}Restriction", entity.metaed_name);
            let mut restriction = self.complex(entity, name.clone(), group);
            set_complex(
                &mut restriction,
                false,
                Some(Derivation::restriction(base)),
                self.particles(&inherited)?,
            );
            types.push(restriction);
            name
        } else {
            base
        };

        let name = format!("{}Extension", entity.metaed_name);
        let mut extension = self.complex(entity, name, group);
        set_complex(
            &mut extension,
            false,
            Some(Derivation::extension(parent)),
            self.particles(&own_items)?,
        );
        types.push(extension);
        Ok(types)
    }

    fn reference_type(
        &self,
        entity: &Entity,
        items: &[FlattenedItem],
    ) -> ResolveResult<TypeDescriptor> {
        let renamed: Vec<&str> = items
            .iter()
            .filter_map(|item| item.property(self.graph).identity_rename_of.as_deref())
            .collect();
        let identity: Vec<FlattenedItem> = items
            .iter()
            .filter(|item| {
                let property = item.property(self.graph);
                property.is_part_of_identity
                    && !renamed
                        .iter()
                        .any(|r| r.eq_ignore_ascii_case(&property.metaed_name))
            })
            .cloned()
            .collect();

        let name = reference_type_name(&entity.metaed_name);
        let mut reference = self.complex(entity, name, entity.kind.type_group());
        set_complex(&mut reference, false, None, self.particles(&identity)?);
        Ok(reference)
    }

    fn complex(&self, entity: &Entity, name: String, group: TypeGroup) -> TypeDescriptor {
        let mut descriptor = TypeDescriptor::complex(name, group);
        descriptor.documentation = entity.documentation.clone();
        descriptor
    }

    fn flattened(&self, entity: &Entity) -> ResolveResult<&'a [FlattenedItem]> {
        Ok(self
            .store
            .flattened
            .require(entity.id, &entity.metaed_name)?
            .as_slice())
    }

    fn base_name(&self, entity: &Entity) -> ResolveResult<String> {
        Ok(self
            .graph
            .resolve_base(entity)?
            .map(|base| self.graph.entity(base).metaed_name.clone())
            .unwrap_or_default())
    }

    fn particles(&self, items: &[FlattenedItem]) -> ResolveResult<Vec<Particle>> {
        let mut particles = Vec::with_capacity(items.len());
        for item in items {
            self.add_particles(item, false, &mut particles)?;
        }
        Ok(particles)
    }

    fn add_particles(
        &self,
        item: &FlattenedItem,
        optional: bool,
        out: &mut Vec<Particle>,
    ) -> ResolveResult<()> {
        let graph = self.graph;
        let property = item.property(graph);
        let declaring = graph.entity(item.declared_on());

        if let FlattenedItem::Choice { alternatives, .. } = item {
            let mut group = Vec::new();
            for alternative in alternatives {
                self.add_particles(alternative, false, &mut group)?;
            }
            out.push(Particle::Choice { alternatives: group });
            return Ok(());
        }

        let optional = optional || property.cardinality.is_optional();
        if property.kind == PropertyKind::InlineCommon && !property.cardinality.is_collection() {
            let target = graph.resolve_target(declaring, property)?;
            let nested = self
                .store
                .flattened
                .require(target, &graph.entity(target).metaed_name)?;
            for nested_item in nested {
                self.add_particles(nested_item, optional, out)?;
            }
            return Ok(());
        }

        let (name, type_name) = self.element_naming(declaring, property)?;
        out.push(Particle::Element(ElementDescriptor {
            name,
            type_name,
            min_occurs: if optional { 0 } else { 1 },
            max_occurs: if property.cardinality.is_collection() {
                None
            } else {
                Some(1)
            },
        }));
        Ok(())
    }

    fn element_naming(
        &self,
        declaring: &Entity,
        property: &EntityProperty,
    ) -> ResolveResult<(String, String)> {
        let graph = self.graph;
        let role = property.effective_role().unwrap_or_default();
        let base_name = format!("{}{}", role, property.metaed_name);
        Ok(match property.kind {
            PropertyKind::Scalar(scalar) => (
                base_name,
                builtin_type(scalar, property.facets.is_wide).to_string(),
            ),
            PropertyKind::SharedSimple => {
                let target = graph.resolve_target(declaring, property)?;
                (base_name, graph.entity(target).metaed_name.clone())
            }
            PropertyKind::Descriptor => {
                graph.resolve_target(declaring, property)?;
                (format!("{}Descriptor", base_name), DESCRIPTOR_REFERENCE_TYPE.to_string())
            }
            PropertyKind::Enumeration => {
                let target = graph.resolve_target(declaring, property)?;
                (base_name, enumeration_type_name(&graph.entity(target).metaed_name))
            }
            PropertyKind::DomainEntity | PropertyKind::Association => {
                let target = graph.resolve_target(declaring, property)?;
                (
                    format!("{}Reference", base_name),
                    reference_type_name(&graph.entity(target).metaed_name),
                )
            }
            PropertyKind::Common | PropertyKind::InlineCommon | PropertyKind::Choice => {
                let target = graph.resolve_target(declaring, property)?;
                let target_name = &graph.entity(target).metaed_name;
                let extended = property.is_override
                    && graph
                        .common_extension_of(declaring.namespace, target)
                        .is_some();
                let type_name = if extended {
                    format!("{}Extension", target_name)
                } else {
                    target_name.clone()
                };
                (base_name, type_name)
            }
        })
    }
}

/// Sort types into output order
pub fn sort_types(types: &mut [TypeDescriptor]) {
    types.sort_by_key(TypeDescriptor::sort_key);
}

fn own(items: &[FlattenedItem], id: EntityId) -> Vec<FlattenedItem> {
    items
        .iter()
        .filter(|item| item.declared_on() == id)
        .cloned()
        .collect()
}

fn set_complex(
    descriptor: &mut TypeDescriptor,
    abstract_type: bool,
    base: Option<Derivation>,
    content: Vec<Particle>,
) {
    descriptor.body = TypeBody::Complex {
        is_abstract: abstract_type,
        derivation: base,
        particles: content,
    };
}

fn shared_builtin(entity: &Entity) -> &'static str {
    match entity.kind {
        EntityKind::SharedInteger if entity.facets.is_wide => "xs:long",
        EntityKind::SharedInteger => "xs:int",
        EntityKind::SharedDecimal => "xs:decimal",
        _ => "xs:string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DerivationKind, EntityDraft};
    use crate::resolve::flatten_properties;

    fn prepared(graph: &EntityGraph) -> DerivedStore {
        let mut store = DerivedStore::new();
        for entity in graph.entities() {
            if let Ok(items) = flatten_properties(graph, entity.id) {
                store.flattened.insert(entity.id, items);
            }
        }
        store
    }

    fn element_names(descriptor: &TypeDescriptor) -> Vec<&str> {
        descriptor
            .particles()
            .iter()
            .filter_map(Particle::element_name)
            .collect()
    }

    #[test]
    fn test_domain_entity_and_reference_type() {
        let mut b = EntityGraph::builder();
        let ns = b.add_namespace("EdFi", "", false, &[]);
        b.add_entity(ns, EntityDraft::descriptor("GradeLevel"));
        b.add_entity(
            ns,
            EntityDraft::domain_entity("School")
                .with_property(EntityProperty::integer("SchoolId").identity()),
        );
        let id = b.add_entity(
            ns,
            EntityDraft::domain_entity("Student")
                .with_property(EntityProperty::integer("StudentUsi").identity())
                .with_property(EntityProperty::domain_entity("School").with_role("Enrolled"))
                .with_property(EntityProperty::descriptor("GradeLevel").optional())
                .with_property(EntityProperty::string("Nickname", 30).collection()),
        );
        let graph = b.build();
        let store = prepared(&graph);

        let types = SchemaTypeBuilder::new(&graph, &store).entity_types(id).unwrap();
        assert_eq!(types.len(), 2);
        let main = &types[0];
        assert_eq!(main.derivation(), Some(&Derivation::extension(COMPLEX_OBJECT_TYPE)));
        assert_eq!(
            element_names(main),
            vec!["StudentUsi", "EnrolledSchoolReference", "GradeLevelDescriptor", "Nickname"]
        );
        let Particle::Element(grade) = &main.particles()[2] else {
            panic!("expected element");
        };
        assert_eq!(grade.min_occurs, 0);
        assert_eq!(grade.type_name, DESCRIPTOR_REFERENCE_TYPE);
        let Particle::Element(nickname) = &main.particles()[3] else {
            panic!("expected element");
        };
        assert_eq!(nickname.max_occurs, None);

        assert_eq!(types[1].name, "StudentReferenceType");
        assert_eq!(element_names(&types[1]), vec!["StudentUsi"]);
    }

    #[test]
    fn test_extension_with_override_derives_from_restriction() {
        let mut b = EntityGraph::builder();
        let core = b.add_namespace("EdFi", "", false, &[]);
        let sample = b.add_namespace("Sample", "SAMPLE", true, &["EdFi"]);
        b.add_entity(
            core,
            EntityDraft::common("Address").with_property(EntityProperty::string("City", 30)),
        );
        b.add_entity(
            core,
            EntityDraft::domain_entity("Student")
                .with_property(EntityProperty::integer("StudentUsi").identity())
                .with_property(EntityProperty::common("Address").collection()),
        );
        b.add_entity(
            sample,
            EntityDraft::subclass_of(EntityKind::CommonExtension, "Address", "Address")
                .with_property(EntityProperty::string("Complex", 30)),
        );
        let ext = b.add_entity(
            sample,
            EntityDraft::subclass_of(EntityKind::DomainEntityExtension, "Student", "Student")
                .with_property(EntityProperty::common("Address").collection().overriding()),
        );
        let graph = b.build();
        let store = prepared(&graph);

        let types = SchemaTypeBuilder::new(&graph, &store).entity_types(ext).unwrap();
        let names: Vec<_> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["StudentRestriction", "StudentExtension"]);

        let restriction = types[0].derivation().unwrap();
        assert_eq!(restriction.kind, DerivationKind::Restriction);
        assert_eq!(restriction.base, "Student");
        assert_eq!(element_names(&types[0]), vec!["StudentUsi"]);

        assert_eq!(types[1].derivation(), Some(&Derivation::extension("StudentRestriction")));
        let Particle::Element(address) = &types[1].particles()[0] else {
            panic!("expected element");
        };
        assert_eq!(address.type_name, "AddressExtension");
    }

    #[test]
    fn test_choice_and_inline_common_particles() {
        let mut b = EntityGraph::builder();
        let ns = b.add_namespace("EdFi", "", false, &[]);
        b.add_entity(
            ns,
            EntityDraft::inline_common("Name")
                .with_property(EntityProperty::string("FirstName", 75))
                .with_property(EntityProperty::string("LastName", 75)),
        );
        b.add_entity(
            ns,
            EntityDraft::choice("Contact")
                .with_property(EntityProperty::string("Email", 100))
                .with_property(EntityProperty::string("Phone", 20)),
        );
        let id = b.add_entity(
            ns,
            EntityDraft::common("Person")
                .with_property(EntityProperty::inline_common("Name").optional())
                .with_property(EntityProperty::choice("Contact")),
        );
        let graph = b.build();
        let store = prepared(&graph);

        let types = SchemaTypeBuilder::new(&graph, &store).entity_types(id).unwrap();
        assert_eq!(types.len(), 1);
        let particles = types[0].particles();
        assert_eq!(particles.len(), 3);
        let Particle::Element(first) = &particles[0] else {
            panic!("expected element");
        };
        assert_eq!(first.name, "FirstName");
        assert_eq!(first.min_occurs, 0);
        let Particle::Choice { alternatives } = &particles[2] else {
            panic!("expected choice");
        };
        assert_eq!(alternatives.len(), 2);
    }

    #[test]
    fn test_sort_is_grouped_then_case_insensitive() {
        let mut types = vec![
            TypeDescriptor::complex("beta", TypeGroup::Common),
            TypeDescriptor::complex("Alpha", TypeGroup::Common),
            TypeDescriptor::complex("Zulu", TypeGroup::DomainEntity),
        ];
        sort_types(&mut types);
        let names: Vec<_> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Zulu", "Alpha", "beta"]);
    }

    #[test]
    fn test_enumeration_name_is_not_doubled() {
        assert_eq!(enumeration_type_name("Sex"), "SexType");
        assert_eq!(enumeration_type_name("SexType"), "SexType");
    }
}
