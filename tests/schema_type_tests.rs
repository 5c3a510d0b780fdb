//! Schema type derivation tests

use data_modelling_compiler::models::{DerivationKind, Particle, TypeBody};
use data_modelling_compiler::{
    CompilationReport, CompilerConfig, EntityDraft, EntityGraph, EntityKind, EntityProperty,
    PipelineExecutor, TypeDescriptor, TypeGroup,
};

fn compile(graph: &EntityGraph) -> CompilationReport {
    PipelineExecutor::new(CompilerConfig::new())
        .unwrap()
        .run(graph)
        .unwrap()
}

fn find<'a>(types: &'a [TypeDescriptor], name: &str) -> &'a TypeDescriptor {
    types
        .iter()
        .find(|t| t.name == name)
        .unwrap_or_else(|| panic!("missing type {}", name))
}

fn elements(descriptor: &TypeDescriptor) -> Vec<Element> {
    descriptor
        .particles()
        .iter()
        .filter_map(|p| match p {
            Particle::Element(e) => Some((
                e.name.clone(),
                e.type_name.clone(),
                e.min_occurs,
                e.max_occurs,
            )),
            Particle::Choice { .. } => None,
        })
        .collect()
}

type Element = (String, String, u32, Option<u32>);

fn el(name: &str, type_name: &str, min: u32, max: Option<u32>) -> Element {
    (name.to_string(), type_name.to_string(), min, max)
}

fn student_graph() -> EntityGraph {
    let mut b = EntityGraph::builder();
    let ns = b.add_namespace("EdFi", "", false, &[]);
    b.add_entity(ns, EntityDraft::descriptor("GradeLevel"));
    b.add_entity(ns, EntityDraft::enumeration("Sex").with_item("Female").with_item("Male"));
    b.add_entity(
        ns,
        EntityDraft::inline_common("Name")
            .with_property(EntityProperty::string("FirstName", 75))
            .with_property(EntityProperty::string("LastSurname", 75)),
    );
    b.add_entity(
        ns,
        EntityDraft::domain_entity("School")
            .with_property(EntityProperty::integer("SchoolId").identity()),
    );
    b.add_entity(
        ns,
        EntityDraft::domain_entity("Student")
            .with_property(EntityProperty::string("StudentUniqueId", 32).identity())
            .with_property(EntityProperty::domain_entity("School").with_role("Previous").optional())
            .with_property(EntityProperty::descriptor("GradeLevel").collection())
            .with_property(EntityProperty::enumeration("Sex"))
            .with_property(EntityProperty::inline_common("Name").optional()),
    );
    b.build()
}

mod entity_type_tests {
    use super::*;

    #[test]
    fn test_domain_entity_and_reference_types() {
        let report = compile(&student_graph());
        let types = report.types_for("EdFi");

        let student = find(&types, "Student");
        assert_eq!(student.group, TypeGroup::DomainEntity);
        let derivation = student.derivation().unwrap();
        assert_eq!(derivation.kind, DerivationKind::Extension);
        assert_eq!(derivation.base, "ComplexObjectType");
        assert_eq!(
            elements(student),
            vec![
                el("StudentUniqueId", "xs:string", 1, Some(1)),
                el("PreviousSchoolReference", "SchoolReferenceType", 0, Some(1)),
                el("GradeLevelDescriptor", "DescriptorReferenceType", 1, None),
                el("Sex", "SexType", 1, Some(1)),
                el("FirstName", "xs:string", 0, Some(1)),
                el("LastSurname", "xs:string", 0, Some(1)),
            ]
        );

        let reference = find(&types, "StudentReferenceType");
        assert!(reference.derivation().is_none());
        assert_eq!(
            elements(reference),
            vec![el("StudentUniqueId", "xs:string", 1, Some(1))]
        );
    }

    #[test]
    fn test_lookup_types() {
        let report = compile(&student_graph());
        let types = report.types_for("EdFi");

        let descriptor = find(&types, "GradeLevelDescriptor");
        assert_eq!(descriptor.group, TypeGroup::Descriptor);
        assert_eq!(descriptor.derivation().unwrap().base, "DescriptorType");

        match &find(&types, "SexType").body {
            TypeBody::Enumeration { items } => assert_eq!(items, &vec!["Female", "Male"]),
            other => panic!("unexpected body {:?}", other),
        }
        assert!(types.iter().all(|t| t.name != "Name"));
    }

    #[test]
    fn test_output_order_follows_groups() {
        let report = compile(&student_graph());
        let groups: Vec<TypeGroup> = report.types_for("EdFi").iter().map(|t| t.group).collect();
        let mut sorted = groups.clone();
        sorted.sort();
        assert_eq!(groups, sorted);

        let names: Vec<_> = report
            .types_for("EdFi")
            .into_iter()
            .filter(|t| t.group == TypeGroup::DomainEntity)
            .map(|t| t.name)
            .collect();
        assert_eq!(
            names,
            vec!["School", "SchoolReferenceType", "Student", "StudentReferenceType"]
        );
    }

    #[test]
    fn test_choice_becomes_choice_particle() {
        let mut b = EntityGraph::builder();
        let ns = b.add_namespace("EdFi", "", false, &[]);
        b.add_entity(
            ns,
            EntityDraft::choice("ContactChoice")
                .with_property(EntityProperty::string("Email", 128))
                .with_property(EntityProperty::string("Phone", 24)),
        );
        b.add_entity(
            ns,
            EntityDraft::domain_entity("Parent")
                .with_property(EntityProperty::integer("ParentId").identity())
                .with_property(EntityProperty::choice("ContactChoice")),
        );
        let report = compile(&b.build());
        let types = report.types_for("EdFi");

        let parent = find(&types, "Parent");
        let choice = parent
            .particles()
            .iter()
            .find_map(|p| match p {
                Particle::Choice { alternatives } => Some(alternatives),
                Particle::Element(_) => None,
            })
            .unwrap();
        let names: Vec<_> = choice.iter().filter_map(|p| p.element_name()).collect();
        assert_eq!(names, vec!["Email", "Phone"]);
        assert!(types.iter().all(|t| t.name != "ContactChoice"));
    }
}

mod derivation_tests {
    use super::*;

    #[test]
    fn test_subclass_extends_base_with_own_elements() {
        let mut b = EntityGraph::builder();
        let ns = b.add_namespace("EdFi", "", false, &[]);
        b.add_entity(
            ns,
            EntityDraft::domain_entity("EducationOrganization")
                .abstract_entity()
                .with_property(EntityProperty::integer("EducationOrganizationId").identity())
                .with_property(EntityProperty::string("NameOfInstitution", 75)),
        );
        b.add_entity(
            ns,
            EntityDraft::subclass_of(
                EntityKind::DomainEntitySubclass,
                "School",
                "EducationOrganization",
            )
            .with_property(
                EntityProperty::integer("SchoolId").renames_identity("EducationOrganizationId"),
            )
            .with_property(EntityProperty::string("CharterStatus", 20).optional()),
        );
        let report = compile(&b.build());
        let types = report.types_for("EdFi");

        match &find(&types, "EducationOrganization").body {
            TypeBody::Complex { is_abstract, .. } => assert!(*is_abstract),
            other => panic!("unexpected body {:?}", other),
        }

        let school = find(&types, "School");
        assert_eq!(school.derivation().unwrap().base, "EducationOrganization");
        let names: Vec<_> = elements(school).into_iter().map(|e| e.0).collect();
        assert_eq!(names, vec!["SchoolId", "CharterStatus"]);

        let reference = find(&types, "SchoolReferenceType");
        let names: Vec<_> = elements(reference).into_iter().map(|e| e.0).collect();
        assert_eq!(names, vec!["SchoolId"]);
    }

    #[test]
    fn test_extension_with_override_adds_restriction() {
        let mut b = EntityGraph::builder();
        let core = b.add_namespace("EdFi", "", false, &[]);
        let sample = b.add_namespace("Sample", "SAMPLE", true, &["EdFi"]);
        b.add_entity(
            core,
            EntityDraft::common("Address")
                .with_property(EntityProperty::string("City", 30).identity()),
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
                .with_property(EntityProperty::string("Complex", 30).optional()),
        );
        b.add_entity(
            sample,
            EntityDraft::subclass_of(EntityKind::DomainEntityExtension, "Student", "Student")
                .with_property(EntityProperty::common("Address").collection().overriding())
                .with_property(EntityProperty::string("PetName", 20).optional()),
        );
        let report = compile(&b.build());
        let types = report.types_for("Sample");

        let restriction = find(&types, "StudentRestriction");
        assert_eq!(restriction.derivation().unwrap().kind, DerivationKind::Restriction);
        assert_eq!(restriction.derivation().unwrap().base, "Student");

        let extension = find(&types, "StudentExtension");
        assert_eq!(extension.derivation().unwrap().kind, DerivationKind::Extension);
        assert_eq!(extension.derivation().unwrap().base, "StudentRestriction");
        assert_eq!(
            elements(extension),
            vec![
                el("Address", "AddressExtension", 1, None),
                el("PetName", "xs:string", 0, Some(1)),
            ]
        );

        let common_extension = find(&types, "AddressExtension");
        assert_eq!(common_extension.derivation().unwrap().base, "Address");
        assert!(report.types_for("EdFi").iter().any(|t| t.name == "Address"));
    }
}
