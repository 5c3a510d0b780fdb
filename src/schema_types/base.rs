//! Base group types shared by every core namespace

use crate::models::{
    Derivation, ElementDescriptor, Facets, Particle, TypeBody, TypeDescriptor, TypeGroup,
};

pub const COMPLEX_OBJECT_TYPE: &str = "ComplexObjectType";
pub const DESCRIPTOR_TYPE: &str = "DescriptorType";
pub const DESCRIPTOR_REFERENCE_TYPE: &str = "DescriptorReferenceType";

/// Descriptor layout that differs between data standard generations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorLayout {
    /// 2.x: descriptors may point at a prior descriptor
    PriorDescriptor,
    /// 3.x and later: descriptors carry a required namespace
    Namespace,
}

/// `ComplexObjectType`, `DescriptorType` and `DescriptorReferenceType`
pub fn base_types(layout: DescriptorLayout) -> Vec<TypeDescriptor> {
    let mut complex_object = TypeDescriptor::complex(COMPLEX_OBJECT_TYPE, TypeGroup::Base);
    complex_object.documentation = "Base type for all resource and reference types".into();
    if let TypeBody::Complex { is_abstract, .. } = &mut complex_object.body {
        *is_abstract = true;
    }

    let mut particles = Vec::new();
    if layout == DescriptorLayout::Namespace {
        particles.push(element("Namespace", "xs:string", 1));
    }
    particles.push(element("CodeValue", "xs:string", 1));
    particles.push(element("ShortDescription", "xs:string", 1));
    particles.push(element("Description", "xs:string", 0));
    if layout == DescriptorLayout::PriorDescriptor {
        particles.push(element("PriorDescriptor", DESCRIPTOR_REFERENCE_TYPE, 0));
    }
    particles.push(element("EffectiveBeginDate", "xs:date", 0));
    particles.push(element("EffectiveEndDate", "xs:date", 0));

    let descriptor = TypeDescriptor {
        name: DESCRIPTOR_TYPE.into(),
        group: TypeGroup::Base,
        documentation: "Base type for descriptors".into(),
        body: TypeBody::Complex {
            is_abstract: true,
            derivation: Some(Derivation::extension(COMPLEX_OBJECT_TYPE)),
            particles,
        },
    };

    let reference = TypeDescriptor {
        name: DESCRIPTOR_REFERENCE_TYPE.into(),
        group: TypeGroup::Base,
        documentation: "Reference to a descriptor value".into(),
        body: TypeBody::Simple {
            base: "xs:string".into(),
            facets: Facets {
                max_length: Some(306),
                ..Default::default()
            },
        },
    };

    vec![complex_object, descriptor, reference]
}

fn element(name: &str, type_name: &str, min_occurs: u32) -> Particle {
    Particle::Element(ElementDescriptor {
        name: name.into(),
        type_name: type_name.into(),
        min_occurs,
        max_occurs: Some(1),
    })
}
