//! Hierarchical schema-type descriptors

use serde::{Deserialize, Serialize};

use super::property::Facets;

/// Output section of a type; declaration order is the section order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeGroup {
    DomainEntity,
    Association,
    Common,
    Descriptor,
    Enumeration,
    Base,
    Simple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivationKind {
    Extension,
    Restriction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivation {
    pub kind: DerivationKind,
    pub base: String,
}

impl Derivation {
    pub fn extension(base: impl Into<String>) -> Self {
        Self {
            kind: DerivationKind::Extension,
            base: base.into(),
        }
    }

    pub fn restriction(base: impl Into<String>) -> Self {
        Self {
            kind: DerivationKind::Restriction,
            base: base.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub name: String,
    pub type_name: String,
    pub min_occurs: u32,
    /// `None` is unbounded
    pub max_occurs: Option<u32>,
}

/// Content model entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "particle", rename_all = "lowercase")]
pub enum Particle {
    Element(ElementDescriptor),
    /// Exactly one of the alternatives
    Choice { alternatives: Vec<Particle> },
}

impl Particle {
    pub fn element_name(&self) -> Option<&str> {
        match self {
            Particle::Element(e) => Some(&e.name),
            Particle::Choice { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "body", rename_all = "lowercase")]
pub enum TypeBody {
    Complex {
        is_abstract: bool,
        derivation: Option<Derivation>,
        particles: Vec<Particle>,
    },
    Simple {
        base: String,
        facets: Facets,
    },
    Enumeration {
        items: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    pub group: TypeGroup,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    pub body: TypeBody,
}

impl TypeDescriptor {
    pub fn complex(name: impl Into<String>, group: TypeGroup) -> Self {
        Self {
            name: name.into(),
            group,
            documentation: String::new(),
            body: TypeBody::Complex {
                is_abstract: false,
                derivation: None,
                particles: Vec::new(),
            },
        }
    }

    pub fn particles(&self) -> &[Particle] {
        match &self.body {
            TypeBody::Complex { particles, .. } => particles,
            _ => &[],
        }
    }

    pub fn derivation(&self) -> Option<&Derivation> {
        match &self.body {
            TypeBody::Complex { derivation, .. } => derivation.as_ref(),
            _ => None,
        }
    }

    /// Sort key: section, then case-insensitive name, then exact name
    pub fn sort_key(&self) -> (TypeGroup, String, String) {
        (self.group, self.name.to_lowercase(), self.name.clone())
    }
}
