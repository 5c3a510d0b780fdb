//! Top-level entities and their kind tags

use std::fmt;

use serde::{Deserialize, Serialize};

use super::namespace::NamespaceId;
use super::property::{EntityProperty, Facets};
use super::schema_type::TypeGroup;

/// Arena index of an entity in an [`EntityGraph`](super::graph::EntityGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Closed set of entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    DomainEntity,
    DomainEntitySubclass,
    DomainEntityExtension,
    Association,
    AssociationSubclass,
    AssociationExtension,
    Common,
    CommonExtension,
    InlineCommon,
    Choice,
    Descriptor,
    Enumeration,
    SharedString,
    SharedInteger,
    SharedDecimal,
}

impl EntityKind {
    pub fn is_subclass(&self) -> bool {
        matches!(
            self,
            EntityKind::DomainEntitySubclass | EntityKind::AssociationSubclass
        )
    }

    pub fn is_extension(&self) -> bool {
        matches!(
            self,
            EntityKind::DomainEntityExtension
                | EntityKind::AssociationExtension
                | EntityKind::CommonExtension
        )
    }

    /// Whether the kind declares a base entity
    pub fn has_base(&self) -> bool {
        self.is_subclass() || self.is_extension()
    }

    pub fn is_shared_simple(&self) -> bool {
        matches!(
            self,
            EntityKind::SharedString | EntityKind::SharedInteger | EntityKind::SharedDecimal
        )
    }

    /// Family the base of a subclass or extension must belong to
    pub fn base_family(&self) -> Option<KindFamily> {
        match self {
            EntityKind::DomainEntitySubclass | EntityKind::DomainEntityExtension => {
                Some(KindFamily::DomainEntity)
            }
            EntityKind::AssociationSubclass | EntityKind::AssociationExtension => {
                Some(KindFamily::Association)
            }
            EntityKind::CommonExtension => Some(KindFamily::Common),
            _ => None,
        }
    }

    /// Output section for the schema-type track
    pub fn type_group(&self) -> TypeGroup {
        match self {
            EntityKind::DomainEntity
            | EntityKind::DomainEntitySubclass
            | EntityKind::DomainEntityExtension => TypeGroup::DomainEntity,
            EntityKind::Association
            | EntityKind::AssociationSubclass
            | EntityKind::AssociationExtension => TypeGroup::Association,
            EntityKind::Common
            | EntityKind::CommonExtension
            | EntityKind::InlineCommon
            | EntityKind::Choice => TypeGroup::Common,
            EntityKind::Descriptor => TypeGroup::Descriptor,
            EntityKind::Enumeration => TypeGroup::Enumeration,
            EntityKind::SharedString | EntityKind::SharedInteger | EntityKind::SharedDecimal => {
                TypeGroup::Simple
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::DomainEntity => "domain entity",
            EntityKind::DomainEntitySubclass => "domain entity subclass",
            EntityKind::DomainEntityExtension => "domain entity extension",
            EntityKind::Association => "association",
            EntityKind::AssociationSubclass => "association subclass",
            EntityKind::AssociationExtension => "association extension",
            EntityKind::Common => "common",
            EntityKind::CommonExtension => "common extension",
            EntityKind::InlineCommon => "inline common",
            EntityKind::Choice => "choice",
            EntityKind::Descriptor => "descriptor",
            EntityKind::Enumeration => "enumeration",
            EntityKind::SharedString => "shared string",
            EntityKind::SharedInteger => "shared integer",
            EntityKind::SharedDecimal => "shared decimal",
        }
    }
}

/// Group of kinds a reference may resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindFamily {
    DomainEntity,
    Association,
    Common,
    InlineCommon,
    Choice,
    Descriptor,
    Enumeration,
    SharedSimple,
}

impl KindFamily {
    /// Extensions are never reference targets
    pub fn admits(&self, kind: EntityKind) -> bool {
        match self {
            KindFamily::DomainEntity => matches!(
                kind,
                EntityKind::DomainEntity | EntityKind::DomainEntitySubclass
            ),
            KindFamily::Association => matches!(
                kind,
                EntityKind::Association | EntityKind::AssociationSubclass
            ),
            KindFamily::Common => kind == EntityKind::Common,
            KindFamily::InlineCommon => kind == EntityKind::InlineCommon,
            KindFamily::Choice => kind == EntityKind::Choice,
            KindFamily::Descriptor => kind == EntityKind::Descriptor,
            KindFamily::Enumeration => kind == EntityKind::Enumeration,
            KindFamily::SharedSimple => kind.is_shared_simple(),
        }
    }
}

impl fmt::Display for KindFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            KindFamily::DomainEntity => "domain entity",
            KindFamily::Association => "association",
            KindFamily::Common => "common",
            KindFamily::InlineCommon => "inline common",
            KindFamily::Choice => "choice",
            KindFamily::Descriptor => "descriptor",
            KindFamily::Enumeration => "enumeration",
            KindFamily::SharedSimple => "shared simple type",
        };
        write!(f, "{}", label)
    }
}

/// Unresolved, by-name pointer to another entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl EntityRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn qualified(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// Parse `Namespace.Name` or a bare `Name`
    pub fn parse(reference: &str) -> Self {
        match reference.split_once('.') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Self::qualified(ns, name),
            _ => Self::new(reference),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}.{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Enumeration item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationItem {
    pub short_description: String,
    #[serde(default)]
    pub documentation: String,
}

/// A top-level entity owned by its namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub id: EntityId,
    pub namespace: NamespaceId,
    pub kind: EntityKind,
    pub metaed_name: String,
    pub documentation: String,
    pub is_abstract: bool,
    pub base: Option<EntityRef>,
    pub properties: Vec<EntityProperty>,
    pub items: Vec<EnumerationItem>,
    /// Facets of a shared simple type
    pub facets: Facets,
}

/// Entity contents before it is placed in a graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDraft {
    pub kind: EntityKind,
    pub metaed_name: String,
    pub documentation: String,
    pub is_abstract: bool,
    pub base: Option<EntityRef>,
    pub properties: Vec<EntityProperty>,
    pub items: Vec<EnumerationItem>,
    pub facets: Facets,
}

impl EntityDraft {
    pub fn new(kind: EntityKind, metaed_name: impl Into<String>) -> Self {
        Self {
            kind,
            metaed_name: metaed_name.into(),
            documentation: String::new(),
            is_abstract: false,
            base: None,
            properties: Vec::new(),
            items: Vec::new(),
            facets: Facets::default(),
        }
    }

    pub fn domain_entity(name: impl Into<String>) -> Self {
        Self::new(EntityKind::DomainEntity, name)
    }

    pub fn association(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Association, name)
    }

    pub fn common(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Common, name)
    }

    pub fn inline_common(name: impl Into<String>) -> Self {
        Self::new(EntityKind::InlineCommon, name)
    }

    pub fn choice(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Choice, name)
    }

    pub fn descriptor(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Descriptor, name)
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Enumeration, name)
    }

    /// Subclass of `base`, which may be `Namespace.Name`
    pub fn subclass_of(kind: EntityKind, name: impl Into<String>, base: &str) -> Self {
        Self::new(kind, name).with_base(EntityRef::parse(base))
    }

    pub fn with_base(mut self, base: EntityRef) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_property(mut self, property: EntityProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_item(mut self, short_description: impl Into<String>) -> Self {
        self.items.push(EnumerationItem {
            short_description: short_description.into(),
            documentation: String::new(),
        });
        self
    }

    pub fn with_facets(mut self, facets: Facets) -> Self {
        self.facets = facets;
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = documentation.into();
        self
    }

    pub fn abstract_entity(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

impl Entity {
    pub(crate) fn from_draft(id: EntityId, namespace: NamespaceId, draft: EntityDraft) -> Self {
        Self {
            id,
            namespace,
            kind: draft.kind,
            metaed_name: draft.metaed_name,
            documentation: draft.documentation,
            is_abstract: draft.is_abstract,
            base: draft.base,
            properties: draft.properties,
            items: draft.items,
            facets: draft.facets,
        }
    }

    /// Own properties marked as part of the identity
    pub fn identity_properties(&self) -> impl Iterator<Item = &EntityProperty> {
        self.properties.iter().filter(|p| p.is_part_of_identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions_are_not_reference_targets() {
        assert!(!KindFamily::DomainEntity.admits(EntityKind::DomainEntityExtension));
        assert!(KindFamily::DomainEntity.admits(EntityKind::DomainEntitySubclass));
        assert!(!KindFamily::Common.admits(EntityKind::CommonExtension));
        assert!(KindFamily::SharedSimple.admits(EntityKind::SharedDecimal));
    }

    #[test]
    fn test_parse_entity_ref() {
        assert_eq!(EntityRef::parse("EdFi.School"), EntityRef::qualified("EdFi", "School"));
        assert_eq!(EntityRef::parse("School"), EntityRef::new("School"));
        assert_eq!(EntityRef::parse(".School"), EntityRef::new(".School"));
    }

    #[test]
    fn test_type_groups() {
        assert_eq!(EntityKind::AssociationExtension.type_group(), TypeGroup::Association);
        assert_eq!(EntityKind::InlineCommon.type_group(), TypeGroup::Common);
        assert_eq!(EntityKind::SharedString.type_group(), TypeGroup::Simple);
    }
}
