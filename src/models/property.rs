//! Authored entity properties

use serde::{Deserialize, Serialize};

use super::entity::{EntityRef, KindFamily};

/// Built-in scalar property types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Integer,
    Short,
    Decimal,
    String,
    Boolean,
    Date,
    Time,
    Datetime,
    Year,
    Duration,
    Currency,
    Percent,
}

/// Property variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "scalar", rename_all = "camelCase")]
pub enum PropertyKind {
    Scalar(ScalarType),
    Descriptor,
    Enumeration,
    DomainEntity,
    Association,
    Common,
    InlineCommon,
    Choice,
    SharedSimple,
}

impl PropertyKind {
    /// Entity family this property points at, `None` for scalars
    pub fn reference_family(&self) -> Option<KindFamily> {
        match self {
            PropertyKind::Scalar(_) => None,
            PropertyKind::Descriptor => Some(KindFamily::Descriptor),
            PropertyKind::Enumeration => Some(KindFamily::Enumeration),
            PropertyKind::DomainEntity => Some(KindFamily::DomainEntity),
            PropertyKind::Association => Some(KindFamily::Association),
            PropertyKind::Common => Some(KindFamily::Common),
            PropertyKind::InlineCommon => Some(KindFamily::InlineCommon),
            PropertyKind::Choice => Some(KindFamily::Choice),
            PropertyKind::SharedSimple => Some(KindFamily::SharedSimple),
        }
    }

    /// Reference to another top-level entity with its own table
    pub fn is_entity_reference(&self) -> bool {
        matches!(self, PropertyKind::DomainEntity | PropertyKind::Association)
    }

    /// Nested structure expanded from another entity's properties
    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            PropertyKind::Common | PropertyKind::InlineCommon | PropertyKind::Choice
        )
    }
}

/// Property cardinality, fixed at declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    #[default]
    RequiredScalar,
    OptionalScalar,
    RequiredCollection,
    OptionalCollection,
}

impl Cardinality {
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Cardinality::RequiredCollection | Cardinality::OptionalCollection
        )
    }

    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            Cardinality::OptionalScalar | Cardinality::OptionalCollection
        )
    }
}

/// Type-specific scalar facets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Facets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_digits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<String>,
    /// Selects a wider numeric representation
    pub is_wide: bool,
}

/// A property declared on an entity
///
/// For reference variants `metaed_name` is the name of the referenced entity and
/// `reference_namespace` optionally qualifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityProperty {
    pub metaed_name: String,
    pub kind: PropertyKind,
    #[serde(default)]
    pub documentation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(default)]
    pub is_part_of_identity: bool,
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Inherited identity property this one renames (subclasses only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_rename_of: Option<String>,
    /// Replaces the inherited property with the same name and role (extensions only)
    #[serde(default)]
    pub is_override: bool,
    #[serde(default)]
    pub facets: Facets,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_namespace: Option<String>,
}

impl EntityProperty {
    pub fn new(metaed_name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            metaed_name: metaed_name.into(),
            kind,
            documentation: String::new(),
            role_name: None,
            is_part_of_identity: false,
            cardinality: Cardinality::RequiredScalar,
            identity_rename_of: None,
            is_override: false,
            facets: Facets::default(),
            reference_namespace: None,
        }
    }

    pub fn scalar(metaed_name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(metaed_name, PropertyKind::Scalar(scalar))
    }

    pub fn integer(metaed_name: impl Into<String>) -> Self {
        Self::scalar(metaed_name, ScalarType::Integer)
    }

    pub fn string(metaed_name: impl Into<String>, max_length: u32) -> Self {
        Self::scalar(metaed_name, ScalarType::String).with_max_length(max_length)
    }

    pub fn descriptor(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Descriptor)
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Enumeration)
    }

    pub fn domain_entity(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::DomainEntity)
    }

    pub fn association(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Association)
    }

    pub fn common(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Common)
    }

    pub fn inline_common(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::InlineCommon)
    }

    pub fn choice(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Choice)
    }

    pub fn shared(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::SharedSimple)
    }

    /// Mark as part of the entity identity
    pub fn identity(mut self) -> Self {
        self.is_part_of_identity = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.cardinality = Cardinality::OptionalScalar;
        self
    }

    pub fn collection(mut self) -> Self {
        self.cardinality = Cardinality::RequiredCollection;
        self
    }

    pub fn optional_collection(mut self) -> Self {
        self.cardinality = Cardinality::OptionalCollection;
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role_name = Some(role.into());
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = documentation.into();
        self
    }

    /// Rename an inherited identity property; implies identity
    pub fn renames_identity(mut self, inherited: impl Into<String>) -> Self {
        self.identity_rename_of = Some(inherited.into());
        self.is_part_of_identity = true;
        self
    }

    pub fn overriding(mut self) -> Self {
        self.is_override = true;
        self
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.reference_namespace = Some(namespace.into());
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.facets.max_length = Some(max_length);
        self
    }

    pub fn with_precision(mut self, total_digits: u32, decimal_places: u32) -> Self {
        self.facets.total_digits = Some(total_digits);
        self.facets.decimal_places = Some(decimal_places);
        self
    }

    pub fn wide(mut self) -> Self {
        self.facets.is_wide = true;
        self
    }

    /// Role name unless it is absent or simply repeats the property name
    pub fn effective_role(&self) -> Option<&str> {
        self.role_name
            .as_deref()
            .filter(|role| !role.is_empty() && !role.eq_ignore_ascii_case(&self.metaed_name))
    }

    /// Key used to match an override against an inherited property
    pub fn override_key(&self) -> (String, Option<String>) {
        (
            self.metaed_name.to_lowercase(),
            self.effective_role().map(str::to_lowercase),
        )
    }

    /// Referenced entity, for reference variants
    pub fn entity_ref(&self) -> Option<EntityRef> {
        self.kind.reference_family().map(|_| EntityRef {
            namespace: self.reference_namespace.clone(),
            name: self.metaed_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_equal_to_name_is_default() {
        let prop = EntityProperty::domain_entity("School").with_role("School");
        assert_eq!(prop.effective_role(), None);

        let prop = EntityProperty::domain_entity("School").with_role("Responsible");
        assert_eq!(prop.effective_role(), Some("Responsible"));
    }

    #[test]
    fn test_rename_implies_identity() {
        let prop = EntityProperty::string("S2", 30).renames_identity("S");
        assert!(prop.is_part_of_identity);
        assert_eq!(prop.identity_rename_of.as_deref(), Some("S"));
    }

    #[test]
    fn test_override_key_ignores_case() {
        let a = EntityProperty::common("Address").with_role("Home").overriding();
        let b = EntityProperty::common("address").with_role("home");
        assert_eq!(a.override_key(), b.override_key());
    }

    #[test]
    fn test_scalar_has_no_entity_ref() {
        assert!(EntityProperty::integer("Id").entity_ref().is_none());
        let r = EntityProperty::domain_entity("School").in_namespace("EdFi");
        let target = r.entity_ref().unwrap();
        assert_eq!(target.namespace.as_deref(), Some("EdFi"));
        assert_eq!(target.name, "School");
    }
}
