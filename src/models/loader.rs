//! Graph loading from YAML or JSON documents
//!
//! The document shape mirrors the graph: a list of namespaces, each with its dependency names
//! and entities. Parse errors carry the namespace and entity they occurred in.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::entity::{EntityDraft, EntityKind, EntityRef, EnumerationItem};
use super::graph::EntityGraph;
use super::property::{Cardinality, EntityProperty, Facets, PropertyKind, ScalarType};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub namespaces: Vec<NamespaceDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceDocument {
    pub name: String,
    #[serde(default)]
    pub project_extension: String,
    #[serde(default)]
    pub is_extension: bool,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub entities: Vec<EntityDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDocument {
    pub kind: EntityKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub properties: Vec<PropertyDocument>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub facets: Facets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub identity: bool,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renames: Option<String>,
    #[serde(default, rename = "override")]
    pub is_override: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub documentation: String,
    #[serde(flatten)]
    pub facets: Facets,
}

/// Map a document type name to a property kind
pub fn parse_property_kind(type_name: &str) -> Result<PropertyKind> {
    let kind = match type_name {
        "integer" => PropertyKind::Scalar(ScalarType::Integer),
        "short" => PropertyKind::Scalar(ScalarType::Short),
        "decimal" => PropertyKind::Scalar(ScalarType::Decimal),
        "string" => PropertyKind::Scalar(ScalarType::String),
        "boolean" => PropertyKind::Scalar(ScalarType::Boolean),
        "date" => PropertyKind::Scalar(ScalarType::Date),
        "time" => PropertyKind::Scalar(ScalarType::Time),
        "datetime" => PropertyKind::Scalar(ScalarType::Datetime),
        "year" => PropertyKind::Scalar(ScalarType::Year),
        "duration" => PropertyKind::Scalar(ScalarType::Duration),
        "currency" => PropertyKind::Scalar(ScalarType::Currency),
        "percent" => PropertyKind::Scalar(ScalarType::Percent),
        "descriptor" => PropertyKind::Descriptor,
        "enumeration" => PropertyKind::Enumeration,
        "domainEntity" => PropertyKind::DomainEntity,
        "association" => PropertyKind::Association,
        "common" => PropertyKind::Common,
        "inlineCommon" => PropertyKind::InlineCommon,
        "choice" => PropertyKind::Choice,
        "shared" | "sharedSimple" => PropertyKind::SharedSimple,
        other => bail!("Unknown property type '{}'", other),
    };
    Ok(kind)
}

impl PropertyDocument {
    fn into_property(self) -> Result<EntityProperty> {
        let kind = parse_property_kind(&self.type_name)
            .with_context(|| format!("Invalid property '{}'", self.name))?;
        let mut property = EntityProperty::new(self.name, kind);
        property.role_name = self.role;
        property.is_part_of_identity = self.identity || self.renames.is_some();
        property.cardinality = self.cardinality;
        property.identity_rename_of = self.renames;
        property.is_override = self.is_override;
        property.reference_namespace = self.namespace;
        property.documentation = self.documentation;
        property.facets = self.facets;
        Ok(property)
    }
}

impl EntityDocument {
    fn into_draft(self) -> Result<EntityDraft> {
        let name = self.name.clone();
        let mut draft = EntityDraft::new(self.kind, self.name)
            .with_documentation(self.documentation)
            .with_facets(self.facets);
        draft.is_abstract = self.is_abstract;
        draft.base = self.base.as_deref().map(EntityRef::parse);
        if self.kind.has_base() && draft.base.is_none() {
            bail!("{} '{}' must declare a base", self.kind.label(), name);
        }
        for property in self.properties {
            draft.properties.push(property.into_property()?);
        }
        draft.items = self
            .items
            .into_iter()
            .map(|short_description| EnumerationItem {
                short_description,
                documentation: String::new(),
            })
            .collect();
        Ok(draft)
    }
}

impl GraphDocument {
    pub fn into_graph(self) -> Result<EntityGraph> {
        let mut builder = EntityGraph::builder();
        for ns in self.namespaces {
            let deps: Vec<&str> = ns.dependencies.iter().map(String::as_str).collect();
            let id = builder.add_namespace(&ns.name, &ns.project_extension, ns.is_extension, &deps);
            for entity in ns.entities {
                let entity_name = entity.name.clone();
                let draft = entity
                    .into_draft()
                    .with_context(|| format!("In entity {}.{}", ns.name, entity_name))?;
                builder.add_entity(id, draft);
            }
        }
        let graph = builder.build();
        info!(
            namespaces = graph.namespaces().count(),
            entities = graph.entities().count(),
            "Loaded entity graph"
        );
        Ok(graph)
    }
}

/// Load a graph from a YAML document
pub fn load_yaml_str(input: &str) -> Result<EntityGraph> {
    let document: GraphDocument =
        serde_yaml::from_str(input).context("Failed to parse YAML graph document")?;
    document.into_graph()
}

/// Load a graph from a JSON document
pub fn load_json_str(input: &str) -> Result<EntityGraph> {
    let document: GraphDocument =
        serde_json::from_str(input).context("Failed to parse JSON graph document")?;
    document.into_graph()
}

/// Load a graph from a `.yaml`, `.yml` or `.json` file
pub fn load_file(path: impl AsRef<Path>) -> Result<EntityGraph> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph file {}", path.display()))?;
    let result = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json_str(&content),
        Some("yaml") | Some("yml") => load_yaml_str(&content),
        other => bail!(
            "Unsupported graph file extension {:?} for {}",
            other,
            path.display()
        ),
    };
    result.with_context(|| format!("Failed to load graph from {}", path.display()))
}
