//! Built-in passes in pipeline order

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::enhancer::{EnhanceContext, Enhancer, EnhancerResult};
use crate::models::{EntityKind, NamespaceId};
use crate::relational::{ForeignKeyResolver, TableSynthesizer};
use crate::resolve::{flatten_properties, identity_columns, subclass_identity_warnings};
use crate::schema_types::{DescriptorLayout, SchemaTypeBuilder, base_types};
use crate::validation::TableNameValidator;
use crate::version::VersionRange;

/// Every built-in pass in execution order
pub fn default_passes() -> Vec<Box<dyn Enhancer>> {
    vec![
        Box::new(FlattenPropertiesPass),
        Box::new(IdentityColumnsPass),
        Box::new(BaseDescriptorTablePass),
        Box::new(EntityTablesPass::descriptors()),
        Box::new(EntityTablesPass::enumerations()),
        Box::new(EntityTablesPass::domain_entities()),
        Box::new(EntityTablesPass::associations()),
        Box::new(EntityTablesPass::subclasses()),
        Box::new(EntityTablesPass::extensions()),
        Box::new(ForeignKeysPass),
        Box::new(TableNameOverlapPass),
        Box::new(SchemaTypesPass),
        Box::new(BaseSchemaTypesPass::v2()),
        Box::new(BaseSchemaTypesPass::v3()),
    ]
}

/// Flattened property list of every entity
pub struct FlattenPropertiesPass;

impl Enhancer for FlattenPropertiesPass {
    fn name(&self) -> &'static str {
        "flatten_properties"
    }

    fn enhance(&self, ctx: &mut EnhanceContext<'_>) -> EnhancerResult {
        let mut result = EnhancerResult::new(self.name());
        for entity in ctx.graph.entities() {
            match flatten_properties(ctx.graph, entity.id) {
                Ok(items) => {
                    ctx.store.flattened.insert(entity.id, items);
                    result.entities_processed += 1;
                }
                Err(e) => result.fail_entity(ctx.graph, entity, &e),
            }
        }
        result
    }
}

/// Ordered identity columns of every entity
pub struct IdentityColumnsPass;

impl Enhancer for IdentityColumnsPass {
    fn name(&self) -> &'static str {
        "identity_columns"
    }

    fn enhance(&self, ctx: &mut EnhanceContext<'_>) -> EnhancerResult {
        let mut result = EnhancerResult::new(self.name());
        for entity in ctx.graph.entities() {
            match identity_columns(ctx.graph, entity.id) {
                Ok(columns) => {
                    ctx.store.identity.insert(entity.id, columns);
                    result.entities_processed += 1;
                }
                Err(e) => result.fail_entity(ctx.graph, entity, &e),
            }
            result.extend(subclass_identity_warnings(ctx.graph, entity.id));
        }
        result
    }
}

/// Shared `descriptor` table in each core namespace that descriptors resolve to
pub struct BaseDescriptorTablePass;

impl Enhancer for BaseDescriptorTablePass {
    fn name(&self) -> &'static str {
        "base_descriptor_table"
    }

    fn enhance(&self, ctx: &mut EnhanceContext<'_>) -> EnhancerResult {
        let mut result = EnhancerResult::new(self.name());
        let cores: BTreeSet<NamespaceId> = ctx
            .graph
            .entities()
            .filter(|e| e.kind == EntityKind::Descriptor)
            .filter_map(|e| ctx.graph.core_namespace_of(e.namespace))
            .collect();

        let synthesizer = TableSynthesizer::new(ctx.graph, ctx.store)
            .with_resource_columns(ctx.config.include_resource_columns);
        let tables: Vec<_> = cores
            .into_iter()
            .map(|ns| {
                let schema = ctx.graph.namespace(ns).schema_name();
                (ns, synthesizer.base_descriptor_table(&schema))
            })
            .collect();

        for (ns, table) in tables {
            debug!(namespace = %ctx.graph.namespace(ns).name, "Added base descriptor table");
            ctx.store.namespace_tables.entry(ns).or_default().push(table);
            result.entities_processed += 1;
        }
        result
    }
}

/// Tables for one group of entity kinds
pub struct EntityTablesPass {
    name: &'static str,
    kinds: &'static [EntityKind],
}

impl EntityTablesPass {
    pub fn descriptors() -> Self {
        Self {
            name: "descriptor_tables",
            kinds: &[EntityKind::Descriptor],
        }
    }

    pub fn enumerations() -> Self {
        Self {
            name: "enumeration_tables",
            kinds: &[EntityKind::Enumeration],
        }
    }

    pub fn domain_entities() -> Self {
        Self {
            name: "domain_entity_tables",
            kinds: &[EntityKind::DomainEntity],
        }
    }

    pub fn associations() -> Self {
        Self {
            name: "association_tables",
            kinds: &[EntityKind::Association],
        }
    }

    pub fn subclasses() -> Self {
        Self {
            name: "subclass_tables",
            kinds: &[
                EntityKind::DomainEntitySubclass,
                EntityKind::AssociationSubclass,
            ],
        }
    }

    pub fn extensions() -> Self {
        Self {
            name: "extension_tables",
            kinds: &[
                EntityKind::DomainEntityExtension,
                EntityKind::AssociationExtension,
            ],
        }
    }
}

impl Enhancer for EntityTablesPass {
    fn name(&self) -> &'static str {
        self.name
    }

    fn enhance(&self, ctx: &mut EnhanceContext<'_>) -> EnhancerResult {
        let mut result = EnhancerResult::new(self.name());
        let mut records = Vec::new();
        {
            let synthesizer = TableSynthesizer::new(ctx.graph, ctx.store)
                .with_resource_columns(ctx.config.include_resource_columns);
            for entity in ctx.graph.entities().filter(|e| self.kinds.contains(&e.kind)) {
                // Failures upstream were already reported for this entity
                if !ctx.store.flattened.contains(entity.id)
                    || !ctx.store.identity.contains(entity.id)
                {
                    warn!(
                        entity = %ctx.graph.qualified_name(entity.id),
                        pass = self.name,
                        "Skipping entity without resolved properties"
                    );
                    continue;
                }
                match synthesizer.synthesize(entity.id) {
                    Ok(synthesis) => {
                        result.extend(synthesis.diagnostics);
                        records.push((entity.id, synthesis.data));
                    }
                    Err(e) => result.fail_entity(ctx.graph, entity, &e),
                }
            }
        }

        result.entities_processed = records.len();
        for (id, data) in records {
            ctx.store.relational.insert(id, data);
        }
        result
    }
}

/// Foreign keys for every recorded table link
pub struct ForeignKeysPass;

impl Enhancer for ForeignKeysPass {
    fn name(&self) -> &'static str {
        "foreign_keys"
    }

    fn enhance(&self, ctx: &mut EnhanceContext<'_>) -> EnhancerResult {
        let mut result = EnhancerResult::new(self.name());
        let mut resolved = ForeignKeyResolver::new(ctx.graph, ctx.store).resolve_all();
        result.entities_processed = resolved.keys.len();
        result.extend(std::mem::take(&mut resolved.diagnostics));
        resolved.apply(ctx.store);
        result
    }
}

/// Reports table names that collide or overlap across entities
pub struct TableNameOverlapPass;

impl Enhancer for TableNameOverlapPass {
    fn name(&self) -> &'static str {
        "table_name_overlap"
    }

    fn enhance(&self, ctx: &mut EnhanceContext<'_>) -> EnhancerResult {
        let mut result = EnhancerResult::new(self.name());
        result.extend(TableNameValidator::new().check(ctx.store.all_tables()));
        result.entities_processed = ctx.store.relational.len();
        result
    }
}

/// Schema types of every entity
pub struct SchemaTypesPass;

impl Enhancer for SchemaTypesPass {
    fn name(&self) -> &'static str {
        "schema_types"
    }

    fn enhance(&self, ctx: &mut EnhanceContext<'_>) -> EnhancerResult {
        let mut result = EnhancerResult::new(self.name());
        let mut records = Vec::new();
        {
            let builder = SchemaTypeBuilder::new(ctx.graph, ctx.store);
            for entity in ctx.graph.entities() {
                if !ctx.store.flattened.contains(entity.id) {
                    continue;
                }
                match builder.entity_types(entity.id) {
                    Ok(types) if types.is_empty() => {}
                    Ok(types) => records.push((entity.id, types)),
                    Err(e) => result.fail_entity(ctx.graph, entity, &e),
                }
            }
        }

        result.entities_processed = records.len();
        for (id, types) in records {
            ctx.store.schema_types.insert(id, types);
        }
        result
    }
}

/// Base group types for each core namespace, in the layout of one data standard generation
pub struct BaseSchemaTypesPass {
    name: &'static str,
    range: VersionRange,
    layout: DescriptorLayout,
}

impl BaseSchemaTypesPass {
    pub fn v2() -> Self {
        Self {
            name: "base_schema_types_v2",
            range: VersionRange::ExactMajor(2),
            layout: DescriptorLayout::PriorDescriptor,
        }
    }

    pub fn v3() -> Self {
        Self {
            name: "base_schema_types",
            range: VersionRange::MinMajor(3),
            layout: DescriptorLayout::Namespace,
        }
    }
}

impl Enhancer for BaseSchemaTypesPass {
    fn name(&self) -> &'static str {
        self.name
    }

    fn applies_to(&self) -> VersionRange {
        self.range
    }

    fn enhance(&self, ctx: &mut EnhanceContext<'_>) -> EnhancerResult {
        let mut result = EnhancerResult::new(self.name());
        for ns in ctx.graph.namespaces().filter(|ns| !ns.is_extension) {
            ctx.store
                .namespace_types
                .entry(ns.id)
                .or_default()
                .extend(base_types(self.layout));
            result.entities_processed += 1;
        }
        result
    }
}
