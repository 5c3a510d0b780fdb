//! Table synthesis
//!
//! Derives the tables of one entity from its flattened properties and identity columns, both
//! read from the derived-data store. Relationships are recorded as [`TableLink`]s and turned
//! into foreign keys by a later pass once every table exists.

use tracing::debug;

use crate::derived::{DerivedStore, LinkTarget, RelationalData, TableLink};
use crate::error::{Diagnostic, ResolveError, ResolveResult};
use crate::models::{
    Column, ColumnType, Entity, EntityGraph, EntityId, EntityKind, EntityProperty,
    ForeignKeyKind, PropertyKind, Table, TableKind,
};
use crate::resolve::{FlattenedItem, shared_column_type};

use super::naming;

/// Name of the shared descriptor table in each core namespace
pub const BASE_DESCRIPTOR_TABLE: &str = "descriptor";
/// Key column of the shared descriptor table
pub const BASE_DESCRIPTOR_KEY: &str = "descriptorid";

/// Tables and diagnostics produced for one entity
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    pub data: RelationalData,
    pub diagnostics: Vec<Diagnostic>,
}

impl Synthesis {
    pub fn is_empty(&self) -> bool {
        self.data.tables.is_empty()
    }
}

/// Table a nested structure hangs off
#[derive(Debug, Clone)]
struct Owner {
    /// Name join tables chain from
    table: String,
    key: Vec<(String, ColumnType)>,
    /// Target of the ownership links of nested tables
    target: LinkTarget,
}

impl Owner {
    fn of(table: &Table) -> Self {
        Self {
            table: table.name.clone(),
            key: table
                .key_columns()
                .map(|c| (c.name.clone(), c.column_type))
                .collect(),
            target: LinkTarget::Local(table.name.clone()),
        }
    }

    /// Owner standing in for another entity's main table
    fn entity(id: EntityId, table: String, key: Vec<(String, ColumnType)>) -> Self {
        Self {
            table,
            key,
            target: LinkTarget::Entity(id),
        }
    }

    fn link_pairs(&self) -> Vec<(String, String)> {
        self.key
            .iter()
            .map(|(name, _)| (name.clone(), name.clone()))
            .collect()
    }
}

/// Column context of inline commons and choices
#[derive(Debug, Clone, Default)]
struct Inline {
    prefix: String,
    nullable: bool,
}

impl Inline {
    fn nested(&self, property: &EntityProperty, nullable: bool) -> Self {
        Self {
            prefix: format!("{}{}", self.prefix, naming::role_prefix(property)),
            nullable: self.nullable || nullable,
        }
    }
}

/// Derives tables for entities
pub struct TableSynthesizer<'a> {
    graph: &'a EntityGraph,
    store: &'a DerivedStore,
    resource_columns: bool,
}

impl<'a> TableSynthesizer<'a> {
    pub fn new(graph: &'a EntityGraph, store: &'a DerivedStore) -> Self {
        Self {
            graph,
            store,
            resource_columns: true,
        }
    }

    /// Toggle id/createdate/lastmodifieddate columns
    pub fn with_resource_columns(mut self, include: bool) -> Self {
        self.resource_columns = include;
        self
    }

    /// Tables of one entity; kinds without tables of their own yield an empty synthesis
    pub fn synthesize(&self, id: EntityId) -> ResolveResult<Synthesis> {
        let entity = self.graph.entity(id);
        let mut build = Build::new(self, entity);
        let main = match entity.kind {
            EntityKind::DomainEntity | EntityKind::Association => build.root()?,
            EntityKind::DomainEntitySubclass | EntityKind::AssociationSubclass => {
                build.subclass()?
            }
            EntityKind::DomainEntityExtension | EntityKind::AssociationExtension => {
                build.extension()?
            }
            EntityKind::Descriptor => build.descriptor()?,
            EntityKind::Enumeration => build.enumeration(),
            _ => return Ok(Synthesis::default()),
        };
        debug!(
            entity = %self.graph.qualified_name(id),
            tables = build.tables.len(),
            "Synthesized tables"
        );
        Ok(build.finish(main))
    }

    /// Shared descriptor table of a core namespace
    pub fn base_descriptor_table(&self, schema: &str) -> Table {
        let mut table = Table::new(schema, BASE_DESCRIPTOR_TABLE, TableKind::Primary)
            .with_documentation("Base table shared by all descriptors");
        table.add_key_column(BASE_DESCRIPTOR_KEY, ColumnType::Integer);
        table.add_column(Column::new("namespace", ColumnType::string(255)));
        table.add_column(Column::new("codevalue", ColumnType::string(50)));
        table.add_column(Column::new("shortdescription", ColumnType::string(75)));
        table.add_column(Column::new("description", ColumnType::string(1024)).nullable(true));
        table.add_column(Column::new("effectivebegindate", ColumnType::Date).nullable(true));
        table.add_column(Column::new("effectiveenddate", ColumnType::Date).nullable(true));
        if self.resource_columns {
            table.add_resource_columns();
        }
        table
    }
}

struct Build<'s, 'a> {
    syn: &'s TableSynthesizer<'a>,
    entity: &'a Entity,
    tables: Vec<Table>,
    links: Vec<TableLink>,
    diagnostics: Vec<Diagnostic>,
}

impl<'s, 'a> Build<'s, 'a> {
    fn new(syn: &'s TableSynthesizer<'a>, entity: &'a Entity) -> Self {
        Self {
            syn,
            entity,
            tables: Vec::new(),
            links: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn finish(self, main_table: String) -> Synthesis {
        Synthesis {
            data: RelationalData {
                main_table,
                tables: self.tables,
                links: self.links,
            },
            diagnostics: self.diagnostics,
        }
    }

    fn graph(&self) -> &'a EntityGraph {
        self.syn.graph
    }

    fn store(&self) -> &'a DerivedStore {
        self.syn.store
    }

    fn schema(&self) -> String {
        self.graph().namespace(self.entity.namespace).schema_name()
    }

    fn new_table(&self, name: String, kind: TableKind) -> Table {
        Table::new(self.schema(), name, kind)
            .with_origin(self.graph().qualified_name(self.entity.id))
    }

    fn link(
        &mut self,
        source: &str,
        kind: ForeignKeyKind,
        target: LinkTarget,
        column_pairs: Vec<(String, String)>,
        property: Option<&EntityProperty>,
    ) {
        self.links.push(TableLink {
            source_table: source.to_string(),
            kind,
            target,
            column_pairs,
            property: property.map(|p| p.metaed_name.clone()),
        });
    }

    fn keyed_table(&self, name: String, kind: TableKind) -> ResolveResult<Table> {
        let identity = self
            .store()
            .identity
            .require(self.entity.id, &self.entity.metaed_name)?;
        let mut table = self
            .new_table(name, kind)
            .with_documentation(self.entity.documentation.clone());
        for column in identity {
            table.add_key_column(&column.name, column.column_type);
        }
        Ok(table)
    }

    /// Own items of a subclass or extension, inherited ones stay on the base table
    fn own_flattened(&self) -> ResolveResult<Vec<FlattenedItem>> {
        Ok(self
            .store()
            .flattened
            .require(self.entity.id, &self.entity.metaed_name)?
            .iter()
            .filter(|item| item.declared_on() == self.entity.id)
            .cloned()
            .collect())
    }

    fn base(&self) -> ResolveResult<EntityId> {
        self.graph()
            .resolve_base(self.entity)?
            .ok_or_else(|| ResolveError::UnresolvedBase {
                entity: self.entity.metaed_name.clone(),
                base: "(none)".to_string(),
            })
    }

    /// Domain entity or association without a base
    fn root(&mut self) -> ResolveResult<String> {
        let mut table = self.keyed_table(
            naming::primary_table_name(&self.entity.metaed_name),
            TableKind::Primary,
        )?;
        let items = self
            .store()
            .flattened
            .require(self.entity.id, &self.entity.metaed_name)?;
        let owner = Owner::of(&table);
        let mut nested = Vec::new();
        self.add_items(&mut table, &owner, items, &Inline::default(), &mut nested)?;
        if self.syn.resource_columns {
            table.add_resource_columns();
        }
        Ok(self.push_main(table, nested))
    }

    fn subclass(&mut self) -> ResolveResult<String> {
        let base = self.base()?;
        let mut table = self.keyed_table(
            naming::primary_table_name(&self.entity.metaed_name),
            TableKind::Subclass,
        )?;
        let pairs = self
            .store()
            .identity
            .require(self.entity.id, &self.entity.metaed_name)?
            .iter()
            .map(|c| {
                let target = c.referenced_column.clone().unwrap_or_else(|| c.name.clone());
                (c.name.clone(), target)
            })
            .collect();
        self.link(
            &table.name,
            ForeignKeyKind::Ownership,
            LinkTarget::Entity(base),
            pairs,
            None,
        );

        let items = self.own_flattened()?;
        let owner = Owner::of(&table);
        let mut nested = Vec::new();
        self.add_items(&mut table, &owner, &items, &Inline::default(), &mut nested)?;
        Ok(self.push_main(table, nested))
    }

    /// Extension table layered on the base, with a restriction table in between when
    /// inherited commons are overridden. Join tables of the extension's own properties chain
    /// from the base table and are owned by it. The extension table itself is only emitted
    /// when it carries columns beyond its key or owns override joins.
    fn extension(&mut self) -> ResolveResult<String> {
        let base = self.base()?;
        let base_name = self.graph().entity(base).metaed_name.clone();
        let graph = self.graph();

        let (overrides, rest): (Vec<FlattenedItem>, Vec<FlattenedItem>) =
            self.own_flattened()?.into_iter().partition(|item| {
                let property = item.property(graph);
                property.is_override
                    && matches!(property.kind, PropertyKind::Common | PropertyKind::InlineCommon)
            });

        let parent = if overrides.is_empty() {
            LinkTarget::Entity(base)
        } else {
            let restriction = self.keyed_table(
                naming::restriction_table_name(&base_name),
                TableKind::Restriction,
            )?;
            let pairs = Owner::of(&restriction).link_pairs();
            self.link(
                &restriction.name,
                ForeignKeyKind::Ownership,
                LinkTarget::Entity(base),
                pairs,
                None,
            );
            let name = restriction.name.clone();
            self.tables.push(restriction);
            LinkTarget::Local(name)
        };

        let mut table =
            self.keyed_table(naming::extension_table_name(&base_name), TableKind::Extension)?;
        let owner = Owner::of(&table);
        let base_table = naming::primary_table_name(&base_name);
        let base_owner = Owner::entity(base, base_table.clone(), owner.key.clone());

        let mut nested = Vec::new();
        self.add_items(&mut table, &base_owner, &rest, &Inline::default(), &mut nested)?;

        if overrides.is_empty() && table.columns.len() == table.primary_key.len() {
            debug!(table = %table.name, "Skipping extension table without own columns");
            let name = table.name.clone();
            self.tables.extend(nested);
            return Ok(name);
        }
        self.link(
            &table.name,
            ForeignKeyKind::Ownership,
            parent,
            owner.link_pairs(),
            None,
        );

        for item in &overrides {
            let property = item.property(graph);
            let target = graph.resolve_target(self.entity, property)?;
            let source = graph
                .common_extension_of(self.entity.namespace, target)
                .unwrap_or(target);
            let items = self
                .store()
                .flattened
                .require(source, &graph.entity(source).metaed_name)?;
            let name = naming::override_table_name(&base_table, property);
            self.add_common_join(&owner, name, property, target, items, &mut nested)?;
        }
        Ok(self.push_main(table, nested))
    }

    fn descriptor(&mut self) -> ResolveResult<String> {
        let graph = self.graph();
        let core = graph
            .core_namespace_of(self.entity.namespace)
            .ok_or_else(|| ResolveError::UnresolvedReference {
                reference: BASE_DESCRIPTOR_TABLE.to_string(),
                family: "base descriptor table".to_string(),
                namespace: graph.namespace(self.entity.namespace).name.clone(),
            })?;
        let mut table = self.keyed_table(
            naming::descriptor_table_name(&self.entity.metaed_name),
            TableKind::Primary,
        )?;
        let key = naming::descriptor_key_name(&self.entity.metaed_name);
        self.link(
            &table.name,
            ForeignKeyKind::Ownership,
            LinkTarget::Table {
                schema: graph.namespace(core).schema_name(),
                name: BASE_DESCRIPTOR_TABLE.to_string(),
            },
            vec![(key, BASE_DESCRIPTOR_KEY.to_string())],
            None,
        );

        let items = self
            .store()
            .flattened
            .require(self.entity.id, &self.entity.metaed_name)?;
        let owner = Owner::of(&table);
        let mut nested = Vec::new();
        self.add_items(&mut table, &owner, items, &Inline::default(), &mut nested)?;
        Ok(self.push_main(table, nested))
    }

    fn enumeration(&mut self) -> String {
        let mut table = self
            .new_table(
                naming::enumeration_table_name(&self.entity.metaed_name),
                TableKind::Primary,
            )
            .with_documentation(self.entity.documentation.clone());
        table.add_key_column(
            naming::enumeration_key_name(&self.entity.metaed_name),
            ColumnType::Integer,
        );
        table.add_column(Column::new("codevalue", ColumnType::string(50)));
        table.add_column(Column::new("shortdescription", ColumnType::string(450)));
        table.add_column(Column::new("description", ColumnType::string(1024)).nullable(true));
        if self.syn.resource_columns {
            table.add_resource_columns();
        }
        self.push_main(table, Vec::new())
    }

    fn push_main(&mut self, table: Table, nested: Vec<Table>) -> String {
        let name = table.name.clone();
        self.tables.push(table);
        self.tables.extend(nested);
        name
    }

    fn add_items(
        &mut self,
        table: &mut Table,
        owner: &Owner,
        items: &[FlattenedItem],
        inline: &Inline,
        out: &mut Vec<Table>,
    ) -> ResolveResult<()> {
        let graph = self.graph();
        for item in items {
            match item {
                FlattenedItem::Choice { alternatives, .. } => {
                    let group = inline.nested(item.property(graph), true);
                    self.add_items(table, owner, alternatives, &group, out)?;
                }
                FlattenedItem::Property { declared_on, .. } => {
                    let declaring = graph.entity(*declared_on);
                    self.add_property(table, owner, declaring, item.property(graph), inline, out)?;
                }
            }
        }
        Ok(())
    }

    fn add_property(
        &mut self,
        table: &mut Table,
        owner: &Owner,
        declaring: &'a Entity,
        property: &'a EntityProperty,
        inline: &Inline,
        out: &mut Vec<Table>,
    ) -> ResolveResult<()> {
        if property.cardinality.is_collection() || property.kind == PropertyKind::Common {
            return self.add_join_table(owner, declaring, property, inline, out);
        }

        let graph = self.graph();
        let nullable = inline.nullable || property.cardinality.is_optional();
        let column = |name: String, column_type: ColumnType| {
            Column::new(format!("{}{}", inline.prefix, name), column_type)
                .nullable(nullable)
                .from_property(property.metaed_name.clone())
                .with_description(property.documentation.clone())
        };

        match property.kind {
            PropertyKind::Scalar(scalar) => {
                table.add_column(column(
                    naming::scalar_column_name(property),
                    ColumnType::from_scalar(scalar, &property.facets),
                ));
            }
            PropertyKind::SharedSimple => {
                let target = graph.resolve_target(declaring, property)?;
                table.add_column(column(
                    naming::scalar_column_name(property),
                    shared_column_type(graph.entity(target)),
                ));
            }
            PropertyKind::Descriptor | PropertyKind::Enumeration => {
                let (local, target, target_key) = self.lookup_column(declaring, property)?;
                let col = column(local, ColumnType::Integer);
                let pairs = vec![(col.name.clone(), target_key)];
                table.add_column(col);
                self.link(
                    &table.name,
                    ForeignKeyKind::Reference,
                    LinkTarget::Entity(target),
                    pairs,
                    Some(property),
                );
            }
            PropertyKind::DomainEntity | PropertyKind::Association => {
                let target = graph.resolve_target(declaring, property)?;
                let identity = self
                    .store()
                    .identity
                    .require(target, &graph.entity(target).metaed_name)?;
                let prefix = naming::role_prefix(property);
                let mut pairs = Vec::with_capacity(identity.len());
                for c in identity {
                    let col = column(format!("{}{}", prefix, c.name), c.column_type);
                    pairs.push((col.name.clone(), c.name.clone()));
                    table.add_column(col);
                }
                self.link(
                    &table.name,
                    ForeignKeyKind::Reference,
                    LinkTarget::Entity(target),
                    pairs,
                    Some(property),
                );
            }
            PropertyKind::InlineCommon => {
                let target = graph.resolve_target(declaring, property)?;
                let items = self
                    .store()
                    .flattened
                    .require(target, &graph.entity(target).metaed_name)?;
                let group = inline.nested(property, property.cardinality.is_optional());
                self.add_items(table, owner, items, &group, out)?;
            }
            PropertyKind::Common | PropertyKind::Choice => {}
        }
        Ok(())
    }

    /// Local column name, target entity and target key column of a descriptor or enumeration
    fn lookup_column(
        &self,
        declaring: &Entity,
        property: &EntityProperty,
    ) -> ResolveResult<(String, EntityId, String)> {
        let graph = self.graph();
        let target = graph.resolve_target(declaring, property)?;
        let target_name = &graph.entity(target).metaed_name;
        Ok(if property.kind == PropertyKind::Descriptor {
            (
                naming::descriptor_column_name(property),
                target,
                naming::descriptor_key_name(target_name),
            )
        } else {
            (
                naming::enumeration_column_name(property),
                target,
                naming::enumeration_key_name(target_name),
            )
        })
    }

    /// Join table for a common or collection property
    fn add_join_table(
        &mut self,
        owner: &Owner,
        declaring: &'a Entity,
        property: &'a EntityProperty,
        inline: &Inline,
        out: &mut Vec<Table>,
    ) -> ResolveResult<()> {
        let graph = self.graph();
        let name = naming::join_table_name(&owner.table, &inline.prefix, property);

        if matches!(property.kind, PropertyKind::Common | PropertyKind::InlineCommon) {
            let target = graph.resolve_target(declaring, property)?;
            let items = self
                .store()
                .flattened
                .require(target, &graph.entity(target).metaed_name)?;
            return self.add_common_join(owner, name, property, target, items, out);
        }

        let mut key: Vec<(String, ColumnType)> = Vec::new();
        let mut reference = None;
        match property.kind {
            PropertyKind::Scalar(scalar) => key.push((
                naming::scalar_column_name(property),
                ColumnType::from_scalar(scalar, &property.facets),
            )),
            PropertyKind::SharedSimple => {
                let target = graph.resolve_target(declaring, property)?;
                key.push((
                    naming::scalar_column_name(property),
                    shared_column_type(graph.entity(target)),
                ));
            }
            PropertyKind::Descriptor | PropertyKind::Enumeration => {
                let (local, target, target_key) = self.lookup_column(declaring, property)?;
                reference = Some((target, vec![(local.clone(), target_key)]));
                key.push((local, ColumnType::Integer));
            }
            PropertyKind::DomainEntity | PropertyKind::Association => {
                let target = graph.resolve_target(declaring, property)?;
                let identity = self
                    .store()
                    .identity
                    .require(target, &graph.entity(target).metaed_name)?;
                let prefix = naming::role_prefix(property);
                let mut pairs = Vec::new();
                for c in identity {
                    let local = format!("{}{}", prefix, c.name);
                    pairs.push((local.clone(), c.name.clone()));
                    key.push((local, c.column_type));
                }
                reference = Some((target, pairs));
            }
            _ => return Ok(()),
        }
        if self.key_collides(&name, &key, owner) {
            return Ok(());
        }

        let mut join = self
            .new_table(name, TableKind::Join)
            .with_documentation(property.documentation.clone());
        for (column, column_type) in key.iter().chain(owner.key.iter()) {
            join.add_key_column(column, *column_type);
        }
        for column in join.columns.iter_mut().take(key.len()) {
            column.source_property = Some(property.metaed_name.clone());
        }
        self.link(
            &join.name,
            ForeignKeyKind::Ownership,
            owner.target.clone(),
            owner.link_pairs(),
            None,
        );
        if let Some((target, pairs)) = reference {
            self.link(
                &join.name,
                ForeignKeyKind::Reference,
                LinkTarget::Entity(target),
                pairs,
                Some(property),
            );
        }
        if self.syn.resource_columns {
            join.add_resource_columns();
        }
        out.push(join);
        Ok(())
    }

    /// Join table for a nested common; its own properties recurse with the join table as owner
    fn add_common_join(
        &mut self,
        owner: &Owner,
        name: String,
        property: &'a EntityProperty,
        common: EntityId,
        items: &'a [FlattenedItem],
        out: &mut Vec<Table>,
    ) -> ResolveResult<()> {
        let graph = self.graph();
        let collection = property.cardinality.is_collection();

        let mut key: Vec<(String, ColumnType)> = Vec::new();
        if collection {
            let common_name = &graph.entity(common).metaed_name;
            let identity = self.store().identity.require(common, common_name)?;
            if !identity.is_empty() {
                key.extend(identity.iter().map(|c| (c.name.clone(), c.column_type)));
            } else if let Some(column) = first_scalar(graph, items) {
                key.push(column);
            } else {
                self.diagnostics.push(
                    Diagnostic::warning(
                        "collection-without-key",
                        format!(
                            "Collection of '{}' has no column to distinguish rows of '{}'",
                            common_name, name
                        ),
                    )
                    .with_entity(
                        graph.namespace(self.entity.namespace).name.clone(),
                        self.entity.metaed_name.clone(),
                    ),
                );
            }
        }
        if self.key_collides(&name, &key, owner) {
            return Ok(());
        }

        let mut join = self
            .new_table(name, TableKind::Join)
            .with_documentation(property.documentation.clone());
        for (column, column_type) in key.iter().chain(owner.key.iter()) {
            join.add_key_column(column, *column_type);
        }
        self.link(
            &join.name,
            ForeignKeyKind::Ownership,
            owner.target.clone(),
            owner.link_pairs(),
            None,
        );

        let nested_owner = Owner::of(&join);
        let mut deeper = Vec::new();
        self.add_items(&mut join, &nested_owner, items, &Inline::default(), &mut deeper)?;

        let required_singular = !collection && !property.cardinality.is_optional();
        if self.syn.resource_columns && (collection || required_singular) {
            join.add_resource_columns();
        }
        out.push(join);
        out.extend(deeper);
        Ok(())
    }

    /// Reports a join key column that repeats a column of the owner's key
    fn key_collides(&mut self, join: &str, key: &[(String, ColumnType)], owner: &Owner) -> bool {
        let Some((column, _)) = key
            .iter()
            .find(|(name, _)| owner.key.iter().any(|(owned, _)| owned == name))
        else {
            return false;
        };
        let graph = self.graph();
        self.diagnostics.push(
            Diagnostic::error(
                "join-key-collision",
                format!(
                    "Join table '{}' repeats key column '{}' of '{}', a role name is required",
                    join, column, owner.table
                ),
            )
            .with_entity(
                graph.namespace(self.entity.namespace).name.clone(),
                self.entity.metaed_name.clone(),
            ),
        );
        true
    }
}

/// First scalar property of a nested structure, used as a row discriminator
fn first_scalar(graph: &EntityGraph, items: &[FlattenedItem]) -> Option<(String, ColumnType)> {
    items.iter().find_map(|item| match item {
        FlattenedItem::Property { .. } => {
            let property = item.property(graph);
            match property.kind {
                PropertyKind::Scalar(scalar) if !property.cardinality.is_collection() => Some((
                    naming::scalar_column_name(property),
                    ColumnType::from_scalar(scalar, &property.facets),
                )),
                _ => None,
            }
        }
        FlattenedItem::Choice { .. } => None,
    })
}
