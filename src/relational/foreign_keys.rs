//! Foreign-key derivation
//!
//! Turns the [`TableLink`]s recorded during table synthesis into [`ForeignKey`]s once every
//! table of the model exists. Keys are computed against an immutable store and applied
//! afterwards.

use std::collections::BTreeMap;

use tracing::debug;

use crate::derived::{DerivedStore, LinkTarget, RelationalData, TableLink};
use crate::error::{Diagnostic, ResolveError};
use crate::models::{EntityGraph, EntityId, ForeignKey, Table};

use super::naming;

/// Foreign keys per entity and source table, plus problems found on the way
#[derive(Debug, Clone, Default)]
pub struct ResolvedKeys {
    pub keys: BTreeMap<EntityId, BTreeMap<String, Vec<ForeignKey>>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolvedKeys {
    pub fn key_count(&self) -> usize {
        self.keys.values().flat_map(|t| t.values()).map(Vec::len).sum()
    }

    /// Write the keys onto their source tables, replacing earlier keys
    pub fn apply(self, store: &mut DerivedStore) {
        for (id, tables) in self.keys {
            let Some(record) = store.relational.get_mut(id) else {
                continue;
            };
            for (name, keys) in tables {
                if let Some(table) = record.table_mut(&name) {
                    table.foreign_keys = keys;
                }
            }
        }
    }
}

pub struct ForeignKeyResolver<'a> {
    graph: &'a EntityGraph,
    store: &'a DerivedStore,
}

impl<'a> ForeignKeyResolver<'a> {
    pub fn new(graph: &'a EntityGraph, store: &'a DerivedStore) -> Self {
        Self { graph, store }
    }

    pub fn resolve_all(&self) -> ResolvedKeys {
        let mut resolved = ResolvedKeys::default();
        for (id, record) in self.store.relational.iter() {
            let tables = self.resolve_record(id, record, &mut resolved.diagnostics);
            resolved.keys.insert(id, tables);
        }
        debug!(keys = resolved.key_count(), "Resolved foreign keys");
        resolved
    }

    /// Keys of one entity's tables; ownership keys first, then references, each in the order
    /// their links were recorded
    pub fn resolve_record(
        &self,
        id: EntityId,
        record: &RelationalData,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> BTreeMap<String, Vec<ForeignKey>> {
        let mut grouped: BTreeMap<String, Vec<&TableLink>> = BTreeMap::new();
        for link in &record.links {
            grouped.entry(link.source_table.clone()).or_default().push(link);
        }

        let mut out = BTreeMap::new();
        for (source, mut links) in grouped {
            if record.table(&source).is_none() {
                diagnostics.push(self.diagnostic(
                    id,
                    Diagnostic::error(
                        "foreign-key-source",
                        format!("Link recorded for unknown table '{}'", source),
                    ),
                ));
                continue;
            }
            links.sort_by_key(|l| l.kind);

            let mut keys: Vec<ForeignKey> = Vec::with_capacity(links.len());
            for link in links {
                let Some(key) = self.resolve_link(id, record, link, keys.len() + 1, diagnostics)
                else {
                    continue;
                };
                let duplicate = keys.iter().any(|k| {
                    k.kind == key.kind
                        && k.qualified_target() == key.qualified_target()
                        && k.source_columns == key.source_columns
                });
                if !duplicate {
                    keys.push(key);
                }
            }
            out.insert(source, keys);
        }
        out
    }

    fn resolve_link(
        &self,
        id: EntityId,
        record: &RelationalData,
        link: &TableLink,
        ordinal: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ForeignKey> {
        let target = match self.target_table(id, record, &link.target) {
            Ok(target) => target,
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                return None;
            }
        };

        if target.primary_key.is_empty() {
            diagnostics.push(self.diagnostic(
                id,
                Diagnostic::warning(
                    "foreign-key-empty-identity",
                    format!(
                        "Table '{}' has no primary key; no foreign key from '{}'",
                        target.qualified_name(),
                        link.source_table
                    ),
                ),
            ));
            return None;
        }

        let Some(pairs) = order_by_target_key(&link.column_pairs, target) else {
            diagnostics.push(self.diagnostic(
                id,
                Diagnostic::error(
                    "foreign-key-mismatch",
                    format!(
                        "Columns of '{}' do not match the primary key [{}] of '{}'",
                        link.source_table,
                        target.primary_key.join(", "),
                        target.qualified_name()
                    ),
                ),
            ));
            return None;
        };

        Some(ForeignKey::new(
            naming::foreign_key_name(&link.source_table, ordinal),
            link.kind,
            target.schema.clone(),
            target.name.clone(),
            pairs,
        ))
    }

    fn target_table<'r>(
        &'r self,
        id: EntityId,
        record: &'r RelationalData,
        target: &LinkTarget,
    ) -> Result<&'r Table, Diagnostic> {
        let found = match target {
            LinkTarget::Entity(target) => {
                let name = &self.graph.entity(*target).metaed_name;
                self.store
                    .relational
                    .require(*target, name)
                    .map_err(|e| self.diagnostic(id, Diagnostic::from(&e)))?
                    .main()
                    .ok_or_else(|| ResolveError::MissingPrecomputed {
                        entity: name.clone(),
                        what: "main table",
                    })
            }
            LinkTarget::Local(name) => {
                record
                    .table(name)
                    .ok_or_else(|| ResolveError::MissingPrecomputed {
                        entity: name.clone(),
                        what: "local table",
                    })
            }
            LinkTarget::Table { schema, name } => self
                .store
                .find_table(schema, name)
                .ok_or_else(|| ResolveError::MissingPrecomputed {
                    entity: format!("{}.{}", schema, name),
                    what: "namespace table",
                }),
        };
        found.map_err(|e| self.diagnostic(id, Diagnostic::from(&e)))
    }

    fn diagnostic(&self, id: EntityId, diagnostic: Diagnostic) -> Diagnostic {
        let entity = self.graph.entity(id);
        diagnostic.with_entity(
            self.graph.namespace(entity.namespace).name.clone(),
            entity.metaed_name.clone(),
        )
    }
}

/// Reorder `(source, target)` pairs to follow the target's primary key; `None` unless the
/// target columns are exactly that key
fn order_by_target_key(
    pairs: &[(String, String)],
    target: &Table,
) -> Option<Vec<(String, String)>> {
    if pairs.len() != target.primary_key.len() {
        return None;
    }
    target
        .primary_key
        .iter()
        .map(|key| pairs.iter().find(|(_, t)| t == key).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ColumnType, EntityDraft, EntityProperty, ForeignKeyKind, OnDelete, TableKind,
    };

    fn graph_with(names: &[&str]) -> (EntityGraph, Vec<EntityId>) {
        let mut b = EntityGraph::builder();
        let ns = b.add_namespace("EdFi", "", false, &[]);
        let ids = names
            .iter()
            .map(|n| {
                b.add_entity(
                    ns,
                    EntityDraft::domain_entity(*n)
                        .with_property(EntityProperty::integer("Id").identity()),
                )
            })
            .collect();
        (b.build(), ids)
    }

    fn keyed(name: &str, key: &[&str]) -> Table {
        let mut table = Table::new("edfi", name, TableKind::Primary);
        for column in key {
            table.add_key_column(*column, ColumnType::Integer);
        }
        table
    }

    fn record(tables: Vec<Table>, links: Vec<TableLink>) -> RelationalData {
        RelationalData {
            main_table: tables[0].name.clone(),
            tables,
            links,
        }
    }

    fn link(
        source: &str,
        kind: ForeignKeyKind,
        target: LinkTarget,
        pairs: &[(&str, &str)],
    ) -> TableLink {
        TableLink {
            source_table: source.into(),
            kind,
            target,
            column_pairs: pairs.iter().map(|(s, t)| (s.to_string(), t.to_string())).collect(),
            property: None,
        }
    }

    #[test]
    fn test_pairs_follow_target_key_order() {
        let (graph, ids) = graph_with(&["Session", "Section"]);
        let mut store = DerivedStore::new();
        store.relational.insert(
            ids[0],
            record(vec![keyed("session", &["schoolid", "sessionname"])], vec![]),
        );
        store.relational.insert(
            ids[1],
            record(
                vec![keyed("section", &["sectionid"])],
                vec![link(
                    "section",
                    ForeignKeyKind::Reference,
                    LinkTarget::Entity(ids[0]),
                    &[("sessionname", "sessionname"), ("schoolid", "schoolid")],
                )],
            ),
        );

        let resolved = ForeignKeyResolver::new(&graph, &store).resolve_all();
        assert!(resolved.diagnostics.is_empty());
        let fk = &resolved.keys[&ids[1]]["section"][0];
        assert_eq!(fk.name, "fk_section_1");
        assert_eq!(fk.source_columns, vec!["schoolid", "sessionname"]);
        assert_eq!(fk.on_delete, OnDelete::NoAction);
    }

    #[test]
    fn test_ownership_keys_come_first() {
        let (graph, ids) = graph_with(&["School", "Student"]);
        let mut store = DerivedStore::new();
        store.relational.insert(ids[0], record(vec![keyed("school", &["schoolid"])], vec![]));
        store.relational.insert(
            ids[1],
            record(
                vec![
                    keyed("student", &["studentusi"]),
                    keyed("studentschool", &["schoolid", "studentusi"]),
                ],
                vec![
                    link(
                        "studentschool",
                        ForeignKeyKind::Reference,
                        LinkTarget::Entity(ids[0]),
                        &[("schoolid", "schoolid")],
                    ),
                    link(
                        "studentschool",
                        ForeignKeyKind::Ownership,
                        LinkTarget::Local("student".into()),
                        &[("studentusi", "studentusi")],
                    ),
                ],
            ),
        );

        let mut store_after = store.clone();
        let resolved = ForeignKeyResolver::new(&graph, &store).resolve_all();
        resolved.apply(&mut store_after);

        let join = store_after.relational.get(ids[1]).unwrap().table("studentschool").unwrap();
        assert_eq!(join.foreign_keys.len(), 2);
        assert_eq!(join.foreign_keys[0].kind, ForeignKeyKind::Ownership);
        assert_eq!(join.foreign_keys[0].name, "fk_studentschool_1");
        assert_eq!(join.foreign_keys[0].on_delete, OnDelete::Cascade);
        assert_eq!(join.foreign_keys[1].target_table, "school");
    }

    #[test]
    fn test_mismatched_columns_are_reported() {
        let (graph, ids) = graph_with(&["School", "Student"]);
        let mut store = DerivedStore::new();
        store.relational.insert(
            ids[0],
            record(vec![keyed("school", &["schoolid", "year"])], vec![]),
        );
        store.relational.insert(
            ids[1],
            record(
                vec![keyed("student", &["studentusi"])],
                vec![link(
                    "student",
                    ForeignKeyKind::Reference,
                    LinkTarget::Entity(ids[0]),
                    &[("schoolid", "schoolid")],
                )],
            ),
        );

        let resolved = ForeignKeyResolver::new(&graph, &store).resolve_all();
        assert_eq!(resolved.key_count(), 0);
        assert_eq!(resolved.diagnostics.len(), 1);
        assert_eq!(resolved.diagnostics[0].code, "foreign-key-mismatch");
        assert!(resolved.diagnostics[0].is_error());
    }

    #[test]
    fn test_missing_target_record() {
        let (graph, ids) = graph_with(&["School", "Student"]);
        let mut store = DerivedStore::new();
        store.relational.insert(
            ids[1],
            record(
                vec![keyed("student", &["studentusi"])],
                vec![link(
                    "student",
                    ForeignKeyKind::Reference,
                    LinkTarget::Entity(ids[0]),
                    &[("schoolid", "schoolid")],
                )],
            ),
        );

        let resolved = ForeignKeyResolver::new(&graph, &store).resolve_all();
        assert_eq!(resolved.diagnostics[0].code, "missing-precomputed");
        assert_eq!(resolved.diagnostics[0].entity.as_deref(), Some("Student"));
    }

    #[test]
    fn test_target_without_key_is_skipped_with_warning() {
        let (graph, ids) = graph_with(&["Student"]);
        let mut store = DerivedStore::new();
        store.relational.insert(
            ids[0],
            record(
                vec![keyed("student", &[]), keyed("studentnote", &[])],
                vec![link(
                    "studentnote",
                    ForeignKeyKind::Ownership,
                    LinkTarget::Local("student".into()),
                    &[],
                )],
            ),
        );

        let resolved = ForeignKeyResolver::new(&graph, &store).resolve_all();
        assert_eq!(resolved.key_count(), 0);
        assert_eq!(resolved.diagnostics[0].code, "foreign-key-empty-identity");
        assert!(!resolved.diagnostics[0].is_error());
    }
}
