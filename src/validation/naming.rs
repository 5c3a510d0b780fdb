//! Table name overlap detection
//!
//! Table names are never deconflicted. Equal names from different entities are reported as
//! warnings; a table name that merely extends an unrelated entity's table name is reported for
//! information, since readers may mistake which entity owns it.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Diagnostic;
use crate::models::{Table, TableKind};

/// Table name validator
#[derive(Debug, Default)]
pub struct TableNameValidator;

impl TableNameValidator {
    pub fn new() -> Self {
        Self
    }

    /// Collisions and prefix overlaps among `tables`, in a stable order
    pub fn check<'t>(&self, tables: impl IntoIterator<Item = &'t Table>) -> Vec<Diagnostic> {
        let tables: Vec<&Table> = tables.into_iter().collect();
        let mut diagnostics = self.detect_collisions(&tables);
        diagnostics.extend(self.detect_prefix_overlaps(&tables));
        diagnostics
    }

    fn detect_collisions(&self, tables: &[&Table]) -> Vec<Diagnostic> {
        let mut by_name: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();
        for table in tables {
            by_name
                .entry((table.schema.as_str(), table.name.as_str()))
                .or_default()
                .insert(table.origin.as_str());
        }

        by_name
            .into_iter()
            .filter(|(_, origins)| origins.len() > 1)
            .map(|((schema, name), origins)| {
                let origins: Vec<&str> = origins
                    .into_iter()
                    .map(|o| if o.is_empty() { "(namespace)" } else { o })
                    .collect();
                Diagnostic::warning(
                    "table-name-collision",
                    format!(
                        "Table '{}.{}' is derived by {}",
                        schema,
                        name,
                        origins.join(" and ")
                    ),
                )
            })
            .collect()
    }

    fn detect_prefix_overlaps(&self, tables: &[&Table]) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for join in tables.iter().filter(|t| t.kind == TableKind::Join) {
            // Names up to the owner's own table are expected
            let own_prefix = tables
                .iter()
                .filter(|t| t.origin == join.origin && t.schema == join.schema)
                .filter(|t| t.name != join.name && join.name.starts_with(&t.name))
                .map(|t| t.name.len())
                .max()
                .unwrap_or(0);

            let mut seen = BTreeSet::new();
            for other in tables.iter().filter(|t| {
                t.kind != TableKind::Join
                    && t.schema == join.schema
                    && !t.origin.is_empty()
                    && t.origin != join.origin
                    && t.name.len() > own_prefix
                    && t.name.len() < join.name.len()
                    && join.name.starts_with(&t.name)
            }) {
                if !seen.insert(other.name.as_str()) {
                    continue;
                }
                diagnostics.push(Diagnostic::info(
                    "table-name-prefix-overlap",
                    format!(
                        "Table '{}' of {} starts with table name '{}' of {}",
                        join.qualified_name(),
                        join.origin,
                        other.name,
                        other.origin
                    ),
                ));
            }
        }
        diagnostics
    }
}
