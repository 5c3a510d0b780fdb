//! Foreign key model

use serde::{Deserialize, Serialize};

/// Relationship classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForeignKeyKind {
    /// Structural containment; the child row cannot outlive its parent
    Ownership,
    /// Independent lookup
    Reference,
}

impl ForeignKeyKind {
    pub fn on_delete(&self) -> OnDelete {
        match self {
            ForeignKeyKind::Ownership => OnDelete::Cascade,
            ForeignKeyKind::Reference => OnDelete::NoAction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OnDelete {
    Cascade,
    NoAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub source_columns: Vec<String>,
    pub target_schema: String,
    pub target_table: String,
    pub target_columns: Vec<String>,
    pub kind: ForeignKeyKind,
    pub on_delete: OnDelete,
}

impl ForeignKey {
    pub fn new(
        name: impl Into<String>,
        kind: ForeignKeyKind,
        target_schema: impl Into<String>,
        target_table: impl Into<String>,
        column_pairs: Vec<(String, String)>,
    ) -> Self {
        let (source_columns, target_columns) = column_pairs.into_iter().unzip();
        Self {
            name: name.into(),
            source_columns,
            target_schema: target_schema.into(),
            target_table: target_table.into(),
            target_columns,
            kind,
            on_delete: kind.on_delete(),
        }
    }

    /// `schema.table` of the target
    pub fn qualified_target(&self) -> String {
        format!("{}.{}", self.target_schema, self.target_table)
    }
}
