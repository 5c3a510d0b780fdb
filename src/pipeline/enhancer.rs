//! Enhancer contract
//!
//! An enhancer is one pass of the pipeline. It reads the entity graph, reads what earlier
//! passes put into the derived-data store and writes its own records. It never aborts the run:
//! entity-scoped failures become diagnostics on its result.

use serde::Serialize;

use crate::config::CompilerConfig;
use crate::derived::DerivedStore;
use crate::error::{Diagnostic, ResolveError};
use crate::models::{Entity, EntityGraph};
use crate::version::VersionRange;

/// Everything a pass may touch
pub struct EnhanceContext<'a> {
    pub graph: &'a EntityGraph,
    pub store: &'a mut DerivedStore,
    pub config: &'a CompilerConfig,
}

/// Outcome of one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhancerResult {
    pub pass: String,
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub entities_processed: usize,
}

impl EnhancerResult {
    pub fn new(pass: &str) -> Self {
        Self {
            pass: pass.to_string(),
            success: true,
            diagnostics: Vec::new(),
            entities_processed: 0,
        }
    }

    /// Record a diagnostic; errors mark the pass as failed
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.success = false;
        }
        self.diagnostics.push(diagnostic.with_pass(self.pass.clone()));
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    /// Record an entity-scoped failure
    pub fn fail_entity(&mut self, graph: &EntityGraph, entity: &Entity, err: &ResolveError) {
        let diagnostic = Diagnostic::from(err).with_entity(
            graph.namespace(entity.namespace).name.clone(),
            entity.metaed_name.clone(),
        );
        self.push(diagnostic);
    }
}

/// One pipeline pass
pub trait Enhancer {
    /// Stable name, also used to disable the pass
    fn name(&self) -> &'static str;

    /// Data standard versions the pass runs for
    fn applies_to(&self) -> VersionRange {
        VersionRange::Any
    }

    fn enhance(&self, ctx: &mut EnhanceContext<'_>) -> EnhancerResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_diagnostic_fails_result() {
        let mut result = EnhancerResult::new("identity_columns");
        result.push(Diagnostic::warning("subclass-identity", "ignored"));
        assert!(result.success);

        result.push(Diagnostic::error("unresolved-base", "missing"));
        assert!(!result.success);
        assert_eq!(result.diagnostics[1].pass.as_deref(), Some("identity_columns"));
    }
}
