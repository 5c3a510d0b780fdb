//! Pipeline executor for running every pass over one entity graph

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn};

use super::enhancer::{EnhanceContext, Enhancer};
use super::passes::default_passes;
use crate::config::CompilerConfig;
use crate::derived::DerivedStore;
use crate::error::{CompileError, CompileResult, Diagnostic, Severity};
use crate::models::{EntityGraph, NamespaceId, Table, TypeDescriptor};
use crate::schema_types::sort_types;
use crate::validation::validate_graph;
use crate::version::DataStandardVersion;

/// Progress of an executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    NotRun,
    /// Index of the pass currently running
    Running(usize),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassStatus {
    Completed,
    Failed,
    Skipped,
}

/// Summary of one pass in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassOutcome {
    pub pass: String,
    pub status: PassStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub entities_processed: usize,
    pub diagnostic_count: usize,
    /// Wall time; left out of the serialized report so reruns compare equal
    #[serde(skip)]
    pub duration_ms: u64,
}

impl PassOutcome {
    fn skipped(pass: &str, reason: String) -> Self {
        Self {
            pass: pass.to_string(),
            status: PassStatus::Skipped,
            skip_reason: Some(reason),
            entities_processed: 0,
            diagnostic_count: 0,
            duration_ms: 0,
        }
    }

    /// Skipped passes count as successful
    pub fn is_success(&self) -> bool {
        self.status != PassStatus::Failed
    }
}

/// Everything a run derived, with its diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct CompilationReport {
    pub version: DataStandardVersion,
    pub fail_on_warnings: bool,
    pub passes: Vec<PassOutcome>,
    pub diagnostics: Vec<Diagnostic>,
    pub store: DerivedStore,
    #[serde(skip)]
    namespaces: Vec<(NamespaceId, String)>,
    #[serde(skip)]
    entity_namespaces: Vec<NamespaceId>,
}

impl CompilationReport {
    fn namespace_id(&self, namespace: &str) -> Option<NamespaceId> {
        self.namespaces
            .iter()
            .find(|(_, name)| name == namespace)
            .map(|(id, _)| *id)
    }

    /// Tables of a namespace: namespace-level tables, then each entity's tables in
    /// declaration order
    pub fn tables_for(&self, namespace: &str) -> Vec<&Table> {
        let Some(ns) = self.namespace_id(namespace) else {
            return Vec::new();
        };
        let mut tables: Vec<&Table> = self
            .store
            .namespace_tables
            .get(&ns)
            .map(|t| t.iter().collect())
            .unwrap_or_default();
        tables.extend(
            self.store
                .relational
                .iter()
                .filter(|(id, _)| self.entity_namespaces.get(id.index()) == Some(&ns))
                .flat_map(|(_, record)| record.tables.iter()),
        );
        tables
    }

    /// A table of a namespace by name
    pub fn table(&self, namespace: &str, name: &str) -> Option<&Table> {
        self.tables_for(namespace).into_iter().find(|t| t.name == name)
    }

    /// Schema types of a namespace in output order
    pub fn types_for(&self, namespace: &str) -> Vec<TypeDescriptor> {
        let Some(ns) = self.namespace_id(namespace) else {
            return Vec::new();
        };
        let mut types: Vec<TypeDescriptor> = self
            .store
            .namespace_types
            .get(&ns)
            .cloned()
            .unwrap_or_default();
        types.extend(
            self.store
                .schema_types
                .iter()
                .filter(|(id, _)| self.entity_namespaces.get(id.index()) == Some(&ns))
                .flat_map(|(_, t)| t.iter().cloned()),
        );
        sort_types(&mut types);
        types
    }

    pub fn diagnostics_of(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.severity == severity)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics_of(Severity::Warning).next().is_some()
    }

    /// No errors, and no warnings when warnings are treated as failures
    pub fn is_success(&self) -> bool {
        !self.has_errors() && !(self.fail_on_warnings && self.has_warnings())
    }

    /// Stable JSON rendering; identical input produces identical output
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Executor that runs passes in order over one graph
pub struct PipelineExecutor {
    config: CompilerConfig,
    passes: Vec<Box<dyn Enhancer>>,
    state: ExecutorState,
}

impl PipelineExecutor {
    /// Create an executor with the built-in passes
    pub fn new(config: CompilerConfig) -> CompileResult<Self> {
        config.validate().map_err(CompileError::InvalidConfig)?;
        Ok(Self {
            config,
            passes: default_passes(),
            state: ExecutorState::NotRun,
        })
    }

    /// Replace the pass list
    pub fn with_passes(mut self, passes: Vec<Box<dyn Enhancer>>) -> Self {
        self.passes = passes;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Names of the configured passes in order
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass; fails only when the graph is structurally invalid
    pub fn run(&mut self, graph: &EntityGraph) -> CompileResult<CompilationReport> {
        let version = self.config.data_standard_version;
        let _span = info_span!("compile_run", version = %version).entered();
        let start = Instant::now();

        info!(
            namespaces = graph.namespaces().count(),
            entities = graph.entities().count(),
            passes = self.passes.len(),
            "Starting compilation"
        );

        if let Err(e) = validate_graph(graph) {
            error!(error = %e, "Graph validation failed");
            return Err(e);
        }

        let mut store = DerivedStore::new();
        let mut diagnostics: Vec<Diagnostic> =
            graph.build_errors().iter().map(Diagnostic::from).collect();
        let mut outcomes = Vec::with_capacity(self.passes.len());

        for (index, pass) in self.passes.iter().enumerate() {
            let name = pass.name();

            if let Some(reason) = self.should_skip_pass(pass.as_ref()) {
                debug!(pass = name, reason = %reason, "Skipping pass");
                outcomes.push(PassOutcome::skipped(name, reason));
                continue;
            }

            let _pass_span = info_span!("enhancer", pass = name).entered();
            self.state = ExecutorState::Running(index);
            let pass_start = Instant::now();

            let mut ctx = EnhanceContext {
                graph,
                store: &mut store,
                config: &self.config,
            };
            let result = pass.enhance(&mut ctx);
            let duration_ms = pass_start.elapsed().as_millis() as u64;

            if result.success {
                info!(
                    pass = name,
                    entities = result.entities_processed,
                    diagnostics = result.diagnostics.len(),
                    duration_ms,
                    "Pass completed"
                );
            } else {
                warn!(
                    pass = name,
                    entities = result.entities_processed,
                    diagnostics = result.diagnostics.len(),
                    "Pass completed with errors"
                );
            }

            outcomes.push(PassOutcome {
                pass: name.to_string(),
                status: if result.success {
                    PassStatus::Completed
                } else {
                    PassStatus::Failed
                },
                skip_reason: None,
                entities_processed: result.entities_processed,
                diagnostic_count: result.diagnostics.len(),
                duration_ms,
            });
            diagnostics.extend(result.diagnostics);
        }

        self.state = ExecutorState::Completed;
        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            diagnostics = diagnostics.len(),
            "Compilation completed"
        );

        Ok(CompilationReport {
            version,
            fail_on_warnings: self.config.fail_on_warnings,
            passes: outcomes,
            diagnostics,
            store,
            namespaces: graph.namespaces().map(|ns| (ns.id, ns.name.clone())).collect(),
            entity_namespaces: graph.entities().map(|e| e.namespace).collect(),
        })
    }

    /// Reason a pass does not run, if any
    fn should_skip_pass(&self, pass: &dyn Enhancer) -> Option<String> {
        if self.config.disabled_passes.contains(pass.name()) {
            return Some("disabled by configuration".to_string());
        }
        let range = pass.applies_to();
        if !range.satisfied_by(&self.config.data_standard_version) {
            return Some(format!(
                "requires data standard {}, running {}",
                range, self.config.data_standard_version
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityDraft, EntityProperty};
    use crate::pipeline::enhancer::EnhancerResult;
    use crate::version::VersionRange;

    struct Failing;

    impl Enhancer for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn enhance(&self, _ctx: &mut EnhanceContext<'_>) -> EnhancerResult {
            let mut result = EnhancerResult::new(self.name());
            result.push(Diagnostic::error("boom", "failed on purpose"));
            result
        }
    }

    struct FutureOnly;

    impl Enhancer for FutureOnly {
        fn name(&self) -> &'static str {
            "future_only"
        }

        fn applies_to(&self) -> VersionRange {
            VersionRange::MinMajor(9)
        }

        fn enhance(&self, _ctx: &mut EnhanceContext<'_>) -> EnhancerResult {
            EnhancerResult::new(self.name())
        }
    }

    fn simple_graph() -> EntityGraph {
        let mut b = EntityGraph::builder();
        let ns = b.add_namespace("EdFi", "", false, &[]);
        b.add_entity(
            ns,
            EntityDraft::domain_entity("School")
                .with_property(EntityProperty::integer("SchoolId").identity()),
        );
        b.build()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CompilerConfig::new().with_disabled_pass(" ");
        assert!(matches!(
            PipelineExecutor::new(config),
            Err(CompileError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_failed_pass_does_not_stop_run() {
        let mut executor = PipelineExecutor::new(CompilerConfig::new())
            .unwrap()
            .with_passes(vec![Box::new(Failing), Box::new(FutureOnly)]);
        assert_eq!(executor.state(), ExecutorState::NotRun);

        let report = executor.run(&simple_graph()).unwrap();
        assert_eq!(executor.state(), ExecutorState::Completed);
        assert_eq!(report.passes.len(), 2);
        assert_eq!(report.passes[0].status, PassStatus::Failed);
        assert_eq!(report.passes[1].status, PassStatus::Skipped);
        assert!(report.passes[1].is_success());
        assert!(report.has_errors());
        assert_eq!(report.diagnostics[0].pass.as_deref(), Some("failing"));
    }

    #[test]
    fn test_disabled_pass_is_skipped() {
        let config = CompilerConfig::new().with_disabled_pass("schema_types");
        let mut executor = PipelineExecutor::new(config).unwrap();
        let report = executor.run(&simple_graph()).unwrap();

        let outcome = report.passes.iter().find(|p| p.pass == "schema_types").unwrap();
        assert_eq!(outcome.status, PassStatus::Skipped);
        assert_eq!(outcome.skip_reason.as_deref(), Some("disabled by configuration"));
        assert!(report.store.schema_types.is_empty());
        assert!(report.table("EdFi", "school").is_some());
    }

    #[test]
    fn test_default_pass_order() {
        let executor = PipelineExecutor::new(CompilerConfig::new()).unwrap();
        let names = executor.pass_names();
        assert_eq!(names.first(), Some(&"flatten_properties"));
        assert_eq!(names.last(), Some(&"base_schema_types"));
        let fk = names.iter().position(|n| *n == "foreign_keys").unwrap();
        let ext = names.iter().position(|n| *n == "extension_tables").unwrap();
        assert!(ext < fk);
    }
}
