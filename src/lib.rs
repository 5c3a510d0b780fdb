//! Data Modelling Compiler - Entity resolution and relational derivation for metadata models
//!
//! Provides:
//! - An entity/namespace graph with namespace-scoped reference lookup
//! - Property flattening across inheritance and extension
//! - Identity (primary key) resolution
//! - Table, column and foreign-key synthesis
//! - Hierarchical schema-type derivation
//! - An ordered, version-gated pass pipeline

pub mod config;
pub mod derived;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod relational;
pub mod resolve;
pub mod schema_types;
pub mod validation;
pub mod version;

// Re-export commonly used types
pub use config::CompilerConfig;
pub use derived::{DerivedStore, LinkTarget, Plugin, PluginSlot, RelationalData, TableLink};
pub use error::{CompileError, CompileResult, Diagnostic, ResolveError, ResolveResult, Severity};
pub use pipeline::{
    CompilationReport, EnhanceContext, Enhancer, EnhancerResult, ExecutorState, PassOutcome,
    PassStatus, PipelineExecutor,
};
pub use version::{DataStandardVersion, VersionRange};

// Re-export models
pub use models::{
    Column, ColumnType, Entity, EntityDraft, EntityGraph, EntityId, EntityKind, EntityProperty,
    EntityRef, ForeignKey, ForeignKeyKind, Namespace, NamespaceId, OnDelete, PropertyKind, Table,
    TableKind, TypeDescriptor, TypeGroup,
};

/// Load a model document and compile it with `config`
pub fn compile_file(
    path: impl AsRef<std::path::Path>,
    config: CompilerConfig,
) -> anyhow::Result<CompilationReport> {
    let graph = models::loader::load_file(path)?;
    let mut executor = PipelineExecutor::new(config)?;
    Ok(executor.run(&graph)?)
}
