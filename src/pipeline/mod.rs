//! Enhancer pipeline
//!
//! Runs the built-in passes in a fixed order over an entity graph. Each pass reads the graph
//! and earlier passes' records and adds its own records to the derived-data store.

pub mod enhancer;
pub mod executor;
pub mod passes;

pub use enhancer::{EnhanceContext, Enhancer, EnhancerResult};
pub use executor::{CompilationReport, ExecutorState, PassOutcome, PassStatus, PipelineExecutor};
pub use passes::default_passes;
