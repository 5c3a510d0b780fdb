//! Error types for compilation
//!
//! Two kinds of failure exist. [`CompileError`] covers structurally impossible input
//! (cyclic namespaces, self-nesting commons, bad configuration) and aborts a run before any
//! pass executes. [`ResolveError`] is scoped to one entity; passes turn it into a
//! [`Diagnostic`] and keep going.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fatal errors that stop a compilation before any pass runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A namespace lists itself as a dependency
    #[error("Namespace '{0}' declares a dependency on itself")]
    SelfDependency(String),

    /// Namespace dependencies form a cycle
    #[error("Cyclic namespace dependency between: {}", .0.join(", "))]
    CyclicNamespaceDependency(Vec<String>),

    /// Common types nest into themselves directly or transitively
    #[error("Nested common types form a cycle: {}", .0.join(", "))]
    CyclicCommonNesting(Vec<String>),

    /// Compiler configuration is invalid
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Data standard version could not be parsed
    #[error("Invalid data standard version '{0}'")]
    InvalidVersion(String),
}

impl CompileError {
    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            CompileError::SelfDependency(ns) => {
                format!("Remove '{}' from its own dependency list", ns)
            }
            CompileError::CyclicNamespaceDependency(names) => format!(
                "Namespaces {} depend on each other; dependencies must be acyclic",
                names.join(", ")
            ),
            CompileError::CyclicCommonNesting(names) => format!(
                "Common types {} contain each other; nesting must terminate",
                names.join(", ")
            ),
            _ => self.to_string(),
        }
    }
}

/// Result type for fatal compilation operations
pub type CompileResult<T> = Result<T, CompileError>;

/// Entity scoped resolution failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A named entity could not be found in the reachable namespaces
    #[error("Unresolved reference to {family} '{reference}' from namespace '{namespace}'")]
    UnresolvedReference {
        reference: String,
        family: String,
        namespace: String,
    },

    /// A namespace depends on a namespace that does not exist
    #[error("Namespace '{namespace}' depends on unknown namespace '{dependency}'")]
    UnresolvedNamespace {
        namespace: String,
        dependency: String,
    },

    /// The base entity of a subclass or extension could not be found
    #[error("Base entity '{base}' of '{entity}' could not be resolved")]
    UnresolvedBase { entity: String, base: String },

    /// A base chain revisits an entity
    #[error("Inheritance chain of '{0}' is cyclic")]
    InheritanceCycle(String),

    /// Identity columns of an entity depend on themselves through references
    #[error("Identity of '{0}' references itself")]
    IdentityCycle(String),

    /// A pass found no data from the pass it depends on
    #[error("'{entity}' has no {what} computed by an earlier pass")]
    MissingPrecomputed { entity: String, what: &'static str },
}

impl ResolveError {
    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::UnresolvedReference { .. } => "unresolved-reference",
            ResolveError::UnresolvedNamespace { .. } => "unresolved-namespace",
            ResolveError::UnresolvedBase { .. } => "unresolved-base",
            ResolveError::InheritanceCycle(_) => "inheritance-cycle",
            ResolveError::IdentityCycle(_) => "identity-cycle",
            ResolveError::MissingPrecomputed { .. } => "missing-precomputed",
        }
    }
}

/// Result type for entity resolution
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A message attached to a pass and, usually, a single entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            pass: None,
            namespace: None,
            entity: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    /// Set the pass that produced this diagnostic
    pub fn with_pass(mut self, pass: impl Into<String>) -> Self {
        self.pass = Some(pass.into());
        self
    }

    /// Attach the offending entity
    pub fn with_entity(mut self, namespace: impl Into<String>, entity: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self.entity = Some(entity.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<&ResolveError> for Diagnostic {
    fn from(err: &ResolveError) -> Self {
        Diagnostic::error(err.code(), err.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.severity, self.code)?;
        if let (Some(ns), Some(entity)) = (&self.namespace, &self.entity) {
            write!(f, " {}.{}", ns, entity)?;
        }
        write!(f, ": {}", self.message)
    }
}
