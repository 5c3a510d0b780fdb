//! Compiler configuration

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::version::DataStandardVersion;

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Data standard version that gates version-specific passes
    pub data_standard_version: DataStandardVersion,
    /// Treat warnings as a failed compilation (the run still completes)
    pub fail_on_warnings: bool,
    /// Passes to skip by name
    pub disabled_passes: BTreeSet<String>,
    /// Add id/createdate/lastmodifieddate columns to root and join tables
    pub include_resource_columns: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            data_standard_version: DataStandardVersion::default(),
            fail_on_warnings: false,
            disabled_passes: BTreeSet::new(),
            include_resource_columns: true,
        }
    }
}

impl CompilerConfig {
    /// Create a new compiler config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data standard version
    pub fn with_version(mut self, version: DataStandardVersion) -> Self {
        self.data_standard_version = version;
        self
    }

    /// Treat warnings as failures
    pub fn with_fail_on_warnings(mut self, fail: bool) -> Self {
        self.fail_on_warnings = fail;
        self
    }

    /// Skip a pass by name
    pub fn with_disabled_pass(mut self, pass: impl Into<String>) -> Self {
        self.disabled_passes.insert(pass.into());
        self
    }

    /// Toggle resource columns
    pub fn with_resource_columns(mut self, include: bool) -> Self {
        self.include_resource_columns = include;
        self
    }

    /// Parse a TOML configuration document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: CompilerConfig =
            toml::from_str(input).context("Failed to parse compiler configuration")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Load a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.data_standard_version.major == 0 {
            return Err("data_standard_version must have a major version of at least 1".into());
        }
        if let Some(empty) = self.disabled_passes.iter().find(|p| p.trim().is_empty()) {
            return Err(format!("disabled_passes contains a blank name '{}'", empty));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = CompilerConfig::new();
        assert!(config.validate().is_ok());
        assert!(config.include_resource_columns);
        assert_eq!(config.data_standard_version, DataStandardVersion::new(3, 1, 0));
    }

    #[test]
    fn test_builder() {
        let config = CompilerConfig::new()
            .with_version(DataStandardVersion::new(2, 0, 0))
            .with_fail_on_warnings(true)
            .with_disabled_pass("schema_types");

        assert_eq!(config.data_standard_version.major, 2);
        assert!(config.fail_on_warnings);
        assert!(config.disabled_passes.contains("schema_types"));
    }

    #[test]
    fn test_from_toml() {
        let config = CompilerConfig::from_toml_str(
            r#"
            data_standard_version = "2.2.0"
            disabled_passes = ["table_name_overlap"]
            "#,
        )
        .unwrap();

        assert_eq!(config.data_standard_version, DataStandardVersion::new(2, 2, 0));
        assert!(config.disabled_passes.contains("table_name_overlap"));
        assert!(!config.fail_on_warnings);
    }

    #[test]
    fn test_invalid_toml_version() {
        assert!(CompilerConfig::from_toml_str("data_standard_version = \"abc\"").is_err());
        assert!(CompilerConfig::from_toml_str("data_standard_version = \"0.9\"").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fail_on_warnings = true").unwrap();

        let config = CompilerConfig::from_file(file.path()).unwrap();
        assert!(config.fail_on_warnings);

        let missing = CompilerConfig::from_file("/definitely/not/here.toml");
        assert!(missing.is_err());
    }
}
