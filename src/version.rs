//! Data standard versions and the predicates passes use to gate themselves

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CompileError;

static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:[-+][0-9A-Za-z.\-]+)?$").unwrap()
});

/// Semantic-version-like data standard version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataStandardVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl DataStandardVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for DataStandardVersion {
    fn default() -> Self {
        Self::new(3, 1, 0)
    }
}

impl FromStr for DataStandardVersion {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let caps = VERSION_REGEX
            .captures(trimmed)
            .ok_or_else(|| CompileError::InvalidVersion(s.to_string()))?;
        let part = |i: usize| -> Result<u32, CompileError> {
            caps.get(i)
                .map(|m| m.as_str().parse::<u32>())
                .transpose()
                .map(|v| v.unwrap_or(0))
                .map_err(|_| CompileError::InvalidVersion(s.to_string()))
        };
        Ok(Self::new(part(1)?, part(2)?, part(3)?))
    }
}

impl TryFrom<String> for DataStandardVersion {
    type Error = CompileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataStandardVersion> for String {
    fn from(value: DataStandardVersion) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DataStandardVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Version predicate declared by a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionRange {
    /// Applies to every version
    Any,
    /// Applies to exactly this major version
    ExactMajor(u32),
    /// Applies to this major version or greater
    MinMajor(u32),
}

impl VersionRange {
    pub fn satisfied_by(&self, version: &DataStandardVersion) -> bool {
        match self {
            VersionRange::Any => true,
            VersionRange::ExactMajor(major) => version.major == *major,
            VersionRange::MinMajor(major) => version.major >= *major,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRange::Any => write!(f, "*"),
            VersionRange::ExactMajor(major) => write!(f, "{}.x.x", major),
            VersionRange::MinMajor(major) => write!(f, ">={}.0.0", major),
        }
    }
}
