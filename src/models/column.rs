//! Column model

use std::fmt;

use serde::{Deserialize, Serialize};

use super::property::{Facets, ScalarType};

/// Semantic column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ColumnType {
    Integer,
    BigInteger,
    Short,
    Decimal { precision: u32, scale: u32 },
    String { max_length: Option<u32> },
    Boolean,
    Date,
    Time,
    DateTime,
    Duration,
    Year,
    Currency,
    Percent,
    Uuid,
    Timestamp,
}

impl ColumnType {
    /// Column type for a scalar property with its facets
    pub fn from_scalar(scalar: ScalarType, facets: &Facets) -> Self {
        match scalar {
            ScalarType::Integer if facets.is_wide => ColumnType::BigInteger,
            ScalarType::Integer => ColumnType::Integer,
            ScalarType::Short => ColumnType::Short,
            ScalarType::Decimal => ColumnType::Decimal {
                precision: facets.total_digits.unwrap_or(18),
                scale: facets.decimal_places.unwrap_or(0),
            },
            ScalarType::String => ColumnType::String {
                max_length: facets.max_length,
            },
            ScalarType::Boolean => ColumnType::Boolean,
            ScalarType::Date => ColumnType::Date,
            ScalarType::Time => ColumnType::Time,
            ScalarType::Datetime => ColumnType::DateTime,
            ScalarType::Year => ColumnType::Year,
            ScalarType::Duration => ColumnType::Duration,
            ScalarType::Currency => ColumnType::Currency,
            ScalarType::Percent => ColumnType::Percent,
        }
    }

    pub fn string(max_length: u32) -> Self {
        ColumnType::String {
            max_length: Some(max_length),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::BigInteger => write!(f, "bigint"),
            ColumnType::Short | ColumnType::Year => write!(f, "smallint"),
            ColumnType::Decimal { precision, scale } => {
                write!(f, "decimal({}, {})", precision, scale)
            }
            ColumnType::String {
                max_length: Some(len),
            } => write!(f, "varchar({})", len),
            ColumnType::String { max_length: None } => write!(f, "varchar"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Date => write!(f, "date"),
            ColumnType::Time => write!(f, "time"),
            ColumnType::DateTime | ColumnType::Timestamp => write!(f, "timestamp"),
            ColumnType::Duration => write!(f, "varchar(30)"),
            ColumnType::Currency => write!(f, "decimal(19, 4)"),
            ColumnType::Percent => write!(f, "decimal(5, 4)"),
            ColumnType::Uuid => write!(f, "uuid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    /// Audit column added to root and join tables
    #[serde(default)]
    pub is_resource: bool,
    /// Property the column was derived from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_property: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            primary_key: false,
            is_resource: false,
            source_property: None,
            description: String::new(),
        }
    }

    /// Not-null key column
    pub fn key(name: impl Into<String>, column_type: ColumnType) -> Self {
        let mut column = Self::new(name, column_type);
        column.primary_key = true;
        column
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn from_property(mut self, property: impl Into<String>) -> Self {
        self.source_property = Some(property.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn resource(name: &str, column_type: ColumnType) -> Self {
        let mut column = Self::new(name, column_type);
        column.is_resource = true;
        column
    }

    /// Merge a column with the same name; key flags are kept and not-null wins
    pub fn merge(&mut self, other: &Column) {
        self.primary_key |= other.primary_key;
        self.nullable = self.nullable && other.nullable && !self.primary_key;
        if self.source_property.is_none() {
            self.source_property = other.source_property.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_integer() {
        let facets = Facets {
            is_wide: true,
            ..Default::default()
        };
        assert_eq!(
            ColumnType::from_scalar(ScalarType::Integer, &facets),
            ColumnType::BigInteger
        );
        assert_eq!(
            ColumnType::from_scalar(ScalarType::Integer, &Facets::default()),
            ColumnType::Integer
        );
    }

    #[test]
    fn test_merge_keeps_key_and_not_null() {
        let mut col = Column::new("schoolid", ColumnType::Integer).nullable(true);
        col.merge(&Column::key("schoolid", ColumnType::Integer));
        assert!(col.primary_key);
        assert!(!col.nullable);
    }

    #[test]
    fn test_display() {
        assert_eq!(ColumnType::string(60).to_string(), "varchar(60)");
        assert_eq!(
            ColumnType::Decimal {
                precision: 9,
                scale: 2
            }
            .to_string(),
            "decimal(9, 2)"
        );
    }
}
