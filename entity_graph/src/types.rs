//! Column and relation type definitions
//!
//! Declared PostgreSQL storage types for entity columns and the cardinality
//! of entity relations.

use serde::{Deserialize, Serialize};

/// Declared PostgreSQL storage type of an entity column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Uuid,
    Text,
    Varchar,
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    DoublePrecision,
    Timestamp,
    Date,
    Json,
}

impl ColumnType {
    /// Whether aggregate functions SUM/AVG/MIN/MAX may be applied
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::SmallInt
                | ColumnType::Integer
                | ColumnType::BigInt
                | ColumnType::Numeric
                | ColumnType::DoublePrecision
        )
    }

    /// SQL name of this type
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Uuid => "uuid",
            ColumnType::Text => "text",
            ColumnType::Varchar => "varchar",
            ColumnType::Boolean => "boolean",
            ColumnType::SmallInt => "smallint",
            ColumnType::Integer => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Numeric => "numeric",
            ColumnType::DoublePrecision => "double precision",
            ColumnType::Timestamp => "timestamptz",
            ColumnType::Date => "date",
            ColumnType::Json => "jsonb",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Cardinality of a declared relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_types() {
        assert!(ColumnType::Integer.is_numeric());
        assert!(ColumnType::Numeric.is_numeric());
        assert!(ColumnType::DoublePrecision.is_numeric());
        assert!(!ColumnType::Uuid.is_numeric());
        assert!(!ColumnType::Text.is_numeric());
        assert!(!ColumnType::Timestamp.is_numeric());
    }

    #[test]
    fn sql_names() {
        assert_eq!(ColumnType::Uuid.as_sql(), "uuid");
        assert_eq!(ColumnType::DoublePrecision.as_sql(), "double precision");
        assert_eq!(ColumnType::Timestamp.to_string(), "timestamptz");
    }
}
