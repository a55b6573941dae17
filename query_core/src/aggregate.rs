//! Aggregate functions and pre-execution type validation
//!
//! Aggregate getters validate that the targeted property is declared with a
//! numeric column type before any SQL is issued. Properties absent from the
//! entity definition skip validation; the database decides their fate.

use entity_graph::EntityGraph;

use crate::errors::QueryError;
use crate::path::snake_case;

/// Numeric aggregate applied to one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Min => "MIN",
        }
    }

    /// Suffix used to alias the aggregate result column
    pub fn label(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "average",
            AggregateFunction::Max => "max",
            AggregateFunction::Min => "min",
        }
    }

    /// Method name reported in validation errors
    pub fn method(&self) -> &'static str {
        self.as_sql()
    }

    /// Result alias for a property, e.g. `point_sum`
    pub fn alias_for(&self, property: &str) -> String {
        format!("{}_{}", snake_case(property), self.label())
    }
}

/// Reject aggregates over properties declared with a non-numeric column
/// type. Unknown properties pass through.
pub fn validate_numeric(
    graph: &EntityGraph,
    entity: &str,
    property: &str,
    function: AggregateFunction,
) -> Result<(), QueryError> {
    let Some(column_type) = graph.column_type(entity, property) else {
        return Ok(());
    };
    if column_type.is_numeric() {
        Ok(())
    } else {
        Err(QueryError::NonNumericAggregate {
            property: property.to_string(),
            declared_type: column_type.as_sql().to_string(),
            method: function.method(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_graph::{ColumnType, EntityDef, EntityGraph};

    fn sample_graph() -> EntityGraph {
        EntityGraph::new().register(
            EntityDef::new("User", "users")
                .column("point", ColumnType::Integer)
                .column("name", ColumnType::Varchar),
        )
    }

    #[test]
    fn numeric_column_passes() {
        let graph = sample_graph();
        assert!(validate_numeric(&graph, "User", "point", AggregateFunction::Sum).is_ok());
    }

    #[test]
    fn non_numeric_column_is_rejected_with_details() {
        let graph = sample_graph();
        let err = validate_numeric(&graph, "User", "name", AggregateFunction::Max).unwrap_err();
        match err {
            QueryError::NonNumericAggregate {
                property,
                declared_type,
                method,
            } => {
                assert_eq!(property, "name");
                assert_eq!(declared_type, "varchar");
                assert_eq!(method, "MAX");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_column_skips_validation() {
        let graph = sample_graph();
        assert!(validate_numeric(&graph, "User", "mystery", AggregateFunction::Avg).is_ok());
    }

    #[test]
    fn alias_uses_snake_property_and_label() {
        assert_eq!(AggregateFunction::Sum.alias_for("totalPoint"), "total_point_sum");
        assert_eq!(AggregateFunction::Avg.alias_for("point"), "point_average");
    }
}
