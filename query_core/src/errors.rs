use thiserror::Error;

/// Validation and execution failures of the query composition engine.
///
/// Every variant except `Database` is a synchronous validation failure
/// raised at declaration or compile time, before any I/O. None are retried
/// internally; they surface directly to the caller.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Property selector not provided")]
    SelectorMissing,

    #[error("Property selector is required in {method}")]
    SelectorRequired { method: &'static str },

    #[error("Fields have to be unique in {method}")]
    DuplicateSelector { method: &'static str },

    #[error("{entity} does not have relation with {relation}")]
    UnrelatedJoin { entity: String, relation: String },

    #[error("No join recorded for relation segment <{relation}>")]
    UnresolvedRelation { relation: String },

    #[error("Argument is not a plain field reference")]
    NotAPlainField,

    #[error("Argument of {operator} has to be a non-empty list")]
    EmptySetArgument { operator: &'static str },

    #[error("No order set for <{field}>. Prefix with one of these: [^, -]")]
    OrderPrefixMissing { field: String },

    #[error("Version is not provided for optimistic locking")]
    VersionRequired,

    #[error(
        "Type of {property} field is {declared_type} not assignable to type number in {method} method. \
         Please provide only numeric type field"
    )]
    NonNumericAggregate {
        property: String,
        declared_type: String,
        method: &'static str,
    },

    #[error("String expression is required for the select_raw method")]
    SelectionRequired,

    #[error("Alias {alias} is already bound in this query")]
    AliasRebound { alias: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
