//! Automatic filter application from caller-supplied query parameters
//!
//! Query parameters arrive as an untyped key/value bag whose keys follow a
//! `field__operator` naming convention. Only keys whitelisted in the
//! composer's field resolver map become WHERE predicates; everything else is
//! ignored. Unlike the explicit condition-builder path, values on this path
//! are bound as statement parameters rather than interpolated as literals.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::statement::SelectStatement;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// Comparison operator derived from a filter key's `__suffix`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupFilter {
    Matches,
    Contains,
    IContains,
    StartsWith,
    IStartsWith,
    EndsWith,
    IEndsWith,
    IsNull,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Between,
    NotEqual,
}

impl LookupFilter {
    /// Derive the operator from a filter key. Keys without a recognized
    /// suffix fall back to plain equality.
    pub fn from_key(key: &str) -> Self {
        let suffix = key.split("__").nth(1).unwrap_or("");
        match suffix {
            "contains" => LookupFilter::Contains,
            "icontains" => LookupFilter::IContains,
            "startswith" => LookupFilter::StartsWith,
            "istartswith" => LookupFilter::IStartsWith,
            "endswith" => LookupFilter::EndsWith,
            "iendswith" => LookupFilter::IEndsWith,
            "isnull" => LookupFilter::IsNull,
            "lt" => LookupFilter::Lt,
            "lte" => LookupFilter::Lte,
            "gt" => LookupFilter::Gt,
            "gte" => LookupFilter::Gte,
            "in" => LookupFilter::In,
            "between" => LookupFilter::Between,
            "notequal" => LookupFilter::NotEqual,
            _ => LookupFilter::Matches,
        }
    }
}

/// Untyped bag of filter and pagination parameters
#[derive(Debug, Clone, Default)]
pub struct QueryObject {
    entries: BTreeMap<String, Value>,
}

impl QueryObject {
    /// Wrap caller parameters, defaulting the soft-delete flag when absent.
    pub fn new(entries: BTreeMap<String, Value>) -> Self {
        let mut object = Self { entries };
        let missing = match object.entries.get("isDeleted") {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if missing {
            object
                .entries
                .insert("isDeleted".to_string(), Value::String("false".to_string()));
        }
        object
    }

    pub fn empty() -> Self {
        Self::new(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Value for a key when present and non-empty
    pub fn present(&self, key: &str) -> Option<&Value> {
        match self.entries.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(value) => Some(value),
        }
    }

    pub fn order(&self) -> Option<&str> {
        match self.present("order") {
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Requested page, 1-based. Non-numeric or non-positive input keeps the
    /// default.
    pub fn page(&self) -> i64 {
        self.positive_int("page").unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.positive_int("limit").unwrap_or(DEFAULT_LIMIT)
    }

    fn positive_int(&self, key: &str) -> Option<i64> {
        let parsed = match self.entries.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse::<i64>().ok(),
            _ => None,
        }?;
        (parsed > 0).then_some(parsed)
    }
}

impl FromIterator<(String, Value)> for QueryObject {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Iterate the field resolver map and append a bound WHERE predicate for
/// every whitelisted key present in the query object.
pub fn apply_filter_queries(
    statement: &mut SelectStatement,
    resolver_map: &BTreeMap<String, String>,
    query: &QueryObject,
) {
    for (key, column) in resolver_map {
        let Some(value) = query.present(key) else {
            continue;
        };
        match LookupFilter::from_key(key) {
            LookupFilter::Contains => {
                bind_pattern(statement, column, "LIKE", value, true, true);
            }
            LookupFilter::IContains => {
                bind_pattern(statement, column, "ILIKE", value, true, true);
            }
            LookupFilter::StartsWith => {
                bind_pattern(statement, column, "LIKE", value, false, true);
            }
            LookupFilter::IStartsWith => {
                bind_pattern(statement, column, "ILIKE", value, false, true);
            }
            LookupFilter::EndsWith => {
                bind_pattern(statement, column, "LIKE", value, true, false);
            }
            LookupFilter::IEndsWith => {
                bind_pattern(statement, column, "ILIKE", value, true, false);
            }
            LookupFilter::IsNull => {
                statement.and_where(format!("{} IS NULL", column));
            }
            LookupFilter::Lt => bind_compare(statement, column, "<", value),
            LookupFilter::Lte => bind_compare(statement, column, "<=", value),
            LookupFilter::Gt => bind_compare(statement, column, ">", value),
            LookupFilter::Gte => bind_compare(statement, column, ">=", value),
            LookupFilter::NotEqual => bind_compare(statement, column, "<>", value),
            LookupFilter::In => {
                let members = set_members(value);
                if members.is_empty() {
                    continue;
                }
                let markers = vec!["?"; members.len()].join(", ");
                statement.and_where_bound(format!("{} IN ({})", column, markers), members);
            }
            LookupFilter::Between => {
                let members = set_members(value);
                if members.len() != 2 {
                    continue;
                }
                statement.and_where_bound(format!("{} BETWEEN ? AND ?", column), members);
            }
            LookupFilter::Matches => bind_compare(statement, column, "=", value),
        }
    }
}

fn bind_compare(statement: &mut SelectStatement, column: &str, operator: &str, value: &Value) {
    statement.and_where_bound(format!("{} {} ?", column, operator), vec![value.clone()]);
}

fn bind_pattern(
    statement: &mut SelectStatement,
    column: &str,
    operator: &str,
    value: &Value,
    ends_with: bool,
    begins_with: bool,
) {
    let mut pattern = value_text(value);
    if ends_with {
        pattern.insert(0, '%');
    }
    if begins_with {
        pattern.push('%');
    }
    statement.and_where_bound(
        format!("{} {} ?", column, operator),
        vec![Value::String(pattern)],
    );
}

/// Set operands arrive either as a JSON array or as a comma-separated string.
fn set_members(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split(',')
            .map(|item| Value::String(item.trim().to_string()))
            .collect(),
        other => vec![other.clone()],
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(pairs: &[(&str, Value)]) -> QueryObject {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn resolver(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn operator_derivation_from_suffix() {
        assert_eq!(LookupFilter::from_key("name__icontains"), LookupFilter::IContains);
        assert_eq!(LookupFilter::from_key("point__gte"), LookupFilter::Gte);
        assert_eq!(LookupFilter::from_key("status__in"), LookupFilter::In);
        assert_eq!(LookupFilter::from_key("name"), LookupFilter::Matches);
        assert_eq!(LookupFilter::from_key("name__bogus"), LookupFilter::Matches);
    }

    #[test]
    fn soft_delete_flag_defaults_when_absent() {
        let q = QueryObject::empty();
        assert_eq!(q.get("isDeleted"), Some(&json!("false")));

        let q = query(&[("isDeleted", json!("true"))]);
        assert_eq!(q.get("isDeleted"), Some(&json!("true")));
    }

    #[test]
    fn pagination_defaults_and_parsing() {
        let q = QueryObject::empty();
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 10);

        let q = query(&[("page", json!("3")), ("limit", json!(25))]);
        assert_eq!(q.page(), 3);
        assert_eq!(q.limit(), 25);

        let q = query(&[("page", json!("abc")), ("limit", json!(-5))]);
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 10);
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let mut statement = SelectStatement::new();
        statement.from_table("users", "t1");
        let map = resolver(&[("name", "t1.name")]);
        let q = query(&[("name", json!("roy")), ("email", json!("x@y.z"))]);
        apply_filter_queries(&mut statement, &map, &q);
        let (sql, params) = statement.render();
        assert!(sql.ends_with("WHERE t1.name = $1"));
        assert_eq!(params, vec![json!("roy")]);
    }

    #[test]
    fn pattern_filters_bind_affixed_patterns() {
        let mut statement = SelectStatement::new();
        statement.from_table("users", "t1");
        let map = resolver(&[("name__icontains", "t1.name")]);
        let q = query(&[("name__icontains", json!("roy"))]);
        apply_filter_queries(&mut statement, &map, &q);
        let (sql, params) = statement.render();
        assert!(sql.ends_with("WHERE t1.name ILIKE $1"));
        assert_eq!(params, vec![json!("%roy%")]);
    }

    #[test]
    fn in_filter_splits_comma_separated_string() {
        let mut statement = SelectStatement::new();
        statement.from_table("users", "t1");
        let map = resolver(&[("status__in", "t1.status")]);
        let q = query(&[("status__in", json!("active, pending"))]);
        apply_filter_queries(&mut statement, &map, &q);
        let (sql, params) = statement.render();
        assert!(sql.ends_with("WHERE t1.status IN ($1, $2)"));
        assert_eq!(params, vec![json!("active"), json!("pending")]);
    }

    #[test]
    fn between_filter_binds_both_bounds() {
        let mut statement = SelectStatement::new();
        statement.from_table("users", "t1");
        let map = resolver(&[("point__between", "t1.point")]);
        let q = query(&[("point__between", json!([1, 10]))]);
        apply_filter_queries(&mut statement, &map, &q);
        let (sql, params) = statement.render();
        assert!(sql.ends_with("WHERE t1.point BETWEEN $1 AND $2"));
        assert_eq!(params, vec![json!(1), json!(10)]);
    }

    #[test]
    fn isnull_filter_adds_no_params() {
        let mut statement = SelectStatement::new();
        statement.from_table("users", "t1");
        let map = resolver(&[("deleted_at__isnull", "t1.deleted_at")]);
        let q = query(&[("deleted_at__isnull", json!("true"))]);
        apply_filter_queries(&mut statement, &map, &q);
        let (sql, params) = statement.render();
        assert!(sql.ends_with("WHERE t1.deleted_at IS NULL"));
        assert!(params.is_empty());
    }
}
