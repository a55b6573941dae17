//! Condition builder
//!
//! Bound to one resolved column reference and one combinator. Every
//! successful operator call appends exactly one predicate fragment tagged
//! with that combinator and hands the builder back for chaining; the owning
//! composer drains the accumulated fragments when the caller's closure
//! returns.

use crate::errors::QueryError;
use crate::fragment::{Combinator, CompareOp, Predicate, PredicateFragment};
use crate::scalar::ScalarValue;

#[derive(Debug, Clone)]
pub struct ConditionBuilder {
    column: String,
    combinator: Combinator,
    fragments: Vec<PredicateFragment>,
}

impl ConditionBuilder {
    pub(crate) fn new(column: impl Into<String>, combinator: Combinator) -> Self {
        Self {
            column: column.into(),
            combinator,
            fragments: Vec::new(),
        }
    }

    /// Column reference this builder is bound to
    pub fn column(&self) -> &str {
        &self.column
    }

    pub(crate) fn into_fragments(self) -> Vec<PredicateFragment> {
        self.fragments
    }

    fn push(mut self, predicate: Predicate) -> Self {
        self.fragments
            .push(PredicateFragment::new(self.combinator, predicate));
        self
    }

    fn compare(self, op: CompareOp, value: impl Into<ScalarValue>) -> Self {
        let column = self.column.clone();
        self.push(Predicate::Compare {
            column,
            op,
            value: value.into(),
        })
    }

    fn pattern(
        self,
        value: impl Into<String>,
        begins_with: bool,
        ends_with: bool,
        insensitive: bool,
    ) -> Self {
        let column = self.column.clone();
        self.push(Predicate::Pattern {
            column,
            value: ScalarValue::Text(value.into()),
            begins_with,
            ends_with,
            insensitive,
        })
    }

    pub fn equals(self, value: impl Into<ScalarValue>) -> Self {
        self.compare(CompareOp::Eq, value)
    }

    pub fn not_equals(self, value: impl Into<ScalarValue>) -> Self {
        self.compare(CompareOp::Ne, value)
    }

    pub fn greater_than(self, value: impl Into<ScalarValue>) -> Self {
        self.compare(CompareOp::Gt, value)
    }

    pub fn greater_than_or_equal(self, value: impl Into<ScalarValue>) -> Self {
        self.compare(CompareOp::Gte, value)
    }

    pub fn less_than(self, value: impl Into<ScalarValue>) -> Self {
        self.compare(CompareOp::Lt, value)
    }

    pub fn less_than_or_equal(self, value: impl Into<ScalarValue>) -> Self {
        self.compare(CompareOp::Lte, value)
    }

    pub fn begins_with(self, value: impl Into<String>, insensitive: bool) -> Self {
        self.pattern(value, true, false, insensitive)
    }

    pub fn ends_with(self, value: impl Into<String>, insensitive: bool) -> Self {
        self.pattern(value, false, true, insensitive)
    }

    pub fn contains(self, value: impl Into<String>, insensitive: bool) -> Self {
        self.pattern(value, true, true, insensitive)
    }

    pub fn is_null(self) -> Self {
        let column = self.column.clone();
        self.push(Predicate::Null {
            column,
            negated: false,
        })
    }

    pub fn is_not_null(self) -> Self {
        let column = self.column.clone();
        self.push(Predicate::Null {
            column,
            negated: true,
        })
    }

    pub fn is_true(self) -> Self {
        self.equals(true)
    }

    pub fn is_false(self) -> Self {
        self.equals(false)
    }

    /// Set membership against a non-empty scalar list
    pub fn in_list<I, T>(self, members: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ScalarValue>,
    {
        self.set_membership(members, false)
    }

    /// Negated set membership against a non-empty scalar list
    pub fn not_in_list<I, T>(self, members: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ScalarValue>,
    {
        self.set_membership(members, true)
    }

    fn set_membership<I, T>(self, members: I, negated: bool) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ScalarValue>,
    {
        let members: Vec<ScalarValue> = members.into_iter().map(Into::into).collect();
        if members.is_empty() {
            return Err(QueryError::EmptySetArgument {
                operator: if negated { "NOT IN" } else { "IN" },
            });
        }
        let column = self.column.clone();
        Ok(self.push(Predicate::InSet {
            column,
            members,
            negated,
        }))
    }

    /// Set membership against a pre-rendered sub-query, passed through
    /// unescaped
    pub fn in_query(self, query: impl Into<String>) -> Self {
        let column = self.column.clone();
        self.push(Predicate::InQuery {
            column,
            query: query.into(),
            negated: false,
        })
    }

    /// Negated set membership against a pre-rendered sub-query
    pub fn not_in_query(self, query: impl Into<String>) -> Self {
        let column = self.column.clone();
        self.push(Predicate::InQuery {
            column,
            query: query.into(),
            negated: true,
        })
    }

    /// Field-to-field equality. The argument must be a plain
    /// `alias.column` reference, not a relation path.
    pub fn equals_with_field(self, other: impl Into<String>) -> Result<Self, QueryError> {
        let other = other.into();
        if other.split('.').count() > 2 {
            return Err(QueryError::NotAPlainField);
        }
        let column = self.column.clone();
        Ok(self.push(Predicate::FieldEq { column, other }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::flatten_fragments;

    fn builder(column: &str) -> ConditionBuilder {
        ConditionBuilder::new(column, Combinator::And)
    }

    fn rendered(builder: ConditionBuilder) -> String {
        flatten_fragments(&builder.into_fragments())
    }

    #[test]
    fn equals_renders_quoted() {
        assert_eq!(rendered(builder("t1.name").equals("roy")), "t1.name = 'roy'");
    }

    #[test]
    fn not_equals() {
        assert_eq!(
            rendered(builder("t1.name").not_equals("roy")),
            "t1.name != 'roy'"
        );
    }

    #[test]
    fn ordering_comparisons_quote_numbers() {
        assert_eq!(
            rendered(builder("t1.amount").greater_than(10)),
            "t1.amount > '10'"
        );
        assert_eq!(
            rendered(builder("t1.amount").less_than_or_equal(10)),
            "t1.amount <= '10'"
        );
    }

    #[test]
    fn contains_pattern() {
        assert_eq!(
            rendered(builder("t1.name").contains("roy", false)),
            "t1.name LIKE '%roy%'"
        );
    }

    #[test]
    fn contains_insensitive_wraps_lower() {
        assert_eq!(
            rendered(builder("t1.name").contains("roy", true)),
            "LOWER(t1.name) LIKE '%roy%'"
        );
    }

    #[test]
    fn begins_and_ends_with() {
        assert_eq!(
            rendered(builder("t1.name").begins_with("roy", false)),
            "t1.name LIKE 'roy%'"
        );
        assert_eq!(
            rendered(builder("t1.name").ends_with("roy", false)),
            "t1.name LIKE '%roy'"
        );
    }

    #[test]
    fn boolean_shortcuts() {
        assert_eq!(
            rendered(builder("t1.is_deleted").is_true()),
            "t1.is_deleted = 'true'"
        );
        assert_eq!(
            rendered(builder("t1.is_deleted").is_false()),
            "t1.is_deleted = 'false'"
        );
    }

    #[test]
    fn null_checks() {
        assert_eq!(rendered(builder("t1.code").is_null()), "t1.code IS NULL");
        assert_eq!(
            rendered(builder("t1.code").is_not_null()),
            "t1.code IS NOT NULL"
        );
    }

    #[test]
    fn in_list_mixed_rendering() {
        assert_eq!(
            rendered(builder("t1.amount").in_list([1, 2]).unwrap()),
            "t1.amount IN (1, 2)"
        );
        assert_eq!(
            rendered(builder("t1.code").in_list(["ABC", "DEF"]).unwrap()),
            "t1.code IN ('ABC', 'DEF')"
        );
    }

    #[test]
    fn empty_set_rejected() {
        let err = builder("t1.amount").in_list(Vec::<i64>::new()).unwrap_err();
        assert!(matches!(
            err,
            QueryError::EmptySetArgument { operator: "IN" }
        ));

        let err = builder("t1.amount")
            .not_in_list(Vec::<i64>::new())
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::EmptySetArgument { operator: "NOT IN" }
        ));
    }

    #[test]
    fn equals_with_field_rejects_relation_paths() {
        let err = builder("t1.name")
            .equals_with_field("t2.source.name")
            .unwrap_err();
        assert!(matches!(err, QueryError::NotAPlainField));

        assert_eq!(
            rendered(builder("t2.user_id").equals_with_field("t1.id").unwrap()),
            "t2.user_id = t1.id"
        );
    }

    #[test]
    fn each_operator_appends_one_fragment() {
        let fragments = builder("t1.name")
            .equals("a")
            .not_equals("b")
            .into_fragments();
        assert_eq!(fragments.len(), 2);
        assert!(fragments
            .iter()
            .all(|f| f.combinator == Combinator::And));
    }
}
