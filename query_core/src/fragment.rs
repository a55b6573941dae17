//! Predicate fragments
//!
//! WHERE/HAVING conditions are queued as typed predicate nodes at
//! declaration time and rendered only when the statement is compiled.
//! A fragment pairs one predicate with the boolean combinator joining it to
//! the fragments queued before it; the first fragment's combinator opens the
//! group and is ignored when flattening.

use crate::scalar::ScalarValue;

/// Boolean combinator joining a fragment to the running expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// Comparison operators with direct SQL spellings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// One typed boolean condition, rendering deferred to compile time
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <op> 'literal'`
    Compare {
        column: String,
        op: CompareOp,
        value: ScalarValue,
    },
    /// `column LIKE 'pattern'`, optionally wrapped in `LOWER(..)`
    Pattern {
        column: String,
        value: ScalarValue,
        begins_with: bool,
        ends_with: bool,
        insensitive: bool,
    },
    /// `column IS [NOT] NULL`
    Null { column: String, negated: bool },
    /// `column [NOT] IN (member, ...)`
    InSet {
        column: String,
        members: Vec<ScalarValue>,
        negated: bool,
    },
    /// `column [NOT] IN <pre-rendered sub-query>`
    InQuery {
        column: String,
        query: String,
        negated: bool,
    },
    /// `column = other_column` (field-to-field equality)
    FieldEq { column: String, other: String },
    /// Parenthesized group of already-combined fragments
    Group(Vec<PredicateFragment>),
}

impl Predicate {
    pub fn render(&self) -> String {
        match self {
            Predicate::Compare { column, op, value } => {
                format!("{} {} {}", column, op.as_sql(), value.render_quoted())
            }
            Predicate::Pattern {
                column,
                value,
                begins_with,
                ends_with,
                insensitive,
            } => {
                let lhs = if *insensitive {
                    format!("LOWER({})", column)
                } else {
                    column.clone()
                };
                format!(
                    "{} LIKE {}",
                    lhs,
                    value.render_pattern(*begins_with, *ends_with, *insensitive)
                )
            }
            Predicate::Null { column, negated } => {
                if *negated {
                    format!("{} IS NOT NULL", column)
                } else {
                    format!("{} IS NULL", column)
                }
            }
            Predicate::InSet {
                column,
                members,
                negated,
            } => {
                let rendered = members
                    .iter()
                    .map(ScalarValue::render_set_member)
                    .collect::<Vec<_>>()
                    .join(", ");
                if *negated {
                    format!("{} NOT IN ({})", column, rendered)
                } else {
                    format!("{} IN ({})", column, rendered)
                }
            }
            Predicate::InQuery {
                column,
                query,
                negated,
            } => {
                if *negated {
                    format!("{} NOT IN {}", column, query)
                } else {
                    format!("{} IN {}", column, query)
                }
            }
            Predicate::FieldEq { column, other } => format!("{} = {}", column, other),
            Predicate::Group(fragments) => format!("({})", flatten_fragments(fragments)),
        }
    }
}

/// One queued condition: the combinator plus the typed predicate
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateFragment {
    pub combinator: Combinator,
    pub predicate: Predicate,
}

impl PredicateFragment {
    pub fn new(combinator: Combinator, predicate: Predicate) -> Self {
        Self {
            combinator,
            predicate,
        }
    }
}

/// Concatenate fragments in declaration order. The first fragment opens the
/// expression; every later fragment is joined by its own combinator.
pub fn flatten_fragments(fragments: &[PredicateFragment]) -> String {
    let mut expression = String::new();
    for (index, fragment) in fragments.iter().enumerate() {
        if index == 0 {
            expression.push_str(&fragment.predicate.render());
        } else {
            expression.push(' ');
            expression.push_str(fragment.combinator.as_sql());
            expression.push(' ');
            expression.push_str(&fragment.predicate.render());
        }
    }
    expression
}
