//! Underlying select-statement builder
//!
//! Accumulates SELECT/FROM/JOIN/WHERE/HAVING/GROUP BY/ORDER BY/LIMIT
//! clauses and renders them as PostgreSQL text. Bound parameters travel as
//! `serde_json::Value` next to `?` markers in the clause text; `render`
//! numbers them `$1..$N`, while `render_inline` substitutes literals to
//! produce parameterless query text. The builder is `Clone` so aggregate
//! getters can work on an isolated copy.

use crate::fragment::Combinator;
use serde_json::Value;

/// Type of join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// What a join attaches: a named table or a compiled sub-query
#[derive(Debug, Clone, PartialEq)]
pub enum JoinTarget {
    Table(String),
    SubQuery(String),
}

/// A complete join clause
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub target: JoinTarget,
    pub alias: String,
    /// Natural relation-key equality, absent for sub-query joins
    pub natural_on: Option<String>,
    /// Extra ON expression built from a join-condition callback
    pub extra_on: Option<String>,
}

impl JoinClause {
    fn render_on(&self) -> String {
        match (&self.natural_on, &self.extra_on) {
            (Some(natural), Some(extra)) => format!("ON {} AND ({})", natural, extra),
            (Some(natural), None) => format!("ON {}", natural),
            (None, Some(extra)) => format!("ON {}", extra),
            (None, None) => "ON true".to_string(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Row-locking modes. The optimistic mode is an application-level version
/// check and renders no clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    PessimisticRead,
    PessimisticWrite,
    DirtyRead,
    PessimisticPartialWrite,
    PessimisticWriteOrFail,
    ForNoKeyUpdate,
    Optimistic,
}

impl LockMode {
    pub fn as_sql(&self) -> Option<&'static str> {
        match self {
            LockMode::PessimisticRead => Some("FOR SHARE"),
            LockMode::PessimisticWrite => Some("FOR UPDATE"),
            LockMode::PessimisticPartialWrite => Some("FOR UPDATE SKIP LOCKED"),
            LockMode::PessimisticWriteOrFail => Some("FOR UPDATE NOWAIT"),
            LockMode::ForNoKeyUpdate => Some("FOR NO KEY UPDATE"),
            LockMode::DirtyRead | LockMode::Optimistic => None,
        }
    }
}

/// FROM target: a table or a compiled sub-query
#[derive(Debug, Clone, PartialEq)]
pub enum FromTarget {
    Table(String),
    SubQuery(String),
}

#[derive(Debug, Clone, PartialEq)]
struct WhereClause {
    combinator: Combinator,
    sql: String,
    params: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
struct HavingClause {
    combinator: Combinator,
    sql: String,
}

/// Accumulating select-statement builder
#[derive(Debug, Clone, Default)]
pub struct SelectStatement {
    selects: Vec<(String, Option<String>)>,
    distinct: bool,
    distinct_on: Vec<String>,
    from: Option<(FromTarget, String)>,
    joins: Vec<JoinClause>,
    wheres: Vec<WhereClause>,
    havings: Vec<HavingClause>,
    group_by: Vec<String>,
    order_by: Vec<(String, SortOrder)>,
    limit: Option<i64>,
    offset: Option<i64>,
    lock: Option<LockMode>,
}

impl SelectStatement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, expression: impl Into<String>, alias: Option<String>) -> &mut Self {
        self.selects.clear();
        self.selects.push((expression.into(), alias));
        self
    }

    pub fn add_select(&mut self, expression: impl Into<String>, alias: Option<String>) -> &mut Self {
        self.selects.push((expression.into(), alias));
        self
    }

    pub fn clear_select(&mut self) -> &mut Self {
        self.selects.clear();
        self
    }

    pub fn from_table(&mut self, table: impl Into<String>, alias: impl Into<String>) -> &mut Self {
        self.from = Some((FromTarget::Table(table.into()), alias.into()));
        self
    }

    pub fn from_sub_query(&mut self, sql: impl Into<String>, alias: impl Into<String>) -> &mut Self {
        self.from = Some((FromTarget::SubQuery(sql.into()), alias.into()));
        self
    }

    pub fn join(&mut self, clause: JoinClause) -> &mut Self {
        self.joins.push(clause);
        self
    }

    /// Append a WHERE condition without bound parameters
    pub fn and_where(&mut self, sql: impl Into<String>) -> &mut Self {
        self.where_with(Combinator::And, sql, Vec::new())
    }

    pub fn or_where(&mut self, sql: impl Into<String>) -> &mut Self {
        self.where_with(Combinator::Or, sql, Vec::new())
    }

    /// Append a WHERE condition whose `?` markers bind the given params
    pub fn and_where_bound(&mut self, sql: impl Into<String>, params: Vec<Value>) -> &mut Self {
        self.where_with(Combinator::And, sql, params)
    }

    fn where_with(
        &mut self,
        combinator: Combinator,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> &mut Self {
        self.wheres.push(WhereClause {
            combinator,
            sql: sql.into(),
            params,
        });
        self
    }

    pub fn and_having(&mut self, sql: impl Into<String>) -> &mut Self {
        self.havings.push(HavingClause {
            combinator: Combinator::And,
            sql: sql.into(),
        });
        self
    }

    pub fn or_having(&mut self, sql: impl Into<String>) -> &mut Self {
        self.havings.push(HavingClause {
            combinator: Combinator::Or,
            sql: sql.into(),
        });
        self
    }

    pub fn group_by(&mut self, field: impl Into<String>) -> &mut Self {
        self.group_by.clear();
        self.group_by.push(field.into());
        self
    }

    pub fn add_group_by(&mut self, field: impl Into<String>) -> &mut Self {
        self.group_by.push(field.into());
        self
    }

    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    pub fn distinct_on(&mut self, fields: Vec<String>) -> &mut Self {
        self.distinct_on = fields;
        self
    }

    pub fn order_by(&mut self, field: impl Into<String>, order: SortOrder) -> &mut Self {
        self.order_by.clear();
        self.order_by.push((field.into(), order));
        self
    }

    pub fn add_order_by(&mut self, field: impl Into<String>, order: SortOrder) -> &mut Self {
        self.order_by.push((field.into(), order));
        self
    }

    pub fn limit(&mut self, limit: Option<i64>) -> &mut Self {
        self.limit = limit;
        self
    }

    pub fn offset(&mut self, offset: Option<i64>) -> &mut Self {
        self.offset = offset;
        self
    }

    pub fn set_lock(&mut self, mode: LockMode) -> &mut Self {
        self.lock = Some(mode);
        self
    }

    /// Drop distinctness, grouping, ordering and pagination; aggregate
    /// getters run on an isolated clone with these cleared.
    pub fn clear_result_shaping(&mut self) -> &mut Self {
        self.distinct = false;
        self.distinct_on.clear();
        self.group_by.clear();
        self.order_by.clear();
        self.limit = None;
        self.offset = None;
        self
    }

    fn render_base(&self) -> String {
        let mut sql = String::from("SELECT ");

        if !self.distinct_on.is_empty() {
            sql.push_str("DISTINCT ON (");
            sql.push_str(&self.distinct_on.join(", "));
            sql.push_str(") ");
        } else if self.distinct {
            sql.push_str("DISTINCT ");
        }

        if self.selects.is_empty() {
            sql.push('*');
        } else {
            let fields: Vec<String> = self
                .selects
                .iter()
                .map(|(expression, alias)| match alias {
                    Some(alias) => format!("{} AS {}", expression, alias),
                    None => expression.clone(),
                })
                .collect();
            sql.push_str(&fields.join(", "));
        }

        if let Some((target, alias)) = &self.from {
            sql.push_str(" FROM ");
            match target {
                FromTarget::Table(table) => sql.push_str(table),
                FromTarget::SubQuery(sub) => {
                    sql.push('(');
                    sql.push_str(sub);
                    sql.push(')');
                }
            }
            sql.push(' ');
            sql.push_str(alias);
        }

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.kind.as_sql());
            sql.push(' ');
            match &join.target {
                JoinTarget::Table(table) => sql.push_str(table),
                JoinTarget::SubQuery(sub) => {
                    sql.push('(');
                    sql.push_str(sub);
                    sql.push(')');
                }
            }
            sql.push(' ');
            sql.push_str(&join.alias);
            sql.push(' ');
            sql.push_str(&join.render_on());
        }

        for (index, clause) in self.wheres.iter().enumerate() {
            if index == 0 {
                sql.push_str(" WHERE ");
            } else {
                sql.push(' ');
                sql.push_str(clause.combinator.as_sql());
                sql.push(' ');
            }
            sql.push_str(&clause.sql);
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        for (index, clause) in self.havings.iter().enumerate() {
            if index == 0 {
                sql.push_str(" HAVING ");
            } else {
                sql.push(' ');
                sql.push_str(clause.combinator.as_sql());
                sql.push(' ');
            }
            sql.push_str(&clause.sql);
        }

        if !self.order_by.is_empty() {
            let items: Vec<String> = self
                .order_by
                .iter()
                .map(|(field, order)| format!("{} {}", field, order.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&items.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        if let Some(lock_sql) = self.lock.and_then(|mode| mode.as_sql()) {
            sql.push(' ');
            sql.push_str(lock_sql);
        }

        sql
    }

    /// All bound parameters in clause order
    fn collect_params(&self) -> Vec<Value> {
        self.wheres
            .iter()
            .flat_map(|clause| clause.params.iter().cloned())
            .collect()
    }

    /// Dialect SQL with `$N` placeholders plus the bound parameters
    pub fn render(&self) -> (String, Vec<Value>) {
        let mut counter = 0;
        let numbered = rewrite_markers(&self.render_base(), |out| {
            counter += 1;
            out.push('$');
            out.push_str(&counter.to_string());
        });
        (numbered, self.collect_params())
    }

    /// Parameterless query text with bound values substituted as literals
    pub fn render_inline(&self) -> String {
        let params = self.collect_params();
        let mut next = params.iter();
        rewrite_markers(&self.render_base(), |out| match next.next() {
            Some(value) => out.push_str(&inline_literal(value)),
            None => out.push('?'),
        })
    }
}

/// Rewrite each `?` parameter marker in the rendered text. A `?` inside a
/// single-quoted literal is text, not a marker, and passes through; literal
/// quote tracking includes the `''` escape.
fn rewrite_markers(base: &str, mut rewrite: impl FnMut(&mut String)) -> String {
    let mut out = String::with_capacity(base.len());
    let mut in_literal = false;
    for ch in base.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal => rewrite(&mut out),
            _ => out.push(ch),
        }
    }
    out
}

fn inline_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Number(n) => format!("'{}'", n),
        Value::Bool(b) => format!("'{}'", b),
        Value::Null => "NULL".to_string(),
        other => format!("'{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_statement() -> SelectStatement {
        let mut statement = SelectStatement::new();
        statement
            .select("t1.id", Some("id".to_string()))
            .add_select("t1.name", Some("name".to_string()))
            .from_table("users", "t1");
        statement
    }

    #[test]
    fn renders_select_from() {
        let (sql, params) = base_statement().render();
        assert_eq!(sql, "SELECT t1.id AS id, t1.name AS name FROM users t1");
        assert!(params.is_empty());
    }

    #[test]
    fn numbers_bound_params() {
        let mut statement = base_statement();
        statement
            .and_where_bound("t1.name LIKE ?", vec![json!("%roy%")])
            .and_where_bound("t1.point BETWEEN ? AND ?", vec![json!(1), json!(2)]);
        let (sql, params) = statement.render();
        assert!(sql.ends_with("WHERE t1.name LIKE $1 AND t1.point BETWEEN $2 AND $3"));
        assert_eq!(params, vec![json!("%roy%"), json!(1), json!(2)]);
    }

    #[test]
    fn inline_render_substitutes_literals() {
        let mut statement = base_statement();
        statement.and_where_bound("t1.name = ?", vec![json!("roy")]);
        assert!(statement.render_inline().ends_with("WHERE t1.name = 'roy'"));
    }

    #[test]
    fn join_rendering_with_conditions() {
        let mut statement = base_statement();
        statement.join(JoinClause {
            kind: JoinKind::Left,
            target: JoinTarget::Table("photos".to_string()),
            alias: "t2".to_string(),
            natural_on: Some("t2.user_id = t1.id".to_string()),
            extra_on: Some("t2.is_deleted = 'false'".to_string()),
        });
        let (sql, _) = statement.render();
        assert!(sql.contains(
            "LEFT JOIN photos t2 ON t2.user_id = t1.id AND (t2.is_deleted = 'false')"
        ));
    }

    #[test]
    fn sub_query_join_defaults_to_on_true() {
        let mut statement = base_statement();
        statement.join(JoinClause {
            kind: JoinKind::Inner,
            target: JoinTarget::SubQuery("SELECT b.user_id FROM branches b".to_string()),
            alias: "t2".to_string(),
            natural_on: None,
            extra_on: None,
        });
        let (sql, _) = statement.render();
        assert!(sql.contains("INNER JOIN (SELECT b.user_id FROM branches b) t2 ON true"));
    }

    #[test]
    fn distinct_on_wins_over_distinct() {
        let mut statement = base_statement();
        statement.distinct(true);
        statement.distinct_on(vec!["t1.id".to_string(), "t1.name".to_string()]);
        let (sql, _) = statement.render();
        assert!(sql.starts_with("SELECT DISTINCT ON (t1.id, t1.name) "));
    }

    #[test]
    fn order_limit_offset_lock() {
        let mut statement = base_statement();
        statement
            .order_by("t1.name", SortOrder::Asc)
            .add_order_by("t1.email", SortOrder::Desc)
            .limit(Some(10))
            .offset(Some(20))
            .set_lock(LockMode::PessimisticRead);
        let (sql, _) = statement.render();
        assert!(sql.ends_with("ORDER BY t1.name ASC, t1.email DESC LIMIT 10 OFFSET 20 FOR SHARE"));
    }

    #[test]
    fn optimistic_lock_renders_nothing() {
        let mut statement = base_statement();
        statement.set_lock(LockMode::Optimistic);
        let (sql, _) = statement.render();
        assert!(!sql.contains("FOR"));
    }

    #[test]
    fn clear_result_shaping_for_aggregates() {
        let mut statement = base_statement();
        statement
            .group_by("t1.name")
            .order_by("t1.name", SortOrder::Asc)
            .limit(Some(10))
            .offset(Some(20));
        let mut isolated = statement.clone();
        isolated.clear_result_shaping();
        isolated.select("SUM(t1.point)", Some("point_sum".to_string()));
        let (sql, _) = isolated.render();
        assert_eq!(sql, "SELECT SUM(t1.point) AS point_sum FROM users t1");
        // The original statement is untouched.
        let (original_sql, _) = statement.render();
        assert!(original_sql.contains("GROUP BY"));
    }

    #[test]
    fn question_mark_inside_literal_is_not_a_marker() {
        let mut statement = base_statement();
        statement
            .and_where("t1.name = 'what?'")
            .and_where_bound("t1.email LIKE ?", vec![json!("%who?%")]);
        let (sql, params) = statement.render();
        assert!(sql.ends_with("WHERE t1.name = 'what?' AND t1.email LIKE $1"));
        assert_eq!(params, vec![json!("%who?%")]);
        assert!(statement
            .render_inline()
            .ends_with("WHERE t1.name = 'what?' AND t1.email LIKE '%who?%'"));
    }

    #[test]
    fn escaped_quote_keeps_literal_tracking() {
        let mut statement = base_statement();
        statement
            .and_where("t1.name = 'it''s here?'")
            .and_where_bound("t1.point = ?", vec![json!(1)]);
        let (sql, params) = statement.render();
        assert!(sql.ends_with("WHERE t1.name = 'it''s here?' AND t1.point = $1"));
        assert_eq!(params, vec![json!(1)]);
    }

    #[test]
    fn clear_result_shaping_drops_distinct() {
        let mut statement = base_statement();
        statement.distinct(true);
        statement.distinct_on(vec!["t1.name".to_string()]);
        statement.clear_result_shaping();
        statement.select("COUNT(*)", Some("total".to_string()));
        let (sql, _) = statement.render();
        assert_eq!(sql, "SELECT COUNT(*) AS total FROM users t1");
    }

    #[test]
    fn render_is_idempotent() {
        let mut statement = base_statement();
        statement.and_where_bound("t1.name = ?", vec![json!("roy")]);
        let first = statement.render();
        let second = statement.render();
        assert_eq!(first, second);
    }
}
