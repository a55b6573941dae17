//! Query composer
//!
//! The central state machine of the crate. Conditions, joins, selections and
//! pagination accumulate while the composer is in its building state; nothing
//! touches statement text until a terminal operation compiles. Compilation
//! clones the underlying statement and flattens the queued WHERE and HAVING
//! fragments onto the clone, so terminal operations are idempotent and the
//! queued fragments survive repeated rendering.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::channel::mpsc;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row};
use tracing::debug;

use entity_graph::{Cardinality, EntityGraph};

use crate::aggregate::{validate_numeric, AggregateFunction};
use crate::alias::{resolve_column, resolve_relation, JoinHistory};
use crate::condition::ConditionBuilder;
use crate::errors::QueryError;
use crate::executor::{stream_rows, StatementExecutor};
use crate::filter::{apply_filter_queries, QueryObject};
use crate::fragment::{flatten_fragments, Combinator, Predicate, PredicateFragment};
use crate::path::{snake_case, Selector};
use crate::statement::{JoinClause, JoinKind, JoinTarget, LockMode, SelectStatement, SortOrder};

/// Fluent query composer bound to one root entity and alias
#[derive(Debug, Clone)]
pub struct QueryComposer {
    entity: String,
    alias: String,
    graph: Arc<EntityGraph>,
    statement: SelectStatement,
    where_fragments: Vec<PredicateFragment>,
    having_fragments: Vec<PredicateFragment>,
    join_history: JoinHistory,
    alias_entities: BTreeMap<String, String>,
    field_resolver_map: BTreeMap<String, String>,
    query_object: QueryObject,
    lock_version: Option<u64>,
    parenthesize: bool,
}

impl QueryComposer {
    pub fn new(
        graph: Arc<EntityGraph>,
        entity: impl Into<String>,
        alias: impl Into<String>,
        query_object: QueryObject,
    ) -> Self {
        let entity = entity.into();
        let alias = alias.into();
        let table = graph
            .table_of(&entity)
            .map(str::to_string)
            .unwrap_or_else(|| snake_case(&entity));

        let mut statement = SelectStatement::new();
        statement.from_table(table, alias.clone());

        let mut alias_entities = BTreeMap::new();
        alias_entities.insert(alias.clone(), entity.clone());

        Self {
            entity,
            alias,
            graph,
            statement,
            where_fragments: Vec::new(),
            having_fragments: Vec::new(),
            join_history: JoinHistory::new(),
            alias_entities,
            field_resolver_map: BTreeMap::new(),
            query_object,
            lock_version: None,
            parenthesize: false,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Whitelist a filter key, mapping it to a resolved column reference.
    /// Only mapped keys participate in automatic filter application.
    pub fn map_field(mut self, key: impl Into<String>, column: impl Into<String>) -> Self {
        self.field_resolver_map.insert(key.into(), column.into());
        self
    }

    // ---- selection ----

    /// Select one or more raw (expression, alias) pairs. The first pair
    /// replaces the current select list, later pairs append.
    pub fn select_raw(
        mut self,
        selections: &[(&str, Option<&str>)],
    ) -> Result<Self, QueryError> {
        if selections.is_empty() {
            return Err(QueryError::SelectionRequired);
        }
        for (index, (expression, alias)) in selections.iter().enumerate() {
            let alias = alias.map(str::to_string);
            if index == 0 {
                self.statement.select(*expression, alias);
            } else {
                self.statement.add_select(*expression, alias);
            }
        }
        Ok(self)
    }

    /// Append a compiled sub-query as an aliased select expression.
    pub fn select_sub_query<F>(
        mut self,
        entity: &str,
        selection_alias: &str,
        selection: F,
    ) -> Result<Self, QueryError>
    where
        F: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        let child = QueryComposer::new(
            self.graph.clone(),
            entity,
            selection_alias,
            QueryObject::empty(),
        );
        let child = selection(child)?;
        self.statement.add_select(
            format!("({})", child.query_text()),
            Some(selection_alias.to_string()),
        );
        Ok(self)
    }

    /// Rebind the FROM clause to another entity table.
    pub fn from(mut self, entity: &str, alias: &str) -> Self {
        let table = self
            .graph
            .table_of(entity)
            .map(str::to_string)
            .unwrap_or_else(|| snake_case(entity));
        self.statement.from_table(table, alias);
        self.entity = entity.to_string();
        self.alias = alias.to_string();
        self.alias_entities
            .insert(alias.to_string(), entity.to_string());
        self
    }

    /// Bind the FROM clause to a compiled sub-query.
    pub fn from_sub_query<F>(
        mut self,
        entity: &str,
        alias: &str,
        sub_query: F,
    ) -> Result<Self, QueryError>
    where
        F: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        let child = QueryComposer::new(self.graph.clone(), entity, alias, QueryObject::empty());
        let child = sub_query(child)?;
        self.statement.from_sub_query(child.query_text(), alias);
        Ok(self)
    }

    pub fn set_distinct(mut self, distinct: bool) -> Self {
        self.statement.distinct(distinct);
        self
    }

    /// DISTINCT ON over a non-empty, pairwise-unique selector list.
    /// Declare joins before calling this so relation paths resolve.
    pub fn set_distinct_on(mut self, selectors: Vec<Selector>) -> Result<Self, QueryError> {
        require_unique(&selectors, "set_distinct_on")?;
        let mut columns = Vec::with_capacity(selectors.len());
        for selector in &selectors {
            columns.push(resolve_column(selector, &self.alias, &self.join_history)?);
        }
        self.statement.distinct_on(columns);
        Ok(self)
    }

    pub fn group_by(mut self, selectors: Vec<Selector>) -> Result<Self, QueryError> {
        require_unique(&selectors, "group_by")?;
        for (index, selector) in selectors.iter().enumerate() {
            let column = resolve_column(selector, &self.alias, &self.join_history)?;
            if index == 0 {
                self.statement.group_by(column);
            } else {
                self.statement.add_group_by(column);
            }
        }
        Ok(self)
    }

    // ---- conditions ----

    /// Queue AND-combined conditions for a property. The closure receives a
    /// condition builder bound to the resolved column and a fresh sub-query
    /// composer for building `IN (SELECT ...)` expressions.
    pub fn and_where<S, F>(self, selector: S, conditions: F) -> Result<Self, QueryError>
    where
        S: Into<Selector>,
        F: FnOnce(ConditionBuilder, QueryComposer) -> Result<ConditionBuilder, QueryError>,
    {
        self.where_with(Combinator::And, selector.into(), conditions)
    }

    /// Queue OR-combined conditions for a property.
    pub fn or_where<S, F>(self, selector: S, conditions: F) -> Result<Self, QueryError>
    where
        S: Into<Selector>,
        F: FnOnce(ConditionBuilder, QueryComposer) -> Result<ConditionBuilder, QueryError>,
    {
        self.where_with(Combinator::Or, selector.into(), conditions)
    }

    fn where_with<F>(
        mut self,
        combinator: Combinator,
        selector: Selector,
        conditions: F,
    ) -> Result<Self, QueryError>
    where
        F: FnOnce(ConditionBuilder, QueryComposer) -> Result<ConditionBuilder, QueryError>,
    {
        let column = resolve_column(&selector, &self.alias, &self.join_history)?;
        let sub_query = self.create_sub_query(false);
        let builder = conditions(ConditionBuilder::new(column, combinator), sub_query)?;
        self.where_fragments.extend(builder.into_fragments());
        Ok(self)
    }

    /// Flatten a nested composer's conditions into one parenthesized group
    /// joined to prior fragments with AND.
    pub fn and_where_isolated<F>(self, conditions: F) -> Result<Self, QueryError>
    where
        F: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        self.isolated_conditions(Combinator::And, conditions)
    }

    /// Same as [`Self::and_where_isolated`] but joined with OR.
    pub fn or_where_isolated<F>(self, conditions: F) -> Result<Self, QueryError>
    where
        F: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        self.isolated_conditions(Combinator::Or, conditions)
    }

    fn isolated_conditions<F>(
        mut self,
        combinator: Combinator,
        conditions: F,
    ) -> Result<Self, QueryError>
    where
        F: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        let child = conditions(self.create_sub_query(true))?;
        self.where_fragments.push(PredicateFragment::new(
            combinator,
            Predicate::Group(child.where_fragments),
        ));
        Ok(self)
    }

    pub fn and_having<S, F>(self, selector: S, conditions: F) -> Result<Self, QueryError>
    where
        S: Into<Selector>,
        F: FnOnce(ConditionBuilder) -> Result<ConditionBuilder, QueryError>,
    {
        self.having_with(Combinator::And, selector.into(), conditions)
    }

    pub fn or_having<S, F>(self, selector: S, conditions: F) -> Result<Self, QueryError>
    where
        S: Into<Selector>,
        F: FnOnce(ConditionBuilder) -> Result<ConditionBuilder, QueryError>,
    {
        self.having_with(Combinator::Or, selector.into(), conditions)
    }

    fn having_with<F>(
        mut self,
        combinator: Combinator,
        selector: Selector,
        conditions: F,
    ) -> Result<Self, QueryError>
    where
        F: FnOnce(ConditionBuilder) -> Result<ConditionBuilder, QueryError>,
    {
        let column = resolve_column(&selector, &self.alias, &self.join_history)?;
        let builder = conditions(ConditionBuilder::new(column, combinator))?;
        self.having_fragments.extend(builder.into_fragments());
        Ok(self)
    }

    // ---- joins ----

    pub fn inner_join<S: Into<Selector>>(
        self,
        selector: S,
        join_alias: &str,
    ) -> Result<Self, QueryError> {
        self.apply_join(selector.into(), join_alias, JoinKind::Inner, no_condition())
    }

    pub fn left_join<S: Into<Selector>>(
        self,
        selector: S,
        join_alias: &str,
    ) -> Result<Self, QueryError> {
        self.apply_join(selector.into(), join_alias, JoinKind::Left, no_condition())
    }

    /// Join a relation with an extra ON condition built by the closure,
    /// which receives a composer scoped to the joined entity.
    pub fn inner_join_on<S, F>(
        self,
        selector: S,
        join_alias: &str,
        condition: F,
    ) -> Result<Self, QueryError>
    where
        S: Into<Selector>,
        F: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        self.apply_join(selector.into(), join_alias, JoinKind::Inner, Some(condition))
    }

    pub fn left_join_on<S, F>(
        self,
        selector: S,
        join_alias: &str,
        condition: F,
    ) -> Result<Self, QueryError>
    where
        S: Into<Selector>,
        F: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        self.apply_join(selector.into(), join_alias, JoinKind::Left, Some(condition))
    }

    fn apply_join<F>(
        mut self,
        selector: Selector,
        join_alias: &str,
        kind: JoinKind,
        condition: Option<F>,
    ) -> Result<Self, QueryError>
    where
        F: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        let (reference, relation) = resolve_relation(
            &selector,
            &self.entity,
            &self.alias,
            self.graph.as_ref(),
            &self.join_history,
        )?;
        let owner_alias = reference
            .split('.')
            .next()
            .unwrap_or(&self.alias)
            .to_string();
        let owner_entity = self
            .alias_entities
            .get(&owner_alias)
            .cloned()
            .unwrap_or_else(|| self.entity.clone());

        let target_entity = self
            .graph
            .relation_target(&owner_entity, &relation)
            .ok_or_else(|| QueryError::UnrelatedJoin {
                entity: owner_entity.clone(),
                relation: relation.clone(),
            })?
            .to_string();
        let target_table = self
            .graph
            .table_of(&target_entity)
            .map(str::to_string)
            .unwrap_or_else(|| snake_case(&target_entity));

        self.join_history.record(reference, join_alias)?;
        self.alias_entities
            .insert(join_alias.to_string(), target_entity.clone());

        let natural_on = self
            .graph
            .relations(&owner_entity)
            .iter()
            .find(|rel| rel.name == relation)
            .map(|rel| match rel.cardinality {
                Cardinality::ManyToOne | Cardinality::OneToOne => format!(
                    "{}.id = {}.{}_id",
                    join_alias,
                    owner_alias,
                    snake_case(&relation)
                ),
                Cardinality::OneToMany | Cardinality::ManyToMany => format!(
                    "{}.{}_id = {}.id",
                    join_alias,
                    snake_case(&owner_entity),
                    owner_alias
                ),
            });

        let extra_on = match condition {
            Some(build) => {
                let mut child = QueryComposer::new(
                    self.graph.clone(),
                    target_entity,
                    join_alias,
                    QueryObject::empty(),
                );
                child.join_history = self.join_history.snapshot();
                let child = build(child)?;
                let expression = flatten_fragments(&child.where_fragments);
                (!expression.is_empty()).then_some(expression)
            }
            None => None,
        };

        self.statement.join(JoinClause {
            kind,
            target: JoinTarget::Table(target_table),
            alias: join_alias.to_string(),
            natural_on,
            extra_on,
        });
        Ok(self)
    }

    pub fn inner_join_sub_query<Q>(
        self,
        sub_query: Q,
        join_alias: &str,
    ) -> Result<Self, QueryError>
    where
        Q: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        self.apply_join_sub_query(sub_query, join_alias, JoinKind::Inner, no_condition())
    }

    pub fn left_join_sub_query<Q>(
        self,
        sub_query: Q,
        join_alias: &str,
    ) -> Result<Self, QueryError>
    where
        Q: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        self.apply_join_sub_query(sub_query, join_alias, JoinKind::Left, no_condition())
    }

    pub fn inner_join_sub_query_on<Q, F>(
        self,
        sub_query: Q,
        join_alias: &str,
        condition: F,
    ) -> Result<Self, QueryError>
    where
        Q: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
        F: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        self.apply_join_sub_query(sub_query, join_alias, JoinKind::Inner, Some(condition))
    }

    pub fn left_join_sub_query_on<Q, F>(
        self,
        sub_query: Q,
        join_alias: &str,
        condition: F,
    ) -> Result<Self, QueryError>
    where
        Q: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
        F: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        self.apply_join_sub_query(sub_query, join_alias, JoinKind::Left, Some(condition))
    }

    fn apply_join_sub_query<Q, F>(
        mut self,
        sub_query: Q,
        join_alias: &str,
        kind: JoinKind,
        condition: Option<F>,
    ) -> Result<Self, QueryError>
    where
        Q: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
        F: FnOnce(QueryComposer) -> Result<QueryComposer, QueryError>,
    {
        let sub = sub_query(self.create_sub_query(false))?;
        let extra_on = match condition {
            Some(build) => {
                let child = build(self.create_sub_query(true))?;
                let expression = flatten_fragments(&child.where_fragments);
                (!expression.is_empty()).then_some(expression)
            }
            None => None,
        };
        self.statement.join(JoinClause {
            kind,
            target: JoinTarget::SubQuery(sub.query_text()),
            alias: join_alias.to_string(),
            natural_on: None,
            extra_on,
        });
        Ok(self)
    }

    // ---- pagination, ordering, locking ----

    /// Apply ordering, pagination and whitelisted automatic filters from the
    /// query object, in that order.
    pub fn apply_filter_pagination(mut self, alias: Option<&str>) -> Result<Self, QueryError> {
        self = self.apply_order(alias)?;
        self = self.apply_paginate();
        apply_filter_queries(
            &mut self.statement,
            &self.field_resolver_map,
            &self.query_object,
        );
        Ok(self)
    }

    fn apply_order(mut self, alias: Option<&str>) -> Result<Self, QueryError> {
        let Some(order) = self.query_object.order().map(str::to_string) else {
            return Ok(self);
        };
        let prefix = alias.unwrap_or(&self.alias).to_string();
        for (index, token) in order.split(',').enumerate() {
            let direction = match token.chars().next() {
                Some('^') => SortOrder::Asc,
                Some('-') => SortOrder::Desc,
                _ => {
                    return Err(QueryError::OrderPrefixMissing {
                        field: token.to_string(),
                    })
                }
            };
            let column = format!("{}.{}", prefix, snake_case(&token[1..]));
            if index == 0 {
                self.statement.order_by(column, direction);
            } else {
                self.statement.add_order_by(column, direction);
            }
        }
        Ok(self)
    }

    fn apply_paginate(mut self) -> Self {
        let page = self.query_object.page();
        let limit = self.query_object.limit();
        let offset = page.saturating_sub(1).saturating_mul(limit);
        self.statement.offset(Some(offset));
        self.statement.limit(Some(limit));
        self
    }

    /// Apply a row-locking mode. Optimistic locking is an application-level
    /// version check: it renders no clause, and the caller compares the
    /// fetched row's version column against [`Self::lock_version`].
    pub fn set_locking(
        mut self,
        mode: LockMode,
        version: Option<u64>,
    ) -> Result<Self, QueryError> {
        if mode == LockMode::Optimistic && version.is_none() {
            return Err(QueryError::VersionRequired);
        }
        self.lock_version = version;
        self.statement.set_lock(mode);
        Ok(self)
    }

    /// Version supplied for optimistic locking, if any
    pub fn lock_version(&self) -> Option<u64> {
        self.lock_version
    }

    // ---- compilation and terminals ----

    /// Fresh composer for building a sub-query expression. It shares no
    /// mutable state with the parent; the join history is a snapshot.
    pub fn create_sub_query(&self, with_from: bool) -> QueryComposer {
        let mut child = QueryComposer::new(
            self.graph.clone(),
            self.entity.clone(),
            self.alias.clone(),
            self.query_object.clone(),
        );
        if !with_from {
            child.statement = SelectStatement::new();
        }
        child.join_history = self.join_history.snapshot();
        child.alias_entities = self.alias_entities.clone();
        child.parenthesize = true;
        child
    }

    /// Clone the statement and flatten all queued WHERE fragments, then all
    /// HAVING fragments, onto the clone in declaration order.
    fn compiled(&self) -> SelectStatement {
        debug!(entity = %self.entity, alias = %self.alias, "compiling query");
        let mut statement = self.statement.clone();
        for fragment in &self.where_fragments {
            let rendered = fragment.predicate.render();
            match fragment.combinator {
                Combinator::And => statement.and_where(rendered),
                Combinator::Or => statement.or_where(rendered),
            };
        }
        for fragment in &self.having_fragments {
            let rendered = fragment.predicate.render();
            match fragment.combinator {
                Combinator::And => statement.and_having(rendered),
                Combinator::Or => statement.or_having(rendered),
            };
        }
        statement
    }

    fn query_text(&self) -> String {
        self.compiled().render_inline()
    }

    /// Parameterless rendered query text. Sub-query composers wrap their
    /// text in parentheses so it embeds directly in a parent expression.
    pub fn get_query(&self) -> String {
        let text = self.query_text();
        if self.parenthesize {
            format!("({})", text)
        } else {
            text
        }
    }

    /// Dialect SQL with numbered placeholders plus the bound parameters.
    pub fn get_sql(&self) -> (String, Vec<Value>) {
        self.compiled().render()
    }

    /// Execute and materialize all rows.
    pub async fn exec(
        &self,
        executor: &dyn StatementExecutor,
    ) -> Result<Vec<PgRow>, QueryError> {
        let (sql, params) = self.get_sql();
        executor.fetch_all(&sql, &params).await
    }

    /// Execute and stream rows through a transform. A transform or database
    /// error terminates the stream after being forwarded once.
    pub fn stream<T, F>(&self, pool: PgPool, transform: F) -> mpsc::Receiver<Result<T, QueryError>>
    where
        T: Send + 'static,
        F: Fn(PgRow) -> Result<T, QueryError> + Send + 'static,
    {
        let (sql, params) = self.get_sql();
        stream_rows(pool, sql, params, transform)
    }

    /// Row count ignoring pagination.
    pub async fn get_count(&self, executor: &dyn StatementExecutor) -> Result<i64, QueryError> {
        let mut statement = self.compiled();
        statement.clear_result_shaping();
        statement.select("COUNT(*)", Some("total".to_string()));
        let (sql, params) = statement.render();
        executor.fetch_scalar(&sql, &params).await
    }

    pub async fn get_sum<S: Into<Selector>>(
        &self,
        executor: &dyn StatementExecutor,
        selector: S,
    ) -> Result<f64, QueryError> {
        self.one_aggregate(executor, selector.into(), AggregateFunction::Sum)
            .await
    }

    pub async fn get_average<S: Into<Selector>>(
        &self,
        executor: &dyn StatementExecutor,
        selector: S,
    ) -> Result<f64, QueryError> {
        self.one_aggregate(executor, selector.into(), AggregateFunction::Avg)
            .await
    }

    pub async fn get_max<S: Into<Selector>>(
        &self,
        executor: &dyn StatementExecutor,
        selector: S,
    ) -> Result<f64, QueryError> {
        self.one_aggregate(executor, selector.into(), AggregateFunction::Max)
            .await
    }

    pub async fn get_min<S: Into<Selector>>(
        &self,
        executor: &dyn StatementExecutor,
        selector: S,
    ) -> Result<f64, QueryError> {
        self.one_aggregate(executor, selector.into(), AggregateFunction::Min)
            .await
    }

    pub async fn get_many_sum(
        &self,
        executor: &dyn StatementExecutor,
        selectors: Vec<Selector>,
    ) -> Result<BTreeMap<String, f64>, QueryError> {
        require_unique(&selectors, "get_many_sum")?;
        self.many_aggregate(executor, selectors, AggregateFunction::Sum)
            .await
    }

    pub async fn get_many_average(
        &self,
        executor: &dyn StatementExecutor,
        selectors: Vec<Selector>,
    ) -> Result<BTreeMap<String, f64>, QueryError> {
        require_unique(&selectors, "get_many_average")?;
        self.many_aggregate(executor, selectors, AggregateFunction::Avg)
            .await
    }

    pub async fn get_many_max(
        &self,
        executor: &dyn StatementExecutor,
        selectors: Vec<Selector>,
    ) -> Result<BTreeMap<String, f64>, QueryError> {
        require_unique(&selectors, "get_many_max")?;
        self.many_aggregate(executor, selectors, AggregateFunction::Max)
            .await
    }

    pub async fn get_many_min(
        &self,
        executor: &dyn StatementExecutor,
        selectors: Vec<Selector>,
    ) -> Result<BTreeMap<String, f64>, QueryError> {
        require_unique(&selectors, "get_many_min")?;
        self.many_aggregate(executor, selectors, AggregateFunction::Min)
            .await
    }

    /// Resolve and type-check one aggregate target, returning the property
    /// name and the aliased column expression.
    fn aggregate_target(
        &self,
        selector: &Selector,
        function: AggregateFunction,
    ) -> Result<(String, String), QueryError> {
        let column = resolve_column(selector, &self.alias, &self.join_history)?;
        let property = match selector {
            Selector::Path(path) => path
                .last()
                .ok_or(QueryError::SelectorMissing)?
                .to_string(),
            Selector::Raw(raw) => raw
                .split('.')
                .nth(1)
                .unwrap_or(raw.as_str())
                .to_string(),
        };
        validate_numeric(self.graph.as_ref(), &self.entity, &property, function)?;
        Ok((property, column))
    }

    async fn one_aggregate(
        &self,
        executor: &dyn StatementExecutor,
        selector: Selector,
        function: AggregateFunction,
    ) -> Result<f64, QueryError> {
        let (_, column) = self.aggregate_target(&selector, function)?;
        let mut statement = self.compiled();
        statement.clear_result_shaping();
        statement.select(
            format!("{}({})::float8", function.as_sql(), column),
            Some("result".to_string()),
        );
        let (sql, params) = statement.render();
        let row = executor.fetch_one(&sql, &params).await?;
        let value: Option<f64> = row.try_get("result")?;
        Ok(value.unwrap_or(0.0))
    }

    async fn many_aggregate(
        &self,
        executor: &dyn StatementExecutor,
        selectors: Vec<Selector>,
        function: AggregateFunction,
    ) -> Result<BTreeMap<String, f64>, QueryError> {
        let mut statement = self.compiled();
        statement.clear_result_shaping();
        for (index, selector) in selectors.iter().enumerate() {
            let (property, column) = self.aggregate_target(selector, function)?;
            let expression = format!("{}({})::float8", function.as_sql(), column);
            let alias = function.alias_for(&property);
            if index == 0 {
                statement.select(expression, Some(alias));
            } else {
                statement.add_select(expression, Some(alias));
            }
        }
        let (sql, params) = statement.render();
        let row = executor.fetch_one(&sql, &params).await?;
        let mut results = BTreeMap::new();
        for column in row.columns() {
            let value: Option<f64> = row.try_get(column.ordinal())?;
            results.insert(column.name().to_string(), value.unwrap_or(0.0));
        }
        Ok(results)
    }
}

fn require_unique(selectors: &[Selector], method: &'static str) -> Result<(), QueryError> {
    if selectors.is_empty() {
        return Err(QueryError::SelectorRequired { method });
    }
    let mut seen = Vec::with_capacity(selectors.len());
    for selector in selectors {
        let key = selector.dedup_key();
        if seen.contains(&key) {
            return Err(QueryError::DuplicateSelector { method });
        }
        seen.push(key);
    }
    Ok(())
}

type NoCondition = fn(QueryComposer) -> Result<QueryComposer, QueryError>;

fn no_condition() -> Option<NoCondition> {
    None
}
