//! Join catalog: the relations a query may join on demand.

use std::collections::HashMap;

use stdfilter::RelationResolver;
use stdfilter::resolver::join_once;

use crate::builder::{Join, SqlQuery};

/// Relation alias to join specification.
#[derive(Debug, Clone, Default)]
pub struct JoinCatalog {
    joins: HashMap<String, Join>,
}

impl JoinCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `join` under its alias, replacing any earlier entry.
    pub fn with_join(mut self, join: Join) -> Self {
        self.joins.insert(join.alias.clone(), join);
        self
    }

    pub fn get(&self, alias: &str) -> Option<&Join> {
        self.joins.get(alias)
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Add the join for `alias` if it is known. Unknown aliases leave the
    /// query as is; `SqlQuery::build` reports them.
    pub fn resolve(&self, query: SqlQuery, alias: &str) -> SqlQuery {
        match self.joins.get(alias) {
            Some(join) => query.join(join.clone()),
            None => {
                tracing::debug!(relation = alias, "No join registered for relation");
                query
            }
        }
    }

    /// Idempotent resolver joining catalog relations at most once per query.
    pub fn into_resolver(self) -> RelationResolver<SqlQuery> {
        join_once(move |query: SqlQuery, alias: &str| self.resolve(query, alias))
    }
}
