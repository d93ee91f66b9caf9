//! Relation resolver hook.
//!
//! Compiled transforms call the resolver with the relation alias a filter
//! targets before touching the field. The resolver is where a join gets
//! added on demand, so it must be idempotent: resolving an alias the query
//! already carries has to leave the query unchanged.

use std::sync::Arc;

use crate::query::FilterQuery;

/// `(query, relation alias) -> query`
pub type RelationResolver<Q> = Arc<dyn Fn(Q, &str) -> Q + Send + Sync>;

/// Resolver that never touches the query.
///
/// Filters on relations other than the default one are only safe with this
/// resolver if the caller joins those relations up front.
pub fn identity<Q: 'static>() -> RelationResolver<Q> {
    Arc::new(|query: Q, _relation: &str| query)
}

pub fn from_fn<Q, F>(resolve: F) -> RelationResolver<Q>
where
    F: Fn(Q, &str) -> Q + Send + Sync + 'static,
{
    Arc::new(resolve)
}

/// Wrap a join function so it only runs for relations the query does not
/// carry yet.
pub fn join_once<Q, F>(join: F) -> RelationResolver<Q>
where
    Q: FilterQuery + 'static,
    F: Fn(Q, &str) -> Q + Send + Sync + 'static,
{
    Arc::new(move |query: Q, relation: &str| {
        if query.has_relation(relation) {
            query
        } else {
            tracing::trace!(relation, "Joining relation on demand");
            join(query, relation)
        }
    })
}
