//! PostgreSQL backend for `stdfilter`.
//!
//! [`SqlQuery`] implements [`stdfilter::FilterQuery`], so compiled filters
//! narrow it directly; [`JoinCatalog`] supplies the relation resolver.
//!
//! ```ignore
//! let catalog = JoinCatalog::new()
//!     .with_join(Join::inner("roles", "role", FieldRef::new("users", "role_id"), "id"));
//! let filters = CompiledFilters::compile(&definitions, "users", catalog.into_resolver())?;
//!
//! let built = filters.apply(SqlQuery::new("users"), &filter_map)?.build()?;
//! ```

pub mod builder;
pub mod catalog;
mod filter_query;

pub use builder::{
    BuiltQuery, Condition, Join, JoinKind, Operator, Pagination, SortSpec, SqlBuilderError,
    SqlQuery, SqlValue, escape_identifier, escape_like_pattern, validate_identifier,
};
pub use catalog::JoinCatalog;
