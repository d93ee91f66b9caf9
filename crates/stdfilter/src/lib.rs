//! Declarative standard filters compiled into query dispatch tables.
//!
//! An application declares once which filter keys it accepts and how each
//! maps onto a comparison, join, sort or pagination step
//! ([`FilterDefinitions`]). Compiling the definitions yields an immutable
//! [`CompiledFilters`] table; at request time a [`FilterMap`] is folded over
//! the table into a narrowed query. [`generate_docs`] renders documentation
//! from the very same definitions.
//!
//! ```ignore
//! let definitions = FilterDefinitions::new()
//!     .with_atom_keys()
//!     .with_order_by()
//!     .with(FilterKind::EqualTo, [("role_name", ("role", "name"))]);
//!
//! let filters = CompiledFilters::compile(&definitions, "users", resolver::join_once(join_role))?;
//!
//! let query = filters.apply(
//!     base_query,
//!     &FilterMap::new().with(
//!         FilterKey::atom("order_by"),
//!         vec![FilterValue::from(OrderDirective::asc("role_name"))],
//!     ),
//! )?;
//! ```

pub mod compiler;
pub mod definitions;
pub mod dispatch;
pub mod docs;
pub mod error;
pub mod keys;
pub mod loader;
pub mod order_by;
pub mod query;
pub mod reloadable;
pub mod resolver;
pub mod value;

#[cfg(test)]
mod testing;

pub use compiler::{CompiledFilters, LIMIT_KEY, OFFSET_KEY};
pub use definitions::{FieldRef, FilterDefinition, FilterDefinitions, FilterField, FilterKind};
pub use dispatch::{DispatchRule, Fallback, Transform, apply_filters};
pub use docs::generate_docs;
pub use error::{ConfigurationError, DispatchError};
pub use keys::KeyPolicy;
pub use order_by::{ORDER_BY_KEY, OrderDirective, SortAliases};
pub use query::{Comparison, FilterQuery, ListOp, Pattern, SortDirection};
pub use reloadable::ReloadableFilters;
pub use resolver::RelationResolver;
pub use value::{FilterKey, FilterMap, FilterValue};
