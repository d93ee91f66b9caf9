//! Compiled filters that can be swapped at runtime.
//!
//! Holds a [`CompiledFilters`] behind an `ArcSwap`: request handlers read the
//! current table without locking, and a reload replaces it atomically. A
//! reload that fails to compile leaves the previous table in place.

use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::compiler::CompiledFilters;
use crate::definitions::FilterDefinitions;
use crate::error::{ConfigurationError, DispatchError};
use crate::query::FilterQuery;
use crate::value::FilterMap;

pub struct ReloadableFilters<Q> {
    inner: ArcSwap<CompiledFilters<Q>>,
}

impl<Q> ReloadableFilters<Q>
where
    Q: FilterQuery + 'static,
{
    pub fn new(filters: CompiledFilters<Q>) -> Self {
        Self {
            inner: ArcSwap::from_pointee(filters),
        }
    }

    /// Snapshot of the current table.
    pub fn current(&self) -> Arc<CompiledFilters<Q>> {
        self.inner.load_full()
    }

    /// Recompile from `definitions`, keeping the current default relation
    /// and resolver.
    pub fn reload(&self, definitions: &FilterDefinitions) -> Result<(), ConfigurationError> {
        let current = self.inner.load();
        match CompiledFilters::compile(
            definitions,
            current.default_relation(),
            Arc::clone(current.resolver()),
        ) {
            Ok(next) => {
                info!(rules = next.len(), "Reloaded filter definitions");
                self.inner.store(Arc::new(next));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Filter definitions reload failed, keeping previous table");
                Err(e)
            }
        }
    }

    pub fn apply(&self, query: Q, filters: &FilterMap) -> Result<Q, DispatchError> {
        self.inner.load().apply(query, filters)
    }
}

impl<Q> std::fmt::Debug for ReloadableFilters<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadableFilters")
            .field("current", &self.inner.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::FilterKind;
    use crate::resolver;
    use crate::testing::RecordingQuery;
    use crate::value::FilterKey;

    fn reloadable() -> ReloadableFilters<RecordingQuery> {
        let defs = FilterDefinitions::new()
            .with_atom_keys()
            .with(FilterKind::EqualTo, ["address"]);
        let compiled =
            CompiledFilters::compile(&defs, "users", resolver::join_once(RecordingQuery::join))
                .unwrap();
        ReloadableFilters::new(compiled)
    }

    #[test]
    fn test_reload_swaps_table() {
        let filters = reloadable();
        let map = FilterMap::new().with(FilterKey::atom("city"), "Oslo");
        assert!(filters.apply(RecordingQuery::new("users"), &map).is_err());

        let next = FilterDefinitions::new()
            .with_atom_keys()
            .with(FilterKind::EqualTo, ["city"]);
        filters.reload(&next).unwrap();

        let query = filters.apply(RecordingQuery::new("users"), &map).unwrap();
        assert_eq!(query.ops.len(), 1);
        assert_eq!(filters.current().default_relation(), "users");
    }

    #[test]
    fn test_failed_reload_keeps_previous_table() {
        let filters = reloadable();
        let broken = FilterDefinitions::new().with(FilterKind::EqualTo, ["city"]);
        let err = filters.reload(&broken).unwrap_err();
        assert!(matches!(err, ConfigurationError::NoKeyType));

        let map = FilterMap::new().with(FilterKey::atom("address"), "Main St");
        assert!(filters.apply(RecordingQuery::new("users"), &map).is_ok());
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let filters = reloadable();
        let before = filters.current();
        let next = FilterDefinitions::new()
            .with_string_keys()
            .with(FilterKind::EqualTo, ["city"]);
        filters.reload(&next).unwrap();

        assert!(before.definitions().atom_keys);
        assert!(!filters.current().definitions().atom_keys);
    }
}
