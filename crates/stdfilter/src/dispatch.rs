//! Dispatch rules and the request-time apply loop.
//!
//! A filter map is folded over an ordered list of rules. For each entry the
//! caller's custom rules are tried first, then the compiled table; the first
//! rule whose matcher accepts the `(key, value)` pair transforms the query.
//! Entries no rule accepts go to the [`Fallback`].

use std::fmt;
use std::sync::Arc;

use crate::definitions::FilterKind;
use crate::error::DispatchError;
use crate::value::{FilterKey, FilterMap, FilterValue};

/// `(query, key, value) -> query`
pub type Transform<Q> =
    Arc<dyn Fn(Q, &FilterKey, &FilterValue) -> Result<Q, DispatchError> + Send + Sync>;

type Predicate = Arc<dyn Fn(&FilterKey, &FilterValue) -> bool + Send + Sync>;

enum Matcher {
    /// Key is one of `keys`; with `list_only`, the value must also be a list.
    Keys { keys: Vec<FilterKey>, list_only: bool },
    Custom(Predicate),
}

impl Matcher {
    fn matches(&self, key: &FilterKey, value: &FilterValue) -> bool {
        match self {
            Self::Keys { keys, list_only } => keys.contains(key) && (!list_only || value.is_list()),
            Self::Custom(predicate) => predicate(key, value),
        }
    }
}

/// One `(matcher, transform)` entry of a dispatch table.
pub struct DispatchRule<Q> {
    kind: Option<FilterKind>,
    matcher: Arc<Matcher>,
    transform: Transform<Q>,
}

impl<Q> DispatchRule<Q> {
    pub(crate) fn compiled<F>(kind: FilterKind, keys: Vec<FilterKey>, list_only: bool, transform: F) -> Self
    where
        F: Fn(Q, &FilterKey, &FilterValue) -> Result<Q, DispatchError> + Send + Sync + 'static,
    {
        Self {
            kind: Some(kind),
            matcher: Arc::new(Matcher::Keys { keys, list_only }),
            transform: Arc::new(transform),
        }
    }

    /// A caller-defined rule, tried ahead of the compiled table.
    pub fn custom<P, F>(matcher: P, transform: F) -> Self
    where
        P: Fn(&FilterKey, &FilterValue) -> bool + Send + Sync + 'static,
        F: Fn(Q, &FilterKey, &FilterValue) -> Result<Q, DispatchError> + Send + Sync + 'static,
    {
        Self {
            kind: None,
            matcher: Arc::new(Matcher::Custom(Arc::new(matcher))),
            transform: Arc::new(transform),
        }
    }

    /// A custom rule selected by exactly one key.
    pub fn for_key<F>(key: FilterKey, transform: F) -> Self
    where
        F: Fn(Q, &FilterKey, &FilterValue) -> Result<Q, DispatchError> + Send + Sync + 'static,
    {
        Self {
            kind: None,
            matcher: Arc::new(Matcher::Keys {
                keys: vec![key],
                list_only: false,
            }),
            transform: Arc::new(transform),
        }
    }

    /// The standard filter kind this rule was compiled from, `None` for
    /// custom rules.
    pub fn kind(&self) -> Option<FilterKind> {
        self.kind
    }

    pub fn matches(&self, key: &FilterKey, value: &FilterValue) -> bool {
        self.matcher.matches(key, value)
    }

    pub fn apply(&self, query: Q, key: &FilterKey, value: &FilterValue) -> Result<Q, DispatchError> {
        (self.transform)(query, key, value)
    }
}

impl<Q> Clone for DispatchRule<Q> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            matcher: Arc::clone(&self.matcher),
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<Q> fmt::Debug for DispatchRule<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("DispatchRule");
        s.field("kind", &self.kind);
        match self.matcher.as_ref() {
            Matcher::Keys { keys, list_only } => {
                s.field("keys", keys).field("list_only", list_only);
            }
            Matcher::Custom(_) => {
                s.field("matcher", &"<custom>");
            }
        }
        s.finish_non_exhaustive()
    }
}

/// What happens to a filter entry no rule accepts.
pub enum Fallback<Q> {
    /// Fail with [`DispatchError::NoMatch`].
    Error,
    /// Leave the query unchanged.
    Ignore,
    /// Hand the entry to a caller-supplied function.
    With(Transform<Q>),
}

impl<Q> Fallback<Q> {
    pub fn with<F>(fallback: F) -> Self
    where
        F: Fn(Q, &FilterKey, &FilterValue) -> Result<Q, DispatchError> + Send + Sync + 'static,
    {
        Self::With(Arc::new(fallback))
    }
}

impl<Q> Default for Fallback<Q> {
    fn default() -> Self {
        Self::Error
    }
}

impl<Q> Clone for Fallback<Q> {
    fn clone(&self) -> Self {
        match self {
            Self::Error => Self::Error,
            Self::Ignore => Self::Ignore,
            Self::With(f) => Self::With(Arc::clone(f)),
        }
    }
}

impl<Q> fmt::Debug for Fallback<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("Error"),
            Self::Ignore => f.write_str("Ignore"),
            Self::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

/// Fold `filters` over `custom` rules then `table`, in map order.
pub fn apply_filters<Q>(
    query: Q,
    filters: &FilterMap,
    table: &[DispatchRule<Q>],
    custom: &[DispatchRule<Q>],
    fallback: &Fallback<Q>,
) -> Result<Q, DispatchError> {
    filters.iter().try_fold(query, |query, (key, value)| {
        match custom.iter().chain(table).find(|rule| rule.matches(key, value)) {
            Some(rule) => {
                tracing::trace!(key = %key, kind = ?rule.kind(), "Applying filter");
                rule.apply(query, key, value)
            }
            None => match fallback {
                Fallback::Error => Err(DispatchError::NoMatch { key: key.clone() }),
                Fallback::Ignore => {
                    tracing::debug!(key = %key, "No filter matches key, ignoring");
                    Ok(query)
                }
                Fallback::With(handle) => handle(query, key, value),
            },
        }
    })
}
