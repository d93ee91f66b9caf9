use thiserror::Error;

use crate::definitions::FilterKind;
use crate::value::FilterKey;

/// Errors raised while loading or compiling filter definitions.
///
/// These are fatal: a table that fails to compile must abort startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("filter definitions enable neither atom keys nor string keys, no filter could ever match")]
    NoKeyType,

    #[error("duplicate filter key '{key}' in {kind}")]
    DuplicateKey { kind: FilterKind, key: String },

    #[error("invalid filter definitions: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigurationError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

/// Errors raised while applying a filter map to a query.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no filter matches key {key}")]
    NoMatch { key: FilterKey },

    #[error("invalid value for filter {key}: {reason}")]
    InvalidValue { key: FilterKey, reason: String },

    #[error("invalid order directive for {key}: {reason}")]
    InvalidOrderDirective { key: FilterKey, reason: String },

    #[error("malformed filter input: {0}")]
    MalformedInput(String),

    /// The query primitive rejected an operation. The source is passed
    /// through untouched and can be downcast by the caller.
    #[error("query error: {0}")]
    Query(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DispatchError {
    pub fn invalid_value(key: &FilterKey, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.clone(),
            reason: reason.into(),
        }
    }

    pub fn invalid_directive(key: &FilterKey, reason: impl Into<String>) -> Self {
        Self::InvalidOrderDirective {
            key: key.clone(),
            reason: reason.into(),
        }
    }

    /// Wrap an error coming from the query primitive.
    pub fn query<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Query(Box::new(error))
    }
}
