//! Request-time input: filter keys, filter values and the ordered filter map.

use indexmap::IndexMap;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};

use crate::error::DispatchError;
use crate::order_by::OrderDirective;
use crate::query::SortDirection;

/// A filter key as supplied by the caller.
///
/// `Atom` is the native key form (symbolic keys built in code), `Text` the
/// textual form (keys that arrive as strings, e.g. from HTTP parameters).
/// Which forms a compiled table recognizes is decided by its key policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterKey {
    Atom(String),
    Text(String),
}

impl FilterKey {
    pub fn atom(name: impl Into<String>) -> Self {
        Self::Atom(name.into())
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::Text(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Atom(name) | Self::Text(name) => name,
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(name) => write!(f, ":{name}"),
            Self::Text(name) => write!(f, "\"{name}\""),
        }
    }
}

/// A filter value: a scalar, a list, or (inside an order-by list) a sort
/// directive.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(Date),
    Timestamp(OffsetDateTime),
    List(Vec<FilterValue>),
    Order(OrderDirective),
}

impl FilterValue {
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::List(_) | Self::Order(_))
    }

    pub fn as_list(&self) -> Option<&[FilterValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Textual rendering used for pattern filters.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(s) => Some(Cow::Borrowed(s)),
            Self::Integer(i) => Some(Cow::Owned(i.to_string())),
            Self::Float(f) => Some(Cow::Owned(f.to_string())),
            Self::Bool(b) => Some(Cow::Owned(b.to_string())),
            Self::Date(d) => Some(Cow::Owned(d.to_string())),
            Self::Timestamp(ts) => ts.format(&Rfc3339).ok().map(Cow::Owned),
            Self::Null | Self::List(_) | Self::Order(_) => None,
        }
    }

    /// Non-negative row count used by `limit` and `offset`.
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Integer(i) => u64::try_from(*i).ok(),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert a JSON value.
    ///
    /// Objects are only accepted as order directives: a single key naming a
    /// sort direction, holding either a field name or a `[relation, field]`
    /// pair. Any other object yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64()?),
            },
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => Self::List(
                items
                    .iter()
                    .map(Self::from_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Value::Object(map) => {
                if map.len() != 1 {
                    return None;
                }
                let (direction, target) = map.iter().next()?;
                let direction: SortDirection = direction.parse().ok()?;
                match target {
                    Value::String(field) => Self::Order(OrderDirective::directed(direction, field)),
                    Value::Array(pair) => match pair.as_slice() {
                        [Value::String(relation), Value::String(field)] => Self::Order(
                            OrderDirective::qualified(direction, relation, field),
                        ),
                        _ => return None,
                    },
                    _ => return None,
                }
            }
        })
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for FilterValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for FilterValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Date> for FilterValue {
    fn from(d: Date) -> Self {
        Self::Date(d)
    }
}

impl From<OffsetDateTime> for FilterValue {
    fn from(ts: OffsetDateTime) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<OrderDirective> for FilterValue {
    fn from(directive: OrderDirective) -> Self {
        Self::Order(directive)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Caller-supplied filters, applied in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterMap {
    entries: IndexMap<FilterKey, FilterValue>,
}

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a filter. Re-inserting a key replaces its value but keeps its
    /// original position.
    pub fn insert(&mut self, key: FilterKey, value: impl Into<FilterValue>) -> Option<FilterValue> {
        self.entries.insert(key, value.into())
    }

    #[must_use]
    pub fn with(mut self, key: FilterKey, value: impl Into<FilterValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &FilterKey) -> Option<&FilterValue> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FilterKey, &FilterValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a text-keyed filter map from a JSON object, keeping its key order.
    pub fn from_json(value: &Value) -> Result<Self, DispatchError> {
        let object = value.as_object().ok_or_else(|| {
            DispatchError::MalformedInput(format!("expected a JSON object, got {value}"))
        })?;

        let mut map = Self::new();
        for (name, raw) in object {
            let key = FilterKey::text(name.as_str());
            let value = FilterValue::from_json(raw).ok_or_else(|| {
                DispatchError::invalid_value(&key, format!("unsupported JSON value {raw}"))
            })?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl FromIterator<(FilterKey, FilterValue)> for FilterMap {
    fn from_iter<I: IntoIterator<Item = (FilterKey, FilterValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FilterMap {
    type Item = (&'a FilterKey, &'a FilterValue);
    type IntoIter = indexmap::map::Iter<'a, FilterKey, FilterValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
