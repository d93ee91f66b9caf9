//! Order-by sub-engine.
//!
//! The `order_by` filter takes a list of directives and appends one sort key
//! per directive, left to right. Field names are first looked up among the
//! `equal_to` keys, so a filter key aliasing a joined column sorts on that
//! column; unknown names are used verbatim on the default relation.

use std::collections::HashMap;
use std::fmt;

use crate::definitions::{FieldRef, FilterDefinitions, FilterKind};
use crate::dispatch::DispatchRule;
use crate::error::DispatchError;
use crate::keys::KeyPolicy;
use crate::query::{FilterQuery, SortDirection};
use crate::resolver::RelationResolver;
use crate::value::{FilterKey, FilterValue};

/// Filter key of the order-by filter.
pub const ORDER_BY_KEY: &str = "order_by";

/// One element of an order-by list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderDirective {
    /// Ascending on a field or `equal_to` alias.
    Field(String),
    /// Given direction on a field or `equal_to` alias.
    Directed(SortDirection, String),
    /// Given direction on an explicit relation and field.
    Qualified(SortDirection, String, String),
}

impl OrderDirective {
    pub fn field(field: impl Into<String>) -> Self {
        Self::Field(field.into())
    }

    pub fn directed(direction: SortDirection, field: impl Into<String>) -> Self {
        Self::Directed(direction, field.into())
    }

    pub fn qualified(
        direction: SortDirection,
        relation: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::Qualified(direction, relation.into(), field.into())
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::directed(SortDirection::Asc, field)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::directed(SortDirection::Desc, field)
    }

    pub fn direction(&self) -> SortDirection {
        match self {
            Self::Field(_) => SortDirection::Asc,
            Self::Directed(direction, _) | Self::Qualified(direction, _, _) => *direction,
        }
    }

    /// Resolve to the column to sort on.
    pub fn resolve(&self, aliases: &SortAliases) -> FieldRef {
        match self {
            Self::Field(name) | Self::Directed(_, name) => aliases.lookup(name),
            Self::Qualified(_, relation, field) => FieldRef::new(relation.as_str(), field.as_str()),
        }
    }

    fn from_value(key: &FilterKey, value: &FilterValue) -> Result<Self, DispatchError> {
        match value {
            FilterValue::Text(field) => Ok(Self::field(field.as_str())),
            FilterValue::Order(directive) => Ok(directive.clone()),
            other => Err(DispatchError::invalid_directive(
                key,
                format!("expected a field name or a directive, got {other:?}"),
            )),
        }
    }
}

impl fmt::Display for OrderDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f.write_str(field),
            Self::Directed(direction, field) => write!(f, "{direction}: {field}"),
            Self::Qualified(direction, relation, field) => {
                write!(f, "{direction}: {relation}.{field}")
            }
        }
    }
}

/// Sortable names declared through `equal_to`, mapped to their columns.
#[derive(Debug, Clone, Default)]
pub struct SortAliases {
    default_relation: String,
    aliases: HashMap<String, FieldRef>,
}

impl SortAliases {
    pub fn from_definitions(definitions: &FilterDefinitions, default_relation: &str) -> Self {
        let aliases = definitions
            .equal_to_aliases(default_relation)
            .into_iter()
            .map(|field| (field.key, field.target))
            .collect();
        Self {
            default_relation: default_relation.to_string(),
            aliases,
        }
    }

    /// Column for `name`: the aliased column if declared, else `name` on the
    /// default relation. Existence is not checked.
    pub fn lookup(&self, name: &str) -> FieldRef {
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| FieldRef::new(self.default_relation.as_str(), name))
    }
}

/// Compile the single order-by rule.
pub fn compile_order_by<Q>(
    definitions: &FilterDefinitions,
    default_relation: &str,
    policy: &KeyPolicy,
    resolver: RelationResolver<Q>,
) -> DispatchRule<Q>
where
    Q: FilterQuery + 'static,
{
    let aliases = SortAliases::from_definitions(definitions, default_relation);
    DispatchRule::compiled(
        FilterKind::OrderBy,
        policy.accepted_keys(ORDER_BY_KEY),
        true,
        move |query: Q, key: &FilterKey, value: &FilterValue| {
            let directives = value.as_list().unwrap_or_default();
            directives.iter().try_fold(query, |query, item| {
                let directive = OrderDirective::from_value(key, item)?;
                let target = directive.resolve(&aliases);
                let query = resolver(query, &target.relation);
                query
                    .order_by(directive.direction(), &target)
                    .map_err(DispatchError::query)
            })
        },
    )
}
