//! Clause compiler: turns [`FilterDefinitions`] into a dispatch table.
//!
//! The table is built once, eagerly, and is immutable afterwards. Rules are
//! laid out in [`FilterKind::DISPATCH_ORDER`], one per configured entry,
//! plus one rule each for `limit`, `offset` and `order_by` when enabled.

use std::slice;
use std::sync::Arc;

use crate::definitions::{FieldRef, FilterDefinitions, FilterField, FilterKind};
use crate::dispatch::{DispatchRule, Fallback, apply_filters};
use crate::error::{ConfigurationError, DispatchError};
use crate::keys::KeyPolicy;
use crate::order_by::compile_order_by;
use crate::query::{Comparison, FilterQuery, ListOp, Pattern};
use crate::resolver::{self, RelationResolver};
use crate::value::{FilterKey, FilterMap, FilterValue};

/// Filter key of the limit filter.
pub const LIMIT_KEY: &str = "limit";
/// Filter key of the offset filter.
pub const OFFSET_KEY: &str = "offset";

/// Query primitive a field kind compiles to.
#[derive(Debug, Clone, Copy)]
enum Clause {
    Equal,
    EqualAny,
    Compare(Comparison),
    Pattern(Pattern),
    List(ListOp),
}

impl Clause {
    fn for_kind(kind: FilterKind) -> Option<Self> {
        Some(match kind {
            FilterKind::EqualTo => Self::Equal,
            FilterKind::EqualToAny => Self::EqualAny,
            FilterKind::SmallerThan => Self::Compare(Comparison::SmallerThan),
            FilterKind::GreaterOrEqual => Self::Compare(Comparison::GreaterOrEqual),
            FilterKind::StringStartsWith => Self::Pattern(Pattern::StartsWith),
            FilterKind::StringContains => Self::Pattern(Pattern::Contains),
            FilterKind::ListContains => Self::List(ListOp::Contains),
            FilterKind::ListContainsAny => Self::List(ListOp::ContainsAny),
            FilterKind::ListContainsAll => Self::List(ListOp::ContainsAll),
            FilterKind::Limit | FilterKind::Offset | FilterKind::OrderBy => return None,
        })
    }

    /// Set-typed clauses only match list values.
    fn list_only(self) -> bool {
        matches!(
            self,
            Self::EqualAny | Self::List(ListOp::ContainsAny) | Self::List(ListOp::ContainsAll)
        )
    }

    fn apply<Q: FilterQuery>(
        self,
        query: Q,
        target: &FieldRef,
        key: &FilterKey,
        value: &FilterValue,
    ) -> Result<Q, DispatchError> {
        let result = match self {
            Self::Equal => query.where_equal(target, scalar(key, value)?),
            Self::EqualAny => query.where_equal_any(target, list(key, value)?),
            Self::Compare(op) => query.where_compare(target, op, scalar(key, value)?),
            Self::Pattern(pattern) => {
                let text = value.as_text().ok_or_else(|| {
                    DispatchError::invalid_value(key, "expected a string for a pattern filter")
                })?;
                query.where_pattern(target, pattern, &text)
            }
            Self::List(ListOp::Contains) => {
                query.where_list(target, ListOp::Contains, slice::from_ref(scalar(key, value)?))
            }
            Self::List(op) => query.where_list(target, op, list(key, value)?),
        };
        result.map_err(DispatchError::query)
    }
}

fn scalar<'v>(key: &FilterKey, value: &'v FilterValue) -> Result<&'v FilterValue, DispatchError> {
    if value.is_scalar() {
        Ok(value)
    } else {
        Err(DispatchError::invalid_value(key, "expected a scalar value"))
    }
}

fn list<'v>(key: &FilterKey, value: &'v FilterValue) -> Result<&'v [FilterValue], DispatchError> {
    value
        .as_list()
        .ok_or_else(|| DispatchError::invalid_value(key, "expected a list value"))
}

fn count(key: &FilterKey, value: &FilterValue) -> Result<u64, DispatchError> {
    value
        .as_count()
        .ok_or_else(|| DispatchError::invalid_value(key, "expected a non-negative integer"))
}

/// An immutable, compiled dispatch table.
///
/// Cheap to share across threads: rules hold only `Send + Sync` closures and
/// nothing is mutated after [`CompiledFilters::compile`] returns.
pub struct CompiledFilters<Q> {
    rules: Vec<DispatchRule<Q>>,
    definitions: FilterDefinitions,
    default_relation: String,
    resolver: RelationResolver<Q>,
}

impl<Q> CompiledFilters<Q>
where
    Q: FilterQuery + 'static,
{
    /// Compile `definitions` against `default_relation`, calling `resolver`
    /// before every field access.
    pub fn compile(
        definitions: &FilterDefinitions,
        default_relation: impl Into<String>,
        resolver: RelationResolver<Q>,
    ) -> Result<Self, ConfigurationError> {
        let policy = KeyPolicy::from_definitions(definitions)?;
        definitions.validate()?;
        let default_relation = default_relation.into();

        let mut rules = Vec::new();
        for kind in FilterKind::DISPATCH_ORDER {
            match kind {
                FilterKind::Limit if definitions.limit => {
                    rules.push(pagination_rule(kind, LIMIT_KEY, &policy, Q::limit));
                }
                FilterKind::Offset if definitions.offset => {
                    rules.push(pagination_rule(kind, OFFSET_KEY, &policy, Q::offset));
                }
                FilterKind::OrderBy if definitions.order_by => {
                    rules.push(compile_order_by(
                        definitions,
                        &default_relation,
                        &policy,
                        Arc::clone(&resolver),
                    ));
                }
                _ => {
                    let Some(clause) = Clause::for_kind(kind) else {
                        continue;
                    };
                    for entry in definitions.entries(kind) {
                        let field = entry.normalize(&default_relation);
                        rules.push(field_rule(kind, clause, field, &policy, Arc::clone(&resolver)));
                    }
                }
            }
        }

        tracing::debug!(
            rules = rules.len(),
            default_relation = %default_relation,
            "Compiled filter definitions"
        );

        Ok(Self {
            rules,
            definitions: definitions.clone(),
            default_relation,
            resolver,
        })
    }

    /// Compile with the identity resolver. Only safe when every non-default
    /// relation the definitions reference is joined by the caller.
    pub fn compile_without_resolver(
        definitions: &FilterDefinitions,
        default_relation: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        Self::compile(definitions, default_relation, resolver::identity())
    }

    /// Apply `filters`, failing on keys no rule matches.
    pub fn apply(&self, query: Q, filters: &FilterMap) -> Result<Q, DispatchError> {
        apply_filters(query, filters, &self.rules, &[], &Fallback::Error)
    }

    /// Apply `filters`, trying `custom` rules first and handing unmatched
    /// keys to `fallback`.
    pub fn apply_with(
        &self,
        query: Q,
        filters: &FilterMap,
        custom: &[DispatchRule<Q>],
        fallback: &Fallback<Q>,
    ) -> Result<Q, DispatchError> {
        apply_filters(query, filters, &self.rules, custom, fallback)
    }
}

impl<Q> CompiledFilters<Q> {
    pub fn rules(&self) -> &[DispatchRule<Q>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The definitions this table was compiled from.
    pub fn definitions(&self) -> &FilterDefinitions {
        &self.definitions
    }

    pub fn default_relation(&self) -> &str {
        &self.default_relation
    }

    pub fn resolver(&self) -> &RelationResolver<Q> {
        &self.resolver
    }
}

impl<Q> std::fmt::Debug for CompiledFilters<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledFilters")
            .field("default_relation", &self.default_relation)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

fn field_rule<Q>(
    kind: FilterKind,
    clause: Clause,
    field: FilterField,
    policy: &KeyPolicy,
    resolver: RelationResolver<Q>,
) -> DispatchRule<Q>
where
    Q: FilterQuery + 'static,
{
    let keys = policy.accepted_keys(&field.key);
    let target = field.target;
    DispatchRule::compiled(
        kind,
        keys,
        clause.list_only(),
        move |query: Q, key: &FilterKey, value: &FilterValue| {
            let query = resolver(query, &target.relation);
            clause.apply(query, &target, key, value)
        },
    )
}

fn pagination_rule<Q>(
    kind: FilterKind,
    name: &str,
    policy: &KeyPolicy,
    assign: fn(Q, u64) -> Result<Q, Q::Error>,
) -> DispatchRule<Q>
where
    Q: FilterQuery + 'static,
{
    DispatchRule::compiled(
        kind,
        policy.accepted_keys(name),
        false,
        move |query: Q, key: &FilterKey, value: &FilterValue| {
            assign(query, count(key, value)?).map_err(DispatchError::query)
        },
    )
}
