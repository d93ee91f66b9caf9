//! Filter definition model.
//!
//! A [`FilterDefinitions`] value is the static configuration an application
//! authors once: which key-type policy applies, which pagination and sort
//! toggles are on, and for every filter kind the ordered list of entries it
//! accepts. Each entry is one of three shapes which all normalize to a
//! canonical `(key, relation, field)` triple:
//!
//! | Shape | Normalized |
//! |---|---|
//! | `"address"` | `(address, <default>, address)` |
//! | `["username", "name"]` | `(username, <default>, name)` |
//! | `["role_name", ["role", "name"]]` | `(role_name, role, name)` |
//!
//! In configuration files an entry may also be written as a table with
//! `key` and optional `field` and `relation`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::ConfigurationError;

/// A column addressed through a relation alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub relation: String,
    pub field: String,
}

impl FieldRef {
    pub fn new(relation: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.relation, self.field)
    }
}

/// A normalized definition entry: the filter key and the column it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterField {
    pub key: String,
    pub target: FieldRef,
}

/// One configured mapping from a filter key onto a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDefinition", into = "RawDefinition")]
pub enum FilterDefinition {
    /// Key and field share the name; the field lives on the default relation.
    Bare(String),
    /// Key differs from the field name; the field lives on the default relation.
    Aliased { key: String, field: String },
    /// Field lives on a named relation.
    Qualified {
        key: String,
        relation: String,
        field: String,
    },
}

impl FilterDefinition {
    pub fn bare(key: impl Into<String>) -> Self {
        Self::Bare(key.into())
    }

    pub fn aliased(key: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Aliased {
            key: key.into(),
            field: field.into(),
        }
    }

    pub fn qualified(
        key: impl Into<String>,
        relation: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::Qualified {
            key: key.into(),
            relation: relation.into(),
            field: field.into(),
        }
    }

    /// The filter key callers use to request this filter.
    pub fn key(&self) -> &str {
        match self {
            Self::Bare(key) | Self::Aliased { key, .. } | Self::Qualified { key, .. } => key,
        }
    }

    /// Normalize into a canonical `(key, relation, field)` triple.
    pub fn normalize(&self, default_relation: &str) -> FilterField {
        let (key, relation, field) = match self {
            Self::Bare(key) => (key, default_relation, key),
            Self::Aliased { key, field } => (key, default_relation, field),
            Self::Qualified {
                key,
                relation,
                field,
            } => (key, relation.as_str(), field),
        };
        FilterField {
            key: key.clone(),
            target: FieldRef::new(relation, field.clone()),
        }
    }

    /// Qualified field name used in generated documentation, if it differs
    /// from the key.
    pub fn documented_field(&self) -> Option<String> {
        match self {
            Self::Bare(_) => None,
            Self::Aliased { field, .. } => Some(field.clone()),
            Self::Qualified {
                relation, field, ..
            } => Some(format!("{relation}.{field}")),
        }
    }
}

impl From<&str> for FilterDefinition {
    fn from(key: &str) -> Self {
        Self::bare(key)
    }
}

impl From<(&str, &str)> for FilterDefinition {
    fn from((key, field): (&str, &str)) -> Self {
        Self::aliased(key, field)
    }
}

impl From<(&str, (&str, &str))> for FilterDefinition {
    fn from((key, (relation, field)): (&str, (&str, &str))) -> Self {
        Self::qualified(key, relation, field)
    }
}

/// Serialized shape of a definition entry in TOML/JSON configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDefinition {
    Bare(String),
    Aliased(String, String),
    Qualified(String, (String, String)),
    /// `{ key = "role_name", relation = "role", field = "name" }`
    Table(BTreeMap<String, String>),
}

impl TryFrom<RawDefinition> for FilterDefinition {
    type Error = String;

    fn try_from(raw: RawDefinition) -> Result<Self, Self::Error> {
        Ok(match raw {
            RawDefinition::Bare(key) => Self::Bare(key),
            RawDefinition::Aliased(key, field) => Self::Aliased { key, field },
            RawDefinition::Qualified(key, (relation, field)) => Self::Qualified {
                key,
                relation,
                field,
            },
            RawDefinition::Table(mut table) => {
                let key = table
                    .remove("key")
                    .ok_or_else(|| "filter entry table is missing `key`".to_string())?;
                let field = table.remove("field");
                let relation = table.remove("relation");
                if let Some(unknown) = table.keys().next() {
                    return Err(format!("unknown field `{unknown}` in filter entry table"));
                }
                match (relation, field) {
                    (Some(relation), field) => {
                        let field = field.unwrap_or_else(|| key.clone());
                        Self::Qualified {
                            key,
                            relation,
                            field,
                        }
                    }
                    (None, Some(field)) => Self::Aliased { key, field },
                    (None, None) => Self::Bare(key),
                }
            }
        })
    }
}

impl From<FilterDefinition> for RawDefinition {
    fn from(definition: FilterDefinition) -> Self {
        match definition {
            FilterDefinition::Bare(key) => Self::Bare(key),
            FilterDefinition::Aliased { key, field } => Self::Aliased(key, field),
            FilterDefinition::Qualified {
                key,
                relation,
                field,
            } => Self::Qualified(key, (relation, field)),
        }
    }
}

/// Every kind of standard filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Limit,
    Offset,
    OrderBy,
    EqualTo,
    EqualToAny,
    SmallerThan,
    GreaterOrEqual,
    StringStartsWith,
    StringContains,
    ListContains,
    ListContainsAny,
    ListContainsAll,
}

impl FilterKind {
    /// Priority order of compiled rules. The first matching rule wins.
    pub const DISPATCH_ORDER: [FilterKind; 12] = [
        Self::Limit,
        Self::Offset,
        Self::OrderBy,
        Self::EqualToAny,
        Self::EqualTo,
        Self::StringStartsWith,
        Self::StringContains,
        Self::ListContainsAny,
        Self::ListContainsAll,
        Self::ListContains,
        Self::SmallerThan,
        Self::GreaterOrEqual,
    ];

    /// Section order of generated documentation.
    pub const DOC_ORDER: [FilterKind; 12] = [
        Self::EqualTo,
        Self::EqualToAny,
        Self::SmallerThan,
        Self::GreaterOrEqual,
        Self::StringStartsWith,
        Self::StringContains,
        Self::ListContains,
        Self::ListContainsAny,
        Self::ListContainsAll,
        Self::OrderBy,
        Self::Limit,
        Self::Offset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Limit => "limit",
            Self::Offset => "offset",
            Self::OrderBy => "order_by",
            Self::EqualTo => "equal_to",
            Self::EqualToAny => "equal_to_any",
            Self::SmallerThan => "smaller_than",
            Self::GreaterOrEqual => "greater_or_equal",
            Self::StringStartsWith => "string_starts_with",
            Self::StringContains => "string_contains",
            Self::ListContains => "list_contains",
            Self::ListContainsAny => "list_contains_any",
            Self::ListContainsAll => "list_contains_all",
        }
    }

    /// Kinds switched on by a boolean rather than a list of entries.
    pub fn is_toggle(self) -> bool {
        matches!(self, Self::Limit | Self::Offset | Self::OrderBy)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full static filter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterDefinitions {
    /// Accept native (atom) filter keys.
    pub atom_keys: bool,
    /// Accept textual filter keys.
    pub string_keys: bool,
    pub limit: bool,
    pub offset: bool,
    pub order_by: bool,
    pub equal_to: Vec<FilterDefinition>,
    pub equal_to_any: Vec<FilterDefinition>,
    pub smaller_than: Vec<FilterDefinition>,
    pub greater_or_equal: Vec<FilterDefinition>,
    pub string_starts_with: Vec<FilterDefinition>,
    pub string_contains: Vec<FilterDefinition>,
    pub list_contains: Vec<FilterDefinition>,
    pub list_contains_any: Vec<FilterDefinition>,
    pub list_contains_all: Vec<FilterDefinition>,
}

impl FilterDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_atom_keys(mut self) -> Self {
        self.atom_keys = true;
        self
    }

    #[must_use]
    pub fn with_string_keys(mut self) -> Self {
        self.string_keys = true;
        self
    }

    #[must_use]
    pub fn with_limit(mut self) -> Self {
        self.limit = true;
        self
    }

    #[must_use]
    pub fn with_offset(mut self) -> Self {
        self.offset = true;
        self
    }

    #[must_use]
    pub fn with_order_by(mut self) -> Self {
        self.order_by = true;
        self
    }

    /// Append entries to a kind's definition list.
    ///
    /// Toggle kinds (`limit`, `offset`, `order_by`) carry no entries; passing
    /// one of them switches the toggle on and ignores `entries`.
    #[must_use]
    pub fn with<I, D>(mut self, kind: FilterKind, entries: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<FilterDefinition>,
    {
        match self.entries_mut(kind) {
            Some(list) => list.extend(entries.into_iter().map(Into::into)),
            None => self.set_toggle(kind, true),
        }
        self
    }

    /// Definition entries of a kind. Empty for toggle kinds.
    pub fn entries(&self, kind: FilterKind) -> &[FilterDefinition] {
        match kind {
            FilterKind::EqualTo => &self.equal_to,
            FilterKind::EqualToAny => &self.equal_to_any,
            FilterKind::SmallerThan => &self.smaller_than,
            FilterKind::GreaterOrEqual => &self.greater_or_equal,
            FilterKind::StringStartsWith => &self.string_starts_with,
            FilterKind::StringContains => &self.string_contains,
            FilterKind::ListContains => &self.list_contains,
            FilterKind::ListContainsAny => &self.list_contains_any,
            FilterKind::ListContainsAll => &self.list_contains_all,
            FilterKind::Limit | FilterKind::Offset | FilterKind::OrderBy => &[],
        }
    }

    fn entries_mut(&mut self, kind: FilterKind) -> Option<&mut Vec<FilterDefinition>> {
        match kind {
            FilterKind::EqualTo => Some(&mut self.equal_to),
            FilterKind::EqualToAny => Some(&mut self.equal_to_any),
            FilterKind::SmallerThan => Some(&mut self.smaller_than),
            FilterKind::GreaterOrEqual => Some(&mut self.greater_or_equal),
            FilterKind::StringStartsWith => Some(&mut self.string_starts_with),
            FilterKind::StringContains => Some(&mut self.string_contains),
            FilterKind::ListContains => Some(&mut self.list_contains),
            FilterKind::ListContainsAny => Some(&mut self.list_contains_any),
            FilterKind::ListContainsAll => Some(&mut self.list_contains_all),
            FilterKind::Limit | FilterKind::Offset | FilterKind::OrderBy => None,
        }
    }

    /// Whether a kind contributes anything: a toggle that is on, or a
    /// non-empty entry list.
    pub fn is_enabled(&self, kind: FilterKind) -> bool {
        match kind {
            FilterKind::Limit => self.limit,
            FilterKind::Offset => self.offset,
            FilterKind::OrderBy => self.order_by,
            other => !self.entries(other).is_empty(),
        }
    }

    fn set_toggle(&mut self, kind: FilterKind, on: bool) {
        match kind {
            FilterKind::Limit => self.limit = on,
            FilterKind::Offset => self.offset = on,
            FilterKind::OrderBy => self.order_by = on,
            _ => {}
        }
    }

    /// Check that keys are unique within each kind.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for kind in FilterKind::DISPATCH_ORDER {
            let mut seen = HashSet::new();
            for entry in self.entries(kind) {
                if !seen.insert(entry.key()) {
                    return Err(ConfigurationError::DuplicateKey {
                        kind,
                        key: entry.key().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Alias map derived from `equal_to`: filter key to the column it targets.
    pub fn equal_to_aliases(&self, default_relation: &str) -> Vec<FilterField> {
        self.equal_to
            .iter()
            .map(|entry| entry.normalize(default_relation))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_shapes() {
        let bare = FilterDefinition::bare("address").normalize("users");
        assert_eq!(bare.key, "address");
        assert_eq!(bare.target, FieldRef::new("users", "address"));

        let aliased = FilterDefinition::aliased("username", "name").normalize("users");
        assert_eq!(aliased.key, "username");
        assert_eq!(aliased.target, FieldRef::new("users", "name"));

        let qualified = FilterDefinition::qualified("role_name", "role", "name").normalize("users");
        assert_eq!(qualified.key, "role_name");
        assert_eq!(qualified.target, FieldRef::new("role", "name"));
    }

    #[test]
    fn test_tuple_conversions() {
        assert_eq!(FilterDefinition::from("a"), FilterDefinition::bare("a"));
        assert_eq!(
            FilterDefinition::from(("a", "b")),
            FilterDefinition::aliased("a", "b")
        );
        assert_eq!(
            FilterDefinition::from(("a", ("r", "b"))),
            FilterDefinition::qualified("a", "r", "b")
        );
    }

    #[test]
    fn test_deserialize_all_shapes() {
        let entries: Vec<FilterDefinition> =
            serde_json::from_str(r#"["address", ["username", "name"], ["role_name", ["role", "name"]]]"#)
                .unwrap();
        assert_eq!(
            entries,
            vec![
                FilterDefinition::bare("address"),
                FilterDefinition::aliased("username", "name"),
                FilterDefinition::qualified("role_name", "role", "name"),
            ]
        );
    }

    #[test]
    fn test_deserialize_rejects_malformed_entry() {
        let result: Result<Vec<FilterDefinition>, _> = serde_json::from_str(r#"[["a", 1]]"#);
        assert!(result.is_err());

        let result: Result<Vec<FilterDefinition>, _> = serde_json::from_str(r#"[["a", "b", "c"]]"#);
        assert!(result.is_err());

        let result: Result<Vec<FilterDefinition>, _> =
            serde_json::from_str(r#"[{"key": "a", "table": "b"}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_table_entries() {
        let entries: Vec<FilterDefinition> = serde_json::from_str(
            r#"[{"key": "address"}, {"key": "username", "field": "name"}, {"key": "role_name", "relation": "role", "field": "name"}]"#,
        )
        .unwrap();
        assert_eq!(
            entries,
            vec![
                FilterDefinition::bare("address"),
                FilterDefinition::aliased("username", "name"),
                FilterDefinition::qualified("role_name", "role", "name"),
            ]
        );
    }

    #[test]
    fn test_definitions_reject_unknown_fields() {
        let result: Result<FilterDefinitions, _> =
            serde_json::from_str(r#"{"atom_keys": true, "equals": ["a"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_toggles_and_entries() {
        let defs = FilterDefinitions::new()
            .with_atom_keys()
            .with(FilterKind::EqualTo, ["address"])
            .with(FilterKind::OrderBy, Vec::<FilterDefinition>::new());

        assert!(defs.order_by);
        assert!(defs.is_enabled(FilterKind::EqualTo));
        assert!(!defs.is_enabled(FilterKind::Limit));
        assert!(defs.entries(FilterKind::OrderBy).is_empty());
    }

    #[test]
    fn test_validate_duplicate_key_within_kind() {
        let defs = FilterDefinitions::new()
            .with_atom_keys()
            .with(FilterKind::EqualTo, ["name"])
            .with(FilterKind::EqualTo, [("name", "other")]);

        let err = defs.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::DuplicateKey { kind: FilterKind::EqualTo, ref key } if key == "name"
        ));
    }

    #[test]
    fn test_validate_allows_same_key_across_kinds() {
        let defs = FilterDefinitions::new()
            .with_atom_keys()
            .with(FilterKind::EqualTo, ["name"])
            .with(FilterKind::EqualToAny, ["name"]);

        assert!(defs.validate().is_ok());
    }

    #[test]
    fn test_dispatch_and_doc_orders_cover_every_kind() {
        let dispatch: HashSet<_> = FilterKind::DISPATCH_ORDER.into_iter().collect();
        let docs: HashSet<_> = FilterKind::DOC_ORDER.into_iter().collect();
        assert_eq!(dispatch.len(), 12);
        assert_eq!(dispatch, docs);
    }
}
