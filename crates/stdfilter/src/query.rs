//! The query primitive compiled filters drive.
//!
//! Any query representation can be filtered as long as it implements
//! [`FilterQuery`]. Operations consume the query and return the narrowed
//! version; nothing executes against a live data source.

use std::fmt;
use std::str::FromStr;

use crate::definitions::FieldRef;
use crate::value::FilterValue;

/// Ordered comparisons supported by the standard filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `field < value`
    SmallerThan,
    /// `field >= value`
    GreaterOrEqual,
}

/// Case-insensitive string patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    StartsWith,
    Contains,
}

/// Set comparisons against an array-valued field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOp {
    /// The single given value is an element of the field.
    Contains,
    /// The field shares at least one element with the given values.
    ContainsAny,
    /// Every given value is an element of the field.
    ContainsAll,
}

/// Sort direction, including explicit nulls ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
    AscNullsFirst,
    AscNullsLast,
    DescNullsFirst,
    DescNullsLast,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
            Self::AscNullsFirst => "asc_nulls_first",
            Self::AscNullsLast => "asc_nulls_last",
            Self::DescNullsFirst => "desc_nulls_first",
            Self::DescNullsLast => "desc_nulls_last",
        }
    }

    pub const ALL: [SortDirection; 6] = [
        Self::Asc,
        Self::Desc,
        Self::AscNullsFirst,
        Self::AscNullsLast,
        Self::DescNullsFirst,
        Self::DescNullsLast,
    ];
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("unknown sort direction '{s}'"))
    }
}

/// Composable, value-semantic query operations.
///
/// Every restriction is conjunctive with the ones already present. Sort keys
/// accumulate in call order. `limit` and `offset` assign: the last call wins.
pub trait FilterQuery: Sized {
    type Error: std::error::Error + Send + Sync + 'static;

    fn where_equal(self, field: &FieldRef, value: &FilterValue) -> Result<Self, Self::Error>;

    fn where_equal_any(self, field: &FieldRef, values: &[FilterValue])
    -> Result<Self, Self::Error>;

    fn where_compare(
        self,
        field: &FieldRef,
        op: Comparison,
        value: &FilterValue,
    ) -> Result<Self, Self::Error>;

    /// Case-insensitive pattern match. `text` is the raw user text; escaping
    /// any wildcard syntax is up to the implementation.
    fn where_pattern(self, field: &FieldRef, pattern: Pattern, text: &str)
    -> Result<Self, Self::Error>;

    fn where_list(
        self,
        field: &FieldRef,
        op: ListOp,
        values: &[FilterValue],
    ) -> Result<Self, Self::Error>;

    fn order_by(self, direction: SortDirection, field: &FieldRef) -> Result<Self, Self::Error>;

    fn limit(self, count: u64) -> Result<Self, Self::Error>;

    fn offset(self, count: u64) -> Result<Self, Self::Error>;

    /// Whether `alias` is already addressable in this query, either as the
    /// base relation or as a joined one.
    fn has_relation(&self, alias: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!("asc".parse::<SortDirection>(), Ok(SortDirection::Asc));
        assert_eq!(
            "desc_nulls_last".parse::<SortDirection>(),
            Ok(SortDirection::DescNullsLast)
        );
        assert!("sideways".parse::<SortDirection>().is_err());
    }
}
