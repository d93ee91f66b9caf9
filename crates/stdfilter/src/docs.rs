//! Documentation generated from filter definitions.
//!
//! Rendering reads the same [`FilterDefinitions`] the compiler reads, so
//! documented filters and accepted filters cannot drift apart. `extras` lets
//! callers document filters they implement as custom rules.

use std::fmt::Write;

use crate::compiler::{LIMIT_KEY, OFFSET_KEY};
use crate::definitions::{FilterDefinition, FilterDefinitions, FilterKind};
use crate::order_by::ORDER_BY_KEY;
use crate::query::SortDirection;

/// Render markdown describing every filter enabled in `definitions` or
/// `extras`.
///
/// Sections appear in [`FilterKind::DOC_ORDER`] regardless of configuration
/// order; entries within a section are sorted by filter key. Identical input
/// yields byte-identical output.
pub fn generate_docs(definitions: &FilterDefinitions, extras: &FilterDefinitions) -> String {
    let mut sections = Vec::new();
    for kind in FilterKind::DOC_ORDER {
        let section = if kind.is_toggle() {
            (definitions.is_enabled(kind) || extras.is_enabled(kind)).then(|| toggle_section(kind))
        } else {
            let mut entries: Vec<&FilterDefinition> = definitions
                .entries(kind)
                .iter()
                .chain(extras.entries(kind))
                .collect();
            entries.sort_by(|a, b| a.key().cmp(b.key()));
            (!entries.is_empty()).then(|| field_section(kind, &entries))
        };
        sections.extend(section);
    }
    sections.join("\n")
}

fn heading(kind: FilterKind) -> &'static str {
    match kind {
        FilterKind::EqualTo => "Equal to",
        FilterKind::EqualToAny => "Equal to any",
        FilterKind::SmallerThan => "Smaller than",
        FilterKind::GreaterOrEqual => "Greater than or equal to",
        FilterKind::StringStartsWith => "String starts with",
        FilterKind::StringContains => "String contains",
        FilterKind::ListContains => "List contains",
        FilterKind::ListContainsAny => "List contains any",
        FilterKind::ListContainsAll => "List contains all",
        FilterKind::OrderBy => "Order by",
        FilterKind::Limit => "Limit",
        FilterKind::Offset => "Offset",
    }
}

fn description(kind: FilterKind) -> &'static str {
    match kind {
        FilterKind::EqualTo => "Keeps rows where the field equals the given value.",
        FilterKind::EqualToAny => {
            "Keeps rows where the field equals any value of the given list. Requires a list."
        }
        FilterKind::SmallerThan => "Keeps rows where the field is smaller than the given value.",
        FilterKind::GreaterOrEqual => {
            "Keeps rows where the field is greater than or equal to the given value."
        }
        FilterKind::StringStartsWith => {
            "Keeps rows where the field starts with the given string, ignoring case."
        }
        FilterKind::StringContains => {
            "Keeps rows where the field contains the given string, ignoring case."
        }
        FilterKind::ListContains => "Keeps rows where the list field contains the given value.",
        FilterKind::ListContainsAny => {
            "Keeps rows where the list field contains any value of the given list. Requires a list."
        }
        FilterKind::ListContainsAll => {
            "Keeps rows where the list field contains every value of the given list. Requires a list."
        }
        FilterKind::OrderBy => {
            "Sorts by a list of fields. Each entry is a field name (ascending) or a \
             `direction: field` pair; `equal to` filter keys may be used as field names. \
             Entries sort in the order given."
        }
        FilterKind::Limit => "Returns at most the given number of rows.",
        FilterKind::Offset => "Skips the given number of rows.",
    }
}

fn field_section(kind: FilterKind, entries: &[&FilterDefinition]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "### {}\n", heading(kind));
    let _ = writeln!(out, "{}\n", description(kind));
    for entry in entries {
        match entry.documented_field() {
            Some(field) => {
                let _ = writeln!(out, "* `{}` (`{field}`)", entry.key());
            }
            None => {
                let _ = writeln!(out, "* `{}`", entry.key());
            }
        }
    }
    out
}

fn toggle_section(kind: FilterKind) -> String {
    let key = match kind {
        FilterKind::Limit => LIMIT_KEY,
        FilterKind::Offset => OFFSET_KEY,
        _ => ORDER_BY_KEY,
    };
    let mut out = String::new();
    let _ = writeln!(out, "### {}\n", heading(kind));
    let _ = writeln!(out, "{}\n", description(kind));
    let _ = writeln!(out, "* `{key}`");
    if kind == FilterKind::OrderBy {
        let directions: Vec<String> = SortDirection::ALL
            .iter()
            .map(|d| format!("`{d}`"))
            .collect();
        let _ = writeln!(out, "\nDirections: {}.", directions.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definitions() -> FilterDefinitions {
        FilterDefinitions::new()
            .with_atom_keys()
            .with_limit()
            .with(FilterKind::EqualTo, ["username"])
            .with(FilterKind::EqualTo, [("role_name", ("role", "name"))])
            .with(FilterKind::EqualTo, [("email", "email_address")])
            .with(FilterKind::StringContains, ["bio"])
    }

    #[test]
    fn test_render_sections() {
        let docs = generate_docs(&definitions(), &FilterDefinitions::new());
        let expected = "\
### Equal to

Keeps rows where the field equals the given value.

* `email` (`email_address`)
* `role_name` (`role.name`)
* `username`

### String contains

Keeps rows where the field contains the given string, ignoring case.

* `bio`

### Limit

Returns at most the given number of rows.

* `limit`
";
        assert_eq!(docs, expected);
    }

    #[test]
    fn test_deterministic_and_independent_of_list_order() {
        let a = definitions();
        let b = FilterDefinitions::new()
            .with_limit()
            .with(FilterKind::StringContains, ["bio"])
            .with(FilterKind::EqualTo, [("email", "email_address")])
            .with(FilterKind::EqualTo, [("role_name", ("role", "name"))])
            .with(FilterKind::EqualTo, ["username"])
            .with_atom_keys();
        let none = FilterDefinitions::new();
        assert_eq!(generate_docs(&a, &none), generate_docs(&a, &none));
        assert_eq!(generate_docs(&a, &none), generate_docs(&b, &none));
    }

    #[test]
    fn test_extras_merge_into_sections() {
        let extras = FilterDefinitions::new()
            .with_order_by()
            .with(FilterKind::EqualTo, ["age_bucket"])
            .with(FilterKind::ListContainsAny, ["tags"]);
        let docs = generate_docs(&definitions(), &extras);

        assert!(docs.contains("* `age_bucket`\n* `email` (`email_address`)"));
        assert!(docs.contains("### List contains any"));
        assert!(docs.contains("### Order by"));
        assert!(docs.contains("`desc_nulls_last`"));
        let order_by = docs.find("### Order by").unwrap();
        let limit = docs.find("### Limit").unwrap();
        assert!(order_by < limit);
    }

    #[test]
    fn test_empty_definitions_render_nothing() {
        let docs = generate_docs(&FilterDefinitions::new(), &FilterDefinitions::new());
        assert!(docs.is_empty());
    }
}
