//! [`FilterQuery`] for [`SqlQuery`].
//!
//! Field identifiers are validated as soon as a filter touches them, so an
//! invalid column name fails the dispatch rather than the later `build()`.
//! Unknown relations are left for `build()` to report, since a resolver may
//! still join them.

use stdfilter::{Comparison, FieldRef, FilterQuery, FilterValue, ListOp, Pattern, SortDirection};

use crate::builder::{
    Condition, Operator, SortSpec, SqlBuilderError, SqlQuery, SqlValue, escape_like_pattern,
    validate_identifier,
};

fn checked(field: &FieldRef) -> Result<FieldRef, SqlBuilderError> {
    validate_identifier(&field.relation)?;
    validate_identifier(&field.field)?;
    Ok(field.clone())
}

impl FilterQuery for SqlQuery {
    type Error = SqlBuilderError;

    fn where_equal(self, field: &FieldRef, value: &FilterValue) -> Result<Self, Self::Error> {
        Ok(self.where_condition(Condition::Compare {
            field: checked(field)?,
            op: Operator::Eq,
            value: SqlValue::try_from(value)?,
        }))
    }

    fn where_equal_any(self, field: &FieldRef, values: &[FilterValue]) -> Result<Self, Self::Error> {
        Ok(self.where_condition(Condition::AnyOf {
            field: checked(field)?,
            values: SqlValue::array(values)?,
        }))
    }

    fn where_compare(
        self,
        field: &FieldRef,
        op: Comparison,
        value: &FilterValue,
    ) -> Result<Self, Self::Error> {
        let op = match op {
            Comparison::SmallerThan => Operator::Lt,
            Comparison::GreaterOrEqual => Operator::Ge,
        };
        Ok(self.where_condition(Condition::Compare {
            field: checked(field)?,
            op,
            value: SqlValue::try_from(value)?,
        }))
    }

    fn where_pattern(self, field: &FieldRef, pattern: Pattern, text: &str) -> Result<Self, Self::Error> {
        let escaped = escape_like_pattern(text);
        let pattern = match pattern {
            Pattern::StartsWith => format!("{escaped}%"),
            Pattern::Contains => format!("%{escaped}%"),
        };
        Ok(self.where_condition(Condition::ILike {
            field: checked(field)?,
            pattern,
        }))
    }

    fn where_list(
        self,
        field: &FieldRef,
        op: ListOp,
        values: &[FilterValue],
    ) -> Result<Self, Self::Error> {
        let op = match op {
            ListOp::Contains | ListOp::ContainsAll => Operator::Contains,
            ListOp::ContainsAny => Operator::Overlaps,
        };
        Ok(self.where_condition(Condition::Array {
            field: checked(field)?,
            op,
            values: SqlValue::array(values)?,
        }))
    }

    fn order_by(self, direction: SortDirection, field: &FieldRef) -> Result<Self, Self::Error> {
        Ok(self.sort_by(SortSpec::new(direction, checked(field)?)))
    }

    fn limit(self, count: u64) -> Result<Self, Self::Error> {
        Ok(self.set_limit(count))
    }

    fn offset(self, count: u64) -> Result<Self, Self::Error> {
        Ok(self.set_offset(count))
    }

    fn has_relation(&self, alias: &str) -> bool {
        self.is_addressable(alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_escapes_wildcards() {
        let query = SqlQuery::new("users")
            .where_pattern(&FieldRef::new("users", "name"), Pattern::Contains, "50%_off")
            .unwrap();
        assert_eq!(
            query.conditions(),
            &[Condition::ILike {
                field: FieldRef::new("users", "name"),
                pattern: "%50\\%\\_off%".into(),
            }]
        );
    }

    #[test]
    fn test_list_ops_map_to_array_operators() {
        let tags = FieldRef::new("users", "tags");
        let one = [FilterValue::from("a")];
        let query = SqlQuery::new("users")
            .where_list(&tags, ListOp::Contains, &one)
            .and_then(|q| q.where_list(&tags, ListOp::ContainsAny, &one))
            .and_then(|q| q.where_list(&tags, ListOp::ContainsAll, &one))
            .unwrap();
        let built = query.build().unwrap();
        assert!(built.sql.contains(r#"("users"."tags" @> $1) AND ("users"."tags" && $2) AND ("users"."tags" @> $3)"#));
        assert_eq!(built.params[0], SqlValue::Array(vec![SqlValue::Text("a".into())]));
    }

    #[test]
    fn test_invalid_field_fails_immediately() {
        let result = SqlQuery::new("users").where_equal(
            &FieldRef::new("users", "name\" OR 1=1 --"),
            &FilterValue::from("x"),
        );
        assert!(matches!(result, Err(SqlBuilderError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_limit_and_offset_assign() {
        let query = SqlQuery::new("users")
            .limit(10)
            .and_then(|q| q.limit(5))
            .and_then(|q| q.offset(3))
            .unwrap();
        assert_eq!(query.pagination().limit, Some(5));
        assert_eq!(query.pagination().offset, Some(3));
    }

    #[test]
    fn test_has_relation_tracks_base_alias() {
        let query = SqlQuery::new("users").with_alias("u");
        assert!(query.has_relation("u"));
        assert!(!query.has_relation("users"));
    }
}
