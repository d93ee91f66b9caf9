//! Recording query double shared by the unit tests.

use thiserror::Error;

use crate::definitions::FieldRef;
use crate::query::{Comparison, FilterQuery, ListOp, Pattern, SortDirection};
use crate::value::FilterValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Equal(FieldRef, FilterValue),
    EqualAny(FieldRef, Vec<FilterValue>),
    Compare(FieldRef, Comparison, FilterValue),
    Pattern(FieldRef, Pattern, String),
    List(FieldRef, ListOp, Vec<FilterValue>),
}

#[derive(Debug, Error)]
#[error("field {0} rejected")]
pub struct Rejected(pub String);

#[derive(Debug, Clone, PartialEq)]
pub struct RecordingQuery {
    pub base: String,
    pub joins: Vec<String>,
    pub ops: Vec<Op>,
    pub sort: Vec<(SortDirection, FieldRef)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub reject_field: Option<String>,
}

impl RecordingQuery {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            joins: Vec::new(),
            ops: Vec::new(),
            sort: Vec::new(),
            limit: None,
            offset: None,
            reject_field: None,
        }
    }

    pub fn rejecting(mut self, field: &str) -> Self {
        self.reject_field = Some(field.to_string());
        self
    }

    pub fn join(mut self, relation: &str) -> Self {
        self.joins.push(relation.to_string());
        self
    }

    fn check(&self, field: &FieldRef) -> Result<(), Rejected> {
        match &self.reject_field {
            Some(rejected) if *rejected == field.field => Err(Rejected(field.to_string())),
            _ => Ok(()),
        }
    }

    fn push(mut self, op: Op) -> Self {
        self.ops.push(op);
        self
    }
}

impl FilterQuery for RecordingQuery {
    type Error = Rejected;

    fn where_equal(self, field: &FieldRef, value: &FilterValue) -> Result<Self, Self::Error> {
        self.check(field)?;
        Ok(self.push(Op::Equal(field.clone(), value.clone())))
    }

    fn where_equal_any(
        self,
        field: &FieldRef,
        values: &[FilterValue],
    ) -> Result<Self, Self::Error> {
        self.check(field)?;
        Ok(self.push(Op::EqualAny(field.clone(), values.to_vec())))
    }

    fn where_compare(
        self,
        field: &FieldRef,
        op: Comparison,
        value: &FilterValue,
    ) -> Result<Self, Self::Error> {
        self.check(field)?;
        Ok(self.push(Op::Compare(field.clone(), op, value.clone())))
    }

    fn where_pattern(
        self,
        field: &FieldRef,
        pattern: Pattern,
        text: &str,
    ) -> Result<Self, Self::Error> {
        self.check(field)?;
        Ok(self.push(Op::Pattern(field.clone(), pattern, text.to_string())))
    }

    fn where_list(
        self,
        field: &FieldRef,
        op: ListOp,
        values: &[FilterValue],
    ) -> Result<Self, Self::Error> {
        self.check(field)?;
        Ok(self.push(Op::List(field.clone(), op, values.to_vec())))
    }

    fn order_by(mut self, direction: SortDirection, field: &FieldRef) -> Result<Self, Self::Error> {
        self.check(field)?;
        self.sort.push((direction, field.clone()));
        Ok(self)
    }

    fn limit(mut self, count: u64) -> Result<Self, Self::Error> {
        self.limit = Some(count);
        Ok(self)
    }

    fn offset(mut self, count: u64) -> Result<Self, Self::Error> {
        self.offset = Some(count);
        Ok(self)
    }

    fn has_relation(&self, alias: &str) -> bool {
        alias == self.base || self.joins.iter().any(|j| j == alias)
    }
}
