//! SQL builder for filtered PostgreSQL `SELECT` queries.
//!
//! Conditions, sort keys and pagination accumulate on a [`SqlQuery`] value;
//! [`SqlQuery::build`] renders them into a [`BuiltQuery`] with numbered bind
//! parameters (`$1`, `$2`, ...). User input never reaches the SQL text.

use std::fmt;

use stdfilter::{FieldRef, FilterValue, SortDirection};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;

/// Errors that can occur during SQL building.
#[derive(Debug, Error)]
pub enum SqlBuilderError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid search value: {0}")]
    InvalidSearchValue(String),

    #[error("Unknown relation '{relation}': not the base table and never joined")]
    UnknownRelation { relation: String },

    #[error("Query too complex: {0}")]
    QueryTooComplex(String),
}

/// Maximum number of conditions allowed to prevent DoS
const MAX_CONDITIONS: usize = 100;

/// Maximum number of JOINs allowed
const MAX_JOINS: usize = 10;

/// Validate an identifier (table, column, alias).
///
/// Only allows ASCII alphanumeric characters and underscores.
pub fn validate_identifier(name: &str) -> Result<(), SqlBuilderError> {
    if name.is_empty() {
        return Err(SqlBuilderError::InvalidIdentifier(
            "Empty identifier".to_string(),
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SqlBuilderError::InvalidIdentifier(name.to_string()));
    }

    Ok(())
}

/// Escape a PostgreSQL identifier.
pub fn escape_identifier(name: &str) -> Result<String, SqlBuilderError> {
    validate_identifier(name)?;
    Ok(format!("\"{name}\""))
}

/// Escape `LIKE` wildcards so user text matches literally.
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// `"relation"."field"`
fn column(field: &FieldRef) -> Result<String, SqlBuilderError> {
    Ok(format!(
        "{}.{}",
        escape_identifier(&field.relation)?,
        escape_identifier(&field.field)?
    ))
}

/// Comparison operators for conditions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operator {
    /// Equal (=)
    Eq,
    /// Less than (<)
    Lt,
    /// Greater than or equal (>=)
    Ge,
    /// Case-insensitive LIKE
    ILike,
    /// Array contains (@>)
    Contains,
    /// Array overlaps (&&)
    Overlaps,
}

impl Operator {
    /// Get the SQL operator string.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::ILike => "ILIKE",
            Self::Contains => "@>",
            Self::Overlaps => "&&",
        }
    }
}

/// SQL value types for parameterized queries.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(time::Date),
    Timestamp(time::OffsetDateTime),
    Array(Vec<SqlValue>),
    Null,
}

impl SqlValue {
    /// Get the value as a string for display/debugging.
    pub fn as_display_str(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Date(d) => d.to_string(),
            Self::Timestamp(ts) => ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string()),
            Self::Array(items) => {
                let items: Vec<String> = items.iter().map(Self::as_display_str).collect();
                format!("{{{}}}", items.join(","))
            }
            Self::Null => "NULL".to_string(),
        }
    }

    /// Collect a filter list into an array parameter.
    pub fn array(values: &[FilterValue]) -> Result<Self, SqlBuilderError> {
        values
            .iter()
            .map(Self::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Array)
    }
}

impl TryFrom<&FilterValue> for SqlValue {
    type Error = SqlBuilderError;

    fn try_from(value: &FilterValue) -> Result<Self, Self::Error> {
        Ok(match value {
            FilterValue::Null => Self::Null,
            FilterValue::Bool(b) => Self::Boolean(*b),
            FilterValue::Integer(i) => Self::Integer(*i),
            FilterValue::Float(f) => Self::Float(*f),
            FilterValue::Text(s) => Self::Text(s.clone()),
            FilterValue::Date(d) => Self::Date(*d),
            FilterValue::Timestamp(ts) => Self::Timestamp(*ts),
            FilterValue::List(items) => Self::array(items)?,
            FilterValue::Order(directive) => {
                return Err(SqlBuilderError::InvalidSearchValue(format!(
                    "sort directive '{directive}' cannot be bound as a value"
                )));
            }
        })
    }
}

/// A single `WHERE` restriction. All conditions of a query are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column op $n`
    Compare {
        field: FieldRef,
        op: Operator,
        value: SqlValue,
    },
    /// `column = ANY($n)`
    AnyOf { field: FieldRef, values: SqlValue },
    /// `column ILIKE $n`, with the pattern already escaped.
    ILike { field: FieldRef, pattern: String },
    /// `column op $n` against an array column.
    Array {
        field: FieldRef,
        op: Operator,
        values: SqlValue,
    },
}

impl Condition {
    pub fn field(&self) -> &FieldRef {
        match self {
            Self::Compare { field, .. }
            | Self::AnyOf { field, .. }
            | Self::ILike { field, .. }
            | Self::Array { field, .. } => field,
        }
    }

    fn to_sql(&self, params: &mut Vec<SqlValue>) -> Result<String, SqlBuilderError> {
        let column = column(self.field())?;
        let (op, value) = match self {
            Self::Compare { op, value, .. } => (op.as_sql(), value.clone()),
            Self::AnyOf { values, .. } => {
                params.push(values.clone());
                return Ok(format!("({column} = ANY(${}))", params.len()));
            }
            Self::ILike { pattern, .. } => {
                (Operator::ILike.as_sql(), SqlValue::Text(pattern.clone()))
            }
            Self::Array { op, values, .. } => (op.as_sql(), values.clone()),
        };
        params.push(value);
        Ok(format!("({column} {op} ${})", params.len()))
    }
}

/// Sort specification.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: FieldRef,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(direction: SortDirection, field: FieldRef) -> Self {
        Self { field, direction }
    }

    fn to_sql(&self) -> Result<String, SqlBuilderError> {
        let order = match self.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
            SortDirection::AscNullsFirst => "ASC NULLS FIRST",
            SortDirection::AscNullsLast => "ASC NULLS LAST",
            SortDirection::DescNullsFirst => "DESC NULLS FIRST",
            SortDirection::DescNullsLast => "DESC NULLS LAST",
        };
        Ok(format!("{} {order}", column(&self.field)?))
    }
}

/// Pagination settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

/// A JOIN that makes `alias` addressable.
///
/// `on` is `(local, remote)`: `local` is a column of an already present
/// relation, `remote` a column of the joined table (its relation is
/// replaced by `alias` when rendered).
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub alias: String,
    pub on: (FieldRef, String),
}

impl Join {
    pub fn inner(
        table: impl Into<String>,
        alias: impl Into<String>,
        local: FieldRef,
        remote: impl Into<String>,
    ) -> Self {
        Self {
            kind: JoinKind::Inner,
            table: table.into(),
            alias: alias.into(),
            on: (local, remote.into()),
        }
    }

    pub fn left(
        table: impl Into<String>,
        alias: impl Into<String>,
        local: FieldRef,
        remote: impl Into<String>,
    ) -> Self {
        Self {
            kind: JoinKind::Left,
            ..Self::inner(table, alias, local, remote)
        }
    }

    fn to_sql(&self, schema: Option<&str>) -> Result<String, SqlBuilderError> {
        let table = qualified_table(schema, &self.table)?;
        let alias = escape_identifier(&self.alias)?;
        let (local, remote) = &self.on;
        let remote = escape_identifier(remote)?;
        Ok(format!(
            "{} {table} AS {alias} ON {} = {alias}.{remote}",
            self.kind.as_sql(),
            column(local)?
        ))
    }
}

fn qualified_table(schema: Option<&str>, table: &str) -> Result<String, SqlBuilderError> {
    let table = escape_identifier(table)?;
    Ok(match schema {
        Some(schema) => format!("{}.{table}", escape_identifier(schema)?),
        None => table,
    })
}

/// Fluent, value-semantic `SELECT` builder.
///
/// # Example
///
/// ```ignore
/// let query = SqlQuery::new("users")
///     .with_schema("public")
///     .join(Join::inner("roles", "role", FieldRef::new("users", "role_id"), "id"))
///     .where_condition(Condition::Compare {
///         field: FieldRef::new("role", "name"),
///         op: Operator::Eq,
///         value: SqlValue::Text("admin".into()),
///     })
///     .sort_by(SortSpec::new(SortDirection::Asc, FieldRef::new("users", "name")))
///     .paginate(Some(10), None)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    table: String,
    schema: Option<String>,
    alias: String,
    joins: Vec<Join>,
    conditions: Vec<Condition>,
    sort: Vec<SortSpec>,
    pagination: Pagination,
}

impl SqlQuery {
    /// Create a query over `table`, aliased by its own name.
    pub fn new(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            alias: table.clone(),
            table,
            schema: None,
            joins: Vec::new(),
            conditions: Vec::new(),
            sort: Vec::new(),
            pagination: Pagination::default(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the alias the base table is addressed by.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Add a condition (AND semantics).
    pub fn where_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn sort_by(mut self, spec: SortSpec) -> Self {
        self.sort.push(spec);
        self
    }

    pub fn paginate(mut self, limit: Option<u64>, offset: Option<u64>) -> Self {
        self.pagination = Pagination { limit, offset };
        self
    }

    pub(crate) fn set_limit(mut self, limit: u64) -> Self {
        self.pagination.limit = Some(limit);
        self
    }

    pub(crate) fn set_offset(mut self, offset: u64) -> Self {
        self.pagination.offset = Some(offset);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn sort(&self) -> &[SortSpec] {
        &self.sort
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Whether `alias` is the base alias or a joined one.
    pub fn is_addressable(&self, alias: &str) -> bool {
        self.alias == alias || self.joins.iter().any(|j| j.alias == alias)
    }

    /// Validate the query complexity and that every referenced relation is
    /// addressable.
    fn validate(&self) -> Result<(), SqlBuilderError> {
        if self.conditions.len() > MAX_CONDITIONS {
            return Err(SqlBuilderError::QueryTooComplex(format!(
                "Too many conditions: {} (max {})",
                self.conditions.len(),
                MAX_CONDITIONS
            )));
        }

        if self.joins.len() > MAX_JOINS {
            return Err(SqlBuilderError::QueryTooComplex(format!(
                "Too many JOINs: {} (max {})",
                self.joins.len(),
                MAX_JOINS
            )));
        }

        let referenced = self
            .conditions
            .iter()
            .map(Condition::field)
            .chain(self.sort.iter().map(|s| &s.field))
            .chain(self.joins.iter().map(|j| &j.on.0));
        for field in referenced {
            if !self.is_addressable(&field.relation) {
                return Err(SqlBuilderError::UnknownRelation {
                    relation: field.relation.clone(),
                });
            }
        }

        Ok(())
    }

    /// Build the SQL query and parameters.
    pub fn build(&self) -> Result<BuiltQuery, SqlBuilderError> {
        self.validate()?;

        let alias = escape_identifier(&self.alias)?;
        let mut params = Vec::new();
        let mut sql = format!("SELECT {alias}.* FROM {}", self.build_from_clause()?);

        if let Some(where_sql) = self.build_where_clause(&mut params)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        let order_clause = self.build_order_clause()?;
        if !order_clause.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_clause);
        }

        if let Some(limit) = self.pagination.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.pagination.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        tracing::trace!(sql = %sql, params = params.len(), "Built filtered query");
        Ok(BuiltQuery { sql, params })
    }

    /// Build a `COUNT(*)` query over the same rows, ignoring sort and
    /// pagination.
    pub fn build_count(&self) -> Result<BuiltQuery, SqlBuilderError> {
        self.validate()?;

        let mut params = Vec::new();
        let mut sql = format!("SELECT COUNT(*) AS total FROM {}", self.build_from_clause()?);

        if let Some(where_sql) = self.build_where_clause(&mut params)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        Ok(BuiltQuery { sql, params })
    }

    fn build_from_clause(&self) -> Result<String, SqlBuilderError> {
        let schema = self.schema.as_deref();
        let mut from = format!(
            "{} AS {}",
            qualified_table(schema, &self.table)?,
            escape_identifier(&self.alias)?
        );

        for join in &self.joins {
            from.push(' ');
            from.push_str(&join.to_sql(schema)?);
        }

        Ok(from)
    }

    fn build_where_clause(
        &self,
        params: &mut Vec<SqlValue>,
    ) -> Result<Option<String>, SqlBuilderError> {
        if self.conditions.is_empty() {
            return Ok(None);
        }

        let condition_sqls: Vec<String> = self
            .conditions
            .iter()
            .map(|c| c.to_sql(params))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(condition_sqls.join(" AND ")))
    }

    fn build_order_clause(&self) -> Result<String, SqlBuilderError> {
        Ok(self
            .sort
            .iter()
            .map(SortSpec::to_sql)
            .collect::<Result<Vec<_>, _>>()?
            .join(", "))
    }
}

/// A built SQL query with parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl fmt::Display for BuiltQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}
