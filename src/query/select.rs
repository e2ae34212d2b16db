//! Executor-facing description of a single SELECT.
//!
//! A [`Select`] is what a queryset hands to an executor when it is finally
//! consumed. It carries the table, the accumulated filter, ordering and
//! pagination, and renders itself through `sea_query` for SQL backends.

use crate::query::filter::Filter;
use sea_query::{DynIden, Expr, Order, PostgresQueryBuilder, Query, SelectStatement, Values};

/// Sort direction for `ORDER BY`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl From<Direction> for Order {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        }
    }
}

/// A fully described SELECT over one table
///
/// # Example
///
/// ```
/// use steward::query::select::{Direction, Select};
/// use steward::Filter;
///
/// let select = Select::new("users")
///     .filter(Filter::eq("is_active", true))
///     .order_by("id", Direction::Desc)
///     .limit(10);
/// let (sql, values) = select.build();
/// assert!(sql.starts_with(r#"SELECT * FROM "users" WHERE"#));
/// assert!(!values.0.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    table: String,
    filter: Option<Filter>,
    order: Vec<(String, Direction)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Select {
    /// Select every row of `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// AND `filter` into the WHERE clause
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// Append an ORDER BY term
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Drop LIMIT and OFFSET, keeping the filter
    pub fn unbounded(mut self) -> Self {
        self.limit = None;
        self.offset = None;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn filter_ref(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn ordering(&self) -> &[(String, Direction)] {
        &self.order
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    /// Columns referenced by the filter and ordering
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut columns = self.filter.as_ref().map(Filter::columns).unwrap_or_default();
        for (column, _) in &self.order {
            if !columns.contains(&column.as_str()) {
                columns.push(column.as_str());
            }
        }
        columns
    }

    /// Build the `sea_query` statement
    pub fn statement(&self) -> SelectStatement {
        let mut query = Query::select();
        query
            .column(sea_query::Asterisk)
            .from(DynIden::from(self.table.clone()));
        if let Some(filter) = &self.filter {
            query.cond_where(filter.to_condition());
        }
        for (column, direction) in &self.order {
            query.order_by(DynIden::from(column.clone()), Order::from(*direction));
        }
        if let Some(limit) = self.limit {
            query.limit(limit);
        }
        if let Some(offset) = self.offset {
            query.offset(offset);
        }
        query
    }

    /// Build `SELECT COUNT(*)` over the filtered rows
    pub fn count_statement(&self) -> SelectStatement {
        let mut query = Query::select();
        query
            .expr(Expr::cust("COUNT(*)"))
            .from(DynIden::from(self.table.clone()));
        if let Some(filter) = &self.filter {
            query.cond_where(filter.to_condition());
        }
        query
    }

    /// Render for PostgreSQL with bound parameters
    pub fn build(&self) -> (String, Values) {
        self.statement().build(PostgresQueryBuilder)
    }

    /// Render for PostgreSQL with values inlined; for logging and inspection
    pub fn to_sql(&self) -> String {
        self.statement().to_string(PostgresQueryBuilder)
    }
}
