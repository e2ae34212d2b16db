//! Filter predicates for querysets.
//!
//! A [`Filter`] is a small predicate tree over column values. It is rendered
//! to a `sea_query::Condition` for SQL executors and evaluated directly
//! against JSON rows by the in-memory executor. Both paths follow SQL
//! three-valued logic, so a filter selects the same rows either way.
//!
//! # Example
//!
//! ```
//! use steward::Filter;
//!
//! let active_admins = Filter::eq("is_active", true).and(Filter::eq("role", "admin"));
//! let not_deleted = !Filter::eq("is_deleted", true);
//! assert_eq!(active_admins.columns(), vec!["is_active", "role"]);
//! # let _ = not_deleted;
//! ```

use crate::query::Row;
use sea_query::{Condition, DynIden, Expr, ExprTrait};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// A predicate over the columns of one row
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`; `IS NULL` when `value` is null
    Eq(String, Value),
    /// `column <> value`; `IS NOT NULL` when `value` is null
    Ne(String, Value),
    /// `column > value`
    Gt(String, Value),
    /// `column >= value`
    Gte(String, Value),
    /// `column < value`
    Lt(String, Value),
    /// `column <= value`
    Lte(String, Value),
    /// `column IN (values...)`
    In(String, Vec<Value>),
    /// `column IS NULL`
    IsNull(String),
    /// `column LIKE '%needle%'`
    Contains(String, String),
    /// Every filter holds (empty: always true)
    And(Vec<Filter>),
    /// At least one filter holds (empty: always false)
    Or(Vec<Filter>),
    /// Negation
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne(column.into(), value.into())
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt(column.into(), value.into())
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gte(column.into(), value.into())
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt(column.into(), value.into())
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lte(column.into(), value.into())
    }

    /// `column IN (values...)`
    ///
    /// Null entries are dropped: `x IN (NULL)` never selects a row in SQL.
    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values
            .into_iter()
            .map(Into::into)
            .filter(|v: &Value| !v.is_null())
            .collect();
        Filter::In(column.into(), values)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Filter::IsNull(column.into())
    }

    /// Substring match on a text column
    pub fn contains(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Filter::Contains(column.into(), needle.into())
    }

    /// Conjunction of all `filters`
    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    /// Disjunction of all `filters`
    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Combine with `other` so both must hold
    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut items) => {
                items.push(other);
                Filter::And(items)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Combine with `other` so either may hold
    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut items) => {
                items.push(other);
                Filter::Or(items)
            }
            first => Filter::Or(vec![first, other]),
        }
    }

    /// Columns referenced by this filter, in first-seen order
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Filter::Eq(c, _)
            | Filter::Ne(c, _)
            | Filter::Gt(c, _)
            | Filter::Gte(c, _)
            | Filter::Lt(c, _)
            | Filter::Lte(c, _)
            | Filter::In(c, _)
            | Filter::IsNull(c)
            | Filter::Contains(c, _) => {
                if !out.contains(&c.as_str()) {
                    out.push(c.as_str());
                }
            }
            Filter::And(items) | Filter::Or(items) => {
                for item in items {
                    item.collect_columns(out);
                }
            }
            Filter::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Render as a `sea_query` condition
    pub fn to_condition(&self) -> Condition {
        match self {
            Filter::And(items) => items
                .iter()
                .fold(Condition::all(), |cond, item| cond.add(item.to_condition())),
            Filter::Or(items) => items
                .iter()
                .fold(Condition::any(), |cond, item| cond.add(item.to_condition())),
            Filter::Not(inner) => inner.to_condition().not(),
            Filter::Eq(c, Value::Null) | Filter::IsNull(c) => {
                Condition::all().add(column(c).is_null())
            }
            Filter::Ne(c, Value::Null) => Condition::all().add(column(c).is_not_null()),
            Filter::Eq(c, v) => Condition::all().add(column(c).eq(Expr::val(sea_value(v)))),
            Filter::Ne(c, v) => Condition::all().add(column(c).ne(Expr::val(sea_value(v)))),
            Filter::Gt(c, v) => Condition::all().add(column(c).gt(Expr::val(sea_value(v)))),
            Filter::Gte(c, v) => Condition::all().add(column(c).gte(Expr::val(sea_value(v)))),
            Filter::Lt(c, v) => Condition::all().add(column(c).lt(Expr::val(sea_value(v)))),
            Filter::Lte(c, v) => Condition::all().add(column(c).lte(Expr::val(sea_value(v)))),
            Filter::In(c, values) => {
                let values: Vec<sea_query::Value> = values.iter().map(sea_value).collect();
                Condition::all().add(column(c).is_in(values))
            }
            Filter::Contains(c, needle) => {
                Condition::all().add(column(c).like(format!("%{}%", escape_like(needle))))
            }
        }
    }

    /// Whether `row` is selected by this filter
    ///
    /// Missing columns read as null. Rows for which the predicate is unknown
    /// (a null compared with a value) are not selected, as in SQL.
    pub fn matches(&self, row: &Row) -> bool {
        self.evaluate(row) == Some(true)
    }

    /// Three-valued evaluation; `None` is SQL's UNKNOWN
    fn evaluate(&self, row: &Row) -> Option<bool> {
        match self {
            Filter::Eq(c, Value::Null) | Filter::IsNull(c) => Some(cell(row, c).is_null()),
            Filter::Ne(c, Value::Null) => Some(!cell(row, c).is_null()),
            Filter::Eq(c, v) => non_null(cell(row, c)).map(|x| values_equal(x, v)),
            Filter::Ne(c, v) => non_null(cell(row, c)).map(|x| !values_equal(x, v)),
            Filter::Gt(c, v) => compare(cell(row, c), v).map(Ordering::is_gt),
            Filter::Gte(c, v) => compare(cell(row, c), v).map(Ordering::is_ge),
            Filter::Lt(c, v) => compare(cell(row, c), v).map(Ordering::is_lt),
            Filter::Lte(c, v) => compare(cell(row, c), v).map(Ordering::is_le),
            Filter::In(c, values) => {
                non_null(cell(row, c)).map(|x| values.iter().any(|v| values_equal(x, v)))
            }
            Filter::Contains(c, needle) => match cell(row, c) {
                Value::String(s) => Some(s.contains(needle.as_str())),
                _ => None,
            },
            Filter::And(items) => {
                let mut result = Some(true);
                for item in items {
                    match item.evaluate(row) {
                        Some(false) => return Some(false),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Filter::Or(items) => {
                let mut result = Some(false);
                for item in items {
                    match item.evaluate(row) {
                        Some(true) => return Some(true),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
            Filter::Not(inner) => inner.evaluate(row).map(|b| !b),
        }
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Self::Output {
        match self {
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }
}

fn column(name: &str) -> Expr {
    Expr::col(DynIden::from(name.to_string()))
}

static NULL: Value = Value::Null;

fn cell<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&NULL)
}

fn non_null(value: &Value) -> Option<&Value> {
    if value.is_null() {
        None
    } else {
        Some(value)
    }
}

/// Equality with numeric widening (`1 == 1.0`)
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b) == Some(Ordering::Equal),
        _ => left == right,
    }
}

/// Integers compare exactly; floats only when either side is one
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (integer(a), integer(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Ordering of two non-null values of the same kind; `None` otherwise
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Total order used for `ORDER BY` in memory.
///
/// Nulls sort after every value, matching PostgreSQL's default of
/// `NULLS LAST` ascending and `NULLS FIRST` descending.
pub(crate) fn sort_order(left: &Value, right: &Value) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare(left, right).unwrap_or_else(|| kind_rank(left).cmp(&kind_rank(right))),
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn sea_value(value: &Value) -> sea_query::Value {
    match value {
        Value::Null => Option::<bool>::None.into(),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(u) = n.as_u64() {
                u.into()
            } else {
                n.as_f64().unwrap_or(f64::NAN).into()
            }
        }
        Value::String(s) => s.clone().into(),
        other => other.clone().into(),
    }
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
