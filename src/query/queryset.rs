//! Lazy, chainable querysets.
//!
//! A [`QuerySet`] describes a filtered row-set of one model. Building and
//! chaining it is pure: no executor is involved until a terminal method
//! (`all`, `first`, `get`, `count`, `exists`, `rows`) is called with one.

use crate::executor::{StewardError, StewardExecutor};
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
use crate::model::{Model, ModelInfo};
use crate::query::filter::Filter;
use crate::query::select::{Direction, Select};
use crate::query::Row;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

/// A lazy description of rows of model `M`
///
/// Cloning is cheap and every chaining method returns a new queryset, so a
/// queryset handed out by one manager can never be changed through another.
///
/// # Example
///
/// ```
/// use steward::{Direction, Field, Filter, MemoryExecutor, Model, ModelClass};
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Debug, Deserialize)]
/// struct User {
///     id: i64,
///     name: String,
///     is_active: bool,
/// }
///
/// impl Model for User {
///     const NAME: &'static str = "User";
/// }
///
/// let users = ModelClass::<User>::builder()
///     .field(Field::char("name", 100))
///     .field(Field::boolean("is_active"))
///     .build()?;
///
/// let executor = MemoryExecutor::new();
/// executor.insert("users", json!({"id": 1, "name": "Ada", "is_active": true}))?;
/// executor.insert("users", json!({"id": 2, "name": "Bob", "is_active": false}))?;
///
/// let active = users
///     .query()
///     .filter(Filter::eq("is_active", true))
///     .order_by("name", Direction::Asc);
/// let found = active.all(&executor)?;
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].name, "Ada");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct QuerySet<M> {
    model: Arc<ModelInfo>,
    select: Select,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for QuerySet<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            select: self.select.clone(),
            _model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for QuerySet<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("model", &self.model.name())
            .field("select", &self.select)
            .finish()
    }
}

impl<M: Model> QuerySet<M> {
    /// All rows of the model, unfiltered
    pub(crate) fn unfiltered(model: Arc<ModelInfo>) -> Self {
        let select = Select::new(model.table_name());
        Self {
            model,
            select,
            _model: PhantomData,
        }
    }

    /// Keep only rows matching `filter`
    pub fn filter(mut self, filter: Filter) -> Self {
        self.select = self.select.filter(filter);
        self
    }

    /// Drop rows matching `filter`
    ///
    /// Rows for which `filter` is unknown (it compares a null) are dropped
    /// as well, as with SQL `NOT (...)`.
    pub fn exclude(self, filter: Filter) -> Self {
        self.filter(!filter)
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.select = self.select.order_by(column, direction);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.select = self.select.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.select = self.select.offset(offset);
        self
    }

    /// The model this queryset reads
    pub fn model(&self) -> &ModelInfo {
        &self.model
    }

    /// The select an executor would receive
    pub fn select(&self) -> &Select {
        &self.select
    }

    pub fn into_select(self) -> Select {
        self.select
    }

    /// PostgreSQL text of the select, values inlined
    pub fn to_sql(&self) -> String {
        self.select.to_sql()
    }

    /// Check every referenced column against the model
    ///
    /// # Errors
    ///
    /// Returns `StewardError::UnknownColumn` for the first undeclared column
    /// when the model enforces strict columns.
    pub fn validate(&self) -> Result<(), StewardError> {
        if !self.model.strict_columns() {
            return Ok(());
        }
        match self
            .select
            .referenced_columns()
            .into_iter()
            .find(|c| !self.model.has_field(c))
        {
            Some(column) => Err(StewardError::UnknownColumn {
                model: self.model.name().to_string(),
                column: column.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn fetch<E>(&self, executor: &E, select: &Select, operation: &'static str) -> Result<Vec<Row>, StewardError>
    where
        E: StewardExecutor + ?Sized,
    {
        self.validate()?;

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(select.table(), operation).entered();

        log::debug!("{} {}: {}", self.model.name(), operation, select.to_sql());
        let start = Instant::now();
        let rows = executor.fetch_all(select)?;
        let duration = start.elapsed();
        #[cfg(feature = "metrics")]
        METRICS.record_fetch(rows.len(), duration);
        log::trace!("{} {} returned {} row(s) in {:?}", self.model.name(), operation, rows.len(), duration);
        Ok(rows)
    }

    /// Execute and return the raw rows
    ///
    /// # Errors
    ///
    /// Returns `StewardError` if validation or execution fails.
    pub fn rows<E>(&self, executor: &E) -> Result<Vec<Row>, StewardError>
    where
        E: StewardExecutor + ?Sized,
    {
        self.fetch(executor, &self.select, "rows")
    }

    /// Execute and materialise every matching row
    ///
    /// # Errors
    ///
    /// Returns `StewardError` if validation, execution or row parsing fails.
    pub fn all<E>(&self, executor: &E) -> Result<Vec<M>, StewardError>
    where
        E: StewardExecutor + ?Sized,
    {
        self.fetch(executor, &self.select, "all")?
            .iter()
            .map(M::from_row)
            .collect()
    }

    /// The first matching row, or `None`
    ///
    /// An unordered queryset is ordered by primary key first, so the result
    /// is deterministic.
    ///
    /// # Errors
    ///
    /// Returns `StewardError` if validation, execution or row parsing fails.
    pub fn first<E>(&self, executor: &E) -> Result<Option<M>, StewardError>
    where
        E: StewardExecutor + ?Sized,
    {
        let mut select = self.select.clone();
        if select.ordering().is_empty() {
            if let Some(pk) = self.model.primary_key() {
                select = select.order_by(pk.name(), Direction::Asc);
            }
        }
        let limit = select.limit_value().map_or(1, |l| l.min(1));
        let select = select.limit(limit);

        self.fetch(executor, &select, "first")?
            .first()
            .map(M::from_row)
            .transpose()
    }

    /// The single matching row
    ///
    /// # Errors
    ///
    /// Returns `StewardError::DoesNotFound` when nothing matches and
    /// `StewardError::MultipleObjectsReturned` when more than one row does.
    pub fn get<E>(&self, executor: &E) -> Result<M, StewardError>
    where
        E: StewardExecutor + ?Sized,
    {
        let rows = self.fetch(executor, &self.select, "get")?;
        match rows.as_slice() {
            [] => Err(StewardError::DoesNotFound(self.model.name().to_string())),
            [row] => M::from_row(row),
            _ => Err(StewardError::MultipleObjectsReturned {
                model: self.model.name().to_string(),
                count: rows.len(),
            }),
        }
    }

    /// Number of matching rows, honouring limit and offset
    ///
    /// # Errors
    ///
    /// Returns `StewardError` if validation or execution fails.
    pub fn count<E>(&self, executor: &E) -> Result<u64, StewardError>
    where
        E: StewardExecutor + ?Sized,
    {
        if self.select.limit_value().is_some() || self.select.offset_value().is_some() {
            return Ok(self.fetch(executor, &self.select, "count")?.len() as u64);
        }

        self.validate()?;

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(self.select.table(), "count").entered();

        log::debug!("{} count: {}", self.model.name(), self.select.to_sql());
        let start = Instant::now();
        let count = executor.fetch_count(&self.select)?;
        #[cfg(feature = "metrics")]
        METRICS.record_fetch(0, start.elapsed());
        log::trace!("{} count returned {} in {:?}", self.model.name(), count, start.elapsed());
        Ok(count)
    }

    /// Whether any row matches
    ///
    /// # Errors
    ///
    /// Returns `StewardError` if validation or execution fails.
    pub fn exists<E>(&self, executor: &E) -> Result<bool, StewardError>
    where
        E: StewardExecutor + ?Sized,
    {
        let limit = self.select.limit_value().map_or(1, |l| l.min(1));
        let select = self.select.clone().limit(limit);
        Ok(!self.fetch(executor, &select, "exists")?.is_empty())
    }
}
