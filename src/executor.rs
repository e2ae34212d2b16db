//! `StewardExecutor` module
//!
//! The executor is the query-execution collaborator. Querysets describe *what*
//! to fetch as a [`Select`]; an executor decides *how*. The crate ships
//! [`MemoryExecutor`](crate::memory::MemoryExecutor); a database-backed
//! executor only needs to render [`Select::build`] and map rows back to JSON
//! objects.

use crate::model::ConfigurationError;
use crate::query::select::Select;
use crate::query::Row;
use std::fmt;

/// Runtime error type
#[derive(Debug)]
pub enum StewardError {
    /// A model class failed validation
    Configuration(ConfigurationError),
    /// A model class was looked up but never registered
    ModelNotRegistered(String),
    /// A manager name is not registered on the model
    UnknownManager { model: String, manager: String },
    /// A queryset references a column the model does not declare
    UnknownColumn { model: String, column: String },
    /// `get()` matched no row
    DoesNotFound(String),
    /// `get()` matched more than one row
    MultipleObjectsReturned { model: String, count: usize },
    /// Row parsing/conversion error
    ParseError(String),
    /// Query execution error
    QueryError(String),
    /// Other execution errors
    Other(String),
}

impl fmt::Display for StewardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StewardError::Configuration(e) => write!(f, "Configuration error: {e}"),
            StewardError::ModelNotRegistered(model) => {
                write!(f, "Model '{model}' is not registered")
            }
            StewardError::UnknownManager { model, manager } => {
                write!(f, "Model '{model}' has no manager named '{manager}'")
            }
            StewardError::UnknownColumn { model, column } => {
                write!(f, "Model '{model}' has no column named '{column}'")
            }
            StewardError::DoesNotFound(model) => {
                write!(f, "No {model} matches the given query")
            }
            StewardError::MultipleObjectsReturned { model, count } => {
                write!(f, "get() returned {count} {model} rows, expected exactly one")
            }
            StewardError::ParseError(s) => write!(f, "Parse error: {s}"),
            StewardError::QueryError(s) => write!(f, "Query error: {s}"),
            StewardError::Other(s) => write!(f, "Execution error: {s}"),
        }
    }
}

impl std::error::Error for StewardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StewardError::Configuration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigurationError> for StewardError {
    fn from(err: ConfigurationError) -> Self {
        StewardError::Configuration(err)
    }
}

impl From<serde_json::Error> for StewardError {
    fn from(err: serde_json::Error) -> Self {
        StewardError::ParseError(err.to_string())
    }
}

/// Trait for executing queryset selects
///
/// Implementations receive a fully described [`Select`] and return the
/// matching rows as JSON objects keyed by column name.
///
/// # Examples
///
/// ```no_run
/// use steward::{MemoryExecutor, StewardExecutor};
/// use steward::query::select::Select;
///
/// let executor = MemoryExecutor::new();
/// let rows = executor.fetch_all(&Select::new("users"))?;
/// # Ok::<(), steward::StewardError>(())
/// ```
pub trait StewardExecutor {
    /// Execute the select and return every matching row
    ///
    /// # Errors
    ///
    /// Returns `StewardError` if the select cannot be executed.
    fn fetch_all(&self, select: &Select) -> Result<Vec<Row>, StewardError>;

    /// Count the rows matched by the select's filter
    ///
    /// Ordering, limit and offset are ignored. The default implementation
    /// fetches and counts; database executors should run `COUNT(*)` via
    /// [`Select::count_statement`].
    ///
    /// # Errors
    ///
    /// Returns `StewardError` if the select cannot be executed.
    fn fetch_count(&self, select: &Select) -> Result<u64, StewardError> {
        let unbounded = select.clone().unbounded();
        let rows = self.fetch_all(&unbounded)?;
        Ok(rows.len() as u64)
    }
}

impl<T: StewardExecutor + ?Sized> StewardExecutor for &T {
    fn fetch_all(&self, select: &Select) -> Result<Vec<Row>, StewardError> {
        (**self).fetch_all(select)
    }

    fn fetch_count(&self, select: &Select) -> Result<u64, StewardError> {
        (**self).fetch_count(select)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_steward_error_display() {
        let err = StewardError::QueryError("test error".to_string());
        assert!(err.to_string().contains("Query error"));
    }

    #[test]
    fn test_steward_error_all_variants() {
        let err = StewardError::ParseError("test".to_string());
        assert!(err.to_string().contains("Parse error"));

        let err = StewardError::Other("test".to_string());
        assert!(err.to_string().contains("Execution error"));

        let err = StewardError::DoesNotFound("User".to_string());
        assert_eq!(err.to_string(), "No User matches the given query");

        let err = StewardError::MultipleObjectsReturned {
            model: "User".to_string(),
            count: 3,
        };
        assert!(err.to_string().contains("returned 3 User rows"));
    }

    #[test]
    fn test_configuration_error_is_source() {
        use std::error::Error;

        let err: StewardError = ConfigurationError::DuplicateManager {
            model: "User".to_string(),
            manager: "query".to_string(),
        }
        .into();
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("Configuration error"));
    }

    struct RecordingExecutor {
        seen: RefCell<Vec<Select>>,
    }

    impl StewardExecutor for RecordingExecutor {
        fn fetch_all(&self, select: &Select) -> Result<Vec<Row>, StewardError> {
            self.seen.borrow_mut().push(select.clone());
            Ok(vec![Row::new(), Row::new()])
        }
    }

    #[test]
    fn test_default_count_drops_limit_and_offset() {
        let executor = RecordingExecutor {
            seen: RefCell::new(Vec::new()),
        };
        let select = Select::new("users").limit(1).offset(5);

        assert_eq!(executor.fetch_count(&select).unwrap(), 2);

        let seen = executor.seen.borrow();
        assert_eq!(seen[0].limit_value(), None);
        assert_eq!(seen[0].offset_value(), None);
    }
}
