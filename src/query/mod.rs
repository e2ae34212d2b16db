//! Query construction for model classes.
//!
//! This module provides the pieces a model class uses to answer queries:
//! - **Manager**: named entry points that produce querysets (`Manager`, `BoundManager`)
//! - **QuerySet**: lazy, chainable row-set descriptions with terminal methods
//! - **Filter**: predicate trees rendered to SQL or evaluated in memory
//! - **Select**: the executor-facing description of one SELECT
//!
//! # Examples
//!
//! ```
//! use steward::{Field, Filter, Model, ModelClass};
//!
//! # #[derive(Debug, serde::Deserialize)]
//! # struct User { id: i64, is_active: bool }
//! # impl Model for User { const NAME: &'static str = "User"; }
//! let users = ModelClass::<User>::builder()
//!     .field(Field::boolean("is_active"))
//!     .build()?;
//!
//! // Find all users
//! let everyone = users.query();
//!
//! // Find users with filters
//! let active = users.query().filter(Filter::eq("is_active", true));
//! assert!(active.to_sql().ends_with(r#"WHERE "is_active" = TRUE"#));
//! # let _ = everyone;
//! # Ok::<(), steward::ConfigurationError>(())
//! ```

use crate::executor::StewardError;
use serde::de::DeserializeOwned;

pub mod filter;
#[doc(inline)]
pub use filter::Filter;

pub mod select;
#[doc(inline)]
pub use select::{Direction, Select};

pub mod queryset;
#[doc(inline)]
pub use queryset::QuerySet;

// Model Manager pattern: named queryset entry points
pub mod manager;
#[doc(inline)]
pub use manager::{BoundManager, DefaultManager, Manager, ScopedManager};

/// One result row: column name to JSON value
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Conversion from a result row
///
/// Implemented for every `DeserializeOwned` type, so models only need
/// `#[derive(Deserialize)]`.
pub trait FromRow: Sized {
    /// # Errors
    ///
    /// Returns `StewardError::ParseError` if the row does not fit the type.
    fn from_row(row: &Row) -> Result<Self, StewardError>;
}

impl<T: DeserializeOwned> FromRow for T {
    fn from_row(row: &Row) -> Result<Self, StewardError> {
        serde_json::from_value(serde_json::Value::Object(row.clone()))
            .map_err(|e| StewardError::ParseError(format!("Failed to parse row: {e}")))
    }
}
