//! # Steward
//!
//! Named managers and lazy querysets for model classes.
//!
//! A model class is declared explicitly with a [`ModelBuilder`]: its columns,
//! and the managers registered against names. Every manager produces a
//! [`QuerySet`], a lazy description of rows that only runs when a terminal
//! method hands it to a [`StewardExecutor`]. Exactly one manager is the
//! default; unless configured otherwise it is called `query` and returns all
//! rows, unfiltered.
//!
//! ```
//! use serde::Deserialize;
//! use serde_json::json;
//! use steward::{Field, Filter, Manager, MemoryExecutor, Model, ModelClass, QuerySet};
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: i64,
//!     is_active: bool,
//! }
//!
//! impl Model for User {
//!     const NAME: &'static str = "User";
//! }
//!
//! struct ActiveUsersManager;
//!
//! impl Manager<User> for ActiveUsersManager {
//!     fn get_queryset(&self, all: QuerySet<User>) -> QuerySet<User> {
//!         all.filter(Filter::eq("is_active", true))
//!     }
//! }
//!
//! let users = ModelClass::<User>::builder()
//!     .field(Field::boolean("is_active"))
//!     .manager("query", ActiveUsersManager)
//!     .build()?;
//!
//! let db = MemoryExecutor::new();
//! db.insert("users", json!({"id": 1, "is_active": true}))?;
//! db.insert("users", json!({"id": 2, "is_active": false}))?;
//!
//! let active = users.query().all(&db)?;
//! assert_eq!(active.len(), 1);
//! assert!(active[0].is_active);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod executor;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod query;
pub mod registry;

#[cfg(test)]
mod tests_cfg;

pub use config::StewardConfig;
pub use executor::{StewardError, StewardExecutor};
pub use memory::MemoryExecutor;
pub use model::{
    ConfigurationError, Field, FieldKind, Model, ModelBuilder, ModelClass, ModelInfo, DEFAULT_MANAGER,
};
pub use query::{
    BoundManager, DefaultManager, Direction, Filter, FromRow, Manager, QuerySet, Row, ScopedManager,
    Select,
};
pub use registry::Registry;
