//! Model classes and their metadata.
//!
//! A model is a Rust type that rows of one table deserialize into. Its
//! *class* is the process-wide object built once through [`ModelBuilder`]:
//! it owns the column declarations and the named managers that produce
//! querysets for the table.
//!
//! ```
//! use serde::Deserialize;
//! use steward::{Field, Model, ModelClass};
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
//! let users = ModelClass::<User>::builder()
//!     .field(Field::boolean("is_active"))
//!     .build()?;
//! assert_eq!(users.table_name(), "users");
//! assert_eq!(users.default_manager().name(), "query");
//! # Ok::<(), steward::ConfigurationError>(())
//! ```

mod class;
mod error;
mod field;

pub use class::{ModelBuilder, ModelClass};
pub use error::ConfigurationError;
pub use field::{Field, FieldKind};

pub(crate) use field::is_identifier;

use crate::query::FromRow;

/// Name of the manager used when a model is queried without naming one
pub const DEFAULT_MANAGER: &str = "query";

/// A type rows of one table materialise into
pub trait Model: FromRow + Send + Sync + 'static {
    /// Class name, e.g. `"User"`. The default table name derives from it.
    const NAME: &'static str;
}

/// Table name used when a definition does not set one: `User` -> `users`
pub fn default_table_name(model_name: &str) -> String {
    format!("{}s", model_name.to_lowercase())
}

/// Class-level metadata shared by a model class and every bound manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    name: String,
    table_name: String,
    fields: Vec<Field>,
    strict_columns: bool,
}

impl ModelInfo {
    pub(crate) fn new(
        name: String,
        table_name: String,
        fields: Vec<Field>,
        strict_columns: bool,
    ) -> Self {
        Self {
            name,
            table_name,
            fields,
            strict_columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// The primary key column; every built class has exactly one
    pub fn primary_key(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_primary_key())
    }

    /// Whether querysets reject columns the model does not declare
    pub fn strict_columns(&self) -> bool {
        self.strict_columns
    }
}
