//! Model managers.
//!
//! A manager is a named, reusable query entry point attached to a model
//! class, similar to Django's model managers. Every manager produces a
//! [`QuerySet`]; the default implementation returns all rows, and custom
//! managers narrow that queryset before handing it out.
//!
//! Managers are registered on a [`ModelBuilder`](crate::ModelBuilder) under a
//! name. Building the class binds each one to that class for the lifetime of
//! the class.
//!
//! # Usage
//!
//! ## Soft-delete style default manager
//!
//! ```
//! use serde::Deserialize;
//! use steward::{Field, Filter, Manager, Model, ModelClass, ModelInfo, QuerySet};
//!
//! #[derive(Debug, Deserialize)]
//! struct Post {
//!     id: i64,
//!     title: String,
//!     is_deleted: bool,
//! }
//!
//! impl Model for Post {
//!     const NAME: &'static str = "Post";
//! }
//!
//! struct LivePosts;
//!
//! impl Manager<Post> for LivePosts {
//!     fn get_queryset(&self, all: QuerySet<Post>) -> QuerySet<Post> {
//!         all.exclude(Filter::eq("is_deleted", true))
//!     }
//!
//!     fn check(&self, model: &ModelInfo) -> Result<(), String> {
//!         if model.has_field("is_deleted") {
//!             Ok(())
//!         } else {
//!             Err("requires an `is_deleted` column".to_string())
//!         }
//!     }
//! }
//!
//! let posts = ModelClass::<Post>::builder()
//!     .field(Field::char("title", 200))
//!     .field(Field::boolean("is_deleted"))
//!     .manager("query", LivePosts)
//!     .manager("everything", steward::DefaultManager)
//!     .build()?;
//!
//! // `query` hides deleted posts; `everything` still sees them.
//! assert!(posts.query().to_sql().contains("is_deleted"));
//! assert!(!posts.queryset("everything")?.to_sql().contains("WHERE"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom query helpers
//!
//! A manager is an ordinary type, so it can carry its own methods. Reach
//! them through [`ModelClass::downcast_manager`](crate::ModelClass::downcast_manager).

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
use crate::model::{Model, ModelInfo};
use crate::query::filter::Filter;
use crate::query::QuerySet;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Produces the queryset a named entry point exposes
///
/// `get_queryset` receives the unfiltered queryset of the bound model and
/// returns this manager's view of it. It must not execute anything: a
/// queryset is only a description until a terminal method runs it.
pub trait Manager<M: Model>: Send + Sync + 'static {
    /// This manager's view of the table; all rows by default
    fn get_queryset(&self, all: QuerySet<M>) -> QuerySet<M> {
        all
    }

    /// Definition-time check against the model being built
    ///
    /// Return `Err(reason)` to reject the model; the class build then fails
    /// with `ConfigurationError::ManagerCheckFailed`.
    fn check(&self, _model: &ModelInfo) -> Result<(), String> {
        Ok(())
    }
}

/// The built-in manager: all rows, unfiltered
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultManager;

impl<M: Model> Manager<M> for DefaultManager {}

/// A manager whose view is a closure over the unfiltered queryset
///
/// # Example
///
/// ```
/// use steward::{Filter, ScopedManager};
/// # #[derive(serde::Deserialize)] struct User;
/// # impl steward::Model for User { const NAME: &'static str = "User"; }
///
/// let staff = ScopedManager::<User>::filtered(Filter::eq("is_staff", true));
/// let newest = ScopedManager::<User>::new(|all| {
///     all.order_by("id", steward::Direction::Desc).limit(10)
/// })
/// .requires(["id"]);
/// # let _ = (staff, newest);
/// ```
pub struct ScopedManager<M: Model> {
    scope: Box<dyn Fn(QuerySet<M>) -> QuerySet<M> + Send + Sync>,
    required: Vec<String>,
}

impl<M: Model> ScopedManager<M> {
    pub fn new<F>(scope: F) -> Self
    where
        F: Fn(QuerySet<M>) -> QuerySet<M> + Send + Sync + 'static,
    {
        Self {
            scope: Box::new(scope),
            required: Vec::new(),
        }
    }

    /// Manager that applies one filter; requires the columns it references
    pub fn filtered(filter: Filter) -> Self {
        let required = filter.columns().into_iter().map(str::to_string).collect();
        Self {
            scope: Box::new(move |all: QuerySet<M>| all.filter(filter.clone())),
            required,
        }
    }

    /// Columns the bound model must declare
    pub fn requires<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(columns.into_iter().map(Into::into));
        self
    }
}

impl<M: Model> Manager<M> for ScopedManager<M> {
    fn get_queryset(&self, all: QuerySet<M>) -> QuerySet<M> {
        (self.scope)(all)
    }

    fn check(&self, model: &ModelInfo) -> Result<(), String> {
        match self.required.iter().find(|c| !model.has_field(c)) {
            Some(missing) => Err(format!("requires a `{missing}` column")),
            None => Ok(()),
        }
    }
}

/// A manager registered on a builder, not yet bound
pub(crate) struct RegisteredManager<M: Model> {
    manager: Arc<dyn Manager<M>>,
    any: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    builtin: bool,
}

impl<M: Model> RegisteredManager<M> {
    pub(crate) fn new<T: Manager<M>>(manager: T) -> Self {
        let manager = Arc::new(manager);
        let any: Arc<dyn Any + Send + Sync> = manager.clone();
        Self {
            builtin: any.is::<DefaultManager>(),
            any,
            manager,
            type_name: std::any::type_name::<T>(),
        }
    }

    pub(crate) fn manager(&self) -> &dyn Manager<M> {
        self.manager.as_ref()
    }
}

/// A manager bound to one model class under one name
pub struct BoundManager<M: Model> {
    name: String,
    model: Arc<ModelInfo>,
    registered: RegisteredManager<M>,
    is_default: bool,
}

impl<M: Model> BoundManager<M> {
    pub(crate) fn new(
        name: String,
        model: Arc<ModelInfo>,
        registered: RegisteredManager<M>,
        is_default: bool,
    ) -> Self {
        Self {
            name,
            model,
            registered,
            is_default,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The class this manager is bound to
    pub fn model(&self) -> &ModelInfo {
        &self.model
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Whether this is the built-in unfiltered manager
    pub fn is_builtin(&self) -> bool {
        self.registered.builtin
    }

    /// Rust type name of the registered manager
    pub fn type_name(&self) -> &'static str {
        self.registered.type_name
    }

    /// A fresh queryset for this manager's view of the table
    ///
    /// Each call builds a new queryset; chaining on one never affects
    /// another. Nothing is executed.
    pub fn get_queryset(&self) -> QuerySet<M> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::get_queryset_span(self.model.name(), &self.name).entered();

        self.registered
            .manager
            .get_queryset(QuerySet::unfiltered(Arc::clone(&self.model)))
    }

    pub(crate) fn downcast_ref<T: Manager<M>>(&self) -> Option<&T> {
        self.registered.any.downcast_ref::<T>()
    }
}

impl<M: Model> fmt::Debug for BoundManager<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundManager")
            .field("name", &self.name)
            .field("model", &self.model.name())
            .field("type", &self.registered.type_name)
            .field("is_default", &self.is_default)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, ModelClass};
    use crate::tests_cfg::{ActiveUsersManager, User};

    fn users() -> Arc<ModelClass<User>> {
        ModelClass::<User>::builder()
            .field(Field::char("name", 100))
            .field(Field::boolean("is_active"))
            .field(Field::integer("age").nullable())
            .manager("active", ActiveUsersManager)
            .manager("adults", ScopedManager::filtered(Filter::gte("age", 18)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_manager_is_unfiltered() {
        let users = users();
        let queryset = users.query();
        assert_eq!(queryset.select().filter_ref(), None);
        assert_eq!(queryset.to_sql(), r#"SELECT * FROM "users""#);
    }

    #[test]
    fn test_managers_return_independent_querysets() {
        let users = users();
        let active = users.queryset("active").unwrap();
        let adults = users.queryset("adults").unwrap();

        let narrowed = active.clone().filter(Filter::contains("name", "a"));

        assert_eq!(active.select().filter_ref(), Some(&Filter::eq("is_active", true)));
        assert_eq!(adults.select().filter_ref(), Some(&Filter::gte("age", 18)));
        assert_ne!(narrowed.select(), active.select());

        // a second call is not affected by chaining on the first
        let again = users.queryset("active").unwrap();
        assert_eq!(again.select(), active.select());
    }

    #[test]
    fn test_bound_manager_metadata() {
        let users = users();
        let active = users.manager("active").unwrap();
        assert_eq!(active.name(), "active");
        assert_eq!(active.model().table_name(), "users");
        assert!(!active.is_default());
        assert!(!active.is_builtin());
        assert!(active.type_name().ends_with("ActiveUsersManager"));
    }

    #[test]
    fn test_scoped_manager_requires_columns() {
        let err = ModelClass::<User>::builder()
            .field(Field::char("name", 100))
            .manager("adults", ScopedManager::filtered(Filter::gte("age", 18)))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("requires a `age` column"), "{err}");
    }

    #[test]
    fn test_scoped_manager_closure() {
        let users = ModelClass::<User>::builder()
            .field(Field::char("name", 100))
            .manager(
                "recent",
                ScopedManager::<User>::new(|all| all.order_by("id", crate::Direction::Desc).limit(3)),
            )
            .build()
            .unwrap();
        let sql = users.queryset("recent").unwrap().to_sql();
        assert!(sql.contains(r#"ORDER BY "id" DESC"#), "{sql}");
        assert!(sql.contains("LIMIT 3"), "{sql}");
    }
}
