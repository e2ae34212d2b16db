//! Registry of constructed model classes.
//!
//! A [`Registry`] builds model classes with one shared [`StewardConfig`] and
//! keeps them for lookup by type or by name. Registration runs the full
//! build-time validation; a definition that fails it is never stored, so it
//! cannot be queried through the registry.

use crate::config::StewardConfig;
use crate::executor::StewardError;
use crate::model::{ConfigurationError, Model, ModelBuilder, ModelClass, ModelInfo};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Entries {
    by_type: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    by_name: HashMap<String, Arc<ModelInfo>>,
}

/// Model classes keyed by type and by name
///
/// # Example
///
/// ```
/// use steward::{Field, Model, ModelClass, Registry};
///
/// # #[derive(Debug, serde::Deserialize)]
/// # struct User { id: i64, is_active: bool }
/// impl Model for User {
///     const NAME: &'static str = "User";
/// }
///
/// let registry = Registry::default();
/// registry.register(ModelClass::<User>::builder().field(Field::boolean("is_active")))?;
///
/// let users = registry.model::<User>()?;
/// assert_eq!(users.table_name(), "users");
/// assert!(registry.contains("User"));
/// # Ok::<(), steward::StewardError>(())
/// ```
#[derive(Default)]
pub struct Registry {
    config: StewardConfig,
    entries: RwLock<Entries>,
}

impl Registry {
    pub fn new(config: StewardConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn config(&self) -> &StewardConfig {
        &self.config
    }

    /// Build `builder` with this registry's configuration and store the class
    ///
    /// # Errors
    ///
    /// Returns `StewardError::Configuration` if the definition is invalid or a
    /// model with the same name is already registered. Nothing is stored in
    /// either case.
    pub fn register<M: Model>(&self, builder: ModelBuilder<M>) -> Result<Arc<ModelClass<M>>, StewardError> {
        let class = builder.build_with(&self.config).map_err(|e| {
            log::warn!("Rejected model '{}': {}", M::NAME, e);
            e
        })?;

        let mut entries = self.write()?;
        if entries.by_name.contains_key(class.name()) || entries.by_type.contains_key(&TypeId::of::<M>()) {
            return Err(ConfigurationError::DuplicateModel {
                model: class.name().to_string(),
            }
            .into());
        }

        entries
            .by_name
            .insert(class.name().to_string(), Arc::new(class.info().clone()));
        entries
            .by_type
            .insert(TypeId::of::<M>(), Arc::clone(&class) as Arc<dyn Any + Send + Sync>);

        log::info!(
            "Registered model '{}' (managers: {})",
            class.name(),
            class.manager_names().join(", ")
        );
        Ok(class)
    }

    /// The registered class for `M`
    ///
    /// # Errors
    ///
    /// Returns `StewardError::ModelNotRegistered` if `M` was never
    /// registered, or its registration failed.
    pub fn model<M: Model>(&self) -> Result<Arc<ModelClass<M>>, StewardError> {
        let entries = self.read()?;
        entries
            .by_type
            .get(&TypeId::of::<M>())
            .cloned()
            .and_then(|class| class.downcast::<ModelClass<M>>().ok())
            .ok_or_else(|| StewardError::ModelNotRegistered(M::NAME.to_string()))
    }

    /// Whether a model is registered under `name`
    ///
    /// A poisoned registry lock is logged and reads as empty.
    pub fn contains(&self, name: &str) -> bool {
        self.read_or_warn()
            .map(|e| e.by_name.contains_key(name))
            .unwrap_or(false)
    }

    /// Metadata of the model registered under `name`
    ///
    /// # Errors
    ///
    /// Returns `StewardError::ModelNotRegistered` if no model has that name.
    pub fn info(&self, name: &str) -> Result<Arc<ModelInfo>, StewardError> {
        self.read()?
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| StewardError::ModelNotRegistered(name.to_string()))
    }

    /// Registered model names, sorted
    ///
    /// A poisoned registry lock is logged and reads as empty.
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read_or_warn()
            .map(|e| e.by_name.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Number of registered models; a poisoned lock reads as 0
    pub fn len(&self) -> usize {
        self.read_or_warn().map(|e| e.by_name.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Entries>, StewardError> {
        self.entries
            .read()
            .map_err(|e| StewardError::Other(format!("Failed to lock model registry: {e}")))
    }

    fn read_or_warn(&self) -> Option<RwLockReadGuard<'_, Entries>> {
        self.read()
            .map_err(|e| log::warn!("Model registry unreadable: {e}"))
            .ok()
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Entries>, StewardError> {
        self.entries
            .write()
            .map_err(|e| StewardError::Other(format!("Failed to lock model registry: {e}")))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("models", &self.model_names())
            .finish()
    }
}
