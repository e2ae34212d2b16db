//! Model class construction and manager resolution.

use crate::config::StewardConfig;
use crate::executor::StewardError;
use crate::model::{default_table_name, is_identifier, ConfigurationError, Field, Model, ModelInfo};
use crate::query::manager::{BoundManager, DefaultManager, Manager, RegisteredManager};
use crate::query::QuerySet;
use std::fmt;
use std::sync::Arc;

/// Explicit definition step for a model class
///
/// Fields and managers are registered against names; nothing is validated
/// until [`build`](ModelBuilder::build), which either produces the class or
/// fails with a [`ConfigurationError`]. A failed build leaves no class behind.
pub struct ModelBuilder<M: Model> {
    table_name: Option<String>,
    fields: Vec<Field>,
    managers: Vec<(String, RegisteredManager<M>)>,
    default_manager: Option<String>,
}

impl<M: Model> ModelBuilder<M> {
    pub(crate) fn new() -> Self {
        Self {
            table_name: None,
            fields: Vec::new(),
            managers: Vec::new(),
            default_manager: None,
        }
    }

    /// Override the table name derived from `M::NAME`
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Declare a column
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Register `manager` under `name`
    ///
    /// Registering under the default name (`query` unless configured
    /// otherwise) replaces the built-in unfiltered manager. Every unqualified
    /// query through the class is then scoped by this manager's
    /// `get_queryset`, so rows it filters out are invisible to callers that
    /// do not name another manager.
    pub fn manager<T: Manager<M>>(mut self, name: impl Into<String>, manager: T) -> Self {
        self.managers.push((name.into(), RegisteredManager::new(manager)));
        self
    }

    /// Designate a registered manager as the default instead of the
    /// conventional name
    pub fn default_manager(mut self, name: impl Into<String>) -> Self {
        self.default_manager = Some(name.into());
        self
    }

    /// Validate the definition and construct the class with default settings
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if any table, field or manager
    /// declaration is invalid.
    pub fn build(self) -> Result<Arc<ModelClass<M>>, ConfigurationError> {
        self.build_with(&StewardConfig::default())
    }

    /// Validate the definition and construct the class
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if any table, field or manager
    /// declaration is invalid.
    pub fn build_with(self, config: &StewardConfig) -> Result<Arc<ModelClass<M>>, ConfigurationError> {
        let model = M::NAME.to_string();
        if !is_identifier(&model) {
            return Err(ConfigurationError::InvalidIdentifier {
                kind: "model",
                name: model,
            });
        }

        let table_name = self
            .table_name
            .unwrap_or_else(|| default_table_name(&model));
        if !is_identifier(&table_name) {
            return Err(ConfigurationError::InvalidIdentifier {
                kind: "table",
                name: table_name,
            });
        }

        let fields = validate_fields(&model, self.fields)?;
        let has_field = |name: &str| fields.iter().any(|f| f.name() == name);

        let mut managers = self.managers;
        for (index, (name, _)) in managers.iter().enumerate() {
            if !is_identifier(name) {
                return Err(ConfigurationError::InvalidIdentifier {
                    kind: "manager",
                    name: name.clone(),
                });
            }
            if managers[..index].iter().any(|(other, _)| other == name) {
                return Err(ConfigurationError::DuplicateManager {
                    model,
                    manager: name.clone(),
                });
            }
            if has_field(name) {
                return Err(ConfigurationError::ManagerShadowsField {
                    model,
                    manager: name.clone(),
                });
            }
        }

        let default_name = match self.default_manager {
            Some(name) => {
                if !managers.iter().any(|(registered, _)| *registered == name) {
                    return Err(ConfigurationError::UnknownDefaultManager {
                        model,
                        manager: name,
                    });
                }
                name
            }
            None => config.default_manager.clone(),
        };

        if !managers.iter().any(|(name, _)| *name == default_name) {
            if !is_identifier(&default_name) {
                return Err(ConfigurationError::InvalidIdentifier {
                    kind: "manager",
                    name: default_name,
                });
            }
            if has_field(&default_name) {
                return Err(ConfigurationError::ManagerShadowsField {
                    model,
                    manager: default_name,
                });
            }
            managers.insert(0, (default_name.clone(), RegisteredManager::new(DefaultManager)));
        }

        let info = Arc::new(ModelInfo::new(
            model,
            table_name,
            fields,
            config.strict_columns,
        ));

        for (name, registered) in &managers {
            registered
                .manager()
                .check(&info)
                .map_err(|reason| ConfigurationError::ManagerCheckFailed {
                    model: info.name().to_string(),
                    manager: name.clone(),
                    reason,
                })?;
        }

        let mut default_index = 0;
        let bound: Vec<BoundManager<M>> = managers
            .into_iter()
            .enumerate()
            .map(|(index, (name, registered))| {
                let is_default = name == default_name;
                if is_default {
                    default_index = index;
                }
                BoundManager::new(name, Arc::clone(&info), registered, is_default)
            })
            .collect();

        let default = &bound[default_index];
        if !default.is_builtin() {
            log::info!(
                "Model '{}': default manager '{}' is {}; unqualified queries are scoped by it",
                info.name(),
                default.name(),
                default.type_name()
            );
        }
        log::debug!(
            "Built model class '{}' (table '{}', {} field(s), managers: {})",
            info.name(),
            info.table_name(),
            info.fields().len(),
            bound.iter().map(BoundManager::name).collect::<Vec<_>>().join(", ")
        );

        Ok(Arc::new(ModelClass {
            info,
            managers: bound,
            default_index,
        }))
    }
}

fn validate_fields(model: &str, declared: Vec<Field>) -> Result<Vec<Field>, ConfigurationError> {
    for (index, field) in declared.iter().enumerate() {
        if !is_identifier(field.name()) {
            return Err(ConfigurationError::InvalidIdentifier {
                kind: "field",
                name: field.name().to_string(),
            });
        }
        if declared[..index].iter().any(|f| f.name() == field.name()) {
            return Err(ConfigurationError::DuplicateField {
                model: model.to_string(),
                field: field.name().to_string(),
            });
        }
        if let Some(reason) = field.problem() {
            return Err(ConfigurationError::InvalidField {
                model: model.to_string(),
                field: field.name().to_string(),
                reason,
            });
        }
    }

    let primary_keys: Vec<String> = declared
        .iter()
        .filter(|f| f.is_primary_key())
        .map(|f| f.name().to_string())
        .collect();
    if primary_keys.len() > 1 {
        return Err(ConfigurationError::MultiplePrimaryKeys {
            model: model.to_string(),
            fields: primary_keys,
        });
    }
    if !primary_keys.is_empty() {
        return Ok(declared);
    }

    // No primary key declared: add the implicit `id`
    if declared.iter().any(|f| f.name() == "id") {
        return Err(ConfigurationError::InvalidField {
            model: model.to_string(),
            field: "id".to_string(),
            reason: "'id' must be the primary key when no other primary key is declared"
                .to_string(),
        });
    }
    let mut fields = Vec::with_capacity(declared.len() + 1);
    fields.push(Field::big_integer("id").primary_key());
    fields.extend(declared);
    Ok(fields)
}

/// A constructed model class
///
/// Holds the model's metadata and its managers, each bound to this class
/// under one name. Exactly one manager is the default.
pub struct ModelClass<M: Model> {
    info: Arc<ModelInfo>,
    managers: Vec<BoundManager<M>>,
    default_index: usize,
}

impl<M: Model> ModelClass<M> {
    /// Start defining the class for `M`
    pub fn builder() -> ModelBuilder<M> {
        ModelBuilder::new()
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        self.info.name()
    }

    pub fn table_name(&self) -> &str {
        self.info.table_name()
    }

    /// Queryset of the default manager
    ///
    /// If a custom manager was registered as the default, the queryset is
    /// already scoped by it.
    pub fn query(&self) -> QuerySet<M> {
        self.default_manager().get_queryset()
    }

    pub fn default_manager(&self) -> &BoundManager<M> {
        &self.managers[self.default_index]
    }

    /// Look up a manager by name
    ///
    /// # Errors
    ///
    /// Returns `StewardError::UnknownManager` if no manager has that name.
    pub fn manager(&self, name: &str) -> Result<&BoundManager<M>, StewardError> {
        self.managers
            .iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| StewardError::UnknownManager {
                model: self.info.name().to_string(),
                manager: name.to_string(),
            })
    }

    /// Queryset of the manager registered under `name`
    ///
    /// # Errors
    ///
    /// Returns `StewardError::UnknownManager` if no manager has that name.
    pub fn queryset(&self, name: &str) -> Result<QuerySet<M>, StewardError> {
        self.manager(name).map(BoundManager::get_queryset)
    }

    /// Registered manager names, default first when it was implicit
    pub fn manager_names(&self) -> Vec<&str> {
        self.managers.iter().map(BoundManager::name).collect()
    }

    pub fn managers(&self) -> impl Iterator<Item = &BoundManager<M>> {
        self.managers.iter()
    }

    /// The manager under `name` as its concrete type, for custom query helpers
    ///
    /// # Errors
    ///
    /// Returns `StewardError::UnknownManager` if no manager has that name and
    /// `StewardError::Other` if it is not a `T`.
    pub fn downcast_manager<T: Manager<M>>(&self, name: &str) -> Result<&T, StewardError> {
        let bound = self.manager(name)?;
        bound.downcast_ref::<T>().ok_or_else(|| {
            StewardError::Other(format!(
                "Manager '{}' on model '{}' is a {}, not a {}",
                name,
                self.info.name(),
                bound.type_name(),
                std::any::type_name::<T>()
            ))
        })
    }
}

impl<M: Model> fmt::Debug for ModelClass<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass")
            .field("info", &self.info)
            .field("managers", &self.manager_names())
            .field("default", &self.default_manager().name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::manager::ScopedManager;
    use crate::tests_cfg::{ActiveUsersManager, User};
    use crate::Filter;

    fn user_fields(builder: ModelBuilder<User>) -> ModelBuilder<User> {
        builder
            .field(Field::char("name", 100))
            .field(Field::boolean("is_active"))
    }

    #[test]
    fn test_implicit_default_manager() {
        let users = user_fields(ModelClass::<User>::builder()).build().unwrap();

        assert_eq!(users.manager_names(), vec!["query"]);
        assert!(users.default_manager().is_default());
        assert!(users.default_manager().is_builtin());
        assert_eq!(users.query().select().filter_ref(), None);
    }

    #[test]
    fn test_implicit_primary_key() {
        let users = user_fields(ModelClass::<User>::builder()).build().unwrap();
        assert_eq!(users.info().fields()[0], Field::big_integer("id").primary_key());
    }

    #[test]
    fn test_declared_primary_key_is_kept() {
        let users = ModelClass::<User>::builder()
            .field(Field::char("name", 100).primary_key())
            .build()
            .unwrap();
        assert_eq!(users.info().primary_key().map(Field::name), Some("name"));
        assert!(!users.info().has_field("id"));
    }

    #[test]
    fn test_custom_default_manager_overrides_builtin() {
        let users = user_fields(ModelClass::<User>::builder())
            .manager("query", ActiveUsersManager)
            .build()
            .unwrap();

        assert_eq!(users.manager_names(), vec!["query"]);
        assert!(!users.default_manager().is_builtin());
        assert_eq!(
            users.query().select().filter_ref(),
            Some(&Filter::eq("is_active", true))
        );
    }

    #[test]
    fn test_explicit_default_designation() {
        let users = user_fields(ModelClass::<User>::builder())
            .manager("objects", ActiveUsersManager)
            .default_manager("objects")
            .build()
            .unwrap();

        assert_eq!(users.default_manager().name(), "objects");
        assert!(users.manager("query").is_err());
    }

    #[test]
    fn test_unknown_default_designation_fails() {
        let err = user_fields(ModelClass::<User>::builder())
            .default_manager("objects")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownDefaultManager { .. }));
    }

    #[test]
    fn test_manager_shadowing_field_fails() {
        let err = user_fields(ModelClass::<User>::builder())
            .manager("is_active", ActiveUsersManager)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::ManagerShadowsField {
                model: "User".to_string(),
                manager: "is_active".to_string(),
            }
        );
    }

    #[test]
    fn test_field_named_like_default_manager_fails() {
        let err = ModelClass::<User>::builder()
            .field(Field::text("query"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::ManagerShadowsField { .. }));
    }

    #[test]
    fn test_duplicate_manager_fails() {
        let err = user_fields(ModelClass::<User>::builder())
            .manager("active", ActiveUsersManager)
            .manager("active", DefaultManager)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateManager { .. }));
    }

    #[test]
    fn test_invalid_manager_name_fails() {
        let err = user_fields(ModelClass::<User>::builder())
            .manager("active users", ActiveUsersManager)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidIdentifier {
                kind: "manager",
                name: "active users".to_string(),
            }
        );
    }

    #[test]
    fn test_manager_check_runs_at_build_time() {
        // ActiveUsersManager needs an `is_active` column
        let err = ModelClass::<User>::builder()
            .field(Field::char("name", 100))
            .manager("query", ActiveUsersManager)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::ManagerCheckFailed { .. }));
    }

    #[test]
    fn test_field_validation() {
        let err = ModelClass::<User>::builder()
            .field(Field::boolean("is_active"))
            .field(Field::boolean("is_active"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateField { .. }));

        let err = ModelClass::<User>::builder()
            .field(Field::integer("a").primary_key())
            .field(Field::integer("b").primary_key())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MultiplePrimaryKeys { .. }));

        let err = ModelClass::<User>::builder()
            .field(Field::integer("id"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidField { .. }));

        let err = ModelClass::<User>::builder()
            .table_name("user table")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidIdentifier { kind: "table", .. }));
    }

    #[test]
    fn test_configured_default_name() {
        let config = StewardConfig {
            default_manager: "objects".to_string(),
            ..StewardConfig::default()
        };
        let users = user_fields(ModelClass::<User>::builder())
            .build_with(&config)
            .unwrap();
        assert_eq!(users.default_manager().name(), "objects");
    }

    #[test]
    fn test_downcast_manager() {
        let users = user_fields(ModelClass::<User>::builder())
            .manager("active", ActiveUsersManager)
            .manager(
                "named",
                ScopedManager::filtered(Filter::ne("name", serde_json::Value::Null)),
            )
            .build()
            .unwrap();

        let active = users.downcast_manager::<ActiveUsersManager>("active").unwrap();
        let ada = active.named(users.query(), "Ada");
        assert_eq!(
            ada.select().filter_ref(),
            Some(&Filter::eq("is_active", true).and(Filter::eq("name", "Ada")))
        );
        assert!(users.downcast_manager::<DefaultManager>("query").is_ok());
        let err = users.downcast_manager::<ActiveUsersManager>("named").unwrap_err();
        assert!(err.to_string().contains("is a"), "{err}");
    }

    #[test]
    fn test_unknown_manager_lookup() {
        let users = user_fields(ModelClass::<User>::builder()).build().unwrap();
        let err = users.queryset("archived").unwrap_err();
        assert!(matches!(err, StewardError::UnknownManager { .. }));
    }
}
