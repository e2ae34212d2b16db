//! Definition-time error types.
//!
//! A `ConfigurationError` is raised while a model class is being built. It is
//! fatal to that class: `ModelBuilder::build` returns no class, so nothing can
//! be queried through it until the definition is corrected.

/// Errors detected while constructing a model class
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A table, field or manager name is not a valid identifier
    InvalidIdentifier { kind: &'static str, name: String },
    /// Two fields share a name
    DuplicateField { model: String, field: String },
    /// More than one field is marked as primary key
    MultiplePrimaryKeys { model: String, fields: Vec<String> },
    /// A field definition is inconsistent
    InvalidField {
        model: String,
        field: String,
        reason: String,
    },
    /// A manager name was registered twice
    DuplicateManager { model: String, manager: String },
    /// A manager was registered under the name of a per-row field
    ManagerShadowsField { model: String, manager: String },
    /// The designated default manager was never registered
    UnknownDefaultManager { model: String, manager: String },
    /// A manager rejected the model it was bound to
    ManagerCheckFailed {
        model: String,
        manager: String,
        reason: String,
    },
    /// A model with the same name is already registered
    DuplicateModel { model: String },
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::InvalidIdentifier { kind, name } => {
                write!(f, "Invalid {} name '{}': expected [A-Za-z_][A-Za-z0-9_]*", kind, name)
            }
            ConfigurationError::DuplicateField { model, field } => {
                write!(f, "Model '{}' declares field '{}' more than once", model, field)
            }
            ConfigurationError::MultiplePrimaryKeys { model, fields } => write!(
                f,
                "Model '{}' declares more than one primary key: {}",
                model,
                fields.join(", ")
            ),
            ConfigurationError::InvalidField {
                model,
                field,
                reason,
            } => write!(f, "Invalid field '{}' on model '{}': {}", field, model, reason),
            ConfigurationError::DuplicateManager { model, manager } => write!(
                f,
                "Manager '{}' is registered more than once on model '{}'",
                manager, model
            ),
            ConfigurationError::ManagerShadowsField { model, manager } => write!(
                f,
                "Manager '{}' on model '{}' has the same name as a field.\n\
                 Managers are class-level and cannot share a name with a per-row attribute.",
                manager, model
            ),
            ConfigurationError::UnknownDefaultManager { model, manager } => write!(
                f,
                "Default manager '{}' is not registered on model '{}'",
                manager, model
            ),
            ConfigurationError::ManagerCheckFailed {
                model,
                manager,
                reason,
            } => write!(
                f,
                "Manager '{}' cannot be bound to model '{}': {}",
                manager, model, reason
            ),
            ConfigurationError::DuplicateModel { model } => {
                write!(f, "Model '{}' is already registered", model)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing_message_names_both_sides() {
        let err = ConfigurationError::ManagerShadowsField {
            model: "User".to_string(),
            manager: "email".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("'email'"));
        assert!(display.contains("'User'"));
        assert!(display.contains("class-level"));
    }

    #[test]
    fn test_multiple_primary_keys_lists_fields() {
        let err = ConfigurationError::MultiplePrimaryKeys {
            model: "User".to_string(),
            fields: vec!["id".to_string(), "uuid".to_string()],
        };
        assert!(err.to_string().ends_with("id, uuid"));
    }
}
