//! Column declarations for model classes.

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Whether `name` can be used as a table, column or manager name
pub(crate) fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Storage kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    BigInteger,
    Float,
    Boolean,
    Char { max_length: usize },
    Text,
    DateTime,
    Json,
}

impl FieldKind {
    /// PostgreSQL column type
    pub fn sql_type(&self) -> String {
        match self {
            FieldKind::Integer => "INTEGER".to_string(),
            FieldKind::BigInteger => "BIGINT".to_string(),
            FieldKind::Float => "DOUBLE PRECISION".to_string(),
            FieldKind::Boolean => "BOOLEAN".to_string(),
            FieldKind::Char { max_length } => format!("VARCHAR({max_length})"),
            FieldKind::Text => "TEXT".to_string(),
            FieldKind::DateTime => "TIMESTAMPTZ".to_string(),
            FieldKind::Json => "JSONB".to_string(),
        }
    }
}

/// A declared column of a model
///
/// # Example
///
/// ```
/// use steward::{Field, FieldKind};
///
/// let email = Field::char("email", 100);
/// assert_eq!(email.kind(), FieldKind::Char { max_length: 100 });
/// assert!(!email.is_nullable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    kind: FieldKind,
    primary_key: bool,
    nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            primary_key: false,
            nullable: false,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn big_integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::BigInteger)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn char(name: impl Into<String>, max_length: usize) -> Self {
        Self::new(name, FieldKind::Char { max_length })
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Json)
    }

    /// Mark as the model's primary key
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allow NULL values
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Reason this declaration is unusable, if any
    pub(crate) fn problem(&self) -> Option<String> {
        if let FieldKind::Char { max_length: 0 } = self.kind {
            return Some("CHAR fields need a max_length greater than zero".to_string());
        }
        if self.primary_key && self.nullable {
            return Some("a primary key cannot be nullable".to_string());
        }
        None
    }
}
