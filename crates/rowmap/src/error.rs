//! Error types for rowmap

use thiserror::Error;

/// Result type alias for rowmap operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Errors raised while declaring a model.
///
/// These are detected once, when the model's schema is first built, and are
/// cached alongside it, so the type is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// No field was declared with `primary_key`.
    #[error("Primary key not found for model '{model}'")]
    MissingPrimaryKey { model: String },

    /// More than one field was declared with `primary_key`.
    #[error("Duplicate primary key for model '{model}': field '{field}'")]
    DuplicatePrimaryKey { model: String, field: String },

    /// The same attribute name was declared twice.
    #[error("Duplicate field '{field}' in model '{model}'")]
    DuplicateField { model: String, field: String },

    /// Two attributes resolve to the same column.
    #[error("Duplicate column '{column}' in model '{model}'")]
    DuplicateColumn { model: String, column: String },

    /// A table, attribute or column name is not a plain SQL identifier.
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),
}

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Model declaration error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// `find_all` limit is neither a count nor an (offset, count) pair
    #[error("Invalid limit value: {0}")]
    InvalidLimitValue(String),

    /// Attribute-style access to a column absent from the row
    #[error("'{model}' object has no attribute '{attribute}'")]
    AttributeNotFound { model: String, attribute: String },

    /// Query execution error, as reported by the driver
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Pool checkout error
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid pool configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an attribute-not-found error
    pub fn attribute_not_found(model: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            model: model.into(),
            attribute: attribute.into(),
        }
    }

    /// Create an invalid-limit error
    pub fn invalid_limit(value: impl std::fmt::Display) -> Self {
        Self::InvalidLimitValue(value.to_string())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a model declaration error
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Check if this is an attribute-not-found error
    pub fn is_attribute_not_found(&self) -> bool {
        matches!(self, Self::AttributeNotFound { .. })
    }

    /// Check if this is an invalid-limit error
    pub fn is_invalid_limit(&self) -> bool {
        matches!(self, Self::InvalidLimitValue(_))
    }
}
