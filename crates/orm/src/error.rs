//! Error types for the ORM system
//!
//! A single error enum covers argument checks, validation, configuration,
//! schema reconciliation, foreign keys and the execution backend.

use crate::validation::ValidationError;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for ORM operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// A public method received an argument of the wrong shape
    #[error("Invalid parameter '{parameter}' for {method}: expected {expected}")]
    ParameterType {
        method: String,
        parameter: String,
        expected: String,
    },

    /// A column validator or hook rejected the input
    #[error("Validation error: {0}")]
    Validation(ValidationError),

    /// The model is misconfigured or used before it is defined
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Table creation, introspection or alteration failed
    #[error("Schema error on table '{table}' during {operation}: {message}")]
    Schema {
        table: String,
        operation: String,
        message: String,
    },

    /// Foreign key precondition or ALTER failed
    #[error("Constraint error for '{constraint}' in {method}: {message}")]
    Constraint {
        constraint: String,
        method: String,
        message: String,
    },

    /// Database query error
    #[error("Database error: {0}")]
    Database(String),

    /// Connection pool or URL error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ModelError {
    pub fn parameter_type(
        method: impl Into<String>,
        parameter: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        ModelError::ParameterType {
            method: method.into(),
            parameter: parameter.into(),
            expected: expected.into(),
        }
    }

    pub fn schema(
        table: impl Into<String>,
        operation: impl Into<String>,
        source: impl std::fmt::Display,
    ) -> Self {
        ModelError::Schema {
            table: table.into(),
            operation: operation.into(),
            message: source.to_string(),
        }
    }

    pub fn constraint(
        constraint: impl Into<String>,
        method: impl Into<String>,
        source: impl std::fmt::Display,
    ) -> Self {
        ModelError::Constraint {
            constraint: constraint.into(),
            method: method.into(),
            message: source.to_string(),
        }
    }

    /// Check whether the error came from a validator or hook rejection
    pub fn is_validation(&self) -> bool {
        matches!(self, ModelError::Validation(_))
    }
}

impl From<ValidationError> for ModelError {
    fn from(err: ValidationError) -> Self {
        ModelError::Validation(err)
    }
}

// Convert from sqlx errors
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}
