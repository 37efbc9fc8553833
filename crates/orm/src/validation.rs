//! Validation pipeline for column input
//!
//! Each declared column carries an ordered list of validators. The pipeline
//! walks columns in declaration order and stops at the first failure.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};
use crate::record::Record;
use crate::schema::columns::ColumnSet;

/// Validation error for a specific field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: "validation_failed".to_string(),
        }
    }

    /// Create a validation error with a specific code
    pub fn with_code(
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// A column validator: `(value, column_name, whole_candidate)`.
///
/// Absent keys are passed as [`DatabaseValue::Null`].
pub type Validator =
    Arc<dyn Fn(&DatabaseValue, &str, &Record) -> Result<(), ValidationError> + Send + Sync>;

/// Wrap a closure as a [`Validator`]
pub fn validator<F>(f: F) -> Validator
where
    F: Fn(&DatabaseValue, &str, &Record) -> Result<(), ValidationError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Run every column's validators against `candidate`.
///
/// The first failing validator aborts the run; later columns are not checked.
pub fn validate(columns: &ColumnSet, candidate: &Record) -> ModelResult<()> {
    for column in columns.iter() {
        let value = candidate.get(&column.name).unwrap_or(&DatabaseValue::Null);
        for check in &column.validations {
            check(value, &column.name, candidate).map_err(ModelError::Validation)?;
        }
    }
    Ok(())
}

/// Rejects `NULL` and absent values
pub fn required() -> Validator {
    validator(|value, column, _| {
        if value.is_null() {
            return Err(ValidationError::with_code(column, "is required", "required"));
        }
        Ok(())
    })
}

/// Requires a string with at least one non-whitespace character
pub fn non_empty_string() -> Validator {
    validator(|value, column, _| match value {
        DatabaseValue::String(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(ValidationError::with_code(
            column,
            "must be a non-empty string",
            "non_empty_string",
        )),
    })
}

/// Limits string length in characters; `NULL` passes
pub fn max_length(max: usize) -> Validator {
    validator(move |value, column, _| match value {
        DatabaseValue::String(s) if s.chars().count() > max => Err(ValidationError::with_code(
            column,
            format!("must be at most {} characters", max),
            "max_length",
        )),
        _ => Ok(()),
    })
}

/// Requires string values to match `pattern`; `NULL` passes
pub fn matches(pattern: &str) -> ModelResult<Validator> {
    let regex = Regex::new(pattern).map_err(|e| {
        ModelError::Configuration(format!("Invalid validation pattern '{}': {}", pattern, e))
    })?;
    Ok(validator(move |value, column, _| match value {
        DatabaseValue::String(s) if !regex.is_match(s) => Err(ValidationError::with_code(
            column,
            format!("does not match pattern {}", regex.as_str()),
            "pattern",
        )),
        _ => Ok(()),
    }))
}

/// Requires integer values within `min..=max`; `NULL` passes
pub fn int_range(min: i64, max: i64) -> Validator {
    validator(move |value, column, _| {
        let number = match value {
            DatabaseValue::Null => return Ok(()),
            DatabaseValue::Int32(i) => i64::from(*i),
            DatabaseValue::Int64(i) => *i,
            _ => {
                return Err(ValidationError::with_code(column, "must be an integer", "integer"))
            }
        };
        if number < min || number > max {
            return Err(ValidationError::with_code(
                column,
                format!("must be between {} and {}", min, max),
                "range",
            ));
        }
        Ok(())
    })
}
