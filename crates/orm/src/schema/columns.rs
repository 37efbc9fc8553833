//! Column descriptors
//!
//! A [`ColumnSet`] is the ordered list of columns a model declares: the
//! column name, its raw DDL fragment and its validators.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::config::TimestampColumns;
use crate::error::{ModelError, ModelResult};
use crate::validation::Validator;

/// One declared column
#[derive(Clone)]
pub struct ColumnSpec {
    pub name: String,
    /// Raw DDL fragment, e.g. `fullname TEXT NOT NULL`
    pub schema: String,
    pub validations: Vec<Validator>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            validations: Vec::new(),
        }
    }

    /// Append a validator; validators run in the order they are added
    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validations.push(validator);
        self
    }
}

impl fmt::Debug for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("validations", &self.validations.len())
            .finish()
    }
}

/// Ordered column declarations of a model
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<ColumnSpec>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append
    pub fn column(mut self, spec: ColumnSpec) -> Self {
        self.columns.push(spec);
        self
    }

    pub fn push(&mut self, spec: ColumnSpec) {
        self.columns.push(spec);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Parse `{ "<name>": { "schema": "<ddl>" }, ... }` in document order.
    ///
    /// Validators cannot be expressed in JSON; attach them afterwards with
    /// [`ColumnSet::validate_column`].
    pub fn from_json(json: &JsonValue) -> ModelResult<Self> {
        let map = json.as_object().ok_or_else(|| {
            ModelError::parameter_type("define", "columns", "a mapping of column name to column spec")
        })?;

        let mut set = ColumnSet::new();
        for (name, spec) in map {
            let schema = spec
                .get("schema")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| {
                    ModelError::parameter_type("define", format!("columns.{}.schema", name), "a DDL string")
                })?;
            set.push(ColumnSpec::new(name.clone(), schema));
        }
        Ok(set)
    }

    /// Attach a validator to an already declared column
    pub fn validate_column(mut self, name: &str, validator: Validator) -> ModelResult<Self> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| ModelError::Configuration(format!("Unknown column '{}'", name)))?;
        column.validations.push(validator);
        Ok(self)
    }

    /// Reject sets the compiler cannot turn into consistent SQL
    pub fn check(&self, primary_key: &str, timestamps: &TimestampColumns) -> ModelResult<()> {
        if self.columns.is_empty() {
            return Err(ModelError::Configuration(
                "A model needs at least one declared column".to_string(),
            ));
        }

        let mut stamps = HashSet::new();
        for (kind, name) in timestamps.enabled() {
            if name == primary_key {
                return Err(ModelError::Configuration(format!(
                    "Timestamp column '{}' ({}) collides with the primary key",
                    name,
                    kind.key()
                )));
            }
            if !stamps.insert(name) {
                return Err(ModelError::Configuration(format!(
                    "Timestamp column '{}' is used for more than one timestamp",
                    name
                )));
            }
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(ModelError::Configuration(
                    "Column names must not be empty".to_string(),
                ));
            }
            if column.schema.trim().is_empty() {
                return Err(ModelError::Configuration(format!(
                    "Column '{}' has an empty schema fragment",
                    column.name
                )));
            }
            if column.name == primary_key {
                return Err(ModelError::Configuration(format!(
                    "Column '{}' is the implicit primary key and cannot be declared",
                    column.name
                )));
            }
            if timestamps.contains(&column.name) {
                return Err(ModelError::Configuration(format!(
                    "Column '{}' collides with a timestamp column",
                    column.name
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(ModelError::Configuration(format!(
                    "Column '{}' is declared more than once",
                    column.name
                )));
            }

            let leading = column
                .schema
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .trim_matches('"');
            if !leading.eq_ignore_ascii_case(&column.name) {
                tracing::warn!(
                    "Schema fragment for column '{}' starts with '{}'; additive ALTER statements use the fragment verbatim",
                    column.name,
                    leading
                );
            }
        }
        Ok(())
    }
}
