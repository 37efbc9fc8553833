//! Records - column name to value maps for rows and candidate input

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};

/// A row returned by the database, or a candidate input for create/update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: HashMap<String, DatabaseValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<DatabaseValue>) -> Option<DatabaseValue> {
        self.values.insert(column.into(), value.into())
    }

    pub fn get(&self, column: &str) -> Option<&DatabaseValue> {
        self.values.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// True when the column is present and not `NULL`
    pub fn has_value(&self, column: &str) -> bool {
        self.values.get(column).is_some_and(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Get a typed value from a column
    pub fn get_as<T>(&self, column: &str) -> ModelResult<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let value = self
            .values
            .get(column)
            .ok_or_else(|| ModelError::Serialization(format!("Column '{}' not found", column)))?;
        serde_json::from_value(value.to_json()).map_err(|e| {
            ModelError::Serialization(format!("Failed to deserialize column '{}': {}", column, e))
        })
    }

    /// Try to get an optional typed value; absent and `NULL` both map to `None`
    pub fn try_get<T>(&self, column: &str) -> ModelResult<Option<T>>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        match self.values.get(column) {
            None | Some(DatabaseValue::Null) => Ok(None),
            Some(_) => self.get_as(column).map(Some),
        }
    }

    /// Convert record to a JSON object
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Build a record from a JSON object
    pub fn from_json(json: JsonValue) -> ModelResult<Self> {
        match json {
            JsonValue::Object(map) => Ok(map
                .into_iter()
                .map(|(k, v)| (k, DatabaseValue::from_json(v)))
                .collect()),
            other => Err(ModelError::parameter_type(
                "Record::from_json",
                "json",
                format!("a JSON object, got {}", other),
            )),
        }
    }

    pub fn into_map(self) -> HashMap<String, DatabaseValue> {
        self.values
    }
}

impl From<HashMap<String, DatabaseValue>> for Record {
    fn from(values: HashMap<String, DatabaseValue>) -> Self {
        Self { values }
    }
}

impl FromIterator<(String, DatabaseValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, DatabaseValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, DatabaseValue);
    type IntoIter = std::collections::hash_map::IntoIter<String, DatabaseValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
