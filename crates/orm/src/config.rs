//! Model configuration
//!
//! Options are layered: built-in defaults < [`GlobalOptions`] < per-model
//! [`ModelOptions`]. The result is an immutable [`ModelConfig`] captured by
//! each model at construction, so later changes to the global layer never
//! leak into models that already exist.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TABLE_SCHEMA: &str = "public";
pub const DEFAULT_PRIMARY_KEY: &str = "id";
pub const DEFAULT_CREATED_AT: &str = "created_at";
pub const DEFAULT_UPDATED_AT: &str = "updated_at";
pub const DEFAULT_DELETED_AT: &str = "deleted_at";

/// Logical timestamp columns, ordered alphabetically by key.
///
/// This ordering is used for every generated fragment: select list, insert
/// column list, insert placeholders, insert values and DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimestampKind {
    CreatedAt,
    DeletedAt,
    UpdatedAt,
}

impl TimestampKind {
    pub const ALL: [TimestampKind; 3] = [
        TimestampKind::CreatedAt,
        TimestampKind::DeletedAt,
        TimestampKind::UpdatedAt,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            TimestampKind::CreatedAt => "created_at",
            TimestampKind::DeletedAt => "deleted_at",
            TimestampKind::UpdatedAt => "updated_at",
        }
    }
}

/// Column names for the timestamp columns; `None` entries are disabled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampNames {
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub deleted_at: Option<String>,
}

impl TimestampNames {
    /// All three columns with their default names
    pub fn standard() -> Self {
        Self {
            created_at: Some(DEFAULT_CREATED_AT.to_string()),
            updated_at: Some(DEFAULT_UPDATED_AT.to_string()),
            deleted_at: Some(DEFAULT_DELETED_AT.to_string()),
        }
    }

    fn fill_from(&self, fallback: &TimestampNames) -> TimestampNames {
        TimestampNames {
            created_at: self.created_at.clone().or_else(|| fallback.created_at.clone()),
            updated_at: self.updated_at.clone().or_else(|| fallback.updated_at.clone()),
            deleted_at: self.deleted_at.clone().or_else(|| fallback.deleted_at.clone()),
        }
    }
}

/// The `timestamps` option: a flag or a rename map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamps {
    Enabled(bool),
    Named(TimestampNames),
}

impl From<bool> for Timestamps {
    fn from(enabled: bool) -> Self {
        Timestamps::Enabled(enabled)
    }
}

impl From<TimestampNames> for Timestamps {
    fn from(names: TimestampNames) -> Self {
        Timestamps::Named(names)
    }
}

/// Resolved timestamp columns of one model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampColumns {
    names: TimestampNames,
}

impl TimestampColumns {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(names: TimestampNames) -> Self {
        Self { names }
    }

    pub fn get(&self, kind: TimestampKind) -> Option<&str> {
        match kind {
            TimestampKind::CreatedAt => self.names.created_at.as_deref(),
            TimestampKind::DeletedAt => self.names.deleted_at.as_deref(),
            TimestampKind::UpdatedAt => self.names.updated_at.as_deref(),
        }
    }

    /// Enabled columns in canonical order
    pub fn enabled(&self) -> Vec<(TimestampKind, &str)> {
        TimestampKind::ALL
            .iter()
            .filter_map(|kind| self.get(*kind).map(|name| (*kind, name)))
            .collect()
    }

    pub fn is_enabled(&self) -> bool {
        !self.enabled().is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.enabled().iter().any(|(_, name)| *name == column)
    }
}

/// Process-level defaults shared by every model of a [`crate::Database`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalOptions {
    pub table_prefix: Option<String>,
    pub table_schema: Option<String>,
    pub primary_key_name: Option<String>,
    pub timestamps: Option<Timestamps>,
    /// Names used when a model enables timestamps with `true`
    pub timestamp_names: Option<TimestampNames>,
    pub paranoid: Option<bool>,
    pub alter_on_define: Option<bool>,
    pub error_logging: Option<bool>,
}

impl GlobalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = Some(prefix.into());
        self
    }

    pub fn table_schema(mut self, schema: impl Into<String>) -> Self {
        self.table_schema = Some(schema.into());
        self
    }

    pub fn primary_key_name(mut self, name: impl Into<String>) -> Self {
        self.primary_key_name = Some(name.into());
        self
    }

    pub fn timestamps(mut self, timestamps: impl Into<Timestamps>) -> Self {
        self.timestamps = Some(timestamps.into());
        self
    }

    pub fn timestamp_names(mut self, names: TimestampNames) -> Self {
        self.timestamp_names = Some(names);
        self
    }

    pub fn paranoid(mut self, paranoid: bool) -> Self {
        self.paranoid = Some(paranoid);
        self
    }

    pub fn alter_on_define(mut self, alter: bool) -> Self {
        self.alter_on_define = Some(alter);
        self
    }

    pub fn error_logging(mut self, enabled: bool) -> Self {
        self.error_logging = Some(enabled);
        self
    }
}

/// Per-model options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    /// Explicit base table name; defaults to the model name
    pub table_name: Option<String>,
    pub table_prefix: Option<String>,
    pub table_schema: Option<String>,
    pub primary_key_name: Option<String>,
    pub timestamps: Option<Timestamps>,
    pub paranoid: Option<bool>,
    pub alter_on_define: Option<bool>,
    pub error_logging: Option<bool>,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = Some(prefix.into());
        self
    }

    pub fn table_schema(mut self, schema: impl Into<String>) -> Self {
        self.table_schema = Some(schema.into());
        self
    }

    pub fn primary_key_name(mut self, name: impl Into<String>) -> Self {
        self.primary_key_name = Some(name.into());
        self
    }

    pub fn timestamps(mut self, timestamps: impl Into<Timestamps>) -> Self {
        self.timestamps = Some(timestamps.into());
        self
    }

    pub fn paranoid(mut self, paranoid: bool) -> Self {
        self.paranoid = Some(paranoid);
        self
    }

    pub fn alter_on_define(mut self, alter: bool) -> Self {
        self.alter_on_define = Some(alter);
        self
    }

    pub fn error_logging(mut self, enabled: bool) -> Self {
        self.error_logging = Some(enabled);
        self
    }
}

/// Fully resolved, immutable model configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub name: String,
    pub table_name: String,
    pub table_schema: String,
    pub primary_key_name: String,
    pub timestamps: TimestampColumns,
    pub paranoid: bool,
    pub alter_on_define: bool,
    pub error_logging: bool,
}

impl ModelConfig {
    /// Merge defaults < global < model
    pub fn resolve(name: &str, global: &GlobalOptions, options: &ModelOptions) -> Self {
        let prefix = options
            .table_prefix
            .as_deref()
            .or(global.table_prefix.as_deref())
            .unwrap_or("");
        let base = options.table_name.as_deref().unwrap_or(name);

        let default_names = global
            .timestamp_names
            .as_ref()
            .map(|names| names.fill_from(&TimestampNames::standard()))
            .unwrap_or_else(TimestampNames::standard);

        let timestamps = match options.timestamps.as_ref().or(global.timestamps.as_ref()) {
            Some(Timestamps::Enabled(true)) => TimestampColumns::new(default_names),
            Some(Timestamps::Named(names)) => TimestampColumns::new(names.clone()),
            Some(Timestamps::Enabled(false)) | None => TimestampColumns::disabled(),
        };

        Self {
            name: name.to_string(),
            table_name: format!("{}{}", prefix, base),
            table_schema: options
                .table_schema
                .clone()
                .or_else(|| global.table_schema.clone())
                .unwrap_or_else(|| DEFAULT_TABLE_SCHEMA.to_string()),
            primary_key_name: options
                .primary_key_name
                .clone()
                .or_else(|| global.primary_key_name.clone())
                .unwrap_or_else(|| DEFAULT_PRIMARY_KEY.to_string()),
            timestamps,
            paranoid: options.paranoid.or(global.paranoid).unwrap_or(false),
            alter_on_define: options.alter_on_define.or(global.alter_on_define).unwrap_or(false),
            error_logging: options.error_logging.or(global.error_logging).unwrap_or(true),
        }
    }

    /// `schema.table`, used in every generated statement
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.table_schema, self.table_name)
    }

    /// Name of the soft-delete column, if the model has one
    pub fn deleted_at_column(&self) -> Option<&str> {
        self.timestamps.get(TimestampKind::DeletedAt)
    }

    /// Soft deletes need a deleted-at column to write to
    pub fn soft_delete_ready(&self) -> bool {
        !self.paranoid || self.deleted_at_column().is_some()
    }
}
