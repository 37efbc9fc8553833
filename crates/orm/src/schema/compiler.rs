//! Column/Schema compiler
//!
//! Turns a [`ColumnSet`] plus a resolved [`ModelConfig`] into the SQL
//! fragments every CRUD statement and the table DDL are assembled from.
//! Pure: no I/O happens here.

use chrono::{DateTime, Utc};

use super::columns::ColumnSet;
use super::ddl::TableBuilder;
use crate::backends::DatabaseValue;
use crate::config::{ModelConfig, TimestampColumns, TimestampKind};
use crate::error::ModelResult;
use crate::record::Record;

/// Positional placeholder for a 1-based parameter index
pub fn placeholder(index: usize) -> String {
    format!("${}", index)
}

/// Compiled fragments of one model definition
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    /// `schema.table`
    pub table: String,
    pub table_schema: String,
    pub table_name: String,
    pub primary_key: String,
    pub columns: ColumnSet,
    pub timestamps: TimestampColumns,
    /// Deleted-at column used for filtering and soft deletes, when paranoid
    pub soft_delete_column: Option<String>,
    /// `id, col1, col2, created_at, ...`
    pub select_columns: String,
    /// `col1=COALESCE($1, col1),col2=COALESCE($2, col2),updated_at=$3`
    pub update_assignments: String,
    /// `col1, col2, created_at, deleted_at, updated_at`
    pub insert_columns: String,
    /// `$1,$2,$3,$4,$5`
    pub insert_placeholders: String,
    /// Body of the CREATE TABLE statement
    pub create_table_columns: String,
    pub column_count: usize,
}

impl CompiledSchema {
    pub fn compile(columns: &ColumnSet, config: &ModelConfig) -> ModelResult<Self> {
        columns.check(&config.primary_key_name, &config.timestamps)?;

        let timestamps = config.timestamps.enabled();
        let declared: Vec<&str> = columns.names().collect();
        let column_count = declared.len();

        let mut select = vec![config.primary_key_name.as_str()];
        select.extend(declared.iter().copied());
        select.extend(timestamps.iter().map(|(_, name)| *name));

        let mut assignments: Vec<String> = declared
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{}=COALESCE({}, {})", name, placeholder(i + 1), name))
            .collect();
        if let Some(updated_at) = config.timestamps.get(TimestampKind::UpdatedAt) {
            assignments.push(format!("{}={}", updated_at, placeholder(column_count + 1)));
        }

        let mut insert_columns: Vec<&str> = declared.clone();
        insert_columns.extend(timestamps.iter().map(|(_, name)| *name));
        let insert_placeholders: Vec<String> =
            (1..=insert_columns.len()).map(placeholder).collect();

        let mut table = TableBuilder::new(&config.qualified_table());
        table.id(&config.primary_key_name);
        for column in columns.iter() {
            table.column(&column.schema);
        }
        for (_, name) in &timestamps {
            table.timestamp(name);
        }

        let soft_delete_column = if config.paranoid {
            config.deleted_at_column().map(str::to_string)
        } else {
            None
        };

        Ok(Self {
            table: config.qualified_table(),
            table_schema: config.table_schema.clone(),
            table_name: config.table_name.clone(),
            primary_key: config.primary_key_name.clone(),
            columns: columns.clone(),
            timestamps: config.timestamps.clone(),
            soft_delete_column,
            select_columns: select.join(", "),
            update_assignments: assignments.join(","),
            insert_columns: insert_columns.join(", "),
            insert_placeholders: insert_placeholders.join(","),
            create_table_columns: table.definitions(),
            column_count,
        })
    }

    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table, self.create_table_columns
        )
    }

    pub fn select_sql(&self) -> String {
        format!("SELECT {} FROM {}", self.select_columns, self.table)
    }

    /// `<deleted_at> IS NULL` when soft deletes are active
    pub fn soft_delete_filter(&self) -> Option<String> {
        self.soft_delete_column
            .as_ref()
            .map(|column| format!("{} IS NULL", column))
    }

    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            self.table, self.insert_columns, self.insert_placeholders
        )
    }

    pub fn has_updated_at(&self) -> bool {
        self.timestamps.get(TimestampKind::UpdatedAt).is_some()
    }

    /// Number of parameters consumed by the SET clause
    pub fn update_param_count(&self) -> usize {
        self.column_count + usize::from(self.has_updated_at())
    }

    pub fn update_sql(&self) -> String {
        format!(
            "UPDATE {} SET {} WHERE {}={} RETURNING *",
            self.table,
            self.update_assignments,
            self.primary_key,
            placeholder(self.update_param_count() + 1)
        )
    }

    /// Candidate values in declaration order; absent or null keys become `NULL`
    pub fn arrange(&self, candidate: &Record) -> Vec<DatabaseValue> {
        self.columns
            .names()
            .map(|name| match candidate.get(name) {
                Some(value) if !value.is_null() => value.clone(),
                _ => DatabaseValue::Null,
            })
            .collect()
    }

    /// Timestamp parameters for an INSERT, in canonical order
    pub fn insert_timestamp_values(&self, now: DateTime<Utc>) -> Vec<DatabaseValue> {
        self.timestamps
            .enabled()
            .into_iter()
            .map(|(kind, _)| match kind {
                TimestampKind::CreatedAt | TimestampKind::UpdatedAt => DatabaseValue::DateTime(now),
                TimestampKind::DeletedAt => DatabaseValue::Null,
            })
            .collect()
    }

    /// Columns `find_one` may filter on
    pub fn is_queryable(&self, column: &str) -> bool {
        column == self.primary_key || self.columns.contains(column)
    }
}
