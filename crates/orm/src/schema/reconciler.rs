//! Schema reconciler
//!
//! Creates the model table if needed, then compares the declared columns
//! with the live table and adds whatever is missing. Reconciliation is
//! additive only: columns are never dropped or retyped.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use super::compiler::CompiledSchema;
use super::ddl::AlterTableBuilder;
use crate::backends::{DatabaseValue, QueryExecutor};
use crate::error::{ModelError, OrmResult};

const LIVE_COLUMNS_SQL: &str =
    "SELECT column_name::text AS column_name FROM information_schema.columns WHERE table_schema = $1 AND table_name = $2";

/// What a reconciliation run found and changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Declared columns absent from the live table
    pub missing_columns: Vec<String>,
    /// Enabled timestamp columns absent from the live table
    pub missing_timestamps: Vec<String>,
    /// Whether an ALTER TABLE was issued
    pub altered: bool,
}

impl ReconcileReport {
    pub fn has_drift(&self) -> bool {
        !self.missing_columns.is_empty() || !self.missing_timestamps.is_empty()
    }
}

/// Create the table and add missing columns.
///
/// `created` is set as soon as CREATE TABLE succeeds.
pub async fn reconcile(
    executor: &dyn QueryExecutor,
    schema: &CompiledSchema,
    alter_on_define: bool,
    created: &AtomicBool,
) -> OrmResult<ReconcileReport> {
    let create_sql = schema.create_table_sql();
    tracing::debug!("Reconciling {}: {}", schema.table, create_sql);
    executor
        .execute(&create_sql, &[])
        .await
        .map_err(|e| ModelError::schema(&schema.table, "create_table", e))?;
    created.store(true, Ordering::SeqCst);

    let live = live_columns(executor, schema).await?;
    let report = diff(schema, &live);

    if !report.has_drift() {
        tracing::debug!("Table {} matches its definition", schema.table);
        return Ok(report);
    }

    if !alter_on_define {
        tracing::warn!(
            "Table {} is missing columns {:?} and timestamps {:?}; alter_on_define is off",
            schema.table,
            report.missing_columns,
            report.missing_timestamps
        );
        return Ok(report);
    }

    let mut alter = AlterTableBuilder::new(&schema.table);
    for name in &report.missing_columns {
        if let Some(column) = schema.columns.get(name) {
            alter.add_column(&column.schema);
        }
    }
    for name in &report.missing_timestamps {
        alter.add_timestamp(name);
    }

    let alter_sql = alter.to_sql();
    tracing::debug!("Altering {}: {}", schema.table, alter_sql);
    executor
        .execute(&alter_sql, &[])
        .await
        .map_err(|e| ModelError::schema(&schema.table, "alter_table", e))?;

    tracing::info!(
        "Added {} column(s) to {}",
        report.missing_columns.len() + report.missing_timestamps.len(),
        schema.table
    );
    Ok(ReconcileReport {
        altered: true,
        ..report
    })
}

async fn live_columns(
    executor: &dyn QueryExecutor,
    schema: &CompiledSchema,
) -> OrmResult<HashSet<String>> {
    let params = [
        DatabaseValue::from(schema.table_schema.as_str()),
        DatabaseValue::from(schema.table_name.as_str()),
    ];
    let rows = executor
        .query(LIVE_COLUMNS_SQL, &params)
        .await
        .map_err(|e| ModelError::schema(&schema.table, "introspect_columns", e))?;

    // Unquoted identifiers are folded to lower case by PostgreSQL
    Ok(rows
        .iter()
        .filter_map(|row| row.get("column_name").and_then(DatabaseValue::as_str))
        .map(str::to_lowercase)
        .collect())
}

fn diff(schema: &CompiledSchema, live: &HashSet<String>) -> ReconcileReport {
    let missing_columns = schema
        .columns
        .names()
        .filter(|name| !live.contains(&name.to_lowercase()))
        .map(str::to_string)
        .collect();
    let missing_timestamps = schema
        .timestamps
        .enabled()
        .into_iter()
        .filter(|(_, name)| !live.contains(&name.to_lowercase()))
        .map(|(_, name)| name.to_string())
        .collect();

    ReconcileReport {
        missing_columns,
        missing_timestamps,
        altered: false,
    }
}
