//! Foreign key manager
//!
//! Adds a named foreign key constraint to a model table if it is not
//! already present.

use super::ddl::AlterTableBuilder;
use crate::backends::{DatabaseValue, QueryExecutor};
use crate::error::{ModelError, OrmResult};

const COLUMN_EXISTS_SQL: &str = "SELECT column_name::text AS column_name FROM information_schema.columns WHERE table_schema = $1 AND table_name = $2 AND column_name = $3";

const CONSTRAINT_EXISTS_SQL: &str = "SELECT constraint_name::text AS constraint_name FROM information_schema.table_constraints WHERE table_schema = $1 AND table_name = $2 AND constraint_name = $3 AND constraint_type = 'FOREIGN KEY'";

/// Result of [`ensure_foreign_key`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyOutcome {
    Created,
    AlreadyExists,
}

/// A foreign key from `table_schema.table_name(column)` to
/// `references_table(references_column)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeySpec {
    pub table_schema: String,
    pub table_name: String,
    pub column: String,
    /// Qualified or bare parent table
    pub references_table: String,
    pub references_column: String,
}

impl ForeignKeySpec {
    /// `<table>_<column>_fkey`, the name PostgreSQL would pick itself
    pub fn constraint_name(&self) -> String {
        format!("{}_{}_fkey", self.table_name, self.column)
    }

    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.table_schema, self.table_name)
    }

    pub fn to_sql(&self) -> String {
        let mut alter = AlterTableBuilder::new(&self.qualified_table());
        alter.add_foreign_key(
            &self.constraint_name(),
            &self.column,
            &self.references_table,
            &self.references_column,
        );
        alter.to_sql()
    }
}

/// Create the constraint unless it already exists.
///
/// The column must already exist on the child table.
pub async fn ensure_foreign_key(
    executor: &dyn QueryExecutor,
    spec: &ForeignKeySpec,
) -> OrmResult<ForeignKeyOutcome> {
    let constraint = spec.constraint_name();
    let fail = |message: String| ModelError::constraint(&constraint, "add_foreign_key", message);

    let column_params = [
        DatabaseValue::from(spec.table_schema.as_str()),
        DatabaseValue::from(spec.table_name.as_str()),
        DatabaseValue::from(spec.column.as_str()),
    ];
    let column = executor
        .fetch_optional(COLUMN_EXISTS_SQL, &column_params)
        .await
        .map_err(|e| fail(e.to_string()))?;
    if column.is_none() {
        return Err(fail(format!(
            "Column '{}' does not exist on {}",
            spec.column,
            spec.qualified_table()
        )));
    }

    let constraint_params = [
        DatabaseValue::from(spec.table_schema.as_str()),
        DatabaseValue::from(spec.table_name.as_str()),
        DatabaseValue::from(constraint.as_str()),
    ];
    let existing = executor
        .fetch_optional(CONSTRAINT_EXISTS_SQL, &constraint_params)
        .await
        .map_err(|e| fail(e.to_string()))?;
    if existing.is_some() {
        tracing::debug!("Foreign key {} already exists", constraint);
        return Ok(ForeignKeyOutcome::AlreadyExists);
    }

    let sql = spec.to_sql();
    tracing::debug!("Adding foreign key: {}", sql);
    executor
        .execute(&sql, &[])
        .await
        .map_err(|e| fail(e.to_string()))?;

    tracing::info!(
        "Added foreign key {} referencing {}({})",
        constraint,
        spec.references_table,
        spec.references_column
    );
    Ok(ForeignKeyOutcome::Created)
}
