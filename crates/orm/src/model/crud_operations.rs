//! CRUD Operations - Create, Read, Update, Delete operations for models
//!
//! Statements are assembled from the compiled schema fragments and run
//! through the shared executor with positional parameters. Soft-deleted
//! rows are filtered out of every read when the model is paranoid.

use chrono::Utc;

use super::{HookContext, HookKind, Model, ModelHook};
use crate::backends::DatabaseValue;
use crate::error::{ModelError, OrmResult};
use crate::record::Record;
use crate::schema::{placeholder, CompiledSchema};
use crate::validation::validate;

impl Model {
    /// All rows, excluding soft-deleted ones
    pub async fn find_all(&self) -> OrmResult<Vec<Record>> {
        let schema = self.schema().await?;
        let sql = match schema.soft_delete_filter() {
            Some(filter) => format!("{} WHERE {}", schema.select_sql(), filter),
            None => schema.select_sql(),
        };
        self.fetch_rows("find_all", &schema, &sql, &[]).await
    }

    /// Rows matching a caller-supplied predicate with `$n` placeholders.
    ///
    /// A leading `WHERE` keyword is accepted and dropped.
    pub async fn find_all_where(
        &self,
        where_clause: &str,
        params: &[DatabaseValue],
    ) -> OrmResult<Vec<Record>> {
        let predicate = strip_where_keyword(where_clause);
        if predicate.is_empty() {
            return Err(ModelError::parameter_type(
                "find_all_where",
                "where_clause",
                "a non-empty SQL predicate",
            ));
        }

        let schema = self.schema().await?;
        let sql = format!(
            "{} WHERE ({}){}",
            schema.select_sql(),
            predicate,
            soft_delete_suffix(&schema)
        );
        self.fetch_rows("find_all_where", &schema, &sql, params).await
    }

    /// First row where `column` equals `value`
    pub async fn find_one(
        &self,
        column: &str,
        value: impl Into<DatabaseValue>,
    ) -> OrmResult<Option<Record>> {
        let schema = self.schema().await?;
        if !schema.is_queryable(column) {
            return Err(ModelError::Configuration(format!(
                "Unknown column '{}' on model '{}'",
                column,
                self.name()
            )));
        }

        let sql = format!(
            "{} WHERE {}={}{} LIMIT 1",
            schema.select_sql(),
            column,
            placeholder(1),
            soft_delete_suffix(&schema)
        );
        let rows = self
            .fetch_rows("find_one", &schema, &sql, &[value.into()])
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn find_by_id(&self, id: i64) -> OrmResult<Option<Record>> {
        self.find_one(self.primary_key_name(), id).await
    }

    /// Validate, run the before-create hook and insert.
    ///
    /// Returns the inserted row as reported by `RETURNING *`.
    pub async fn create(&self, values: Record) -> OrmResult<Option<Record>> {
        let schema = self.schema().await?;
        validate(&schema.columns, &values)?;
        self.run_hook(HookKind::BeforeCreate, None, &values).await?;
        self.log_undeclared(&schema, &values, "create");

        let mut params = schema.arrange(&values);
        params.extend(schema.insert_timestamp_values(Utc::now()));

        let rows = self
            .fetch_rows("create", &schema, &schema.insert_sql(), &params)
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Validate, run the before-update hook and update one row.
    ///
    /// Declared columns missing from `values` (or null) keep their stored
    /// value. Returns `None` when no row has this id.
    ///
    /// Validators still see absent columns as null, so a partial update is
    /// rejected by rules like [`crate::validation::non_empty_string`] on
    /// columns it leaves out. Pass the current value of such columns along.
    pub async fn update_by_id(&self, id: i64, values: Record) -> OrmResult<Option<Record>> {
        let schema = self.schema().await?;
        validate(&schema.columns, &values)?;
        self.run_hook(HookKind::BeforeUpdate, Some(id), &values).await?;
        self.log_undeclared(&schema, &values, "update_by_id");

        let mut params = schema.arrange(&values);
        if schema.has_updated_at() {
            params.push(DatabaseValue::DateTime(Utc::now()));
        }
        params.push(DatabaseValue::Int64(id));

        let rows = self
            .fetch_rows("update_by_id", &schema, &schema.update_sql(), &params)
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Delete one row, or mark it deleted when the model is paranoid.
    ///
    /// Returns `false` without writing when no (live) row has this id.
    pub async fn delete_by_id(&self, id: i64) -> OrmResult<bool> {
        let schema = self.schema().await?;
        if !self.config().soft_delete_ready() {
            return Err(ModelError::Configuration(format!(
                "Model '{}' is paranoid but has no deleted-at timestamp column",
                self.name()
            )));
        }

        let key = Record::new().with(self.primary_key_name(), id);
        self.run_hook(HookKind::BeforeDestroy, Some(id), &key).await?;

        if self.find_by_id(id).await?.is_none() {
            tracing::debug!("delete_by_id: no row {} in {}", id, schema.table);
            return Ok(false);
        }

        let (sql, params) = match schema.soft_delete_column.as_deref() {
            Some(deleted_at) => (
                format!(
                    "UPDATE {} SET {}={} WHERE {}={}",
                    schema.table,
                    deleted_at,
                    placeholder(1),
                    schema.primary_key,
                    placeholder(2)
                ),
                vec![DatabaseValue::DateTime(Utc::now()), DatabaseValue::Int64(id)],
            ),
            None => (
                format!(
                    "DELETE FROM {} WHERE {}={}",
                    schema.table,
                    schema.primary_key,
                    placeholder(1)
                ),
                vec![DatabaseValue::Int64(id)],
            ),
        };

        tracing::debug!("delete_by_id: {}", sql);
        self.executor
            .execute(&sql, &params)
            .await
            .map_err(|e| execution_error("delete_by_id", &schema, e))?;
        Ok(true)
    }

    async fn run_hook(&self, kind: HookKind, id: Option<i64>, values: &Record) -> OrmResult<()> {
        let hook = match self.hooks.get(&kind) {
            Some(entry) => entry.value().clone(),
            None => return Ok(()),
        };

        let context = HookContext {
            executor: self.executor(),
            id,
            values: values.clone(),
        };
        hook.call(context).await.map_err(|e| {
            tracing::debug!("{} hook on '{}' rejected: {}", kind.as_str(), self.name(), e);
            e
        })
    }

    async fn fetch_rows(
        &self,
        operation: &str,
        schema: &CompiledSchema,
        sql: &str,
        params: &[DatabaseValue],
    ) -> OrmResult<Vec<Record>> {
        tracing::debug!("{}: {} ({} params)", operation, sql, params.len());
        self.executor
            .query(sql, params)
            .await
            .map_err(|e| execution_error(operation, schema, e))
    }

    fn log_undeclared(&self, schema: &CompiledSchema, values: &Record, operation: &str) {
        for column in values.columns() {
            if !schema.columns.contains(column) {
                tracing::debug!(
                    "{}: ignoring undeclared column '{}' for '{}'",
                    operation,
                    column,
                    self.name()
                );
            }
        }
    }
}

fn strip_where_keyword(clause: &str) -> &str {
    let trimmed = clause.trim();
    match trimmed.get(..5) {
        Some(keyword) if keyword.eq_ignore_ascii_case("where") => {
            let rest = &trimmed[5..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest.trim_start()
            } else {
                trimmed
            }
        }
        _ => trimmed,
    }
}

fn soft_delete_suffix(schema: &CompiledSchema) -> String {
    schema
        .soft_delete_filter()
        .map(|filter| format!(" AND {}", filter))
        .unwrap_or_default()
}

fn execution_error(operation: &str, schema: &CompiledSchema, error: ModelError) -> ModelError {
    match error {
        ModelError::Database(message) => ModelError::Database(format!(
            "Failed to {} on {}: {}",
            operation, schema.table, message
        )),
        other => other,
    }
}
