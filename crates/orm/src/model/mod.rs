//! Models bound to a single table
//!
//! A [`Model`] is constructed from a resolved [`ModelConfig`] and the shared
//! executor, then given its columns with [`Model::define`]. CRUD lives in
//! [`crud_operations`], hooks in [`lifecycle`] and named custom queries in
//! [`query_methods`].

pub mod crud_operations;
pub mod lifecycle;
pub mod query_methods;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::backends::QueryExecutor;
use crate::config::ModelConfig;
use crate::error::{ModelError, OrmResult};
use crate::pending::PendingOperation;
use crate::schema::{
    ensure_foreign_key, reconcile, ColumnSet, CompiledSchema, ForeignKeyOutcome, ForeignKeySpec,
    ReconcileReport,
};

pub use lifecycle::{HookContext, HookKind, ModelHook};
pub use query_methods::{query_fn, QueryMethod};

/// A table-backed model with generated CRUD statements
pub struct Model {
    config: ModelConfig,
    executor: Arc<dyn QueryExecutor>,
    compiled: RwLock<Option<Arc<CompiledSchema>>>,
    table_created: Arc<AtomicBool>,
    hooks: DashMap<HookKind, Arc<dyn ModelHook>>,
    custom_queries: DashMap<String, QueryMethod>,
}

impl Model {
    pub fn new(config: ModelConfig, executor: Arc<dyn QueryExecutor>) -> Self {
        if !config.soft_delete_ready() {
            tracing::warn!(
                "Model '{}' is paranoid but has no deleted-at timestamp column; deletes will fail",
                config.name
            );
        }
        Self {
            config,
            executor,
            compiled: RwLock::new(None),
            table_created: Arc::new(AtomicBool::new(false)),
            hooks: DashMap::new(),
            custom_queries: DashMap::new(),
        }
    }

    /// Registry key
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }

    /// `schema.table`
    pub fn qualified_table(&self) -> String {
        self.config.qualified_table()
    }

    pub fn primary_key_name(&self) -> &str {
        &self.config.primary_key_name
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn executor(&self) -> Arc<dyn QueryExecutor> {
        Arc::clone(&self.executor)
    }

    /// Set once CREATE TABLE IF NOT EXISTS has succeeded
    pub fn is_table_created(&self) -> bool {
        self.table_created.load(Ordering::SeqCst)
    }

    pub async fn is_defined(&self) -> bool {
        self.compiled.read().await.is_some()
    }

    /// Compile `columns` and reconcile the table in the background.
    ///
    /// Compilation errors are returned directly. The compiled statements are
    /// usable as soon as this returns; await the returned operation before
    /// relying on the table existing. Calling it again replaces the column
    /// set and reconciles again.
    pub async fn define(&self, columns: ColumnSet) -> OrmResult<PendingOperation<ReconcileReport>> {
        let compiled = Arc::new(CompiledSchema::compile(&columns, &self.config)?);
        *self.compiled.write().await = Some(Arc::clone(&compiled));
        tracing::debug!(
            "Defined model '{}' with {} column(s) on {}",
            self.name(),
            compiled.column_count,
            compiled.table
        );

        let executor = Arc::clone(&self.executor);
        let created = Arc::clone(&self.table_created);
        let alter_on_define = self.config.alter_on_define;
        PendingOperation::spawn(
            format!("define {}", self.name()),
            self.config.error_logging,
            async move { reconcile(executor.as_ref(), &compiled, alter_on_define, &created).await },
        )
    }

    /// [`Model::define`] from `{ "<name>": { "schema": "<ddl>" } }`
    pub async fn define_json(&self, columns: &JsonValue) -> OrmResult<PendingOperation<ReconcileReport>> {
        self.define(ColumnSet::from_json(columns)?).await
    }

    /// Compiled statements; fails until [`Model::define`] has been called
    pub async fn schema(&self) -> OrmResult<Arc<CompiledSchema>> {
        self.compiled.read().await.clone().ok_or_else(|| {
            ModelError::Configuration(format!("Model '{}' is not defined", self.name()))
        })
    }

    pub fn before_create<H: ModelHook + 'static>(&self, hook: H) {
        self.set_hook(HookKind::BeforeCreate, Arc::new(hook));
    }

    pub fn before_update<H: ModelHook + 'static>(&self, hook: H) {
        self.set_hook(HookKind::BeforeUpdate, Arc::new(hook));
    }

    /// The hook receives `{<pk>: id}` as its values
    pub fn before_destroy<H: ModelHook + 'static>(&self, hook: H) {
        self.set_hook(HookKind::BeforeDestroy, Arc::new(hook));
    }

    pub fn has_hook(&self, kind: HookKind) -> bool {
        self.hooks.contains_key(&kind)
    }

    fn set_hook(&self, kind: HookKind, hook: Arc<dyn ModelHook>) {
        if self.hooks.insert(kind, hook).is_some() {
            tracing::debug!("Replaced {} hook on '{}'", kind.as_str(), self.name());
        }
    }

    /// Add `<table>_<column>_fkey` referencing `parent_table(<this model's pk>)`.
    ///
    /// Runs on the current tokio runtime; outside one this returns
    /// [`ModelError::Configuration`].
    pub fn add_foreign_key(
        &self,
        column: &str,
        parent_table: &str,
    ) -> OrmResult<PendingOperation<ForeignKeyOutcome>> {
        self.spawn_foreign_key(column, parent_table, &self.config.primary_key_name)
    }

    /// Add a foreign key referencing `parent`'s table and primary key
    pub fn add_foreign_key_to(
        &self,
        column: &str,
        parent: &Model,
    ) -> OrmResult<PendingOperation<ForeignKeyOutcome>> {
        self.spawn_foreign_key(column, &parent.qualified_table(), parent.primary_key_name())
    }

    fn spawn_foreign_key(
        &self,
        column: &str,
        parent_table: &str,
        parent_key: &str,
    ) -> OrmResult<PendingOperation<ForeignKeyOutcome>> {
        if column.trim().is_empty() {
            return Err(ModelError::parameter_type(
                "add_foreign_key",
                "column",
                "a non-empty column name",
            ));
        }
        if parent_table.trim().is_empty() {
            return Err(ModelError::parameter_type(
                "add_foreign_key",
                "parent_table",
                "a non-empty table name",
            ));
        }

        let spec = ForeignKeySpec {
            table_schema: self.config.table_schema.clone(),
            table_name: self.config.table_name.clone(),
            column: column.to_string(),
            references_table: parent_table.to_string(),
            references_column: parent_key.to_string(),
        };
        let executor = Arc::clone(&self.executor);
        PendingOperation::spawn(
            format!("add_foreign_key {}", spec.constraint_name()),
            self.config.error_logging,
            async move { ensure_foreign_key(executor.as_ref(), &spec).await },
        )
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("config", &self.config)
            .field("table_created", &self.is_table_created())
            .field("custom_queries", &self.custom_queries.len())
            .finish()
    }
}
