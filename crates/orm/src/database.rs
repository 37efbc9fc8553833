//! Database context
//!
//! A [`Database`] owns the executor handle shared by every model, the global
//! option layer and the model registry. Models are created through it so
//! they capture the global options at construction time.

use std::sync::Arc;

use crate::backends::{PoolConfig, PostgresExecutor, QueryExecutor};
use crate::config::{GlobalOptions, ModelConfig, ModelOptions};
use crate::error::{ModelError, OrmResult};
use crate::model::Model;
use crate::pending::PendingOperation;
use crate::registry::ModelRegistry;
use crate::schema::ForeignKeyOutcome;

#[derive(Clone)]
pub struct Database {
    executor: Arc<dyn QueryExecutor>,
    global: GlobalOptions,
    registry: ModelRegistry,
}

impl Database {
    /// Use an existing executor
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            executor,
            global: GlobalOptions::default(),
            registry: ModelRegistry::new(),
        }
    }

    /// Connect a PostgreSQL pool
    pub async fn connect(database_url: &str, config: PoolConfig) -> OrmResult<Self> {
        let executor = PostgresExecutor::connect(database_url, config).await?;
        Ok(Self::new(Arc::new(executor)))
    }

    /// Replace the global option layer.
    ///
    /// Models built earlier keep the options they were built with.
    pub fn with_global_options(mut self, options: GlobalOptions) -> Self {
        self.global = options;
        self
    }

    pub fn set_global_options(&mut self, options: GlobalOptions) {
        self.global = options;
    }

    pub fn global_options(&self) -> &GlobalOptions {
        &self.global
    }

    pub fn executor(&self) -> Arc<dyn QueryExecutor> {
        Arc::clone(&self.executor)
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Construct a model and register it under `name`
    pub fn model(&self, name: &str, options: ModelOptions) -> OrmResult<Arc<Model>> {
        if name.trim().is_empty() {
            return Err(ModelError::parameter_type("model", "name", "a non-empty model name"));
        }

        let config = ModelConfig::resolve(name, &self.global, &options);
        let model = Arc::new(Model::new(config, Arc::clone(&self.executor)));
        self.registry.register(Arc::clone(&model));
        Ok(model)
    }

    pub fn get_model(&self, name: &str) -> Option<Arc<Model>> {
        self.registry.get(name)
    }

    /// Add a foreign key from `child.column` to the `parent` model's table
    pub fn add_foreign_key(
        &self,
        child: &str,
        column: &str,
        parent: &str,
    ) -> OrmResult<PendingOperation<ForeignKeyOutcome>> {
        let child_model = self.lookup(child)?;
        let parent_model = self.lookup(parent)?;
        child_model.add_foreign_key_to(column, &parent_model)
    }

    fn lookup(&self, name: &str) -> OrmResult<Arc<Model>> {
        self.registry
            .get(name)
            .ok_or_else(|| ModelError::Configuration(format!("Model '{}' is not registered", name)))
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("global", &self.global)
            .field("models", &self.registry.names())
            .finish()
    }
}
