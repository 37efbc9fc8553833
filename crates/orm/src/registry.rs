//! Model Registry - name to model lookup shared by a [`crate::Database`]

use std::sync::Arc;

use dashmap::DashMap;

use crate::model::Model;

/// Thread-safe registry of constructed models
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Arc<DashMap<String, Arc<Model>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `model` under its name, replacing any previous entry
    pub fn register(&self, model: Arc<Model>) -> Option<Arc<Model>> {
        let name = model.name().to_string();
        let previous = self.models.insert(name.clone(), model);
        if previous.is_some() {
            tracing::warn!("Model '{}' was registered again; the previous instance is replaced", name);
        } else {
            tracing::debug!("Registered model '{}'", name);
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<Model>> {
        self.models.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Unqualified table name of a registered model
    pub fn table_name_of(&self, name: &str) -> Option<String> {
        self.models.get(name).map(|entry| entry.table_name().to_string())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Model>> {
        self.models.remove(name).map(|(_, model)| model)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
