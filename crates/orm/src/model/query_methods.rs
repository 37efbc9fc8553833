//! Custom query methods attached to a model by name

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use super::Model;
use crate::backends::{DatabaseValue, QueryExecutor};
use crate::error::{ModelError, OrmResult};
use crate::record::Record;

/// A stored custom query
pub type QueryMethod =
    Arc<dyn Fn(Vec<DatabaseValue>) -> BoxFuture<'static, OrmResult<Vec<Record>>> + Send + Sync>;

/// Wrap an async closure as a [`QueryMethod`]
pub fn query_fn<F, Fut>(f: F) -> QueryMethod
where
    F: Fn(Vec<DatabaseValue>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OrmResult<Vec<Record>>> + Send + 'static,
{
    Arc::new(move |params| f(params).boxed())
}

impl Model {
    /// Build a query method from the shared executor and store it under `name`.
    ///
    /// An existing method with the same name is replaced.
    pub fn add_query_method<F>(&self, name: &str, factory: F) -> OrmResult<()>
    where
        F: FnOnce(Arc<dyn QueryExecutor>) -> QueryMethod,
    {
        if name.trim().is_empty() {
            return Err(ModelError::parameter_type(
                "add_query_method",
                "name",
                "a non-empty method name",
            ));
        }

        let method = factory(Arc::clone(&self.executor));
        if self.custom_queries.insert(name.to_string(), method).is_some() {
            tracing::debug!("Replaced query method {}.{}", self.name(), name);
        } else {
            tracing::debug!("Added query method {}.{}", self.name(), name);
        }
        Ok(())
    }

    pub fn query_method(&self, name: &str) -> Option<QueryMethod> {
        self.custom_queries.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn query_method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.custom_queries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Invoke a stored query method
    pub async fn call_query(&self, name: &str, params: Vec<DatabaseValue>) -> OrmResult<Vec<Record>> {
        let method = self.query_method(name).ok_or_else(|| {
            ModelError::Configuration(format!(
                "Model '{}' has no query method '{}'",
                self.name(),
                name
            ))
        })?;
        method(params).await
    }
}
