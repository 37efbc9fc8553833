//! Background schema operations with an observable outcome
//!
//! Table reconciliation and foreign key creation run on a tokio task so the
//! caller is not blocked. The returned [`PendingOperation`] can be awaited
//! for the result; dropping it detaches the task, and a failure is still
//! logged when error logging is enabled for the model.

use std::future::{Future, IntoFuture};

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{ModelError, OrmResult};

/// Handle to a spawned schema operation
#[derive(Debug)]
pub struct PendingOperation<T> {
    label: String,
    handle: JoinHandle<OrmResult<T>>,
}

impl<T: Send + 'static> PendingOperation<T> {
    /// Spawn `operation` on the current tokio runtime.
    ///
    /// Fails with [`ModelError::Configuration`] when called outside a runtime.
    pub(crate) fn spawn<F>(label: impl Into<String>, error_logging: bool, operation: F) -> OrmResult<Self>
    where
        F: Future<Output = OrmResult<T>> + Send + 'static,
    {
        let label = label.into();
        let runtime = Handle::try_current().map_err(|e| {
            ModelError::Configuration(format!("Cannot start '{}' outside a tokio runtime: {}", label, e))
        })?;
        let task_label = label.clone();
        let handle = runtime.spawn(async move {
            let result = operation.await;
            if let Err(e) = &result {
                if error_logging {
                    tracing::error!("{} failed: {}", task_label, e);
                }
            }
            result
        });
        Ok(Self { label, handle })
    }

    /// Short description such as `define users`
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the operation and return its outcome
    pub async fn wait(self) -> OrmResult<T> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(ModelError::Database(format!(
                "Background task '{}' did not complete: {}",
                self.label, e
            ))),
        }
    }

    /// Let the operation finish in the background
    pub fn detach(self) {
        tracing::debug!("Detached background task '{}'", self.label);
    }
}

impl<T: Send + 'static> IntoFuture for PendingOperation<T> {
    type Output = OrmResult<T>;
    type IntoFuture = BoxFuture<'static, OrmResult<T>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
