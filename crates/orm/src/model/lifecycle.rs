//! Lifecycle hooks run before mutations
//!
//! A model holds at most one hook per [`HookKind`]. Hooks receive the shared
//! executor so they can run their own queries, and abort the operation by
//! returning an error.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::backends::QueryExecutor;
use crate::error::OrmResult;
use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    BeforeCreate,
    BeforeUpdate,
    BeforeDestroy,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::BeforeCreate => "before_create",
            HookKind::BeforeUpdate => "before_update",
            HookKind::BeforeDestroy => "before_destroy",
        }
    }
}

/// What a hook gets to see
#[derive(Clone)]
pub struct HookContext {
    pub executor: Arc<dyn QueryExecutor>,
    /// Target row for update and destroy
    pub id: Option<i64>,
    /// Candidate values; `{<pk>: id}` for destroy
    pub values: Record,
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("id", &self.id)
            .field("values", &self.values)
            .finish()
    }
}

#[async_trait]
pub trait ModelHook: Send + Sync {
    async fn call(&self, context: HookContext) -> OrmResult<()>;
}

#[async_trait]
impl<F, Fut> ModelHook for F
where
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OrmResult<()>> + Send + 'static,
{
    async fn call(&self, context: HookContext) -> OrmResult<()> {
        (self)(context).await
    }
}
