use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::client::ProcedureKind;
use crate::error::ClientError;

use super::prefetch::Router;
use super::registry::EndpointRegistry;

type Handler<C> =
    Arc<dyn Fn(C, Vec<Value>) -> BoxFuture<'static, Result<Value, ClientError>> + Send + Sync>;

/// In-process procedure table.
///
/// Handlers receive a clone of the context and the serialized arguments.
/// Serves [`Bindings::prefetch`](super::Bindings::prefetch) through
/// [`Router`] and can describe itself as an [`EndpointRegistry`].
pub struct ProcedureRouter<C> {
    procedures: HashMap<(ProcedureKind, String), Handler<C>>,
}

impl<C> ProcedureRouter<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            procedures: HashMap::new(),
        }
    }

    pub fn query<F, Fut>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(C, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ClientError>> + Send + 'static,
    {
        self.register(ProcedureKind::Query, path.into(), handler)
    }

    pub fn mutation<F, Fut>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(C, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ClientError>> + Send + 'static,
    {
        self.register(ProcedureKind::Mutation, path.into(), handler)
    }

    pub fn subscription<F, Fut>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(C, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ClientError>> + Send + 'static,
    {
        self.register(ProcedureKind::Subscription, path.into(), handler)
    }

    fn register<F, Fut>(mut self, kind: ProcedureKind, path: String, handler: F) -> Self
    where
        F: Fn(C, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ClientError>> + Send + 'static,
    {
        let handler: Handler<C> = Arc::new(move |ctx, args| handler(ctx, args).boxed());
        self.procedures.insert((kind, path), handler);
        self
    }

    /// Run the procedure registered for `kind` and `path`.
    pub async fn invoke(
        &self,
        kind: ProcedureKind,
        ctx: &C,
        path: &str,
        args: Vec<Value>,
    ) -> Result<Value, ClientError> {
        let Some(handler) = self.procedures.get(&(kind, path.to_string())) else {
            return Err(ClientError::not_found(format!("No {} procedure '{}'", kind, path)));
        };

        tracing::trace!(kind = %kind, path = %path, "Invoking procedure");
        handler(ctx.clone(), args).await
    }

    /// Every registered procedure, without declared arity.
    pub fn registry(&self) -> EndpointRegistry {
        self.procedures
            .keys()
            .fold(EndpointRegistry::new(), |registry, (kind, path)| {
                registry.with(*kind, path.clone(), None)
            })
    }
}

impl<C> Default for ProcedureRouter<C>
where
    C: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C> Router<C> for ProcedureRouter<C>
where
    C: Clone + Send + Sync + 'static,
{
    async fn invoke_query(&self, ctx: &C, path: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        self.invoke(ProcedureKind::Query, ctx, path, args).await
    }
}
