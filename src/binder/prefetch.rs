use async_trait::async_trait;
use serde_json::Value;

use crate::client::ProcedureKind;
use crate::error::{BindError, ClientError};
use crate::key::derive_key;

use super::Bindings;

/// Resolver entry point used by [`Bindings::prefetch`].
///
/// Runs a query in-process with a context value, bypassing the transport.
/// Arguments arrive serialized; the returned value is the resolver's raw
/// output.
#[async_trait]
pub trait Router<C: ?Sized + Sync>: Send + Sync {
    async fn invoke_query(&self, ctx: &C, path: &str, args: Vec<Value>) -> Result<Value, ClientError>;
}

impl Bindings {
    /// Populate the cache for a query before anything observes it.
    ///
    /// The entry is written under the key a live query for the same path
    /// and arguments derives, holding the serialized output, so a later
    /// [`bind_query`](Bindings::bind_query) finds it and decodes it on
    /// read without a network call. If the entry is already fresh the
    /// router is not invoked. On failure nothing is written.
    pub async fn prefetch<C, R>(
        &self,
        router: &R,
        path: &str,
        ctx: &C,
        args: Vec<Value>,
    ) -> Result<(), BindError>
    where
        C: ?Sized + Sync,
        R: Router<C> + ?Sized,
    {
        self.validate(ProcedureKind::Query, path, Some(args.len()))?;

        let key = derive_key(path, &args);
        if self.cache.is_fresh(&key, None) {
            tracing::debug!(key = %key, "Prefetch skipped, entry is fresh");
            return Ok(());
        }

        let wire_args = self.pipeline.serialize_args(&args)?;
        let output = router.invoke_query(ctx, path, wire_args).await?;
        let wire = self.pipeline.serialize_result(&output)?;

        tracing::debug!(key = %key, "Prefetched query");
        self.cache.set_data(key, wire);
        Ok(())
    }
}
