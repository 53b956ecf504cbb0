//! Operation binders.
//!
//! [`Bindings`] is the setup context: one RPC client, one cache and one
//! transformer shared by every query, mutation and subscription bound from
//! it. Binders derive cache keys, serialize arguments, hand fetches to the
//! cache and deserialize what observers read.

mod mutation;
mod prefetch;
mod query;
mod registry;
mod router;
mod subscription;

use std::sync::Arc;

use serde_json::Value;

use crate::cache::{QueryCache, QueryOptions};
use crate::client::{HttpRpcClient, ProcedureKind, RpcClient};
use crate::config::Config;
use crate::error::{BindError, ClientError};
use crate::transform::{DataTransformer, TransformPipeline};

pub use mutation::{Mutation, MutationOptions, MutationState};
pub use prefetch::Router;
pub use query::{QueryObserver, QueryResult};
pub use registry::EndpointRegistry;
pub use router::ProcedureRouter;

/// Shared setup for all binders.
#[derive(Clone)]
pub struct Bindings {
    client: Arc<dyn RpcClient>,
    cache: QueryCache,
    pipeline: TransformPipeline,
    registry: Option<Arc<EndpointRegistry>>,
}

impl Bindings {
    /// Bindings with the identity transformer and no endpoint registry.
    pub fn new(client: Arc<dyn RpcClient>, cache: QueryCache) -> Self {
        Self {
            client,
            cache,
            pipeline: TransformPipeline::identity(),
            registry: None,
        }
    }

    /// Bindings over HTTP, with cache defaults and endpoints from `config`.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let client = HttpRpcClient::new(&config.client)?;
        let bindings = Self::new(Arc::new(client), QueryCache::new(config.defaults.clone()));

        if config.endpoints.is_empty() {
            return Ok(bindings);
        }
        Ok(bindings.with_registry(EndpointRegistry::from_config(&config.endpoints)))
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn DataTransformer>) -> Self {
        self.pipeline = TransformPipeline::new(transformer);
        self
    }

    /// Validate every bind against `registry`.
    pub fn with_registry(mut self, registry: EndpointRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    fn validate(
        &self,
        kind: ProcedureKind,
        path: &str,
        arg_count: Option<usize>,
    ) -> Result<(), BindError> {
        match &self.registry {
            Some(registry) => registry.validate(kind, path, arg_count),
            None => Ok(()),
        }
    }

    fn declared_arity(&self, kind: ProcedureKind, path: &str) -> Option<usize> {
        self.registry
            .as_ref()
            .and_then(|registry| registry.arity(kind, path))
    }

    /// Cache options whose success callback receives deserialized data.
    fn deserializing_options(&self, options: &QueryOptions) -> QueryOptions {
        let mut wrapped = options.clone();
        if let Some(on_success) = options.on_success.clone() {
            let pipeline = self.pipeline.clone();
            let on_error = options.on_error.clone();
            wrapped.on_success = Some(Arc::new(move |wire: &Value| {
                match pipeline.deserialize_result(wire) {
                    Ok(value) => on_success(&value),
                    Err(err) => {
                        if let Some(on_error) = &on_error {
                            on_error(&BindError::Transform(err));
                        }
                    }
                }
            }));
        }
        wrapped
    }
}
