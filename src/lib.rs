//! Cache-backed bindings from RPC endpoints to reactive UI state.
//!
//! [`Bindings`] turns an endpoint path plus arguments into a cache key, runs
//! the call through an [`RpcClient`], passes payloads through a
//! [`DataTransformer`] and exposes the result as an observable
//! [`QueryObserver`]. Mutations are bound per call site, subscriptions as a
//! one-shot fetch, and [`Bindings::prefetch`] fills the cache ahead of the
//! first observer.

pub mod binder;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod key;
pub mod logging;
pub mod transform;

pub use binder::{
    Bindings, EndpointRegistry, Mutation, MutationOptions, MutationState, ProcedureRouter,
    QueryObserver, QueryResult, Router,
};
pub use cache::{QueryCache, QueryOptions, QueryState, QueryStatus};
pub use client::{HttpRpcClient, ProcedureCall, ProcedureKind, RpcClient};
pub use config::Config;
pub use error::{BindError, ClientError};
pub use key::{derive_key, CacheKey};
pub use transform::{DataTransformer, IdentityTransformer, TransformError, TransformPipeline};
