use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::cache::{Fetcher, QueryCache, QueryOptions, QueryState, QueryStatus};
use crate::client::{ProcedureCall, ProcedureKind};
use crate::error::BindError;
use crate::key::{derive_key, CacheKey};
use crate::transform::{TransformError, TransformPipeline};

use super::Bindings;

/// What a UI reads from a bound query or subscription.
///
/// A failed refetch keeps the data of the last success next to the error,
/// so `status` is `Error` with `data` present. `data` is absent only while
/// nothing has been fetched yet or when the cached value failed to decode.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub status: QueryStatus,
    /// Deserialized value of the last success.
    pub data: Option<Arc<Value>>,
    pub error: Option<BindError>,
    pub is_fetching: bool,
    pub updated_at: Option<Instant>,
}

impl QueryResult {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Decode `data` into a concrete type.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, TransformError> {
        self.data
            .as_deref()
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|e| TransformError::Deserialize(e.to_string()))
            })
            .transpose()
    }
}

struct Memo {
    source: Arc<Value>,
    output: Result<Arc<Value>, TransformError>,
}

/// Live view of one cache entry.
///
/// Deserialization is memoized against the identity of the cached wire
/// value, so reading the result repeatedly decodes it once. Dropping the
/// observer stops observation; a fetch it started still completes and
/// updates the cache for other observers.
pub struct QueryObserver {
    key: CacheKey,
    receiver: watch::Receiver<QueryState>,
    pipeline: TransformPipeline,
    cache: QueryCache,
    fetcher: Fetcher,
    options: QueryOptions,
    memo: Mutex<Option<Memo>>,
}

impl QueryObserver {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Current status, data and error.
    pub fn result(&self) -> QueryResult {
        let state = self.receiver.borrow().clone();
        self.project(state)
    }

    /// Wait for the next change of the entry.
    ///
    /// Returns `None` once the entry has been removed from the cache.
    pub async fn changed(&mut self) -> Option<QueryResult> {
        self.receiver.changed().await.ok()?;
        let state = self.receiver.borrow_and_update().clone();
        Some(self.project(state))
    }

    /// Wait until no fetch is running and the entry holds data or an error.
    ///
    /// Never resolves for a disabled observer of an idle entry.
    pub async fn settled(&mut self) -> QueryResult {
        let settled = self
            .receiver
            .wait_for(QueryState::is_settled)
            .await
            .map(|state| state.clone())
            .ok();
        let state = settled.unwrap_or_else(|| self.receiver.borrow().clone());
        self.project(state)
    }

    /// Fetch again even if the cached data is fresh.
    pub fn refetch(&self) {
        let options = self.options.clone().force_refetch();
        self.cache.fetch(&self.key, self.fetcher.clone(), &options);
    }

    fn project(&self, state: QueryState) -> QueryResult {
        let decoded = state.data.as_ref().map(|wire| self.deserialize(wire));

        match decoded {
            Some(Err(err)) => QueryResult {
                status: QueryStatus::Error,
                data: None,
                error: Some(BindError::Transform(err)),
                is_fetching: state.is_fetching,
                updated_at: state.updated_at,
            },
            Some(Ok(data)) => QueryResult {
                status: state.status,
                data: Some(data),
                error: state.error,
                is_fetching: state.is_fetching,
                updated_at: state.updated_at,
            },
            None => QueryResult {
                status: state.status,
                data: None,
                error: state.error,
                is_fetching: state.is_fetching,
                updated_at: state.updated_at,
            },
        }
    }

    fn deserialize(&self, wire: &Arc<Value>) -> Result<Arc<Value>, TransformError> {
        let mut memo = self.memo.lock();
        if let Some(memo) = memo.as_ref() {
            if Arc::ptr_eq(&memo.source, wire) {
                tracing::trace!(key = %self.key, "Reusing deserialized data");
                return memo.output.clone();
            }
        }

        let output = self.pipeline.deserialize_result(wire).map(Arc::new);
        *memo = Some(Memo {
            source: Arc::clone(wire),
            output: output.clone(),
        });
        output
    }
}

impl Bindings {
    /// Bind a query endpoint.
    ///
    /// Argument serialization and endpoint validation run here; their
    /// failures are returned directly. Fetch failures show up in the
    /// observer's result. Must be called from within a Tokio runtime.
    pub fn bind_query(
        &self,
        path: &str,
        args: Vec<Value>,
        options: QueryOptions,
    ) -> Result<QueryObserver, BindError> {
        self.validate(ProcedureKind::Query, path, Some(args.len()))?;

        let key = derive_key(path, &args);
        let wire_args = self.pipeline.serialize_args(&args)?;

        let client = Arc::clone(&self.client);
        let path = path.to_string();
        let fetcher: Fetcher = Arc::new(move || {
            let client = Arc::clone(&client);
            let call = ProcedureCall::new(ProcedureKind::Query, path.clone(), wire_args.clone());
            async move { client.request(call).await.map_err(BindError::from) }.boxed()
        });

        Ok(self.observe(key, fetcher, options))
    }

    pub(super) fn observe(
        &self,
        key: CacheKey,
        fetcher: Fetcher,
        options: QueryOptions,
    ) -> QueryObserver {
        let options = self.deserializing_options(&options);
        let receiver = self.cache.fetch(&key, Arc::clone(&fetcher), &options);

        QueryObserver {
            key,
            receiver,
            pipeline: self.pipeline.clone(),
            cache: self.cache.clone(),
            fetcher,
            options,
            memo: Mutex::new(None),
        }
    }
}
