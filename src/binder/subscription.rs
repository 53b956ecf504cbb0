use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;

use crate::cache::{Fetcher, QueryOptions};
use crate::client::ProcedureKind;
use crate::error::BindError;
use crate::key::CacheKey;

use super::query::QueryObserver;
use super::Bindings;

impl Bindings {
    /// Bind a subscription endpoint as a one-shot fetch.
    ///
    /// A single value is fetched through `subscription_once` and cached in
    /// the subscription namespace; there is no push channel. The observer
    /// behaves exactly like a query observer.
    pub fn bind_subscription(
        &self,
        path: &str,
        args: Vec<Value>,
        options: QueryOptions,
    ) -> Result<QueryObserver, BindError> {
        self.validate(ProcedureKind::Subscription, path, Some(args.len()))?;

        let key = CacheKey::subscription(path, &args);
        let wire_args = self.pipeline.serialize_args(&args)?;

        let client = Arc::clone(&self.client);
        let path = path.to_string();
        let fetcher: Fetcher = Arc::new(move || {
            let client = Arc::clone(&client);
            let path = path.clone();
            let args = wire_args.clone();
            async move {
                client
                    .subscription_once(&path, args)
                    .await
                    .map_err(BindError::from)
            }
            .boxed()
        });

        Ok(self.observe(key, fetcher, options))
    }
}
