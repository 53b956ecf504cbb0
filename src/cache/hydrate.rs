//! Serializable snapshot of the cache for handing prefetched data over.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::CacheKey;

use super::store::QueryCache;

/// One successful entry in wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DehydratedQuery {
    pub key: CacheKey,
    pub data: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DehydratedState {
    pub queries: Vec<DehydratedQuery>,
}

impl QueryCache {
    /// Snapshot every entry that holds data.
    pub fn dehydrate(&self) -> DehydratedState {
        let mut queries: Vec<DehydratedQuery> = self
            .successful_entries()
            .into_iter()
            .map(|(key, data)| DehydratedQuery {
                key,
                data: (*data).clone(),
            })
            .collect();
        queries.sort_by_key(|query| query.key.to_string());
        DehydratedState { queries }
    }

    /// Write a snapshot back as prefetched data.
    ///
    /// Keys that already hold data are left alone. Returns the number of
    /// entries written.
    pub fn hydrate(&self, state: DehydratedState) -> usize {
        let mut written = 0;
        for query in state.queries {
            if self.get_data(&query.key).is_some() {
                continue;
            }
            self.set_data(query.key, query.data);
            written += 1;
        }
        tracing::debug!(written, "Hydrated cache");
        written
    }
}
