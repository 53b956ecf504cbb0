//! Shared in-memory cache of query results.
//!
//! Entries are keyed by [`CacheKey`](crate::key::CacheKey) and hold the
//! wire-shaped value; observers deserialize on read. The cache coalesces
//! concurrent fetches for one key and notifies observers through a watch
//! channel per entry.

mod hydrate;
mod options;
mod state;
mod store;

pub use hydrate::{DehydratedQuery, DehydratedState};
pub use options::{ErrorCallback, QueryOptions, SuccessCallback};
pub use state::{QueryState, QueryStatus};
pub use store::{FetchFuture, Fetcher, QueryCache};
