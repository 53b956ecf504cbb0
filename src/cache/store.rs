use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use crate::client::ProcedureKind;
use crate::config::QueryDefaults;
use crate::error::BindError;
use crate::key::CacheKey;

use super::options::QueryOptions;
use super::state::QueryState;

/// Future producing a wire-shaped value for one fetch.
pub type FetchFuture = BoxFuture<'static, Result<Value, BindError>>;

/// Starts a fetch for one key. Called at most once per in-flight fetch.
pub type Fetcher = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

struct CacheEntry {
    notifier: watch::Sender<QueryState>,
    /// Token of the running fetch; results carrying another token are stale.
    in_flight: Option<Uuid>,
    /// Set once any binder has looked at the entry.
    observed: bool,
}

impl CacheEntry {
    fn new() -> Self {
        let (notifier, _) = watch::channel(QueryState::idle());
        Self {
            notifier,
            in_flight: None,
            observed: false,
        }
    }
}

/// Thread-safe cache handle shared by every binder of one setup.
///
/// The lock is never held across an await; fetches run on spawned tasks and
/// write their result back under the lock.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    defaults: QueryDefaults,
}

impl QueryCache {
    pub fn new(defaults: QueryDefaults) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(HashMap::new()),
                defaults,
            }),
        }
    }

    pub fn defaults(&self) -> &QueryDefaults {
        &self.inner.defaults
    }

    /// Observe `key`, starting a fetch when the entry needs one.
    ///
    /// Joins the in-flight fetch if there is one, so concurrent callers with
    /// equal keys share a single request. Data written by [`set_data`] and
    /// not yet observed counts as fresh for its first observer.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// [`set_data`]: QueryCache::set_data
    pub fn fetch(
        &self,
        key: &CacheKey,
        fetcher: Fetcher,
        options: &QueryOptions,
    ) -> watch::Receiver<QueryState> {
        let stale_time = options
            .stale_time
            .unwrap_or_else(|| self.inner.defaults.stale_time());

        let mut entries = self.inner.entries.lock();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);
        let first_observation = !std::mem::replace(&mut entry.observed, true);

        let start = if !options.enabled {
            false
        } else if entry.in_flight.is_some() {
            tracing::debug!(key = %key, "Joining in-flight fetch");
            false
        } else if options.force_refetch {
            true
        } else {
            let state = entry.notifier.borrow();
            match &state.data {
                None => true,
                Some(_) if first_observation && !state.is_invalidated => false,
                Some(_) => !state.is_fresh(stale_time),
            }
        };

        let fetch_id = Uuid::new_v4();
        if start {
            entry.in_flight = Some(fetch_id);
            entry.notifier.send_modify(QueryState::begin_fetch);
        }

        // Subscribe last so the receiver has already seen the loading state.
        let receiver = entry.notifier.subscribe();
        drop(entries);

        if !start {
            tracing::trace!(key = %key, "Serving cached state");
            return receiver;
        }

        tracing::debug!(key = %key, fetch_id = %fetch_id, "Starting fetch");

        let cache = self.clone();
        let key = key.clone();
        let on_success = options.on_success.clone();
        let on_error = options.on_error.clone();
        tokio::spawn(async move {
            let result = fetcher().await;
            cache.complete(&key, fetch_id, &result);

            match &result {
                Ok(data) => {
                    if let Some(callback) = on_success {
                        callback(data);
                    }
                }
                Err(err) => {
                    if let Some(callback) = on_error {
                        callback(err);
                    }
                }
            }
        });

        receiver
    }

    fn complete(&self, key: &CacheKey, fetch_id: Uuid, result: &Result<Value, BindError>) {
        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries
            .get_mut(key)
            .filter(|entry| entry.in_flight == Some(fetch_id))
        else {
            tracing::debug!(key = %key, fetch_id = %fetch_id, "Entry removed while fetching, dropping result");
            return;
        };

        entry.in_flight = None;
        entry.notifier.send_modify(|state| {
            state.is_fetching = false;
            match result {
                Ok(data) => state.write_data(data.clone()),
                Err(err) => state.write_error(err.clone()),
            }
        });

        match result {
            Ok(_) => tracing::debug!(key = %key, "Fetch succeeded"),
            Err(err) => tracing::debug!(key = %key, code = %err.code(), "Fetch failed"),
        }
    }

    /// Write wire-shaped data for `key` without marking it observed.
    ///
    /// This is the prefetch write: the next observer treats the data as
    /// fresh. Existing observers are notified.
    pub fn set_data(&self, key: CacheKey, data: Value) {
        let mut entries = self.inner.entries.lock();
        let entry = entries.entry(key).or_insert_with(CacheEntry::new);
        entry.notifier.send_modify(|state| state.write_data(data));
    }

    pub fn get_state(&self, key: &CacheKey) -> Option<QueryState> {
        let entries = self.inner.entries.lock();
        entries.get(key).map(|entry| entry.notifier.borrow().clone())
    }

    /// Cached wire-shaped data for `key`.
    pub fn get_data(&self, key: &CacheKey) -> Option<Arc<Value>> {
        let entries = self.inner.entries.lock();
        entries
            .get(key)
            .and_then(|entry| entry.notifier.borrow().data.clone())
    }

    /// Whether `key` holds data younger than `stale_time` (or the default).
    ///
    /// Only the age counts here; the first-observer exemption applies to
    /// [`fetch`](QueryCache::fetch) alone.
    pub fn is_fresh(&self, key: &CacheKey, stale_time: Option<Duration>) -> bool {
        let stale_time = stale_time.unwrap_or_else(|| self.inner.defaults.stale_time());
        let entries = self.inner.entries.lock();
        entries
            .get(key)
            .map(|entry| entry.notifier.borrow().is_fresh(stale_time))
            .unwrap_or(false)
    }

    /// Mark `key` stale so the next bind refetches it.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let entries = self.inner.entries.lock();
        let Some(entry) = entries.get(key) else {
            return false;
        };
        entry.notifier.send_modify(|state| state.is_invalidated = true);
        true
    }

    /// Invalidate every entry of `kind` under `path`, whatever the arguments.
    pub fn invalidate_path(&self, kind: ProcedureKind, path: &str) -> usize {
        let entries = self.inner.entries.lock();
        let mut count = 0;
        for (key, entry) in entries.iter() {
            if key.kind() == kind && key.path() == path {
                entry.notifier.send_modify(|state| state.is_invalidated = true);
                count += 1;
            }
        }
        tracing::debug!(kind = %kind, path = %path, count, "Invalidated entries");
        count
    }

    /// Drop an entry. An in-flight fetch for it discards its result.
    pub fn remove(&self, key: &CacheKey) -> bool {
        self.inner.entries.lock().remove(key).is_some()
    }

    /// Number of live observers of `key`.
    pub fn observer_count(&self, key: &CacheKey) -> usize {
        let entries = self.inner.entries.lock();
        entries
            .get(key)
            .map(|entry| entry.notifier.receiver_count())
            .unwrap_or(0)
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        self.inner.entries.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    pub(super) fn successful_entries(&self) -> Vec<(CacheKey, Arc<Value>)> {
        let entries = self.inner.entries.lock();
        entries
            .iter()
            .filter_map(|(key, entry)| {
                let state = entry.notifier.borrow();
                state.data.clone().map(|data| (key.clone(), data))
            })
            .collect()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(QueryDefaults::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::state::QueryStatus;
    use crate::error::ClientError;
    use crate::key::derive_key;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetcher(calls: Arc<AtomicUsize>, value: Value) -> Fetcher {
        delayed_fetcher(calls, value, Duration::from_millis(20))
    }

    fn delayed_fetcher(calls: Arc<AtomicUsize>, value: Value, delay: Duration) -> Fetcher {
        Arc::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let value = value.clone();
            async move {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            .boxed()
        })
    }

    async fn settle(receiver: &mut watch::Receiver<QueryState>) -> QueryState {
        receiver
            .wait_for(QueryState::is_settled)
            .await
            .expect("entry dropped")
            .clone()
    }

    #[tokio::test]
    async fn concurrent_fetches_are_coalesced() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = derive_key("getUser", &[json!(1)]);
        let fetcher = counting_fetcher(calls.clone(), json!({"id": 1}));

        let mut first = cache.fetch(&key, fetcher.clone(), &QueryOptions::new());
        let mut second = cache.fetch(&key, fetcher, &QueryOptions::new());

        assert_eq!(settle(&mut first).await.status, QueryStatus::Success);
        assert_eq!(settle(&mut second).await.status, QueryStatus::Success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_data_is_refetched_fresh_data_is_not() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = derive_key("list", &[]);
        let fetcher = counting_fetcher(calls.clone(), json!([1, 2]));
        let fresh = QueryOptions::new().stale_time(Duration::from_secs(60));

        let mut receiver = cache.fetch(&key, fetcher.clone(), &fresh);
        settle(&mut receiver).await;
        cache.fetch(&key, fetcher.clone(), &fresh);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Default stale time is zero.
        let mut receiver = cache.fetch(&key, fetcher, &QueryOptions::new());
        assert!(receiver.borrow().is_fetching);
        settle(&mut receiver).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn prefetched_data_is_fresh_for_first_observer_only() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = derive_key("getUser", &[json!(42)]);
        cache.set_data(key.clone(), json!({"id": 42}));
        let fetcher = counting_fetcher(calls.clone(), json!({"id": 42}));

        let receiver = cache.fetch(&key, fetcher.clone(), &QueryOptions::new());
        assert_eq!(receiver.borrow().status, QueryStatus::Success);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let mut receiver = cache.fetch(&key, fetcher, &QueryOptions::new());
        settle(&mut receiver).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidated_entries_refetch() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = derive_key("getUser", &[json!(7)]);
        let fetcher = counting_fetcher(calls.clone(), json!("v"));
        let fresh = QueryOptions::new().stale_time(Duration::from_secs(60));

        let mut receiver = cache.fetch(&key, fetcher.clone(), &fresh);
        settle(&mut receiver).await;

        assert_eq!(cache.invalidate_path(ProcedureKind::Query, "getUser"), 1);
        assert_eq!(cache.invalidate_path(ProcedureKind::Subscription, "getUser"), 0);
        assert!(!cache.is_fresh(&key, Some(Duration::from_secs(60))));

        let mut receiver = cache.fetch(&key, fetcher, &fresh);
        let state = settle(&mut receiver).await;
        assert!(!state.is_invalidated);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_fetch_only_observes() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = derive_key("lazy", &[]);

        let receiver = cache.fetch(
            &key,
            counting_fetcher(calls.clone(), json!(1)),
            &QueryOptions::new().disabled(),
        );
        assert_eq!(receiver.borrow().status, QueryStatus::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failures_are_stored_and_reported() {
        let cache = QueryCache::default();
        let key = derive_key("missing", &[]);
        let fetcher: Fetcher =
            Arc::new(|| async { Err::<Value, BindError>(ClientError::not_found("missing").into()) }.boxed());
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_callback = seen.clone();
        let options = QueryOptions::new().on_error(move |err| {
            assert_eq!(err.code(), "E_NOT_FOUND");
            seen_in_callback.fetch_add(1, Ordering::SeqCst);
        });

        let mut receiver = cache.fetch(&key, fetcher, &options);
        let state = settle(&mut receiver).await;
        assert_eq!(state.status, QueryStatus::Error);
        assert_eq!(state.error.as_ref().map(|e| e.code()), Some("E_NOT_FOUND"));

        tokio::task::yield_now().await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn removed_entry_drops_late_result() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = derive_key("slow", &[]);

        let receiver = cache.fetch(&key, counting_fetcher(calls, json!(1)), &QueryOptions::new());
        assert_eq!(cache.observer_count(&key), 1);
        drop(receiver);
        assert_eq!(cache.observer_count(&key), 0);

        assert!(cache.remove(&key));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get_state(&key).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn fetch_from_before_remove_leaves_new_entry_alone() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = derive_key("slow", &[]);

        let old = delayed_fetcher(calls.clone(), json!("old"), Duration::from_millis(40));
        let _first = cache.fetch(&key, old, &QueryOptions::new());
        assert!(cache.remove(&key));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let new = delayed_fetcher(calls.clone(), json!("new"), Duration::from_millis(200));
        let mut second = cache.fetch(&key, new.clone(), &QueryOptions::new());

        // The first fetch has finished by now; its result must not land.
        tokio::time::sleep(Duration::from_millis(70)).await;
        let state = cache.get_state(&key).unwrap();
        assert!(state.is_fetching);
        assert!(state.data.is_none());

        let _third = cache.fetch(&key, new, &QueryOptions::new());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let state = settle(&mut second).await;
        assert_eq!(state.data.as_deref(), Some(&json!("new")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn is_fresh_ignores_unobserved_exemption() {
        let cache = QueryCache::default();
        let key = derive_key("getUser", &[json!(1)]);
        cache.set_data(key.clone(), json!({"id": 1}));

        assert!(!cache.is_fresh(&key, None));
        assert!(cache.is_fresh(&key, Some(Duration::from_secs(60))));
    }
}
