use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::BindError;

pub type SuccessCallback = Arc<dyn Fn(&Value) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&BindError) + Send + Sync>;

/// Per-call cache behavior and callbacks.
///
/// Passed through to the cache; the binders only wrap the success callback
/// so it sees deserialized data.
#[derive(Clone)]
pub struct QueryOptions {
    pub(crate) stale_time: Option<Duration>,
    pub(crate) enabled: bool,
    pub(crate) force_refetch: bool,
    pub(crate) on_success: Option<SuccessCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self {
            stale_time: None,
            enabled: true,
            force_refetch: false,
            on_success: None,
            on_error: None,
        }
    }

    /// Override the configured stale time for this call.
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    /// Observe the entry without ever fetching it.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Fetch even if the cached data is fresh.
    pub fn force_refetch(mut self) -> Self {
        self.force_refetch = true;
        self
    }

    pub fn on_success(mut self, callback: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&BindError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("stale_time", &self.stale_time)
            .field("enabled", &self.enabled)
            .field("force_refetch", &self.force_refetch)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
