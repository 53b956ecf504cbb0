use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BindError;

/// Lifecycle of a cached operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of one cache entry as seen by observers.
#[derive(Debug, Clone)]
pub struct QueryState {
    pub status: QueryStatus,
    /// Wire-shaped value from the last successful fetch or prefetch.
    pub data: Option<Arc<Value>>,
    /// Error from the last failed fetch.
    pub error: Option<BindError>,
    pub is_fetching: bool,
    /// Bumped on every data write.
    pub data_version: u64,
    pub updated_at: Option<Instant>,
    pub is_invalidated: bool,
}

impl QueryState {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_fetching: false,
            data_version: 0,
            updated_at: None,
            is_invalidated: false,
        }
    }

    /// True once a fetch has finished and none is running.
    pub fn is_settled(&self) -> bool {
        !self.is_fetching && matches!(self.status, QueryStatus::Success | QueryStatus::Error)
    }

    /// Data is present, not invalidated and younger than `stale_time`.
    pub fn is_fresh(&self, stale_time: Duration) -> bool {
        if self.data.is_none() || self.is_invalidated {
            return false;
        }
        self.updated_at
            .map(|at| at.elapsed() < stale_time)
            .unwrap_or(false)
    }

    pub(crate) fn begin_fetch(&mut self) {
        self.is_fetching = true;
        if self.data.is_none() {
            self.status = QueryStatus::Loading;
        }
    }

    pub(crate) fn write_data(&mut self, data: Value) {
        self.status = QueryStatus::Success;
        self.data = Some(Arc::new(data));
        self.error = None;
        self.data_version += 1;
        self.updated_at = Some(Instant::now());
        self.is_invalidated = false;
    }

    pub(crate) fn write_error(&mut self, error: BindError) {
        self.status = QueryStatus::Error;
        self.error = Some(error);
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self::idle()
    }
}
