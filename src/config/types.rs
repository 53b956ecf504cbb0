use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::ProcedureKind;

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: QueryDefaults,
    #[serde(default)]
    pub client: ClientConfig,
    /// Known endpoints. When non-empty, binds are validated against them.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// Cache behavior applied when a bind does not override it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDefaults {
    /// How long fetched data stays fresh, in milliseconds (default: 0).
    #[serde(default = "default_stale_time_ms")]
    pub stale_time_ms: u64,
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoint base URL; procedure paths are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Connection timeout in seconds (default: 5).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
}

/// A registered endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub kind: ProcedureKind,
    pub path: String,
    /// Expected argument count; unchecked when absent.
    #[serde(default)]
    pub arity: Option<usize>,
}

impl QueryDefaults {
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }
}

fn default_stale_time_ms() -> u64 {
    0
}

fn default_base_url() -> String {
    "http://127.0.0.1:4000/rpc".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_connect_timeout() -> u32 {
    5
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            stale_time_ms: default_stale_time_ms(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}
