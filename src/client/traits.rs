use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// The three disjoint endpoint namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    Query,
    Mutation,
    Subscription,
}

impl ProcedureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcedureKind::Query => "query",
            ProcedureKind::Mutation => "mutation",
            ProcedureKind::Subscription => "subscription",
        }
    }
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outbound call with already-serialized arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    pub kind: ProcedureKind,
    pub path: String,
    pub args: Vec<Value>,
}

impl ProcedureCall {
    pub fn new(kind: ProcedureKind, path: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            kind,
            path: path.into(),
            args,
        }
    }
}

/// Transport used by the binders.
///
/// Implementations own connection handling and any retry policy. Values in
/// and out are wire-shaped; the binders apply the transformer.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Execute a query or mutation.
    async fn request(&self, call: ProcedureCall) -> Result<Value, ClientError>;

    /// Fetch a single value from a subscription endpoint.
    async fn subscription_once(&self, path: &str, args: Vec<Value>) -> Result<Value, ClientError>;
}
