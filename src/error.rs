//! Error types shared by the binding layer.
//!
//! Collaborator failures arrive as [`ClientError`] and are relayed untouched;
//! the layer itself only adds transform and endpoint validation failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ProcedureKind;
use crate::transform::TransformError;

/// Well-known client error codes produced inside this crate.
pub mod codes {
    pub const TRANSPORT: &str = "E_TRANSPORT";
    pub const BAD_RESPONSE: &str = "E_BAD_RESPONSE";
    pub const NOT_FOUND: &str = "E_NOT_FOUND";
    pub const TRANSFORM: &str = "E_TRANSFORM";
    pub const UNKNOWN_ENDPOINT: &str = "E_UNKNOWN_ENDPOINT";
    pub const ARITY: &str = "E_ARITY";
}

/// Failure reported by an RPC client or router.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ClientError {
    /// Machine-readable code (e.g. `E_NOT_FOUND`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ClientError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(codes::TRANSPORT, message)
    }

    pub fn bad_response(message: impl Into<String>) -> Self {
        Self::new(codes::BAD_RESPONSE, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(codes::NOT_FOUND, message)
    }
}

/// Errors surfaced by bind, mutate and prefetch operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    /// Transport, protocol or application failure from a collaborator.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// The configured transformer rejected a value.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// The path is not registered for this endpoint kind.
    #[error("Unknown {kind} endpoint '{path}'")]
    UnknownEndpoint { kind: ProcedureKind, path: String },

    /// The registry declares a different argument count.
    #[error("Endpoint '{path}' expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },
}

impl BindError {
    /// Machine-readable code; the original code for client errors.
    pub fn code(&self) -> &str {
        match self {
            BindError::Client(err) => &err.code,
            BindError::Transform(_) => codes::TRANSFORM,
            BindError::UnknownEndpoint { .. } => codes::UNKNOWN_ENDPOINT,
            BindError::ArityMismatch { .. } => codes::ARITY,
        }
    }

    /// The underlying client error, if this is one.
    pub fn as_client(&self) -> Option<&ClientError> {
        match self {
            BindError::Client(err) => Some(err),
            _ => None,
        }
    }
}
