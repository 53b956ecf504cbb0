//! Error types for value transformation.

use thiserror::Error;

/// Errors raised by a [`DataTransformer`](super::DataTransformer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// Value could not be turned into its wire form.
    #[error("serialize failed: {0}")]
    Serialize(String),

    /// Wire value could not be turned back into a value.
    #[error("deserialize failed: {0}")]
    Deserialize(String),
}
