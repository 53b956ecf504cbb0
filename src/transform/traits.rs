//! Core trait for data transformers.

use serde_json::Value;

use super::error::TransformError;

/// A pair of functions mapping values to their wire form and back.
///
/// For every value exchanged, `deserialize(serialize(v))` should be
/// observably equal to `v`. Nothing checks this; a transformer that breaks
/// it corrupts data rather than failing.
pub trait DataTransformer: Send + Sync {
    /// Returns the name of this transformer for logging.
    fn name(&self) -> &'static str;

    /// Turn a value into its wire form.
    fn serialize(&self, value: &Value) -> Result<Value, TransformError>;

    /// Turn a wire value back into a value.
    fn deserialize(&self, wire: &Value) -> Result<Value, TransformError>;
}

/// Transformer that passes values through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl DataTransformer for IdentityTransformer {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn serialize(&self, value: &Value) -> Result<Value, TransformError> {
        Ok(value.clone())
    }

    fn deserialize(&self, wire: &Value) -> Result<Value, TransformError> {
        Ok(wire.clone())
    }
}
