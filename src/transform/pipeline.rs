use std::sync::Arc;

use serde_json::Value;

use super::error::TransformError;
use super::traits::{DataTransformer, IdentityTransformer};

/// Applies the configured transformer to arguments and results.
///
/// Cloning is cheap; every binder built from one setup shares the same
/// transformer.
#[derive(Clone)]
pub struct TransformPipeline {
    transformer: Arc<dyn DataTransformer>,
}

impl TransformPipeline {
    pub fn new(transformer: Arc<dyn DataTransformer>) -> Self {
        Self { transformer }
    }

    pub fn identity() -> Self {
        Self::new(Arc::new(IdentityTransformer))
    }

    pub fn transformer_name(&self) -> &'static str {
        self.transformer.name()
    }

    /// Serialize each argument, preserving order and arity.
    pub fn serialize_args(&self, args: &[Value]) -> Result<Vec<Value>, TransformError> {
        args.iter()
            .map(|arg| self.transformer.serialize(arg))
            .collect()
    }

    /// Serialize a resolver result into the wire shape stored in the cache.
    pub fn serialize_result(&self, value: &Value) -> Result<Value, TransformError> {
        self.transformer.serialize(value)
    }

    pub fn deserialize_result(&self, wire: &Value) -> Result<Value, TransformError> {
        self.transformer.deserialize(wire)
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("transformer", &self.transformer.name())
            .finish()
    }
}
