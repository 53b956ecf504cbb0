//! Symmetric serialize/deserialize pipeline.
//!
//! Arguments are serialized on the way out, results deserialized on the way
//! back. The prefetch path serializes results so the cache always holds
//! wire-shaped values.

mod error;
mod pipeline;
mod traits;

pub use error::TransformError;
pub use pipeline::TransformPipeline;
pub use traits::{DataTransformer, IdentityTransformer};
