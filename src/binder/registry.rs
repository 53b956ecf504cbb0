use std::collections::HashMap;

use crate::client::ProcedureKind;
use crate::config::EndpointConfig;
use crate::error::BindError;

/// Known endpoints per kind, with an optional declared argument count.
///
/// A path is only meaningful inside its kind: `"user"` may be registered as
/// both a query and a mutation.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<(ProcedureKind, String), Option<usize>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(endpoints: &[EndpointConfig]) -> Self {
        endpoints.iter().fold(Self::new(), |registry, endpoint| {
            registry.with(endpoint.kind, endpoint.path.clone(), endpoint.arity)
        })
    }

    /// Register `path` under `kind`; re-registering replaces the arity.
    pub fn with(mut self, kind: ProcedureKind, path: impl Into<String>, arity: Option<usize>) -> Self {
        self.register(kind, path, arity);
        self
    }

    pub fn register(&mut self, kind: ProcedureKind, path: impl Into<String>, arity: Option<usize>) {
        self.endpoints.insert((kind, path.into()), arity);
    }

    pub fn contains(&self, kind: ProcedureKind, path: &str) -> bool {
        self.endpoints.contains_key(&(kind, path.to_string()))
    }

    pub fn arity(&self, kind: ProcedureKind, path: &str) -> Option<usize> {
        self.endpoints.get(&(kind, path.to_string())).copied().flatten()
    }

    /// Check that `path` exists for `kind` and, when both are known, that
    /// the argument count matches the declared arity.
    pub fn validate(
        &self,
        kind: ProcedureKind,
        path: &str,
        arg_count: Option<usize>,
    ) -> Result<(), BindError> {
        let Some(declared) = self.endpoints.get(&(kind, path.to_string())) else {
            return Err(BindError::UnknownEndpoint {
                kind,
                path: path.to_string(),
            });
        };

        if let (Some(expected), Some(actual)) = (*declared, arg_count) {
            if expected != actual {
                return Err(BindError::ArityMismatch {
                    path: path.to_string(),
                    expected,
                    actual,
                });
            }
        }

        Ok(())
    }

    /// Registered paths of `kind`, sorted.
    pub fn paths(&self, kind: ProcedureKind) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .endpoints
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, path)| path.as_str())
            .collect();
        paths.sort_unstable();
        paths
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
