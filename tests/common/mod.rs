//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_server;

use async_trait::async_trait;
use parking_lot::Mutex;
use querybind::{
    Bindings, ClientError, DataTransformer, ProcedureCall, ProcedureKind, QueryCache, RpcClient,
    TransformError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted RPC client that records every call.
pub struct MockClient {
    responses: Mutex<HashMap<(ProcedureKind, String), Result<Value, ClientError>>>,
    calls: Mutex<Vec<ProcedureCall>>,
    delay: Duration,
}

impl MockClient {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay,
        }
    }

    pub fn respond(&self, kind: ProcedureKind, path: &str, value: Value) {
        self.responses
            .lock()
            .insert((kind, path.to_string()), Ok(value));
    }

    pub fn fail(&self, kind: ProcedureKind, path: &str, error: ClientError) {
        self.responses
            .lock()
            .insert((kind, path.to_string()), Err(error));
    }

    pub fn calls(&self) -> Vec<ProcedureCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl RpcClient for MockClient {
    async fn request(&self, call: ProcedureCall) -> Result<Value, ClientError> {
        self.calls.lock().push(call.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let response = self
            .responses
            .lock()
            .get(&(call.kind, call.path.clone()))
            .cloned();
        response.unwrap_or_else(|| {
            Err(ClientError::not_found(format!(
                "No {} procedure '{}'",
                call.kind, call.path
            )))
        })
    }

    async fn subscription_once(&self, path: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        self.request(ProcedureCall::new(ProcedureKind::Subscription, path, args))
            .await
    }
}

/// Bindings over a fresh cache with the identity transformer.
pub fn bindings(client: &Arc<MockClient>) -> Bindings {
    Bindings::new(client.clone(), QueryCache::default())
}

/// Doubles the numeric `id` field on the way back; passes everything else.
pub struct DoubleIdTransformer;

impl DataTransformer for DoubleIdTransformer {
    fn name(&self) -> &'static str {
        "double-id"
    }

    fn serialize(&self, value: &Value) -> Result<Value, TransformError> {
        Ok(value.clone())
    }

    fn deserialize(&self, wire: &Value) -> Result<Value, TransformError> {
        let mut value = wire.clone();
        if let Some(id) = value.get("id").and_then(Value::as_i64) {
            value["id"] = json!(id * 2);
        }
        Ok(value)
    }
}

/// Wraps values in `{"$v": ...}` on the way out and unwraps on the way back.
pub struct EnvelopeTransformer;

impl DataTransformer for EnvelopeTransformer {
    fn name(&self) -> &'static str {
        "envelope"
    }

    fn serialize(&self, value: &Value) -> Result<Value, TransformError> {
        Ok(json!({ "$v": value }))
    }

    fn deserialize(&self, wire: &Value) -> Result<Value, TransformError> {
        wire.get("$v")
            .cloned()
            .ok_or_else(|| TransformError::Deserialize(format!("not an envelope: {}", wire)))
    }
}

/// Identity transformer that counts deserializations.
#[derive(Default)]
pub struct CountingTransformer {
    deserialized: AtomicUsize,
}

impl CountingTransformer {
    pub fn deserialize_count(&self) -> usize {
        self.deserialized.load(Ordering::SeqCst)
    }
}

impl DataTransformer for CountingTransformer {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn serialize(&self, value: &Value) -> Result<Value, TransformError> {
        Ok(value.clone())
    }

    fn deserialize(&self, wire: &Value) -> Result<Value, TransformError> {
        self.deserialized.fetch_add(1, Ordering::SeqCst);
        Ok(wire.clone())
    }
}

/// Rejects strings when serializing.
pub struct NoStringsTransformer;

impl DataTransformer for NoStringsTransformer {
    fn name(&self) -> &'static str {
        "no-strings"
    }

    fn serialize(&self, value: &Value) -> Result<Value, TransformError> {
        if value.is_string() {
            return Err(TransformError::Serialize("strings are not allowed".to_string()));
        }
        Ok(value.clone())
    }

    fn deserialize(&self, wire: &Value) -> Result<Value, TransformError> {
        Ok(wire.clone())
    }
}
