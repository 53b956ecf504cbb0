use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cache::{ErrorCallback, QueryStatus, SuccessCallback};
use crate::client::{ProcedureCall, ProcedureKind, RpcClient};
use crate::error::BindError;
use crate::transform::TransformPipeline;

use super::Bindings;

/// Callbacks for a bound mutation.
#[derive(Clone, Default)]
pub struct MutationOptions {
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl MutationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the deserialized result of every successful call.
    pub fn on_success(mut self, callback: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&BindError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for MutationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationOptions")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// State of the latest call made through one [`Mutation`] handle.
#[derive(Debug, Clone)]
pub struct MutationState {
    pub status: QueryStatus,
    /// Deserialized result of the latest successful call.
    pub data: Option<Value>,
    pub error: Option<BindError>,
    /// Arguments of the latest call, before serialization.
    pub variables: Option<Vec<Value>>,
}

impl MutationState {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            variables: None,
        }
    }
}

impl Default for MutationState {
    fn default() -> Self {
        Self::idle()
    }
}

struct MutationShared {
    state: MutationState,
    latest_call: Option<Uuid>,
}

/// A bound mutation endpoint.
///
/// Calls are not cached or coalesced; each runs to completion on its own.
/// Clones share state, so a clone moved into a task reports back to the
/// same handle.
#[derive(Clone)]
pub struct Mutation {
    path: String,
    arity: Option<usize>,
    client: Arc<dyn RpcClient>,
    pipeline: TransformPipeline,
    options: MutationOptions,
    shared: Arc<Mutex<MutationShared>>,
}

impl Mutation {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> MutationState {
        self.shared.lock().state.clone()
    }

    /// Forget the latest call; a call still running no longer reports here.
    pub fn reset(&self) {
        let mut shared = self.shared.lock();
        shared.state = MutationState::idle();
        shared.latest_call = None;
    }

    /// Run the mutation and resolve with the deserialized result.
    ///
    /// Argument serialization failures are returned before anything is
    /// sent and leave the state untouched.
    pub async fn mutate_async(&self, args: Vec<Value>) -> Result<Value, BindError> {
        if let Some(expected) = self.arity {
            if expected != args.len() {
                return Err(BindError::ArityMismatch {
                    path: self.path.clone(),
                    expected,
                    actual: args.len(),
                });
            }
        }

        let wire_args = self.pipeline.serialize_args(&args)?;
        let call_id = Uuid::new_v4();
        self.begin(call_id, args);

        let result = match self.execute(call_id, wire_args).await {
            Ok(raw) => self
                .pipeline
                .deserialize_result(&raw)
                .map_err(BindError::from),
            Err(err) => Err(err),
        };

        self.finish(call_id, &result);
        result
    }

    /// Run the mutation on a spawned task.
    pub fn mutate(&self, args: Vec<Value>) -> JoinHandle<Result<Value, BindError>> {
        let mutation = self.clone();
        tokio::spawn(async move { mutation.mutate_async(args).await })
    }

    /// Send the call and return the raw wire value.
    async fn execute(&self, call_id: Uuid, wire_args: Vec<Value>) -> Result<Value, BindError> {
        tracing::debug!(path = %self.path, call_id = %call_id, "Executing mutation");
        let call = ProcedureCall::new(ProcedureKind::Mutation, self.path.clone(), wire_args);
        self.client.request(call).await.map_err(BindError::from)
    }

    fn begin(&self, call_id: Uuid, args: Vec<Value>) {
        let mut shared = self.shared.lock();
        shared.latest_call = Some(call_id);
        shared.state = MutationState {
            status: QueryStatus::Loading,
            data: None,
            error: None,
            variables: Some(args),
        };
    }

    fn finish(&self, call_id: Uuid, result: &Result<Value, BindError>) {
        {
            let mut shared = self.shared.lock();
            if shared.latest_call == Some(call_id) {
                match result {
                    Ok(value) => {
                        shared.state.status = QueryStatus::Success;
                        shared.state.data = Some(value.clone());
                    }
                    Err(err) => {
                        shared.state.status = QueryStatus::Error;
                        shared.state.error = Some(err.clone());
                    }
                }
            } else {
                tracing::trace!(path = %self.path, call_id = %call_id, "Superseded mutation finished");
            }
        }

        match result {
            Ok(value) => {
                tracing::debug!(path = %self.path, call_id = %call_id, "Mutation succeeded");
                if let Some(callback) = &self.options.on_success {
                    callback(value);
                }
            }
            Err(err) => {
                tracing::debug!(path = %self.path, call_id = %call_id, code = %err.code(), "Mutation failed");
                if let Some(callback) = &self.options.on_error {
                    callback(err);
                }
            }
        }
    }
}

impl Bindings {
    /// Bind a mutation endpoint.
    pub fn bind_mutation(
        &self,
        path: &str,
        options: MutationOptions,
    ) -> Result<Mutation, BindError> {
        self.validate(ProcedureKind::Mutation, path, None)?;

        Ok(Mutation {
            path: path.to_string(),
            arity: self.declared_arity(ProcedureKind::Mutation, path),
            client: Arc::clone(&self.client),
            pipeline: self.pipeline.clone(),
            options,
            shared: Arc::new(Mutex::new(MutationShared {
                state: MutationState::idle(),
                latest_call: None,
            })),
        })
    }
}
