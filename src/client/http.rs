use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::error::ClientError;

use super::traits::{ProcedureCall, ProcedureKind, RpcClient};

/// Response envelope returned by the server for every call.
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<ClientError>,
}

/// [`RpcClient`] over HTTP.
///
/// Queries and one-shot subscriptions are `GET {base}/{path}?args=[...]`,
/// mutations are `POST {base}/{path}` with `{"args": [...]}`.
pub struct HttpRpcClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpRpcClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds as u64))
            .build()
            .map_err(|e| ClientError::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_seconds as u64),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_url(&self, path: &str, args: Option<&[Value]>, kind: ProcedureKind) -> Result<Url, ClientError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| ClientError::transport(format!("Invalid endpoint URL for '{}': {}", path, e)))?;

        if let Some(args) = args {
            let encoded = Value::Array(args.to_vec()).to_string();
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("args", &encoded);
            if kind == ProcedureKind::Subscription {
                pairs.append_pair("type", kind.as_str());
            }
        }

        Ok(url)
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> Result<Value, ClientError> {
        let response = builder
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::transport(format!(
                        "Request to '{}' timed out after {}s",
                        path,
                        self.timeout.as_secs()
                    ))
                } else {
                    ClientError::transport(format!("Request to '{}' failed: {}", path, e))
                }
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::transport(format!("Failed to read response body: {}", e)))?;

        let envelope: Envelope = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ClientError::new(
                    format!("E_HTTP_{}", status.as_u16()),
                    format!("'{}' returned {}", path, status),
                ));
            }
            Err(e) => {
                return Err(ClientError::bad_response(format!(
                    "Malformed response from '{}': {}",
                    path, e
                )));
            }
        };

        if envelope.ok {
            tracing::trace!(path = %path, status = status.as_u16(), "RPC call succeeded");
            return Ok(envelope.data.unwrap_or(Value::Null));
        }

        let error = envelope.error.unwrap_or_else(|| {
            ClientError::new(
                format!("E_HTTP_{}", status.as_u16()),
                format!("'{}' failed without an error body", path),
            )
        });
        tracing::debug!(path = %path, code = %error.code, "RPC call returned an error");
        Err(error)
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn request(&self, call: ProcedureCall) -> Result<Value, ClientError> {
        let builder = match call.kind {
            ProcedureKind::Mutation => {
                let url = self.endpoint_url(&call.path, None, call.kind)?;
                self.client.post(url).json(&json!({ "args": call.args }))
            }
            ProcedureKind::Query | ProcedureKind::Subscription => {
                let url = self.endpoint_url(&call.path, Some(&call.args), call.kind)?;
                self.client.get(url)
            }
        };

        self.send(builder, &call.path).await
    }

    async fn subscription_once(&self, path: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        let url = self.endpoint_url(path, Some(&args), ProcedureKind::Subscription)?;
        self.send(self.client.get(url), path).await
    }
}
