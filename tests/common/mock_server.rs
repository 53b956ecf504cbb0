//! Mock HTTP endpoint server speaking the JSON envelope protocol.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// A request as seen by the server.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Clone, Default)]
struct ServerState {
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

pub struct MockServer {
    pub addr: SocketAddr,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockServer {
    /// Start the server on a free local port.
    ///
    /// Procedures:
    /// - `getUser`: echoes `{"id": args[0], "name": "Ada"}`
    /// - `createUser`: POST, answers `{"id": 1, "name": args[0]}`
    /// - `onTick`: answers `{"tick": 1}` when called as a subscription
    /// - `forbidden`: error envelope with `E_FORBIDDEN`
    /// - `broken`: 500 with a plain-text body
    /// - `garbage`: 200 with a non-JSON body
    pub async fn start() -> Self {
        let state = ServerState::default();
        let captured = state.captured.clone();

        let app = Router::new()
            .route("/rpc/{path}", get(handle_get).post(handle_post))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, captured }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/rpc", self.addr)
    }

    pub fn captured(&self) -> Vec<CapturedRequest> {
        self.captured.lock().clone()
    }
}

fn ok(data: Value) -> (StatusCode, String) {
    (StatusCode::OK, json!({ "ok": true, "data": data }).to_string())
}

fn dispatch(path: &str, args: &[Value], is_subscription: bool) -> (StatusCode, String) {
    match (path, is_subscription) {
        ("getUser", false) => ok(json!({ "id": args.first().cloned().unwrap_or(Value::Null), "name": "Ada" })),
        ("createUser", false) => ok(json!({ "id": 1, "name": args.first().cloned().unwrap_or(Value::Null) })),
        ("onTick", true) => ok(json!({ "tick": 1 })),
        ("forbidden", _) => (
            StatusCode::FORBIDDEN,
            json!({ "ok": false, "error": { "code": "E_FORBIDDEN", "message": "not allowed" } })
                .to_string(),
        ),
        ("broken", _) => (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()),
        ("garbage", _) => (StatusCode::OK, "not json".to_string()),
        _ => (
            StatusCode::NOT_FOUND,
            json!({ "ok": false, "error": { "code": "E_NOT_FOUND", "message": format!("no procedure '{}'", path) } })
                .to_string(),
        ),
    }
}

async fn handle_get(
    State(state): State<ServerState>,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    let args: Vec<Value> = query
        .get("args")
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default();
    let is_subscription = query.get("type").map(String::as_str) == Some("subscription");

    state.captured.lock().push(CapturedRequest {
        method: "GET".to_string(),
        path: path.clone(),
        query: query.clone(),
        body: None,
    });

    dispatch(&path, &args, is_subscription)
}

async fn handle_post(
    State(state): State<ServerState>,
    Path(path): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    let args: Vec<Value> = body
        .get("args")
        .and_then(|args| args.as_array().cloned())
        .unwrap_or_default();

    state.captured.lock().push(CapturedRequest {
        method: "POST".to_string(),
        path: path.clone(),
        query: HashMap::new(),
        body: Some(body.clone()),
    });

    dispatch(&path, &args, false)
}
