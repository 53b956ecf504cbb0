//! RPC client collaborator.
//!
//! The binding layer only needs [`RpcClient`]; [`HttpRpcClient`] is one
//! concrete implementation speaking a small JSON-over-HTTP protocol.

mod http;
mod traits;

pub use http::HttpRpcClient;
pub use traits::{ProcedureCall, ProcedureKind, RpcClient};
