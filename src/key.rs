//! Cache key derivation.
//!
//! A key is the ordered sequence `[path, ...args]` using the argument values
//! as supplied by the caller, before serialization. The live query path and
//! the prefetch path derive keys the same way, so a prefetched entry is found
//! by a later live query.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ProcedureKind;

/// Identity of a cached result.
///
/// Equality and hashing are by value and order sensitive. Queries and
/// subscriptions live in separate namespaces, so the same path used for
/// both never shares an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    kind: ProcedureKind,
    path: String,
    args: Vec<Value>,
}

/// Derive the query key for `path` called with `args`.
pub fn derive_key(path: &str, args: &[Value]) -> CacheKey {
    CacheKey::new(ProcedureKind::Query, path, args)
}

impl CacheKey {
    fn new(kind: ProcedureKind, path: &str, args: &[Value]) -> Self {
        Self {
            kind,
            path: path.to_string(),
            args: args.to_vec(),
        }
    }

    /// Key for a one-shot subscription fetch.
    pub fn subscription(path: &str, args: &[Value]) -> Self {
        Self::new(ProcedureKind::Subscription, path, args)
    }

    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The key as an ordered sequence: path first, then the arguments.
    pub fn segments(&self) -> Vec<Value> {
        let mut segments = Vec::with_capacity(self.args.len() + 1);
        segments.push(Value::String(self.path.clone()));
        segments.extend(self.args.iter().cloned());
        segments
    }
}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.path.hash(state);
        self.args.len().hash(state);
        for arg in &self.args {
            hash_value(arg, state);
        }
    }
}

/// Hash a JSON value consistently with its `PartialEq`.
///
/// Floats compare with `==`, so `-0.0` hashes as `0.0`. Object members are
/// hashed in key order whatever the map's iteration order.
fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Number(n) => {
            2u8.hash(state);
            if let Some(u) = n.as_u64() {
                0u8.hash(state);
                u.hash(state);
            } else if let Some(i) = n.as_i64() {
                1u8.hash(state);
                i.hash(state);
            } else if let Some(f) = n.as_f64() {
                2u8.hash(state);
                let f = if f == 0.0 { 0.0 } else { f };
                f.to_bits().hash(state);
            }
        }
        Value::String(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        Value::Array(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            5u8.hash(state);
            map.len().hash(state);
            let mut members: Vec<_> = map.iter().collect();
            members.sort_unstable_by(|a, b| a.0.cmp(b.0));
            for (name, member) in members {
                name.hash(state);
                hash_value(member, state);
            }
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, Value::Array(self.segments()))
    }
}
