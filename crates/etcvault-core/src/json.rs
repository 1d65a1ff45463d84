//! Rewriter for etcd JSON responses.
//!
//! Walks the well-known response shape — `node` and `prevNode` at the top
//! level, `nodes` arrays below — and runs every string `value` through the
//! engine. Per-node failures never fail the document: the original value is
//! kept and an `_etcvault_error` field records the message.

use serde_json::{Map, Value};

use crate::engine::Engine;
use crate::error::EngineError;

/// Recursion bound for `nodes` nesting; deeper nodes are left untouched.
const MAX_DEPTH: u32 = 100;

impl Engine {
    /// Rewrite an etcd JSON response body.
    ///
    /// Bodies that are not JSON, or not a JSON object, are returned
    /// byte-identical with no error. `serde_json` keeps object keys in
    /// sorted order, so output is stable across invocations.
    pub fn transform_etcd_response(&self, body: &[u8]) -> Result<Vec<u8>, EngineError> {
        let Ok(mut doc) = serde_json::from_slice::<Value>(body) else {
            return Ok(body.to_vec());
        };
        let Value::Object(root) = &mut doc else {
            return Ok(body.to_vec());
        };

        for field in ["node", "prevNode"] {
            if let Some(Value::Object(node)) = root.get_mut(field) {
                self.transform_node(node, 0);
            }
        }

        Ok(serde_json::to_vec(&doc)?)
    }

    fn transform_node(&self, node: &mut Map<String, Value>, depth: u32) {
        if depth > MAX_DEPTH {
            return;
        }

        if let Some(Value::String(value)) = node.get("value") {
            let value = value.clone();
            match self.transform(&value) {
                Ok(transformed) => {
                    node.insert("value".to_owned(), Value::String(transformed));
                }
                Err(err) => {
                    node.insert(
                        "_etcvault_error".to_owned(),
                        Value::String(err.to_string()),
                    );
                }
            }
        }

        if let Some(Value::Array(children)) = node.get_mut("nodes") {
            for child in children {
                if let Value::Object(child) = child {
                    self.transform_node(child, depth + 1);
                }
            }
        }
    }
}
