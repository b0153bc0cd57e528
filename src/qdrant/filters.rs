//! Filter helpers scoping Qdrant requests to one document namespace.

use serde_json::{Value, json};

/// Payload field holding the owning document id.
pub const NAMESPACE_FIELD: &str = "doc_id";

/// Filter matching every point of `namespace`.
pub fn namespace_filter(namespace: &str) -> Value {
    json!({
        "must": [
            {
                "key": NAMESPACE_FIELD,
                "match": { "value": namespace }
            }
        ]
    })
}
