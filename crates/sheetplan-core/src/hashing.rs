//! Payload hashing for the idempotency ledger.
use serde_json::Value;
use std::collections::BTreeMap;

/// Serialize with object keys sorted at every level, independent of how the
/// `Value` map is ordered internally.
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.to_string(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, canonical_json(v))).collect();
            let items: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

pub fn payload_hash(payload: &Value) -> String {
    format!("blake3:{}", blake3::hash(canonical_json(payload).as_bytes()))
}
