//! Canonical JSON serialization and `payload_hash` computation.
//!
//! The hash is taken over a key-sorted, whitespace-free JSON rendering of
//! the raw payload so that two byte-for-byte-different-but-semantically-
//! identical submissions (differing only in key order or incidental
//! whitespace) hash the same.

use serde_json::Value;

use crate::types::IngestPayload;

/// Renders `value` with object keys sorted recursively and no insignificant
/// whitespace, then returns the UTF-8 bytes of that rendering.
pub fn canonical_json(value: &Value) -> Vec<u8> {
    let sorted = sort_keys(value);
    serde_json::to_vec(&sorted).expect("canonicalized JSON value always serializes")
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// `payload_hash`: SHA-256 over the canonical JSON rendering of `payload`.
pub fn payload_hash(payload: &IngestPayload) -> String {
    let value = serde_json::to_value(payload).expect("IngestPayload always serializes");
    let bytes = canonical_json(&value);
    canonical::sha256_hex(&String::from_utf8_lossy(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceMetadata;

    fn payload() -> IngestPayload {
        IngestPayload {
            payload_version: "v1".to_string(),
            source: "example-wire".to_string(),
            source_item_id: "abc-123".to_string(),
            title: "Something happened".to_string(),
            source_metadata: SourceMetadata {
                collection: "world-news".to_string(),
                job_name: "example-job".to_string(),
                job_run_id: "run-1".to_string(),
                scraped_at: "2026-07-28T12:00:00Z".to_string(),
                extra: serde_json::Map::new(),
            },
            canonical_url: Some("https://example.com/a".to_string()),
            image_url: None,
            published_at: None,
            body_text: None,
            language: None,
            source_domain: None,
            authors: vec![],
            tags: vec![],
        }
    }

    #[test]
    fn hash_is_stable_across_identical_payloads() {
        assert_eq!(payload_hash(&payload()), payload_hash(&payload()));
    }

    #[test]
    fn key_order_in_source_json_does_not_affect_hash() {
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        assert_eq!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn differing_title_changes_hash() {
        let mut other = payload();
        other.title = "Something else happened".to_string();
        assert_ne!(payload_hash(&payload()), payload_hash(&other));
    }
}
