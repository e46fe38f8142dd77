//! Canonical JSON hashing for chain integrity
//!
//! The integrity hash of an entry is SHA-256 over a canonical JSON
//! serialization of every field except the hash and signature themselves.
//! Canonical means recursively key-sorted, so semantically identical
//! entries always hash the same regardless of field ordering.

use crate::audit::entry::AuditEntry;
use crate::domain::{Result, ScrubError};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Normalize a JSON value to ensure consistent key ordering
fn normalize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<String, Value> =
                std::collections::BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k.clone(), normalize_json(v));
            }
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.iter().map(normalize_json).collect()),
        _ => value.clone(),
    }
}

/// Hex-encoded SHA-256 of the canonical serialization of a JSON value
pub fn canonical_hash(data: &Value) -> Result<String> {
    let normalized = normalize_json(data);
    let data_str = serde_json::to_string(&normalized)
        .map_err(|e| ScrubError::Serialization(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(data_str.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Computes the integrity hash for an entry's content fields
///
/// Covers everything except `integrity_hash` and `signature`, including
/// `previous_hash` so linkage is part of the hashed content.
pub fn entry_integrity_hash(entry: &AuditEntry) -> Result<String> {
    let content = json!({
        "sequence_number": entry.sequence_number,
        "timestamp": entry.timestamp.to_rfc3339(),
        "event_type": entry.event_type,
        "action": entry.action,
        "result": entry.result,
        "payload": entry.payload,
        "previous_hash": entry.previous_hash,
    });
    canonical_hash(&content)
}
