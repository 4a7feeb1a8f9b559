//! BLAKE3 hashing for logical ids and rendered resources.

use serde::Serialize;

/// Length of the digest suffix appended to logical ids.
pub const LOGICAL_ID_DIGEST_LEN: usize = 8;

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Short uppercase hex digest of path components, used to make logical ids
/// unique within a template.
pub fn path_digest(components: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in components {
        hasher.update(c.as_bytes());
        hasher.update(b"/");
    }
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..LOGICAL_ID_DIGEST_LEN].to_ascii_uppercase()
}

/// Hash any serializable value through its canonical JSON form
/// (object keys sorted at every level).
pub fn hash_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = canonicalize(serde_json::to_value(value)?);
    Ok(hash_string(&serde_json::to_string(&canonical)?))
}

fn canonicalize(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(String, serde_json::Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(canonicalize).collect())
        }
        other => other,
    }
}
