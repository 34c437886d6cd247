//! Content fingerprints for effective schemas.
//!
//! A fingerprint is the SHA-256 of the effective schema's canonical JSON
//! serialization, base64-encoded. Composition is recomputation-heavy but
//! rarely *changes* the effective schema, so fingerprints gate child
//! rebuilds and key the compiled-validator cache.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque content hash of an effective schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaFingerprint(String);

impl SchemaFingerprint {
    /// Fingerprint a canonical JSON serialization.
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        let hash = hasher.finalize();
        // First 16 bytes are plenty for collision resistance at tree scale
        SchemaFingerprint(BASE64.encode(&hash[..16]))
    }

    /// Fingerprint an effective schema via its canonical JSON form.
    pub fn of_schema(schema: &crate::schema::NormalizedSchema) -> Self {
        Self::from_content(schema.to_json().to_string().as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::normalize;
    use serde_json::json;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let schema = normalize(&json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "required": ["a"],
        }))
        .unwrap();
        assert_eq!(
            SchemaFingerprint::of_schema(&schema),
            SchemaFingerprint::of_schema(&schema.clone())
        );
    }

    #[test]
    fn test_fingerprint_distinguishes_schemas() {
        let a = normalize(&json!({"type": "string"})).unwrap();
        let b = normalize(&json!({"type": "number"})).unwrap();
        assert_ne!(
            SchemaFingerprint::of_schema(&a),
            SchemaFingerprint::of_schema(&b)
        );
    }
}
