//! Canonical request hashing and run identity.
//!
//! The hash covers a key-sorted compact JSON projection of the request with
//! volatile fields removed. Decimals serialize as strings, so the projection
//! carries no floats.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::shared::{CorrelationId, RunId};

/// Prefix of every request hash.
pub const HASH_PREFIX: &str = "sha256:";

/// Hex digits of the hash used in run ids.
const RUN_ID_HASH_LEN: usize = 12;

/// Key-sorted compact JSON of `value` without the top-level `exclude` keys.
///
/// Key order comes from `serde_json::Map`, which is a `BTreeMap` while the
/// `preserve_order` feature stays off.
///
/// # Errors
///
/// Returns the serialization error when `value` cannot be represented as JSON.
pub fn canonical_json<T: Serialize>(
    value: &T,
    exclude: &[&str],
) -> Result<String, serde_json::Error> {
    let mut projected = serde_json::to_value(value)?;
    if let Value::Object(map) = &mut projected {
        for key in exclude {
            map.remove(*key);
        }
    }
    serde_json::to_string(&projected)
}

/// `sha256:<hex>` over the canonical JSON of `value`.
///
/// # Errors
///
/// Returns the serialization error when `value` cannot be represented as JSON.
pub fn request_hash<T: Serialize>(
    value: &T,
    exclude: &[&str],
) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(value, exclude)?;
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(format!("{HASH_PREFIX}{}", hex::encode(digest)))
}

/// Run id derived from a request hash: `<prefix><first 12 hex digits>`.
#[must_use]
pub fn run_id(prefix: &str, hash: &str) -> RunId {
    let digits = hash.strip_prefix(HASH_PREFIX).unwrap_or(hash);
    let short = digits.get(..RUN_ID_HASH_LEN).unwrap_or(digits);
    RunId::new(format!("{prefix}{short}"))
}

/// Supplied correlation id, or `corr_` + UUIDv5 of the hash.
#[must_use]
pub fn correlation_id(supplied: Option<&str>, hash: &str) -> CorrelationId {
    match supplied {
        Some(id) if !id.trim().is_empty() => CorrelationId::new(id),
        _ => CorrelationId::new(format!(
            "corr_{}",
            Uuid::new_v5(&Uuid::NAMESPACE_OID, hash.as_bytes()).simple()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_sorted_and_volatile_fields_dropped() {
        let value = json!({
            "b": 1,
            "a": {"z": "x", "c": [{"k": 2, "j": 1}]},
            "requested_at": "2026-01-01T00:00:00Z"
        });
        let canonical = canonical_json(&value, &["requested_at"]).unwrap();
        assert_eq!(canonical, r#"{"a":{"c":[{"j":1,"k":2}],"z":"x"},"b":1}"#);
    }

    #[test]
    fn struct_fields_serialize_in_key_order() {
        #[derive(Serialize)]
        struct Request {
            zeta: u8,
            alpha: &'static str,
            idempotency_key: &'static str,
        }
        let request = Request {
            zeta: 1,
            alpha: "a",
            idempotency_key: "k",
        };
        let canonical = canonical_json(&request, &["idempotency_key"]).unwrap();
        assert_eq!(canonical, r#"{"alpha":"a","zeta":1}"#);
    }

    #[test]
    fn volatile_fields_do_not_change_hash() {
        let a = json!({"portfolio": "pf_1", "correlation_id": "c1"});
        let b = json!({"correlation_id": "c2", "portfolio": "pf_1"});
        let exclude = ["correlation_id"];
        assert_eq!(request_hash(&a, &exclude).unwrap(), request_hash(&b, &exclude).unwrap());
    }

    #[test]
    fn hash_has_prefix_and_sha256_length() {
        let hash = request_hash(&json!({"a": 1}), &[]).unwrap();
        assert!(hash.starts_with(HASH_PREFIX));
        assert_eq!(hash.len(), HASH_PREFIX.len() + 64);
    }

    #[test]
    fn run_id_uses_twelve_hex_digits() {
        let id = run_id("rr_", "sha256:0123456789abcdef0123");
        assert_eq!(id.as_str(), "rr_0123456789ab");
    }

    #[test]
    fn correlation_id_derivation() {
        assert_eq!(correlation_id(Some("corr-abc"), "sha256:00").as_str(), "corr-abc");
        let derived = correlation_id(None, "sha256:00");
        assert!(derived.as_str().starts_with("corr_"));
        assert_eq!(derived, correlation_id(Some("  "), "sha256:00"));
    }
}
