//! Canonical projections of captured headers and bodies.
//!
//! Header names are compared case-insensitively everywhere downstream, so
//! normalization lowercases them here once. Values are left untouched.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A `(name, value)` header pair; serializes as a two-element array.
pub type HeaderPair = (String, String);

/// Lowercased header name to values in encounter order.
pub type NormalizedHeaders = BTreeMap<String, Vec<String>>;

/// Body sizes and hashes for one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyFingerprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req_hash: Option<String>,
    pub req_bytes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resp_hash: Option<String>,
    pub resp_bytes: usize,
}

/// Returns true when the header name is an HTTP/2 pseudo-header.
pub fn is_pseudo_header(name: &str) -> bool {
    name.starts_with(':')
}

/// Copy captured pairs in order, skipping records with fewer than two fields.
pub fn ordered_headers(raw: &[Vec<String>]) -> Vec<HeaderPair> {
    raw.iter()
        .filter(|pair| pair.len() >= 2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}

/// Group values by ASCII-lowercased name, preserving duplicates and order.
pub fn normalize_headers(pairs: &[HeaderPair]) -> NormalizedHeaders {
    let mut normalized = NormalizedHeaders::new();
    for (name, value) in pairs {
        normalized
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.clone());
    }
    normalized
}

/// Extract pseudo-headers in order. Only entries carrying HTTP/2 metadata
/// have pseudo-headers; everything else yields `None`.
pub fn pseudo_headers(pairs: &[HeaderPair], is_http2: bool) -> Option<Vec<HeaderPair>> {
    if !is_http2 {
        return None;
    }
    Some(
        pairs
            .iter()
            .filter(|(name, _)| is_pseudo_header(name))
            .cloned()
            .collect(),
    )
}

/// A base64 body after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    /// Decoded bytes, or `None` when the text was not valid base64.
    pub bytes: Option<Vec<u8>>,
    pub size: usize,
}

/// Decode a base64 body. Undecodable text is sized by the base64 length
/// estimate `floor(len * 3 / 4) - padding`.
pub fn decode_body(b64: &str) -> DecodedBody {
    match BASE64.decode(b64.trim()) {
        Ok(bytes) => DecodedBody {
            size: bytes.len(),
            bytes: Some(bytes),
        },
        Err(_) => DecodedBody {
            bytes: None,
            size: estimate_decoded_len(b64),
        },
    }
}

fn estimate_decoded_len(b64: &str) -> usize {
    let trimmed = b64.trim();
    let padding = trimmed.bytes().rev().take_while(|b| *b == b'=').count();
    (trimmed.len() * 3 / 4).saturating_sub(padding)
}

/// Size of an optional base64 body in bytes.
pub fn body_size(b64: Option<&str>) -> usize {
    b64.map(|b| decode_body(b).size).unwrap_or(0)
}

/// Hex SHA-256 of the decoded body. Absent and empty bodies hash to the
/// empty string so "no body" stays distinguishable from any real digest.
pub fn body_hash(b64: Option<&str>) -> String {
    let Some(text) = b64 else {
        return String::new();
    };
    let decoded = decode_body(text);
    if decoded.size == 0 {
        return String::new();
    }
    match decoded.bytes {
        Some(bytes) => sha256_hex(&bytes),
        // Not base64: fall back to the captured text itself
        None => sha256_hex(text.as_bytes()),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Size both bodies and hash those within `max_bytes`.
pub fn body_fingerprint(
    req_body: Option<&str>,
    resp_body: Option<&str>,
    max_bytes: usize,
) -> BodyFingerprint {
    let (req_hash, req_bytes) = hash_within(req_body, max_bytes);
    let (resp_hash, resp_bytes) = hash_within(resp_body, max_bytes);
    BodyFingerprint {
        req_hash,
        req_bytes,
        resp_hash,
        resp_bytes,
    }
}

fn hash_within(b64: Option<&str>, max_bytes: usize) -> (Option<String>, usize) {
    let size = body_size(b64);
    if size == 0 || size > max_bytes {
        return (None, size);
    }
    (Some(body_hash(b64)), size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(pairs: &[&[&str]]) -> Vec<Vec<String>> {
        pairs
            .iter()
            .map(|p| p.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_ordered_headers_skips_short_pairs() {
        let headers = ordered_headers(&raw(&[
            &["Host", "example.com"],
            &["broken"],
            &[],
            &["Accept", "*/*", "extra"],
        ]));
        assert_eq!(
            headers,
            vec![
                ("Host".to_string(), "example.com".to_string()),
                ("Accept".to_string(), "*/*".to_string()),
            ]
        );
    }

    #[test]
    fn test_normalize_lowercases_and_keeps_duplicates() {
        let pairs = ordered_headers(&raw(&[
            &["Accept", "a"],
            &["X-Test", "1"],
            &["ACCEPT", "b"],
        ]));
        let normalized = normalize_headers(&pairs);
        assert_eq!(normalized["accept"], vec!["a", "b"]);
        assert_eq!(normalized["x-test"], vec!["1"]);
        assert!(!normalized.contains_key("Accept"));
    }

    #[test]
    fn test_pseudo_headers_only_for_http2() {
        let pairs = ordered_headers(&raw(&[
            &[":method", "GET"],
            &["accept", "*/*"],
            &[":path", "/"],
        ]));
        assert!(pseudo_headers(&pairs, false).is_none());
        let pseudo = pseudo_headers(&pairs, true).unwrap();
        assert_eq!(pseudo.len(), 2);
        assert_eq!(pseudo[0].0, ":method");
        assert_eq!(pseudo[1].0, ":path");
    }

    #[test]
    fn test_body_size_decodes_base64() {
        assert_eq!(body_size(Some("aGVsbG8=")), 5);
        assert_eq!(body_size(None), 0);
        assert_eq!(body_size(Some("")), 0);
    }

    #[test]
    fn test_body_size_estimates_invalid_base64() {
        // 12 chars, 1 padding char: 12 * 3 / 4 - 1
        assert_eq!(body_size(Some("!!!!!!!!!!!=")), 8);
    }

    #[test]
    fn test_body_hash_distinguishes_absent_from_present() {
        assert_eq!(body_hash(None), "");
        assert_eq!(body_hash(Some("")), "");
        assert_eq!(
            body_hash(Some("aGVsbG8=")),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_body_fingerprint_respects_max_bytes() {
        let fp = body_fingerprint(Some("aGVsbG8="), Some("aGVsbG8gd29ybGQ="), 5);
        assert_eq!(fp.req_bytes, 5);
        assert!(fp.req_hash.is_some());
        assert_eq!(fp.resp_bytes, 11);
        assert!(fp.resp_hash.is_none());
    }

    #[test]
    fn test_body_fingerprint_empty_body_has_no_hash() {
        let fp = body_fingerprint(Some(""), None, 1024);
        assert_eq!(fp, BodyFingerprint::default());
    }

    proptest! {
        #[test]
        fn prop_ordered_len_matches_complete_pairs(
            headers in proptest::collection::vec(
                proptest::collection::vec("[a-zA-Z:-]{0,8}", 0..4),
                0..16,
            )
        ) {
            let ordered = ordered_headers(&headers);
            let complete = headers.iter().filter(|p| p.len() >= 2).count();
            prop_assert_eq!(ordered.len(), complete);
        }

        #[test]
        fn prop_normalized_keys_are_lowercased_names(
            headers in proptest::collection::vec(("[a-zA-Z-]{1,8}", "[ -~]{0,8}"), 0..16)
        ) {
            let pairs: Vec<HeaderPair> = headers;
            let normalized = normalize_headers(&pairs);
            for key in normalized.keys() {
                prop_assert!(pairs.iter().any(|(n, _)| &n.to_ascii_lowercase() == key));
            }
            let total: usize = normalized.values().map(Vec::len).sum();
            prop_assert_eq!(total, pairs.len());
        }
    }
}
