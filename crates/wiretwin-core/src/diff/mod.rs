//! Fingerprint comparison.
//!
//! Produces *important* differences (the ones that plausibly move anti-bot
//! scoring: protocol, TLS fingerprints, HTTP/2 framing, header identity and
//! order) separately from *noisy* ones (volatile headers, query keys).
//!
//! # Module Structure
//!
//! - `headers` - Header presence/value comparison with ignore lists
//! - `order` - LCS-based header order comparison
//! - `query` - Query-string key comparison
//! - `transport` - Protocol version, TLS and HTTP/2 comparisons

mod headers;
mod order;
mod query;
mod transport;

pub use headers::{diff_headers, ignore_set, HeaderDiff, HeaderValueChange};
pub use order::{diff_header_order, header_names, lcs, HeaderMove, HeaderOrderDiff};
pub use query::{diff_query_keys, query_params, QueryKeyDiff};
pub use transport::{diff_http2, diff_protocol, diff_tls, Http2Diff, ProtocolDiff, TlsDiff};

use crate::error::FingerprintError;
use crate::fingerprint::{Fingerprint, FingerprintEngine, FingerprintOptions};
use crate::memory::ACTIVE_SESSION;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Headers that change per request without saying anything about the client.
pub const DEFAULT_IGNORE_HEADERS: &[&str] = &[
    "date",
    "x-request-id",
    "x-correlation-id",
    "server",
    "via",
    "age",
    "expires",
    "traceparent",
    "tracestate",
    "x-amzn-trace-id",
    "x-cloud-trace-context",
    "x-b3-traceid",
    "x-b3-spanid",
    "x-b3-parentspanid",
    "x-b3-sampled",
    "cf-ray",
];

/// Query keys commonly used as cache busters or timestamps.
pub const DEFAULT_IGNORE_QUERY_KEYS: &[&str] = &[
    "_",
    "t",
    "ts",
    "timestamp",
    "cb",
    "cachebuster",
    "nonce",
    "rnd",
];

pub fn default_ignore_headers() -> Vec<String> {
    DEFAULT_IGNORE_HEADERS.iter().map(|s| s.to_string()).collect()
}

pub fn default_ignore_query_keys() -> Vec<String> {
    DEFAULT_IGNORE_QUERY_KEYS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// A request to compare two captured entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRequest {
    /// Session both entries belong to; empty means `"active"`.
    #[serde(default)]
    pub session_id: String,
    pub baseline_id: String,
    pub candidate_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_http2: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_headers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_header_order: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_headers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_query_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<usize>,
}

impl DiffRequest {
    pub fn new(baseline_id: impl Into<String>, candidate_id: impl Into<String>) -> Self {
        Self {
            baseline_id: baseline_id.into(),
            candidate_id: candidate_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportantDiffs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ProtocolDiff>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsDiff>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http2: Option<Http2Diff>,
    pub headers_missing: Vec<String>,
    pub headers_extra: Vec<String>,
    pub headers_value_changed: Vec<HeaderValueChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_order_changes: Option<HeaderOrderDiff>,
}

impl ImportantDiffs {
    pub fn is_empty(&self) -> bool {
        self.protocol.is_none()
            && self.tls.is_none()
            && self.http2.is_none()
            && self.headers_missing.is_empty()
            && self.headers_extra.is_empty()
            && self.headers_value_changed.is_empty()
            && self.header_order_changes.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoisyDiffs {
    pub ignored_headers: Vec<String>,
    pub query_key_diffs: Vec<QueryKeyDiff>,
}

impl NoisyDiffs {
    pub fn is_empty(&self) -> bool {
        self.ignored_headers.is_empty() && self.query_key_diffs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub baseline: Fingerprint,
    pub candidate: Fingerprint,
    pub important_diffs: ImportantDiffs,
    pub noisy_diffs: NoisyDiffs,
}

/// Resolved comparison switches for one diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareOptions {
    pub compare_tls: bool,
    pub compare_http2: bool,
    pub compare_headers: bool,
    pub compare_header_order: bool,
    pub ignore_headers: Vec<String>,
    pub ignore_query_keys: Vec<String>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            compare_tls: true,
            compare_http2: true,
            compare_headers: true,
            compare_header_order: true,
            ignore_headers: default_ignore_headers(),
            ignore_query_keys: default_ignore_query_keys(),
        }
    }
}

/// Compare two fingerprints.
pub fn diff_fingerprints(
    baseline: Fingerprint,
    candidate: Fingerprint,
    opts: &CompareOptions,
) -> DiffResult {
    let mut important = ImportantDiffs {
        protocol: diff_protocol(&baseline, &candidate),
        ..Default::default()
    };
    let mut noisy = NoisyDiffs::default();

    if opts.compare_tls {
        important.tls = diff_tls(baseline.tls_summary.as_ref(), candidate.tls_summary.as_ref());
    }
    if opts.compare_http2 {
        important.http2 = diff_http2(&baseline, &candidate);
    }
    if opts.compare_headers {
        let headers = diff_headers(
            &baseline.headers_normalized,
            &candidate.headers_normalized,
            &opts.ignore_headers,
        );
        important.headers_missing = headers.missing;
        important.headers_extra = headers.extra;
        important.headers_value_changed = headers.value_changed;
        noisy.ignored_headers = headers.ignored;
    }
    if opts.compare_header_order {
        let order = diff_header_order(&baseline.headers_ordered, &candidate.headers_ordered);
        if !order.is_unchanged() {
            important.header_order_changes = Some(order);
        }
    }
    noisy.query_key_diffs = diff_query_keys(
        &baseline.entry_summary.url,
        &candidate.entry_summary.url,
        &opts.ignore_query_keys,
    );

    DiffResult {
        baseline,
        candidate,
        important_diffs: important,
        noisy_diffs: noisy,
    }
}

/// Diff engine over a [`FingerprintEngine`], with configurable defaults.
#[derive(Clone)]
pub struct DiffEngine {
    fingerprints: FingerprintEngine,
    defaults: CompareOptions,
    fingerprint_defaults: FingerprintOptions,
}

impl DiffEngine {
    pub fn new(fingerprints: FingerprintEngine) -> Self {
        Self {
            fingerprints,
            defaults: CompareOptions::default(),
            fingerprint_defaults: FingerprintOptions::default(),
        }
    }

    /// Override the ignore lists applied when a request leaves them unset.
    pub fn with_ignore_lists(
        mut self,
        ignore_headers: Vec<String>,
        ignore_query_keys: Vec<String>,
    ) -> Self {
        self.defaults.ignore_headers = ignore_headers;
        self.defaults.ignore_query_keys = ignore_query_keys;
        self
    }

    pub fn with_fingerprint_options(mut self, opts: FingerprintOptions) -> Self {
        self.fingerprint_defaults = opts;
        self
    }

    fn resolve(&self, req: &DiffRequest) -> (CompareOptions, FingerprintOptions) {
        let compare = CompareOptions {
            compare_tls: req.compare_tls.unwrap_or(self.defaults.compare_tls),
            compare_http2: req.compare_http2.unwrap_or(self.defaults.compare_http2),
            compare_headers: req.compare_headers.unwrap_or(self.defaults.compare_headers),
            compare_header_order: req
                .compare_header_order
                .unwrap_or(self.defaults.compare_header_order),
            ignore_headers: req
                .ignore_headers
                .clone()
                .unwrap_or_else(|| self.defaults.ignore_headers.clone()),
            ignore_query_keys: req
                .ignore_query_keys
                .clone()
                .unwrap_or_else(|| self.defaults.ignore_query_keys.clone()),
        };
        let fingerprint = FingerprintOptions {
            include_tls_summary: self.fingerprint_defaults.include_tls_summary
                && compare.compare_tls,
            include_http2_summary: self.fingerprint_defaults.include_http2_summary
                && compare.compare_http2,
            max_bytes: req.max_bytes.unwrap_or(self.fingerprint_defaults.max_bytes),
        };
        (compare, fingerprint)
    }

    /// Fingerprint both entries concurrently and compare them.
    pub async fn diff(&self, req: &DiffRequest) -> Result<DiffResult, FingerprintError> {
        let session_id = if req.session_id.is_empty() {
            ACTIVE_SESSION
        } else {
            req.session_id.as_str()
        };
        let (compare, fp_opts) = self.resolve(req);

        debug!(
            "Diffing {} against {} in session {}",
            req.baseline_id, req.candidate_id, session_id
        );
        let (baseline, candidate) = tokio::try_join!(
            self.fingerprints
                .generate(session_id, &req.baseline_id, Some(&fp_opts)),
            self.fingerprints
                .generate(session_id, &req.candidate_id, Some(&fp_opts)),
        )?;

        Ok(diff_fingerprints(baseline, candidate, &compare))
    }

    /// Like [`diff`](Self::diff), aborting both fetches once `cancel` fires.
    pub async fn diff_with_cancel(
        &self,
        req: &DiffRequest,
        cancel: &CancellationToken,
    ) -> Result<DiffResult, FingerprintError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FingerprintError::Cancelled),
            result = self.diff(req) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CapturedRequest, SessionEntry};

    fn fingerprint(headers: &[(&str, &str)]) -> Fingerprint {
        let entry = SessionEntry {
            id: "e".into(),
            url: "https://example.com/?_=1".into(),
            http_version: "HTTP/1.1".into(),
            request: CapturedRequest {
                method: "GET".into(),
                headers: headers
                    .iter()
                    .map(|(n, v)| vec![n.to_string(), v.to_string()])
                    .collect(),
                body: None,
            },
            ..Default::default()
        };
        Fingerprint::from_entry(&entry, &FingerprintOptions::default())
    }

    #[test]
    fn test_self_diff_is_empty() {
        let fp = fingerprint(&[("user-agent", "x"), ("date", "now"), ("accept", "*/*")]);
        let result = diff_fingerprints(fp.clone(), fp, &CompareOptions::default());
        assert!(result.important_diffs.is_empty());
        assert!(result.noisy_diffs.is_empty());
    }

    #[test]
    fn test_disabled_comparisons_are_skipped() {
        let a = fingerprint(&[("accept", "a"), ("user-agent", "x")]);
        let b = fingerprint(&[("user-agent", "y"), ("accept", "a")]);
        let opts = CompareOptions {
            compare_headers: false,
            compare_header_order: false,
            ..Default::default()
        };
        let result = diff_fingerprints(a, b, &opts);
        assert!(result.important_diffs.is_empty());
    }

    #[test]
    fn test_order_change_is_important() {
        let a = fingerprint(&[("content-type", "json"), ("accept", "*/*")]);
        let b = fingerprint(&[("accept", "*/*"), ("content-type", "json")]);
        let result = diff_fingerprints(a, b, &CompareOptions::default());
        let order = result.important_diffs.header_order_changes.unwrap();
        assert_eq!(order.moves.len(), 1);
        assert_ne!(order.baseline_order, order.candidate_order);
        assert!(result.important_diffs.headers_value_changed.is_empty());
    }

    #[test]
    fn test_request_defaults_deserialize() {
        let req: DiffRequest =
            serde_json::from_str(r#"{"baseline_id": "a", "candidate_id": "b"}"#).unwrap();
        assert_eq!(req.session_id, "");
        assert!(req.compare_tls.is_none());
        assert!(req.ignore_headers.is_none());
    }
}
