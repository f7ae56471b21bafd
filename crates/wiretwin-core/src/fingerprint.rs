//! Fingerprint generation for captured entries.
//!
//! A fingerprint is the canonical projection of an entry that the diff engine
//! compares: summary fields, ordered and normalized request headers,
//! HTTP/2 pseudo-headers, body hashes and the TLS / HTTP/2 side summaries.

use crate::canonical::{
    self, body_fingerprint, normalize_headers, ordered_headers, pseudo_headers, BodyFingerprint,
    HeaderPair, NormalizedHeaders,
};
use crate::capture::{Http2Meta, SessionEntry, TlsMeta};
use crate::error::FingerprintError;
use crate::store::{EntryCache, EntryStore};
use crate::summary::{fetch_http2_summary, fetch_tls_summary, Http2Summary, TlsSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default cap on hashed body size (1 MiB).
pub const DEFAULT_MAX_BYTES: usize = 1024 * 1024;

/// Options controlling fingerprint composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintOptions {
    pub include_tls_summary: bool,
    pub include_http2_summary: bool,
    /// Bodies larger than this are sized but not hashed.
    pub max_bytes: usize,
}

impl Default for FingerprintOptions {
    fn default() -> Self {
        Self {
            include_tls_summary: true,
            include_http2_summary: true,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Compact projection of a captured entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub entry_id: String,
    pub ts_ms: i64,
    pub method: String,
    pub url: String,
    pub host: String,
    pub path: String,
    pub status: u16,
    pub http_version: String,
    pub process_name: String,
    pub pid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http2: Option<Http2Meta>,
    pub req_body_bytes: usize,
    pub resp_body_bytes: usize,
    #[serde(default)]
    pub resp_content_type: String,
}

impl EntrySummary {
    pub fn from_entry(entry: &SessionEntry) -> Self {
        let (host, path) = split_url(entry);
        Self {
            entry_id: entry.id.clone(),
            ts_ms: entry.timings.start_ms,
            method: entry.request.method.clone(),
            url: entry.url.clone(),
            host,
            path,
            status: entry.response.status,
            http_version: entry.http_version.clone(),
            process_name: entry.process.name.clone(),
            pid: entry.process.pid,
            tls: entry.tls.clone(),
            http2: entry.http2.clone(),
            req_body_bytes: canonical::body_size(entry.request.body.as_deref()),
            resp_body_bytes: canonical::body_size(entry.response.body.as_deref()),
            resp_content_type: entry
                .response
                .content_type()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Lowercased host and path of the entry URL. Relative URLs fall back to the
/// `host` / `:authority` request header.
fn split_url(entry: &SessionEntry) -> (String, String) {
    if let Ok(parsed) = url::Url::parse(&entry.url) {
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
        return (host, parsed.path().to_string());
    }

    let host = entry
        .request
        .headers
        .iter()
        .filter(|pair| pair.len() >= 2)
        .find(|pair| {
            pair[0].eq_ignore_ascii_case("host") || pair[0].eq_ignore_ascii_case(":authority")
        })
        .map(|pair| pair[1].to_ascii_lowercase())
        .unwrap_or_default();
    let path = entry
        .url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_string();
    (host, path)
}

/// Canonical projection of an entry used for comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub entry_summary: EntrySummary,
    pub headers_ordered: Vec<HeaderPair>,
    pub headers_normalized: NormalizedHeaders,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http2_pseudo_headers: Option<Vec<HeaderPair>>,
    pub body: BodyFingerprint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_summary: Option<TlsSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http2_summary: Option<Http2Summary>,
}

impl Fingerprint {
    /// Build the store-independent part of a fingerprint.
    pub fn from_entry(entry: &SessionEntry, opts: &FingerprintOptions) -> Self {
        let entry_summary = EntrySummary::from_entry(entry);
        let headers_ordered = ordered_headers(&entry.request.headers);
        let headers_normalized = normalize_headers(&headers_ordered);
        let http2_pseudo_headers = pseudo_headers(&headers_ordered, entry.http2.is_some());
        let body = body_fingerprint(
            entry.request.body.as_deref(),
            entry.response.body.as_deref(),
            opts.max_bytes,
        );

        Self {
            entry_summary,
            headers_ordered,
            headers_normalized,
            http2_pseudo_headers,
            body,
            tls_summary: None,
            http2_summary: None,
        }
    }
}

/// Composes cached entry fetches with TLS / HTTP/2 side fetches.
#[derive(Clone)]
pub struct FingerprintEngine {
    store: Arc<dyn EntryStore>,
    cache: Arc<dyn EntryCache>,
}

impl FingerprintEngine {
    pub fn new(store: Arc<dyn EntryStore>, cache: Arc<dyn EntryCache>) -> Self {
        Self { store, cache }
    }

    /// Generate a fingerprint; `None` options apply the defaults.
    pub async fn generate(
        &self,
        session_id: &str,
        entry_id: &str,
        opts: Option<&FingerprintOptions>,
    ) -> Result<Fingerprint, FingerprintError> {
        let defaults = FingerprintOptions::default();
        let opts = opts.unwrap_or(&defaults);

        let entry = self.fetch_entry(session_id, entry_id).await?;
        let mut fingerprint = Fingerprint::from_entry(&entry, opts);

        if opts.include_tls_summary {
            fingerprint.tls_summary = fetch_tls_summary(self.store.as_ref(), &entry).await;
        }
        if opts.include_http2_summary {
            fingerprint.http2_summary = fetch_http2_summary(self.store.as_ref(), &entry).await;
        }

        debug!(
            "Fingerprinted entry {} ({} headers, tls={}, http2={})",
            entry_id,
            fingerprint.headers_ordered.len(),
            fingerprint.tls_summary.is_some(),
            fingerprint.http2_summary.is_some()
        );
        Ok(fingerprint)
    }

    /// Like [`generate`](Self::generate), aborting in-flight I/O once `cancel`
    /// fires.
    pub async fn generate_with_cancel(
        &self,
        session_id: &str,
        entry_id: &str,
        opts: Option<&FingerprintOptions>,
        cancel: &CancellationToken,
    ) -> Result<Fingerprint, FingerprintError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FingerprintError::Cancelled),
            result = self.generate(session_id, entry_id, opts) => result,
        }
    }

    async fn fetch_entry(
        &self,
        session_id: &str,
        entry_id: &str,
    ) -> Result<SessionEntry, FingerprintError> {
        if let Some(entry) = self.cache.get(entry_id) {
            debug!("Entry cache hit for {}", entry_id);
            return Ok(entry);
        }

        debug!("Entry cache miss for {}, fetching from store", entry_id);
        let entry = self
            .store
            .get_entry(session_id, entry_id)
            .await
            .map_err(|e| FingerprintError::from_store(entry_id, e))?;
        self.cache.put(entry_id, entry.clone());
        Ok(entry)
    }
}
