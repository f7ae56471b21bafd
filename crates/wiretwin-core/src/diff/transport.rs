//! Protocol, TLS and HTTP/2 comparisons.

use crate::canonical::HeaderPair;
use crate::fingerprint::Fingerprint;
use crate::summary::TlsSummary;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolDiff {
    pub baseline_version: String,
    pub candidate_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsDiff {
    pub ja3_different: bool,
    pub ja4_different: bool,
    pub cipher_different: bool,
    pub version_different: bool,
    pub baseline_ja3: String,
    pub candidate_ja3: String,
    pub baseline_ja4: String,
    pub candidate_ja4: String,
    pub baseline_cipher: String,
    pub candidate_cipher: String,
    pub baseline_version: String,
    pub candidate_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Http2Diff {
    pub pseudo_headers_different: bool,
    pub baseline_pseudo_headers: Vec<HeaderPair>,
    pub candidate_pseudo_headers: Vec<HeaderPair>,
    pub stream_id_different: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_stream_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_stream_id: Option<u32>,
}

pub fn diff_protocol(baseline: &Fingerprint, candidate: &Fingerprint) -> Option<ProtocolDiff> {
    let a = &baseline.entry_summary.http_version;
    let b = &candidate.entry_summary.http_version;
    (a != b).then(|| ProtocolDiff {
        baseline_version: a.clone(),
        candidate_version: b.clone(),
    })
}

/// Two empty strings are equal; empty against non-empty is a difference.
fn differs(a: &str, b: &str) -> bool {
    a != b && (!a.is_empty() || !b.is_empty())
}

pub fn diff_tls(baseline: Option<&TlsSummary>, candidate: Option<&TlsSummary>) -> Option<TlsDiff> {
    if baseline.is_none() && candidate.is_none() {
        return None;
    }
    let empty = TlsSummary::default();
    let a = baseline.unwrap_or(&empty);
    let b = candidate.unwrap_or(&empty);

    let diff = TlsDiff {
        ja3_different: differs(&a.ja3, &b.ja3),
        ja4_different: differs(&a.ja4, &b.ja4),
        cipher_different: differs(&a.cipher_suite, &b.cipher_suite),
        version_different: differs(&a.tls_version, &b.tls_version),
        baseline_ja3: a.ja3.clone(),
        candidate_ja3: b.ja3.clone(),
        baseline_ja4: a.ja4.clone(),
        candidate_ja4: b.ja4.clone(),
        baseline_cipher: a.cipher_suite.clone(),
        candidate_cipher: b.cipher_suite.clone(),
        baseline_version: a.tls_version.clone(),
        candidate_version: b.tls_version.clone(),
    };

    let any = diff.ja3_different
        || diff.ja4_different
        || diff.cipher_different
        || diff.version_different;
    any.then_some(diff)
}

fn stream_id(fp: &Fingerprint) -> Option<u32> {
    fp.entry_summary
        .http2
        .as_ref()
        .map(|m| m.stream_id)
        .or_else(|| fp.http2_summary.as_ref().map(|s| s.stream_id))
}

fn has_http2(fp: &Fingerprint) -> bool {
    fp.entry_summary.http2.is_some() || fp.http2_summary.is_some()
}

/// Compare pseudo-header sequences (order matters) and stream ids.
pub fn diff_http2(baseline: &Fingerprint, candidate: &Fingerprint) -> Option<Http2Diff> {
    if !has_http2(baseline) && !has_http2(candidate) {
        return None;
    }

    let a = baseline.http2_pseudo_headers.clone().unwrap_or_default();
    let b = candidate.http2_pseudo_headers.clone().unwrap_or_default();
    let baseline_stream_id = stream_id(baseline);
    let candidate_stream_id = stream_id(candidate);

    let diff = Http2Diff {
        pseudo_headers_different: a != b,
        stream_id_different: baseline_stream_id != candidate_stream_id,
        baseline_pseudo_headers: a,
        candidate_pseudo_headers: b,
        baseline_stream_id,
        candidate_stream_id,
    };

    (diff.pseudo_headers_different || diff.stream_id_different).then_some(diff)
}
