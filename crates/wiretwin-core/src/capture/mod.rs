//! Captured session model as delivered by the capture service.
//!
//! These types mirror the wire shape of the capture service and are consumed
//! read-only by the fingerprint engine.
//!
//! # Module Structure
//!
//! - `archive` - File-backed collection of sessions, TLS events and HTTP/2 frames

mod archive;

pub use archive::{CaptureArchive, Http2StreamRecord};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One captured HTTP transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub http_version: String,
    #[serde(default)]
    pub request: CapturedRequest,
    #[serde(default)]
    pub response: CapturedResponse,
    #[serde(default)]
    pub timings: Timings,
    #[serde(default)]
    pub process: ProcessInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http2: Option<Http2Meta>,
}

/// Captured request half of an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturedRequest {
    #[serde(default)]
    pub method: String,
    /// Header pairs in capture order. Each pair is `[name, value]`; shorter
    /// records are tolerated on input and skipped by the canonicalizer.
    #[serde(default)]
    pub headers: Vec<Vec<String>>,
    /// Base64 encoded body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Captured response half of an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturedResponse {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl CapturedResponse {
    /// First `content-type` header value, compared case-insensitively.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .filter(|pair| pair.len() >= 2)
            .find(|pair| pair[0].eq_ignore_ascii_case("content-type"))
            .map(|pair| pair[1].as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    /// Wall-clock start of the request, milliseconds since the unix epoch.
    #[serde(default)]
    pub start_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pid: u32,
}

/// TLS connection metadata attached to an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsMeta {
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ja3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ja4: Option<String>,
}

/// HTTP/2 stream metadata attached to an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Http2Meta {
    pub connection_id: String,
    pub stream_id: u32,
}

/// Handshake message kinds reported by the capture service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsEventKind {
    ClientHello,
    ServerHello,
    Certificate,
    Finished,
    Alert,
    #[serde(other)]
    Other,
}

/// A single typed TLS handshake event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlsEvent {
    #[serde(rename = "type")]
    pub kind: TlsEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Negotiated cipher (ServerHello).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher_suite: Option<String>,
    /// Offered ciphers (ClientHello).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cipher_suites: Vec<String>,
    /// Offered protocols on ClientHello, the selected one on ServerHello.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
}

/// Raw HTTP/2 frame record as stored by the capture service.
///
/// Records are kept untyped so a single malformed frame does not poison a
/// whole stream; see [`FrameHeader::from_raw`].
pub type RawFrame = Value;

/// The typed view of a raw frame the summarizer needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrameHeader {
    #[serde(rename = "type", alias = "frame_type")]
    pub frame_type: String,
    #[serde(default)]
    pub stream_id: u32,
    #[serde(default)]
    pub flags: u8,
    #[serde(default)]
    pub length: u32,
}

impl FrameHeader {
    /// Parse a raw record, returning `None` for records without a usable type.
    pub fn from_raw(raw: &RawFrame) -> Option<Self> {
        let header: FrameHeader = serde_json::from_value(raw.clone()).ok()?;
        if header.frame_type.trim().is_empty() {
            return None;
        }
        Some(header)
    }
}
