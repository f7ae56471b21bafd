//! TLS handshake and HTTP/2 frame summaries.
//!
//! Side-channel fetches never fail the caller: a transport error degrades the
//! summary to whatever the entry itself carries.

use crate::capture::{FrameHeader, RawFrame, SessionEntry, TlsEvent, TlsEventKind};
use crate::store::EntryStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Distilled view of a TLS connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsSummary {
    pub connection_id: String,
    #[serde(default)]
    pub tls_version: String,
    #[serde(default)]
    pub cipher_suite: String,
    #[serde(default)]
    pub ja3: String,
    #[serde(default)]
    pub ja4: String,
    #[serde(default)]
    pub alpn: String,
}

/// Frame counts for one HTTP/2 stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Http2Summary {
    pub connection_id: String,
    pub stream_id: u32,
    pub frame_counts: BTreeMap<String, u64>,
    pub total_frames: u64,
}

/// Summarize a connection's handshake events on top of what the entry
/// already knows (JA3/JA4).
///
/// Version and cipher come from the first ServerHello; without one, the
/// ClientHello version is used and the cipher stays empty. ALPN prefers the
/// protocol the server selected over the client's offer.
pub fn summarize_tls_events(entry: &SessionEntry, events: &[TlsEvent]) -> TlsSummary {
    let mut summary = tls_from_entry(entry);

    let server_hello = events.iter().find(|e| e.kind == TlsEventKind::ServerHello);
    let client_hello = events.iter().find(|e| e.kind == TlsEventKind::ClientHello);

    match (server_hello, client_hello) {
        (Some(server), _) => {
            summary.tls_version = server.version.clone().unwrap_or_default();
            summary.cipher_suite = server.cipher_suite.clone().unwrap_or_default();
        }
        (None, Some(client)) => {
            summary.tls_version = client.version.clone().unwrap_or_default();
        }
        (None, None) => {}
    }

    summary.alpn = server_hello
        .and_then(|e| e.alpn.first().cloned())
        .or_else(|| client_hello.map(|e| e.alpn.join(",")))
        .unwrap_or_default();

    summary
}

fn tls_from_entry(entry: &SessionEntry) -> TlsSummary {
    let tls = entry.tls.as_ref();
    TlsSummary {
        connection_id: tls.map(|t| t.connection_id.clone()).unwrap_or_default(),
        ja3: tls.and_then(|t| t.ja3.clone()).unwrap_or_default(),
        ja4: tls.and_then(|t| t.ja4.clone()).unwrap_or_default(),
        ..Default::default()
    }
}

/// Fetch handshake events for the entry's connection and summarize them.
///
/// Returns `None` only when the entry has no TLS metadata at all.
pub async fn fetch_tls_summary(store: &dyn EntryStore, entry: &SessionEntry) -> Option<TlsSummary> {
    let connection_id = &entry.tls.as_ref()?.connection_id;

    match store.get_tls_connection(connection_id).await {
        Ok(events) => {
            debug!(
                "Summarizing {} TLS events for connection {}",
                events.len(),
                connection_id
            );
            Some(summarize_tls_events(entry, &events))
        }
        Err(e) => {
            warn!(
                "TLS events unavailable for connection {}: {}",
                connection_id, e
            );
            Some(tls_from_entry(entry))
        }
    }
}

/// Tally frames by type. Records without a recognizable type are skipped.
pub fn summarize_http2_frames(
    connection_id: &str,
    stream_id: u32,
    frames: &[RawFrame],
) -> Http2Summary {
    let mut frame_counts = BTreeMap::new();
    let mut total_frames = 0;

    for frame in frames.iter().filter_map(FrameHeader::from_raw) {
        *frame_counts
            .entry(frame.frame_type.to_ascii_uppercase())
            .or_insert(0) += 1;
        total_frames += 1;
    }

    Http2Summary {
        connection_id: connection_id.to_string(),
        stream_id,
        frame_counts,
        total_frames,
    }
}

/// Fetch the entry's HTTP/2 stream and tally its frames.
///
/// Returns `None` when the entry is not HTTP/2 or the stream is unavailable.
pub async fn fetch_http2_summary(
    store: &dyn EntryStore,
    entry: &SessionEntry,
) -> Option<Http2Summary> {
    let meta = entry.http2.as_ref()?;

    match store
        .get_http2_stream(&meta.connection_id, meta.stream_id)
        .await
    {
        Ok(frames) => Some(summarize_http2_frames(
            &meta.connection_id,
            meta.stream_id,
            &frames,
        )),
        Err(e) => {
            warn!(
                "HTTP/2 frames unavailable for connection {} stream {}: {}",
                meta.connection_id, meta.stream_id, e
            );
            None
        }
    }
}
