//! In-memory entry store backed by a capture archive.

use crate::capture::{CaptureArchive, Http2StreamRecord, RawFrame, SessionEntry, TlsEvent};
use crate::error::StoreError;
use crate::store::EntryStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::Path;
use tracing::debug;

/// Session alias that resolves to the archive's active session.
pub const ACTIVE_SESSION: &str = "active";

/// Entry store serving a [`CaptureArchive`] from memory.
///
/// Useful for offline analysis of exported captures, tests and the CLI.
pub struct InMemoryEntryStore {
    archive: RwLock<CaptureArchive>,
}

impl InMemoryEntryStore {
    pub fn new(archive: CaptureArchive) -> Self {
        Self {
            archive: RwLock::new(archive),
        }
    }

    /// Load a capture archive file into a fresh store.
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        Ok(Self::new(CaptureArchive::load_from_file(path)?))
    }

    /// Append an entry to a session, creating the session on first use.
    pub fn insert_entry(&self, session_id: &str, entry: SessionEntry) {
        let mut archive = self.archive.write();
        if archive.active_session.is_none() {
            archive.active_session = Some(session_id.to_string());
        }
        archive
            .sessions
            .entry(session_id.to_string())
            .or_default()
            .push(entry);
    }

    /// Replace the TLS events recorded for a connection.
    pub fn insert_tls_connection(&self, connection_id: &str, events: Vec<TlsEvent>) {
        self.archive
            .write()
            .tls_connections
            .insert(connection_id.to_string(), events);
    }

    /// Append frames to an HTTP/2 stream.
    pub fn insert_http2_frames(&self, connection_id: &str, stream_id: u32, frames: Vec<RawFrame>) {
        let mut archive = self.archive.write();
        match archive
            .http2_streams
            .iter_mut()
            .find(|s| s.connection_id == connection_id && s.stream_id == stream_id)
        {
            Some(stream) => stream.frames.extend(frames),
            None => archive.http2_streams.push(Http2StreamRecord {
                connection_id: connection_id.to_string(),
                stream_id,
                frames,
            }),
        }
    }

    /// Snapshot of the current archive contents.
    pub fn snapshot(&self) -> CaptureArchive {
        self.archive.read().clone()
    }

    fn resolve_session(&self, archive: &CaptureArchive, session_id: &str) -> Option<String> {
        if session_id.is_empty() || session_id == ACTIVE_SESSION {
            archive.active_session.clone()
        } else {
            Some(session_id.to_string())
        }
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn get_entry(
        &self,
        session_id: &str,
        entry_id: &str,
    ) -> Result<SessionEntry, StoreError> {
        let archive = self.archive.read();
        let not_found = || StoreError::NotFound {
            session_id: session_id.to_string(),
            entry_id: entry_id.to_string(),
        };

        let resolved = self
            .resolve_session(&archive, session_id)
            .ok_or_else(not_found)?;
        debug!("Resolved session {:?} to {:?}", session_id, resolved);

        archive
            .sessions
            .get(&resolved)
            .and_then(|entries| entries.iter().find(|e| e.id == entry_id))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn get_tls_connection(&self, connection_id: &str) -> Result<Vec<TlsEvent>, StoreError> {
        self.archive
            .read()
            .tls_connections
            .get(connection_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::Transport(format!("no TLS events for connection {connection_id}"))
            })
    }

    async fn get_http2_stream(
        &self,
        connection_id: &str,
        stream_id: u32,
    ) -> Result<Vec<RawFrame>, StoreError> {
        self.archive
            .read()
            .http2_streams
            .iter()
            .find(|s| s.connection_id == connection_id && s.stream_id == stream_id)
            .map(|s| s.frames.clone())
            .ok_or_else(|| {
                StoreError::Transport(format!(
                    "no HTTP/2 frames for connection {connection_id} stream {stream_id}"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::TlsEventKind;
    use serde_json::json;

    fn entry(id: &str) -> SessionEntry {
        SessionEntry {
            id: id.into(),
            url: format!("https://example.com/{id}"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_entry_by_session() {
        let store = InMemoryEntryStore::new(CaptureArchive::default());
        store.insert_entry("s1", entry("e1"));
        store.insert_entry("s2", entry("e2"));

        assert_eq!(store.get_entry("s1", "e1").await.unwrap().id, "e1");
        assert!(matches!(
            store.get_entry("s1", "e2").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_active_alias_resolves_to_first_session() {
        let store = InMemoryEntryStore::new(CaptureArchive::default());
        store.insert_entry("s1", entry("e1"));

        assert_eq!(store.get_entry("active", "e1").await.unwrap().id, "e1");
        assert_eq!(store.get_entry("", "e1").await.unwrap().id, "e1");
    }

    #[tokio::test]
    async fn test_active_alias_without_sessions_is_not_found() {
        let store = InMemoryEntryStore::new(CaptureArchive::default());
        assert!(matches!(
            store.get_entry("active", "e1").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_side_channels() {
        let store = InMemoryEntryStore::new(CaptureArchive::default());
        store.insert_tls_connection(
            "c1",
            vec![TlsEvent {
                kind: TlsEventKind::ClientHello,
                version: Some("TLS 1.2".into()),
                cipher_suite: None,
                cipher_suites: vec![],
                alpn: vec![],
                sni: None,
            }],
        );
        store.insert_http2_frames("c1", 1, vec![json!({"type": "HEADERS"})]);
        store.insert_http2_frames("c1", 1, vec![json!({"type": "DATA"})]);

        assert_eq!(store.get_tls_connection("c1").await.unwrap().len(), 1);
        assert_eq!(store.get_http2_stream("c1", 1).await.unwrap().len(), 2);
        assert!(store.get_tls_connection("c2").await.is_err());
        assert!(store.get_http2_stream("c1", 3).await.is_err());
    }
}
