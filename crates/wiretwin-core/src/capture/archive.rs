//! File-backed capture archive.

use super::{RawFrame, SessionEntry, TlsEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// A serialized snapshot of captured traffic.
///
/// This is the on-disk shape consumed by [`crate::InMemoryEntryStore`]:
/// sessions of entries plus the side channels (TLS handshakes, HTTP/2 frames)
/// keyed by connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureArchive {
    /// Session that the alias `"active"` resolves to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_session: Option<String>,
    #[serde(default)]
    pub sessions: BTreeMap<String, Vec<SessionEntry>>,
    /// TLS handshake events by connection id.
    #[serde(default)]
    pub tls_connections: BTreeMap<String, Vec<TlsEvent>>,
    #[serde(default)]
    pub http2_streams: Vec<Http2StreamRecord>,
}

/// Frames captured for one HTTP/2 stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Http2StreamRecord {
    pub connection_id: String,
    pub stream_id: u32,
    #[serde(default)]
    pub frames: Vec<RawFrame>,
}

impl CaptureArchive {
    /// Load an archive from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let json = fs::read_to_string(path)?;
        let archive: CaptureArchive = serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        info!(
            "Loaded {} sessions ({} entries) from {:?}",
            archive.sessions.len(),
            archive.entry_count(),
            path
        );
        Ok(archive)
    }

    /// Save the archive to a JSON file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        fs::write(path, json)?;
        info!("Saved {} sessions to {:?}", self.sessions.len(), path);
        Ok(())
    }

    /// Total number of entries across all sessions.
    pub fn entry_count(&self) -> usize {
        self.sessions.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_archive() -> CaptureArchive {
        let mut archive = CaptureArchive {
            active_session: Some("s1".into()),
            ..Default::default()
        };
        archive.sessions.insert(
            "s1".into(),
            vec![SessionEntry {
                id: "e1".into(),
                url: "https://example.com/".into(),
                ..Default::default()
            }],
        );
        archive.http2_streams.push(Http2StreamRecord {
            connection_id: "c1".into(),
            stream_id: 1,
            frames: vec![json!({"type": "HEADERS"})],
        });
        archive
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");

        let archive = sample_archive();
        archive.save_to_file(&path).unwrap();

        let loaded = CaptureArchive::load_from_file(&path).unwrap();
        assert_eq!(loaded, archive);
        assert_eq!(loaded.entry_count(), 1);
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();

        let err = CaptureArchive::load_from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
