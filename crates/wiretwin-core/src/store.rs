//! Seams to the capture service and the entry cache.

use crate::capture::{RawFrame, SessionEntry, TlsEvent};
use crate::error::StoreError;
use async_trait::async_trait;

/// Backend-agnostic access to captured traffic.
///
/// Implementations may block on I/O; every method is a suspension point.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Fetch one entry of a session.
    async fn get_entry(&self, session_id: &str, entry_id: &str)
        -> Result<SessionEntry, StoreError>;

    /// Fetch the TLS handshake events recorded for a connection.
    async fn get_tls_connection(&self, connection_id: &str) -> Result<Vec<TlsEvent>, StoreError>;

    /// Fetch the raw frame records of one HTTP/2 stream.
    async fn get_http2_stream(
        &self,
        connection_id: &str,
        stream_id: u32,
    ) -> Result<Vec<RawFrame>, StoreError>;
}

/// Shared entry cache keyed by entry id.
///
/// Implementations must tolerate concurrent readers and writers. Eviction
/// policy is up to the implementation.
pub trait EntryCache: Send + Sync {
    fn get(&self, entry_id: &str) -> Option<SessionEntry>;

    fn put(&self, entry_id: &str, entry: SessionEntry);
}

/// Cache that never retains anything.
#[derive(Debug, Default)]
pub struct NoOpEntryCache;

impl EntryCache for NoOpEntryCache {
    fn get(&self, _entry_id: &str) -> Option<SessionEntry> {
        None
    }

    fn put(&self, _entry_id: &str, _entry: SessionEntry) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_cache_never_hits() {
        let cache = NoOpEntryCache;
        cache.put(
            "e1",
            SessionEntry {
                id: "e1".into(),
                ..Default::default()
            },
        );
        assert!(cache.get("e1").is_none());
    }
}
