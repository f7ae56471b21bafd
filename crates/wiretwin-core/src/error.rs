//! Error types for the fingerprint and diff engines.

/// Errors returned by an [`crate::EntryStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("entry {entry_id} not found in session {session_id}")]
    NotFound {
        session_id: String,
        entry_id: String,
    },
    #[error("capture store transport failed: {0}")]
    Transport(String),
}

/// Errors surfaced by fingerprint generation and diffing.
///
/// Only failures against the primary entry fetch are represented here.
/// TLS and HTTP/2 side fetches degrade the fingerprint instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FingerprintError {
    #[error("entry {entry_id} not found in session {session_id}")]
    NotFound {
        session_id: String,
        entry_id: String,
    },
    #[error("failed to fetch entry {entry_id}: {message}")]
    Fetch { entry_id: String, message: String },
    #[error("operation cancelled")]
    Cancelled,
}

impl FingerprintError {
    pub(crate) fn from_store(entry_id: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound {
                session_id,
                entry_id,
            } => FingerprintError::NotFound {
                session_id,
                entry_id,
            },
            StoreError::Transport(message) => FingerprintError::Fetch {
                entry_id: entry_id.to_string(),
                message,
            },
        }
    }
}
