//! Fingerprint and diff engine for captured HTTP sessions.
//!
//! Given two captured entries, answers "what changed between them, and which
//! of those changes plausibly affect bot detection?": TLS fingerprints,
//! HTTP/2 framing, header identity and header order.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wiretwin_core::{
//!     DiffEngine, DiffRequest, FingerprintEngine, InMemoryEntryCache, InMemoryEntryStore,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryEntryStore::load_from_file("capture.json".as_ref())?;
//! let engine = FingerprintEngine::new(Arc::new(store), Arc::new(InMemoryEntryCache::default()));
//! let result = DiffEngine::new(engine)
//!     .diff(&DiffRequest::new("entry-1", "entry-2"))
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&result.important_diffs)?);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod canonical;
pub mod capture;
pub mod config;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod memory;
pub mod store;
pub mod summary;

pub use cache::{CacheMetrics, EntryCacheConfig, InMemoryEntryCache};
pub use capture::{CaptureArchive, SessionEntry, TlsEvent};
pub use config::Config;
pub use diff::{DiffEngine, DiffRequest, DiffResult};
pub use error::{FingerprintError, StoreError};
pub use fingerprint::{EntrySummary, Fingerprint, FingerprintEngine, FingerprintOptions};
pub use memory::InMemoryEntryStore;
pub use store::{EntryCache, EntryStore, NoOpEntryCache};
pub use summary::{Http2Summary, TlsSummary};
