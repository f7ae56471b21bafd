//! Bounded in-memory entry cache.

use crate::capture::SessionEntry;
use crate::store::EntryCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Configuration for [`InMemoryEntryCache`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryCacheConfig {
    /// Maximum number of cached entries (0 = unbounded)
    pub max_entries: usize,
    /// TTL for cached entries in seconds (0 = no expiration)
    pub ttl_seconds: u64,
}

impl Default for EntryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 4096,
            ttl_seconds: 0,
        }
    }
}

#[derive(Clone, Debug)]
struct CachedEntry {
    entry: SessionEntry,
    created_at: Instant,
    last_accessed: Instant,
}

impl CachedEntry {
    fn new(entry: SessionEntry) -> Self {
        let now = Instant::now();
        Self {
            entry,
            created_at: now,
            last_accessed: now,
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        !ttl.is_zero() && self.created_at.elapsed() > ttl
    }
}

/// Cache performance counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Entries and metrics share one lock so they never disagree.
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CachedEntry>,
    metrics: CacheMetrics,
}

/// Entry cache with least-recently-accessed eviction and optional TTL.
pub struct InMemoryEntryCache {
    config: EntryCacheConfig,
    state: RwLock<CacheState>,
}

impl InMemoryEntryCache {
    pub fn new(config: EntryCacheConfig) -> Self {
        debug!(
            "Creating entry cache: max_entries={}, ttl={}s",
            config.max_entries, config.ttl_seconds
        );
        Self {
            config,
            state: RwLock::new(CacheState::default()),
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.ttl_seconds)
    }

    fn evict_lru(state: &mut CacheState) {
        let oldest = state
            .entries
            .iter()
            .min_by_key(|(_, cached)| cached.last_accessed)
            .map(|(id, _)| id.clone());

        if let Some(id) = oldest {
            state.entries.remove(&id);
            state.metrics.evictions += 1;
            trace!("Evicted LRU entry: {}", id);
        }
    }

    /// Current cache metrics.
    pub fn metrics(&self) -> CacheMetrics {
        self.state.read().metrics.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.metrics.size = 0;
        debug!("Entry cache cleared");
    }
}

impl Default for InMemoryEntryCache {
    fn default() -> Self {
        Self::new(EntryCacheConfig::default())
    }
}

impl EntryCache for InMemoryEntryCache {
    fn get(&self, entry_id: &str) -> Option<SessionEntry> {
        let ttl = self.ttl();
        let mut state = self.state.write();

        let expired = match state.entries.get(entry_id) {
            Some(cached) => cached.is_expired(ttl),
            None => {
                state.metrics.misses += 1;
                trace!("Cache miss for entry {}", entry_id);
                return None;
            }
        };

        if expired {
            state.entries.remove(entry_id);
            state.metrics.misses += 1;
            state.metrics.expirations += 1;
            state.metrics.size = state.entries.len();
            trace!("Cache entry expired for entry {}", entry_id);
            return None;
        }

        state.metrics.hits += 1;
        let cached = state.entries.get_mut(entry_id)?;
        cached.last_accessed = Instant::now();
        Some(cached.entry.clone())
    }

    fn put(&self, entry_id: &str, entry: SessionEntry) {
        let mut state = self.state.write();

        if self.config.max_entries > 0
            && state.entries.len() >= self.config.max_entries
            && !state.entries.contains_key(entry_id)
        {
            Self::evict_lru(&mut state);
        }

        state
            .entries
            .insert(entry_id.to_string(), CachedEntry::new(entry));
        state.metrics.inserts += 1;
        state.metrics.size = state.entries.len();
    }
}
