//! Configuration file for the fingerprint and diff engines.

use crate::cache::EntryCacheConfig;
use crate::diff::{default_ignore_headers, default_ignore_query_keys, DiffEngine};
use crate::fingerprint::{FingerprintEngine, FingerprintOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub fingerprint: FingerprintOptions,
    #[serde(default)]
    pub cache: EntryCacheConfig,
}

/// Ignore lists applied when a diff request does not carry its own.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiffConfig {
    #[serde(default = "default_ignore_headers")]
    pub ignore_headers: Vec<String>,
    #[serde(default = "default_ignore_query_keys")]
    pub ignore_query_keys: Vec<String>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            ignore_headers: default_ignore_headers(),
            ignore_query_keys: default_ignore_query_keys(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.fingerprint.max_bytes == 0 {
            anyhow::bail!("fingerprint.max_bytes must be greater than zero");
        }

        for (list, entries) in [
            ("diff.ignore_headers", &self.diff.ignore_headers),
            ("diff.ignore_query_keys", &self.diff.ignore_query_keys),
        ] {
            if let Some(idx) = entries.iter().position(|e| e.trim().is_empty()) {
                anyhow::bail!("{list}[{idx}] is empty");
            }
        }

        Ok(())
    }

    /// Build a diff engine over `fingerprints` using this configuration.
    pub fn diff_engine(&self, fingerprints: FingerprintEngine) -> DiffEngine {
        DiffEngine::new(fingerprints)
            .with_ignore_lists(
                self.diff.ignore_headers.clone(),
                self.diff.ignore_query_keys.clone(),
            )
            .with_fingerprint_options(self.fingerprint.clone())
    }
}
