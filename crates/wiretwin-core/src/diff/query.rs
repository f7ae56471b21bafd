//! Query-string comparison.

use crate::diff::headers::ignore_set;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// A query key whose values differ between baseline and candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryKeyDiff {
    pub key: String,
    pub baseline: Vec<String>,
    pub candidate: Vec<String>,
    /// The key is on the ignore list (cache busters, timestamps, nonces).
    pub ignored: bool,
}

/// Percent-decoded query pairs grouped by key; repeated keys keep order.
pub fn query_params(raw_url: &str) -> BTreeMap<String, Vec<String>> {
    let parsed = Url::parse(raw_url).or_else(|_| {
        Url::parse("http://relative.invalid/").and_then(|base| base.join(raw_url))
    });

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Ok(url) = parsed {
        for (key, value) in url.query_pairs() {
            params
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
    }
    params
}

/// Every key whose value list differs, sorted by key.
pub fn diff_query_keys(
    baseline_url: &str,
    candidate_url: &str,
    ignore_keys: &[String],
) -> Vec<QueryKeyDiff> {
    let ignored = ignore_set(ignore_keys);
    let a = query_params(baseline_url);
    let b = query_params(candidate_url);

    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let baseline = a.get(key).cloned().unwrap_or_default();
            let candidate = b.get(key).cloned().unwrap_or_default();
            (baseline != candidate).then(|| QueryKeyDiff {
                key: key.clone(),
                ignored: ignored.contains(&key.to_ascii_lowercase()),
                baseline,
                candidate,
            })
        })
        .collect()
}
