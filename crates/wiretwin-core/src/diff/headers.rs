//! Header presence and value comparison.

use crate::canonical::NormalizedHeaders;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A header present on both sides with different value lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderValueChange {
    pub name: String,
    pub baseline: Vec<String>,
    pub candidate: Vec<String>,
}

/// Outcome of comparing two normalized header maps.
///
/// A header name lands in at most one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderDiff {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
    pub value_changed: Vec<HeaderValueChange>,
    pub ignored: Vec<String>,
}

/// Lowercase an ignore list into a lookup set.
pub fn ignore_set(ignore: &[String]) -> HashSet<String> {
    ignore
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}

/// Compare normalized headers.
///
/// Ignored headers are only reported when present on both sides with
/// differing values; an ignored header missing from the candidate is not
/// reported at all. Values are compared in order and case-sensitively.
pub fn diff_headers(
    baseline: &NormalizedHeaders,
    candidate: &NormalizedHeaders,
    ignore: &[String],
) -> HeaderDiff {
    let ignored_names = ignore_set(ignore);
    let mut diff = HeaderDiff::default();

    for (name, baseline_values) in baseline {
        let candidate_values = candidate.get(name);

        if ignored_names.contains(name) {
            if candidate_values.is_some_and(|values| values != baseline_values) {
                diff.ignored.push(name.clone());
            }
            continue;
        }

        match candidate_values {
            None => diff.missing.push(name.clone()),
            Some(values) if values != baseline_values => {
                diff.value_changed.push(HeaderValueChange {
                    name: name.clone(),
                    baseline: baseline_values.clone(),
                    candidate: values.clone(),
                })
            }
            Some(_) => {}
        }
    }

    diff.extra = candidate
        .keys()
        .filter(|name| !ignored_names.contains(*name) && !baseline.contains_key(*name))
        .cloned()
        .collect();

    diff
}
