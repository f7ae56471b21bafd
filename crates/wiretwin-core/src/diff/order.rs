//! Header order comparison via longest common subsequence.

use crate::canonical::{is_pseudo_header, HeaderPair};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A header whose relative position changed between baseline and candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMove {
    pub header: String,
    pub baseline_pos: usize,
    pub candidate_pos: usize,
}

/// Lowercased regular-header orders and the headers that moved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderOrderDiff {
    pub baseline_order: Vec<String>,
    pub candidate_order: Vec<String>,
    pub moves: Vec<HeaderMove>,
}

impl HeaderOrderDiff {
    pub fn is_unchanged(&self) -> bool {
        self.moves.is_empty() && self.baseline_order == self.candidate_order
    }
}

/// Lowercased names of the regular (non-pseudo) headers, in order.
pub fn header_names(pairs: &[HeaderPair]) -> Vec<String> {
    pairs
        .iter()
        .filter(|(name, _)| !is_pseudo_header(name))
        .map(|(name, _)| name.to_ascii_lowercase())
        .collect()
}

/// Longest common subsequence of two name sequences.
///
/// Backtracking decrements `i` only when `dp[i-1][j] > dp[i][j-1]`, otherwise
/// `j`. The tie-break is fixed so results are reproducible.
pub fn lcs(a: &[String], b: &[String]) -> Vec<String> {
    let (m, n) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; n + 1]; m + 1];

    for i in 1..=m {
        for j in 1..=n {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }

    let mut out = Vec::with_capacity(dp[m][n]);
    let (mut i, mut j) = (m, n);
    while i > 0 && j > 0 {
        if a[i - 1] == b[j - 1] {
            out.push(a[i - 1].clone());
            i -= 1;
            j -= 1;
        } else if dp[i - 1][j] > dp[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    out.reverse();
    out
}

/// Compare header orders. Pseudo-headers are excluded.
///
/// Only the first position of a repeated name is recorded, so reordering
/// among duplicates of one name is not visible here.
pub fn diff_header_order(baseline: &[HeaderPair], candidate: &[HeaderPair]) -> HeaderOrderDiff {
    let baseline_order = header_names(baseline);
    let candidate_order = header_names(candidate);

    let common_names = lcs(&baseline_order, &candidate_order);
    let common: HashSet<&str> = common_names.iter().map(String::as_str).collect();

    let mut seen = HashSet::new();
    let mut moves = Vec::new();
    for (baseline_pos, name) in baseline_order.iter().enumerate() {
        if !seen.insert(name.as_str()) || common.contains(name.as_str()) {
            continue;
        }
        if let Some(candidate_pos) = candidate_order.iter().position(|c| c == name) {
            moves.push(HeaderMove {
                header: name.clone(),
                baseline_pos,
                candidate_pos,
            });
        }
    }

    HeaderOrderDiff {
        baseline_order,
        candidate_order,
        moves,
    }
}
