//! Result filter (§4.6): thresholds the four score matrices and selects
//! top-k references per query.

use crate::score::ScoreResult;
use crate::sparse::SparseMatrix;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Which of §4.6's two named threshold rules to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// `(max(mzi, nli) >= min_score) AND (max(mzc, nlc) >= min_matches)` —
    /// §4.6's primary rule, equivalently `network_score >= σ AND
    /// network_matches >= μ`.
    #[default]
    Network,
    /// `mzi >= min_score OR nli >= min_score OR mzc >= min_matches OR nlc >=
    /// min_matches` — §4.6's named variant that ORs all four thresholds
    /// instead of combining mz/NL pairwise first.
    OrAllFour,
}

#[derive(Debug, Clone, Copy)]
pub struct FilterOptions {
    pub min_score: f64,
    pub min_matches: f64,
    pub mode: FilterMode,
    /// Extension beyond §4.6: when set, also keep a hit whose match count
    /// alone reaches this value regardless of score. `None` (the default)
    /// applies §4.6's rule with no waiver.
    pub good_matches: Option<f64>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            min_score: 0.5,
            min_matches: 5.0,
            mode: FilterMode::Network,
            good_matches: None,
        }
    }
}

/// A single (query, reference) hit surviving the threshold rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub query: usize,
    pub reference: usize,
    pub score: f64,
    pub matches: f64,
}

/// `max(mzi, nli)` and `max(mzc, nlc)`, taken elementwise over the union of
/// nonzero supports (§4.6).
pub fn compute_network_score(result: &ScoreResult) -> Option<(SparseMatrix, SparseMatrix)> {
    let mzi = result.mzi.as_ref()?;
    let nli = result.nli.as_ref()?;
    let mzc = result.mzc.as_ref()?;
    let nlc = result.nlc.as_ref()?;
    Some((mzi.maximum(nli), mzc.maximum(nlc)))
}

/// Threshold rule selected by `opts.mode` (§4.6), with an optional
/// match-count waiver layered on top (see `FilterOptions::good_matches`).
pub fn filter_hits(result: &ScoreResult, opts: &FilterOptions) -> Vec<Hit> {
    match opts.mode {
        FilterMode::Network => filter_network(result, opts),
        FilterMode::OrAllFour => filter_or_all_four(result, opts),
    }
}

fn filter_network(result: &ScoreResult, opts: &FilterOptions) -> Vec<Hit> {
    let (score_matrix, matches_matrix) = match compute_network_score(result) {
        Some(pair) => pair,
        None => return Vec::new(),
    };

    let mut matches_by_cell: HashMap<(usize, u32), f64> = HashMap::new();
    for (r, c, v) in matches_matrix.triplets() {
        matches_by_cell.insert((r, c), v);
    }

    let mut hits = Vec::new();
    for (r, c, score) in score_matrix.triplets() {
        let matches = matches_by_cell.get(&(r, c)).copied().unwrap_or(0.0);
        let passes = score >= opts.min_score && matches >= opts.min_matches;
        let waived = opts.good_matches.map_or(false, |g| matches >= g);
        if passes || waived {
            hits.push(Hit {
                query: r,
                reference: c as usize,
                score,
                matches,
            });
        }
    }
    hits
}

fn filter_or_all_four(result: &ScoreResult, opts: &FilterOptions) -> Vec<Hit> {
    let mut cells: HashMap<(usize, u32), (f64, f64, f64, f64)> = HashMap::new();
    if let Some(m) = &result.mzi {
        for (r, c, v) in m.triplets() {
            cells.entry((r, c)).or_default().0 = v;
        }
    }
    if let Some(m) = &result.nli {
        for (r, c, v) in m.triplets() {
            cells.entry((r, c)).or_default().1 = v;
        }
    }
    if let Some(m) = &result.mzc {
        for (r, c, v) in m.triplets() {
            cells.entry((r, c)).or_default().2 = v;
        }
    }
    if let Some(m) = &result.nlc {
        for (r, c, v) in m.triplets() {
            cells.entry((r, c)).or_default().3 = v;
        }
    }

    let mut hits = Vec::new();
    for ((r, c), (mzi, nli, mzc, nlc)) in cells {
        let matches = mzc.max(nlc);
        let passes = mzi >= opts.min_score
            || nli >= opts.min_score
            || mzc >= opts.min_matches
            || nlc >= opts.min_matches;
        let waived = opts.good_matches.map_or(false, |g| matches >= g);
        if passes || waived {
            hits.push(Hit {
                query: r,
                reference: c as usize,
                score: mzi.max(nli),
                matches,
            });
        }
    }
    hits
}

/// Retain, for each query row, the top-k hits by score, tie-broken by
/// descending match count then ascending reference id (§4.6).
pub fn top_k(mut hits: Vec<Hit>, k: usize) -> Vec<Hit> {
    hits.sort_by(|a, b| {
        a.query
            .cmp(&b.query)
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
            .then_with(|| b.matches.partial_cmp(&a.matches).unwrap_or(Ordering::Equal))
            .then_with(|| a.reference.cmp(&b.reference))
    });

    let mut out = Vec::new();
    let mut current_query = None;
    let mut count = 0;
    for hit in hits {
        if current_query != Some(hit.query) {
            current_query = Some(hit.query);
            count = 0;
        }
        if count < k {
            out.push(hit);
            count += 1;
        }
    }
    out
}
