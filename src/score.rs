//! The score kernel (§4.5): shift-aligns two stores and computes the four
//! m/z- and neutral-loss-axis sparse products.

use crate::error::{BlinkError, BlinkResult};
use crate::kernel::{self, DEFAULT_EXPANSION_BUDGET};
use crate::sparse::SparseMatrix;
use crate::store::{ExpandedView, SparseEntry, SpectrumStore};

/// Which of the four result matrices to compute. All `true` by default,
/// matching the distilled contract's `which ⊆ {mzi, nli, mzc, nlc}`.
#[derive(Debug, Clone, Copy)]
pub struct ScoreKeys {
    pub mzi: bool,
    pub nli: bool,
    pub mzc: bool,
    pub nlc: bool,
}

impl Default for ScoreKeys {
    fn default() -> Self {
        Self {
            mzi: true,
            nli: true,
            mzc: true,
            nlc: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoreOptions {
    pub tolerance: f64,
    pub mass_diffs: Vec<f64>,
    pub react_steps: u32,
    pub expansion_budget: Option<u64>,
    pub which: ScoreKeys,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            mass_diffs: vec![0.0],
            react_steps: 1,
            expansion_budget: None,
            which: ScoreKeys::default(),
        }
    }
}

/// The four score/match matrices, each `|query| x |reference|` with queries
/// on rows (§4.5).
#[derive(Debug, Clone, Default)]
pub struct ScoreResult {
    pub mzi: Option<SparseMatrix>,
    pub nli: Option<SparseMatrix>,
    pub mzc: Option<SparseMatrix>,
    pub nlc: Option<SparseMatrix>,
}

/// A borrowed view over either a store's base arrays or its kernel-expanded
/// sibling — lets the axis-matrix builder below be agnostic to which side
/// went through network-kernel expansion.
struct View<'a> {
    spec_id: &'a [u32],
    col: &'a [i64],
    peer_col: &'a [i64],
    entries: &'a [SparseEntry],
    shift: i64,
}

impl<'a> View<'a> {
    fn from_store(s: &'a SpectrumStore) -> Self {
        Self {
            spec_id: &s.spec_id,
            col: &s.col,
            peer_col: &s.peer_col,
            entries: &s.entries,
            shift: s.shift,
        }
    }

    fn from_expanded(e: &'a ExpandedView) -> Self {
        Self {
            spec_id: &e.spec_id,
            col: &e.col,
            peer_col: &e.peer_col,
            entries: &e.entries,
            shift: e.shift,
        }
    }

    fn max_col(&self) -> i64 {
        self.col
            .iter()
            .chain(self.peer_col.iter())
            .copied()
            .max()
            .unwrap_or(0)
    }
}

struct AxisMatrices {
    mzi: SparseMatrix,
    nli: SparseMatrix,
    mzc: SparseMatrix,
    nlc: SparseMatrix,
}

fn build_axis_matrices(view: &View, offset: i64, nrows: usize, ncols: usize, which: ScoreKeys) -> AxisMatrices {
    let mut mzi_t = (Vec::new(), Vec::new(), Vec::new());
    let mut nli_t = (Vec::new(), Vec::new(), Vec::new());
    let mut mzc_t = (Vec::new(), Vec::new(), Vec::new());
    let mut nlc_t = (Vec::new(), Vec::new(), Vec::new());

    for i in 0..view.entries.len() {
        let row = view.spec_id[i];
        let entry = view.entries[i];

        if entry.intensity > 0.0 {
            if which.mzi {
                mzi_t.0.push(row);
                mzi_t.1.push(view.col[i] + offset);
                mzi_t.2.push(entry.intensity);
            }
            if which.nli {
                nli_t.0.push(row);
                nli_t.1.push(view.peer_col[i] + offset);
                nli_t.2.push(entry.intensity);
            }
        }
        if entry.count > 0.0 {
            if which.nlc {
                nlc_t.0.push(row);
                nlc_t.1.push(view.col[i] + offset);
                nlc_t.2.push(entry.count);
            }
            if which.mzc {
                mzc_t.0.push(row);
                mzc_t.1.push(view.peer_col[i] + offset);
                mzc_t.2.push(entry.count);
            }
        }
    }

    AxisMatrices {
        mzi: SparseMatrix::from_triplets(&mzi_t.0, &mzi_t.1, &mzi_t.2, nrows, ncols),
        nli: SparseMatrix::from_triplets(&nli_t.0, &nli_t.1, &nli_t.2, nrows, ncols),
        mzc: SparseMatrix::from_triplets(&mzc_t.0, &mzc_t.1, &mzc_t.2, nrows, ncols),
        nlc: SparseMatrix::from_triplets(&nlc_t.0, &nlc_t.1, &nlc_t.2, nrows, ncols),
    }
}

/// Score `query` against `reference`, computing the requested subset of
/// `{mzi, nli, mzc, nlc}`.
///
/// The side with fewer nonzeros is network-kernel expanded before the
/// product (§4.5 step 1, §9 design notes) — this is the opposite of what a
/// literal reading of "expand whichever store is larger" in the contract
/// prose would suggest; expanding the *smaller* side is what keeps kernel
/// memory bounded and is what scenario 3 of the concrete test scenarios
/// actually requires.
pub fn score(query: &SpectrumStore, reference: &SpectrumStore, opts: &ScoreOptions) -> BlinkResult<ScoreResult> {
    if (query.bin_width - reference.bin_width).abs() > 1e-12 {
        return Err(BlinkError::IncompatibleBins {
            a: query.bin_width,
            b: reference.bin_width,
        });
    }

    let expand_query = query.nnz() < reference.nnz();
    let budget = opts.expansion_budget.unwrap_or(DEFAULT_EXPANSION_BUDGET);

    let query_expanded = if expand_query {
        Some(kernel::expand(
            query,
            opts.tolerance,
            &opts.mass_diffs,
            opts.react_steps,
            Some(budget),
        )?)
    } else {
        None
    };
    let reference_expanded = if !expand_query {
        Some(kernel::expand(
            reference,
            opts.tolerance,
            &opts.mass_diffs,
            opts.react_steps,
            Some(budget),
        )?)
    } else {
        None
    };

    let query_view = query_expanded
        .as_ref()
        .map(View::from_expanded)
        .unwrap_or_else(|| View::from_store(query));
    let reference_view = reference_expanded
        .as_ref()
        .map(View::from_expanded)
        .unwrap_or_else(|| View::from_store(reference));

    let final_shift = query_view.shift.max(reference_view.shift);
    let query_offset = final_shift - query_view.shift;
    let reference_offset = final_shift - reference_view.shift;

    let ncols = (query_view.max_col() + query_offset)
        .max(reference_view.max_col() + reference_offset)
        .max(0) as usize
        + 1;

    let query_axes = build_axis_matrices(&query_view, query_offset, query.size(), ncols, opts.which);
    let reference_axes = build_axis_matrices(&reference_view, reference_offset, reference.size(), ncols, opts.which);

    Ok(ScoreResult {
        mzi: opts.which.mzi.then(|| query_axes.mzi.mul_transpose(&reference_axes.mzi)),
        nli: opts.which.nli.then(|| query_axes.nli.mul_transpose(&reference_axes.nli)),
        mzc: opts.which.mzc.then(|| query_axes.mzc.mul_transpose(&reference_axes.mzc)),
        nlc: opts.which.nlc.then(|| query_axes.nlc.mul_transpose(&reference_axes.nlc)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretize::{discretize, DiscretizeOptions};
    use crate::spectrum::RawSpectrum;
    use std::collections::HashMap;

    fn opts() -> DiscretizeOptions {
        DiscretizeOptions {
            bin_width: 0.001,
            intensity_power: 0.5,
            trim_empty: false,
            remove_duplicates: false,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn self_score_mzi_diagonal_is_one() {
        let s = RawSpectrum::new(
            vec![100.0, 150.0, 200.0],
            vec![4.0, 9.0, 1.0],
            Some(300.0),
        );
        let store = discretize(&[s], &opts()).unwrap();
        let result = score(&store, &store, &ScoreOptions::default()).unwrap();
        let mzi = result.mzi.unwrap();
        assert!((mzi.get(0, 0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn self_score_mzc_diagonal_is_peak_count() {
        let s = RawSpectrum::new(vec![100.0, 150.0, 200.0], vec![4.0, 9.0, 1.0], Some(300.0));
        let store = discretize(&[s], &opts()).unwrap();
        let result = score(&store, &store, &ScoreOptions::default()).unwrap();
        let mzc = result.mzc.unwrap();
        assert_eq!(mzc.get(0, 0), 3.0);
    }

    #[test]
    fn orthogonal_spectra_score_zero() {
        let a = RawSpectrum::new(vec![100.0], vec![1.0], Some(300.0));
        let b = RawSpectrum::new(vec![250.0], vec![1.0], Some(300.0));
        let store_a = discretize(&[a], &opts()).unwrap();
        let store_b = discretize(&[b], &opts()).unwrap();
        let result = score(&store_a, &store_b, &ScoreOptions::default()).unwrap();
        assert_eq!(result.mzi.unwrap().get(0, 0), 0.0);
    }

    #[test]
    fn incompatible_bin_widths_are_rejected() {
        let mut o2 = opts();
        o2.bin_width = 0.01;
        let a = RawSpectrum::new(vec![100.0], vec![1.0], Some(300.0));
        let store_a = discretize(&[a.clone()], &opts()).unwrap();
        let store_b = discretize(&[a], &o2).unwrap();
        let result = score(&store_a, &store_b, &ScoreOptions::default());
        assert!(matches!(result, Err(BlinkError::IncompatibleBins { .. })));
    }

    #[test]
    fn kernel_matched_mass_diff_scores_nonzero() {
        // Scenario 4: two single-peak spectra separated by a mass diff the
        // kernel is told to react over should match via the NL axis.
        let a = RawSpectrum::new(vec![100.0], vec![1.0], Some(300.0));
        let b = RawSpectrum::new(vec![112.0], vec![1.0], Some(300.0));
        let store_a = discretize(&[a], &opts()).unwrap();
        let store_b = discretize(&[b], &opts()).unwrap();
        let mut score_opts = ScoreOptions::default();
        score_opts.tolerance = 0.01;
        score_opts.mass_diffs = vec![12.0];
        score_opts.react_steps = 1;
        let result = score(&store_a, &store_b, &score_opts).unwrap();
        assert!(result.nli.unwrap().get(0, 0) > 0.0);
    }
}
