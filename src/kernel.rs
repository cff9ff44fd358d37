//! The network-kernel expander (§4.4): replicates each nonzero of a store
//! across an offset set Ω built from a tolerance, a set of mass differences,
//! and a reaction-step count.

use crate::error::{BlinkError, BlinkResult};
use crate::store::{ExpandedView, SpectrumStore};

/// Nonzeros-after-expansion budget used when the caller doesn't supply one.
///
/// Chosen to keep a single expansion comfortably under a few GB of
/// `SparseEntry` storage on a typical workstation.
pub const DEFAULT_EXPANSION_BUDGET: u64 = 200_000_000;

fn round_half_even(x: f64) -> f64 {
    let floor = x.floor();
    let diff = x - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    }
}

/// Normalize a list of mass differences into the symmetric `[-d_k..-d_1,
/// d_1..d_k]` sequence used to seed the kernel (§4.4 step 2). An empty `D`
/// is treated as `D = [0]` (the empty-D open question, resolved in
/// SPEC_FULL.md §4.4).
fn normalize_mass_diffs(mass_diffs: &[f64]) -> Vec<f64> {
    let mass_diffs: &[f64] = if mass_diffs.is_empty() { &[0.0] } else { mass_diffs };

    let mut sorted_abs: Vec<f64> = mass_diffs.iter().map(|d| d.abs()).collect();
    sorted_abs.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut symmetric = Vec::with_capacity(sorted_abs.len() * 2);
    for d in sorted_abs.iter().rev() {
        symmetric.push(-d);
    }
    symmetric.extend(sorted_abs.iter().copied());

    let mid = sorted_abs.len();
    if mid < symmetric.len() && symmetric[mid] == 0.0 {
        symmetric.remove(mid);
    }

    symmetric
}

/// Recursively combine `d_bin` with itself `steps` times (outer-sum
/// recursion from §4.4 step 4), deduplicating at every step rather than
/// only at the end.
fn react(d_bin: &[i64], steps: u32) -> Vec<i64> {
    if steps <= 1 {
        let mut v = d_bin.to_vec();
        v.sort_unstable();
        v.dedup();
        return v;
    }
    let inner = react(d_bin, steps - 1);
    let mut out = Vec::with_capacity(d_bin.len().saturating_mul(inner.len()));
    for &a in d_bin {
        for &b in &inner {
            out.push(a + b);
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}

/// Compute the offset set Ω for a given tolerance, mass-difference list, and
/// reaction-step count. Duplicates within Ω are intentional: two distinct
/// mass-difference/tolerance paths landing on the same offset must each
/// contribute to the expanded weight at that column.
pub fn compute_offsets(bin_width: f64, tolerance: f64, mass_diffs: &[f64], react_steps: u32) -> Vec<i64> {
    // Truncate toward zero (not round-to-nearest) to match the reference
    // implementation's `int(2*(tolerance/bin_width)-1)`.
    let bin_tol = (2.0 * (tolerance / bin_width) - 1.0).trunc() as i64;

    let symmetric = normalize_mass_diffs(mass_diffs);
    let d_bin: Vec<i64> = symmetric
        .iter()
        .map(|d| round_half_even(d / bin_width) as i64)
        .collect();

    let react_steps = react_steps.max(1);
    let d_react = react(&d_bin, react_steps);

    let lo = -(bin_tol.div_euclid(2)) - if bin_tol.rem_euclid(2) != 0 { 1 } else { 0 } + 1;
    let hi = bin_tol.div_euclid(2);

    let mut omega = Vec::with_capacity(d_react.len() * ((hi - lo + 1).max(0) as usize));
    for &delta in &d_react {
        for t in lo..=hi {
            omega.push(delta + t);
        }
    }
    omega
}

/// Expand `store` across Ω, refusing with [`BlinkError::ResourceExceeded`]
/// if the predicted nonzero count would exceed `budget`.
pub fn expand(
    store: &SpectrumStore,
    tolerance: f64,
    mass_diffs: &[f64],
    react_steps: u32,
    budget: Option<u64>,
) -> BlinkResult<ExpandedView> {
    let omega = compute_offsets(store.bin_width, tolerance, mass_diffs, react_steps);
    let budget = budget.unwrap_or(DEFAULT_EXPANSION_BUDGET);

    let needed = store.nnz() as u64 * omega.len() as u64;
    if needed > budget {
        return Err(BlinkError::ResourceExceeded { needed, budget });
    }

    let mut spec_id = Vec::with_capacity(needed as usize);
    let mut col = Vec::with_capacity(needed as usize);
    let mut peer_col = Vec::with_capacity(needed as usize);
    let mut entries = Vec::with_capacity(needed as usize);

    // Every replica of entry i shifts both its own column and its peer's
    // column by the same offset, so the cross-axis (nli/mzc) view built in
    // score.rs stays consistent with the network-kernel expansion.
    for i in 0..store.entries.len() {
        for &delta in &omega {
            spec_id.push(store.spec_id[i]);
            col.push(store.col[i] + delta);
            peer_col.push(store.peer_col[i] + delta);
            entries.push(store.entries[i]);
        }
    }

    let min_col = col
        .iter()
        .chain(peer_col.iter())
        .copied()
        .min()
        .unwrap_or(0);
    let shift_net = store.shift - min_col;
    for c in col.iter_mut() {
        *c -= min_col;
    }
    for c in peer_col.iter_mut() {
        *c -= min_col;
    }

    Ok(ExpandedView {
        spec_id,
        col,
        peer_col,
        entries,
        shift: shift_net,
    })
}

/// Expand `store` in place, attaching the result as `store.expanded`.
pub fn expand_in_place(
    store: &mut SpectrumStore,
    tolerance: f64,
    mass_diffs: &[f64],
    react_steps: u32,
    budget: Option<u64>,
) -> BlinkResult<()> {
    store.expanded = Some(expand(store, tolerance, mass_diffs, react_steps, budget)?);
    Ok(())
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
    fn empty_mass_diffs_falls_back_to_zero() {
        let with_empty = compute_offsets(0.001, 0.01, &[], 1);
        let with_zero = compute_offsets(0.001, 0.01, &[0.0], 1);
        assert_eq!(with_empty, with_zero);
    }

    #[test]
    fn omega_contains_zero_when_d_is_zero() {
        let omega = compute_offsets(0.001, 0.005, &[0.0], 1);
        assert!(omega.contains(&0));
    }

    #[test]
    fn expansion_all_columns_nonnegative() {
        let s = RawSpectrum::new(vec![100.0], vec![16.0], Some(200.0));
        let store = discretize(&[s], &opts()).unwrap();
        let expanded = expand(&store, 0.01, &[0.0], 1, None).unwrap();
        assert!(expanded.col.iter().all(|&c| c >= 0));
        assert!(expanded.peer_col.iter().all(|&c| c >= 0));
    }

    #[test]
    fn resource_budget_is_enforced() {
        let s = RawSpectrum::new(vec![100.0], vec![16.0], Some(200.0));
        let store = discretize(&[s], &opts()).unwrap();
        let result = expand(&store, 100.0, &[0.0, 1.0, 2.0], 3, Some(1));
        assert!(matches!(result, Err(BlinkError::ResourceExceeded { .. })));
    }

    #[test]
    fn react_steps_increase_offset_count_monotonically() {
        let omega1 = compute_offsets(0.001, 0.001, &[0.02], 1);
        let omega2 = compute_offsets(0.001, 0.001, &[0.02], 2);
        // react_steps=2 combines the mass diff with itself, which cannot
        // shrink the distinct offsets reachable (P6).
        let set1: std::collections::HashSet<_> = omega1.iter().copied().collect();
        let set2: std::collections::HashSet<_> = omega2.iter().copied().collect();
        assert!(set2.len() >= set1.len());
    }
}
