//! End-to-end coverage of the concrete scenarios and invariants a discretize
//! + score pipeline must satisfy.

use blink::discretize::{discretize, DiscretizeOptions};
use blink::filter::{filter_hits, FilterOptions};
use blink::score::{score, ScoreOptions};
use blink::spectrum::RawSpectrum;
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
fn scenario_1_single_peak_self_match() {
    let s = RawSpectrum::new(vec![100.0], vec![16.0], Some(200.0));
    let store = discretize(&[s], &opts()).unwrap();
    let result = score(&store, &store, &ScoreOptions::default()).unwrap();

    assert!((result.mzi.as_ref().unwrap().get(0, 0) - 1.0).abs() < 1e-9);
    assert_eq!(result.mzc.as_ref().unwrap().get(0, 0), 1.0);
    assert!((result.nli.as_ref().unwrap().get(0, 0) - 1.0).abs() < 1e-9);
    assert_eq!(result.nlc.as_ref().unwrap().get(0, 0), 1.0);
}

#[test]
fn scenario_2_orthogonal_spectra() {
    let a = RawSpectrum::new(vec![50.0], vec![1.0], Some(300.0));
    let b = RawSpectrum::new(vec![60.0], vec![1.0], Some(300.0));
    let store_a = discretize(&[a], &opts()).unwrap();
    let store_b = discretize(&[b], &opts()).unwrap();

    let mut score_opts = ScoreOptions::default();
    score_opts.mass_diffs = vec![0.0];
    let result = score(&store_a, &store_b, &score_opts).unwrap();

    assert_eq!(result.mzi.unwrap().get(0, 0), 0.0);
    assert_eq!(result.mzc.unwrap().get(0, 0), 0.0);
    assert_eq!(result.nli.unwrap().get(0, 0), 0.0);
    assert_eq!(result.nlc.unwrap().get(0, 0), 0.0);
}

#[test]
fn scenario_3_exact_match_under_kernel_tolerance_dependent() {
    let a = RawSpectrum::new(vec![100.000], vec![1.0], Some(300.0));
    let b = RawSpectrum::new(vec![100.018], vec![1.0], Some(300.0));
    let store_a = discretize(&[a], &opts()).unwrap();
    let store_b = discretize(&[b], &opts()).unwrap();

    let mut wide = ScoreOptions::default();
    wide.tolerance = 0.01;
    wide.mass_diffs = vec![0.0];
    wide.react_steps = 1;
    let result_wide = score(&store_a, &store_b, &wide).unwrap();
    assert!((result_wide.mzi.unwrap().get(0, 0) - 1.0).abs() < 1e-6);
    assert_eq!(result_wide.mzc.unwrap().get(0, 0), 1.0);

    let mut narrow = wide.clone();
    narrow.tolerance = 0.005;
    let result_narrow = score(&store_a, &store_b, &narrow).unwrap();
    assert_eq!(result_narrow.mzi.unwrap().get(0, 0), 0.0);
    assert_eq!(result_narrow.mzc.unwrap().get(0, 0), 0.0);
}

#[test]
fn scenario_4_mass_diff_kernel() {
    let a = RawSpectrum::new(vec![100.000], vec![1.0], Some(300.0));
    let b = RawSpectrum::new(vec![116.000], vec![1.0], Some(300.0));
    let store_a = discretize(&[a], &opts()).unwrap();
    let store_b = discretize(&[b], &opts()).unwrap();

    let mut with_diff = ScoreOptions::default();
    with_diff.tolerance = 0.01;
    with_diff.mass_diffs = vec![15.99491];
    with_diff.react_steps = 1;
    let matched = score(&store_a, &store_b, &with_diff).unwrap();
    assert!(matched.nli.unwrap().get(0, 0) > 0.0);

    let mut no_diff = with_diff.clone();
    no_diff.mass_diffs = vec![0.0];
    let unmatched = score(&store_a, &store_b, &no_diff).unwrap();
    assert_eq!(unmatched.nli.unwrap().get(0, 0), 0.0);
}

#[test]
fn scenario_5_multi_peak_normalized_cosine() {
    let a = RawSpectrum::new(vec![100.0, 200.0, 300.0], vec![1.0, 1.0, 1.0], Some(400.0));
    let b = a.clone();
    let store_a = discretize(&[a], &opts()).unwrap();
    let store_b = discretize(&[b], &opts()).unwrap();
    let result = score(&store_a, &store_b, &ScoreOptions::default()).unwrap();

    assert!((result.mzi.unwrap().get(0, 0) - 1.0).abs() < 1e-9);
    assert_eq!(result.mzc.unwrap().get(0, 0), 3.0);
}

#[test]
fn scenario_6_duplicate_merge_contributes_sqrt_of_summed_intensity() {
    let s = RawSpectrum::new(vec![100.0000, 100.0005], vec![4.0, 9.0], Some(300.0));
    let mut o = opts();
    o.remove_duplicates = true;
    let store = discretize(&[s], &o).unwrap();

    assert_eq!(store.peak_count(0), 1);
    let merged_entry = store.entries.iter().find(|e| e.intensity > 0.0).unwrap();
    assert!((merged_entry.intensity - 1.0).abs() < 1e-9);
}

#[test]
fn p1_every_stored_column_is_nonnegative() {
    let a = RawSpectrum::new(vec![100.0], vec![1.0], Some(50.0)); // precursor < fragment
    let store = discretize(&[a], &opts()).unwrap();
    assert!(store.col.iter().all(|&c| c >= 0));
    assert!(store.peer_col.iter().all(|&c| c >= 0));
}

#[test]
fn p2_exactly_one_of_intensity_count_is_nonzero_per_entry() {
    let a = RawSpectrum::new(vec![100.0, 200.0], vec![1.0, 2.0], Some(300.0));
    let store = discretize(&[a], &opts()).unwrap();
    for entry in &store.entries {
        assert!((entry.intensity > 0.0) ^ (entry.count > 0.0));
    }
}

#[test]
fn r2_self_score_mzc_diagonal_reproduces_peak_counts() {
    let spectra = vec![
        RawSpectrum::new(vec![100.0, 150.0], vec![1.0, 1.0], Some(300.0)),
        RawSpectrum::new(vec![100.0, 150.0, 200.0], vec![1.0, 1.0, 1.0], Some(400.0)),
    ];
    let store = discretize(&spectra, &opts()).unwrap();
    let result = score(&store, &store, &ScoreOptions::default()).unwrap();
    let mzc = result.mzc.unwrap();
    assert_eq!(mzc.get(0, 0), 2.0);
    assert_eq!(mzc.get(1, 1), 3.0);
}

#[test]
fn default_filter_rule_survives_into_hit_list() {
    let spectra = vec![RawSpectrum::new(
        vec![100.0, 150.0, 200.0, 250.0, 300.0, 350.0],
        vec![1.0; 6],
        Some(400.0),
    )];
    let store = discretize(&spectra, &opts()).unwrap();
    let result = score(&store, &store, &ScoreOptions::default()).unwrap();
    let hits = filter_hits(&result, &FilterOptions::default());
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].query, 0);
    assert_eq!(hits[0].reference, 0);
}
