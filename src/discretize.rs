//! The binner/discretizer (§4.2): turns a batch of [`RawSpectrum`] into a
//! [`SpectrumStore`] addressing both the m/z and neutral-loss axes.

use crate::error::{BlinkError, BlinkResult};
use crate::spectrum::{remove_duplicate_ions, RawSpectrum};
use crate::store::{SparseEntry, SpectrumStore};
use std::collections::HashMap;

/// Options controlling discretization (mirrors the CLI's discretize flags).
#[derive(Debug, Clone)]
pub struct DiscretizeOptions {
    pub bin_width: f64,
    pub intensity_power: f64,
    pub trim_empty: bool,
    pub remove_duplicates: bool,
    pub metadata: HashMap<String, String>,
}

impl Default for DiscretizeOptions {
    fn default() -> Self {
        Self {
            bin_width: 0.001,
            intensity_power: 0.5,
            trim_empty: false,
            remove_duplicates: false,
            metadata: HashMap::new(),
        }
    }
}

/// Round half to even, matching `numpy.rint`'s tie-break so bin indices are
/// deterministic across implementations.
fn round_half_even(x: f64) -> f64 {
    let floor = x.floor();
    let diff = x - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else {
        let floor_i = floor as i64;
        if floor_i % 2 == 0 {
            floor
        } else {
            floor + 1.0
        }
    }
}

fn to_bin(value: f64, bin_width: f64) -> i64 {
    round_half_even(value / bin_width) as i64
}

/// Discretize a batch of spectra into a packed sparse [`SpectrumStore`].
///
/// See SPEC_FULL.md §4.2 for the full algorithm, including the zero-norm
/// policy for all-zero-intensity spectra.
pub fn discretize(spectra: &[RawSpectrum], opts: &DiscretizeOptions) -> BlinkResult<SpectrumStore> {
    for s in spectra {
        s.validate()?;
    }

    // Step 1: trim empty spectra, remembering their original indices.
    let mut blanks = Vec::new();
    let mut kept: Vec<&RawSpectrum> = Vec::with_capacity(spectra.len());
    let mut dedup_holder: Vec<RawSpectrum> = Vec::new();

    if opts.trim_empty {
        for (idx, s) in spectra.iter().enumerate() {
            if s.is_empty() {
                blanks.push(idx as u32);
            } else {
                kept.push(s);
            }
        }
    } else {
        kept.extend(spectra.iter());
    }

    // Step 2: optional duplicate merge (min_diff = 2 * bin_width).
    let retained: Vec<&RawSpectrum> = if opts.remove_duplicates {
        dedup_holder = kept
            .iter()
            .map(|s| remove_duplicate_ions(s, 2.0 * opts.bin_width))
            .collect();
        dedup_holder.iter().collect()
    } else {
        kept
    };

    if retained.is_empty() {
        return Ok(SpectrumStore {
            spec_id: vec![],
            col: vec![],
            peer_col: vec![],
            entries: vec![],
            shift: 0,
            bin_width: opts.bin_width,
            intensity_power: opts.intensity_power,
            precursor_mz: vec![],
            metadata: opts.metadata.clone(),
            blanks,
            file_ids: vec![],
            expanded: None,
        });
    }

    // Per-spectrum raised intensities, intensity norm, and bin indices.
    struct PerSpectrum {
        mz_bins: Vec<i64>,
        raised: Vec<f64>,
        inorm: f64,
        nl_bins: Vec<i64>,
    }

    let mut per_spectrum = Vec::with_capacity(retained.len());
    let mut global_min_nl = i64::MAX;

    for spectrum in &retained {
        let precursor = spectrum.precursor_mz.unwrap_or(0.0);
        let p_bin = to_bin(precursor, opts.bin_width);

        let raised: Vec<f64> = spectrum
            .intensity
            .iter()
            .map(|i| i.powf(opts.intensity_power))
            .collect();
        let inorm_sq: f64 = raised.iter().map(|x| x * x).sum();
        let inorm = if inorm_sq > 0.0 { inorm_sq.sqrt() } else { 0.0 };

        let mz_bins: Vec<i64> = spectrum.mz.iter().map(|mz| to_bin(*mz, opts.bin_width)).collect();
        let nl_bins: Vec<i64> = mz_bins.iter().map(|k| p_bin - k).collect();

        for &nl in &nl_bins {
            global_min_nl = global_min_nl.min(nl);
        }

        per_spectrum.push(PerSpectrum {
            mz_bins,
            raised,
            inorm,
            nl_bins,
        });
    }

    // Clamped to 0: m/z bins are already nonnegative on their own, so a
    // shift is only ever needed to pull a negative NL bin (fragment heavier
    // than its own precursor) up to zero. Applying -min(nl) unconditionally,
    // as the reference implementation does, would push every m/z column
    // negative whenever fragments are simply much lighter than the
    // precursor across the whole batch — the common case — violating (I2).
    let shift = if global_min_nl == i64::MAX {
        0
    } else {
        (-global_min_nl).max(0)
    };

    let mut spec_id = Vec::new();
    let mut col = Vec::new();
    let mut peer_col = Vec::new();
    let mut entries = Vec::new();
    let mut precursor_mz = Vec::with_capacity(retained.len());

    for (idx, spectrum) in retained.iter().enumerate() {
        precursor_mz.push(spectrum.precursor_mz.unwrap_or(0.0));
        let ps = &per_spectrum[idx];
        let m_s = spectrum.mz.len();

        for peak in 0..m_s {
            let mz_col = ps.mz_bins[peak] + shift;
            let nl_col = ps.nl_bins[peak] + shift;

            // m/z-axis entry: only emitted when the intensity norm is nonzero
            // (§4.2 zero-norm policy).
            if ps.inorm > 0.0 {
                spec_id.push(idx as u32);
                col.push(mz_col);
                peer_col.push(nl_col);
                entries.push(SparseEntry::intensity(ps.raised[peak] / ps.inorm));
            }

            // NL-axis entry: count contribution is always 1 per peak, since
            // the count-norm constant cnorm = sqrt(m_s)/||1||_2 = 1 (§3).
            // Emitted unconditionally so mzc/nlc stay well-defined even for
            // zero-norm spectra.
            spec_id.push(idx as u32);
            col.push(nl_col);
            peer_col.push(mz_col);
            entries.push(SparseEntry::count(1.0));
        }
    }

    Ok(SpectrumStore {
        spec_id,
        col,
        peer_col,
        entries,
        shift,
        bin_width: opts.bin_width,
        intensity_power: opts.intensity_power,
        precursor_mz,
        metadata: opts.metadata.clone(),
        blanks,
        file_ids: vec![],
        expanded: None,
    })
}

/// Validate that a spectrum with peaks but no precursor is rejected before
/// discretization is attempted on a whole batch.
pub fn validate_batch(spectra: &[RawSpectrum]) -> BlinkResult<()> {
    for s in spectra {
        s.validate().map_err(|_| BlinkError::MissingPrecursor)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn single_peak_self_match_columns_are_nonnegative() {
        // Scenario 1: one spectrum, one peak.
        let s = RawSpectrum::new(vec![100.0], vec![16.0], Some(200.0));
        let store = discretize(&[s], &opts()).unwrap();

        assert_eq!(store.size(), 1);
        assert!(store.col.iter().all(|&c| c >= 0));
        // One m/z-intensity entry + one NL-count entry.
        assert_eq!(store.nnz(), 2);
    }

    #[test]
    fn unit_intensity_norm_per_spectrum() {
        let s = RawSpectrum::new(
            vec![100.0, 200.0, 300.0],
            vec![1.0, 1.0, 1.0],
            Some(400.0),
        );
        let store = discretize(&[s], &opts()).unwrap();
        let intensity_sq_sum: f64 = store
            .entries
            .iter()
            .map(|e| e.intensity * e.intensity)
            .sum();
        assert!((intensity_sq_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn trim_empty_records_blanks() {
        let spectra = vec![
            RawSpectrum::new(vec![], vec![], None),
            RawSpectrum::new(vec![100.0], vec![1.0], Some(200.0)),
        ];
        let mut o = opts();
        o.trim_empty = true;
        let store = discretize(&spectra, &o).unwrap();
        assert_eq!(store.blanks, vec![0]);
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn missing_precursor_with_peaks_is_rejected() {
        let spectra = vec![RawSpectrum::new(vec![100.0], vec![1.0], None)];
        assert!(discretize(&spectra, &opts()).is_err());
    }

    #[test]
    fn all_zero_intensity_skips_mz_entries_but_keeps_counts() {
        let s = RawSpectrum::new(vec![100.0, 200.0], vec![0.0, 0.0], Some(300.0));
        let store = discretize(&[s], &opts()).unwrap();
        assert!(store.entries.iter().all(|e| e.intensity == 0.0));
        assert_eq!(store.entries.iter().filter(|e| e.count > 0.0).count(), 2);
    }

    #[test]
    fn rounding_ties_go_to_even() {
        assert_eq!(to_bin(0.0005, 0.001), 0); // 0.5 -> 0 (even)
        assert_eq!(to_bin(0.0015, 0.001), 2); // 1.5 -> 2 (even)
        assert_eq!(to_bin(0.0025, 0.001), 2); // 2.5 -> 2 (even)
    }
}
