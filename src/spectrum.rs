//! Raw peak lists and the duplicate-merging normalizer.
//!
//! [`RawSpectrum`] is the shape every reader (mgf, mzML) and every test
//! fixture produces; [`normalize`] is the only transform applied to it
//! before discretization.

use crate::error::{BlinkError, BlinkResult};
use std::collections::HashMap;

/// A single (mz, intensity) peak.
pub type Peak = (f64, f64);

/// An undiscretized spectrum: a peak list plus its precursor m/z.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSpectrum {
    pub mz: Vec<f64>,
    pub intensity: Vec<f64>,
    pub precursor_mz: Option<f64>,
    pub params: HashMap<String, String>,
}

impl RawSpectrum {
    pub fn new(mz: Vec<f64>, intensity: Vec<f64>, precursor_mz: Option<f64>) -> Self {
        Self {
            mz,
            intensity,
            precursor_mz,
            params: HashMap::new(),
        }
    }

    pub fn peak_count(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    /// Validate the invariants the rest of the pipeline assumes: equal-length
    /// arrays, non-negative intensities, and (if there are peaks) a precursor.
    pub fn validate(&self) -> BlinkResult<()> {
        if self.mz.len() != self.intensity.len() {
            return Err(BlinkError::InvalidNumber(format!(
                "mz/intensity length mismatch: {} vs {}",
                self.mz.len(),
                self.intensity.len()
            )));
        }
        if !self.mz.is_empty() && self.precursor_mz.is_none() {
            return Err(BlinkError::MissingPrecursor);
        }
        Ok(())
    }
}

/// Collapse runs of peaks whose m/z values are within `min_diff` of their
/// left neighbour, averaging m/z and summing intensity for the run.
///
/// Assumes `spectrum.mz` is already sorted ascending; a single left-to-right
/// pass is sufficient because violations are local (this matches the
/// reference implementation's behaviour rather than a fixed-point collapse).
pub fn remove_duplicate_ions(spectrum: &RawSpectrum, min_diff: f64) -> RawSpectrum {
    if spectrum.mz.len() < 2 {
        return spectrum.clone();
    }

    let mut out_mz = Vec::with_capacity(spectrum.mz.len());
    let mut out_intensity = Vec::with_capacity(spectrum.intensity.len());

    let mut run_mz_sum = spectrum.mz[0];
    let mut run_intensity_sum = spectrum.intensity[0];
    let mut run_len: u32 = 1;

    for i in 1..spectrum.mz.len() {
        let prev_mz = spectrum.mz[i - 1];
        if spectrum.mz[i] - prev_mz < min_diff {
            run_mz_sum += spectrum.mz[i];
            run_intensity_sum += spectrum.intensity[i];
            run_len += 1;
        } else {
            out_mz.push(run_mz_sum / run_len as f64);
            out_intensity.push(run_intensity_sum);
            run_mz_sum = spectrum.mz[i];
            run_intensity_sum = spectrum.intensity[i];
            run_len = 1;
        }
    }
    out_mz.push(run_mz_sum / run_len as f64);
    out_intensity.push(run_intensity_sum);

    RawSpectrum {
        mz: out_mz,
        intensity: out_intensity,
        precursor_mz: spectrum.precursor_mz,
        params: spectrum.params.clone(),
    }
}
