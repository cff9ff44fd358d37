//! Mascot Generic Format reader (§4.7).
//!
//! A `.mgf` file is a sequence of `BEGIN IONS` / `END IONS` stanzas, each
//! holding `KEY=VALUE` parameter lines followed by whitespace-separated
//! `mz intensity` peak lines. Lines outside a stanza, and blank lines, are
//! ignored.

use crate::error::{BlinkError, BlinkResult};
use crate::spectrum::RawSpectrum;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Read every stanza of `path` into a [`RawSpectrum`].
///
/// Peaks are sorted by m/z on read — defensive, since most real files are
/// already sorted and the rest of the pipeline assumes sorted input.
pub fn read_mgf(path: impl AsRef<Path>) -> BlinkResult<Vec<RawSpectrum>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);

    let mut spectra = Vec::new();
    let mut in_stanza = false;
    let mut mz = Vec::new();
    let mut intensity = Vec::new();
    let mut precursor_mz = None;
    let mut params = HashMap::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("BEGIN IONS") {
            in_stanza = true;
            mz.clear();
            intensity.clear();
            precursor_mz = None;
            params = HashMap::new();
            continue;
        }
        if !in_stanza {
            continue;
        }
        if line.eq_ignore_ascii_case("END IONS") {
            in_stanza = false;
            let mut order: Vec<usize> = (0..mz.len()).collect();
            order.sort_by(|&a, &b| mz[a].partial_cmp(&mz[b]).unwrap_or(std::cmp::Ordering::Equal));
            let sorted_mz = order.iter().map(|&i| mz[i]).collect();
            let sorted_intensity = order.iter().map(|&i| intensity[i]).collect();
            spectra.push(RawSpectrum {
                mz: sorted_mz,
                intensity: sorted_intensity,
                precursor_mz,
                params: params.clone(),
            });
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim();
            if key.eq_ignore_ascii_case("PEPMASS") {
                let mass_token = value.split_whitespace().next().ok_or_else(|| {
                    BlinkError::InvalidNumber("empty PEPMASS value".to_string())
                })?;
                precursor_mz = Some(mass_token.parse::<f64>().map_err(|_| {
                    BlinkError::InvalidNumber(format!("malformed PEPMASS: {}", value))
                })?);
            } else {
                params.insert(key.to_string(), value.to_string());
            }
            continue;
        }

        let mut tokens = line.split_whitespace();
        let mz_token = tokens
            .next()
            .ok_or_else(|| BlinkError::InvalidNumber(format!("malformed peak line: {}", line)))?;
        let intensity_token = tokens
            .next()
            .ok_or_else(|| BlinkError::InvalidNumber(format!("malformed peak line: {}", line)))?;
        mz.push(
            mz_token
                .parse::<f64>()
                .map_err(|_| BlinkError::InvalidNumber(format!("malformed m/z: {}", mz_token)))?,
        );
        intensity.push(intensity_token.parse::<f64>().map_err(|_| {
            BlinkError::InvalidNumber(format!("malformed intensity: {}", intensity_token))
        })?);
    }

    Ok(spectra)
}
