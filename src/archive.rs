//! Sparse archive persistence (§4.8): a single `bincode`-encoded file per
//! discretized store, wrapped in a versioned envelope so a reader can
//! reject an incompatible format revision instead of misinterpreting bytes.

use crate::error::{BlinkError, BlinkResult};
use crate::score::ScoreResult;
use crate::sparse::SparseMatrix;
use crate::store::{SparseEntry, SpectrumStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

const CURRENT_VERSION: u32 = 1;
const RESULT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveV1 {
    spec_id: Vec<u32>,
    col: Vec<i64>,
    peer_col: Vec<i64>,
    intensity: Vec<f64>,
    count: Vec<f64>,
    shift: i64,
    bin_width: f64,
    intensity_power: f64,
    precursor_mz: Vec<f64>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    blanks: Vec<u32>,
    #[serde(default)]
    file_ids: Vec<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    body: ArchiveV1,
}

impl From<&SpectrumStore> for ArchiveV1 {
    fn from(s: &SpectrumStore) -> Self {
        Self {
            spec_id: s.spec_id.clone(),
            col: s.col.clone(),
            peer_col: s.peer_col.clone(),
            intensity: s.entries.iter().map(|e| e.intensity).collect(),
            count: s.entries.iter().map(|e| e.count).collect(),
            shift: s.shift,
            bin_width: s.bin_width,
            intensity_power: s.intensity_power,
            precursor_mz: s.precursor_mz.clone(),
            metadata: s.metadata.clone(),
            blanks: s.blanks.clone(),
            file_ids: s.file_ids.clone(),
        }
    }
}

impl From<ArchiveV1> for SpectrumStore {
    fn from(a: ArchiveV1) -> Self {
        let entries = a
            .intensity
            .into_iter()
            .zip(a.count)
            .map(|(intensity, count)| SparseEntry { intensity, count })
            .collect();
        SpectrumStore {
            spec_id: a.spec_id,
            col: a.col,
            peer_col: a.peer_col,
            entries,
            shift: a.shift,
            bin_width: a.bin_width,
            intensity_power: a.intensity_power,
            precursor_mz: a.precursor_mz,
            metadata: a.metadata,
            blanks: a.blanks,
            file_ids: a.file_ids,
            expanded: None,
        }
    }
}

/// Write `store` to `path` as a versioned bincode archive.
pub fn write_store(store: &SpectrumStore, path: impl AsRef<Path>) -> BlinkResult<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let envelope = Envelope {
        version: CURRENT_VERSION,
        body: ArchiveV1::from(store),
    };
    bincode::serialize_into(writer, &envelope)?;
    Ok(())
}

/// Read a [`SpectrumStore`] back from a bincode archive written by
/// [`write_store`]. Rejects archives from a newer, incompatible format
/// revision instead of silently misinterpreting their bytes.
pub fn read_store(path: impl AsRef<Path>) -> BlinkResult<SpectrumStore> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let envelope: Envelope = bincode::deserialize_from(reader)
        .map_err(|e| BlinkError::MalformedArchive(e.to_string()))?;
    if envelope.version != CURRENT_VERSION {
        return Err(BlinkError::MalformedArchive(format!(
            "unsupported archive version {} (expected {})",
            envelope.version, CURRENT_VERSION
        )));
    }
    Ok(envelope.body.into())
}

/// `--fast-format` archive for a [`ScoreResult`] (§4.9): each requested
/// matrix is stored as its raw `(row, col, value)` triplets plus the shared
/// dimensions needed to rebuild it.
#[derive(Debug, Serialize, Deserialize)]
struct MatrixV1 {
    nrows: usize,
    ncols: usize,
    rows: Vec<u32>,
    cols: Vec<u32>,
    values: Vec<f64>,
}

impl From<&SparseMatrix> for MatrixV1 {
    fn from(m: &SparseMatrix) -> Self {
        let mut rows = Vec::with_capacity(m.nnz());
        let mut cols = Vec::with_capacity(m.nnz());
        let mut values = Vec::with_capacity(m.nnz());
        for (r, c, v) in m.triplets() {
            rows.push(r as u32);
            cols.push(c);
            values.push(v);
        }
        Self {
            nrows: m.nrows,
            ncols: m.ncols,
            rows,
            cols,
            values,
        }
    }
}

impl From<MatrixV1> for SparseMatrix {
    fn from(m: MatrixV1) -> Self {
        let cols: Vec<i64> = m.cols.iter().map(|&c| c as i64).collect();
        SparseMatrix::from_triplets(&m.rows, &cols, &m.values, m.nrows, m.ncols)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ResultArchiveV1 {
    mzi: Option<MatrixV1>,
    nli: Option<MatrixV1>,
    mzc: Option<MatrixV1>,
    nlc: Option<MatrixV1>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResultEnvelope {
    version: u32,
    body: ResultArchiveV1,
}

/// Write a [`ScoreResult`] to `path` as a versioned bincode archive.
pub fn write_result(result: &ScoreResult, path: impl AsRef<Path>) -> BlinkResult<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let envelope = ResultEnvelope {
        version: RESULT_VERSION,
        body: ResultArchiveV1 {
            mzi: result.mzi.as_ref().map(MatrixV1::from),
            nli: result.nli.as_ref().map(MatrixV1::from),
            mzc: result.mzc.as_ref().map(MatrixV1::from),
            nlc: result.nlc.as_ref().map(MatrixV1::from),
        },
    };
    bincode::serialize_into(writer, &envelope)?;
    Ok(())
}

/// Read a [`ScoreResult`] back from an archive written by [`write_result`].
pub fn read_result(path: impl AsRef<Path>) -> BlinkResult<ScoreResult> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let envelope: ResultEnvelope = bincode::deserialize_from(reader)
        .map_err(|e| BlinkError::MalformedArchive(e.to_string()))?;
    if envelope.version != RESULT_VERSION {
        return Err(BlinkError::MalformedArchive(format!(
            "unsupported result archive version {} (expected {})",
            envelope.version, RESULT_VERSION
        )));
    }
    Ok(ScoreResult {
        mzi: envelope.body.mzi.map(SparseMatrix::from),
        nli: envelope.body.nli.map(SparseMatrix::from),
        mzc: envelope.body.mzc.map(SparseMatrix::from),
        nlc: envelope.body.nlc.map(SparseMatrix::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretize::{discretize, DiscretizeOptions};
    use crate::spectrum::RawSpectrum;

    #[test]
    fn round_trip_preserves_fields() {
        let s = RawSpectrum::new(vec![100.0, 150.0], vec![4.0, 9.0], Some(300.0));
        let opts = DiscretizeOptions::default();
        let store = discretize(&[s], &opts).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.blink");
        write_store(&store, &path).unwrap();
        let round_tripped = read_store(&path).unwrap();

        assert_eq!(round_tripped.spec_id, store.spec_id);
        assert_eq!(round_tripped.col, store.col);
        assert_eq!(round_tripped.peer_col, store.peer_col);
        assert_eq!(round_tripped.shift, store.shift);
        assert_eq!(round_tripped.precursor_mz, store.precursor_mz);
        for (a, b) in round_tripped.entries.iter().zip(store.entries.iter()) {
            assert!((a.intensity - b.intensity).abs() < 1e-12);
            assert!((a.count - b.count).abs() < 1e-12);
        }
    }

    #[test]
    fn result_archive_round_trip() {
        use crate::score::{score, ScoreOptions};

        let s = RawSpectrum::new(vec![100.0, 150.0], vec![4.0, 9.0], Some(300.0));
        let store = discretize(&[s], &DiscretizeOptions::default()).unwrap();
        let result = score(&store, &store, &ScoreOptions::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.blink");
        write_result(&result, &path).unwrap();
        let round_tripped = read_result(&path).unwrap();

        assert!((round_tripped.mzi.unwrap().get(0, 0) - result.mzi.unwrap().get(0, 0)).abs() < 1e-12);
        assert_eq!(round_tripped.mzc.unwrap().get(0, 0), result.mzc.unwrap().get(0, 0));
    }

    #[test]
    fn rejects_truncated_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.blink");
        std::fs::write(&path, b"not an archive").unwrap();
        assert!(matches!(read_store(&path), Err(BlinkError::MalformedArchive(_))));
    }
}
