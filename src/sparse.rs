//! A minimal CSR sparse matrix used to hold one of the four scoring
//! matrices (m/z-intensity, NL-intensity, m/z-count, NL-count) and to
//! perform the shifted sparse product in [`crate::score`].
//!
//! Construction always sums duplicate `(row, col)` triplets — matrices in
//! this crate are treated as sets of `(row, col, value)` triples, never as
//! ordered entry lists (§5 ordering guarantees).

use rayon::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SparseMatrix {
    pub nrows: usize,
    pub ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<u32>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Build a matrix from row/col/value triplets, summing duplicates.
    /// Triplets with a negative or out-of-range column are dropped.
    pub fn from_triplets(rows: &[u32], cols: &[i64], values: &[f64], nrows: usize, ncols: usize) -> Self {
        let mut per_row: Vec<HashMap<u32, f64>> = vec![HashMap::new(); nrows];
        for i in 0..rows.len() {
            let r = rows[i] as usize;
            if r >= nrows {
                continue;
            }
            let c = cols[i];
            if c < 0 || c as usize >= ncols {
                continue;
            }
            *per_row[r].entry(c as u32).or_insert(0.0) += values[i];
        }
        Self::from_rows(per_row, nrows, ncols)
    }

    fn from_rows(per_row: Vec<HashMap<u32, f64>>, nrows: usize, ncols: usize) -> Self {
        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for row in per_row {
            let mut sorted: Vec<(u32, f64)> = row.into_iter().filter(|(_, v)| *v != 0.0).collect();
            sorted.sort_unstable_by_key(|(c, _)| *c);
            for (c, v) in sorted {
                col_idx.push(c);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }
        Self {
            nrows,
            ncols,
            row_ptr,
            col_idx,
            values,
        }
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row_entries(&self, r: usize) -> impl Iterator<Item = (u32, f64)> + '_ {
        let start = self.row_ptr[r];
        let end = self.row_ptr[r + 1];
        self.col_idx[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    pub fn get(&self, r: usize, c: u32) -> f64 {
        let start = self.row_ptr[r];
        let end = self.row_ptr[r + 1];
        match self.col_idx[start..end].binary_search(&c) {
            Ok(idx) => self.values[start + idx],
            Err(_) => 0.0,
        }
    }

    /// Iterate every `(row, col, value)` triple in the matrix.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, u32, f64)> + '_ {
        (0..self.nrows).flat_map(move |r| self.row_entries(r).map(move |(c, v)| (r, c, v)))
    }

    /// `self * other^T`, producing an `nrows x other.nrows` matrix. Both
    /// operands must share the same column space. Row-chunked via rayon
    /// (§5 concurrency model).
    pub fn mul_transpose(&self, other: &SparseMatrix) -> SparseMatrix {
        assert_eq!(self.ncols, other.ncols, "shared column space mismatch");

        let mut col_to_other: Vec<Vec<(u32, f64)>> = vec![Vec::new(); self.ncols];
        for r in 0..other.nrows {
            for (c, v) in other.row_entries(r) {
                col_to_other[c as usize].push((r as u32, v));
            }
        }

        let rows: Vec<(Vec<u32>, Vec<f64>)> = (0..self.nrows)
            .into_par_iter()
            .map(|r| {
                let mut acc: HashMap<u32, f64> = HashMap::new();
                for (c, v) in self.row_entries(r) {
                    for &(other_row, other_val) in &col_to_other[c as usize] {
                        *acc.entry(other_row).or_insert(0.0) += v * other_val;
                    }
                }
                let mut entries: Vec<(u32, f64)> = acc.into_iter().collect();
                entries.sort_unstable_by_key(|(c, _)| *c);
                entries.into_iter().unzip()
            })
            .collect();

        let mut row_ptr = Vec::with_capacity(self.nrows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for (cols, vals) in rows {
            col_idx.extend(cols);
            values.extend(vals);
            row_ptr.push(col_idx.len());
        }

        SparseMatrix {
            nrows: self.nrows,
            ncols: other.nrows,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Elementwise maximum over the union of nonzero supports (§4.6).
    pub fn maximum(&self, other: &SparseMatrix) -> SparseMatrix {
        assert_eq!(self.nrows, other.nrows);
        assert_eq!(self.ncols, other.ncols);
        let mut per_row: Vec<HashMap<u32, f64>> = vec![HashMap::new(); self.nrows];
        for r in 0..self.nrows {
            for (c, v) in self.row_entries(r) {
                per_row[r].insert(c, v);
            }
            for (c, v) in other.row_entries(r) {
                let slot = per_row[r].entry(c).or_insert(0.0);
                if v > *slot {
                    *slot = v;
                }
            }
        }
        Self::from_rows(per_row, self.nrows, self.ncols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_triplets_sum() {
        let m = SparseMatrix::from_triplets(&[0, 0], &[2, 2], &[1.0, 2.0], 1, 5);
        assert_eq!(m.get(0, 2), 3.0);
        assert_eq!(m.nnz(), 1);
    }

    #[test]
    fn mul_transpose_identity_gives_dot_products() {
        // Two rows, shared 3-column space.
        let a = SparseMatrix::from_triplets(&[0, 0, 1], &[0, 1, 2], &[1.0, 2.0, 3.0], 2, 3);
        let b = SparseMatrix::from_triplets(&[0, 1], &[0, 2], &[1.0, 1.0], 2, 3);
        let product = a.mul_transpose(&b);
        assert_eq!(product.get(0, 0), 1.0); // row0 . row0 = 1*1
        assert_eq!(product.get(0, 1), 0.0); // row0 . row1 = 0 (no shared col)
        assert_eq!(product.get(1, 1), 3.0); // row1 . row1 = 3*1
    }

    #[test]
    fn maximum_takes_union_of_supports() {
        let a = SparseMatrix::from_triplets(&[0], &[0], &[1.0], 1, 2);
        let b = SparseMatrix::from_triplets(&[0], &[1], &[5.0], 1, 2);
        let m = a.maximum(&b);
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(0, 1), 5.0);
    }
}
