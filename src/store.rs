//! The packed sparse representation of a discretized spectrum collection.
//!
//! A [`SpectrumStore`] is an immutable bag of parallel arrays (§3 of the
//! design spec). Network-kernel expansion (§4.4) does not mutate a store;
//! it attaches a sibling [`ExpandedView`] carrying the `_net` arrays.

use std::collections::HashMap;

/// One nonzero cell of the packed representation.
///
/// Exactly one of `intensity`/`count` is nonzero for any given entry (I1):
/// m/z-axis entries carry only intensity, neutral-loss-axis entries carry
/// only count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseEntry {
    pub intensity: f64,
    pub count: f64,
}

impl SparseEntry {
    pub fn intensity(v: f64) -> Self {
        Self {
            intensity: v,
            count: 0.0,
        }
    }

    pub fn count(v: f64) -> Self {
        Self {
            intensity: 0.0,
            count: v,
        }
    }
}

/// Derived `_net` arrays produced by the network-kernel expander (§4.4).
#[derive(Debug, Clone)]
pub struct ExpandedView {
    pub spec_id: Vec<u32>,
    pub col: Vec<i64>,
    /// The same peak's *other* axis column (see [`SpectrumStore::peer_col`]).
    pub peer_col: Vec<i64>,
    pub entries: Vec<SparseEntry>,
    pub shift: i64,
}

/// An immutable, discretized collection of spectra.
#[derive(Debug, Clone)]
pub struct SpectrumStore {
    /// Which spectrum each entry belongs to (0 <= spec_id < size()).
    pub spec_id: Vec<u32>,
    /// Shifted column index on the shared m/z/NL axis.
    pub col: Vec<i64>,
    /// The other axis's shifted column for the same peak: for an
    /// m/z-intensity entry this is its neutral-loss column, and vice versa.
    /// Always populated, independent of the zero-norm policy, so the score
    /// kernel can build the cross-axis (`nli`, `mzc`) matrices without
    /// relying on positional alignment between independently filtered
    /// arrays (the source implementation's approach, which breaks once an
    /// entry can be dropped).
    pub peer_col: Vec<i64>,
    /// Intensity/count cell for each entry.
    pub entries: Vec<SparseEntry>,
    /// Nonnegative offset applied to every column.
    pub shift: i64,
    /// Bin width in Da.
    pub bin_width: f64,
    /// Power intensities were raised to before normalizing.
    pub intensity_power: f64,
    /// Precursor m/z of each retained spectrum.
    pub precursor_mz: Vec<f64>,
    /// Free-form metadata attached at discretization time.
    pub metadata: HashMap<String, String>,
    /// Original indices of input spectra dropped for having no peaks.
    pub blanks: Vec<u32>,
    /// Cumulative spectrum count per source file, if discretized from
    /// multiple inputs.
    pub file_ids: Vec<u32>,
    /// Present once [`crate::kernel::expand`] has been run against this store.
    pub expanded: Option<ExpandedView>,
}

impl SpectrumStore {
    /// Number of spectra in the collection.
    pub fn size(&self) -> usize {
        self.precursor_mz.len()
    }

    /// Number of nonzero entries in the unexpanded representation.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Number of nonzero entries in the expanded representation, if any.
    pub fn nnz_net(&self) -> Option<usize> {
        self.expanded.as_ref().map(|e| e.entries.len())
    }

    /// Number of peaks contributed by a given spectrum (its m/z-axis nnz).
    pub fn peak_count(&self, spec_id: u32) -> usize {
        self.spec_id
            .iter()
            .zip(self.entries.iter())
            .filter(|(&s, e)| s == spec_id && e.intensity > 0.0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_store() -> SpectrumStore {
        SpectrumStore {
            spec_id: vec![],
            col: vec![],
            peer_col: vec![],
            entries: vec![],
            shift: 0,
            bin_width: 0.001,
            intensity_power: 0.5,
            precursor_mz: vec![],
            metadata: HashMap::new(),
            blanks: vec![],
            file_ids: vec![],
            expanded: None,
        }
    }

    #[test]
    fn size_tracks_precursor_mz() {
        let mut store = empty_store();
        store.precursor_mz = vec![100.0, 200.0];
        assert_eq!(store.size(), 2);
        assert_eq!(store.nnz(), 0);
        assert!(store.nnz_net().is_none());
    }

    #[test]
    fn entry_invariant_helpers() {
        let i = SparseEntry::intensity(0.5);
        let c = SparseEntry::count(1.0);
        assert!(i.intensity > 0.0 && i.count == 0.0);
        assert!(c.count > 0.0 && c.intensity == 0.0);
    }
}
