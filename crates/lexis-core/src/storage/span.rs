//! Deduplicating store of integer runs.
//!
//! Many suffixes map to the same list of pattern ids, and many words carry
//! the same property vector. [`DedupSpanStore`] keeps one flat buffer and
//! returns the offset of an existing contiguous copy of a run before
//! appending a new one.

use super::bitpack::BitPackedArray;

/// Append-only run buffer with contiguous-match reuse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupSpanStore {
    values: Vec<u64>,
}

impl DedupSpanStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose buffer starts with `prefix`.
    ///
    /// Used for placeholder entries that must sit at offset 0.
    #[must_use]
    pub fn with_prefix(prefix: &[u64]) -> Self {
        Self {
            values: prefix.to_vec(),
        }
    }

    /// Returns the offset of `run` in the buffer, appending it if absent.
    ///
    /// The first contiguous occurrence wins, including one that straddles
    /// earlier runs. An empty run is at offset 0 and appends nothing.
    pub fn get_offset(&mut self, run: &[u64]) -> usize {
        if run.is_empty() {
            return 0;
        }
        if let Some(offset) = self.find(run) {
            return offset;
        }
        let offset = self.values.len();
        self.values.extend_from_slice(run);
        offset
    }

    fn find(&self, run: &[u64]) -> Option<usize> {
        if run.len() > self.values.len() {
            return None;
        }
        self.values.windows(run.len()).position(|window| window == run)
    }

    /// The flat buffer.
    #[must_use]
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Number of stored values (not runs).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the store, returning the flat buffer.
    #[must_use]
    pub fn into_values(self) -> Vec<u64> {
        self.values
    }

    /// Packs the buffer at its minimal width.
    #[must_use]
    pub fn to_packed(&self) -> BitPackedArray<Vec<u8>> {
        BitPackedArray::from_values(&self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reuses_existing_run() {
        let mut store = DedupSpanStore::new();
        assert_eq!(store.get_offset(&[1, 2, 3]), 0);
        assert_eq!(store.get_offset(&[4, 5]), 3);
        assert_eq!(store.get_offset(&[1, 2, 3]), 0);
        assert_eq!(store.get_offset(&[2, 3]), 1);
        assert_eq!(store.values(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_match_across_runs() {
        let mut store = DedupSpanStore::new();
        store.get_offset(&[1, 2]);
        store.get_offset(&[3, 4]);
        assert_eq!(store.get_offset(&[2, 3]), 1);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_empty_run() {
        let mut store = DedupSpanStore::new();
        assert_eq!(store.get_offset(&[]), 0);
        assert!(store.is_empty());
        store.get_offset(&[7]);
        assert_eq!(store.get_offset(&[]), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_prefix_placeholder() {
        let mut store = DedupSpanStore::with_prefix(&[0]);
        assert_eq!(store.get_offset(&[5, 6]), 1);
        assert_eq!(store.get_offset(&[0, 5]), 0);
        assert_eq!(store.into_values(), vec![0, 5, 6]);
    }

    #[test]
    fn test_packed_width() {
        let mut store = DedupSpanStore::new();
        store.get_offset(&[1, 9, 3]);
        let packed = store.to_packed();
        assert_eq!(packed.width(), 4);
        assert_eq!(packed.iter().collect::<Vec<_>>(), vec![1, 9, 3]);
    }

    proptest! {
        #[test]
        fn prop_offset_points_at_run(runs in prop::collection::vec(prop::collection::vec(0u64..4, 0..5), 0..20)) {
            let mut store = DedupSpanStore::new();
            for run in &runs {
                let offset = store.get_offset(run);
                prop_assert_eq!(&store.values()[offset..offset + run.len()], run.as_slice());
            }
        }
    }
}
