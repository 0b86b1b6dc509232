//! Cell view built from an index stream
//!
//! Counts how often each index occurs, giving a `CellExtractor` over any
//! `IndexExtractor`. A filter's own index stream has no repeats, so every
//! count is 1; a raw hasher stream reports collisions as higher counts.

use std::collections::BTreeMap;

use crate::ports::{CellExtractor, IndexExtractor};

/// Ordered `(index, count)` cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cells {
    counts: BTreeMap<i32, i32>,
}

impl Cells {
    /// Count every index `indices` produces.
    pub fn from_indices(indices: &dyn IndexExtractor) -> Self {
        let mut counts = BTreeMap::new();
        indices.process_indices(&mut |index| {
            let count = counts.entry(index).or_insert(0i32);
            *count = count.saturating_add(1);
            true
        });
        Self { counts }
    }

    /// Number of distinct indices.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl IndexExtractor for Cells {
    fn process_indices(&self, visit: &mut dyn FnMut(i32) -> bool) -> bool {
        self.counts.keys().all(|&index| visit(index))
    }
}

impl CellExtractor for Cells {
    fn process_cells(&self, visit: &mut dyn FnMut(i32, i32) -> bool) -> bool {
        self.counts.iter().all(|(&index, &count)| visit(index, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_repeats_in_ascending_order() {
        let cells = Cells::from_indices(&[7, 1, 7, 3, 1, 7]);
        assert_eq!(cells.as_cell_array(), vec![(1, 2), (3, 1), (7, 3)]);
        assert_eq!(cells.as_index_array(), vec![1, 3, 7]);
        assert_eq!(cells.len(), 3);
    }

    #[test]
    fn test_empty_source() {
        let cells = Cells::from_indices(&Vec::<i32>::new());
        assert!(cells.is_empty());
        assert!(cells.as_cell_array().is_empty());
    }

    #[test]
    fn test_process_cells_stops_early() {
        let cells = Cells::from_indices(&[1, 2, 3]);
        let mut seen = 0;
        assert!(!cells.process_cells(&mut |_, _| {
            seen += 1;
            false
        }));
        assert_eq!(seen, 1);
    }
}
