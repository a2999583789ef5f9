//! Chunk ranges: how a node's work items split into parallel units.

use serde::{Deserialize, Serialize};

/// One contiguous slice of a node's work items. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRange {
    /// Zero-based index of this chunk among its siblings.
    pub iteration: usize,
    pub begin: usize,
    pub end: usize,
}

impl ChunkRange {
    /// Covers `size` items as a single chunk.
    pub fn full(size: usize) -> Self {
        Self { iteration: 0, begin: 0, end: size }
    }

    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// Parallelization declared by a node type: how many work items each chunk
/// may cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parallelization {
    pub block_size: usize,
}

impl Parallelization {
    /// Splits `size` items into block-sized chunks, the last one ragged.
    /// Zero items means zero chunks.
    pub fn ranges(&self, size: usize) -> Vec<ChunkRange> {
        let block = self.block_size.max(1);
        (0..size.div_ceil(block))
            .map(|i| ChunkRange {
                iteration: i,
                begin: i * block,
                end: ((i + 1) * block).min(size),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_with_ragged_tail() {
        let p = Parallelization { block_size: 10 };
        let ranges = p.ranges(25);
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0], ChunkRange { iteration: 0, begin: 0, end: 10 });
        assert_eq!(ranges[2], ChunkRange { iteration: 2, begin: 20, end: 25 });
    }

    #[test]
    fn zero_items_means_zero_chunks() {
        let p = Parallelization { block_size: 10 };
        assert!(p.ranges(0).is_empty());
    }

    #[test]
    fn full_range_covers_everything() {
        let r = ChunkRange::full(7);
        assert_eq!(r.len(), 7);
        assert_eq!(r.iteration, 0);
    }
}
