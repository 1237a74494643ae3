//! Block partition of the independent variables.
//!
//! A `BlockPartition` lists the sizes `n_0, ..., n_{B-1}` of the independent
//! variable blocks and precomputes cumulative offsets. Two partitions are
//! compatible exactly when their size sequences are equal.

use std::fmt;
use std::ops::Range;

use smallvec::SmallVec;

use crate::error::AdError;

/// Sizes and offsets of the independent variable blocks.
///
/// # Example
/// ```
/// use adblock::BlockPartition;
///
/// let p = BlockPartition::new([3, 1, 2]);
/// assert_eq!(p.num_blocks(), 3);
/// assert_eq!(p.total_size(), 6);
/// assert_eq!(p.block_range(2), 4..6);
/// assert_eq!(p.find_block(3), (1, 0));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockPartition {
    sizes: SmallVec<[usize; 4]>,
    /// `offsets[k]` is the sum of `sizes[..k]`; one longer than `sizes`.
    offsets: SmallVec<[usize; 5]>,
}

impl BlockPartition {
    pub fn new(sizes: impl IntoIterator<Item = usize>) -> Self {
        let sizes: SmallVec<[usize; 4]> = sizes.into_iter().collect();
        let mut offsets = SmallVec::with_capacity(sizes.len() + 1);
        offsets.push(0);
        let mut total = 0;
        for &n in &sizes {
            total += n;
            offsets.push(total);
        }
        Self { sizes, offsets }
    }

    /// `num_blocks` blocks of equal size.
    pub fn uniform(num_blocks: usize, block_size: usize) -> Self {
        Self::new(std::iter::repeat_n(block_size, num_blocks))
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.sizes.len()
    }

    /// Sum of all block sizes.
    #[inline]
    pub fn total_size(&self) -> usize {
        self.offsets[self.sizes.len()]
    }

    /// # Panics
    /// Panics if `k >= num_blocks`.
    #[inline]
    pub fn block_size(&self, k: usize) -> usize {
        self.sizes[k]
    }

    /// Column where block `k` starts in the collapsed Jacobian.
    ///
    /// # Panics
    /// Panics if `k >= num_blocks`.
    #[inline]
    pub fn block_offset(&self, k: usize) -> usize {
        assert!(k < self.num_blocks(), "block {k} out of range");
        self.offsets[k]
    }

    /// Half-open column range of block `k`.
    pub fn block_range(&self, k: usize) -> Range<usize> {
        self.block_offset(k)..self.offsets[k + 1]
    }

    #[inline]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Cumulative offsets, `num_blocks + 1` entries.
    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Block holding flat index `index`, as `(block, offset_within_block)`.
    /// Zero-size blocks are skipped.
    ///
    /// # Panics
    /// Panics if `index >= total_size`.
    pub fn find_block(&self, index: usize) -> (usize, usize) {
        assert!(
            index < self.total_size(),
            "index {} out of range for total size {}",
            index,
            self.total_size()
        );
        // First offset strictly greater than `index`, minus one.
        let k = self.offsets.partition_point(|&o| o <= index) - 1;
        (k, index - self.offsets[k])
    }

    /// Split a flat vector of length `total_size` into one vector per block.
    ///
    /// This is how a solver increment is mapped back onto the primary
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` if `flat.len() != total_size`.
    pub fn split(&self, flat: &[f64]) -> Result<Vec<Vec<f64>>, AdError> {
        if flat.len() != self.total_size() {
            return Err(AdError::RangeMismatch {
                op: "split",
                expected: self.total_size(),
                actual: flat.len(),
            });
        }
        Ok((0..self.num_blocks())
            .map(|k| flat[self.block_range(k)].to_vec())
            .collect())
    }

    /// Require `self` and `other` to have the same size sequence.
    ///
    /// # Errors
    ///
    /// Returns `AdError::PartitionMismatch` otherwise.
    pub fn check_compatible(&self, other: &BlockPartition) -> Result<(), AdError> {
        if self.sizes == other.sizes {
            Ok(())
        } else {
            Err(AdError::PartitionMismatch {
                expected: self.sizes.to_vec(),
                actual: other.sizes.to_vec(),
            })
        }
    }
}

impl Default for BlockPartition {
    fn default() -> Self {
        Self::new([])
    }
}

impl From<Vec<usize>> for BlockPartition {
    fn from(sizes: Vec<usize>) -> Self {
        Self::new(sizes)
    }
}

impl From<&[usize]> for BlockPartition {
    fn from(sizes: &[usize]) -> Self {
        Self::new(sizes.iter().copied())
    }
}

impl<const N: usize> From<[usize; N]> for BlockPartition {
    fn from(sizes: [usize; N]) -> Self {
        Self::new(sizes)
    }
}

impl fmt::Display for BlockPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (k, n) in self.sizes.iter().enumerate() {
            if k > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{n}")?;
        }
        write!(f, "}}")
    }
}
