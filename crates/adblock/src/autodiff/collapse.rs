//! Hand-off of an AD value to a linear solver.

use super::value::AutoDiffBlock;
use crate::sparse::{CscMatrix, SparseMatrix};
use crate::vector::DenseVector;

/// Value and horizontally concatenated Jacobian `[J_0 | ... | J_{B-1}]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Collapsed {
    pub value: DenseVector,
    /// `len x total_size`; empty blocks appear as zero column ranges.
    pub jacobian: CscMatrix,
}

impl Collapsed {
    /// `(value, nrows, ncols, col_ptr, row_idx, values)`.
    #[allow(clippy::type_complexity)]
    pub fn into_raw_parts(self) -> (Vec<f64>, usize, usize, Vec<usize>, Vec<usize>, Vec<f64>) {
        let (nrows, ncols) = self.jacobian.shape();
        let (col_ptr, row_idx, values) = self.jacobian.into_raw_parts();
        (self.value.into_vec(), nrows, ncols, col_ptr, row_idx, values)
    }
}

impl AutoDiffBlock {
    /// Collapse the Jacobian list into one compressed matrix.
    ///
    /// Columns `partition().block_range(k)` of the result hold `J[k]`.
    ///
    /// # Example
    ///
    /// ```
    /// use adblock::{AutoDiffBlock, BlockPartition};
    ///
    /// let p = BlockPartition::new([2, 1]);
    /// let x = AutoDiffBlock::variable(1, [7.0], &p).unwrap();
    /// let c = x.collapse();
    /// assert_eq!(c.jacobian.shape(), (1, 3));
    /// assert_eq!(c.jacobian.col_ptr(), &[0, 0, 0, 1]);
    /// ```
    pub fn collapse(&self) -> Collapsed {
        let blocks: Vec<CscMatrix> = self
            .derivative()
            .iter()
            .map(SparseMatrix::to_compressed)
            .collect();
        let refs: Vec<&CscMatrix> = blocks.iter().collect();
        Collapsed {
            value: self.value().clone(),
            jacobian: CscMatrix::hstack(self.len(), &refs),
        }
    }
}
