//! The AD value type: construction and accessors.

use std::fmt;

use smallvec::SmallVec;

use super::jacobian::JacobianList;
use crate::error::AdError;
use crate::partition::BlockPartition;
use crate::sparse::SparseMatrix;
use crate::vector::DenseVector;

/// A dense value vector together with its sparse Jacobian blocks.
///
/// `jacobians[k]` is the `len() x n_k` derivative of the value with respect
/// to independent variable block `k`. Any block may be
/// [`SparseMatrix::Empty`], which stands for the zero matrix of its nominal
/// shape.
///
/// # Example
///
/// ```
/// use adblock::{AutoDiffBlock, BlockPartition};
///
/// let p = BlockPartition::new([3, 1, 2]);
/// let x = AutoDiffBlock::variable(0, [1.0, 2.2, 3.4], &p).unwrap();
/// assert_eq!(x.len(), 3);
/// assert_eq!(x.num_blocks(), 3);
/// assert_eq!(x.jacobian(0).nnz(), 3);
/// assert!(x.jacobian(2).is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AutoDiffBlock {
    value: DenseVector,
    jacobians: JacobianList,
}

impl AutoDiffBlock {
    /// Value with no dependence on any variable: every block is empty with
    /// nominal shape `len x n_k`.
    pub fn constant(value: impl Into<DenseVector>, partition: &BlockPartition) -> Self {
        let value = value.into();
        let m = value.len();
        let jacobians = partition
            .sizes()
            .iter()
            .map(|&n| SparseMatrix::zero(m, n))
            .collect();
        Self { value, jacobians }
    }

    /// Constant with no blocks at all. In binary operations it adopts the
    /// partition of the other operand.
    pub fn constant_without_partition(value: impl Into<DenseVector>) -> Self {
        Self {
            value: value.into(),
            jacobians: SmallVec::new(),
        }
    }

    /// Independent variable occupying block `index`: its Jacobian is the
    /// identity in that block and empty elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `AdError::VariableOutOfRange` if `index >= num_blocks` and
    /// `AdError::BlockSizeMismatch` if the value length differs from the
    /// block size.
    pub fn variable(
        index: usize,
        value: impl Into<DenseVector>,
        partition: &BlockPartition,
    ) -> Result<Self, AdError> {
        if index >= partition.num_blocks() {
            return Err(AdError::VariableOutOfRange {
                index,
                num_blocks: partition.num_blocks(),
            });
        }
        let value = value.into();
        let m = value.len();
        if m != partition.block_size(index) {
            return Err(AdError::BlockSizeMismatch {
                block: index,
                expected: partition.block_size(index),
                actual: m,
            });
        }
        let jacobians = partition
            .sizes()
            .iter()
            .enumerate()
            .map(|(k, &n)| {
                if k == index {
                    SparseMatrix::identity(n)
                } else {
                    SparseMatrix::zero(m, n)
                }
            })
            .collect();
        Ok(Self { value, jacobians })
    }

    /// Value with caller-supplied Jacobian blocks.
    ///
    /// Every block must have `len` rows. A shape-less empty block is
    /// promoted to `len x 0`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` for a block with the wrong row count.
    pub fn function(
        value: impl Into<DenseVector>,
        jacobians: impl IntoIterator<Item = SparseMatrix>,
    ) -> Result<Self, AdError> {
        let value = value.into();
        let m = value.len();
        let jacobians = jacobians
            .into_iter()
            .map(|jac| promote_rows(jac, m, 0))
            .collect::<Result<JacobianList, _>>()?;
        Ok(Self { value, jacobians })
    }

    /// Like [`function`](Self::function), also checking each block against
    /// `partition`. Shape-less empty blocks are promoted to `len x n_k`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::PartitionMismatch` for the wrong number of blocks,
    /// `AdError::RangeMismatch` for a wrong row count and
    /// `AdError::BlockSizeMismatch` for a wrong column count.
    pub fn function_with_partition(
        value: impl Into<DenseVector>,
        jacobians: impl IntoIterator<Item = SparseMatrix>,
        partition: &BlockPartition,
    ) -> Result<Self, AdError> {
        let value = value.into();
        let m = value.len();
        let jacobians: Vec<SparseMatrix> = jacobians.into_iter().collect();
        if jacobians.len() != partition.num_blocks() {
            return Err(AdError::PartitionMismatch {
                expected: partition.sizes().to_vec(),
                actual: jacobians.iter().map(SparseMatrix::ncols).collect(),
            });
        }
        let jacobians = jacobians
            .into_iter()
            .enumerate()
            .map(|(k, jac)| {
                let n = partition.block_size(k);
                let jac = promote_rows(jac, m, n)?;
                if jac.ncols() != n {
                    return Err(AdError::BlockSizeMismatch {
                        block: k,
                        expected: n,
                        actual: jac.ncols(),
                    });
                }
                Ok(jac)
            })
            .collect::<Result<JacobianList, _>>()?;
        Ok(Self { value, jacobians })
    }

    /// One independent variable per input, the partition inferred from the
    /// input lengths.
    ///
    /// # Example
    ///
    /// ```
    /// use adblock::AutoDiffBlock;
    ///
    /// let vars = AutoDiffBlock::variables(&[vec![1.0, 2.0], vec![3.0]]);
    /// assert_eq!(vars[1].partition().sizes(), &[2, 1]);
    /// assert!(vars[1].jacobian(0).is_empty());
    /// ```
    pub fn variables<V: AsRef<[f64]>>(values: &[V]) -> Vec<AutoDiffBlock> {
        let partition = BlockPartition::new(values.iter().map(|v| v.as_ref().len()));
        values
            .iter()
            .enumerate()
            .map(|(index, v)| {
                let v = v.as_ref();
                let jacobians = partition
                    .sizes()
                    .iter()
                    .enumerate()
                    .map(|(k, &n)| {
                        if k == index {
                            SparseMatrix::identity(n)
                        } else {
                            SparseMatrix::zero(v.len(), n)
                        }
                    })
                    .collect();
                Self {
                    value: v.into(),
                    jacobians,
                }
            })
            .collect()
    }

    /// Assemble from parts already known to be consistent.
    pub(crate) fn from_parts(value: DenseVector, jacobians: JacobianList) -> Self {
        debug_assert!(
            jacobians.iter().all(|j| j.nrows() == value.len() || j.is_shapeless()),
            "jacobian row counts must match value length {}",
            value.len()
        );
        Self { value, jacobians }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The value vector.
    #[inline]
    pub fn value(&self) -> &DenseVector {
        &self.value
    }

    /// The Jacobian blocks, one per independent variable block.
    #[inline]
    pub fn derivative(&self) -> &[SparseMatrix] {
        &self.jacobians
    }

    /// Jacobian block `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k >= num_blocks`.
    pub fn jacobian(&self, k: usize) -> &SparseMatrix {
        assert!(
            k < self.num_blocks(),
            "block {} out of range for {} blocks",
            k,
            self.num_blocks()
        );
        &self.jacobians[k]
    }

    /// Number of rows of the value.
    #[inline]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.jacobians.len()
    }

    /// Block partition recovered from the Jacobian column counts.
    pub fn partition(&self) -> BlockPartition {
        BlockPartition::new(self.jacobians.iter().map(SparseMatrix::ncols))
    }

    pub fn into_parts(self) -> (DenseVector, JacobianList) {
        (self.value, self.jacobians)
    }

    /// Same value, every Jacobian block empty.
    pub fn detach(&self) -> Self {
        let m = self.len();
        Self {
            value: self.value.clone(),
            jacobians: self
                .jacobians
                .iter()
                .map(|j| SparseMatrix::zero(m, j.ncols()))
                .collect(),
        }
    }

    /// Whether the value and every stored Jacobian entry are finite.
    pub fn is_finite(&self) -> bool {
        self.first_non_finite_row().is_none()
    }

    /// # Errors
    ///
    /// Returns `AdError::NonFinite` naming `op` and the first offending row.
    pub fn check_finite(&self, op: &'static str) -> Result<(), AdError> {
        match self.first_non_finite_row() {
            Some(row) => Err(AdError::NonFinite { op, row }),
            None => Ok(()),
        }
    }

    fn first_non_finite_row(&self) -> Option<usize> {
        if let Some(row) = self.value.first_non_finite() {
            return Some(row);
        }
        self.jacobians
            .iter()
            .filter_map(SparseMatrix::as_csc)
            .filter_map(|csc| {
                csc.values()
                    .iter()
                    .position(|v| !v.is_finite())
                    .map(|p| csc.row_idx()[p])
            })
            .min()
    }

    /// Apply the `check-finite` policy to a freshly computed result.
    #[inline]
    pub(crate) fn finish(self, op: &'static str) -> Result<Self, AdError> {
        #[cfg(feature = "check-finite")]
        self.check_finite(op)?;
        #[cfg(not(feature = "check-finite"))]
        let _ = op;
        Ok(self)
    }
}

/// Check the row count of a caller-supplied block, promoting a shape-less
/// empty block to `m x n`.
fn promote_rows(jac: SparseMatrix, m: usize, n: usize) -> Result<SparseMatrix, AdError> {
    if jac.is_shapeless() {
        return Ok(SparseMatrix::zero(m, n));
    }
    if jac.nrows() != m {
        return Err(AdError::RangeMismatch {
            op: "function",
            expected: m,
            actual: jac.nrows(),
        });
    }
    Ok(jac)
}

impl fmt::Display for AutoDiffBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "AutoDiffBlock (len {}, partition {})",
            self.len(),
            self.partition()
        )?;
        writeln!(f, "  value: {:?}", self.value.as_slice())?;
        for (k, jac) in self.jacobians.iter().enumerate() {
            let (r, c) = jac.shape();
            if jac.is_empty() {
                writeln!(f, "  J[{k}]: {r}x{c}, empty")?;
            } else {
                writeln!(f, "  J[{k}]: {r}x{c}, {} nnz", jac.nnz())?;
            }
        }
        Ok(())
    }
}
