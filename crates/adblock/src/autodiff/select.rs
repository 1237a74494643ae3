//! Row selection, subsetting and concatenation of AD values.
//!
//! Each operation moves whole Jacobian rows together with the value entries
//! and keeps a block empty when it is empty in every input.

use super::jacobian::{JacobianList, map_blocks, zip_blocks};
use super::value::AutoDiffBlock;
use crate::error::AdError;
use crate::partition::BlockPartition;
use crate::sparse::SparseMatrix;
use crate::vector::DenseVector;

impl AutoDiffBlock {
    /// Row-wise choice: row `i` comes from `if_true` where `mask[i]` holds,
    /// from `if_false` otherwise. Derivative rows are taken from the chosen
    /// operand, never blended.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` unless `mask` and both operands have
    /// the same length, and `AdError::PartitionMismatch` for incompatible
    /// partitions.
    ///
    /// # Example
    ///
    /// ```
    /// use adblock::AutoDiffBlock;
    ///
    /// let vars = AutoDiffBlock::variables(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
    /// let s = AutoDiffBlock::select(&[true, false], &vars[0], &vars[1]).unwrap();
    /// assert_eq!(s.value().as_slice(), &[1.0, 4.0]);
    /// assert_eq!(s.jacobian(0).get(0, 0), 1.0);
    /// assert_eq!(s.jacobian(1).get(1, 1), 1.0);
    /// assert_eq!(s.jacobian(1).get(0, 0), 0.0);
    /// ```
    pub fn select(
        mask: &[bool],
        if_true: &AutoDiffBlock,
        if_false: &AutoDiffBlock,
    ) -> Result<AutoDiffBlock, AdError> {
        for operand in [if_true, if_false] {
            if operand.len() != mask.len() {
                return Err(AdError::RangeMismatch {
                    op: "select",
                    expected: mask.len(),
                    actual: operand.len(),
                });
            }
        }
        let jacobians = zip_blocks(if_true, if_false, |a, b| a.try_select_rows(mask, b))?;
        let value: DenseVector = mask
            .iter()
            .zip(if_true.value().iter().zip(if_false.value()))
            .map(|(&m, (&a, &b))| if m { a } else { b })
            .collect();
        Ok(AutoDiffBlock::from_parts(value, jacobians))
    }

    /// Row gather: row `r` of the result is row `indices[r]` of `self`.
    /// Indices may repeat.
    ///
    /// # Errors
    ///
    /// Returns `AdError::IndexOutOfBounds` for an index `>= len`.
    pub fn subset(&self, indices: &[usize]) -> Result<AutoDiffBlock, AdError> {
        let value = self.value().try_gather(indices)?;
        let jacobians = map_blocks(self, |j| j.try_gather_rows(indices))?;
        Ok(AutoDiffBlock::from_parts(value, jacobians))
    }

    /// Row scatter into a value of length `full_size`: row `r` of `self`
    /// lands on row `indices[r]`; other rows are zero with zero derivative.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` if `indices.len() != len` and
    /// `AdError::IndexOutOfBounds` for a target `>= full_size`.
    pub fn superset(&self, indices: &[usize], full_size: usize) -> Result<AutoDiffBlock, AdError> {
        let value = self.value().try_scatter(indices, full_size)?;
        let jacobians = map_blocks(self, |j| j.try_scatter_rows(indices, full_size))?;
        Ok(AutoDiffBlock::from_parts(value, jacobians))
    }

    /// Stack values and Jacobians vertically, block by block. Parts without
    /// a partition adopt the common one.
    ///
    /// # Errors
    ///
    /// Returns `AdError::EmptyInput` for no parts and
    /// `AdError::PartitionMismatch` for incompatible partitions.
    pub fn vertcat(parts: &[AutoDiffBlock]) -> Result<AutoDiffBlock, AdError> {
        let first = parts.first().ok_or(AdError::EmptyInput { op: "vertcat" })?;
        let mut partition = first.partition();
        for part in &parts[1..] {
            if partition.num_blocks() == 0 {
                partition = part.partition();
            } else if part.num_blocks() > 0 {
                partition.check_compatible(&part.partition())?;
            }
        }
        let value: DenseVector = parts
            .iter()
            .flat_map(|p| p.value().iter().copied())
            .collect();
        let jacobians = (0..partition.num_blocks())
            .map(|k| {
                let column: Vec<SparseMatrix> =
                    parts.iter().map(|p| block_in(p, &partition, k)).collect();
                SparseMatrix::vstack(&column)
            })
            .collect::<Result<JacobianList, _>>()?;
        Ok(AutoDiffBlock::from_parts(value, jacobians))
    }
}

fn block_in(x: &AutoDiffBlock, partition: &BlockPartition, k: usize) -> SparseMatrix {
    if x.num_blocks() == 0 {
        SparseMatrix::zero(x.len(), partition.block_size(k))
    } else {
        x.derivative()[k].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Vec<AutoDiffBlock> {
        AutoDiffBlock::variables(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]])
    }

    #[test]
    fn test_select_takes_rows_from_chosen_operand() {
        let v = vars();
        let s = AutoDiffBlock::select(&[false, true, false], &v[0], &v[1]).unwrap();
        assert_eq!(s.value().as_slice(), &[4.0, 2.0, 6.0]);
        assert_eq!(s.jacobian(0).get(1, 1), 1.0);
        assert_eq!(s.jacobian(0).get(0, 0), 0.0);
        assert_eq!(s.jacobian(1).get(0, 0), 1.0);
        assert_eq!(s.jacobian(1).get(1, 1), 0.0);
    }

    #[test]
    fn test_select_same_operand_is_identity() {
        let v = vars();
        let s = AutoDiffBlock::select(&[true, false, true], &v[0], &v[0]).unwrap();
        assert_eq!(s, v[0]);
    }

    #[test]
    fn test_select_length_checks() {
        let v = vars();
        assert!(AutoDiffBlock::select(&[true], &v[0], &v[1]).is_err());
        let short = AutoDiffBlock::constant_without_partition([1.0]);
        assert!(AutoDiffBlock::select(&[true, true, true], &v[0], &short).is_err());
    }

    #[test]
    fn test_subset_superset_round_trip() {
        let v = vars();
        let big = v[0].superset(&[4, 0, 2], 5).unwrap();
        assert_eq!(big.value().as_slice(), &[2.0, 0.0, 3.0, 0.0, 1.0]);
        assert_eq!(big.jacobian(0).get(4, 0), 1.0);
        assert!(big.jacobian(1).is_empty());
        assert_eq!(big.jacobian(1).shape(), (5, 3));

        let back = big.subset(&[4, 0, 2]).unwrap();
        assert_eq!(back, v[0]);
    }

    #[test]
    fn test_subset_out_of_bounds() {
        let v = vars();
        assert_eq!(
            v[0].subset(&[3]),
            Err(AdError::IndexOutOfBounds { index: 3, size: 3 })
        );
    }

    #[test]
    fn test_vertcat() {
        let v = vars();
        let c = AutoDiffBlock::constant_without_partition([9.0]);
        let z = AutoDiffBlock::vertcat(&[v[0].clone(), c, v[1].clone()]).unwrap();
        assert_eq!(z.len(), 7);
        assert_eq!(z.value()[3], 9.0);
        assert_eq!(z.jacobian(0).shape(), (7, 3));
        assert_eq!(z.jacobian(0).get(2, 2), 1.0);
        assert_eq!(z.jacobian(0).get(4, 0), 0.0);
        assert_eq!(z.jacobian(1).get(4, 0), 1.0);
    }

    #[test]
    fn test_vertcat_of_constants_stays_empty() {
        let p = BlockPartition::new([2]);
        let a = AutoDiffBlock::constant([1.0], &p);
        let b = AutoDiffBlock::constant([2.0, 3.0], &p);
        let z = AutoDiffBlock::vertcat(&[a, b]).unwrap();
        assert!(z.jacobian(0).is_empty());
        assert_eq!(z.jacobian(0).shape(), (3, 2));
    }

    #[test]
    fn test_vertcat_errors() {
        assert_eq!(
            AutoDiffBlock::vertcat(&[]),
            Err(AdError::EmptyInput { op: "vertcat" })
        );
        let a = AutoDiffBlock::constant([1.0], &BlockPartition::new([2]));
        let b = AutoDiffBlock::constant([1.0], &BlockPartition::new([3]));
        assert!(AutoDiffBlock::vertcat(&[a, b]).is_err());
    }
}
