//! Reductions that keep derivatives.

use crate::autodiff::AutoDiffBlock;
use crate::error::AdError;
use crate::sparse::SparseMatrix;

/// `1 x n` row of ones.
fn ones_row(n: usize) -> SparseMatrix {
    let triplets: Vec<(usize, usize, f64)> = (0..n).map(|j| (0, j, 1.0)).collect();
    SparseMatrix::from_triplets(1, n, &triplets).expect("ones_row: triplets in bounds")
}

/// Sum of all entries as a one-row AD value; `J[k]` is the column sums of
/// `x.J[k]`.
///
/// # Example
///
/// ```
/// use adblock::{AutoDiffBlock, BlockPartition};
/// use adblock::operations::sum;
///
/// let x = AutoDiffBlock::variable(0, [1.0, 2.0, 3.0], &BlockPartition::new([3])).unwrap();
/// let s = sum(&(&x * &x));
/// assert_eq!(s.value().as_slice(), &[14.0]);
/// assert_eq!(s.jacobian(0).get(0, 2), 6.0);
/// ```
pub fn sum(x: &AutoDiffBlock) -> AutoDiffBlock {
    x.try_left_mul(&ones_row(x.len()))
        .unwrap_or_else(|e| panic!("{e}"))
}

/// Inner product `sum(x * y)`.
///
/// # Errors
///
/// As [`AutoDiffBlock::try_mul`].
pub fn dot(x: &AutoDiffBlock, y: &AutoDiffBlock) -> Result<AutoDiffBlock, AdError> {
    let product = x.try_mul(y)?;
    product.try_left_mul(&ones_row(product.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::BlockPartition;

    #[test]
    fn test_sum_keeps_empty_blocks() {
        let p = BlockPartition::new([2, 4]);
        let x = AutoDiffBlock::variable(0, [1.0, 2.0], &p).unwrap();
        let s = sum(&x);
        assert_eq!(s.len(), 1);
        assert_eq!(s.value()[0], 3.0);
        assert_eq!(s.jacobian(0).get(0, 1), 1.0);
        assert!(s.jacobian(1).is_empty());
        assert_eq!(s.jacobian(1).shape(), (1, 4));
    }

    #[test]
    fn test_dot() {
        let vars = AutoDiffBlock::variables(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
        let d = dot(&vars[0], &vars[1]).unwrap();
        assert_eq!(d.value()[0], 11.0);
        assert_eq!(d.jacobian(0).get(0, 0), 3.0);
        assert_eq!(d.jacobian(1).get(0, 1), 2.0);
    }

    #[test]
    fn test_sum_of_empty_value() {
        let x = AutoDiffBlock::constant_without_partition(Vec::<f64>::new());
        let s = sum(&x);
        assert_eq!(s.value().as_slice(), &[0.0]);
    }
}
