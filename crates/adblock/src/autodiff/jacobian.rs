//! Block-wise combination of Jacobian lists.

use smallvec::SmallVec;

use super::value::AutoDiffBlock;
use crate::error::AdError;
use crate::partition::BlockPartition;
use crate::sparse::SparseMatrix;

/// Jacobian blocks of one AD value, one entry per variable block.
pub type JacobianList = SmallVec<[SparseMatrix; 4]>;

/// Partition shared by two operands.
///
/// A value without blocks adopts the partition of the other.
pub(crate) fn common_partition(
    x: &AutoDiffBlock,
    y: &AutoDiffBlock,
) -> Result<BlockPartition, AdError> {
    match (x.num_blocks(), y.num_blocks()) {
        (0, _) => Ok(y.partition()),
        (_, 0) => Ok(x.partition()),
        _ => {
            let px = x.partition();
            px.check_compatible(&y.partition())?;
            Ok(px)
        }
    }
}

/// Block `k` of `x`, or the empty block of nominal shape `len x n_k` when
/// `x` carries no blocks.
fn block_or_zero<'a>(
    x: &'a AutoDiffBlock,
    partition: &BlockPartition,
    k: usize,
    zero: &'a mut Option<SparseMatrix>,
) -> &'a SparseMatrix {
    if x.num_blocks() == 0 {
        zero.insert(SparseMatrix::zero(x.len(), partition.block_size(k)))
    } else {
        &x.derivative()[k]
    }
}

/// Combine the Jacobian lists of two operands block by block.
pub(crate) fn zip_blocks(
    x: &AutoDiffBlock,
    y: &AutoDiffBlock,
    f: impl Fn(&SparseMatrix, &SparseMatrix) -> Result<SparseMatrix, AdError>,
) -> Result<JacobianList, AdError> {
    let partition = common_partition(x, y)?;
    (0..partition.num_blocks())
        .map(|k| {
            let (mut zx, mut zy) = (None, None);
            let jx = block_or_zero(x, &partition, k, &mut zx);
            let jy = block_or_zero(y, &partition, k, &mut zy);
            f(jx, jy)
        })
        .collect()
}

/// Apply `f` to every Jacobian block of `x`.
pub(crate) fn map_blocks(
    x: &AutoDiffBlock,
    f: impl Fn(&SparseMatrix) -> Result<SparseMatrix, AdError>,
) -> Result<JacobianList, AdError> {
    x.derivative().iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_partition_adopts() {
        let p = BlockPartition::new([2, 1]);
        let x = AutoDiffBlock::variable(0, [1.0, 2.0], &p).unwrap();
        let c = AutoDiffBlock::constant_without_partition([1.0, 1.0]);
        assert_eq!(common_partition(&x, &c).unwrap(), p);
        assert_eq!(common_partition(&c, &x).unwrap(), p);
    }

    #[test]
    fn test_common_partition_mismatch() {
        let x = AutoDiffBlock::variable(0, [1.0], &BlockPartition::new([1, 2])).unwrap();
        let y = AutoDiffBlock::variable(0, [1.0], &BlockPartition::new([1, 3])).unwrap();
        assert!(matches!(
            common_partition(&x, &y),
            Err(AdError::PartitionMismatch { .. })
        ));
    }

    #[test]
    fn test_zip_blocks_substitutes_empty() {
        let p = BlockPartition::new([2, 1]);
        let x = AutoDiffBlock::variable(0, [1.0, 2.0], &p).unwrap();
        let c = AutoDiffBlock::constant_without_partition([1.0, 1.0]);
        let blocks = zip_blocks(&c, &x, |a, b| {
            assert!(a.is_empty());
            assert_eq!(a.shape(), b.shape());
            a.try_add(b)
        })
        .unwrap();
        assert_eq!(blocks[0], SparseMatrix::identity(2));
        assert!(blocks[1].is_empty());
    }
}
