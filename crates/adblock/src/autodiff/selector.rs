//! Comparison-driven selection.
//!
//! A [`Selector`] evaluates a [`Criterion`] once on a vector and then picks
//! rows from two AD values. [`UpwindSelector`] picks, for every face of a
//! grid, the cell on the upstream side of the face flux.

use super::value::AutoDiffBlock;
use crate::error::AdError;
use crate::sparse::SparseMatrix;
use crate::vector::DenseVector;

/// Test applied to every entry of the vector a [`Selector`] is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// `v > 0`
    GreaterZero,
    /// `v >= 0`
    GreaterEqualZero,
    /// `v == 0`
    Zero,
    /// `!v.is_nan()`
    NotNaN,
}

impl Criterion {
    #[inline]
    fn holds(self, v: f64) -> bool {
        match self {
            Criterion::GreaterZero => v > 0.0,
            Criterion::GreaterEqualZero => v >= 0.0,
            Criterion::Zero => v == 0.0,
            Criterion::NotNaN => !v.is_nan(),
        }
    }
}

/// Row mask computed from a criterion.
///
/// # Example
///
/// ```
/// use adblock::{AutoDiffBlock, Criterion, Selector};
///
/// let vars = AutoDiffBlock::variables(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
/// let sel = Selector::new(&[-1.0, 1.0], Criterion::GreaterZero);
/// let s = sel.select(&vars[0], &vars[1]).unwrap();
/// assert_eq!(s.value().as_slice(), &[3.0, 2.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    mask: Vec<bool>,
}

impl Selector {
    pub fn new(values: &[f64], criterion: Criterion) -> Self {
        Self {
            mask: values.iter().map(|&v| criterion.holds(v)).collect(),
        }
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Rows where the criterion holds come from `if_true`.
    ///
    /// # Errors
    ///
    /// As [`AutoDiffBlock::select`].
    pub fn select(
        &self,
        if_true: &AutoDiffBlock,
        if_false: &AutoDiffBlock,
    ) -> Result<AutoDiffBlock, AdError> {
        AutoDiffBlock::select(&self.mask, if_true, if_false)
    }

    /// Value-only counterpart of [`select`](Self::select).
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` for mismatched lengths.
    pub fn select_values(
        &self,
        if_true: &DenseVector,
        if_false: &DenseVector,
    ) -> Result<DenseVector, AdError> {
        for v in [if_true, if_false] {
            if v.len() != self.mask.len() {
                return Err(AdError::RangeMismatch {
                    op: "select_values",
                    expected: self.mask.len(),
                    actual: v.len(),
                });
            }
        }
        Ok(self
            .mask
            .iter()
            .zip(if_true.iter().zip(if_false))
            .map(|(&m, (&a, &b))| if m { a } else { b })
            .collect())
    }
}

impl AutoDiffBlock {
    /// Rowwise maximum; ties take `self`.
    ///
    /// # Errors
    ///
    /// As [`AutoDiffBlock::select`].
    pub fn try_max(&self, other: &AutoDiffBlock) -> Result<AutoDiffBlock, AdError> {
        let diff = self.value().try_zip_map("max", other.value(), |a, b| a - b)?;
        Selector::new(diff.as_slice(), Criterion::GreaterEqualZero).select(self, other)
    }

    /// Rowwise minimum; ties take `self`.
    ///
    /// # Errors
    ///
    /// As [`AutoDiffBlock::select`].
    pub fn try_min(&self, other: &AutoDiffBlock) -> Result<AutoDiffBlock, AdError> {
        let diff = self.value().try_zip_map("min", other.value(), |a, b| b - a)?;
        Selector::new(diff.as_slice(), Criterion::GreaterEqualZero).select(self, other)
    }
}

/// Face-by-cell upwind selection matrix.
///
/// Face `f` joins cells `(c0, c1)`; a non-negative flux runs from `c0` to
/// `c1`, so the upstream cell is `c0`, otherwise `c1`.
///
/// # Example
///
/// ```
/// use adblock::{AutoDiffBlock, BlockPartition, UpwindSelector};
///
/// // Three cells in a row, two faces.
/// let up = UpwindSelector::new(3, &[(0, 1), (1, 2)], &[1.0, -1.0]).unwrap();
/// let p = AutoDiffBlock::variable(0, [10.0, 20.0, 30.0], &BlockPartition::new([3])).unwrap();
/// let face = up.select(&p).unwrap();
/// assert_eq!(face.value().as_slice(), &[10.0, 30.0]);
/// assert_eq!(face.jacobian(0).get(1, 2), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UpwindSelector {
    matrix: SparseMatrix,
}

impl UpwindSelector {
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` if `neighbours` and `face_flux`
    /// differ in length, `AdError::IndexOutOfBounds` for a cell
    /// `>= num_cells`, and `AdError::NonFinite` for a NaN flux, whose
    /// direction is undefined.
    pub fn new(
        num_cells: usize,
        neighbours: &[(usize, usize)],
        face_flux: &[f64],
    ) -> Result<Self, AdError> {
        if neighbours.len() != face_flux.len() {
            return Err(AdError::RangeMismatch {
                op: "upwind",
                expected: neighbours.len(),
                actual: face_flux.len(),
            });
        }
        let triplets = neighbours
            .iter()
            .zip(face_flux)
            .enumerate()
            .map(|(face, (&(c0, c1), &flux))| {
                if flux.is_nan() {
                    return Err(AdError::NonFinite {
                        op: "upwind",
                        row: face,
                    });
                }
                let upwind = if flux >= 0.0 { c0 } else { c1 };
                Ok((face, upwind, 1.0))
            })
            .collect::<Result<Vec<_>, AdError>>()?;
        let matrix = SparseMatrix::from_triplets(neighbours.len(), num_cells, &triplets)?;
        Ok(Self { matrix })
    }

    /// The `num_faces x num_cells` selection matrix.
    pub fn matrix(&self) -> &SparseMatrix {
        &self.matrix
    }

    /// Upstream cell value for every face.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` if `x` is not a cell quantity.
    pub fn select(&self, x: &AutoDiffBlock) -> Result<AutoDiffBlock, AdError> {
        x.try_left_mul(&self.matrix)
    }

    /// # Errors
    ///
    /// As [`select`](Self::select).
    pub fn select_values(&self, x: &DenseVector) -> Result<DenseVector, AdError> {
        Ok(self.matrix.try_mul_vec(x.as_slice())?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria() {
        let v = [-1.0, 0.0, 2.0, f64::NAN];
        assert_eq!(
            Selector::new(&v, Criterion::GreaterZero).mask(),
            &[false, false, true, false]
        );
        assert_eq!(
            Selector::new(&v, Criterion::GreaterEqualZero).mask(),
            &[false, true, true, false]
        );
        assert_eq!(
            Selector::new(&v, Criterion::Zero).mask(),
            &[false, true, false, false]
        );
        assert_eq!(
            Selector::new(&v, Criterion::NotNaN).mask(),
            &[true, true, true, false]
        );
    }

    #[test]
    fn test_select_values() {
        let sel = Selector::new(&[1.0, -1.0], Criterion::GreaterZero);
        let out = sel
            .select_values(&DenseVector::from([1.0, 2.0]), &DenseVector::from([3.0, 4.0]))
            .unwrap();
        assert_eq!(out.as_slice(), &[1.0, 4.0]);
        assert!(sel
            .select_values(&DenseVector::from([1.0]), &DenseVector::from([3.0, 4.0]))
            .is_err());
    }

    #[test]
    fn test_max_min() {
        let vars = AutoDiffBlock::variables(&[vec![1.0, 5.0], vec![3.0, 2.0]]);
        let hi = vars[0].try_max(&vars[1]).unwrap();
        assert_eq!(hi.value().as_slice(), &[3.0, 5.0]);
        assert_eq!(hi.jacobian(0).get(1, 1), 1.0);
        assert_eq!(hi.jacobian(1).get(0, 0), 1.0);

        let lo = vars[0].try_min(&vars[1]).unwrap();
        assert_eq!(lo.value().as_slice(), &[1.0, 2.0]);
        assert_eq!(lo.jacobian(0).get(0, 0), 1.0);
        assert_eq!(lo.jacobian(1).get(1, 1), 1.0);
    }

    #[test]
    fn test_upwind_matrix() {
        let up = UpwindSelector::new(3, &[(0, 1), (1, 2)], &[-2.0, 0.0]).unwrap();
        let m = up.matrix();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.get(0, 1), 1.0);
        assert_eq!(m.get(1, 1), 1.0);
        assert_eq!(m.nnz(), 2);
        let v = up.select_values(&DenseVector::from([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(v.as_slice(), &[2.0, 2.0]);
    }

    #[test]
    fn test_upwind_errors() {
        assert!(UpwindSelector::new(2, &[(0, 1)], &[]).is_err());
        assert_eq!(
            UpwindSelector::new(2, &[(0, 5)], &[-1.0]),
            Err(AdError::IndexOutOfBounds { index: 5, size: 2 })
        );
    }

    #[test]
    fn test_upwind_rejects_nan_flux() {
        assert_eq!(
            UpwindSelector::new(3, &[(0, 1), (1, 2)], &[1.0, f64::NAN]),
            Err(AdError::NonFinite { op: "upwind", row: 1 })
        );
        let up = UpwindSelector::new(2, &[(0, 1)], &[f64::NEG_INFINITY]).unwrap();
        assert_eq!(up.matrix().get(0, 1), 1.0);
    }
}
