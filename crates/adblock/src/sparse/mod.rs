//! Sparse matrix primitive.
//!
//! ```text
//! SparseMatrix
//! ├── Empty { nrows, ncols }  - structural zero, no storage
//! └── Compressed(CscMatrix)   - column-major compressed storage
//! ```
//!
//! `Empty` is the representation of "no dependence" in a Jacobian block. It
//! is semantically the zero matrix of its nominal shape, and every operation
//! dispatches on it explicitly so that unused variable blocks cost nothing:
//! a result whose contributing operands are all empty is itself empty.
//!
//! An `Empty` of shape `0 x 0` is the shape-less sentinel. It adopts the
//! shape of the other operand wherever that shape is determined by it.
//!
//! # Example
//!
//! ```
//! use adblock::sparse::SparseMatrix;
//!
//! let i = SparseMatrix::identity(3);
//! let z = SparseMatrix::zero(3, 3);
//! assert!(z.is_empty());
//!
//! let sum = &i + &z;
//! assert_eq!(sum, i);
//!
//! let prod = &i * &z;
//! assert!(prod.is_empty());
//! assert_eq!(prod.shape(), (3, 3));
//! ```

mod csc;
mod ops;

pub use csc::CscMatrix;

use crate::error::AdError;

/// Sparse `f64` matrix with a first-class empty state.
#[derive(Debug, Clone, PartialEq)]
pub enum SparseMatrix {
    /// Structural zero of nominal shape `nrows x ncols`, no storage.
    Empty { nrows: usize, ncols: usize },
    /// Compressed sparse column storage.
    Compressed(CscMatrix),
}

impl Default for SparseMatrix {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<CscMatrix> for SparseMatrix {
    fn from(csc: CscMatrix) -> Self {
        SparseMatrix::Compressed(csc)
    }
}

impl SparseMatrix {
    /// The empty sentinel with a recorded nominal shape.
    pub const fn zero(nrows: usize, ncols: usize) -> Self {
        SparseMatrix::Empty { nrows, ncols }
    }

    /// The shape-less empty sentinel (`0 x 0`).
    pub const fn empty() -> Self {
        SparseMatrix::Empty { nrows: 0, ncols: 0 }
    }

    /// `n x n` identity.
    pub fn identity(n: usize) -> Self {
        CscMatrix::identity(n).into()
    }

    /// Square matrix with `diag` on the diagonal; zeros are stored explicitly.
    pub fn diagonal(diag: &[f64]) -> Self {
        CscMatrix::diagonal(diag).into()
    }

    /// Build from `(row, col, value)` triplets, summing duplicates.
    ///
    /// # Errors
    ///
    /// Returns `AdError::IndexOutOfBounds` for a triplet outside the shape.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, f64)],
    ) -> Result<Self, AdError> {
        Ok(CscMatrix::from_triplets(nrows, ncols, triplets)?.into())
    }

    /// Build from raw CSC arrays.
    ///
    /// # Errors
    ///
    /// Returns `AdError::InvalidStorage` if the arrays are malformed.
    pub fn from_raw_parts(
        nrows: usize,
        ncols: usize,
        col_ptr: Vec<usize>,
        row_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self, AdError> {
        Ok(CscMatrix::try_new(nrows, ncols, col_ptr, row_idx, values)?.into())
    }

    /// Number of rows (nominal for `Empty`).
    #[inline]
    pub fn nrows(&self) -> usize {
        match self {
            SparseMatrix::Empty { nrows, .. } => *nrows,
            SparseMatrix::Compressed(csc) => csc.nrows(),
        }
    }

    /// Number of columns (nominal for `Empty`).
    #[inline]
    pub fn ncols(&self) -> usize {
        match self {
            SparseMatrix::Empty { ncols, .. } => *ncols,
            SparseMatrix::Compressed(csc) => csc.ncols(),
        }
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    /// Number of stored entries; zero for `Empty`.
    #[inline]
    pub fn nnz(&self) -> usize {
        match self {
            SparseMatrix::Empty { .. } => 0,
            SparseMatrix::Compressed(csc) => csc.nnz(),
        }
    }

    /// Whether this is the empty sentinel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, SparseMatrix::Empty { .. })
    }

    /// Whether this is the `0 x 0` sentinel that adopts other shapes.
    #[inline]
    pub fn is_shapeless(&self) -> bool {
        matches!(self, SparseMatrix::Empty { nrows: 0, ncols: 0 })
    }

    /// Borrow the compressed storage, if any.
    pub fn as_csc(&self) -> Option<&CscMatrix> {
        match self {
            SparseMatrix::Empty { .. } => None,
            SparseMatrix::Compressed(csc) => Some(csc),
        }
    }

    /// Entry `(i, j)`; zero if not stored.
    ///
    /// # Panics
    ///
    /// Panics if `(i, j)` lies outside the shape.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(
            i < self.nrows() && j < self.ncols(),
            "entry ({}, {}) out of bounds for {}x{} matrix",
            i,
            j,
            self.nrows(),
            self.ncols()
        );
        match self {
            SparseMatrix::Empty { .. } => 0.0,
            SparseMatrix::Compressed(csc) => csc.get(i, j),
        }
    }

    /// Compressed storage, materialising `Empty` as explicit zero columns.
    pub fn to_compressed(&self) -> CscMatrix {
        match self {
            SparseMatrix::Empty { nrows, ncols } => CscMatrix::zeros(*nrows, *ncols),
            SparseMatrix::Compressed(csc) => csc.clone(),
        }
    }

    /// Raw `(nrows, ncols, col_ptr, row_idx, values)`; `Empty` becomes a
    /// matrix with no entries.
    pub fn into_raw_parts(self) -> (usize, usize, Vec<usize>, Vec<usize>, Vec<f64>) {
        let csc = match self {
            SparseMatrix::Empty { nrows, ncols } => CscMatrix::zeros(nrows, ncols),
            SparseMatrix::Compressed(csc) => csc,
        };
        let (nrows, ncols) = csc.shape();
        let (col_ptr, row_idx, values) = csc.into_raw_parts();
        (nrows, ncols, col_ptr, row_idx, values)
    }

    /// Shape compatibility for elementwise combination.
    pub(crate) fn check_same_shape(&self, op: &'static str, rhs: &Self) -> Result<(), AdError> {
        if self.is_shapeless() || rhs.is_shapeless() || self.shape() == rhs.shape() {
            Ok(())
        } else {
            Err(AdError::MatrixShapeMismatch {
                op,
                left: self.shape(),
                right: rhs.shape(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_records_shape() {
        let z = SparseMatrix::zero(4, 2);
        assert!(z.is_empty());
        assert!(!z.is_shapeless());
        assert_eq!(z.shape(), (4, 2));
        assert_eq!(z.nnz(), 0);
        assert_eq!(z.get(3, 1), 0.0);
    }

    #[test]
    fn test_default_is_shapeless() {
        let e = SparseMatrix::default();
        assert!(e.is_shapeless());
        assert_eq!(e, SparseMatrix::empty());
    }

    #[test]
    fn test_identity_and_diagonal() {
        let i = SparseMatrix::identity(3);
        assert_eq!(i.nnz(), 3);
        assert_eq!(i.get(1, 1), 1.0);
        assert_eq!(i.get(0, 1), 0.0);

        let d = SparseMatrix::diagonal(&[2.0, 0.0]);
        assert_eq!(d.nnz(), 2);
        assert_eq!(d.get(0, 0), 2.0);
    }

    #[test]
    fn test_empty_is_not_structural_zero() {
        let structural = SparseMatrix::from(CscMatrix::zeros(2, 2));
        assert!(!structural.is_empty());
        assert_ne!(structural, SparseMatrix::zero(2, 2));
    }

    #[test]
    fn test_to_compressed_materialises_empty() {
        let csc = SparseMatrix::zero(3, 2).to_compressed();
        assert_eq!(csc.shape(), (3, 2));
        assert_eq!(csc.nnz(), 0);
        assert_eq!(csc.col_ptr(), &[0, 0, 0]);
    }

    #[test]
    fn test_into_raw_parts_round_trip() {
        let m = SparseMatrix::from_triplets(2, 3, &[(0, 0, 1.0), (1, 2, 5.0)]).unwrap();
        let (nrows, ncols, col_ptr, row_idx, values) = m.clone().into_raw_parts();
        assert_eq!((nrows, ncols), (2, 3));
        assert_eq!(col_ptr, vec![0, 1, 1, 2]);
        let rebuilt = SparseMatrix::from_raw_parts(nrows, ncols, col_ptr, row_idx, values).unwrap();
        assert_eq!(rebuilt, m);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_out_of_bounds() {
        let _ = SparseMatrix::zero(2, 2).get(2, 0);
    }
}
