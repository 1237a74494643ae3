//! Conversion between adblock types and faer matrices.
//!
//! Dense vectors are viewed zero-copy as `n x 1` column-major faer
//! matrices. Sparse matrices are rendered densely for inspection, or
//! converted to `faer::sparse::SparseColMat` for faer's sparse solvers.

use faer::sparse::{SparseColMat, Triplet};
use faer::{Mat, MatRef};

use crate::error::AdError;
use crate::sparse::{CscMatrix, SparseMatrix};
use crate::vector::DenseVector;

/// Zero-copy view of a value vector as a faer column.
pub trait AsFaerCol {
    /// View as an `n x 1` matrix.
    ///
    /// # Example
    ///
    /// ```
    /// use adblock::DenseVector;
    /// use adblock::backend::AsFaerCol;
    ///
    /// let v = DenseVector::from([1.0, 2.0, 3.0]);
    /// let col = v.as_faer_col();
    /// assert_eq!(col.nrows(), 3);
    /// assert_eq!(col[(2, 0)], 3.0);
    /// ```
    fn as_faer_col(&self) -> MatRef<'_, f64>;
}

impl AsFaerCol for DenseVector {
    fn as_faer_col(&self) -> MatRef<'_, f64> {
        MatRef::from_column_major_slice(self.as_slice(), self.len(), 1)
    }
}

/// Copy the first column of a faer matrix into a value vector.
pub fn vector_from_faer(mat: MatRef<'_, f64>) -> DenseVector {
    if mat.ncols() == 0 {
        return DenseVector::zeros(mat.nrows());
    }
    (0..mat.nrows()).map(|i| mat[(i, 0)]).collect()
}

/// Dense rendering; `Empty` becomes a zero matrix of its nominal shape.
///
/// # Example
///
/// ```
/// use adblock::backend::to_dense;
/// use adblock::sparse::SparseMatrix;
///
/// let m = to_dense(&SparseMatrix::diagonal(&[1.0, 2.0]));
/// assert_eq!(m[(1, 1)], 2.0);
/// assert_eq!(m[(0, 1)], 0.0);
/// ```
pub fn to_dense(m: &SparseMatrix) -> Mat<f64> {
    let mut dense = Mat::zeros(m.nrows(), m.ncols());
    if let Some(csc) = m.as_csc() {
        for j in 0..csc.ncols() {
            let (rows, vals) = csc.column(j);
            for (&i, &v) in rows.iter().zip(vals) {
                dense[(i, j)] = v;
            }
        }
    }
    dense
}

/// Compress a dense faer matrix, dropping exact zeros. An all-zero input
/// gives the empty sentinel of the same shape.
pub fn from_dense(mat: MatRef<'_, f64>) -> SparseMatrix {
    let mut triplets = Vec::new();
    for j in 0..mat.ncols() {
        for i in 0..mat.nrows() {
            let v = mat[(i, j)];
            if v != 0.0 {
                triplets.push((i, j, v));
            }
        }
    }
    if triplets.is_empty() {
        return SparseMatrix::zero(mat.nrows(), mat.ncols());
    }
    SparseMatrix::from_triplets(mat.nrows(), mat.ncols(), &triplets)
        .expect("from_dense: entries lie inside the matrix")
}

/// Convert to faer's sparse column matrix, e.g. for `sp_lu`.
///
/// # Errors
///
/// Returns `AdError::InvalidStorage` if faer rejects the matrix.
pub fn to_faer_sparse(m: &CscMatrix) -> Result<SparseColMat<usize, f64>, AdError> {
    let mut triplets = Vec::with_capacity(m.nnz());
    for j in 0..m.ncols() {
        let (rows, vals) = m.column(j);
        for (&i, &v) in rows.iter().zip(vals) {
            triplets.push(Triplet::new(i, j, v));
        }
    }
    SparseColMat::<usize, f64>::try_new_from_triplets(m.nrows(), m.ncols(), &triplets).map_err(
        |e| AdError::InvalidStorage {
            message: format!("faer rejected matrix: {e:?}"),
        },
    )
}
