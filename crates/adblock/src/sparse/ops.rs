//! Arithmetic and row operations on `SparseMatrix`.
//!
//! Each operation dispatches on the `Empty` variant before touching storage.
//! The `try_*` forms report shape errors; the `std::ops` operators panic on
//! them.

use std::ops::{Add, Mul, Neg, Sub};

use super::{CscMatrix, SparseMatrix};
use crate::error::AdError;

impl SparseMatrix {
    /// Matrix product `self * rhs`.
    ///
    /// An empty operand yields an empty result of shape
    /// `self.nrows() x rhs.ncols()`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::MatrixShapeMismatch` if the inner dimensions differ
    /// (shape-less operands excepted).
    pub fn try_mul(&self, rhs: &SparseMatrix) -> Result<SparseMatrix, AdError> {
        if !self.is_shapeless() && !rhs.is_shapeless() && self.ncols() != rhs.nrows() {
            return Err(AdError::MatrixShapeMismatch {
                op: "mul",
                left: self.shape(),
                right: rhs.shape(),
            });
        }
        Ok(match (self, rhs) {
            (SparseMatrix::Compressed(a), SparseMatrix::Compressed(b)) => a.matmul(b).into(),
            _ => SparseMatrix::zero(self.nrows(), rhs.ncols()),
        })
    }

    /// Sum `self + rhs`; `Empty + X = X`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::MatrixShapeMismatch` if the shapes differ.
    pub fn try_add(&self, rhs: &SparseMatrix) -> Result<SparseMatrix, AdError> {
        self.check_same_shape("add", rhs)?;
        Ok(match (self, rhs) {
            (SparseMatrix::Empty { .. }, SparseMatrix::Empty { .. }) => {
                Self::shaped_empty(self, rhs)
            }
            (SparseMatrix::Empty { .. }, _) => rhs.clone(),
            (_, SparseMatrix::Empty { .. }) => self.clone(),
            (SparseMatrix::Compressed(a), SparseMatrix::Compressed(b)) => {
                a.add_scaled(1.0, b, 1.0).into()
            }
        })
    }

    /// Difference `self - rhs`; `X - Empty = X`, `Empty - X = -X`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::MatrixShapeMismatch` if the shapes differ.
    pub fn try_sub(&self, rhs: &SparseMatrix) -> Result<SparseMatrix, AdError> {
        self.check_same_shape("sub", rhs)?;
        Ok(match (self, rhs) {
            (SparseMatrix::Empty { .. }, SparseMatrix::Empty { .. }) => {
                Self::shaped_empty(self, rhs)
            }
            (SparseMatrix::Empty { .. }, _) => -rhs,
            (_, SparseMatrix::Empty { .. }) => self.clone(),
            (SparseMatrix::Compressed(a), SparseMatrix::Compressed(b)) => {
                a.add_scaled(1.0, b, -1.0).into()
            }
        })
    }

    fn shaped_empty(a: &SparseMatrix, b: &SparseMatrix) -> SparseMatrix {
        if a.is_shapeless() { b.clone() } else { a.clone() }
    }

    /// Multiply every entry by `alpha`. The pattern is kept even for
    /// `alpha == 0`.
    pub fn scale(&self, alpha: f64) -> SparseMatrix {
        match self {
            SparseMatrix::Empty { .. } => self.clone(),
            SparseMatrix::Compressed(csc) => csc.map_values(|_, v| alpha * v).into(),
        }
    }

    /// Row scaling `diag(d) * self`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` if `d.len() != nrows`.
    pub fn try_scale_rows(&self, d: &[f64]) -> Result<SparseMatrix, AdError> {
        match self {
            SparseMatrix::Empty { .. } if self.is_shapeless() => Ok(self.clone()),
            _ if d.len() != self.nrows() => Err(AdError::RangeMismatch {
                op: "scale_rows",
                expected: self.nrows(),
                actual: d.len(),
            }),
            SparseMatrix::Empty { .. } => Ok(self.clone()),
            SparseMatrix::Compressed(csc) => Ok(csc.map_values(|i, v| d[i] * v).into()),
        }
    }

    pub fn transpose(&self) -> SparseMatrix {
        match self {
            SparseMatrix::Empty { nrows, ncols } => SparseMatrix::zero(*ncols, *nrows),
            SparseMatrix::Compressed(csc) => csc.transpose().into(),
        }
    }

    /// Dense product `self * x`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` if `x.len() != ncols`.
    pub fn try_mul_vec(&self, x: &[f64]) -> Result<Vec<f64>, AdError> {
        if x.len() != self.ncols() {
            return Err(AdError::RangeMismatch {
                op: "mul_vec",
                expected: self.ncols(),
                actual: x.len(),
            });
        }
        Ok(match self {
            SparseMatrix::Empty { nrows, .. } => vec![0.0; *nrows],
            SparseMatrix::Compressed(csc) => csc.mul_vec(x),
        })
    }

    /// Horizontal concatenation `[b_0 | b_1 | ...]`.
    ///
    /// Shape-less blocks contribute no columns. If every block is empty the
    /// result is empty.
    ///
    /// # Errors
    ///
    /// Returns `AdError::EmptyInput` for no blocks and
    /// `AdError::MatrixShapeMismatch` for differing row counts.
    pub fn hstack(blocks: &[SparseMatrix]) -> Result<SparseMatrix, AdError> {
        let nrows = common_extent(blocks, "hstack", SparseMatrix::nrows)?;
        let ncols = blocks.iter().map(SparseMatrix::ncols).sum();
        if blocks.iter().all(SparseMatrix::is_empty) {
            return Ok(SparseMatrix::zero(nrows, ncols));
        }
        let owned: Vec<CscMatrix> = blocks
            .iter()
            .filter(|b| !b.is_shapeless())
            .map(SparseMatrix::to_compressed)
            .collect();
        let refs: Vec<&CscMatrix> = owned.iter().collect();
        Ok(CscMatrix::hstack(nrows, &refs).into())
    }

    /// Vertical concatenation of blocks sharing a column count.
    ///
    /// # Errors
    ///
    /// Returns `AdError::EmptyInput` for no blocks and
    /// `AdError::MatrixShapeMismatch` for differing column counts.
    pub fn vstack(blocks: &[SparseMatrix]) -> Result<SparseMatrix, AdError> {
        let ncols = common_extent(blocks, "vstack", SparseMatrix::ncols)?;
        let nrows = blocks.iter().map(SparseMatrix::nrows).sum();
        if blocks.iter().all(SparseMatrix::is_empty) {
            return Ok(SparseMatrix::zero(nrows, ncols));
        }
        let owned: Vec<CscMatrix> = blocks
            .iter()
            .filter(|b| !b.is_shapeless())
            .map(SparseMatrix::to_compressed)
            .collect();
        let refs: Vec<&CscMatrix> = owned.iter().collect();
        Ok(CscMatrix::vstack(ncols, &refs).into())
    }

    /// Row gather: row `r` of the result is row `rows[r]` of `self`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::IndexOutOfBounds` for an index `>= nrows`.
    pub fn try_gather_rows(&self, rows: &[usize]) -> Result<SparseMatrix, AdError> {
        check_indices(rows, self.nrows())?;
        Ok(match self {
            SparseMatrix::Empty { ncols, .. } => SparseMatrix::zero(rows.len(), *ncols),
            SparseMatrix::Compressed(csc) => csc.gather_rows(rows).into(),
        })
    }

    /// Row scatter into `nrows_out` rows: row `r` of `self` lands on row
    /// `rows[r]`; untouched rows are zero, repeated targets are summed.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` if `rows.len() != nrows` and
    /// `AdError::IndexOutOfBounds` for a target `>= nrows_out`.
    pub fn try_scatter_rows(
        &self,
        rows: &[usize],
        nrows_out: usize,
    ) -> Result<SparseMatrix, AdError> {
        if rows.len() != self.nrows() {
            return Err(AdError::RangeMismatch {
                op: "scatter_rows",
                expected: self.nrows(),
                actual: rows.len(),
            });
        }
        check_indices(rows, nrows_out)?;
        Ok(match self {
            SparseMatrix::Empty { ncols, .. } => SparseMatrix::zero(nrows_out, *ncols),
            SparseMatrix::Compressed(csc) => csc.scatter_rows(rows, nrows_out).into(),
        })
    }

    /// Row-wise choice: rows where `mask` holds come from `self`, others
    /// from `other`. Rows are copied whole, never blended.
    ///
    /// # Errors
    ///
    /// Returns `AdError::MatrixShapeMismatch` for differing shapes and
    /// `AdError::RangeMismatch` if the mask length is not the row count.
    pub fn try_select_rows(
        &self,
        mask: &[bool],
        other: &SparseMatrix,
    ) -> Result<SparseMatrix, AdError> {
        self.check_same_shape("select_rows", other)?;
        let shaped = if self.is_shapeless() { other } else { self };
        if mask.len() != shaped.nrows() && !shaped.is_shapeless() {
            return Err(AdError::RangeMismatch {
                op: "select_rows",
                expected: shaped.nrows(),
                actual: mask.len(),
            });
        }
        Ok(match (self, other) {
            (SparseMatrix::Empty { .. }, SparseMatrix::Empty { .. }) => shaped.clone(),
            (SparseMatrix::Compressed(a), SparseMatrix::Empty { .. }) => {
                a.filter_rows(|i| mask[i]).into()
            }
            (SparseMatrix::Empty { .. }, SparseMatrix::Compressed(b)) => {
                b.filter_rows(|i| !mask[i]).into()
            }
            (SparseMatrix::Compressed(a), SparseMatrix::Compressed(b)) => {
                a.select_rows(mask, b).into()
            }
        })
    }
}

fn common_extent(
    blocks: &[SparseMatrix],
    op: &'static str,
    extent: fn(&SparseMatrix) -> usize,
) -> Result<usize, AdError> {
    let first = blocks.first().ok_or(AdError::EmptyInput { op })?;
    let mut shaped = blocks.iter().filter(|b| !b.is_shapeless());
    let Some(reference) = shaped.next() else {
        return Ok(extent(first));
    };
    for block in shaped {
        if extent(block) != extent(reference) {
            return Err(AdError::MatrixShapeMismatch {
                op,
                left: reference.shape(),
                right: block.shape(),
            });
        }
    }
    Ok(extent(reference))
}

fn check_indices(indices: &[usize], size: usize) -> Result<(), AdError> {
    match indices.iter().find(|&&i| i >= size) {
        Some(&index) => Err(AdError::IndexOutOfBounds { index, size }),
        None => Ok(()),
    }
}

// ============================================================================
// Operators
// ============================================================================

impl Add for &SparseMatrix {
    type Output = SparseMatrix;
    fn add(self, rhs: &SparseMatrix) -> SparseMatrix {
        self.try_add(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Sub for &SparseMatrix {
    type Output = SparseMatrix;
    fn sub(self, rhs: &SparseMatrix) -> SparseMatrix {
        self.try_sub(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Mul for &SparseMatrix {
    type Output = SparseMatrix;
    fn mul(self, rhs: &SparseMatrix) -> SparseMatrix {
        self.try_mul(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Mul<f64> for &SparseMatrix {
    type Output = SparseMatrix;
    fn mul(self, alpha: f64) -> SparseMatrix {
        self.scale(alpha)
    }
}

impl Mul<&SparseMatrix> for f64 {
    type Output = SparseMatrix;
    fn mul(self, m: &SparseMatrix) -> SparseMatrix {
        m.scale(self)
    }
}

impl Neg for &SparseMatrix {
    type Output = SparseMatrix;
    fn neg(self) -> SparseMatrix {
        match self {
            SparseMatrix::Empty { .. } => self.clone(),
            SparseMatrix::Compressed(csc) => csc.map_values(|_, v| -v).into(),
        }
    }
}

impl Neg for SparseMatrix {
    type Output = SparseMatrix;
    fn neg(self) -> SparseMatrix {
        -&self
    }
}
