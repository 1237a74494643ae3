//! Compressed sparse column storage and its kernels.
//!
//! `CscMatrix` is immutable once built. Its three buffers live behind `Arc`
//! so cloning a matrix (and therefore an AD value's Jacobian list) only bumps
//! reference counts.
//!
//! Invariants maintained by every constructor:
//!
//! ```text
//! col_ptr.len() == ncols + 1, col_ptr[0] == 0, col_ptr non-decreasing
//! col_ptr[ncols] == row_idx.len() == values.len()
//! row indices strictly increasing inside each column, all < nrows
//! ```

use std::sync::Arc;

use crate::error::AdError;

/// Compressed sparse column matrix over `f64`.
///
/// # Example
///
/// ```
/// use adblock::sparse::CscMatrix;
///
/// // [[1, 0], [0, 2], [3, 0]]
/// let m = CscMatrix::try_new(3, 2, vec![0, 2, 3], vec![0, 2, 1], vec![1.0, 3.0, 2.0]).unwrap();
/// assert_eq!(m.nnz(), 3);
/// assert_eq!(m.get(2, 0), 3.0);
/// assert_eq!(m.get(1, 0), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix {
    nrows: usize,
    ncols: usize,
    col_ptr: Arc<[usize]>,
    row_idx: Arc<[usize]>,
    values: Arc<[f64]>,
}

impl CscMatrix {
    /// Create a matrix from raw CSC arrays, validating every invariant.
    ///
    /// # Errors
    ///
    /// Returns `AdError::InvalidStorage` if the arrays do not describe a
    /// well-formed `nrows x ncols` CSC matrix with sorted, unique row indices.
    pub fn try_new(
        nrows: usize,
        ncols: usize,
        col_ptr: Vec<usize>,
        row_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self, AdError> {
        validate(nrows, ncols, &col_ptr, &row_idx, &values)?;
        Ok(Self::from_parts(nrows, ncols, col_ptr, row_idx, values))
    }

    /// Build from arrays already known to be valid.
    pub(crate) fn from_parts(
        nrows: usize,
        ncols: usize,
        col_ptr: Vec<usize>,
        row_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Self {
        debug_assert!(validate(nrows, ncols, &col_ptr, &row_idx, &values).is_ok());
        Self {
            nrows,
            ncols,
            col_ptr: col_ptr.into(),
            row_idx: row_idx.into(),
            values: values.into(),
        }
    }

    /// Structurally zero matrix: valid column pointers, no entries.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::from_parts(nrows, ncols, vec![0; ncols + 1], Vec::new(), Vec::new())
    }

    /// `n x n` identity.
    pub fn identity(n: usize) -> Self {
        Self::diagonal(&vec![1.0; n])
    }

    /// Square matrix with `diag` on the diagonal.
    ///
    /// Zeros in `diag` are kept as structural non-zeros.
    pub fn diagonal(diag: &[f64]) -> Self {
        let n = diag.len();
        Self::from_parts(n, n, (0..=n).collect(), (0..n).collect(), diag.to_vec())
    }

    /// Build from `(row, col, value)` triplets; duplicates are summed in
    /// input order.
    ///
    /// # Errors
    ///
    /// Returns `AdError::IndexOutOfBounds` if a triplet lies outside the shape.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, f64)],
    ) -> Result<Self, AdError> {
        for &(i, j, _) in triplets {
            if i >= nrows {
                return Err(AdError::IndexOutOfBounds {
                    index: i,
                    size: nrows,
                });
            }
            if j >= ncols {
                return Err(AdError::IndexOutOfBounds {
                    index: j,
                    size: ncols,
                });
            }
        }

        let mut order: Vec<usize> = (0..triplets.len()).collect();
        order.sort_by_key(|&p| (triplets[p].1, triplets[p].0));

        let mut col_ptr = vec![0usize; ncols + 1];
        let mut row_idx = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut last: Option<(usize, usize)> = None;
        for p in order {
            let (i, j, v) = triplets[p];
            if last == Some((i, j)) {
                if let Some(acc) = values.last_mut() {
                    *acc += v;
                }
            } else {
                row_idx.push(i);
                values.push(v);
                col_ptr[j + 1] += 1;
                last = Some((i, j));
            }
        }
        for j in 0..ncols {
            col_ptr[j + 1] += col_ptr[j];
        }

        Ok(Self::from_parts(nrows, ncols, col_ptr, row_idx, values))
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// `(nrows, ncols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Number of stored entries (explicit zeros included).
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn col_ptr(&self) -> &[usize] {
        &self.col_ptr
    }

    #[inline]
    pub fn row_idx(&self) -> &[usize] {
        &self.row_idx
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Row indices and values of column `j`.
    ///
    /// # Panics
    ///
    /// Panics if `j >= ncols`.
    #[inline]
    pub fn column(&self, j: usize) -> (&[usize], &[f64]) {
        let range = self.col_ptr[j]..self.col_ptr[j + 1];
        (&self.row_idx[range.clone()], &self.values[range])
    }

    /// Entry `(i, j)`, zero if not stored.
    ///
    /// # Panics
    ///
    /// Panics if `j >= ncols`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (rows, vals) = self.column(j);
        rows.binary_search(&i).map_or(0.0, |p| vals[p])
    }

    /// Whether two matrices share the same storage buffers.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    /// Copy out the raw `(col_ptr, row_idx, values)` arrays.
    pub fn into_raw_parts(self) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
        (
            self.col_ptr.to_vec(),
            self.row_idx.to_vec(),
            self.values.to_vec(),
        )
    }

    // ========================================================================
    // Kernels (shapes are checked by the caller)
    // ========================================================================

    /// Sparse-sparse product `self * rhs`.
    pub(crate) fn matmul(&self, rhs: &CscMatrix) -> CscMatrix {
        debug_assert_eq!(self.ncols, rhs.nrows);
        let (col_ptr, row_idx, values) = self.product_columns(rhs);
        Self::from_parts(self.nrows, rhs.ncols, col_ptr, row_idx, values)
    }

    #[cfg(not(feature = "parallel"))]
    fn product_columns(&self, rhs: &CscMatrix) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
        self.product_columns_serial(rhs)
    }

    #[cfg(any(not(feature = "parallel"), test))]
    fn product_columns_serial(&self, rhs: &CscMatrix) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
        let mut acc = ColumnAccumulator::new(self.nrows);
        let mut col_ptr = Vec::with_capacity(rhs.ncols + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        col_ptr.push(0);
        for j in 0..rhs.ncols {
            self.accumulate_column(rhs, j, &mut acc);
            acc.drain_into(&mut row_idx, &mut values);
            col_ptr.push(row_idx.len());
        }
        (col_ptr, row_idx, values)
    }

    #[cfg(feature = "parallel")]
    fn product_columns(&self, rhs: &CscMatrix) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
        use rayon::prelude::*;

        // Each output column is computed exactly as in the serial path, so the
        // concatenation is bit-identical to it.
        let columns: Vec<(Vec<usize>, Vec<f64>)> = (0..rhs.ncols)
            .into_par_iter()
            .map_init(
                || ColumnAccumulator::new(self.nrows),
                |acc, j| {
                    self.accumulate_column(rhs, j, acc);
                    let mut rows = Vec::new();
                    let mut vals = Vec::new();
                    acc.drain_into(&mut rows, &mut vals);
                    (rows, vals)
                },
            )
            .collect();

        let nnz = columns.iter().map(|(rows, _)| rows.len()).sum();
        let mut col_ptr = Vec::with_capacity(rhs.ncols + 1);
        let mut row_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        col_ptr.push(0);
        for (rows, vals) in columns {
            row_idx.extend(rows);
            values.extend(vals);
            col_ptr.push(row_idx.len());
        }
        (col_ptr, row_idx, values)
    }

    fn accumulate_column(&self, rhs: &CscMatrix, j: usize, acc: &mut ColumnAccumulator) {
        let (b_rows, b_vals) = rhs.column(j);
        for (&k, &b) in b_rows.iter().zip(b_vals) {
            let (a_rows, a_vals) = self.column(k);
            for (&i, &a) in a_rows.iter().zip(a_vals) {
                acc.add(i, a * b);
            }
        }
    }

    /// `alpha * self + beta * rhs` with the union sparsity pattern.
    pub(crate) fn add_scaled(&self, alpha: f64, rhs: &CscMatrix, beta: f64) -> CscMatrix {
        debug_assert_eq!(self.shape(), rhs.shape());
        let mut col_ptr = Vec::with_capacity(self.ncols + 1);
        let mut row_idx = Vec::with_capacity(self.nnz() + rhs.nnz());
        let mut values = Vec::with_capacity(self.nnz() + rhs.nnz());
        col_ptr.push(0);
        for j in 0..self.ncols {
            let (ar, av) = self.column(j);
            let (br, bv) = rhs.column(j);
            let (mut p, mut q) = (0, 0);
            while p < ar.len() || q < br.len() {
                if q == br.len() || (p < ar.len() && ar[p] < br[q]) {
                    row_idx.push(ar[p]);
                    values.push(alpha * av[p]);
                    p += 1;
                } else if p == ar.len() || br[q] < ar[p] {
                    row_idx.push(br[q]);
                    values.push(beta * bv[q]);
                    q += 1;
                } else {
                    row_idx.push(ar[p]);
                    values.push(alpha * av[p] + beta * bv[q]);
                    p += 1;
                    q += 1;
                }
            }
            col_ptr.push(row_idx.len());
        }
        Self::from_parts(self.nrows, self.ncols, col_ptr, row_idx, values)
    }

    /// Same pattern, values mapped through `f(row, value)`.
    pub(crate) fn map_values(&self, f: impl Fn(usize, f64) -> f64) -> CscMatrix {
        let values: Vec<f64> = self
            .row_idx
            .iter()
            .zip(self.values.iter())
            .map(|(&i, &v)| f(i, v))
            .collect();
        Self {
            nrows: self.nrows,
            ncols: self.ncols,
            col_ptr: Arc::clone(&self.col_ptr),
            row_idx: Arc::clone(&self.row_idx),
            values: values.into(),
        }
    }

    pub(crate) fn transpose(&self) -> CscMatrix {
        let mut col_ptr = vec![0usize; self.nrows + 1];
        for &i in self.row_idx.iter() {
            col_ptr[i + 1] += 1;
        }
        for i in 0..self.nrows {
            col_ptr[i + 1] += col_ptr[i];
        }

        let mut next = col_ptr[..self.nrows].to_vec();
        let mut row_idx = vec![0usize; self.nnz()];
        let mut values = vec![0.0; self.nnz()];
        for j in 0..self.ncols {
            let (rows, vals) = self.column(j);
            for (&i, &v) in rows.iter().zip(vals) {
                let dst = next[i];
                row_idx[dst] = j;
                values[dst] = v;
                next[i] += 1;
            }
        }
        Self::from_parts(self.ncols, self.nrows, col_ptr, row_idx, values)
    }

    /// Dense product `self * x`.
    pub(crate) fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(self.ncols, x.len());
        let mut y = vec![0.0; self.nrows];
        for (j, &xj) in x.iter().enumerate() {
            let (rows, vals) = self.column(j);
            for (&i, &v) in rows.iter().zip(vals) {
                y[i] += v * xj;
            }
        }
        y
    }

    /// Row gather: row `r` of the result is row `rows[r]` of `self`.
    pub(crate) fn gather_rows(&self, rows: &[usize]) -> CscMatrix {
        // Destinations of each source row, grouped by source row.
        let mut start = vec![0usize; self.nrows + 1];
        for &src in rows {
            start[src + 1] += 1;
        }
        for i in 0..self.nrows {
            start[i + 1] += start[i];
        }
        let mut next = start[..self.nrows].to_vec();
        let mut dest = vec![0usize; rows.len()];
        for (r, &src) in rows.iter().enumerate() {
            dest[next[src]] = r;
            next[src] += 1;
        }

        let mut col_ptr = Vec::with_capacity(self.ncols + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        let mut scratch: Vec<(usize, f64)> = Vec::new();
        col_ptr.push(0);
        for j in 0..self.ncols {
            let (src_rows, src_vals) = self.column(j);
            scratch.clear();
            for (&i, &v) in src_rows.iter().zip(src_vals) {
                for &r in &dest[start[i]..start[i + 1]] {
                    scratch.push((r, v));
                }
            }
            scratch.sort_unstable_by_key(|&(r, _)| r);
            for &(r, v) in &scratch {
                row_idx.push(r);
                values.push(v);
            }
            col_ptr.push(row_idx.len());
        }
        Self::from_parts(rows.len(), self.ncols, col_ptr, row_idx, values)
    }

    /// Row scatter: row `r` of `self` lands on row `rows[r]` of an
    /// `nrows_out`-row result. Rows hit twice are summed.
    pub(crate) fn scatter_rows(&self, rows: &[usize], nrows_out: usize) -> CscMatrix {
        debug_assert_eq!(self.nrows, rows.len());
        let mut col_ptr = Vec::with_capacity(self.ncols + 1);
        let mut row_idx: Vec<usize> = Vec::with_capacity(self.nnz());
        let mut values: Vec<f64> = Vec::with_capacity(self.nnz());
        let mut scratch: Vec<(usize, f64)> = Vec::new();
        col_ptr.push(0);
        for j in 0..self.ncols {
            let (src_rows, src_vals) = self.column(j);
            scratch.clear();
            scratch.extend(src_rows.iter().zip(src_vals).map(|(&i, &v)| (rows[i], v)));
            scratch.sort_by_key(|&(r, _)| r);
            let col_start = row_idx.len();
            for &(r, v) in &scratch {
                if row_idx.len() > col_start && row_idx.last() == Some(&r) {
                    if let Some(acc) = values.last_mut() {
                        *acc += v;
                    }
                } else {
                    row_idx.push(r);
                    values.push(v);
                }
            }
            col_ptr.push(row_idx.len());
        }
        Self::from_parts(nrows_out, self.ncols, col_ptr, row_idx, values)
    }

    /// Keep only the rows for which `keep(row)` holds; other rows become zero.
    pub(crate) fn filter_rows(&self, keep: impl Fn(usize) -> bool) -> CscMatrix {
        let mut col_ptr = Vec::with_capacity(self.ncols + 1);
        let mut row_idx = Vec::with_capacity(self.nnz());
        let mut values = Vec::with_capacity(self.nnz());
        col_ptr.push(0);
        for j in 0..self.ncols {
            let (rows, vals) = self.column(j);
            for (&i, &v) in rows.iter().zip(vals) {
                if keep(i) {
                    row_idx.push(i);
                    values.push(v);
                }
            }
            col_ptr.push(row_idx.len());
        }
        Self::from_parts(self.nrows, self.ncols, col_ptr, row_idx, values)
    }

    /// Row-wise choice: rows where `mask` holds come from `self`, the rest
    /// from `other`.
    pub(crate) fn select_rows(&self, mask: &[bool], other: &CscMatrix) -> CscMatrix {
        debug_assert_eq!(self.shape(), other.shape());
        let mut col_ptr = Vec::with_capacity(self.ncols + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        col_ptr.push(0);
        for j in 0..self.ncols {
            let (ar, av) = self.column(j);
            let (br, bv) = other.column(j);
            let a = ar.iter().zip(av).filter(|&(&i, _)| mask[i]);
            let mut b = br.iter().zip(bv).filter(|&(&i, _)| !mask[i]).peekable();
            // Selected rows are disjoint, so a plain ordered merge suffices.
            for (&i, &v) in a {
                while let Some((&k, &w)) = b.next_if(|&(&k, _)| k < i) {
                    row_idx.push(k);
                    values.push(w);
                }
                row_idx.push(i);
                values.push(v);
            }
            for (&k, &w) in b {
                row_idx.push(k);
                values.push(w);
            }
            col_ptr.push(row_idx.len());
        }
        Self::from_parts(self.nrows, self.ncols, col_ptr, row_idx, values)
    }

    /// `[b_0 | b_1 | ...]`; all blocks share a row count.
    pub(crate) fn hstack(nrows: usize, blocks: &[&CscMatrix]) -> CscMatrix {
        let ncols = blocks.iter().map(|b| b.ncols).sum();
        let nnz = blocks.iter().map(|b| b.nnz()).sum();
        let mut col_ptr = Vec::with_capacity(ncols + 1);
        let mut row_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        col_ptr.push(0);
        for block in blocks {
            debug_assert_eq!(block.nrows, nrows);
            let offset = row_idx.len();
            col_ptr.extend(block.col_ptr[1..].iter().map(|&p| p + offset));
            row_idx.extend_from_slice(&block.row_idx);
            values.extend_from_slice(&block.values);
        }
        Self::from_parts(nrows, ncols, col_ptr, row_idx, values)
    }

    /// Blocks stacked on top of each other; all blocks share a column count.
    pub(crate) fn vstack(ncols: usize, blocks: &[&CscMatrix]) -> CscMatrix {
        let nrows = blocks.iter().map(|b| b.nrows).sum();
        let nnz = blocks.iter().map(|b| b.nnz()).sum();
        let mut col_ptr = Vec::with_capacity(ncols + 1);
        let mut row_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        col_ptr.push(0);
        for j in 0..ncols {
            let mut row_offset = 0;
            for block in blocks {
                debug_assert_eq!(block.ncols, ncols);
                let (rows, vals) = block.column(j);
                row_idx.extend(rows.iter().map(|&i| i + row_offset));
                values.extend_from_slice(vals);
                row_offset += block.nrows;
            }
            col_ptr.push(row_idx.len());
        }
        Self::from_parts(nrows, ncols, col_ptr, row_idx, values)
    }
}

/// Dense scatter accumulator for one output column of a product.
struct ColumnAccumulator {
    values: Vec<f64>,
    occupied: Vec<bool>,
    pattern: Vec<usize>,
}

impl ColumnAccumulator {
    fn new(nrows: usize) -> Self {
        Self {
            values: vec![0.0; nrows],
            occupied: vec![false; nrows],
            pattern: Vec::new(),
        }
    }

    #[inline]
    fn add(&mut self, row: usize, v: f64) {
        if self.occupied[row] {
            self.values[row] += v;
        } else {
            self.occupied[row] = true;
            self.values[row] = v;
            self.pattern.push(row);
        }
    }

    fn drain_into(&mut self, row_idx: &mut Vec<usize>, values: &mut Vec<f64>) {
        self.pattern.sort_unstable();
        for &i in &self.pattern {
            row_idx.push(i);
            values.push(self.values[i]);
            self.occupied[i] = false;
        }
        self.pattern.clear();
    }
}

fn validate(
    nrows: usize,
    ncols: usize,
    col_ptr: &[usize],
    row_idx: &[usize],
    values: &[f64],
) -> Result<(), AdError> {
    let invalid = |message: String| Err(AdError::InvalidStorage { message });

    if col_ptr.len() != ncols + 1 {
        return invalid(format!(
            "column pointer length {} does not match ncols + 1 = {}",
            col_ptr.len(),
            ncols + 1
        ));
    }
    if col_ptr[0] != 0 {
        return invalid(format!("first column pointer is {}, expected 0", col_ptr[0]));
    }
    if row_idx.len() != values.len() {
        return invalid(format!(
            "{} row indices but {} values",
            row_idx.len(),
            values.len()
        ));
    }
    if col_ptr[ncols] != row_idx.len() {
        return invalid(format!(
            "last column pointer {} does not match nnz {}",
            col_ptr[ncols],
            row_idx.len()
        ));
    }
    for j in 0..ncols {
        let (start, end) = (col_ptr[j], col_ptr[j + 1]);
        if start > end || end > row_idx.len() {
            return invalid(format!("column pointers not monotone at column {j}"));
        }
        let rows = &row_idx[start..end];
        for (p, &i) in rows.iter().enumerate() {
            if i >= nrows {
                return invalid(format!("row index {i} out of bounds for {nrows} rows"));
            }
            if p > 0 && rows[p - 1] >= i {
                return invalid(format!(
                    "row indices not strictly increasing in column {j}"
                ));
            }
        }
    }
    Ok(())
}
