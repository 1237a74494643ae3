//! C API for adblock
//!
//! This crate exposes AD values and the collapsed Jacobian hand-off through a
//! C-compatible interface, so a host simulator written in C, Fortran or
//! Python can assemble residuals and read back CSC systems.
//!
//! All extern "C" functions are inherently unsafe as they work with raw pointers
//! from foreign code. The `#[unsafe(no_mangle)]` attribute marks the entire
//! function signature as unsafe at the FFI boundary.

#![allow(clippy::not_unsafe_ptr_arg_deref)]

use adblock::{AdError, AutoDiffBlock, BlockPartition, Collapsed, SparseMatrix};
use libc::{c_double, c_int, size_t};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;

// Status codes
pub type StatusCode = c_int;

pub const ADB_SUCCESS: StatusCode = 0;
pub const ADB_INVALID_ARGUMENT: StatusCode = -1;
pub const ADB_SHAPE_MISMATCH: StatusCode = -2;
pub const ADB_INDEX_OUT_OF_BOUNDS: StatusCode = -3;
pub const ADB_INTERNAL_ERROR: StatusCode = -4;
pub const ADB_NON_FINITE: StatusCode = -5;

fn status_of(err: &AdError) -> StatusCode {
    match err {
        AdError::RangeMismatch { .. }
        | AdError::PartitionMismatch { .. }
        | AdError::MatrixShapeMismatch { .. }
        | AdError::BlockSizeMismatch { .. } => ADB_SHAPE_MISMATCH,
        AdError::VariableOutOfRange { .. } | AdError::IndexOutOfBounds { .. } => {
            ADB_INDEX_OUT_OF_BOUNDS
        }
        AdError::InvalidStorage { .. } | AdError::EmptyInput { .. } => ADB_INVALID_ARGUMENT,
        AdError::NonFinite { .. } => ADB_NON_FINITE,
    }
}

/// Opaque AD value handle
#[repr(C)]
pub struct adb_autodiff {
    _private: *mut std::ffi::c_void,
}

impl adb_autodiff {
    fn from_value(value: AutoDiffBlock) -> Self {
        let boxed = Box::new(value);
        Self {
            _private: Box::into_raw(boxed) as *mut std::ffi::c_void,
        }
    }

    fn inner(&self) -> &AutoDiffBlock {
        unsafe { &*(self._private as *const AutoDiffBlock) }
    }
}

impl Drop for adb_autodiff {
    fn drop(&mut self) {
        if !self._private.is_null() {
            unsafe {
                let _ = Box::from_raw(self._private as *mut AutoDiffBlock);
            }
        }
    }
}

impl Clone for adb_autodiff {
    fn clone(&self) -> Self {
        Self::from_value(self.inner().clone())
    }
}

/// Opaque collapsed system handle (residual value plus CSC Jacobian)
#[repr(C)]
pub struct adb_collapsed {
    _private: *mut std::ffi::c_void,
}

impl adb_collapsed {
    fn from_collapsed(collapsed: Collapsed) -> Self {
        let boxed = Box::new(collapsed);
        Self {
            _private: Box::into_raw(boxed) as *mut std::ffi::c_void,
        }
    }

    fn inner(&self) -> &Collapsed {
        unsafe { &*(self._private as *const Collapsed) }
    }
}

impl Drop for adb_collapsed {
    fn drop(&mut self) {
        if !self._private.is_null() {
            unsafe {
                let _ = Box::from_raw(self._private as *mut Collapsed);
            }
        }
    }
}

/// Run `f` behind a panic guard and write its status through `status`.
fn guarded<T>(
    status: *mut StatusCode,
    f: impl FnOnce() -> Result<*mut T, StatusCode>,
) -> *mut T {
    let result = catch_unwind(AssertUnwindSafe(f));
    let (ptr, code) = match result {
        Ok(Ok(ptr)) => (ptr, ADB_SUCCESS),
        Ok(Err(code)) => (ptr::null_mut(), code),
        Err(_) => (ptr::null_mut(), ADB_INTERNAL_ERROR),
    };
    unsafe {
        *status = code;
    }
    ptr
}

fn into_handle(value: AutoDiffBlock) -> *mut adb_autodiff {
    Box::into_raw(Box::new(adb_autodiff::from_value(value)))
}

unsafe fn slice_or_empty<'a, T>(data: *const T, len: size_t) -> &'a [T] {
    if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(data, len) }
    }
}

// ============================================================================
// AD value creation
// ============================================================================

/// Create a constant AD value with all-empty Jacobians.
///
/// # Arguments
/// * `value` - Pointer to `len` values
/// * `len` - Number of values
/// * `block_sizes` - Pointer to the block sizes of the partition
/// * `num_blocks` - Number of blocks
/// * `status` - Pointer to receive status code
///
/// # Returns
/// Pointer to new AD value, or null on error
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_constant(
    value: *const c_double,
    len: size_t,
    block_sizes: *const size_t,
    num_blocks: size_t,
    status: *mut StatusCode,
) -> *mut adb_autodiff {
    if status.is_null() {
        return ptr::null_mut();
    }
    if (value.is_null() && len > 0) || (block_sizes.is_null() && num_blocks > 0) {
        unsafe {
            *status = ADB_INVALID_ARGUMENT;
        }
        return ptr::null_mut();
    }

    guarded(status, || {
        let value = unsafe { slice_or_empty(value, len) };
        let sizes = unsafe { slice_or_empty(block_sizes, num_blocks) };
        let partition = BlockPartition::from(sizes);
        Ok(into_handle(AutoDiffBlock::constant(value, &partition)))
    })
}

/// Create the primary variable for block `index`: identity Jacobian in that
/// block, empty elsewhere.
///
/// # Returns
/// Pointer to new AD value, or null on error
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_variable(
    index: size_t,
    value: *const c_double,
    len: size_t,
    block_sizes: *const size_t,
    num_blocks: size_t,
    status: *mut StatusCode,
) -> *mut adb_autodiff {
    if status.is_null() {
        return ptr::null_mut();
    }
    if (value.is_null() && len > 0) || (block_sizes.is_null() && num_blocks > 0) {
        unsafe {
            *status = ADB_INVALID_ARGUMENT;
        }
        return ptr::null_mut();
    }

    guarded(status, || {
        let value = unsafe { slice_or_empty(value, len) };
        let sizes = unsafe { slice_or_empty(block_sizes, num_blocks) };
        let partition = BlockPartition::from(sizes);
        AutoDiffBlock::variable(index, value, &partition)
            .map(into_handle)
            .map_err(|e| status_of(&e))
    })
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Release (free) an AD value.
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_release(x: *mut adb_autodiff) {
    if !x.is_null() {
        unsafe {
            let _ = Box::from_raw(x);
        }
    }
}

/// Clone an AD value.
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_clone(src: *const adb_autodiff) -> *mut adb_autodiff {
    if src.is_null() {
        return ptr::null_mut();
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe {
        let src_ref = &*src;
        Box::into_raw(Box::new(src_ref.clone()))
    }));

    result.unwrap_or(ptr::null_mut())
}

/// Release (free) a collapsed system.
#[unsafe(no_mangle)]
pub extern "C" fn adb_collapsed_release(c: *mut adb_collapsed) {
    if !c.is_null() {
        unsafe {
            let _ = Box::from_raw(c);
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Number of rows (value length).
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_len(x: *const adb_autodiff) -> size_t {
    if x.is_null() {
        return 0;
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe { (*x).inner().len() }));

    result.unwrap_or(0)
}

/// Number of Jacobian blocks.
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_num_blocks(x: *const adb_autodiff) -> size_t {
    if x.is_null() {
        return 0;
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe { (*x).inner().num_blocks() }));

    result.unwrap_or(0)
}

/// Copy the value into `out`, which must hold `adb_autodiff_len(x)` entries.
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_value(x: *const adb_autodiff, out: *mut c_double) -> StatusCode {
    if x.is_null() || out.is_null() {
        return ADB_INVALID_ARGUMENT;
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe {
        let value = (*x).inner().value().as_slice();
        ptr::copy_nonoverlapping(value.as_ptr(), out, value.len());
        ADB_SUCCESS
    }));

    result.unwrap_or(ADB_INTERNAL_ERROR)
}

// ============================================================================
// Arithmetic
// ============================================================================

fn binary(
    a: *const adb_autodiff,
    b: *const adb_autodiff,
    status: *mut StatusCode,
    op: fn(&AutoDiffBlock, &AutoDiffBlock) -> Result<AutoDiffBlock, AdError>,
) -> *mut adb_autodiff {
    if status.is_null() {
        return ptr::null_mut();
    }
    if a.is_null() || b.is_null() {
        unsafe {
            *status = ADB_INVALID_ARGUMENT;
        }
        return ptr::null_mut();
    }

    guarded(status, || unsafe {
        op((*a).inner(), (*b).inner())
            .map(into_handle)
            .map_err(|e| status_of(&e))
    })
}

/// Elementwise sum `a + b`.
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_add(
    a: *const adb_autodiff,
    b: *const adb_autodiff,
    status: *mut StatusCode,
) -> *mut adb_autodiff {
    binary(a, b, status, AutoDiffBlock::try_add)
}

/// Elementwise difference `a - b`.
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_sub(
    a: *const adb_autodiff,
    b: *const adb_autodiff,
    status: *mut StatusCode,
) -> *mut adb_autodiff {
    binary(a, b, status, AutoDiffBlock::try_sub)
}

/// Elementwise product `a * b`.
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_mul(
    a: *const adb_autodiff,
    b: *const adb_autodiff,
    status: *mut StatusCode,
) -> *mut adb_autodiff {
    binary(a, b, status, AutoDiffBlock::try_mul)
}

/// Elementwise quotient `a / b`.
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_div(
    a: *const adb_autodiff,
    b: *const adb_autodiff,
    status: *mut StatusCode,
) -> *mut adb_autodiff {
    binary(a, b, status, AutoDiffBlock::try_div)
}

/// Left-multiply by a CSC matrix `M`: value `M v`, Jacobians `M J_k`.
///
/// # Arguments
/// * `nrows`, `ncols` - Shape of `M`
/// * `col_ptr` - `ncols + 1` column offsets
/// * `row_idx`, `values` - `col_ptr[ncols]` row indices and values
/// * `x` - AD value of length `ncols`
/// * `status` - Pointer to receive status code
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_left_mul(
    nrows: size_t,
    ncols: size_t,
    col_ptr: *const size_t,
    row_idx: *const size_t,
    values: *const c_double,
    x: *const adb_autodiff,
    status: *mut StatusCode,
) -> *mut adb_autodiff {
    if status.is_null() {
        return ptr::null_mut();
    }
    if col_ptr.is_null() || x.is_null() {
        unsafe {
            *status = ADB_INVALID_ARGUMENT;
        }
        return ptr::null_mut();
    }

    guarded(status, || {
        let col_ptr = unsafe { std::slice::from_raw_parts(col_ptr, ncols + 1) };
        let nnz = col_ptr[ncols];
        if nnz > 0 && (row_idx.is_null() || values.is_null()) {
            return Err(ADB_INVALID_ARGUMENT);
        }
        let row_idx = unsafe { slice_or_empty(row_idx, nnz) };
        let values = unsafe { slice_or_empty(values, nnz) };
        let m = SparseMatrix::from_raw_parts(
            nrows,
            ncols,
            col_ptr.to_vec(),
            row_idx.to_vec(),
            values.to_vec(),
        )
        .map_err(|e| status_of(&e))?;
        unsafe { (*x).inner() }
            .try_left_mul(&m)
            .map(into_handle)
            .map_err(|e| status_of(&e))
    })
}

/// Elementwise `exp(x)`.
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_exp(
    x: *const adb_autodiff,
    status: *mut StatusCode,
) -> *mut adb_autodiff {
    if status.is_null() {
        return ptr::null_mut();
    }
    if x.is_null() {
        unsafe {
            *status = ADB_INVALID_ARGUMENT;
        }
        return ptr::null_mut();
    }

    guarded(status, || {
        unsafe { (*x).inner() }
            .try_exp()
            .map(into_handle)
            .map_err(|e| status_of(&e))
    })
}

// ============================================================================
// Solver hand-off
// ============================================================================

/// Collapse the block Jacobians into one CSC matrix.
#[unsafe(no_mangle)]
pub extern "C" fn adb_autodiff_collapse(
    x: *const adb_autodiff,
    status: *mut StatusCode,
) -> *mut adb_collapsed {
    if status.is_null() {
        return ptr::null_mut();
    }
    if x.is_null() {
        unsafe {
            *status = ADB_INVALID_ARGUMENT;
        }
        return ptr::null_mut();
    }

    guarded(status, || {
        let collapsed = unsafe { (*x).inner() }.collapse();
        Ok(Box::into_raw(Box::new(adb_collapsed::from_collapsed(
            collapsed,
        ))))
    })
}

/// Shape of the collapsed Jacobian.
#[unsafe(no_mangle)]
pub extern "C" fn adb_collapsed_shape(
    c: *const adb_collapsed,
    nrows: *mut size_t,
    ncols: *mut size_t,
) -> StatusCode {
    if c.is_null() || nrows.is_null() || ncols.is_null() {
        return ADB_INVALID_ARGUMENT;
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe {
        let (m, n) = (*c).inner().jacobian.shape();
        *nrows = m;
        *ncols = n;
        ADB_SUCCESS
    }));

    result.unwrap_or(ADB_INTERNAL_ERROR)
}

/// Number of stored entries in the collapsed Jacobian.
#[unsafe(no_mangle)]
pub extern "C" fn adb_collapsed_nnz(c: *const adb_collapsed) -> size_t {
    if c.is_null() {
        return 0;
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe { (*c).inner().jacobian.nnz() }));

    result.unwrap_or(0)
}

/// Copy the CSC arrays. `col_ptr` must hold `ncols + 1` entries, `row_idx`
/// and `values` must hold `nnz` entries each.
#[unsafe(no_mangle)]
pub extern "C" fn adb_collapsed_copy_csc(
    c: *const adb_collapsed,
    col_ptr: *mut size_t,
    row_idx: *mut size_t,
    values: *mut c_double,
) -> StatusCode {
    if c.is_null() || col_ptr.is_null() {
        return ADB_INVALID_ARGUMENT;
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe {
        let m = &(*c).inner().jacobian;
        if m.nnz() > 0 && (row_idx.is_null() || values.is_null()) {
            return ADB_INVALID_ARGUMENT;
        }
        ptr::copy_nonoverlapping(m.col_ptr().as_ptr(), col_ptr, m.col_ptr().len());
        if m.nnz() > 0 {
            ptr::copy_nonoverlapping(m.row_idx().as_ptr(), row_idx, m.nnz());
            ptr::copy_nonoverlapping(m.values().as_ptr(), values, m.nnz());
        }
        ADB_SUCCESS
    }));

    result.unwrap_or(ADB_INTERNAL_ERROR)
}

/// Copy the residual value into `out`, which must hold `nrows` entries.
#[unsafe(no_mangle)]
pub extern "C" fn adb_collapsed_copy_value(
    c: *const adb_collapsed,
    out: *mut c_double,
) -> StatusCode {
    if c.is_null() || out.is_null() {
        return ADB_INVALID_ARGUMENT;
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe {
        let value = (*c).inner().value.as_slice();
        ptr::copy_nonoverlapping(value.as_ptr(), out, value.len());
        ADB_SUCCESS
    }));

    result.unwrap_or(ADB_INTERNAL_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(index: usize, value: &[f64], sizes: &[usize]) -> *mut adb_autodiff {
        let mut status: StatusCode = -999;
        let x = adb_autodiff_variable(
            index,
            value.as_ptr(),
            value.len(),
            sizes.as_ptr(),
            sizes.len(),
            &mut status,
        );
        assert_eq!(status, ADB_SUCCESS);
        assert!(!x.is_null());
        x
    }

    #[test]
    fn test_constant() {
        let value = [0.2, 1.2, 13.4];
        let sizes = [3usize, 1, 2];
        let mut status: StatusCode = -999;

        let c = adb_autodiff_constant(
            value.as_ptr(),
            value.len(),
            sizes.as_ptr(),
            sizes.len(),
            &mut status,
        );
        assert_eq!(status, ADB_SUCCESS);
        assert_eq!(adb_autodiff_len(c), 3);
        assert_eq!(adb_autodiff_num_blocks(c), 3);

        let mut out = [0.0; 3];
        assert_eq!(adb_autodiff_value(c, out.as_mut_ptr()), ADB_SUCCESS);
        assert_eq!(out, value);

        adb_autodiff_release(c);
    }

    #[test]
    fn test_variable_out_of_range() {
        let value = [1.0];
        let sizes = [1usize];
        let mut status: StatusCode = -999;

        let x = adb_autodiff_variable(
            3,
            value.as_ptr(),
            1,
            sizes.as_ptr(),
            1,
            &mut status,
        );
        assert!(x.is_null());
        assert_eq!(status, ADB_INDEX_OUT_OF_BOUNDS);
    }

    #[test]
    fn test_arithmetic_and_collapse() {
        let sizes = [2usize, 1];
        let p = variable(0, &[2.0, 3.0], &sizes);
        let mut status: StatusCode = -999;

        let pp = adb_autodiff_mul(p, p, &mut status);
        assert_eq!(status, ADB_SUCCESS);
        let sum = adb_autodiff_add(pp, p, &mut status);
        assert_eq!(status, ADB_SUCCESS);

        let c = adb_autodiff_collapse(sum, &mut status);
        assert_eq!(status, ADB_SUCCESS);

        let (mut nrows, mut ncols) = (0usize, 0usize);
        assert_eq!(adb_collapsed_shape(c, &mut nrows, &mut ncols), ADB_SUCCESS);
        assert_eq!((nrows, ncols), (2, 3));
        assert_eq!(adb_collapsed_nnz(c), 2);

        let mut col_ptr = [0usize; 4];
        let mut row_idx = [0usize; 2];
        let mut values = [0.0; 2];
        assert_eq!(
            adb_collapsed_copy_csc(c, col_ptr.as_mut_ptr(), row_idx.as_mut_ptr(), values.as_mut_ptr()),
            ADB_SUCCESS
        );
        assert_eq!(col_ptr, [0, 1, 2, 2]);
        assert_eq!(row_idx, [0, 1]);
        assert_eq!(values, [5.0, 7.0]);

        let mut value = [0.0; 2];
        assert_eq!(adb_collapsed_copy_value(c, value.as_mut_ptr()), ADB_SUCCESS);
        assert_eq!(value, [6.0, 12.0]);

        adb_collapsed_release(c);
        adb_autodiff_release(sum);
        adb_autodiff_release(pp);
        adb_autodiff_release(p);
    }

    #[test]
    fn test_left_mul() {
        let sizes = [3usize];
        let x = variable(0, &[1.0, 2.0, 4.0], &sizes);
        // 2 x 3 difference operator
        let col_ptr = [0usize, 1, 3, 4];
        let row_idx = [0usize, 0, 1, 1];
        let values = [-1.0, 1.0, -1.0, 1.0];
        let mut status: StatusCode = -999;

        let y = adb_autodiff_left_mul(
            2,
            3,
            col_ptr.as_ptr(),
            row_idx.as_ptr(),
            values.as_ptr(),
            x,
            &mut status,
        );
        assert_eq!(status, ADB_SUCCESS);
        let mut out = [0.0; 2];
        assert_eq!(adb_autodiff_value(y, out.as_mut_ptr()), ADB_SUCCESS);
        assert_eq!(out, [1.0, 2.0]);

        let bad = adb_autodiff_left_mul(
            2,
            2,
            col_ptr.as_ptr(),
            row_idx.as_ptr(),
            values.as_ptr(),
            x,
            &mut status,
        );
        assert!(bad.is_null());
        assert_ne!(status, ADB_SUCCESS);

        adb_autodiff_release(y);
        adb_autodiff_release(x);
    }

    #[test]
    fn test_partition_mismatch() {
        let a = variable(0, &[1.0], &[1]);
        let b = variable(0, &[1.0], &[1, 1]);
        let mut status: StatusCode = -999;

        let c = adb_autodiff_sub(a, b, &mut status);
        assert!(c.is_null());
        assert_eq!(status, ADB_SHAPE_MISMATCH);

        let d = adb_autodiff_clone(a);
        let e = adb_autodiff_exp(d, &mut status);
        assert_eq!(status, ADB_SUCCESS);

        adb_autodiff_release(e);
        adb_autodiff_release(d);
        adb_autodiff_release(b);
        adb_autodiff_release(a);
    }

    #[cfg(feature = "check-finite")]
    #[test]
    fn test_exp_overflow_reports_non_finite() {
        let x = variable(0, &[1.0, 800.0], &[2]);
        let mut status: StatusCode = -999;

        let y = adb_autodiff_exp(x, &mut status);
        assert!(y.is_null());
        assert_eq!(status, ADB_NON_FINITE);

        adb_autodiff_release(x);
    }

    #[test]
    fn test_status_of_non_finite() {
        let err = AdError::NonFinite { op: "exp", row: 1 };
        assert_eq!(status_of(&err), ADB_NON_FINITE);
    }

    #[test]
    fn test_null_arguments() {
        let mut status: StatusCode = -999;
        assert!(adb_autodiff_add(ptr::null(), ptr::null(), &mut status).is_null());
        assert_eq!(status, ADB_INVALID_ARGUMENT);
        assert_eq!(adb_autodiff_len(ptr::null()), 0);
        assert_eq!(adb_collapsed_nnz(ptr::null()), 0);
    }
}
