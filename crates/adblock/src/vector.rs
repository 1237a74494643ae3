//! Dense value vector.
//!
//! `DenseVector` holds one `f64` per row of an AD value. Binary operators
//! require equal lengths and panic otherwise; the `try_*` forms report a
//! `RangeMismatch` instead.

use std::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::error::AdError;

/// Contiguous vector of `f64`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DenseVector {
    data: Vec<f64>,
}

impl DenseVector {
    /// Zero-initialised vector of length `len`.
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    /// Vector with every entry equal to `value`.
    pub fn filled(len: usize, value: f64) -> Self {
        Self {
            data: vec![value; len],
        }
    }

    /// Take ownership of an existing vector.
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self { data }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Raw pointer for FFI copies.
    #[inline]
    pub fn as_ptr(&self) -> *const f64 {
        self.data.as_ptr()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.data.iter()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Apply `f` to every entry.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> DenseVector {
        self.data.iter().map(|&x| f(x)).collect()
    }

    /// Combine two vectors entry by entry.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` if the lengths differ.
    pub fn try_zip_map(
        &self,
        op: &'static str,
        other: &DenseVector,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<DenseVector, AdError> {
        self.check_len(op, other.len())?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| f(a, b))
            .collect())
    }

    /// In-place counterpart of [`try_zip_map`](Self::try_zip_map).
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` if the lengths differ.
    pub fn try_zip_apply(
        &mut self,
        op: &'static str,
        other: &DenseVector,
        f: impl Fn(&mut f64, f64),
    ) -> Result<(), AdError> {
        self.check_len(op, other.len())?;
        for (a, &b) in self.data.iter_mut().zip(&other.data) {
            f(a, b);
        }
        Ok(())
    }

    /// Entries `self[indices[r]]`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::IndexOutOfBounds` for an index `>= len`.
    pub fn try_gather(&self, indices: &[usize]) -> Result<DenseVector, AdError> {
        indices
            .iter()
            .map(|&i| {
                self.data.get(i).copied().ok_or(AdError::IndexOutOfBounds {
                    index: i,
                    size: self.len(),
                })
            })
            .collect()
    }

    /// Vector of length `len` with `self[r]` added at `indices[r]`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` if `indices.len() != self.len()` and
    /// `AdError::IndexOutOfBounds` for a target `>= len`.
    pub fn try_scatter(&self, indices: &[usize], len: usize) -> Result<DenseVector, AdError> {
        self.check_len("scatter", indices.len())?;
        let mut out = vec![0.0; len];
        for (&i, &x) in indices.iter().zip(&self.data) {
            let slot = out
                .get_mut(i)
                .ok_or(AdError::IndexOutOfBounds { index: i, size: len })?;
            *slot += x;
        }
        Ok(out.into())
    }

    /// Whether every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Position of the first NaN or infinity.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.data.iter().position(|x| !x.is_finite())
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn dot(&self, other: &DenseVector) -> Result<f64, AdError> {
        self.check_len("dot", other.len())?;
        Ok(self.data.iter().zip(&other.data).map(|(a, b)| a * b).sum())
    }

    fn check_len(&self, op: &'static str, actual: usize) -> Result<(), AdError> {
        if actual == self.len() {
            Ok(())
        } else {
            Err(AdError::RangeMismatch {
                op,
                expected: self.len(),
                actual,
            })
        }
    }
}

impl From<Vec<f64>> for DenseVector {
    fn from(data: Vec<f64>) -> Self {
        Self { data }
    }
}

impl From<&[f64]> for DenseVector {
    fn from(data: &[f64]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }
}

impl<const N: usize> From<[f64; N]> for DenseVector {
    fn from(data: [f64; N]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }
}

impl FromIterator<f64> for DenseVector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DenseVector {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl AsRef<[f64]> for DenseVector {
    fn as_ref(&self) -> &[f64] {
        &self.data
    }
}

impl Index<usize> for DenseVector {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.data[i]
    }
}

impl IndexMut<usize> for DenseVector {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.data[i]
    }
}

macro_rules! impl_vector_binop {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt, $name:literal) => {
        impl $trait<&DenseVector> for &DenseVector {
            type Output = DenseVector;
            fn $method(self, rhs: &DenseVector) -> DenseVector {
                self.try_zip_map($name, rhs, |a, b| a $op b)
                    .unwrap_or_else(|e| panic!("{e}"))
            }
        }

        impl $trait<f64> for &DenseVector {
            type Output = DenseVector;
            fn $method(self, rhs: f64) -> DenseVector {
                self.map(|a| a $op rhs)
            }
        }

        impl $trait<&DenseVector> for f64 {
            type Output = DenseVector;
            fn $method(self, rhs: &DenseVector) -> DenseVector {
                rhs.map(|b| self $op b)
            }
        }

        impl $assign_trait<&DenseVector> for DenseVector {
            fn $assign_method(&mut self, rhs: &DenseVector) {
                self.try_zip_apply($name, rhs, |a, b| *a = *a $op b)
                    .unwrap_or_else(|e| panic!("{e}"))
            }
        }

        impl $assign_trait<f64> for DenseVector {
            fn $assign_method(&mut self, rhs: f64) {
                for a in &mut self.data {
                    *a = *a $op rhs;
                }
            }
        }
    };
}

impl_vector_binop!(Add, add, AddAssign, add_assign, +, "add");
impl_vector_binop!(Sub, sub, SubAssign, sub_assign, -, "sub");
impl_vector_binop!(Mul, mul, MulAssign, mul_assign, *, "mul");
impl_vector_binop!(Div, div, DivAssign, div_assign, /, "div");

impl Neg for &DenseVector {
    type Output = DenseVector;
    fn neg(self) -> DenseVector {
        self.map(|a| -a)
    }
}

impl Neg for DenseVector {
    type Output = DenseVector;
    fn neg(mut self) -> DenseVector {
        for a in &mut self.data {
            *a = -*a;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_and_filled() {
        let z = DenseVector::zeros(3);
        assert_eq!(z.as_slice(), &[0.0, 0.0, 0.0]);
        let f = DenseVector::filled(2, 1.5);
        assert_eq!(f.as_slice(), &[1.5, 1.5]);
        assert!(DenseVector::default().is_empty());
    }

    #[test]
    fn test_elementwise_ops() {
        let a = DenseVector::from([1.0, 2.0, 3.0]);
        let b = DenseVector::from([4.0, 5.0, 6.0]);
        assert_eq!((&a + &b).as_slice(), &[5.0, 7.0, 9.0]);
        assert_eq!((&b - &a).as_slice(), &[3.0, 3.0, 3.0]);
        assert_eq!((&a * &b).as_slice(), &[4.0, 10.0, 18.0]);
        assert_eq!((&b / &a).as_slice(), &[4.0, 2.5, 2.0]);
        assert_eq!((-&a).as_slice(), &[-1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_scalar_ops() {
        let a = DenseVector::from([1.0, 2.0]);
        assert_eq!((&a * 2.0).as_slice(), &[2.0, 4.0]);
        assert_eq!((1.0 - &a).as_slice(), &[0.0, -1.0]);
        assert_eq!((2.0 / &a).as_slice(), &[2.0, 1.0]);
    }

    #[test]
    fn test_assign_ops() {
        let mut a = DenseVector::from([1.0, 2.0]);
        a += &DenseVector::from([1.0, 1.0]);
        a *= 3.0;
        assert_eq!(a.as_slice(), &[6.0, 9.0]);
        a -= &DenseVector::from([6.0, 9.0]);
        assert_eq!(a.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn test_length_mismatch() {
        let a = DenseVector::from([1.0, 2.0]);
        let b = DenseVector::from([1.0]);
        assert_eq!(
            a.try_zip_map("add", &b, |x, y| x + y),
            Err(AdError::RangeMismatch {
                op: "add",
                expected: 2,
                actual: 1,
            })
        );
    }

    #[test]
    #[should_panic(expected = "range mismatch in add")]
    fn test_operator_panics_on_mismatch() {
        let _ = &DenseVector::zeros(2) + &DenseVector::zeros(3);
    }

    #[test]
    fn test_gather_scatter() {
        let a = DenseVector::from([10.0, 20.0, 30.0]);
        let g = a.try_gather(&[2, 0, 2]).unwrap();
        assert_eq!(g.as_slice(), &[30.0, 10.0, 30.0]);
        assert!(a.try_gather(&[3]).is_err());

        let s = DenseVector::from([1.0, 2.0]).try_scatter(&[3, 1], 4).unwrap();
        assert_eq!(s.as_slice(), &[0.0, 2.0, 0.0, 1.0]);
        assert!(DenseVector::from([1.0]).try_scatter(&[4], 4).is_err());
    }

    #[test]
    fn test_finiteness() {
        let a = DenseVector::from([1.0, f64::NAN, f64::INFINITY]);
        assert!(!a.is_finite());
        assert_eq!(a.first_non_finite(), Some(1));
        assert!(DenseVector::from([0.0]).is_finite());
    }

    #[test]
    fn test_sum_and_dot() {
        let a = DenseVector::from([1.0, 2.0, 3.0]);
        assert_eq!(a.sum(), 6.0);
        assert_eq!(a.dot(&a).unwrap(), 14.0);
    }
}
