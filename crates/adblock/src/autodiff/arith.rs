//! Arithmetic on AD values and the chain rule.
//!
//! For every variable block `k`:
//!
//! ```text
//! x + y   J[k] = Jx[k] + Jy[k]
//! x - y   J[k] = Jx[k] - Jy[k]
//! x * y   J[k] = diag(vx) Jy[k] + diag(vy) Jx[k]
//! x / y   J[k] = diag(1/vy) Jx[k] - diag(vx/vy^2) Jy[k]
//! M * x   J[k] = M Jx[k]
//! ```
//!
//! Operands that are `f64` or [`DenseVector`] act as constants. The `try_*`
//! methods report contract violations; the operators panic on them.

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use super::jacobian::{JacobianList, map_blocks, zip_blocks};
use super::value::AutoDiffBlock;
use crate::error::AdError;
use crate::sparse::SparseMatrix;
use crate::vector::DenseVector;

fn sum_jacobians(x: &AutoDiffBlock, y: &AutoDiffBlock) -> Result<JacobianList, AdError> {
    zip_blocks(x, y, SparseMatrix::try_add)
}

fn difference_jacobians(x: &AutoDiffBlock, y: &AutoDiffBlock) -> Result<JacobianList, AdError> {
    zip_blocks(x, y, SparseMatrix::try_sub)
}

fn product_jacobians(x: &AutoDiffBlock, y: &AutoDiffBlock) -> Result<JacobianList, AdError> {
    let (vx, vy) = (x.value().as_slice(), y.value().as_slice());
    zip_blocks(x, y, |jx, jy| {
        jy.try_scale_rows(vx)?.try_add(&jx.try_scale_rows(vy)?)
    })
}

fn quotient_jacobians(x: &AutoDiffBlock, y: &AutoDiffBlock) -> Result<JacobianList, AdError> {
    let (vx, vy) = (x.value().as_slice(), y.value().as_slice());
    let inv_y: Vec<f64> = vy.iter().map(|b| 1.0 / b).collect();
    let dy: Vec<f64> = vx.iter().zip(vy).map(|(a, b)| a / (b * b)).collect();
    zip_blocks(x, y, |jx, jy| {
        jx.try_scale_rows(&inv_y)?.try_sub(&jy.try_scale_rows(&dy)?)
    })
}

impl AutoDiffBlock {
    fn check_len(&self, op: &'static str, rhs: &AutoDiffBlock) -> Result<(), AdError> {
        if self.len() == rhs.len() {
            Ok(())
        } else {
            Err(AdError::RangeMismatch {
                op,
                expected: self.len(),
                actual: rhs.len(),
            })
        }
    }

    fn binary(
        &self,
        op: &'static str,
        rhs: &AutoDiffBlock,
        jacobians: fn(&AutoDiffBlock, &AutoDiffBlock) -> Result<JacobianList, AdError>,
        f: fn(f64, f64) -> f64,
    ) -> Result<AutoDiffBlock, AdError> {
        self.check_len(op, rhs)?;
        let jacobians = jacobians(self, rhs)?;
        let value = self.value().try_zip_map(op, rhs.value(), f)?;
        AutoDiffBlock::from_parts(value, jacobians).finish(op)
    }

    fn assign(
        &mut self,
        op: &'static str,
        rhs: &AutoDiffBlock,
        jacobians: fn(&AutoDiffBlock, &AutoDiffBlock) -> Result<JacobianList, AdError>,
        f: fn(&mut f64, f64),
    ) -> Result<(), AdError> {
        self.check_len(op, rhs)?;
        // Jacobians first: the product and quotient rules read the old value.
        let jacobians = jacobians(self, rhs)?;
        let mut value = self.value().clone();
        value.try_zip_apply(op, rhs.value(), f)?;
        *self = AutoDiffBlock::from_parts(value, jacobians).finish(op)?;
        Ok(())
    }

    /// `self + rhs`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` for different lengths and
    /// `AdError::PartitionMismatch` for incompatible partitions.
    pub fn try_add(&self, rhs: &AutoDiffBlock) -> Result<AutoDiffBlock, AdError> {
        self.binary("add", rhs, sum_jacobians, |a, b| a + b)
    }

    /// `self - rhs`.
    ///
    /// # Errors
    ///
    /// As [`try_add`](Self::try_add).
    pub fn try_sub(&self, rhs: &AutoDiffBlock) -> Result<AutoDiffBlock, AdError> {
        self.binary("sub", rhs, difference_jacobians, |a, b| a - b)
    }

    /// Elementwise product.
    ///
    /// # Errors
    ///
    /// As [`try_add`](Self::try_add).
    pub fn try_mul(&self, rhs: &AutoDiffBlock) -> Result<AutoDiffBlock, AdError> {
        self.binary("mul", rhs, product_jacobians, |a, b| a * b)
    }

    /// Elementwise quotient. Division by zero yields IEEE infinities.
    ///
    /// # Errors
    ///
    /// As [`try_add`](Self::try_add).
    pub fn try_div(&self, rhs: &AutoDiffBlock) -> Result<AutoDiffBlock, AdError> {
        self.binary("div", rhs, quotient_jacobians, |a, b| a / b)
    }

    /// In-place `self += rhs`, observationally identical to `self + rhs`.
    ///
    /// # Errors
    ///
    /// As [`try_add`](Self::try_add). `self` is untouched on any error,
    /// including `AdError::NonFinite` under `check-finite`.
    pub fn try_add_assign(&mut self, rhs: &AutoDiffBlock) -> Result<(), AdError> {
        self.assign("add", rhs, sum_jacobians, |a, b| *a += b)
    }

    pub fn try_sub_assign(&mut self, rhs: &AutoDiffBlock) -> Result<(), AdError> {
        self.assign("sub", rhs, difference_jacobians, |a, b| *a -= b)
    }

    pub fn try_mul_assign(&mut self, rhs: &AutoDiffBlock) -> Result<(), AdError> {
        self.assign("mul", rhs, product_jacobians, |a, b| *a *= b)
    }

    pub fn try_div_assign(&mut self, rhs: &AutoDiffBlock) -> Result<(), AdError> {
        self.assign("div", rhs, quotient_jacobians, |a, b| *a /= b)
    }

    /// `m * self` for a fixed sparse matrix `m`: value `m v`, blocks `m J[k]`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` if `m.ncols() != len`.
    ///
    /// # Example
    ///
    /// ```
    /// use adblock::{AutoDiffBlock, BlockPartition};
    /// use adblock::sparse::SparseMatrix;
    ///
    /// let x = AutoDiffBlock::variable(0, [1.0, 2.0], &BlockPartition::new([2])).unwrap();
    /// // Difference operator over one face.
    /// let grad = SparseMatrix::from_triplets(1, 2, &[(0, 0, -1.0), (0, 1, 1.0)]).unwrap();
    /// let dx = x.try_left_mul(&grad).unwrap();
    /// assert_eq!(dx.value().as_slice(), &[1.0]);
    /// assert_eq!(dx.jacobian(0).get(0, 0), -1.0);
    /// ```
    pub fn try_left_mul(&self, m: &SparseMatrix) -> Result<AutoDiffBlock, AdError> {
        let value = DenseVector::from_vec(m.try_mul_vec(self.value().as_slice())?);
        let jacobians = map_blocks(self, |j| m.try_mul(j))?;
        AutoDiffBlock::from_parts(value, jacobians).finish("left_mul")
    }

    /// Value shifted by a constant; Jacobians shared.
    fn shifted(&self, value: DenseVector) -> AutoDiffBlock {
        AutoDiffBlock::from_parts(value, self.derivative().iter().cloned().collect())
    }

    /// Value and Jacobians multiplied by `alpha`.
    fn scaled(&self, alpha: f64) -> AutoDiffBlock {
        AutoDiffBlock::from_parts(
            self.value() * alpha,
            self.derivative().iter().map(|j| j.scale(alpha)).collect(),
        )
    }
}

fn or_panic<T>(result: Result<T, AdError>) -> T {
    result.unwrap_or_else(|e| panic!("{e}"))
}

macro_rules! impl_ad_binop {
    ($trait:ident, $method:ident, $try_method:ident, $assign_trait:ident, $assign_method:ident, $try_assign:ident) => {
        impl $trait<&AutoDiffBlock> for &AutoDiffBlock {
            type Output = AutoDiffBlock;
            fn $method(self, rhs: &AutoDiffBlock) -> AutoDiffBlock {
                or_panic(self.$try_method(rhs))
            }
        }

        impl $trait<AutoDiffBlock> for AutoDiffBlock {
            type Output = AutoDiffBlock;
            fn $method(self, rhs: AutoDiffBlock) -> AutoDiffBlock {
                or_panic(self.$try_method(&rhs))
            }
        }

        impl $trait<&AutoDiffBlock> for AutoDiffBlock {
            type Output = AutoDiffBlock;
            fn $method(self, rhs: &AutoDiffBlock) -> AutoDiffBlock {
                or_panic(self.$try_method(rhs))
            }
        }

        impl $trait<&DenseVector> for &AutoDiffBlock {
            type Output = AutoDiffBlock;
            fn $method(self, rhs: &DenseVector) -> AutoDiffBlock {
                let rhs = AutoDiffBlock::constant_without_partition(rhs.clone());
                or_panic(self.$try_method(&rhs))
            }
        }

        impl $trait<&AutoDiffBlock> for &DenseVector {
            type Output = AutoDiffBlock;
            fn $method(self, rhs: &AutoDiffBlock) -> AutoDiffBlock {
                let lhs = AutoDiffBlock::constant_without_partition(self.clone());
                or_panic(lhs.$try_method(rhs))
            }
        }

        impl $assign_trait<&AutoDiffBlock> for AutoDiffBlock {
            fn $assign_method(&mut self, rhs: &AutoDiffBlock) {
                or_panic(self.$try_assign(rhs))
            }
        }

        impl $assign_trait<AutoDiffBlock> for AutoDiffBlock {
            fn $assign_method(&mut self, rhs: AutoDiffBlock) {
                or_panic(self.$try_assign(&rhs))
            }
        }

        impl $assign_trait<&DenseVector> for AutoDiffBlock {
            fn $assign_method(&mut self, rhs: &DenseVector) {
                let rhs = AutoDiffBlock::constant_without_partition(rhs.clone());
                or_panic(self.$try_assign(&rhs))
            }
        }
    };
}

impl_ad_binop!(Add, add, try_add, AddAssign, add_assign, try_add_assign);
impl_ad_binop!(Sub, sub, try_sub, SubAssign, sub_assign, try_sub_assign);
impl_ad_binop!(Mul, mul, try_mul, MulAssign, mul_assign, try_mul_assign);
impl_ad_binop!(Div, div, try_div, DivAssign, div_assign, try_div_assign);

impl Neg for &AutoDiffBlock {
    type Output = AutoDiffBlock;
    fn neg(self) -> AutoDiffBlock {
        AutoDiffBlock::from_parts(
            -self.value(),
            self.derivative().iter().map(|j| -j).collect(),
        )
    }
}

impl Neg for AutoDiffBlock {
    type Output = AutoDiffBlock;
    fn neg(self) -> AutoDiffBlock {
        -&self
    }
}

impl Mul<&AutoDiffBlock> for &SparseMatrix {
    type Output = AutoDiffBlock;
    fn mul(self, x: &AutoDiffBlock) -> AutoDiffBlock {
        or_panic(x.try_left_mul(self))
    }
}

// ============================================================================
// Scalar operands
// ============================================================================

impl Add<f64> for &AutoDiffBlock {
    type Output = AutoDiffBlock;
    fn add(self, c: f64) -> AutoDiffBlock {
        or_panic(self.shifted(self.value() + c).finish("add"))
    }
}

impl Add<&AutoDiffBlock> for f64 {
    type Output = AutoDiffBlock;
    fn add(self, x: &AutoDiffBlock) -> AutoDiffBlock {
        x + self
    }
}

impl Sub<f64> for &AutoDiffBlock {
    type Output = AutoDiffBlock;
    fn sub(self, c: f64) -> AutoDiffBlock {
        or_panic(self.shifted(self.value() - c).finish("sub"))
    }
}

impl Sub<&AutoDiffBlock> for f64 {
    type Output = AutoDiffBlock;
    fn sub(self, x: &AutoDiffBlock) -> AutoDiffBlock {
        or_panic((-x).shifted(self - x.value()).finish("sub"))
    }
}

impl Mul<f64> for &AutoDiffBlock {
    type Output = AutoDiffBlock;
    fn mul(self, c: f64) -> AutoDiffBlock {
        or_panic(self.scaled(c).finish("mul"))
    }
}

impl Mul<&AutoDiffBlock> for f64 {
    type Output = AutoDiffBlock;
    fn mul(self, x: &AutoDiffBlock) -> AutoDiffBlock {
        x * self
    }
}

impl Div<f64> for &AutoDiffBlock {
    type Output = AutoDiffBlock;
    fn div(self, c: f64) -> AutoDiffBlock {
        or_panic(self.scaled(1.0 / c).finish("div"))
    }
}

impl Div<&AutoDiffBlock> for f64 {
    type Output = AutoDiffBlock;
    fn div(self, x: &AutoDiffBlock) -> AutoDiffBlock {
        // d(c/v) = -c/v^2 dv
        let c = self;
        x.chain("div", |v| c / v, |v| -c / (v * v))
    }
}

macro_rules! impl_scalar_owned {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl $trait<f64> for AutoDiffBlock {
            type Output = AutoDiffBlock;
            fn $method(self, c: f64) -> AutoDiffBlock {
                &self $op c
            }
        }

        impl $trait<AutoDiffBlock> for f64 {
            type Output = AutoDiffBlock;
            fn $method(self, x: AutoDiffBlock) -> AutoDiffBlock {
                self $op &x
            }
        }

        impl $assign_trait<f64> for AutoDiffBlock {
            fn $assign_method(&mut self, c: f64) {
                *self = &*self $op c;
            }
        }
    };
}

impl_scalar_owned!(Add, add, AddAssign, add_assign, +);
impl_scalar_owned!(Sub, sub, SubAssign, sub_assign, -);
impl_scalar_owned!(Mul, mul, MulAssign, mul_assign, *);
impl_scalar_owned!(Div, div, DivAssign, div_assign, /);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::BlockPartition;
    use approx::assert_relative_eq;

    fn xy() -> (AutoDiffBlock, AutoDiffBlock) {
        let mut vars = AutoDiffBlock::variables(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let y = vars.pop().unwrap();
        let x = vars.pop().unwrap();
        (x, y)
    }

    #[test]
    fn test_add_keeps_empty_blocks_empty() {
        let p = BlockPartition::new([3, 1]);
        let x = AutoDiffBlock::variable(0, [1.0, 2.0, 3.0], &p).unwrap();
        let z = &x + &x;
        assert_eq!(z.value().as_slice(), &[2.0, 4.0, 6.0]);
        assert_eq!(z.jacobian(0), &SparseMatrix::identity(3).scale(2.0));
        assert!(z.jacobian(1).is_empty());
    }

    #[test]
    fn test_product_rule() {
        let (x, y) = xy();
        let z = &x * &y;
        assert_eq!(z.value().as_slice(), &[4.0, 10.0, 18.0]);
        // dz/dx = diag(vy), dz/dy = diag(vx)
        assert_eq!(z.jacobian(0), &SparseMatrix::diagonal(&[4.0, 5.0, 6.0]));
        assert_eq!(z.jacobian(1), &SparseMatrix::diagonal(&[1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_quotient_rule() {
        let (x, y) = xy();
        let z = &x / &y;
        assert_relative_eq!(z.value()[1], 0.4);
        assert_relative_eq!(z.jacobian(0).get(1, 1), 1.0 / 5.0);
        assert_relative_eq!(z.jacobian(1).get(1, 1), -2.0 / 25.0);
        assert_eq!(z.jacobian(0).get(0, 1), 0.0);
    }

    #[test]
    fn test_neg() {
        let (x, _) = xy();
        let z = -&x;
        assert_eq!(z.value().as_slice(), &[-1.0, -2.0, -3.0]);
        assert_eq!(z.jacobian(0).get(2, 2), -1.0);
        assert!(z.jacobian(1).is_empty());
    }

    #[test]
    fn test_range_mismatch() {
        let p = BlockPartition::new([3, 2]);
        let x = AutoDiffBlock::variable(0, [1.0, 2.0, 3.0], &p).unwrap();
        let y = AutoDiffBlock::variable(1, [1.0, 2.0], &p).unwrap();
        assert_eq!(
            x.try_add(&y).unwrap_err(),
            AdError::RangeMismatch {
                op: "add",
                expected: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn test_partition_mismatch() {
        let x = AutoDiffBlock::variable(0, [1.0], &BlockPartition::new([1, 2])).unwrap();
        let y = AutoDiffBlock::variable(0, [1.0], &BlockPartition::new([1, 3])).unwrap();
        assert!(matches!(
            x.try_mul(&y),
            Err(AdError::PartitionMismatch { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "range mismatch")]
    fn test_operator_panics() {
        let (x, _) = xy();
        let short = AutoDiffBlock::constant_without_partition([1.0]);
        let _ = &x + &short;
    }

    #[test]
    fn test_assign_leaves_self_on_error() {
        let (mut x, _) = xy();
        let before = x.clone();
        let short = AutoDiffBlock::constant_without_partition([1.0]);
        assert!(x.try_mul_assign(&short).is_err());
        assert_eq!(x, before);
    }

    #[cfg(feature = "check-finite")]
    #[test]
    fn test_assign_leaves_self_on_non_finite() {
        let mut x = AutoDiffBlock::variable(0, [0.0], &BlockPartition::new([1])).unwrap();
        let before = x.clone();
        let result = x.try_div_assign(&before);
        assert!(matches!(result, Err(AdError::NonFinite { op: "div", row: 0 })));
        assert_eq!(x, before);
    }

    #[test]
    fn test_mul_assign_matches_binary() {
        let (x, y) = xy();
        let mut z = x.clone();
        z *= &y;
        assert_eq!(z, &x * &y);
        let mut q = x.clone();
        q /= &y;
        assert_eq!(q, &x / &y);
    }

    #[test]
    fn test_left_mul() {
        let (x, _) = xy();
        let m = SparseMatrix::from_triplets(2, 3, &[(0, 0, 1.0), (0, 2, 1.0), (1, 1, 2.0)]).unwrap();
        let z = &m * &x;
        assert_eq!(z.value().as_slice(), &[4.0, 4.0]);
        assert_eq!(z.jacobian(0), &m);
        assert!(z.jacobian(1).is_empty());
        assert_eq!(z.jacobian(1).shape(), (2, 3));
    }

    #[test]
    fn test_left_mul_mismatch() {
        let (x, _) = xy();
        assert!(x.try_left_mul(&SparseMatrix::identity(2)).is_err());
    }

    #[test]
    fn test_scalar_operands() {
        let (x, _) = xy();
        let a = &x + 1.0;
        assert_eq!(a.value().as_slice(), &[2.0, 3.0, 4.0]);
        assert_eq!(a.jacobian(0), x.jacobian(0));

        let b = 10.0 - &x;
        assert_eq!(b.value().as_slice(), &[9.0, 8.0, 7.0]);
        assert_eq!(b.jacobian(0).get(0, 0), -1.0);

        let c = 3.0 * &x;
        assert_eq!(c.jacobian(0).get(1, 1), 3.0);

        let d = &x / 2.0;
        assert_eq!(d.value().as_slice(), &[0.5, 1.0, 1.5]);
        assert_eq!(d.jacobian(0).get(2, 2), 0.5);

        let e = 1.0 / &x;
        assert_relative_eq!(e.jacobian(0).get(1, 1), -0.25);
    }

    #[test]
    fn test_scalar_assign() {
        let (mut x, _) = xy();
        x *= 2.0;
        x += 1.0;
        assert_eq!(x.value().as_slice(), &[3.0, 5.0, 7.0]);
        assert_eq!(x.jacobian(0).get(0, 0), 2.0);
    }

    #[test]
    fn test_dense_vector_operand() {
        let (x, _) = xy();
        let v = DenseVector::from([2.0, 2.0, 2.0]);
        let z = &x * &v;
        assert_eq!(z.value().as_slice(), &[2.0, 4.0, 6.0]);
        assert_eq!(z.jacobian(0), &SparseMatrix::diagonal(&[2.0, 2.0, 2.0]));
        assert!(z.jacobian(1).is_empty());

        let w = &v - &x;
        assert_eq!(w.value().as_slice(), &[1.0, 0.0, -1.0]);
        assert_eq!(w.jacobian(0).get(1, 1), -1.0);
    }

    #[test]
    fn test_shapeless_constant_adopts_partition() {
        let (x, _) = xy();
        let c = AutoDiffBlock::constant_without_partition([1.0, 1.0, 1.0]);
        let z = &c - &x;
        assert_eq!(z.num_blocks(), 2);
        assert_eq!(z.jacobian(0).get(0, 0), -1.0);
        assert_eq!(z.jacobian(1).shape(), (3, 3));
    }
}
