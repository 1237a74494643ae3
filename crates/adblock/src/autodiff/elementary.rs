//! Elementwise functions: `f(x)` has Jacobian blocks `diag(f'(v)) J[k]`.

use super::jacobian::{map_blocks, zip_blocks};
use super::value::AutoDiffBlock;
use crate::error::AdError;

impl AutoDiffBlock {
    /// Apply `f` to the value and scale every Jacobian row by `df(v)`.
    ///
    /// # Errors
    ///
    /// With the `check-finite` feature, returns `AdError::NonFinite` if the
    /// result is not finite.
    pub(crate) fn try_chain(
        &self,
        op: &'static str,
        f: impl Fn(f64) -> f64,
        df: impl Fn(f64) -> f64,
    ) -> Result<AutoDiffBlock, AdError> {
        let value = self.value().map(f);
        let d = self.value().map(df);
        let jacobians = map_blocks(self, |j| j.try_scale_rows(d.as_slice()))
            .expect("chain: derivative length matches value");
        AutoDiffBlock::from_parts(value, jacobians).finish(op)
    }

    /// Panicking form of [`try_chain`](Self::try_chain).
    pub(crate) fn chain(
        &self,
        op: &'static str,
        f: impl Fn(f64) -> f64,
        df: impl Fn(f64) -> f64,
    ) -> AutoDiffBlock {
        self.try_chain(op, f, df)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Fallible `1 / x`.
    ///
    /// # Errors
    ///
    /// With the `check-finite` feature, returns `AdError::NonFinite` for a
    /// zero entry. The other `try_*` elementary functions behave the same.
    pub fn try_recip(&self) -> Result<AutoDiffBlock, AdError> {
        self.try_chain("recip", |v| 1.0 / v, |v| -1.0 / (v * v))
    }

    /// Fallible square root.
    pub fn try_sqrt(&self) -> Result<AutoDiffBlock, AdError> {
        self.try_chain("sqrt", f64::sqrt, |v| 0.5 / v.sqrt())
    }

    pub fn try_exp(&self) -> Result<AutoDiffBlock, AdError> {
        self.try_chain("exp", f64::exp, f64::exp)
    }

    /// Fallible natural logarithm.
    pub fn try_ln(&self) -> Result<AutoDiffBlock, AdError> {
        self.try_chain("ln", f64::ln, |v| 1.0 / v)
    }

    /// `1 / x`.
    pub fn recip(&self) -> AutoDiffBlock {
        self.try_recip().unwrap_or_else(|e| panic!("{e}"))
    }

    /// Square root. Negative entries give NaN.
    pub fn sqrt(&self) -> AutoDiffBlock {
        self.try_sqrt().unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn exp(&self) -> AutoDiffBlock {
        self.try_exp().unwrap_or_else(|e| panic!("{e}"))
    }

    /// Natural logarithm. Non-positive entries give NaN or `-inf`.
    pub fn ln(&self) -> AutoDiffBlock {
        self.try_ln().unwrap_or_else(|e| panic!("{e}"))
    }

    /// `x^p` for a constant exponent.
    pub fn powf(&self, p: f64) -> AutoDiffBlock {
        self.chain("powf", |v| v.powf(p), |v| p * v.powf(p - 1.0))
    }

    pub fn square(&self) -> AutoDiffBlock {
        self.chain("square", |v| v * v, |v| 2.0 * v)
    }

    /// Absolute value; the derivative at zero is taken as zero.
    pub fn abs(&self) -> AutoDiffBlock {
        self.chain("abs", f64::abs, |v| {
            if v > 0.0 {
                1.0
            } else if v < 0.0 {
                -1.0
            } else {
                0.0
            }
        })
    }

    /// `x^y` with both base and exponent differentiated:
    /// `J[k] = diag(y x^(y-1)) Jx[k] + diag(x^y ln x) Jy[k]`.
    ///
    /// # Errors
    ///
    /// Returns `AdError::RangeMismatch` for different lengths and
    /// `AdError::PartitionMismatch` for incompatible partitions.
    pub fn try_pow(&self, exponent: &AutoDiffBlock) -> Result<AutoDiffBlock, AdError> {
        let value = self
            .value()
            .try_zip_map("pow", exponent.value(), f64::powf)?;
        let dx = self
            .value()
            .try_zip_map("pow", exponent.value(), |x, y| y * x.powf(y - 1.0))?;
        let dy = self
            .value()
            .try_zip_map("pow", exponent.value(), |x, y| x.powf(y) * x.ln())?;
        let jacobians = zip_blocks(self, exponent, |jx, jy| {
            jx.try_scale_rows(dx.as_slice())?
                .try_add(&jy.try_scale_rows(dy.as_slice())?)
        })?;
        AutoDiffBlock::from_parts(value, jacobians).finish("pow")
    }

    /// Panicking form of [`try_pow`](Self::try_pow).
    pub fn pow(&self, exponent: &AutoDiffBlock) -> AutoDiffBlock {
        self.try_pow(exponent).unwrap_or_else(|e| panic!("{e}"))
    }
}
