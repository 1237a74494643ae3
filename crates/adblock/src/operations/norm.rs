//! Vector norms.

use crate::error::AdError;
use crate::partition::BlockPartition;
use crate::vector::DenseVector;

/// Euclidean norm.
///
/// # Example
///
/// ```
/// use adblock::DenseVector;
/// use adblock::operations::norm_l2;
///
/// let v = DenseVector::from([3.0, 4.0]);
/// assert!((norm_l2(&v) - 5.0).abs() < 1e-10);
/// ```
pub fn norm_l2(v: &DenseVector) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Sum of absolute values.
pub fn norm_l1(v: &DenseVector) -> f64 {
    v.iter().map(|x| x.abs()).sum()
}

/// Largest absolute value; zero for an empty vector, NaN if any entry is NaN.
pub fn norm_inf(v: &DenseVector) -> f64 {
    v.iter().fold(0.0_f64, |acc, &x| {
        if x.is_nan() || acc.is_nan() {
            f64::NAN
        } else {
            acc.max(x.abs())
        }
    })
}

/// Max norm of each block of a residual laid out by `partition`, the
/// convergence measure of a Newton loop over a collapsed system.
///
/// # Errors
///
/// Returns `AdError::RangeMismatch` if `residual.len() != total_size`.
pub fn residual_norms(
    residual: &DenseVector,
    partition: &BlockPartition,
) -> Result<Vec<f64>, AdError> {
    Ok(partition
        .split(residual.as_slice())?
        .into_iter()
        .map(|block| norm_inf(&block.into()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_norms() {
        let v = DenseVector::from([3.0, -4.0]);
        assert_relative_eq!(norm_l2(&v), 5.0, epsilon = 1e-10);
        assert_relative_eq!(norm_l1(&v), 7.0, epsilon = 1e-10);
        assert_relative_eq!(norm_inf(&v), 4.0, epsilon = 1e-10);
    }

    #[test]
    fn test_norms_of_empty() {
        let v = DenseVector::default();
        assert_eq!(norm_l2(&v), 0.0);
        assert_eq!(norm_inf(&v), 0.0);
    }

    #[test]
    fn test_norm_inf_nan() {
        let v = DenseVector::from([1.0, f64::NAN, 2.0]);
        assert!(norm_inf(&v).is_nan());
    }

    #[test]
    fn test_residual_norms() {
        let p = BlockPartition::new([2, 1]);
        let r = DenseVector::from([0.5, -2.0, 0.1]);
        assert_eq!(residual_norms(&r, &p).unwrap(), vec![2.0, 0.1]);
        assert!(residual_norms(&DenseVector::zeros(2), &p).is_err());
    }
}
