//! Random vectors and sparse matrices for tests and benchmarks.

use rand::Rng;
use rand::distr::StandardUniform;
use rand_distr::StandardNormal;

use crate::sparse::SparseMatrix;
use crate::vector::DenseVector;

impl DenseVector {
    /// Uniform random entries in `[0, 1)`.
    ///
    /// # Example
    ///
    /// ```
    /// use adblock::DenseVector;
    ///
    /// let v = DenseVector::random(4);
    /// assert_eq!(v.len(), 4);
    /// assert!(v.iter().all(|&x| (0.0..1.0).contains(&x)));
    /// ```
    pub fn random(len: usize) -> Self {
        Self::random_with_rng(len, &mut rand::rng())
    }

    /// Uniform random entries from a caller-supplied RNG, for reproducible
    /// runs with a seeded generator.
    ///
    /// # Example
    ///
    /// ```
    /// use adblock::DenseVector;
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let a = DenseVector::random_with_rng(3, &mut StdRng::seed_from_u64(42));
    /// let b = DenseVector::random_with_rng(3, &mut StdRng::seed_from_u64(42));
    /// assert_eq!(a, b);
    /// ```
    pub fn random_with_rng<R: Rng>(len: usize, rng: &mut R) -> Self {
        (0..len).map(|_| rng.sample(StandardUniform)).collect()
    }

    /// Standard normal entries.
    pub fn randn(len: usize) -> Self {
        Self::randn_with_rng(len, &mut rand::rng())
    }

    pub fn randn_with_rng<R: Rng>(len: usize, rng: &mut R) -> Self {
        (0..len).map(|_| rng.sample(StandardNormal)).collect()
    }
}

impl SparseMatrix {
    /// Random sparsity pattern: each entry is stored with probability
    /// `density` (clamped to `[0, 1]`) and drawn from the standard normal
    /// distribution.
    pub fn random(nrows: usize, ncols: usize, density: f64) -> Self {
        Self::random_with_rng(nrows, ncols, density, &mut rand::rng())
    }

    pub fn random_with_rng<R: Rng>(nrows: usize, ncols: usize, density: f64, rng: &mut R) -> Self {
        let p = if density.is_nan() { 0.0 } else { density.clamp(0.0, 1.0) };
        let mut triplets = Vec::new();
        for j in 0..ncols {
            for i in 0..nrows {
                if rng.random_bool(p) {
                    triplets.push((i, j, rng.sample(StandardNormal)));
                }
            }
        }
        Self::from_triplets(nrows, ncols, &triplets)
            .expect("random_with_rng: triplets are generated in bounds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_randn_reproducible() {
        let a = DenseVector::randn_with_rng(5, &mut StdRng::seed_from_u64(7));
        let b = DenseVector::randn_with_rng(5, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.is_finite());
    }

    #[test]
    fn test_random_sparse_density_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let full = SparseMatrix::random_with_rng(4, 5, 1.0, &mut rng);
        assert_eq!(full.nnz(), 20);
        let none = SparseMatrix::random_with_rng(4, 5, 0.0, &mut rng);
        assert_eq!(none.nnz(), 0);
        assert_eq!(none.shape(), (4, 5));
        let clamped = SparseMatrix::random_with_rng(2, 2, 7.0, &mut rng);
        assert_eq!(clamped.nnz(), 4);
    }
}
