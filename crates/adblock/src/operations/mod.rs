//! Reductions over AD values and value vectors.
//!
//! ```text
//! norm    → norm_l1, norm_l2, norm_inf     (DenseVector → f64)
//!         → residual_norms                 (per-block max norm of a residual)
//! reduce  → sum, dot                       (AutoDiffBlock → 1-row AutoDiffBlock)
//! ```

mod norm;
mod reduce;

pub use norm::{norm_inf, norm_l1, norm_l2, residual_norms};
pub use reduce::{dot, sum};
