//! faer interoperability.
//!
//! The engine itself never factorises anything. These conversions hand a
//! collapsed system to faer-based solvers and render sparse blocks densely
//! for inspection.

mod faer_interop;

pub use faer_interop::{AsFaerCol, from_dense, to_dense, to_faer_sparse, vector_from_faer};
