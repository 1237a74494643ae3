//! adblock - forward-mode automatic differentiation over block-structured
//! sparse Jacobians.
//!
//! The crate expresses the residual of a fully implicit simulator together
//! with its exact Jacobian, without hand-coded derivatives. Unknowns are
//! grouped into independent variable blocks (for example cell pressures and
//! cell saturations); every AD value keeps one sparse Jacobian per block.
//!
//! # Architecture
//!
//! ```text
//! Level 1: AD values (autodiff module)
//!     → AutoDiffBlock: constant, variable, arithmetic, select, collapse
//!
//! Level 2: Building blocks
//!     → SparseMatrix (sparse), DenseVector (vector), BlockPartition (partition)
//!
//! Level 3: Interop and utilities
//!     → faer conversion (backend), norms and sums (operations), random data
//! ```
//!
//! # Example
//!
//! ```
//! use adblock::{AutoDiffBlock, BlockPartition};
//!
//! // Two blocks: three pressures and one well rate.
//! let partition = BlockPartition::new([3, 1]);
//! let p = AutoDiffBlock::variable(0, [100.0, 90.0, 80.0], &partition).unwrap();
//! let q = AutoDiffBlock::variable(1, [5.0], &partition).unwrap();
//!
//! let residual = &p * &p - 1.0;
//! assert_eq!(residual.jacobian(0).get(1, 1), 180.0);
//! assert!(residual.jacobian(1).is_empty());
//! assert_eq!(q.jacobian(1).get(0, 0), 1.0);
//!
//! let system = residual.collapse();
//! assert_eq!(system.jacobian.shape(), (3, 4));
//! ```
//!
//! # Cargo features
//!
//! - `parallel`: compute sparse products column-parallel with rayon. Results
//!   are bit-identical to the serial path.
//! - `check-finite`: fail AD arithmetic that produces NaN or infinity.

pub mod autodiff;
pub mod backend;
pub mod error;
pub mod operations;
pub mod partition;
pub mod random;
pub mod sparse;
pub mod vector;

pub use autodiff::{AutoDiffBlock, Collapsed, Criterion, JacobianList, Selector, UpwindSelector};
pub use error::AdError;
pub use partition::BlockPartition;
pub use sparse::{CscMatrix, SparseMatrix};
pub use vector::DenseVector;
