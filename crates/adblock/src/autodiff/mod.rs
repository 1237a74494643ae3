//! Forward-mode automatic differentiation over block-structured Jacobians.
//!
//! An [`AutoDiffBlock`] carries a dense value vector and, for each declared
//! independent variable block, the sparse partial derivative of that vector
//! with respect to the block. Arithmetic propagates the Jacobians by the
//! chain rule.
//!
//! # Architecture
//!
//! ```text
//! BlockPartition {n_0, ..., n_{B-1}}
//!        │
//!        ▼
//! AutoDiffBlock ── value: DenseVector (m)
//!        │
//!        └──────── jacobians: [J_0 (m x n_0), ..., J_{B-1}]
//!                       │
//!                       ▼
//!                  SparseMatrix::{Empty, Compressed}
//!
//! collapse() ──► Collapsed { value, jacobian: [J_0 | ... | J_{B-1}] }
//! ```
//!
//! # Example
//!
//! ```
//! use adblock::{AutoDiffBlock, BlockPartition};
//!
//! let partition = BlockPartition::new([3, 1, 2]);
//! let x = AutoDiffBlock::variable(0, [1.0, 2.2, 3.4], &partition).unwrap();
//! let a = AutoDiffBlock::constant([0.2, 1.2, 13.4], &partition);
//!
//! let z = &(&x + &x) + &a;
//! assert_eq!(z.jacobian(0).get(1, 1), 2.0);
//! assert!(z.jacobian(1).is_empty());
//!
//! let system = z.collapse();
//! assert_eq!(system.jacobian.shape(), (3, 6));
//! ```
//!
//! # Design Notes
//!
//! - Empty Jacobian blocks cost nothing and stay empty through every
//!   operation whose inputs are empty in that block.
//! - A value built without a partition has no blocks and adopts the
//!   partition of the other operand in binary operations.
//! - Partitions are compatible when their size sequences are equal.

mod arith;
mod collapse;
mod elementary;
mod jacobian;
mod select;
pub mod selector;
mod value;

pub use collapse::Collapsed;
pub use jacobian::JacobianList;
pub use selector::{Criterion, Selector, UpwindSelector};
pub use value::AutoDiffBlock;
