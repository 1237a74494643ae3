//! Error types for adblock.

use thiserror::Error;

/// Errors that can occur in sparse-matrix and AD operations.
///
/// Every variant describes a contract violation or a non-finite result.
/// Fallible APIs return them; the `std::ops` operators panic with their
/// message instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdError {
    /// Range dimensions (value lengths) of two operands differ.
    #[error("range mismatch in {op}: expected length {expected}, got {actual}")]
    RangeMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Two operands were built against different block partitions.
    #[error("block partition mismatch: {expected:?} vs {actual:?}")]
    PartitionMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Matrix shapes are incompatible for the requested operation.
    #[error("matrix shape mismatch in {op}: {left:?} vs {right:?}")]
    MatrixShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// A block has the wrong size for its slot.
    #[error("block {block} has size {actual}, expected {expected}")]
    BlockSizeMismatch {
        block: usize,
        expected: usize,
        actual: usize,
    },

    /// Variable index is not a declared block.
    #[error("variable index {index} out of range for {num_blocks} blocks")]
    VariableOutOfRange { index: usize, num_blocks: usize },

    /// Row index out of bounds in a gather/scatter.
    #[error("index {index} out of bounds for size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    /// Raw compressed storage failed validation.
    #[error("invalid sparse storage: {message}")]
    InvalidStorage { message: String },

    /// An operation that needs at least one operand got none.
    #[error("{op} requires at least one operand")]
    EmptyInput { op: &'static str },

    /// A NaN or infinity was produced.
    #[error("non-finite value produced by {op} at row {row}")]
    NonFinite { op: &'static str, row: usize },
}
