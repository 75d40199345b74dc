//! Shape/stride geometry and shared-buffer ndarray views.
//!
//! # Core Types
//!
//! - [`NdArray`]: a view `(buffer, dtype, shape, strides, offset, order)` over a
//!   reference-counted [`SharedBuffer`]. Slicing, transposing, squeezing and
//!   broadcasting produce new descriptors over the same buffer.
//! - [`geometry`]: the pure functions every layer uses for buffer indices,
//!   iteration order, contiguity and stride synthesis.
//! - [`index`]: linear-index / subscript conversion with [`IndexMode`]s.
//!
//! # Example
//!
//! ```rust
//! use strided_view::{NdArray, Order, SliceSpec};
//! use strided_dtype::Scalar;
//!
//! let a = NdArray::from_vec(vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3], Order::RowMajor).unwrap();
//! assert_eq!(a.get(&[1, 2]).unwrap(), Scalar::Float(6.0));
//!
//! // Every other column, reversed (zero-copy)
//! let b = a.slice(&[SliceSpec::Full, SliceSpec::range(None, None, -2)]).unwrap();
//! assert_eq!(b.shape(), &[2, 2]);
//! assert_eq!(b.get(&[0, 0]).unwrap(), Scalar::Float(3.0));
//! assert!(b.shares_buffer(&a));
//! ```

pub mod geometry;
pub mod index;
mod ndarray;
mod slice;

pub use geometry::{IterationOrder, Order};
pub use index::IndexMode;
pub use ndarray::{IndexIter, NdArray, Nested, SharedBuffer};
pub use slice::SliceSpec;

use strided_dtype::DTypeError;

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur while building or accessing strided views and
/// while validating kernel operands.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StridedError {
    /// Array ranks do not match.
    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// Array shapes are incompatible for the operation.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Invalid axis index for the given array rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// Axis list is not a permutation of `0..rank`.
    #[error("invalid permutation {0:?}")]
    InvalidPermutation(Vec<usize>),

    /// Stride array length doesn't match dimensions.
    #[error("stride and dims length mismatch")]
    StrideLengthMismatch,

    /// Integer overflow while computing a buffer index.
    #[error("offset overflow while computing buffer index")]
    OffsetOverflow,

    /// Some multi-index of the view maps outside the buffer.
    #[error("view reaches buffer indices {min}..={max}, buffer length is {len}")]
    OutOfBounds { min: isize, max: isize, len: usize },

    /// A kernel operand reaches outside its buffer.
    #[error("operand `{operand}` reaches buffer indices {min}..={max}, buffer length is {len}")]
    OperandOutOfBounds {
        operand: &'static str,
        min: isize,
        max: isize,
        len: usize,
    },

    /// Subscript outside its dimension.
    #[error("index {index} out of bounds for dim {dim} with extent {extent}")]
    IndexOutOfBounds {
        dim: usize,
        index: isize,
        extent: usize,
    },

    /// Linear index outside `0..len`.
    #[error("linear index {index} out of bounds for length {len}")]
    LinearIndexOutOfBounds { index: isize, len: usize },

    /// Multi-index length differs from the view rank.
    #[error("expected {expected} indices, found {found}")]
    WrongIndexCount { expected: usize, found: usize },

    /// Malformed slice specification.
    #[error("invalid slice: {0}")]
    InvalidSlice(String),

    /// Buffer holds fewer elements than the shape requires.
    #[error("buffer of length {len} is too short, {required} elements required")]
    BufferTooShort { required: usize, len: usize },

    /// Unrecognized memory order tag.
    #[error("unknown order: {0:?}")]
    UnknownOrder(String),

    /// Unrecognized index mode tag.
    #[error("unknown index mode: {0:?}")]
    UnknownIndexMode(String),

    #[error(transparent)]
    DType(#[from] DTypeError),
}

/// Result type for strided view operations.
pub type Result<T> = std::result::Result<T, StridedError>;
