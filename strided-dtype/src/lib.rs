//! Element data types for strided arrays.
//!
//! This crate is the leaf of the workspace. It defines:
//!
//! - [`DType`]: the closed set of element data types, with byte widths and
//!   category predicates ([`Categories`])
//! - [`Scalar`]: a dynamically typed element value used by fallback kernels
//!   and per-element accessors
//! - [`Element`]: the typed side of the registry, implemented by every Rust
//!   type that backs a buffer variant
//! - [`Buffer`]: a flat homogeneous container, one variant per dtype
//! - [`cast`]: buffer conversion between dtypes
//!
//! # Example
//!
//! ```rust
//! use strided_dtype::{cast, Buffer, DType, Scalar};
//!
//! let src = Buffer::Generic(vec![
//!     Scalar::Float(300.0),
//!     Scalar::Float(-5.0),
//!     Scalar::Float(128.7),
//! ]);
//! let out = cast(&src, 3, DType::Uint8c).unwrap();
//! assert_eq!(out.to_scalars(), vec![Scalar::Int(255), Scalar::Int(0), Scalar::Int(129)]);
//! ```

mod buffer;
pub mod cast;
mod dtype;
mod element;
mod pod_complex;
mod scalar;

pub use buffer::Buffer;
pub use cast::{cast, cast_to};
pub use dtype::{
    byte_width_of, categories_of, is_boolean_dtype, is_complex_dtype, is_floating_point_dtype,
    is_integer_dtype, is_numeric_dtype, is_real_dtype, is_signed_integer_dtype,
    is_unsigned_integer_dtype, ByteWidth, Categories, Category, DType,
};
pub use element::{ClampedU8, Element};
pub use pod_complex::{PodComplexF32, PodComplexF64};
pub use scalar::Scalar;

// Re-exported so downstream crates name the same complex types.
pub use num_complex::{Complex32, Complex64};

// ============================================================================
// Error types
// ============================================================================

/// Errors raised by dtype parsing and buffer casting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DTypeError {
    /// The string is not one of the recognized dtype tags.
    #[error("unknown data type: {0:?}")]
    Unknown(String),

    /// Requested more elements than the source buffer holds.
    #[error("length {len} exceeds buffer length {available}")]
    LengthOutOfRange { len: usize, available: usize },
}

/// Result type for dtype operations.
pub type Result<T> = std::result::Result<T, DTypeError>;
