//! Strided ndarray views and dtype-dispatched numeric kernels.
//!
//! This crate re-exports the workspace layers under one name:
//!
//! - [`dtype`] (`strided-dtype`): [`DType`], [`Scalar`], typed [`Buffer`]s and casting
//! - [`view`] (`strided-view`): shape/stride geometry, index conversion and
//!   shared-buffer [`NdArray`] views
//! - [`kernel`] (`strided-kernel`): the native/fallback dispatch engine and
//!   the built-in kernels (`assign`, `scale`, sums, scans, sorts, ...)
//!
//! # Example
//!
//! ```rust
//! use ndstrided::{map_unary, ops, DType, NdArray, Order, Scalar};
//!
//! let a = NdArray::from_vec(vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3], Order::RowMajor).unwrap();
//!
//! // B = 2 * A', read straight from the transposed view
//! let b = NdArray::zeros(DType::Float64, &[3, 2], Order::RowMajor);
//! map_unary(&ops::scale_op(2.0), &a.transpose(), &b).unwrap();
//! assert_eq!(b.get(&[2, 1]).unwrap(), Scalar::Float(12.0));
//! ```
//!
//! # Native kernels
//!
//! Natives are enabled by the default `native` feature and can be switched
//! off at runtime with `STRIDED_NATIVE=0`. The `simd` feature adds pulp
//! dispatch for long unit-stride runs. Results never depend on either.

pub use strided_dtype as dtype;
pub use strided_kernel as kernel;
pub use strided_view as view;

// ============================================================================
// Data types and buffers
// ============================================================================
pub use strided_dtype::{
    cast, cast_to, Buffer, ClampedU8, Complex32, Complex64, DType, DTypeError, Element, Scalar,
};

// ============================================================================
// Views
// ============================================================================
pub use strided_view::{
    geometry, index, IndexMode, IterationOrder, NdArray, Order, SharedBuffer, SliceSpec,
};

// ============================================================================
// Kernels
// ============================================================================
pub use strided_kernel::{
    assign_nd, cuany, cuevery, cunone, cusum, dispatch, fill_nd, map_binary, map_unary, mean, nd,
    ops, reduce, scan, sort, sort2, sum, BinaryDispatch, BufferAccess, KernelPath, KernelTable,
    MaskedUnaryDispatch, NullaryDispatch, ReduceDispatch, SortMethod, StridedAccess,
    StridedAccessMut, StridedSlice, SumMethod, UnaryDispatch,
};

// ============================================================================
// Error types
// ============================================================================
pub use strided_view::{Result, StridedError};
