//! Dtype-dispatched strided kernels.
//!
//! Every operation here takes 1-D strided operands `(buffer, stride, offset)`
//! plus a shared element count `n`, and runs one of two kernels:
//!
//! - a **native** kernel: a monomorphized closure over typed slices, looked up
//!   by the dtype combination of its operands, or
//! - the **fallback** kernel: a closure over [`Scalar`](strided_dtype::Scalar)
//!   values, reached through indexed buffer access. It is correct for every
//!   dtype, including `generic` and `binary`.
//!
//! Natives are an optimization only. They can be compiled out (the `native`
//! feature) or switched off at runtime (`STRIDED_NATIVE=0`), and every
//! operation still produces the same values.
//!
//! # Operations
//!
//! - [`UnaryDispatch`], [`BinaryDispatch`], [`NullaryDispatch`],
//!   [`MaskedUnaryDispatch`], [`ReduceDispatch`]: the dispatch engine
//! - [`ops`]: built-in `assign`, `abs`, `scale`, `add`, `mul`, `fill`
//! - [`reduce`]: compensated sums and the two-pass mean
//! - [`scan`]: cumulative sums and cumulative any / every / none
//! - [`sort`]: insertion, Shell and heap sorts with an optional companion
//! - [`nd`]: the same kernels over whole [`NdArray`](strided_view::NdArray)
//!   views, with dimension ordering and fusion
//!
//! # Example
//!
//! ```rust
//! use strided_dtype::{Buffer, Scalar};
//! use strided_kernel::UnaryDispatch;
//!
//! let times_ten = UnaryDispatch::new("times_ten", |v| v * Scalar::Int(10))
//!     .with_native::<f64, f64>(|v| v * 10.0);
//!
//! let x = Buffer::Float64(vec![1.0, 2.0, 3.0, 4.0]);
//! let mut y = Buffer::zeros(x.dtype(), 4);
//! // read x backwards
//! times_ten.apply(4, &x, -1, 3, &mut y, 1, 0).unwrap();
//! assert_eq!(y, Buffer::Float64(vec![40.0, 30.0, 20.0, 10.0]));
//! ```

mod access;
pub mod config;
mod dispatch;
mod fuse;
mod kernel;
pub mod nd;
pub mod ops;
mod order;
pub mod reduce;
pub mod scan;
mod simd;
pub mod sort;

pub use access::{
    BufferAccess, BufferAccessMut, StridedAccess, StridedAccessMut, StridedSlice, StridedSliceMut,
};
pub use config::{native_status, KernelConfig, NativeStatus};
pub use dispatch::{
    dispatch, BinaryDispatch, KernelPath, KernelTable, MaskedUnaryDispatch, NativeUnary,
    NullaryDispatch, ReduceDispatch, UnaryDispatch,
};
pub use nd::{assign_nd, fill_nd, map_binary, map_unary};
pub use reduce::{mean, sum, SumMethod};
pub use scan::{cuany, cuevery, cunone, cusum};
pub use sort::{sort, sort2, SortMethod};

pub use strided_view::{Result, StridedError};
