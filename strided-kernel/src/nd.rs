//! nd-level driver: runs 1-D dispatchers over whole [`NdArray`] views.
//!
//! All operands must share one shape (broadcast first with
//! [`NdArray::broadcast_to`]). Dimensions are ordered with the destination
//! weighted double, contiguous dimensions are fused and extent-1
//! dimensions dropped; each remaining innermost run becomes one `apply`.
//!
//! An input sharing the destination's buffer is copied before the walk, so
//! overlapping views behave as if every input were read first.

use std::ops::Deref;

use smallvec::SmallVec;
use strided_dtype::Buffer;
use strided_view::NdArray;
use tracing::trace;

use crate::dispatch::{BinaryDispatch, NullaryDispatch, UnaryDispatch};
use crate::kernel::{build_plan_fused, ensure_same_shape, for_each_inner_run};
use crate::ops::assign_op;
use crate::Result;

/// `input` itself, or a packed copy when it shares a buffer with `dest`.
enum Detached<'a> {
    Borrowed(&'a NdArray),
    Copied(NdArray),
}

impl<'a> Detached<'a> {
    fn new(input: &'a NdArray, dest: &NdArray) -> Self {
        if input.shares_buffer(dest) {
            Detached::Copied(input.copy())
        } else {
            Detached::Borrowed(input)
        }
    }
}

impl Deref for Detached<'_> {
    type Target = NdArray;

    fn deref(&self) -> &NdArray {
        match self {
            Detached::Borrowed(a) => a,
            Detached::Copied(a) => a,
        }
    }
}

/// `y = op(x)` elementwise.
pub fn map_unary(op: &UnaryDispatch, x: &NdArray, y: &NdArray) -> Result<()> {
    ensure_same_shape(x.shape(), y.shape())?;
    if y.is_empty() {
        return Ok(());
    }
    let x = Detached::new(x, y);
    let plan = build_plan_fused(y.shape(), &[y.strides(), x.strides()]);
    trace!(op = op.name(), dims = ?plan.dims, calls = plan.runs(), "nd map");

    let src = x.buffer().read();
    let mut dst = y.buffer().write();
    for_each_inner_run(&plan, &[y.offset(), x.offset()], |off, len, inner| {
        op.apply(len, &src, inner[1], off[1], &mut dst, inner[0], off[0])?;
        Ok(())
    })
}

/// `z = op(x, y)` elementwise.
pub fn map_binary(op: &BinaryDispatch, x: &NdArray, y: &NdArray, z: &NdArray) -> Result<()> {
    ensure_same_shape(x.shape(), z.shape())?;
    ensure_same_shape(y.shape(), z.shape())?;
    if z.is_empty() {
        return Ok(());
    }
    let x = Detached::new(x, z);
    let y = Detached::new(y, z);
    let strides: SmallVec<[&[isize]; 3]> =
        SmallVec::from_slice(&[z.strides(), x.strides(), y.strides()]);
    let plan = build_plan_fused(z.shape(), &strides);
    trace!(op = op.name(), dims = ?plan.dims, calls = plan.runs(), "nd map");

    // one guard per distinct buffer
    let xs = x.buffer().read();
    let ys = (!y.shares_buffer(&x)).then(|| y.buffer().read());
    let ybuf: &Buffer = ys.as_deref().unwrap_or(&xs);
    let mut dst = z.buffer().write();
    for_each_inner_run(
        &plan,
        &[z.offset(), x.offset(), y.offset()],
        |off, len, inner| {
            op.apply(
                len, &xs, inner[1], off[1], ybuf, inner[2], off[2], &mut dst, inner[0], off[0],
            )?;
            Ok(())
        },
    )
}

/// `x[..] = op()` over every element of the view.
pub fn fill_nd(op: &NullaryDispatch, x: &NdArray) -> Result<()> {
    if x.is_empty() {
        return Ok(());
    }
    let plan = build_plan_fused(x.shape(), &[x.strides()]);
    trace!(op = op.name(), dims = ?plan.dims, calls = plan.runs(), "nd fill");
    let mut dst = x.buffer().write();
    for_each_inner_run(&plan, &[x.offset()], |off, len, inner| {
        op.apply(len, &mut dst, inner[0], off[0])?;
        Ok(())
    })
}

/// Cast-copy `x` into `y`.
pub fn assign_nd(x: &NdArray, y: &NdArray) -> Result<()> {
    map_unary(assign_op(), x, y)
}
