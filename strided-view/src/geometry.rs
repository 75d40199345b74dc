//! Shape/stride geometry.
//!
//! Pure functions over `(shape, strides, offset)` triples. Every higher layer
//! (view construction, the dispatch engine, the nd driver) goes through these
//! rather than recomputing spans or orders locally.
//!
//! None of these check bounds; that happens once, when a view is built.

use std::fmt;
use std::str::FromStr;

use crate::StridedError;

/// Default stride convention used when synthesizing strides from a shape.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Order {
    /// C-like layout: last axis varies fastest.
    #[default]
    RowMajor,
    /// Fortran-like layout: first axis varies fastest.
    ColumnMajor,
}

impl Order {
    pub const fn as_str(self) -> &'static str {
        match self {
            Order::RowMajor => "row-major",
            Order::ColumnMajor => "column-major",
        }
    }
}

impl FromStr for Order {
    type Err = StridedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "row-major" => Ok(Order::RowMajor),
            "column-major" => Ok(Order::ColumnMajor),
            _ => Err(StridedError::UnknownOrder(s.to_string())),
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction in which a view walks its buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum IterationOrder {
    /// Every stride is negative.
    Descending = -1,
    /// Mixed signs.
    Unordered = 0,
    /// No stride is negative.
    Ascending = 1,
}

impl IterationOrder {
    #[inline]
    pub fn as_i8(self) -> i8 {
        self as i8
    }

    #[inline]
    pub fn is_ordered(self) -> bool {
        self != IterationOrder::Unordered
    }
}

/// Number of elements; 1 for the empty shape.
#[inline]
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// `offset + Σ index[k] * strides[k]`.
#[inline]
pub fn buffer_index(index: &[usize], strides: &[isize], offset: usize) -> isize {
    index
        .iter()
        .zip(strides)
        .fold(offset as isize, |acc, (&i, &s)| acc + i as isize * s)
}

/// Iteration order from the count of negative strides.
///
/// All-zero (or empty) strides are [`IterationOrder::Ascending`].
pub fn iteration_order(strides: &[isize]) -> IterationOrder {
    let negative = strides.iter().filter(|&&s| s < 0).count();
    if negative == 0 {
        IterationOrder::Ascending
    } else if negative == strides.len() {
        IterationOrder::Descending
    } else {
        IterationOrder::Unordered
    }
}

/// Minimum and maximum buffer index reachable by the view, or `None` when
/// either bound does not fit in `isize`.
///
/// Dimensions of extent 0 contribute nothing.
pub fn checked_min_max_view_buffer_index(
    shape: &[usize],
    strides: &[isize],
    offset: usize,
) -> Option<(isize, isize)> {
    let mut min = isize::try_from(offset).ok()?;
    let mut max = min;
    for (&extent, &stride) in shape.iter().zip(strides) {
        if extent == 0 {
            continue;
        }
        let end = isize::try_from(extent - 1).ok()?.checked_mul(stride)?;
        if end >= 0 {
            max = max.checked_add(end)?;
        } else {
            min = min.checked_add(end)?;
        }
    }
    Some((min, max))
}

/// Minimum and maximum buffer index reachable by the view.
///
/// Bounds that overflow `isize` saturate, so an unreachable view still
/// reports a minimum below 0 or a maximum past any buffer.
pub fn min_max_view_buffer_index(shape: &[usize], strides: &[isize], offset: usize) -> (isize, isize) {
    let start = isize::try_from(offset).unwrap_or(isize::MAX);
    let (mut min, mut max) = (start, start);
    for (&extent, &stride) in shape.iter().zip(strides) {
        if extent == 0 {
            continue;
        }
        let steps = isize::try_from(extent - 1).unwrap_or(isize::MAX);
        let end = stride.saturating_mul(steps);
        if end >= 0 {
            max = max.saturating_add(end);
        } else {
            min = min.saturating_add(end);
        }
    }
    (min, max)
}

#[inline]
pub fn min_view_buffer_index(shape: &[usize], strides: &[isize], offset: usize) -> isize {
    min_max_view_buffer_index(shape, strides, offset).0
}

#[inline]
pub fn max_view_buffer_index(shape: &[usize], strides: &[isize], offset: usize) -> isize {
    min_max_view_buffer_index(shape, strides, offset).1
}

/// Whether the view addresses one unbroken run of `len` buffer elements.
///
/// `false` for empty and unordered views.
pub fn is_contiguous(
    len: usize,
    shape: &[usize],
    strides: &[isize],
    offset: usize,
    order: IterationOrder,
) -> bool {
    if len == 0 || !order.is_ordered() {
        return false;
    }
    checked_min_max_view_buffer_index(shape, strides, offset)
        .and_then(|(min, max)| max.checked_sub(min))
        .is_some_and(|span| span as usize == len - 1)
}

/// Offset of the first logical element such that every index is
/// non-negative: `Σ_{stride<0} -stride * (extent - 1)`.
pub fn strides_to_offset(shape: &[usize], strides: &[isize]) -> usize {
    shape
        .iter()
        .zip(strides)
        .filter(|&(&extent, &stride)| stride < 0 && extent > 0)
        .map(|(&extent, &stride)| stride.unsigned_abs() * (extent - 1))
        .sum()
}

/// Packed strides for `shape` in the given order.
pub fn shape_to_strides(shape: &[usize], order: Order) -> Vec<isize> {
    match order {
        Order::RowMajor => row_major_strides(shape),
        Order::ColumnMajor => col_major_strides(shape),
    }
}

/// Compute column-major strides (first index varies fastest).
pub fn col_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in 1..rank {
        strides[i] = strides[i - 1] * dims[i - 1].max(1) as isize;
    }
    strides
}

/// Compute row-major strides (last index varies fastest).
pub fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1].max(1) as isize;
    }
    strides
}

/// Layout implied by stride magnitudes.
///
/// Row-major when `|strides|` is non-increasing, column-major when it is
/// non-decreasing (row-major wins for rank 0 and 1), `None` otherwise.
pub fn strides_to_order(strides: &[isize]) -> Option<Order> {
    let mags = || strides.iter().map(|s| s.unsigned_abs());
    let row = mags().zip(mags().skip(1)).all(|(a, b)| a >= b);
    if row {
        return Some(Order::RowMajor);
    }
    let col = mags().zip(mags().skip(1)).all(|(a, b)| a <= b);
    col.then_some(Order::ColumnMajor)
}

// ============================================================================
// One-dimensional helpers for kernels
// ============================================================================

/// Start position of a 1-D walk relative to its minimum buffer index:
/// `(1 - n) * stride` for negative strides, else 0.
#[inline]
pub fn stride_start(n: usize, stride: isize) -> usize {
    if stride < 0 && n > 0 {
        stride.unsigned_abs().saturating_mul(n - 1)
    } else {
        0
    }
}

/// Lowest buffer index touched by `n` elements from `offset` at `stride`.
#[inline]
pub fn min_view_index_1d(n: usize, stride: isize, offset: usize) -> isize {
    min_view_buffer_index(&[n], &[stride], offset)
}

/// Highest buffer index touched by `n` elements from `offset` at `stride`.
#[inline]
pub fn max_view_index_1d(n: usize, stride: isize, offset: usize) -> isize {
    max_view_buffer_index(&[n], &[stride], offset)
}
