//! Subscript / linear-index conversion with index modes.
//!
//! A *view* linear index counts elements in the view's own order; a *buffer*
//! linear index is a position in the underlying buffer.

use std::fmt;
use std::str::FromStr;

use crate::geometry::{buffer_index, min_view_buffer_index, numel, shape_to_strides, Order};
use crate::{Result, StridedError};

/// How an out-of-range index is treated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum IndexMode {
    /// Out-of-range is an error.
    #[default]
    Throw,
    /// Euclidean modulo by the extent.
    Wrap,
    /// Saturate to `0` or the last index.
    Clamp,
    /// Negative indices count from the end; still out-of-range is an error.
    Normalize,
}

impl IndexMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            IndexMode::Throw => "throw",
            IndexMode::Wrap => "wrap",
            IndexMode::Clamp => "clamp",
            IndexMode::Normalize => "normalize",
        }
    }
}

impl FromStr for IndexMode {
    type Err = StridedError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "throw" => Ok(IndexMode::Throw),
            "wrap" => Ok(IndexMode::Wrap),
            "clamp" => Ok(IndexMode::Clamp),
            "normalize" => Ok(IndexMode::Normalize),
            _ => Err(StridedError::UnknownIndexMode(s.to_string())),
        }
    }
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn resolve(idx: isize, max: usize, mode: IndexMode) -> Option<usize> {
    let extent = max as isize + 1;
    match mode {
        IndexMode::Throw => (0..extent).contains(&idx).then_some(idx as usize),
        IndexMode::Wrap => Some(idx.rem_euclid(extent) as usize),
        IndexMode::Clamp => Some(idx.clamp(0, max as isize) as usize),
        IndexMode::Normalize => {
            let idx = if idx < 0 { idx + extent } else { idx };
            (0..extent).contains(&idx).then_some(idx as usize)
        }
    }
}

/// Resolve `idx` against the valid range `0..=max`.
pub fn resolve_index(idx: isize, max: usize, mode: IndexMode) -> Result<usize> {
    resolve(idx, max, mode).ok_or(StridedError::LinearIndexOutOfBounds {
        index: idx,
        len: max + 1,
    })
}

/// Buffer index of the subscripts `subs`.
///
/// Dimension `k` uses `modes[k % modes.len()]`; an empty `modes` means
/// [`IndexMode::Throw`] everywhere.
pub fn sub_to_ind(
    shape: &[usize],
    strides: &[isize],
    offset: usize,
    subs: &[isize],
    modes: &[IndexMode],
) -> Result<usize> {
    if shape.len() != strides.len() {
        return Err(StridedError::StrideLengthMismatch);
    }
    if subs.len() != shape.len() {
        return Err(StridedError::WrongIndexCount {
            expected: shape.len(),
            found: subs.len(),
        });
    }
    let mut idx = offset as isize;
    for (dim, ((&extent, &stride), &sub)) in shape.iter().zip(strides).zip(subs).enumerate() {
        let mode = if modes.is_empty() {
            IndexMode::Throw
        } else {
            modes[dim % modes.len()]
        };
        let resolved = (extent > 0)
            .then(|| resolve(sub, extent - 1, mode))
            .flatten()
            .ok_or(StridedError::IndexOutOfBounds {
                dim,
                index: sub,
                extent,
            })?;
        idx += resolved as isize * stride;
    }
    usize::try_from(idx).map_err(|_| StridedError::OffsetOverflow)
}

/// Subscripts of the view linear index `idx` in `order`.
pub fn ind_to_sub(shape: &[usize], order: Order, idx: isize, mode: IndexMode) -> Result<Vec<usize>> {
    let len = numel(shape);
    if len == 0 {
        return Err(StridedError::LinearIndexOutOfBounds { index: idx, len });
    }
    let mut rem = resolve_index(idx, len - 1, mode)?;
    let mut out = vec![0usize; shape.len()];
    let mut take = |k: usize| {
        out[k] = rem % shape[k];
        rem /= shape[k];
    };
    match order {
        Order::RowMajor => (0..shape.len()).rev().for_each(&mut take),
        Order::ColumnMajor => (0..shape.len()).for_each(&mut take),
    }
    Ok(out)
}

/// Buffer index of the view linear index `idx`.
pub fn vind_to_bind(
    shape: &[usize],
    strides: &[isize],
    offset: usize,
    order: Order,
    idx: isize,
    mode: IndexMode,
) -> Result<usize> {
    if shape.len() != strides.len() {
        return Err(StridedError::StrideLengthMismatch);
    }
    let subs = ind_to_sub(shape, order, idx, mode)?;
    usize::try_from(buffer_index(&subs, strides, offset)).map_err(|_| StridedError::OffsetOverflow)
}

/// View linear index of the buffer index `idx`.
///
/// Dimensions are peeled in `order` (outermost first), so the strides are
/// expected to be ordered consistently with it, as they are for packed views
/// and their reversals.
pub fn bind_to_vind(
    shape: &[usize],
    strides: &[isize],
    offset: usize,
    order: Order,
    idx: isize,
    mode: IndexMode,
) -> Result<usize> {
    if shape.len() != strides.len() {
        return Err(StridedError::StrideLengthMismatch);
    }
    let len = numel(shape);
    if len == 0 {
        return Err(StridedError::LinearIndexOutOfBounds { index: idx, len });
    }
    let bind = resolve_index(idx, len - 1, mode)? as isize;
    let out_of_view = StridedError::LinearIndexOutOfBounds { index: idx, len };
    let mut rem = bind
        .checked_sub(min_view_buffer_index(shape, strides, offset))
        .filter(|&rem| rem >= 0)
        .ok_or(out_of_view.clone())?;

    let dims: Vec<usize> = match order {
        Order::RowMajor => (0..shape.len()).collect(),
        Order::ColumnMajor => (0..shape.len()).rev().collect(),
    };
    let view_strides = shape_to_strides(shape, order);
    let mut vind = 0isize;
    for k in dims {
        let stride = strides[k];
        let q = if stride == 0 {
            0
        } else {
            let (r, mag) = (rem as usize, stride.unsigned_abs());
            rem = (r % mag) as isize;
            (r / mag) as isize
        };
        let sub = if stride < 0 {
            shape[k] as isize - 1 - q
        } else {
            q
        };
        if !(0..shape[k] as isize).contains(&sub) {
            return Err(out_of_view);
        }
        vind += sub * view_strides[k];
    }
    if rem != 0 {
        return Err(out_of_view);
    }
    Ok(vind as usize)
}
