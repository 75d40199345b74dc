//! nd iteration planning: order, fuse, compress, then walk innermost runs.

use crate::fuse::{compress_dims, fuse_dims};
use crate::{order, Result, StridedError};

/// Dims and per-operand strides in iteration order (innermost first), with
/// contiguous runs fused and extent-1 dimensions removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Plan {
    pub(crate) dims: Vec<usize>,
    pub(crate) strides: Vec<Vec<isize>>,
}

impl Plan {
    /// Number of 1-D runs the plan will produce.
    pub(crate) fn runs(&self) -> usize {
        self.dims.iter().skip(1).product()
    }
}

/// Build a plan for operands sharing `dims`. `strides_list[0]` is the
/// destination.
///
/// Ordering comes first so that fusion sees dimensions sorted by stride
/// and catches contiguous runs in any memory layout.
pub(crate) fn build_plan_fused(dims: &[usize], strides_list: &[&[isize]]) -> Plan {
    let order = order::compute_order(dims, strides_list);

    let ordered_dims: Vec<usize> = order.iter().map(|&d| dims[d]).collect();
    let ordered_strides: Vec<Vec<isize>> = strides_list
        .iter()
        .map(|strides| order.iter().map(|&d| strides[d]).collect())
        .collect();
    let ordered_refs: Vec<&[isize]> = ordered_strides.iter().map(Vec::as_slice).collect();

    let fused = fuse_dims(&ordered_dims, &ordered_refs);
    let (dims, strides) = compress_dims(&fused, &ordered_strides);
    Plan { dims, strides }
}

/// Call `f(offsets, len, inner_strides)` once per innermost run.
///
/// `offsets[k]` is the buffer index of the run's first element in operand
/// `k`, starting from `initial_offsets`. A rank-0 plan yields one run of
/// length 1.
pub(crate) fn for_each_inner_run<F>(plan: &Plan, initial_offsets: &[usize], mut f: F) -> Result<()>
where
    F: FnMut(&[usize], usize, &[isize]) -> Result<()>,
{
    let m = initial_offsets.len();
    let mut offsets: Vec<isize> = initial_offsets.iter().map(|&o| o as isize).collect();
    let mut current = vec![0usize; m];
    let mut emit = |offsets: &[isize], len: usize, inner: &[isize]| -> Result<()> {
        for (c, &o) in current.iter_mut().zip(offsets) {
            *c = usize::try_from(o).map_err(|_| StridedError::OffsetOverflow)?;
        }
        f(&current, len, inner)
    };

    let rank = plan.dims.len();
    if rank == 0 {
        return emit(&offsets, 1, &vec![0; m]);
    }
    if plan.dims.contains(&0) {
        return Ok(());
    }

    let inner_len = plan.dims[0];
    let inner: Vec<isize> = plan.strides.iter().map(|s| s[0]).collect();
    let mut idx = vec![0usize; rank];
    loop {
        emit(&offsets, inner_len, &inner)?;

        // odometer over the outer dimensions
        let mut level = 1;
        loop {
            if level == rank {
                return Ok(());
            }
            for (offset, s) in offsets.iter_mut().zip(&plan.strides) {
                *offset += s[level];
            }
            idx[level] += 1;
            if idx[level] < plan.dims[level] {
                break;
            }
            idx[level] = 0;
            for (offset, s) in offsets.iter_mut().zip(&plan.strides) {
                *offset -= plan.dims[level] as isize * s[level];
            }
            level += 1;
        }
    }
}

pub(crate) fn ensure_same_shape(a: &[usize], b: &[usize]) -> Result<()> {
    if a.len() != b.len() {
        return Err(StridedError::RankMismatch(a.len(), b.len()));
    }
    if a != b {
        return Err(StridedError::ShapeMismatch(a.to_vec(), b.to_vec()));
    }
    Ok(())
}
