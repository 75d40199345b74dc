//! Dimension ranking, fusion and compression for nd iteration.
//!
//! All functions take the shared dims plus one stride list per operand
//! (destination first) and never look at buffers.

/// Rank of each stride by magnitude, starting at 1 for the smallest.
///
/// Zero strides (broadcast dimensions) rank 1 and are not counted against
/// the others.
pub(crate) fn index_order(strides: &[isize]) -> Vec<usize> {
    strides
        .iter()
        .map(|&si| {
            let si = si.unsigned_abs();
            if si == 0 {
                return 1;
            }
            1 + strides
                .iter()
                .filter(|&&s| s != 0 && s.unsigned_abs() < si)
                .count()
        })
        .collect()
}

/// Importance of each dimension for loop ordering; larger runs further inside.
///
/// Each operand contributes `1 << (g * (rank - index_order))`, the first
/// (destination) operand twice. `g` bits per rank level keep contributions
/// from different levels apart. Extent-1 dimensions score 0.
pub(crate) fn compute_importance(dims: &[usize], index_orders: &[Vec<usize>]) -> Vec<u64> {
    let n = dims.len();
    let m = index_orders.len();
    if n == 0 || m == 0 {
        return vec![0; n];
    }

    let g = u64::from(64 - (m as u64 + 1).leading_zeros());
    let mut importance = vec![0u64; n];
    for (k, orders) in index_orders.iter().enumerate() {
        let weight = if k == 0 { 2 } else { 1 };
        for (imp, &o) in importance.iter_mut().zip(orders) {
            let shift = g * (n - o) as u64;
            *imp = imp.saturating_add(weight * (1u64 << shift.min(62)));
        }
    }
    for (imp, &d) in importance.iter_mut().zip(dims) {
        if d <= 1 {
            *imp = 0;
        }
    }
    importance
}

/// Permutation sorting `importance` in descending order (stable).
pub(crate) fn sort_by_importance(importance: &[u64]) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..importance.len()).collect();
    perm.sort_by(|&a, &b| importance[b].cmp(&importance[a]));
    perm
}

/// Merge dimension `i` into `i - 1` wherever every operand has
/// `strides[i] == dims[i - 1] * strides[i - 1]`.
///
/// The merged-away dimension is left with extent 1; [`compress_dims`]
/// removes it.
pub(crate) fn fuse_dims(dims: &[usize], all_strides: &[&[isize]]) -> Vec<usize> {
    let mut fused = dims.to_vec();
    if fused.len() <= 1 || all_strides.is_empty() {
        return fused;
    }
    for i in (1..fused.len()).rev() {
        let mergeable = all_strides
            .iter()
            .all(|s| s[i] == fused[i - 1] as isize * s[i - 1]);
        if mergeable {
            fused[i - 1] *= fused[i];
            fused[i] = 1;
        }
    }
    fused
}

/// Drop extent-1 dimensions. If every dimension has extent 1, one is kept.
pub(crate) fn compress_dims(
    dims: &[usize],
    all_strides: &[Vec<isize>],
) -> (Vec<usize>, Vec<Vec<isize>>) {
    let kept: Vec<usize> = (0..dims.len()).filter(|&i| dims[i] != 1).collect();
    if kept.is_empty() {
        if dims.is_empty() {
            return (vec![], all_strides.to_vec());
        }
        return (vec![1], all_strides.iter().map(|s| vec![s[0]]).collect());
    }
    let new_dims = kept.iter().map(|&i| dims[i]).collect();
    let new_strides = all_strides
        .iter()
        .map(|s| kept.iter().map(|&i| s[i]).collect())
        .collect();
    (new_dims, new_strides)
}
