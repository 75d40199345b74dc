//! Loop ordering across operands.

use crate::fuse::{compute_importance, index_order, sort_by_importance};

/// Dimension permutation for iteration, innermost first.
///
/// Dimensions with smaller strides run further inside. `strides_list[0]`
/// is the destination and counts twice, so a write-friendly order wins over
/// a read-friendly one when they disagree.
pub(crate) fn compute_order(dims: &[usize], strides_list: &[&[isize]]) -> Vec<usize> {
    if dims.is_empty() {
        return Vec::new();
    }
    if strides_list.is_empty() {
        return (0..dims.len()).collect();
    }
    let orders: Vec<Vec<usize>> = strides_list.iter().map(|s| index_order(s)).collect();
    sort_by_importance(&compute_importance(dims, &orders))
}
