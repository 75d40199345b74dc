//! Per-dimension slice specifications.

use std::ops::{Range, RangeFull};

use crate::{Result, StridedError};

/// Selection along one dimension.
///
/// Ranges follow Python slice semantics: negative bounds count from the end,
/// out-of-range bounds are clamped, and `None` means "from the start" /
/// "to the end" in the direction of `step`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SliceSpec {
    /// A single index; the dimension is dropped.
    Index(isize),
    Range {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },
    Full,
}

impl SliceSpec {
    pub fn range(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        SliceSpec::Range { start, stop, step }
    }

    /// Resolve against a dimension of `extent` elements.
    pub(crate) fn resolve(self, extent: usize, dim: usize) -> Result<Resolved> {
        let n = extent as isize;
        match self {
            SliceSpec::Full => Ok(Resolved::Keep {
                start: 0,
                len: extent,
                step: 1,
            }),
            SliceSpec::Index(i) => {
                let idx = if i < 0 { i + n } else { i };
                if !(0..n).contains(&idx) {
                    return Err(StridedError::IndexOutOfBounds {
                        dim,
                        index: i,
                        extent,
                    });
                }
                Ok(Resolved::Drop { index: idx as usize })
            }
            SliceSpec::Range { step: 0, .. } => Err(StridedError::InvalidSlice(format!(
                "step must be nonzero (dim {dim})"
            ))),
            SliceSpec::Range { start, stop, step } if step > 0 => {
                let bound = |v: isize| if v < 0 { (v + n).max(0) } else { v.min(n) };
                let start = start.map_or(0, bound);
                let stop = stop.map_or(n, bound);
                let len = if stop > start {
                    (stop - start + step - 1) / step
                } else {
                    0
                };
                Ok(Resolved::keep(start, len, step))
            }
            SliceSpec::Range { start, stop, step } => {
                let bound = |v: isize| if v < 0 { (v + n).max(-1) } else { v.min(n - 1) };
                let start = start.map_or(n - 1, bound);
                let stop = stop.map_or(-1, bound);
                let len = if start > stop {
                    (start - stop - step - 1) / -step
                } else {
                    0
                };
                Ok(Resolved::keep(start, len, step))
            }
        }
    }
}

impl From<isize> for SliceSpec {
    fn from(i: isize) -> Self {
        SliceSpec::Index(i)
    }
}

impl From<Range<isize>> for SliceSpec {
    fn from(r: Range<isize>) -> Self {
        SliceSpec::range(Some(r.start), Some(r.end), 1)
    }
}

impl From<RangeFull> for SliceSpec {
    fn from(_: RangeFull) -> Self {
        SliceSpec::Full
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Resolved {
    Drop { index: usize },
    Keep { start: usize, len: usize, step: isize },
}

impl Resolved {
    fn keep(start: isize, len: isize, step: isize) -> Self {
        if len <= 0 {
            return Resolved::Keep {
                start: 0,
                len: 0,
                step,
            };
        }
        Resolved::Keep {
            start: start as usize,
            len: len as usize,
            step,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keep(spec: SliceSpec, extent: usize) -> (usize, usize, isize) {
        match spec.resolve(extent, 0).unwrap() {
            Resolved::Keep { start, len, step } => (start, len, step),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_forward_ranges() {
        assert_eq!(keep(SliceSpec::Full, 5), (0, 5, 1));
        assert_eq!(keep((1..4).into(), 5), (1, 3, 1));
        assert_eq!(keep(SliceSpec::range(None, None, 2), 5), (0, 3, 2));
        assert_eq!(keep(SliceSpec::range(Some(-2), None, 1), 5), (3, 2, 1));
        assert_eq!(keep(SliceSpec::range(Some(7), None, 1), 5).1, 0);
        assert_eq!(keep(SliceSpec::range(Some(-9), Some(2), 1), 5), (0, 2, 1));
    }

    #[test]
    fn test_reverse_ranges() {
        assert_eq!(keep(SliceSpec::range(None, None, -1), 5), (4, 5, -1));
        assert_eq!(keep(SliceSpec::range(None, None, -2), 5), (4, 3, -2));
        assert_eq!(keep(SliceSpec::range(Some(3), Some(0), -1), 5), (3, 3, -1));
        assert_eq!(keep(SliceSpec::range(Some(0), Some(3), -1), 5).1, 0);
        assert_eq!(keep(SliceSpec::range(None, None, -1), 0).1, 0);
    }

    #[test]
    fn test_index_and_errors() {
        assert_eq!(
            SliceSpec::Index(-1).resolve(4, 0).unwrap(),
            Resolved::Drop { index: 3 }
        );
        assert!(matches!(
            SliceSpec::Index(4).resolve(4, 2),
            Err(StridedError::IndexOutOfBounds { dim: 2, index: 4, extent: 4 })
        ));
        assert!(matches!(
            SliceSpec::range(None, None, 0).resolve(4, 0),
            Err(StridedError::InvalidSlice(_))
        ));
    }
}
