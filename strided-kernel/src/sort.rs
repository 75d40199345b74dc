//! In-place strided sorts, with an optional companion array.
//!
//! Keys compare as `f64`. Complex values compare by their real part, and a
//! NaN in either part makes the key NaN. NaN goes to the end in both
//! directions; otherwise the order is IEEE total order, so
//! ascending puts `-0` before `+0` and descending puts `+0` before `-0`.
//!
//! The `sort2` variants apply exactly the same swaps to the companion `y`,
//! which makes `y = 0..n` record the sorting permutation.

use std::cmp::Ordering;
use std::sync::OnceLock;

use num_complex::{Complex32, Complex64};
use strided_dtype::{Buffer, ClampedU8, DType, Element, Scalar};
use tracing::trace;

use crate::access::{BufferAccessMut, StridedAccess, StridedAccessMut, StridedSliceMut};
use crate::dispatch::{log_table_built, KernelTable, Lane};
use crate::Result;

/// Shellsort gaps (Ciura).
const GAPS: [usize; 8] = [701, 301, 132, 57, 23, 10, 4, 1];

/// Sorting algorithm.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SortMethod {
    /// Stable insertion sort.
    Insertion,
    /// Shellsort with Ciura's gaps.
    Shell,
    /// Heapsort. Not stable: equal keys land in heap extraction order.
    Heap,
}

/// Sort key of an element.
pub trait SortKey: Copy {
    fn sort_key(self) -> f64;
}

macro_rules! impl_sort_key_lossless {
    ($($t:ty),*) => {
        $(impl SortKey for $t {
            #[inline]
            fn sort_key(self) -> f64 {
                f64::from(self)
            }
        })*
    };
}

impl_sort_key_lossless!(i8, u8, i16, u16, i32, u32, f32, f64);

impl SortKey for ClampedU8 {
    #[inline]
    fn sort_key(self) -> f64 {
        f64::from(self.0)
    }
}

impl SortKey for bool {
    #[inline]
    fn sort_key(self) -> f64 {
        f64::from(u8::from(self))
    }
}

#[inline]
fn complex_key(re: f64, im: f64) -> f64 {
    if im.is_nan() {
        f64::NAN
    } else {
        re
    }
}

impl SortKey for Complex32 {
    #[inline]
    fn sort_key(self) -> f64 {
        complex_key(f64::from(self.re), f64::from(self.im))
    }
}

impl SortKey for Complex64 {
    #[inline]
    fn sort_key(self) -> f64 {
        complex_key(self.re, self.im)
    }
}

impl SortKey for Scalar {
    #[inline]
    fn sort_key(self) -> f64 {
        match self {
            Scalar::Complex(c) => c.sort_key(),
            other => other.to_f64(),
        }
    }
}

/// Ordering of two keys: NaN last, then total order (reversed when `desc`).
#[inline]
pub fn sort_ordering(a: f64, b: f64, desc: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if desc => b.total_cmp(&a),
        (false, false) => a.total_cmp(&b),
    }
}

// ============================================================================
// Algorithms
// ============================================================================

/// What the algorithms need from the sequence being sorted.
trait SortLane {
    fn len(&self) -> usize;

    fn key(&self, i: usize) -> f64;

    fn swap(&mut self, i: usize, j: usize);
}

impl<T: SortKey> SortLane for StridedSliceMut<'_, T> {
    #[inline]
    fn len(&self) -> usize {
        StridedAccess::len(self)
    }

    #[inline]
    fn key(&self, i: usize) -> f64 {
        self.get(i).sort_key()
    }

    #[inline]
    fn swap(&mut self, i: usize, j: usize) {
        StridedAccessMut::swap(self, i, j);
    }
}

impl SortLane for BufferAccessMut<'_> {
    #[inline]
    fn len(&self) -> usize {
        StridedAccess::len(self)
    }

    #[inline]
    fn key(&self, i: usize) -> f64 {
        self.get(i).sort_key()
    }

    #[inline]
    fn swap(&mut self, i: usize, j: usize) {
        StridedAccessMut::swap(self, i, j);
    }
}

/// Keys from `x`; every swap is mirrored in `y`.
struct Paired<X, Y> {
    x: X,
    y: Y,
}

impl<X: SortLane, Y: StridedAccessMut> SortLane for Paired<X, Y> {
    #[inline]
    fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    fn key(&self, i: usize) -> f64 {
        self.x.key(i)
    }

    #[inline]
    fn swap(&mut self, i: usize, j: usize) {
        self.x.swap(i, j);
        self.y.swap(i, j);
    }
}

#[inline]
fn before<L: SortLane>(lane: &L, i: usize, j: usize, desc: bool) -> bool {
    sort_ordering(lane.key(i), lane.key(j), desc) == Ordering::Less
}

fn insertion<L: SortLane>(lane: &mut L, desc: bool) {
    for i in 1..lane.len() {
        let mut j = i;
        while j > 0 && before(lane, j, j - 1, desc) {
            lane.swap(j, j - 1);
            j -= 1;
        }
    }
}

fn shell<L: SortLane>(lane: &mut L, desc: bool) {
    let n = lane.len();
    for gap in GAPS.into_iter().filter(|&g| g < n) {
        for i in gap..n {
            let mut j = i;
            while j >= gap && before(lane, j, j - gap, desc) {
                lane.swap(j, j - gap);
                j -= gap;
            }
        }
    }
}

fn sift_down<L: SortLane>(lane: &mut L, mut root: usize, end: usize, desc: bool) {
    loop {
        let mut child = 2 * root + 1;
        if child >= end {
            return;
        }
        if child + 1 < end && before(lane, child, child + 1, desc) {
            child += 1;
        }
        if !before(lane, root, child, desc) {
            return;
        }
        lane.swap(root, child);
        root = child;
    }
}

fn heap<L: SortLane>(lane: &mut L, desc: bool) {
    let n = lane.len();
    for start in (0..n / 2).rev() {
        sift_down(lane, start, n, desc);
    }
    for end in (1..n).rev() {
        lane.swap(0, end);
        sift_down(lane, 0, end, desc);
    }
}

fn run<L: SortLane>(method: SortMethod, lane: &mut L, desc: bool) {
    match method {
        SortMethod::Insertion => insertion(lane, desc),
        SortMethod::Shell => shell(lane, desc),
        SortMethod::Heap => heap(lane, desc),
    }
}

/// `Some(desc)` for a meaningful request, `None` for a no-op.
#[inline]
fn direction(n: usize, order: f64) -> Option<bool> {
    (n > 0 && order != 0.0 && !order.is_nan()).then_some(order < 0.0)
}

// ============================================================================
// Typed entry points
// ============================================================================

fn sort_typed<T: SortKey>(
    method: SortMethod,
    n: usize,
    order: f64,
    x: &mut [T],
    stride: isize,
    offset: usize,
) {
    if let Some(desc) = direction(n, order) {
        run(method, &mut StridedSliceMut::new(x, n, stride, offset), desc);
    }
}

#[allow(clippy::too_many_arguments)]
fn sort2_typed<T: SortKey, U: Copy>(
    method: SortMethod,
    n: usize,
    order: f64,
    x: &mut [T],
    sx: isize,
    ox: usize,
    y: &mut [U],
    sy: isize,
    oy: usize,
) {
    if let Some(desc) = direction(n, order) {
        let mut lane = Paired {
            x: StridedSliceMut::new(x, n, sx, ox),
            y: StridedSliceMut::new(y, n, sy, oy),
        };
        run(method, &mut lane, desc);
    }
}

macro_rules! typed_sorts {
    ($($method:ident => $one:ident, $two:ident;)*) => {
        $(
            /// Sort `n` elements of `x` from `offset` at `stride`; ascending
            /// for `order > 0`, descending for `order < 0`.
            ///
            /// # Panics
            /// Panics if an index falls outside `x`.
            pub fn $one<T: SortKey>(n: usize, order: f64, x: &mut [T], stride: isize, offset: usize) {
                sort_typed(SortMethod::$method, n, order, x, stride, offset);
            }

            /// Sort `x` and apply the same moves to `y`.
            #[allow(clippy::too_many_arguments)]
            pub fn $two<T: SortKey, U: Copy>(
                n: usize,
                order: f64,
                x: &mut [T],
                sx: isize,
                ox: usize,
                y: &mut [U],
                sy: isize,
                oy: usize,
            ) {
                sort2_typed(SortMethod::$method, n, order, x, sx, ox, y, sy, oy);
            }
        )*
    };
}

typed_sorts! {
    Insertion => sort_ins, sort2_ins;
    Shell => sort_sh, sort2_sh;
    Heap => sort_hp, sort2_hp;
}

// ============================================================================
// Dispatch
// ============================================================================

type SortKernel =
    dyn Fn(SortMethod, bool, &mut Buffer, Lane, Option<(&mut Buffer, Lane)>) -> bool + Send + Sync;

fn native_sort<T: Element + SortKey>() -> Box<SortKernel> {
    Box::new(
        |method: SortMethod, desc: bool, x: &mut Buffer, lx: Lane, y: Option<(&mut Buffer, Lane)>| {
            let Some(xs) = T::slice_of_mut(x) else {
                return false;
            };
            let xs = lx.slice_mut(xs);
            match y {
                None => run(method, &mut { xs }, desc),
                Some((y, ly)) => {
                    let mut lane = Paired {
                        x: xs,
                        y: ly.access_mut(y),
                    };
                    run(method, &mut lane, desc);
                }
            }
            true
        },
    )
}

macro_rules! register_sorts {
    ($table:ident, $($t:ty),*) => {
        $($table.insert_native(<$t>::DTYPE, native_sort::<$t>());)*
    };
}

fn sort_table() -> &'static KernelTable<DType, SortKernel> {
    static TABLE: OnceLock<KernelTable<DType, SortKernel>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = KernelTable::new();
        register_sorts!(
            table, bool, i8, u8, ClampedU8, i16, u16, i32, u32, f32, f64, Complex32, Complex64
        );
        log_table_built("sort", table.len());
        table
    })
}

fn sort_buffer(
    method: SortMethod,
    desc: bool,
    x: &mut Buffer,
    lx: Lane,
    mut y: Option<(&mut Buffer, Lane)>,
) {
    let paired = y.is_some();
    let native = sort_table().get(&x.dtype()).is_some_and(|kernel| {
        let y = y.as_mut().map(|(buf, lane)| (&mut **buf, *lane));
        kernel(method, desc, x, lx, y)
    });
    if !native {
        let xs = lx.access_mut(x);
        match y {
            None => run(method, &mut { xs }, desc),
            Some((y, ly)) => run(method, &mut Paired { x: xs, y: ly.access_mut(y) }, desc),
        }
    }
    trace!(op = "sort", n = lx.len, native, paired, "sort dispatch");
}

/// Sort `n` elements of `x` in place.
///
/// Ascending when `order > 0`, descending when `order < 0`; `order == 0`,
/// a NaN `order` or `n == 0` returns `x` unchanged without validating it.
pub fn sort<'x>(
    method: SortMethod,
    n: usize,
    order: f64,
    x: &'x mut Buffer,
    sx: isize,
    ox: usize,
) -> Result<&'x mut Buffer> {
    let Some(desc) = direction(n, order) else {
        return Ok(x);
    };
    let lx = Lane::new("x", n, x.len(), sx, ox)?;
    sort_buffer(method, desc, x, lx, None);
    Ok(x)
}

/// Sort `x` and apply every move to `y` as well. `y` values are moved
/// unchanged, whatever its dtype.
#[allow(clippy::too_many_arguments)]
pub fn sort2(
    method: SortMethod,
    n: usize,
    order: f64,
    x: &mut Buffer,
    sx: isize,
    ox: usize,
    y: &mut Buffer,
    sy: isize,
    oy: usize,
) -> Result<()> {
    let Some(desc) = direction(n, order) else {
        return Ok(());
    };
    let lx = Lane::new("x", n, x.len(), sx, ox)?;
    let ly = Lane::new("y", n, y.len(), sy, oy)?;
    sort_buffer(method, desc, x, lx, Some((y, ly)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const METHODS: [SortMethod; 3] = [SortMethod::Insertion, SortMethod::Shell, SortMethod::Heap];

    fn bits(v: &[f64]) -> Vec<u64> {
        v.iter().map(|f| if f.is_nan() { u64::MAX } else { f.to_bits() }).collect()
    }

    #[test]
    fn test_nan_and_signed_zero_ordering() {
        let input = [3.0, f64::NAN, -0.0, 1.0, 0.0, f64::NAN, -2.0];
        let asc = [-2.0, -0.0, 0.0, 1.0, 3.0, f64::NAN, f64::NAN];
        let desc = [3.0, 1.0, 0.0, -0.0, -2.0, f64::NAN, f64::NAN];
        for m in METHODS {
            let mut x = input;
            sort_typed(m, 7, 1.0, &mut x, 1, 0);
            assert_eq!(bits(&x), bits(&asc), "{m:?}");
            let mut x = input;
            sort_typed(m, 7, -1.0, &mut x, 1, 0);
            assert_eq!(bits(&x), bits(&desc), "{m:?}");
        }
    }

    #[test]
    fn test_typed_strided_sort() {
        let mut x = [5, 100, 3, 100, 9, 100, 1];
        // even positions only, addressed from the end
        sort_sh(4, 1.0, &mut x, -2, 6);
        assert_eq!(x, [9, 100, 5, 100, 3, 100, 1]);
        sort_hp(7, 0.0, &mut x, 1, 0);
        assert_eq!(x[0], 9);
    }

    #[test]
    fn test_sort2_records_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        for m in METHODS {
            for n in [0usize, 1, 2, 17, 300, 1500] {
                let orig: Vec<f64> = (0..n).map(|_| rng.gen_range(-50..50) as f64).collect();
                let mut x = orig.clone();
                let mut perm: Vec<u32> = (0..n as u32).collect();
                sort2_typed(m, n, 1.0, &mut x, 1, 0, &mut perm, 1, 0);
                assert!(x.windows(2).all(|w| w[0] <= w[1]), "{m:?} n={n}");
                for (i, &p) in perm.iter().enumerate() {
                    assert_eq!(x[i], orig[p as usize]);
                }
            }
        }
    }

    #[test]
    fn test_insertion_is_stable() {
        let mut keys = [2, 1, 2, 1, 2];
        let mut tags = ['a', 'b', 'c', 'd', 'e'];
        sort2_ins(5, 1.0, &mut keys, 1, 0, &mut tags, 1, 0);
        assert_eq!(keys, [1, 1, 2, 2, 2]);
        assert_eq!(tags, ['b', 'd', 'a', 'c', 'e']);
    }

    #[test]
    fn test_buffer_sort_native_matches_fallback() {
        let mut rng = StdRng::seed_from_u64(11);
        let values: Vec<f64> = (0..200).map(|_| rng.gen::<f64>() - 0.5).collect();
        for m in METHODS {
            let mut native = Buffer::Float64(values.clone());
            let mut generic = Buffer::Generic(native.to_scalars());
            let mut p1 = Buffer::Int32((0..200).collect());
            let mut p2 = p1.clone();
            sort2(m, 100, -1.0, &mut native, 2, 0, &mut p1, 1, 0).unwrap();
            sort2(m, 100, -1.0, &mut generic, 2, 0, &mut p2, 1, 0).unwrap();
            assert_eq!(p1, p2, "{m:?}");
            assert_eq!(native.to_scalars(), generic.to_scalars());
        }
    }

    #[test]
    fn test_buffer_sort_edge_cases() {
        let mut x = Buffer::Int8(vec![3, -1, 2]);
        // no-ops skip validation
        sort(SortMethod::Heap, 0, 1.0, &mut x, 9, 99).unwrap();
        sort(SortMethod::Heap, 3, 0.0, &mut x, 9, 99).unwrap();
        sort(SortMethod::Heap, 3, f64::NAN, &mut x, 1, 0).unwrap();
        assert_eq!(x, Buffer::Int8(vec![3, -1, 2]));

        sort(SortMethod::Heap, 3, 2.5, &mut x, 1, 0).unwrap();
        assert_eq!(x, Buffer::Int8(vec![-1, 2, 3]));
        assert!(sort(SortMethod::Shell, 4, 1.0, &mut x, 1, 0).is_err());

        let mut y = Buffer::Float64(vec![0.0; 2]);
        assert!(sort2(SortMethod::Shell, 3, 1.0, &mut x, 1, 0, &mut y, 1, 0).is_err());
    }

    #[test]
    fn test_complex_sorts_by_real_part() {
        let mut x = Buffer::Complex128(vec![
            Complex64::new(2.0, -1.0),
            Complex64::new(-1.0, 5.0),
            Complex64::new(0.5, 0.0),
        ]);
        sort(SortMethod::Insertion, 3, 1.0, &mut x, 1, 0).unwrap();
        let re: Vec<f64> = x.to_scalars().iter().map(|s| s.to_f64()).collect();
        assert_eq!(re, vec![-1.0, 0.5, 2.0]);
        assert_eq!(x.get(0), Scalar::Complex(Complex64::new(-1.0, 5.0)));
    }

    #[test]
    fn test_heap_tie_order() {
        // ties come out in heap order; the values behind each index still match
        let x8 = [1.0, -1.0, 2.0, -2.0, 2.0, -3.0, 3.0, -3.0];
        let x10 = [1.0, -1.0, 2.0, f64::NAN, -2.0, 2.0, -3.0, 3.0, f64::NAN, -3.0];
        let expected: [(&[f64], f64, Vec<u32>); 4] = [
            (&x8[..], 1.0, vec![7, 5, 3, 1, 0, 2, 4, 6]),
            (&x8[..], -1.0, vec![6, 4, 2, 0, 1, 3, 5, 7]),
            (&x10[..], 1.0, vec![9, 6, 4, 1, 0, 5, 2, 7, 8, 3]),
            (&x10[..], -1.0, vec![7, 5, 2, 0, 1, 4, 6, 9, 8, 3]),
        ];
        for (orig, order, perm) in expected {
            let n = orig.len();
            let mut x = Buffer::Float64(orig.to_vec());
            let mut y = Buffer::Uint32((0..n as u32).collect());
            sort2(SortMethod::Heap, n, order, &mut x, 1, 0, &mut y, 1, 0).unwrap();
            assert_eq!(y, Buffer::Uint32(perm.clone()), "order={order}");
            for (i, &p) in perm.iter().enumerate() {
                assert_eq!(bits(&[x.get(i).to_f64()]), bits(&[orig[p as usize]]));
            }
        }
    }

    #[test]
    fn test_complex_nan_imaginary_sorts_last() {
        let nan_im = Complex64::new(-5.0, f64::NAN);
        let values = vec![
            Complex64::new(2.0, 0.0),
            nan_im,
            Complex64::new(-1.0, 1.0),
            Complex64::new(f64::NAN, 0.0),
            Complex64::new(0.5, -2.0),
        ];
        for m in METHODS {
            for order in [1.0, -1.0] {
                let mut native = Buffer::Complex128(values.clone());
                let mut generic = Buffer::Generic(native.to_scalars());
                sort(m, 5, order, &mut native, 1, 0).unwrap();
                sort(m, 5, order, &mut generic, 1, 0).unwrap();
                for x in [&native, &generic] {
                    let keys: Vec<f64> = (0..3).map(|i| x.get(i).sort_key()).collect();
                    let want = if order > 0.0 { [-1.0, 0.5, 2.0] } else { [2.0, 0.5, -1.0] };
                    assert_eq!(keys, want, "{m:?} order={order}");
                    assert!(x.get(3).sort_key().is_nan() && x.get(4).sort_key().is_nan());
                }
            }
        }
        assert!(nan_im.sort_key().is_nan());
        assert!(Complex32::new(1.0, f32::NAN).sort_key().is_nan());
        assert_eq!(Scalar::Complex(Complex64::new(3.0, -4.0)).sort_key(), 3.0);
    }
}
