//! Cumulative scans: running sums and running truthiness.
//!
//! `cusum` writes `y[i] = init + x[0] + ... + x[i]` using one of the
//! [`SumMethod`]s. The truthiness scans write booleans:
//!
//! - `cuany`: some `x[0..=i]` is truthy
//! - `cuevery`: every `x[0..=i]` is truthy
//! - `cunone`: no `x[0..=i]` is truthy
//!
//! Each comes in a plain form over a slice, an assign form over strided typed
//! slices, and a dtype-dispatched buffer form.

use std::sync::OnceLock;

use num_complex::{Complex32, Complex64};
use num_traits::Float;
use strided_dtype::{Buffer, ClampedU8, DType, Element, Scalar};
use tracing::trace;

use crate::access::{StridedAccess, StridedAccessMut};
use crate::dispatch::{log_table_built, KernelTable, Lane};
use crate::reduce::{SumMethod, PAIRWISE_BLOCK};
use crate::Result;

// ============================================================================
// Cumulative sum
// ============================================================================

#[inline(always)]
fn compensation<F: Float>(a: F, b: F, s: F) -> F {
    if a.abs() >= b.abs() {
        (a - s) + b
    } else {
        (b - s) + a
    }
}

/// Running sum of `get(0) .. get(n - 1)` starting from `init`; `put(i, s)`
/// receives each partial sum in order.
pub fn cusum_with<F: Float>(
    method: SumMethod,
    n: usize,
    init: F,
    get: impl Fn(usize) -> F,
    mut put: impl FnMut(usize, F),
) {
    match method {
        SumMethod::Ordinary => {
            let mut s = init;
            for i in 0..n {
                s = s + get(i);
                put(i, s);
            }
        }
        SumMethod::Kbn => {
            let mut s = init;
            let mut c = F::zero();
            for i in 0..n {
                let v = get(i);
                let t = s + v;
                c = c + compensation(s, v, t);
                s = t;
                put(i, s + c);
            }
        }
        SumMethod::Kbn2 => {
            let mut s = init;
            let mut cs = F::zero();
            let mut ccs = F::zero();
            for i in 0..n {
                let v = get(i);
                let t = s + v;
                let c = compensation(s, v, t);
                s = t;
                let t = cs + c;
                ccs = ccs + compensation(cs, c, t);
                cs = t;
                put(i, s + cs + ccs);
            }
        }
        SumMethod::Pairwise => {
            cusum_pairwise(0, n, init, &get, &mut put);
        }
    }
}

/// Halves the range down to [`PAIRWISE_BLOCK`]; the last partial sum of the
/// left half seeds the right half.
fn cusum_pairwise<F: Float>(
    start: usize,
    end: usize,
    init: F,
    get: &impl Fn(usize) -> F,
    put: &mut impl FnMut(usize, F),
) -> F {
    if end - start <= PAIRWISE_BLOCK {
        let mut s = init;
        for i in start..end {
            s = s + get(i);
            put(i, s);
        }
        return s;
    }
    let mid = start + (end - start) / 2;
    let s = cusum_pairwise(start, mid, init, get, put);
    cusum_pairwise(mid, end, s, get, put)
}

type CusumKernel = dyn Fn(SumMethod, Scalar, &Buffer, Lane, &mut Buffer, Lane) -> bool + Send + Sync;

fn real_cusum_kernel<F: Float + Element>(
    to_f: fn(Scalar) -> F,
) -> impl Fn(SumMethod, Scalar, &Buffer, Lane, &mut Buffer, Lane) -> bool {
    move |m, init, x, lx, y, ly| {
        let (Some(xs), Some(ys)) = (F::slice_of(x), F::slice_of_mut(y)) else {
            return false;
        };
        let (xs, mut ys) = (lx.slice(xs), ly.slice_mut(ys));
        cusum_with(m, lx.len, to_f(init), |i| xs.get(i), |i, v| ys.set(i, v));
        true
    }
}

macro_rules! complex_cusum_kernel {
    ($c:ty, $f:ty) => {
        |m: SumMethod, init: Scalar, x: &Buffer, lx: Lane, y: &mut Buffer, ly: Lane| {
            let (Some(xs), Some(ys)) = (<$c>::slice_of(x), <$c>::slice_of_mut(y)) else {
                return false;
            };
            let (xs, mut ys) = (lx.slice(xs), ly.slice_mut(ys));
            let init = init.to_complex();
            cusum_with(m, lx.len, init.re as $f, |i| xs.get(i).re, |i, v| {
                ys.set(i, <$c>::new(v, 0.0))
            });
            cusum_with(m, lx.len, init.im as $f, |i| xs.get(i).im, |i, v| {
                let re = ys.get(i).re;
                ys.set(i, <$c>::new(re, v))
            });
            true
        }
    };
}

fn cusum_table() -> &'static KernelTable<(DType, DType), CusumKernel> {
    static TABLE: OnceLock<KernelTable<(DType, DType), CusumKernel>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table: KernelTable<(DType, DType), CusumKernel> = KernelTable::new();
        table.insert_native(
            (DType::Float64, DType::Float64),
            Box::new(real_cusum_kernel::<f64>(Scalar::to_f64)),
        );
        table.insert_native(
            (DType::Float32, DType::Float32),
            Box::new(real_cusum_kernel::<f32>(|s| s.to_f64() as f32)),
        );
        table.insert_native(
            (DType::Complex128, DType::Complex128),
            Box::new(complex_cusum_kernel!(Complex64, f64)),
        );
        table.insert_native(
            (DType::Complex64, DType::Complex64),
            Box::new(complex_cusum_kernel!(Complex32, f32)),
        );
        log_table_built("cusum", table.len());
        table
    })
}

fn cusum_fallback(method: SumMethod, init: Scalar, x: &Buffer, lx: Lane, y: &mut Buffer, ly: Lane) {
    let n = lx.len;
    let src = lx.access(x);
    let single = matches!(
        (x.dtype(), y.dtype()),
        (DType::Float32, DType::Float32) | (DType::Complex64, DType::Complex64)
    );
    let complex = x.dtype().is_complex()
        || y.dtype().is_complex()
        || init.is_complex()
        || (0..n).any(|i| src.get(i).is_complex());

    if !complex {
        let mut out = vec![0.0f64; n];
        if single {
            let get = |i| src.get(i).to_f64() as f32;
            cusum_with(method, n, init.to_f64() as f32, get, |i, v| out[i] = f64::from(v));
        } else {
            cusum_with(method, n, init.to_f64(), |i| src.get(i).to_f64(), |i, v| out[i] = v);
        }
        for (i, v) in out.into_iter().enumerate() {
            y.set(ly.index(i), Scalar::Float(v));
        }
        return;
    }

    let init = init.to_complex();
    let mut out = vec![Complex64::new(0.0, 0.0); n];
    if single {
        let part = |i: usize| src.get(i).to_complex();
        cusum_with(method, n, init.re as f32, |i| part(i).re as f32, |i, v| {
            out[i].re = f64::from(v)
        });
        cusum_with(method, n, init.im as f32, |i| part(i).im as f32, |i, v| {
            out[i].im = f64::from(v)
        });
    } else {
        cusum_with(method, n, init.re, |i| src.get(i).to_complex().re, |i, v| out[i].re = v);
        cusum_with(method, n, init.im, |i| src.get(i).to_complex().im, |i, v| out[i].im = v);
    }
    for (i, v) in out.into_iter().enumerate() {
        y.set(ly.index(i), Scalar::Complex(v));
    }
}

/// `y[i] = init + x[0] + ... + x[i]` over `n` strided elements.
///
/// `float32` and `complex64` pairs accumulate in `f32`, everything else in
/// `f64`; complex inputs or a complex `init` scan real and imaginary parts
/// separately.
#[allow(clippy::too_many_arguments)]
pub fn cusum<'y>(
    method: SumMethod,
    n: usize,
    init: impl Into<Scalar>,
    x: &Buffer,
    sx: isize,
    ox: usize,
    y: &'y mut Buffer,
    sy: isize,
    oy: usize,
) -> Result<&'y mut Buffer> {
    if n == 0 {
        return Ok(y);
    }
    let init = init.into();
    let lx = Lane::new("x", n, x.len(), sx, ox)?;
    let ly = Lane::new("y", n, y.len(), sy, oy)?;
    let native = cusum_table()
        .get(&(x.dtype(), y.dtype()))
        .is_some_and(|kernel| kernel(method, init, x, lx, y, ly));
    if !native {
        cusum_fallback(method, init, x, lx, y, ly);
    }
    trace!(op = "cusum", n, native, "scan dispatch");
    Ok(y)
}

// ============================================================================
// Running truthiness
// ============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Running {
    Any,
    Every,
    None,
}

impl Running {
    fn name(self) -> &'static str {
        match self {
            Running::Any => "cuany",
            Running::Every => "cuevery",
            Running::None => "cunone",
        }
    }

    #[inline]
    fn scan(self, n: usize, truthy: impl Fn(usize) -> bool, mut put: impl FnMut(usize, bool)) {
        let mut acc = self != Running::Any;
        for i in 0..n {
            let t = truthy(i);
            acc = match self {
                Running::Any => acc || t,
                Running::Every => acc && t,
                Running::None => acc && !t,
            };
            put(i, acc);
        }
    }
}

#[inline]
fn truthy<T: Element>(v: T) -> bool {
    v.to_scalar().is_truthy()
}

/// Running "any": `out[i]` is true iff some `x[0..=i]` is truthy.
pub fn cuany<T: Element>(x: &[T]) -> Vec<bool> {
    let mut out = vec![false; x.len()];
    Running::Any.scan(x.len(), |i| truthy(x[i]), |i, v| out[i] = v);
    out
}

pub fn cuevery<T: Element>(x: &[T]) -> Vec<bool> {
    let mut out = vec![false; x.len()];
    Running::Every.scan(x.len(), |i| truthy(x[i]), |i, v| out[i] = v);
    out
}

pub fn cunone<T: Element>(x: &[T]) -> Vec<bool> {
    let mut out = vec![false; x.len()];
    Running::None.scan(x.len(), |i| truthy(x[i]), |i, v| out[i] = v);
    out
}

#[allow(clippy::too_many_arguments)]
#[inline]
fn assign_typed<T: Element>(
    kind: Running,
    n: usize,
    x: &[T],
    sx: isize,
    ox: usize,
    y: &mut [bool],
    sy: isize,
    oy: usize,
) {
    let at = |o: usize, s: isize, i: usize| (o as isize + i as isize * s) as usize;
    kind.scan(n, |i| truthy(x[at(ox, sx, i)]), |i, v| y[at(oy, sy, i)] = v);
}

/// Strided running "any" from `x[ox]` into `y[oy]`.
///
/// # Panics
/// Panics if an index falls outside `x` or `y`.
pub fn cuany_assign<T: Element>(
    n: usize,
    x: &[T],
    sx: isize,
    ox: usize,
    y: &mut [bool],
    sy: isize,
    oy: usize,
) {
    assign_typed(Running::Any, n, x, sx, ox, y, sy, oy);
}

pub fn cuevery_assign<T: Element>(
    n: usize,
    x: &[T],
    sx: isize,
    ox: usize,
    y: &mut [bool],
    sy: isize,
    oy: usize,
) {
    assign_typed(Running::Every, n, x, sx, ox, y, sy, oy);
}

pub fn cunone_assign<T: Element>(
    n: usize,
    x: &[T],
    sx: isize,
    ox: usize,
    y: &mut [bool],
    sy: isize,
    oy: usize,
) {
    assign_typed(Running::None, n, x, sx, ox, y, sy, oy);
}

type TruthyKernel = dyn Fn(&Buffer, Lane, &mut Buffer, Lane) -> bool + Send + Sync;

fn truthy_kernel<T: Element>(kind: Running) -> Box<TruthyKernel> {
    Box::new(move |x: &Buffer, lx: Lane, y: &mut Buffer, ly: Lane| {
        let (Some(xs), Some(ys)) = (T::slice_of(x), bool::slice_of_mut(y)) else {
            return false;
        };
        let (xs, mut ys) = (lx.slice(xs), ly.slice_mut(ys));
        kind.scan(lx.len, |i| truthy(xs.get(i)), |i, v| ys.set(i, v));
        true
    })
}

macro_rules! register_truthy {
    ($table:ident, $kind:expr, $($t:ty),*) => {
        $($table.insert_native(<$t>::DTYPE, truthy_kernel::<$t>($kind));)*
    };
}

fn truthy_table(kind: Running) -> &'static KernelTable<DType, TruthyKernel> {
    static ANY: OnceLock<KernelTable<DType, TruthyKernel>> = OnceLock::new();
    static EVERY: OnceLock<KernelTable<DType, TruthyKernel>> = OnceLock::new();
    static NONE: OnceLock<KernelTable<DType, TruthyKernel>> = OnceLock::new();
    let cell = match kind {
        Running::Any => &ANY,
        Running::Every => &EVERY,
        Running::None => &NONE,
    };
    cell.get_or_init(|| {
        let mut table = KernelTable::new();
        register_truthy!(
            table, kind, bool, i8, u8, ClampedU8, i16, u16, i32, u32, f32, f64, Complex32,
            Complex64
        );
        log_table_built(kind.name(), table.len());
        table
    })
}

#[allow(clippy::too_many_arguments)]
fn truthy_buffer<'y>(
    kind: Running,
    n: usize,
    x: &Buffer,
    sx: isize,
    ox: usize,
    y: &'y mut Buffer,
    sy: isize,
    oy: usize,
) -> Result<&'y mut Buffer> {
    if n == 0 {
        return Ok(y);
    }
    let lx = Lane::new("x", n, x.len(), sx, ox)?;
    let ly = Lane::new("y", n, y.len(), sy, oy)?;
    let native = (y.dtype() == DType::Bool)
        && truthy_table(kind)
            .get(&x.dtype())
            .is_some_and(|kernel| kernel(x, lx, y, ly));
    if !native {
        let src = lx.access(x);
        let mut out = vec![false; n];
        kind.scan(n, |i| src.get(i).is_truthy(), |i, v| out[i] = v);
        for (i, v) in out.into_iter().enumerate() {
            y.set(ly.index(i), Scalar::Bool(v));
        }
    }
    trace!(op = kind.name(), n, native, "scan dispatch");
    Ok(y)
}

/// Running "any" between buffers of any dtype; `y` receives booleans
/// converted to its own dtype.
pub fn cuany_buffer<'y>(
    n: usize,
    x: &Buffer,
    sx: isize,
    ox: usize,
    y: &'y mut Buffer,
    sy: isize,
    oy: usize,
) -> Result<&'y mut Buffer> {
    truthy_buffer(Running::Any, n, x, sx, ox, y, sy, oy)
}

pub fn cuevery_buffer<'y>(
    n: usize,
    x: &Buffer,
    sx: isize,
    ox: usize,
    y: &'y mut Buffer,
    sy: isize,
    oy: usize,
) -> Result<&'y mut Buffer> {
    truthy_buffer(Running::Every, n, x, sx, ox, y, sy, oy)
}

pub fn cunone_buffer<'y>(
    n: usize,
    x: &Buffer,
    sx: isize,
    ox: usize,
    y: &'y mut Buffer,
    sy: isize,
    oy: usize,
) -> Result<&'y mut Buffer> {
    truthy_buffer(Running::None, n, x, sx, ox, y, sy, oy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StridedError;

    fn floats(buf: &Buffer) -> Vec<f64> {
        buf.to_scalars().iter().map(|s| s.to_f64()).collect()
    }

    #[test]
    fn test_cusum_methods() {
        let x = Buffer::Float64(vec![1.0, 2.0, 3.0, 4.0]);
        for m in [SumMethod::Ordinary, SumMethod::Kbn, SumMethod::Kbn2, SumMethod::Pairwise] {
            let mut y = Buffer::zeros(DType::Float64, 4);
            cusum(m, 4, 10.0, &x, 1, 0, &mut y, 1, 0).unwrap();
            assert_eq!(floats(&y), vec![11.0, 13.0, 16.0, 20.0], "{m:?}");
        }
    }

    #[test]
    fn test_cusum_kbn_keeps_small_terms() {
        let x = Buffer::Float64(vec![1e100, 1.0, -1e100]);
        let mut y = Buffer::zeros(DType::Float64, 3);
        cusum(SumMethod::Kbn, 3, 0.0, &x, 1, 0, &mut y, 1, 0).unwrap();
        assert_eq!(floats(&y)[2], 1.0);
        cusum(SumMethod::Ordinary, 3, 0.0, &x, 1, 0, &mut y, 1, 0).unwrap();
        assert_eq!(floats(&y)[2], 0.0);
    }

    #[test]
    fn test_cusum_pairwise_long_input() {
        let n = 1000;
        let x = Buffer::Int32((1..=n as i32).collect());
        let mut y = Buffer::zeros(DType::Float64, n);
        cusum(SumMethod::Pairwise, n, 0, &x, 1, 0, &mut y, -1, n - 1).unwrap();
        let got = floats(&y);
        // written backwards
        assert_eq!(got[n - 1], 1.0);
        assert_eq!(got[0], 500_500.0);
    }

    #[test]
    fn test_cusum_native_matches_fallback() {
        let values: Vec<f32> = (0..200).map(|i| (i as f32).cos() * 10.0).collect();
        let x = Buffer::Float32(values.clone());
        let mut native = Buffer::zeros(DType::Float32, 200);
        cusum(SumMethod::Kbn2, 200, 0.5f32, &x, 1, 0, &mut native, 1, 0).unwrap();

        let lx = Lane::new("x", 200, 200, 1, 0).unwrap();
        let mut fallback = Buffer::zeros(DType::Float32, 200);
        cusum_fallback(SumMethod::Kbn2, Scalar::Float(0.5), &x, lx, &mut fallback, lx);
        assert_eq!(native, fallback);
    }

    #[test]
    fn test_cusum_complex() {
        let x = Buffer::Complex128(vec![Complex64::new(1.0, 1.0), Complex64::new(2.0, -3.0)]);
        let mut y = Buffer::zeros(DType::Complex128, 2);
        cusum(SumMethod::Kbn, 2, Complex64::new(0.0, 1.0), &x, 1, 0, &mut y, 1, 0).unwrap();
        assert_eq!(
            y,
            Buffer::Complex128(vec![Complex64::new(1.0, 2.0), Complex64::new(3.0, -1.0)])
        );
        // complex init into a generic output
        let r = Buffer::Float64(vec![1.0, 2.0]);
        let mut g = Buffer::zeros(DType::Generic, 2);
        cusum(SumMethod::Ordinary, 2, Complex64::new(0.0, 1.0), &r, 1, 0, &mut g, 1, 0).unwrap();
        assert_eq!(g.get(1), Scalar::Complex(Complex64::new(3.0, 1.0)));
    }

    #[test]
    fn test_cusum_validates_operands() {
        let x = Buffer::Float64(vec![1.0; 3]);
        let mut y = Buffer::zeros(DType::Float64, 2);
        let err = cusum(SumMethod::Kbn, 3, 0.0, &x, 1, 0, &mut y, 1, 0).unwrap_err();
        assert!(matches!(err, StridedError::OperandOutOfBounds { operand: "y", .. }));
    }

    #[test]
    fn test_truthiness_plain() {
        let x = [0.0, f64::NAN, 2.0, 0.0];
        assert_eq!(cuany(&x), vec![false, false, true, true]);
        assert_eq!(cuevery(&[1, 3, 0, 4]), vec![true, true, false, false]);
        assert_eq!(cunone(&x), vec![true, true, false, false]);
        assert!(cuany::<u8>(&[]).is_empty());
    }

    #[test]
    fn test_truthiness_assign_strided() {
        let x = [1i32, 9, 0, 9, 1, 9];
        let mut y = [true; 3];
        // x[4], x[2], x[0]
        cuevery_assign(3, &x, -2, 4, &mut y, 1, 0);
        assert_eq!(y, [true, false, false]);
        cuany_assign(3, &x, 2, 0, &mut y, -1, 2);
        assert_eq!(y, [true, true, true]);
    }

    #[test]
    fn test_truthiness_buffers() {
        let x = Buffer::Uint8(vec![0, 0, 5, 0]);
        let mut y = Buffer::zeros(DType::Bool, 4);
        cuany_buffer(4, &x, 1, 0, &mut y, 1, 0).unwrap();
        assert_eq!(y, Buffer::Bool(vec![false, false, true, true]));

        // generic output goes through the fallback
        let mut g = Buffer::zeros(DType::Generic, 4);
        cunone_buffer(4, &x, 1, 0, &mut g, 1, 0).unwrap();
        assert_eq!(
            g.to_scalars(),
            [true, true, false, false].map(Scalar::Bool).to_vec()
        );

        let gen = Buffer::Generic(vec![Scalar::Int(1), Scalar::Float(0.0)]);
        let mut out = Buffer::zeros(DType::Int8, 2);
        cuevery_buffer(2, &gen, 1, 0, &mut out, 1, 0).unwrap();
        assert_eq!(out, Buffer::Int8(vec![1, 0]));
    }
}
