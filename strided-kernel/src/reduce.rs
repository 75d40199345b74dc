//! Compensated summation and the two-pass mean.
//!
//! Every algorithm is written once over an index getter `Fn(usize) -> F`
//! with `F: num_traits::Float`, and traverses its input left to right.
//! The native kernels feed it typed strided slices; the fallback feeds it
//! values read through [`Buffer::get`].
//!
//! Precision follows the element type: `float32` and `complex64` accumulate
//! in `f32`, everything else (integers included) in `f64`. Both paths use the
//! same precision, so they agree bit for bit.

use std::sync::OnceLock;

use num_complex::{Complex32, Complex64};
use num_traits::Float;
use strided_dtype::{Buffer, ClampedU8, DType, Element, Scalar};

use crate::access::{BufferAccess, StridedAccess, StridedSlice};
use crate::dispatch::{log_table_built, ReduceDispatch};
use crate::Result;

/// Block length below which [`SumMethod::Pairwise`] sums sequentially.
pub const PAIRWISE_BLOCK: usize = 128;

/// Summation algorithm.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SumMethod {
    /// Plain left-to-right accumulation.
    Ordinary,
    /// Kahan–Babuška–Neumaier.
    #[default]
    Kbn,
    /// Second-order Kahan–Babuška.
    Kbn2,
    /// Recursive halving down to blocks of [`PAIRWISE_BLOCK`].
    Pairwise,
}

// ============================================================================
// Generic algorithms
// ============================================================================

/// Sum `get(0) .. get(n - 1)` with `method`.
///
/// `n == 0` gives zero and `n == 1` gives `get(0)` unchanged.
pub fn sum_with<F: Float>(method: SumMethod, n: usize, get: impl Fn(usize) -> F) -> F {
    match n {
        0 => F::zero(),
        1 => get(0),
        _ => match method {
            SumMethod::Ordinary => ordinary(0, n, &get),
            SumMethod::Kbn => kbn(n, &get),
            SumMethod::Kbn2 => kbn2(n, &get),
            SumMethod::Pairwise => pairwise(0, n, &get),
        },
    }
}

#[inline]
fn ordinary<F: Float>(start: usize, end: usize, get: &impl Fn(usize) -> F) -> F {
    (start..end).fold(F::zero(), |acc, i| acc + get(i))
}

/// Rounding error of `a + b`, given `s = a + b`.
#[inline(always)]
fn two_sum_err<F: Float>(a: F, b: F, s: F) -> F {
    if a.abs() >= b.abs() {
        (a - s) + b
    } else {
        (b - s) + a
    }
}

fn kbn<F: Float>(n: usize, get: &impl Fn(usize) -> F) -> F {
    let mut sum = get(0);
    let mut c = F::zero();
    for i in 1..n {
        let v = get(i);
        let t = sum + v;
        c = c + two_sum_err(sum, v, t);
        sum = t;
    }
    sum + c
}

fn kbn2<F: Float>(n: usize, get: &impl Fn(usize) -> F) -> F {
    let mut sum = F::zero();
    let mut cs = F::zero();
    let mut ccs = F::zero();
    for i in 0..n {
        let v = get(i);
        let t = sum + v;
        let c = two_sum_err(sum, v, t);
        sum = t;
        let t = cs + c;
        ccs = ccs + two_sum_err(cs, c, t);
        cs = t;
    }
    sum + cs + ccs
}

fn pairwise<F: Float>(start: usize, end: usize, get: &impl Fn(usize) -> F) -> F {
    let n = end - start;
    if n <= PAIRWISE_BLOCK {
        return ordinary(start, end, get);
    }
    let mid = start + n / 2;
    pairwise(start, mid, get) + pairwise(mid, end, get)
}

/// Two-pass mean: a pairwise mean, then the pairwise mean of the residuals
/// added back. `n == 0` gives NaN.
pub fn mean_with<F: Float>(n: usize, get: impl Fn(usize) -> F) -> F {
    match n {
        0 => F::nan(),
        1 => get(0),
        _ => {
            let count: F = num_traits::cast(n).unwrap_or_else(F::nan);
            let mu = pairwise(0, n, &get) / count;
            mu + pairwise(0, n, &|i| get(i) - mu) / count
        }
    }
}

// ============================================================================
// Typed entry points
// ============================================================================

#[inline(always)]
fn strided<F: Copy>(x: &[F], stride: isize, offset: usize) -> impl Fn(usize) -> F + '_ {
    move |i| x[(offset as isize + i as isize * stride) as usize]
}

/// Ordinary sum of `n` elements of `x` starting at `offset`.
pub fn sum_ordinary<F: Float>(n: usize, x: &[F], stride: isize, offset: usize) -> F {
    sum_with(SumMethod::Ordinary, n, strided(x, stride, offset))
}

pub fn sum_kbn<F: Float>(n: usize, x: &[F], stride: isize, offset: usize) -> F {
    sum_with(SumMethod::Kbn, n, strided(x, stride, offset))
}

pub fn sum_kbn2<F: Float>(n: usize, x: &[F], stride: isize, offset: usize) -> F {
    sum_with(SumMethod::Kbn2, n, strided(x, stride, offset))
}

pub fn sum_pairwise<F: Float>(n: usize, x: &[F], stride: isize, offset: usize) -> F {
    sum_with(SumMethod::Pairwise, n, strided(x, stride, offset))
}

// ============================================================================
// Dispatch
// ============================================================================

/// Whether a fallback reduction works on complex values.
fn complex_mode(x: &BufferAccess<'_>) -> bool {
    x.buffer().dtype().is_complex() || (0..x.len()).any(|i| x.get(i).is_complex())
}

fn f32_complex(re: f32, im: f32) -> Scalar {
    Scalar::Complex(Complex64::new(f64::from(re), f64::from(im)))
}

fn sum_fallback(method: SumMethod, x: &BufferAccess<'_>) -> Scalar {
    let n = x.len();
    match x.buffer().dtype() {
        DType::Float32 => Scalar::Float(f64::from(sum_with(method, n, |i| {
            x.get(i).to_f64() as f32
        }))),
        DType::Complex64 => f32_complex(
            sum_with(method, n, |i| x.get(i).to_complex().re as f32),
            sum_with(method, n, |i| x.get(i).to_complex().im as f32),
        ),
        _ if complex_mode(x) => Scalar::Complex(Complex64::new(
            sum_with(method, n, |i| x.get(i).to_complex().re),
            sum_with(method, n, |i| x.get(i).to_complex().im),
        )),
        _ => Scalar::Float(sum_with(method, n, |i| x.get(i).to_f64())),
    }
}

fn mean_fallback(_: (), x: &BufferAccess<'_>) -> Scalar {
    let n = x.len();
    match x.buffer().dtype() {
        DType::Float32 => Scalar::Float(f64::from(mean_with(n, |i| x.get(i).to_f64() as f32))),
        DType::Complex64 => f32_complex(
            mean_with(n, |i| x.get(i).to_complex().re as f32),
            mean_with(n, |i| x.get(i).to_complex().im as f32),
        ),
        _ if complex_mode(x) => Scalar::Complex(Complex64::new(
            mean_with(n, |i| x.get(i).to_complex().re),
            mean_with(n, |i| x.get(i).to_complex().im),
        )),
        _ => Scalar::Float(mean_with(n, |i| x.get(i).to_f64())),
    }
}

/// Integer-like elements accumulate in `f64`.
fn widen<'a, 'b: 'a, T: Element>(x: &'a StridedSlice<'b, T>) -> impl Fn(usize) -> f64 + 'a {
    move |i| x.get(i).to_scalar().to_f64()
}

macro_rules! register_widening {
    ($table:expr, $kernel:ident, $($t:ty),*) => {
        $table$(.with_native::<$t>($kernel::<$t>))*
    };
}

fn sum_widened<T: Element>(method: SumMethod, x: StridedSlice<'_, T>) -> Scalar {
    Scalar::Float(sum_with(method, x.len(), widen(&x)))
}

fn mean_widened<T: Element>(_: (), x: StridedSlice<'_, T>) -> Scalar {
    Scalar::Float(mean_with(x.len(), widen(&x)))
}

fn sum_table() -> &'static ReduceDispatch<SumMethod> {
    static TABLE: OnceLock<ReduceDispatch<SumMethod>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let table = ReduceDispatch::new("sum", sum_fallback)
            .with_native::<f64>(|m, x| Scalar::Float(sum_with(m, x.len(), |i| x.get(i))))
            .with_native::<f32>(|m, x| {
                Scalar::Float(f64::from(sum_with(m, x.len(), |i| x.get(i))))
            })
            .with_native::<Complex64>(|m, x| {
                Scalar::Complex(Complex64::new(
                    sum_with(m, x.len(), |i| x.get(i).re),
                    sum_with(m, x.len(), |i| x.get(i).im),
                ))
            })
            .with_native::<Complex32>(|m, x| {
                f32_complex(
                    sum_with(m, x.len(), |i| x.get(i).re),
                    sum_with(m, x.len(), |i| x.get(i).im),
                )
            });
        let table = register_widening!(table, sum_widened, i8, u8, ClampedU8, i16, u16, i32, u32);
        log_table_built(table.name(), table.native_count());
        table
    })
}

fn mean_table() -> &'static ReduceDispatch<()> {
    static TABLE: OnceLock<ReduceDispatch<()>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let table = ReduceDispatch::new("mean", mean_fallback)
            .with_native::<f64>(|_, x| Scalar::Float(mean_with(x.len(), |i| x.get(i))))
            .with_native::<f32>(|_, x| {
                Scalar::Float(f64::from(mean_with(x.len(), |i| x.get(i))))
            })
            .with_native::<Complex64>(|_, x| {
                Scalar::Complex(Complex64::new(
                    mean_with(x.len(), |i| x.get(i).re),
                    mean_with(x.len(), |i| x.get(i).im),
                ))
            })
            .with_native::<Complex32>(|_, x| {
                f32_complex(
                    mean_with(x.len(), |i| x.get(i).re),
                    mean_with(x.len(), |i| x.get(i).im),
                )
            });
        let table = register_widening!(table, mean_widened, i8, u8, ClampedU8, i16, u16, i32, u32);
        log_table_built(table.name(), table.native_count());
        table
    })
}

/// Sum `n` elements of `x` at stride `sx` from offset `ox`.
///
/// Real inputs return [`Scalar::Float`]; complex inputs (including generic
/// buffers holding a complex value) return [`Scalar::Complex`].
pub fn sum(method: SumMethod, n: usize, x: &Buffer, sx: isize, ox: usize) -> Result<Scalar> {
    sum_table().apply(method, n, x, sx, ox)
}

/// Arithmetic mean of `n` elements; NaN when `n == 0`.
pub fn mean(n: usize, x: &Buffer, sx: isize, ox: usize) -> Result<Scalar> {
    mean_table().apply((), n, x, sx, ox)
}
