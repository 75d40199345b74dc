//! Built-in elementwise operations.
//!
//! `assign`, `abs`, `add` and `mul` keep one dispatch table each for the
//! life of the process; `scale` and `fill` close over their argument and
//! build a table per call. Every native kernel reproduces its fallback
//! exactly, including integer wrapping and `uint8c` saturation.

use std::sync::OnceLock;

use num_complex::{Complex32, Complex64};
use strided_dtype::{Buffer, ClampedU8, Element, Scalar};

use crate::dispatch::{
    dispatch, log_table_built, BinaryDispatch, NativeUnary, NullaryDispatch, UnaryDispatch,
};
use crate::Result;

#[inline]
fn convert<T: Element, U: Element>(v: T) -> U {
    U::from_scalar(v.to_scalar())
}

fn widen32(c: Complex32) -> Complex64 {
    Complex64::new(f64::from(c.re), f64::from(c.im))
}

fn narrow64(c: Complex64) -> Complex32 {
    Complex32::new(c.re as f32, c.im as f32)
}

// ============================================================================
// assign
// ============================================================================

macro_rules! identities {
    ($($t:ty),*) => {
        [$(NativeUnary::new::<$t, $t>(|v| v)),*]
    };
}

macro_rules! casts_to {
    ($u:ty: $($t:ty),*) => {
        [$(NativeUnary::new::<$t, $u>(convert::<$t, $u>)),*]
    };
}

/// Cast-copy: `y[i] = x[i]` converted to `y`'s dtype.
pub fn assign_op() -> &'static UnaryDispatch {
    static OP: OnceLock<UnaryDispatch> = OnceLock::new();
    OP.get_or_init(|| {
        let natives = identities!(
            bool, i8, u8, ClampedU8, i16, u16, i32, u32, f32, f64, Complex32, Complex64
        )
        .into_iter()
        .chain(casts_to!(f64: bool, i8, u8, ClampedU8, i16, u16, i32, u32, f32))
        .chain(casts_to!(f32: i8, u8, ClampedU8, i16, u16, i32, u32, f64))
        .chain(casts_to!(Complex64: f64, f32, Complex32))
        .chain(casts_to!(Complex32: Complex64))
        .chain(casts_to!(i32: f64, f32, i16, u16))
        .chain(casts_to!(u8: f64, f32, i32))
        .chain(casts_to!(ClampedU8: f64, f32, i32, u8));
        dispatch("assign", natives, |v| v)
    })
}

// ============================================================================
// abs
// ============================================================================

/// `y[i] = |x[i]|`; complex inputs yield their modulus.
pub fn abs_op() -> &'static UnaryDispatch {
    static OP: OnceLock<UnaryDispatch> = OnceLock::new();
    OP.get_or_init(|| {
        let op = UnaryDispatch::new("abs", Scalar::abs)
            .with_native::<f64, f64>(f64::abs)
            .with_native::<f32, f32>(f32::abs)
            .with_native::<i8, i8>(i8::wrapping_abs)
            .with_native::<i16, i16>(i16::wrapping_abs)
            .with_native::<i32, i32>(i32::wrapping_abs)
            .with_native::<u8, u8>(|v| v)
            .with_native::<ClampedU8, ClampedU8>(|v| v)
            .with_native::<u16, u16>(|v| v)
            .with_native::<u32, u32>(|v| v)
            .with_native::<Complex64, f64>(|c| c.norm())
            .with_native::<Complex32, f32>(|c| widen32(c).norm() as f32);
        log_table_built(op.name(), op.native_count());
        op
    })
}

// ============================================================================
// scale
// ============================================================================

/// `y[i] = alpha * x[i]`.
pub fn scale_op(alpha: impl Into<Scalar>) -> UnaryDispatch {
    let alpha = alpha.into();
    let op = UnaryDispatch::new("scale", move |v| v * alpha);
    match alpha {
        Scalar::Complex(a) => op
            .with_native::<Complex64, Complex64>(move |v| v * a)
            .with_native::<Complex32, Complex32>(move |v| narrow64(widen32(v) * a)),
        Scalar::Int(a) => {
            let af = a as f64;
            op.with_native::<f64, f64>(move |v| v * af)
                .with_native::<f32, f32>(move |v| (f64::from(v) * af) as f32)
                .with_native::<i32, i32>(move |v| i64::from(v).wrapping_mul(a) as i32)
                .with_native::<i16, i16>(move |v| i64::from(v).wrapping_mul(a) as i16)
        }
        real => {
            let a = real.to_f64();
            let ac = Complex64::new(a, 0.0);
            op.with_native::<f64, f64>(move |v| v * a)
                .with_native::<f32, f32>(move |v| (f64::from(v) * a) as f32)
                .with_native::<Complex64, Complex64>(move |v| v * ac)
        }
    }
}

// ============================================================================
// add, mul
// ============================================================================

macro_rules! wrapping_binary {
    ($op:expr, $method:ident, $($t:ty),*) => {
        $op$(.with_native::<$t, $t, $t>(<$t>::$method))*
    };
}

/// `z[i] = x[i] + y[i]`.
pub fn add_op() -> &'static BinaryDispatch {
    static OP: OnceLock<BinaryDispatch> = OnceLock::new();
    OP.get_or_init(|| {
        let op = BinaryDispatch::new("add", |a, b| a + b)
            .with_native::<f64, f64, f64>(|a, b| a + b)
            .with_native::<f32, f32, f32>(|a, b| a + b)
            .with_native::<Complex64, Complex64, Complex64>(|a, b| a + b)
            .with_native::<Complex32, Complex32, Complex32>(|a, b| a + b)
            .with_native::<ClampedU8, ClampedU8, ClampedU8>(|a, b| ClampedU8(a.0.saturating_add(b.0)));
        let op = wrapping_binary!(op, wrapping_add, i8, u8, i16, u16, i32, u32);
        log_table_built(op.name(), op.native_count());
        op
    })
}

/// `z[i] = x[i] * y[i]`.
pub fn mul_op() -> &'static BinaryDispatch {
    static OP: OnceLock<BinaryDispatch> = OnceLock::new();
    OP.get_or_init(|| {
        let op = BinaryDispatch::new("mul", |a, b| a * b)
            .with_native::<f64, f64, f64>(|a, b| a * b)
            .with_native::<f32, f32, f32>(|a, b| a * b)
            .with_native::<Complex64, Complex64, Complex64>(|a, b| a * b)
            .with_native::<Complex32, Complex32, Complex32>(|a, b| {
                narrow64(widen32(a) * widen32(b))
            })
            .with_native::<ClampedU8, ClampedU8, ClampedU8>(|a, b| ClampedU8(a.0.saturating_mul(b.0)));
        let op = wrapping_binary!(op, wrapping_mul, i8, u8, i16, u16, i32, u32);
        log_table_built(op.name(), op.native_count());
        op
    })
}

// ============================================================================
// fill
// ============================================================================

macro_rules! constant_natives {
    ($op:expr, $value:expr, $($t:ty),*) => {
        $op$(.with_native::<$t>({
            let v = <$t>::from_scalar($value);
            move || v
        }))*
    };
}

/// `x[i] = value`, converted to `x`'s dtype.
pub fn fill_op(value: impl Into<Scalar>) -> NullaryDispatch {
    let value = value.into();
    let op = NullaryDispatch::new("fill", move || value);
    constant_natives!(
        op, value, bool, i8, u8, ClampedU8, i16, u16, i32, u32, f32, f64, Complex32, Complex64
    )
}

// ============================================================================
// Strided entry points
// ============================================================================

/// Cast-copy `n` elements of `x` into `y`.
pub fn assign<'y>(
    n: usize,
    x: &Buffer,
    sx: isize,
    ox: usize,
    y: &'y mut Buffer,
    sy: isize,
    oy: usize,
) -> Result<&'y mut Buffer> {
    assign_op().apply(n, x, sx, ox, y, sy, oy)
}

pub fn abs<'y>(
    n: usize,
    x: &Buffer,
    sx: isize,
    ox: usize,
    y: &'y mut Buffer,
    sy: isize,
    oy: usize,
) -> Result<&'y mut Buffer> {
    abs_op().apply(n, x, sx, ox, y, sy, oy)
}

#[allow(clippy::too_many_arguments)]
pub fn scale<'y>(
    alpha: impl Into<Scalar>,
    n: usize,
    x: &Buffer,
    sx: isize,
    ox: usize,
    y: &'y mut Buffer,
    sy: isize,
    oy: usize,
) -> Result<&'y mut Buffer> {
    scale_op(alpha).apply(n, x, sx, ox, y, sy, oy)
}

#[allow(clippy::too_many_arguments)]
pub fn add<'z>(
    n: usize,
    x: &Buffer,
    sx: isize,
    ox: usize,
    y: &Buffer,
    sy: isize,
    oy: usize,
    z: &'z mut Buffer,
    sz: isize,
    oz: usize,
) -> Result<&'z mut Buffer> {
    add_op().apply(n, x, sx, ox, y, sy, oy, z, sz, oz)
}

#[allow(clippy::too_many_arguments)]
pub fn mul<'z>(
    n: usize,
    x: &Buffer,
    sx: isize,
    ox: usize,
    y: &Buffer,
    sy: isize,
    oy: usize,
    z: &'z mut Buffer,
    sz: isize,
    oz: usize,
) -> Result<&'z mut Buffer> {
    mul_op().apply(n, x, sx, ox, y, sy, oy, z, sz, oz)
}

pub fn fill(value: impl Into<Scalar>, n: usize, x: &mut Buffer, sx: isize, ox: usize) -> Result<&mut Buffer> {
    fill_op(value).apply(n, x, sx, ox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KernelPath;
    use strided_dtype::DType;

    /// Same input through a typed buffer and a generic one.
    fn both_paths(op: &UnaryDispatch, x: &Buffer, out: DType) -> (Buffer, Buffer) {
        let n = x.len();
        let mut typed = Buffer::zeros(out, n);
        op.apply(n, x, 1, 0, &mut typed, 1, 0).unwrap();
        let generic = Buffer::Generic(x.to_scalars());
        let mut via = Buffer::zeros(DType::Generic, n);
        op.apply(n, &generic, 1, 0, &mut via, 1, 0).unwrap();
        (typed, Buffer::from_scalars(out, &via.to_scalars()))
    }

    /// Element-wise equality on bit patterns, so NaNs compare equal to
    /// themselves and `-0.0` differs from `0.0`.
    fn assert_same_bits(a: &Buffer, b: &Buffer, context: &str) {
        fn bits(v: Scalar) -> (u8, u64, u64) {
            match v {
                Scalar::Bool(b) => (0, u64::from(b), 0),
                Scalar::Int(i) => (1, i as u64, 0),
                Scalar::Float(f) => (2, f.to_bits(), 0),
                Scalar::Complex(c) => (3, c.re.to_bits(), c.im.to_bits()),
            }
        }
        assert_eq!(a.dtype(), b.dtype(), "{context}");
        let (a, b) = (a.to_scalars(), b.to_scalars());
        assert_eq!(a.len(), b.len(), "{context}");
        for (i, (&x, &y)) in a.iter().zip(&b).enumerate() {
            assert_eq!(bits(x), bits(y), "{context}: element {i} is {x:?} vs {y:?}");
        }
    }

    #[test]
    fn test_assign_casts_match_fallback() {
        let x = Buffer::Float64(vec![300.0, -1.0, 128.7, f64::NAN, -0.5, 1e10]);
        for out in [DType::Uint8, DType::Uint8c, DType::Int32, DType::Int16, DType::Float32] {
            let (native, fallback) = both_paths(assign_op(), &x, out);
            assert_same_bits(&native, &fallback, out.as_str());
        }
        let (native, _) = both_paths(assign_op(), &x, DType::Float32);
        assert!(native.get(3).is_nan());
        let mut y = Buffer::zeros(DType::Uint8c, 3);
        assign(3, &x, 1, 0, &mut y, 1, 0).unwrap();
        assert_eq!(y, Buffer::Uint8c(vec![ClampedU8(255), ClampedU8(0), ClampedU8(129)]));
        let mut y = Buffer::zeros(DType::Uint8, 2);
        assign(2, &x, 1, 0, &mut y, 1, 0).unwrap();
        assert_eq!(y, Buffer::Uint8(vec![44, 255]));
    }

    #[test]
    fn test_assign_to_binary_uses_fallback() {
        assert_eq!(
            assign_op().resolve(DType::Float64, DType::Binary),
            KernelPath::Fallback
        );
        let x = Buffer::Int16(vec![-1, 256, 65]);
        let mut y = Buffer::zeros(DType::Binary, 3);
        assign(3, &x, 1, 0, &mut y, 1, 0).unwrap();
        assert_eq!(y, Buffer::Binary(vec![255, 0, 65]));
    }

    #[test]
    fn test_abs() {
        let x = Buffer::Int8(vec![-3, i8::MIN, 7]);
        let (native, fallback) = both_paths(abs_op(), &x, DType::Int8);
        assert_eq!(native, Buffer::Int8(vec![3, i8::MIN, 7]));
        assert_same_bits(&native, &fallback, "abs int8");

        let c = Buffer::Complex64(vec![Complex32::new(3.0, 4.0), Complex32::new(-1.0, 0.0)]);
        let (native, fallback) = both_paths(abs_op(), &c, DType::Float32);
        assert_eq!(native, Buffer::Float32(vec![5.0, 1.0]));
        assert_same_bits(&native, &fallback, "abs complex64");
    }

    #[test]
    fn test_scale_per_alpha_kind() {
        let x = Buffer::Float32(vec![0.1, 1.5, -2.25]);
        for alpha in [Scalar::Int(3), Scalar::Float(0.3), Scalar::Bool(true)] {
            let (native, fallback) = both_paths(&scale_op(alpha), &x, DType::Float32);
            assert_same_bits(&native, &fallback, &format!("{alpha:?}"));
        }
        let ints = Buffer::Int32(vec![i32::MAX, -4]);
        let (native, fallback) = both_paths(&scale_op(2), &ints, DType::Int32);
        assert_eq!(native, Buffer::Int32(vec![-2, -8]));
        assert_same_bits(&native, &fallback, "scale int32");

        let mut y = Buffer::zeros(DType::Complex128, 1);
        scale(Complex64::new(0.0, 1.0), 1, &Buffer::Float64(vec![2.0]), 1, 0, &mut y, 1, 0).unwrap();
        assert_eq!(y, Buffer::Complex128(vec![Complex64::new(0.0, 2.0)]));
    }

    #[test]
    fn test_add_and_mul_wrap_and_saturate() {
        let a = Buffer::Uint8(vec![250, 3]);
        let b = Buffer::Uint8(vec![10, 4]);
        let mut z = Buffer::zeros(DType::Uint8, 2);
        add(2, &a, 1, 0, &b, 1, 0, &mut z, 1, 0).unwrap();
        assert_eq!(z, Buffer::Uint8(vec![4, 7]));

        let a = Buffer::Uint8c(vec![ClampedU8(250), ClampedU8(20)]);
        let b = Buffer::Uint8c(vec![ClampedU8(10), ClampedU8(20)]);
        let mut z = Buffer::zeros(DType::Uint8c, 2);
        mul(2, &a, 1, 0, &b, 1, 0, &mut z, 1, 0).unwrap();
        assert_eq!(z, Buffer::Uint8c(vec![ClampedU8(255), ClampedU8(255)]));
        add(2, &a, 1, 0, &b, 1, 0, &mut z, 1, 0).unwrap();
        assert_eq!(z, Buffer::Uint8c(vec![ClampedU8(255), ClampedU8(40)]));

        // mixed dtypes fall back and promote
        let f = Buffer::Float64(vec![0.5, 0.5]);
        let mut out = Buffer::zeros(DType::Float64, 2);
        add(2, &a, 1, 0, &f, -1, 1, &mut out, 1, 0).unwrap();
        assert_eq!(out, Buffer::Float64(vec![250.5, 20.5]));
    }

    #[test]
    fn test_fill() {
        let mut x = Buffer::zeros(DType::Int16, 5);
        fill(70_000, 3, &mut x, -2, 4).unwrap();
        assert_eq!(x, Buffer::Int16(vec![4464, 0, 4464, 0, 4464]));
        let mut g = Buffer::zeros(DType::Generic, 2);
        fill(1.5, 2, &mut g, 1, 0).unwrap();
        assert_eq!(g.to_scalars(), vec![Scalar::Float(1.5); 2]);
    }
}
