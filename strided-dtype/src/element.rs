//! Typed element traits and per-type conversion rules.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use num_complex::{Complex32, Complex64};

use crate::{Buffer, DType, Scalar};

/// A Rust type that backs one [`Buffer`] variant.
///
/// `from_scalar` is the assignment rule of the dtype: every store into a
/// buffer of this type, whether by cast, `set`, or a fallback kernel, goes
/// through it.
pub trait Element: Copy + Send + Sync + fmt::Debug + PartialEq + 'static {
    const DTYPE: DType;

    fn to_scalar(self) -> Scalar;

    fn from_scalar(value: Scalar) -> Self;

    /// Typed view of `buffer` when it holds this element type.
    fn slice_of(buffer: &Buffer) -> Option<&[Self]>;

    fn slice_of_mut(buffer: &mut Buffer) -> Option<&mut [Self]>;

    fn into_buffer(data: Vec<Self>) -> Buffer;
}

/// Unsigned 8-bit value with clamped assignment (`uint8c`).
///
/// Assigning a value NaN-maps to 0, clamps to `[0, 255]`, then rounds half
/// to even: `300 -> 255`, `-5 -> 0`, `128.7 -> 129`, `0.5 -> 0`, `1.5 -> 2`.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct ClampedU8(pub u8);

impl ClampedU8 {
    pub fn from_f64(v: f64) -> Self {
        if v.is_nan() {
            return ClampedU8(0);
        }
        ClampedU8(v.clamp(0.0, 255.0).round_ties_even() as u8)
    }
}

impl From<ClampedU8> for u8 {
    fn from(v: ClampedU8) -> u8 {
        v.0
    }
}

/// Integer assignment: truncate toward zero, NaN/inf to 0, wrap modulo 2^32.
///
/// The result is then narrowed with `as`, which keeps the low bits, so the
/// wrap is modulo the target width.
#[inline]
pub(crate) fn wrapping_int(value: Scalar) -> i64 {
    fn from_float(f: f64) -> i64 {
        if !f.is_finite() {
            return 0;
        }
        f.trunc().rem_euclid(4_294_967_296.0) as i64
    }
    match value {
        Scalar::Bool(b) => i64::from(b),
        Scalar::Int(i) => i,
        Scalar::Float(f) => from_float(f),
        Scalar::Complex(c) => from_float(c.re),
    }
}

macro_rules! buffer_access {
    ($variant:ident) => {
        #[inline]
        fn slice_of(buffer: &Buffer) -> Option<&[Self]> {
            match buffer {
                Buffer::$variant(v) => Some(v),
                _ => None,
            }
        }

        #[inline]
        fn slice_of_mut(buffer: &mut Buffer) -> Option<&mut [Self]> {
            match buffer {
                Buffer::$variant(v) => Some(v),
                _ => None,
            }
        }

        fn into_buffer(data: Vec<Self>) -> Buffer {
            Buffer::$variant(data)
        }
    };
}

macro_rules! impl_int_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl Element for $t {
            const DTYPE: DType = DType::$variant;

            #[inline]
            fn to_scalar(self) -> Scalar {
                Scalar::Int(i64::from(self))
            }

            #[inline]
            fn from_scalar(value: Scalar) -> Self {
                wrapping_int(value) as $t
            }

            buffer_access!($variant);
        })*
    };
}

// `u8` backs both `uint8` and `binary`; its typed slice is the `uint8` one.
impl_int_element!(
    i8 => Int8,
    u8 => Uint8,
    i16 => Int16,
    u16 => Uint16,
    i32 => Int32,
    u32 => Uint32,
);

impl Element for ClampedU8 {
    const DTYPE: DType = DType::Uint8c;

    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Int(i64::from(self.0))
    }

    #[inline]
    fn from_scalar(value: Scalar) -> Self {
        match value {
            Scalar::Int(i) => ClampedU8(i.clamp(0, 255) as u8),
            other => ClampedU8::from_f64(other.to_f64()),
        }
    }

    buffer_access!(Uint8c);
}

impl Element for f32 {
    const DTYPE: DType = DType::Float32;

    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Float(f64::from(self))
    }

    #[inline]
    fn from_scalar(value: Scalar) -> Self {
        value.to_f64() as f32
    }

    buffer_access!(Float32);
}

impl Element for f64 {
    const DTYPE: DType = DType::Float64;

    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Float(self)
    }

    #[inline]
    fn from_scalar(value: Scalar) -> Self {
        value.to_f64()
    }

    buffer_access!(Float64);
}

impl Element for Complex32 {
    const DTYPE: DType = DType::Complex64;

    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::from(self)
    }

    #[inline]
    fn from_scalar(value: Scalar) -> Self {
        let c = value.to_complex();
        Complex32::new(c.re as f32, c.im as f32)
    }

    buffer_access!(Complex64);
}

impl Element for Complex64 {
    const DTYPE: DType = DType::Complex128;

    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Complex(self)
    }

    #[inline]
    fn from_scalar(value: Scalar) -> Self {
        value.to_complex()
    }

    buffer_access!(Complex128);
}

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Bool(self)
    }

    #[inline]
    fn from_scalar(value: Scalar) -> Self {
        value.is_truthy()
    }

    buffer_access!(Bool);
}

impl Element for Scalar {
    const DTYPE: DType = DType::Generic;

    #[inline]
    fn to_scalar(self) -> Scalar {
        self
    }

    #[inline]
    fn from_scalar(value: Scalar) -> Self {
        value
    }

    buffer_access!(Generic);
}
