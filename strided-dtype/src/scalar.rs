//! Dynamically typed element values.

use std::ops::{Add, Mul, Neg, Sub};

use num_complex::{Complex32, Complex64};

/// A single element value of any dtype.
///
/// Fallback kernels and per-element accessors move values through `Scalar`,
/// which lets one implementation serve every buffer variant. Conversion into
/// a concrete element type is done by [`Element::from_scalar`](crate::Element::from_scalar).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(Complex64),
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Float(0.0)
    }
}

impl Scalar {
    /// Real value; booleans map to 0/1 and complex values to their real part.
    #[inline]
    pub fn to_f64(self) -> f64 {
        match self {
            Scalar::Bool(b) => f64::from(u8::from(b)),
            Scalar::Int(i) => i as f64,
            Scalar::Float(f) => f,
            Scalar::Complex(c) => c.re,
        }
    }

    #[inline]
    pub fn to_complex(self) -> Complex64 {
        match self {
            Scalar::Complex(c) => c,
            other => Complex64::new(other.to_f64(), 0.0),
        }
    }

    /// Nonzero and not NaN. A complex value is truthy if either part is.
    #[inline]
    pub fn is_truthy(self) -> bool {
        fn truthy(v: f64) -> bool {
            v != 0.0 && !v.is_nan()
        }
        match self {
            Scalar::Bool(b) => b,
            Scalar::Int(i) => i != 0,
            Scalar::Float(f) => truthy(f),
            Scalar::Complex(c) => truthy(c.re) || truthy(c.im),
        }
    }

    #[inline]
    pub fn is_nan(self) -> bool {
        match self {
            Scalar::Float(f) => f.is_nan(),
            Scalar::Complex(c) => c.re.is_nan() || c.im.is_nan(),
            _ => false,
        }
    }

    #[inline]
    pub fn is_complex(self) -> bool {
        matches!(self, Scalar::Complex(_))
    }

    /// Absolute value; the modulus for complex values.
    pub fn abs(self) -> Scalar {
        match self {
            Scalar::Bool(b) => Scalar::Int(i64::from(b)),
            Scalar::Int(i) => Scalar::Int(i.wrapping_abs()),
            Scalar::Float(f) => Scalar::Float(f.abs()),
            Scalar::Complex(c) => Scalar::Float(c.norm()),
        }
    }

    #[inline]
    fn to_i64(self) -> i64 {
        match self {
            Scalar::Bool(b) => i64::from(b),
            Scalar::Int(i) => i,
            Scalar::Float(f) => f as i64,
            Scalar::Complex(c) => c.re as i64,
        }
    }
}

/// Operands of a binary operation after promotion to a common kind.
enum Promoted {
    Int(i64, i64),
    Float(f64, f64),
    Complex(Complex64, Complex64),
}

fn promote(a: Scalar, b: Scalar) -> Promoted {
    match (a, b) {
        (Scalar::Complex(_), _) | (_, Scalar::Complex(_)) => {
            Promoted::Complex(a.to_complex(), b.to_complex())
        }
        (Scalar::Float(_), _) | (_, Scalar::Float(_)) => Promoted::Float(a.to_f64(), b.to_f64()),
        _ => Promoted::Int(a.to_i64(), b.to_i64()),
    }
}

macro_rules! impl_scalar_binop {
    ($trait:ident, $method:ident, $int:ident, $op:tt) => {
        impl $trait for Scalar {
            type Output = Scalar;

            fn $method(self, rhs: Scalar) -> Scalar {
                match promote(self, rhs) {
                    Promoted::Int(a, b) => Scalar::Int(a.$int(b)),
                    Promoted::Float(a, b) => Scalar::Float(a $op b),
                    Promoted::Complex(a, b) => Scalar::Complex(a $op b),
                }
            }
        }
    };
}

impl_scalar_binop!(Add, add, wrapping_add, +);
impl_scalar_binop!(Sub, sub, wrapping_sub, -);
impl_scalar_binop!(Mul, mul, wrapping_mul, *);

impl Neg for Scalar {
    type Output = Scalar;

    fn neg(self) -> Scalar {
        match self {
            Scalar::Bool(b) => Scalar::Int(-i64::from(b)),
            Scalar::Int(i) => Scalar::Int(i.wrapping_neg()),
            Scalar::Float(f) => Scalar::Float(-f),
            Scalar::Complex(c) => Scalar::Complex(-c),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Scalar {
            fn from(v: $t) -> Self {
                Scalar::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, u8, i16, u16, i32, u32, i64);

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(f64::from(v))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<Complex32> for Scalar {
    fn from(v: Complex32) -> Self {
        Scalar::Complex(Complex64::new(f64::from(v.re), f64::from(v.im)))
    }
}

impl From<Complex64> for Scalar {
    fn from(v: Complex64) -> Self {
        Scalar::Complex(v)
    }
}
