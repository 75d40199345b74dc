//! Flat typed buffers, one variant per dtype.

use num_complex::{Complex32, Complex64};

use crate::{ClampedU8, DType, Element, Scalar};

/// A flat, zero-indexed, homogeneous element container.
///
/// `Buffer` is the sum type over typed vectors that the dispatch engine
/// matches on. Typed access goes through [`Buffer::as_slice`]; dtype-agnostic
/// access goes through [`Buffer::get`] / [`Buffer::set`], which convert via
/// [`Scalar`] using the assignment rule of the buffer's dtype.
#[derive(Clone, Debug, PartialEq)]
pub enum Buffer {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Uint8c(Vec<ClampedU8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Complex64(Vec<Complex32>),
    Complex128(Vec<Complex64>),
    Bool(Vec<bool>),
    Generic(Vec<Scalar>),
    Binary(Vec<u8>),
}

/// Evaluate `$body` with `$v` bound to the typed vector of any variant.
macro_rules! with_vec {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            Buffer::Int8($v) => $body,
            Buffer::Uint8($v) => $body,
            Buffer::Uint8c($v) => $body,
            Buffer::Int16($v) => $body,
            Buffer::Uint16($v) => $body,
            Buffer::Int32($v) => $body,
            Buffer::Uint32($v) => $body,
            Buffer::Float32($v) => $body,
            Buffer::Float64($v) => $body,
            Buffer::Complex64($v) => $body,
            Buffer::Complex128($v) => $body,
            Buffer::Bool($v) => $body,
            Buffer::Generic($v) => $body,
            Buffer::Binary($v) => $body,
        }
    };
}

impl Buffer {
    /// A buffer of `len` zero elements (`false` for bool, `0.0` for generic).
    pub fn zeros(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::Int8 => Buffer::Int8(vec![0; len]),
            DType::Uint8 => Buffer::Uint8(vec![0; len]),
            DType::Uint8c => Buffer::Uint8c(vec![ClampedU8(0); len]),
            DType::Int16 => Buffer::Int16(vec![0; len]),
            DType::Uint16 => Buffer::Uint16(vec![0; len]),
            DType::Int32 => Buffer::Int32(vec![0; len]),
            DType::Uint32 => Buffer::Uint32(vec![0; len]),
            DType::Float32 => Buffer::Float32(vec![0.0; len]),
            DType::Float64 => Buffer::Float64(vec![0.0; len]),
            DType::Complex64 => Buffer::Complex64(vec![Complex32::new(0.0, 0.0); len]),
            DType::Complex128 => Buffer::Complex128(vec![Complex64::new(0.0, 0.0); len]),
            DType::Bool => Buffer::Bool(vec![false; len]),
            DType::Generic => Buffer::Generic(vec![Scalar::Float(0.0); len]),
            DType::Binary => Buffer::Binary(vec![0; len]),
        }
    }

    pub fn from_vec<T: Element>(data: Vec<T>) -> Self {
        T::into_buffer(data)
    }

    /// Convert `values` into a new buffer of `dtype`.
    pub fn from_scalars(dtype: DType, values: &[Scalar]) -> Self {
        let mut out = Buffer::zeros(dtype, values.len());
        for (i, &v) in values.iter().enumerate() {
            out.set(i, v);
        }
        out
    }

    pub fn dtype(&self) -> DType {
        match self {
            Buffer::Int8(_) => DType::Int8,
            Buffer::Uint8(_) => DType::Uint8,
            Buffer::Uint8c(_) => DType::Uint8c,
            Buffer::Int16(_) => DType::Int16,
            Buffer::Uint16(_) => DType::Uint16,
            Buffer::Int32(_) => DType::Int32,
            Buffer::Uint32(_) => DType::Uint32,
            Buffer::Float32(_) => DType::Float32,
            Buffer::Float64(_) => DType::Float64,
            Buffer::Complex64(_) => DType::Complex64,
            Buffer::Complex128(_) => DType::Complex128,
            Buffer::Bool(_) => DType::Bool,
            Buffer::Generic(_) => DType::Generic,
            Buffer::Binary(_) => DType::Binary,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        with_vec!(self, v => v.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read element `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn get(&self, index: usize) -> Scalar {
        with_vec!(self, v => v[index].to_scalar())
    }

    pub fn try_get(&self, index: usize) -> Option<Scalar> {
        (index < self.len()).then(|| self.get(index))
    }

    /// Write element `index`, converting with the dtype's assignment rule.
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn set(&mut self, index: usize, value: Scalar) {
        with_vec!(self, v => v[index] = Element::from_scalar(value))
    }

    #[inline]
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice_of(self)
    }

    #[inline]
    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_of_mut(self)
    }

    /// Swap elements `i` and `j` without converting them.
    ///
    /// # Panics
    /// Panics if either index is out of bounds.
    #[inline]
    pub fn swap(&mut self, i: usize, j: usize) {
        with_vec!(self, v => v.swap(i, j))
    }

    pub fn to_scalars(&self) -> Vec<Scalar> {
        with_vec!(self, v => v.iter().map(|x| x.to_scalar()).collect())
    }
}

impl<T: Element> From<Vec<T>> for Buffer {
    fn from(data: Vec<T>) -> Self {
        T::into_buffer(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_dtype_and_len() {
        for dt in DType::ALL {
            let b = Buffer::zeros(dt, 3);
            assert_eq!(b.dtype(), dt);
            assert_eq!(b.len(), 3);
        }
        assert!(Buffer::zeros(DType::Float64, 0).is_empty());
    }

    #[test]
    fn test_get_set_convert() {
        let mut b = Buffer::zeros(DType::Uint8, 2);
        b.set(0, Scalar::Float(257.9));
        assert_eq!(b.get(0), Scalar::Int(1));
        let mut b = Buffer::zeros(DType::Bool, 1);
        b.set(0, Scalar::Int(7));
        assert_eq!(b.get(0), Scalar::Bool(true));
        let mut b = Buffer::zeros(DType::Binary, 1);
        b.set(0, Scalar::Int(-2));
        assert_eq!(b.get(0), Scalar::Int(254));
        assert_eq!(b.try_get(1), None);
    }

    #[test]
    fn test_from_vec_round_trip() {
        let b: Buffer = vec![1i16, -2, 3].into();
        assert_eq!(b.dtype(), DType::Int16);
        assert_eq!(b.as_slice::<i16>(), Some(&[1i16, -2, 3][..]));
        let g = Buffer::from_scalars(DType::Generic, &b.to_scalars());
        assert_eq!(g.get(1), Scalar::Int(-2));
    }

    #[test]
    fn test_swap_keeps_values_exact() {
        let mut b = Buffer::Float32(vec![f32::NAN, -0.0, 1.5]);
        b.swap(0, 1);
        let v = b.as_slice::<f32>().unwrap();
        assert!(v[0].is_sign_negative() && v[0] == 0.0);
        assert!(v[1].is_nan());
    }
}
