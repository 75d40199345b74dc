//! Buffer conversion between dtypes.
//!
//! [`cast`] always allocates a new buffer. Per target:
//!
//! - `generic`: the first `len` elements as [`Scalar`] values, verbatim
//! - `binary`: the native-endian bytes backing each element
//! - a complex source into a non-complex target: interleaved
//!   `[re0, im0, re1, im1, ...]` of length `2 * len`
//! - otherwise: `out[i] = T::from_scalar(src[i])`, the target's assignment
//!   rule (see [`Element`](crate::Element))

use crate::pod_complex::complex_bytes;
use crate::{Buffer, DType, DTypeError, PodComplexF32, PodComplexF64, Result, Scalar};

/// Convert the first `len` elements of `buffer` into a new `target` buffer.
pub fn cast(buffer: &Buffer, len: usize, target: DType) -> Result<Buffer> {
    if len > buffer.len() {
        return Err(DTypeError::LengthOutOfRange {
            len,
            available: buffer.len(),
        });
    }
    let out = match target {
        DType::Generic => Buffer::Generic((0..len).map(|i| buffer.get(i)).collect()),
        DType::Binary => Buffer::Binary(to_bytes(buffer, len)),
        t if buffer.dtype().is_complex() && !t.is_complex() => decompose(buffer, len, t),
        t => {
            let mut out = Buffer::zeros(t, len);
            for i in 0..len {
                out.set(i, buffer.get(i));
            }
            out
        }
    };
    Ok(out)
}

/// [`cast`] with the target given as a dtype tag.
pub fn cast_to(buffer: &Buffer, len: usize, target: &str) -> Result<Buffer> {
    cast(buffer, len, target.parse()?)
}

fn decompose(buffer: &Buffer, len: usize, target: DType) -> Buffer {
    let mut out = Buffer::zeros(target, 2 * len);
    for i in 0..len {
        let c = buffer.get(i).to_complex();
        out.set(2 * i, Scalar::Float(c.re));
        out.set(2 * i + 1, Scalar::Float(c.im));
    }
    out
}

fn to_bytes(buffer: &Buffer, len: usize) -> Vec<u8> {
    match buffer {
        Buffer::Int8(v) => bytemuck::cast_slice(&v[..len]).to_vec(),
        Buffer::Uint8(v) | Buffer::Binary(v) => v[..len].to_vec(),
        Buffer::Uint8c(v) => bytemuck::cast_slice(&v[..len]).to_vec(),
        Buffer::Int16(v) => bytemuck::cast_slice(&v[..len]).to_vec(),
        Buffer::Uint16(v) => bytemuck::cast_slice(&v[..len]).to_vec(),
        Buffer::Int32(v) => bytemuck::cast_slice(&v[..len]).to_vec(),
        Buffer::Uint32(v) => bytemuck::cast_slice(&v[..len]).to_vec(),
        Buffer::Float32(v) => bytemuck::cast_slice(&v[..len]).to_vec(),
        Buffer::Float64(v) => bytemuck::cast_slice(&v[..len]).to_vec(),
        Buffer::Complex64(v) => complex_bytes::<f32, PodComplexF32>(&v[..len]),
        Buffer::Complex128(v) => complex_bytes::<f64, PodComplexF64>(&v[..len]),
        Buffer::Bool(v) => v[..len].iter().map(|&b| u8::from(b)).collect(),
        Buffer::Generic(v) => v[..len].iter().flat_map(|&s| scalar_bytes(s)).collect(),
    }
}

fn scalar_bytes(value: Scalar) -> Vec<u8> {
    match value {
        Scalar::Bool(b) => vec![u8::from(b)],
        Scalar::Int(i) => i.to_ne_bytes().to_vec(),
        Scalar::Float(f) => f.to_ne_bytes().to_vec(),
        Scalar::Complex(c) => {
            let mut out = c.re.to_ne_bytes().to_vec();
            out.extend_from_slice(&c.im.to_ne_bytes());
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClampedU8;
    use num_complex::{Complex32, Complex64};

    #[test]
    fn test_cast_uint8c_narrowing() {
        let src = Buffer::Generic(vec![
            Scalar::Float(300.0),
            Scalar::Float(-5.0),
            Scalar::Float(128.7),
        ]);
        let out = cast(&src, 3, DType::Uint8c).unwrap();
        assert_eq!(
            out,
            Buffer::Uint8c(vec![ClampedU8(255), ClampedU8(0), ClampedU8(129)])
        );
    }

    #[test]
    fn test_cast_wraps_integers() {
        let src = Buffer::Float64(vec![300.0, -1.0, 2.9, f64::NAN]);
        let out = cast(&src, 4, DType::Uint8).unwrap();
        assert_eq!(out, Buffer::Uint8(vec![44, 255, 2, 0]));
        let out = cast(&src, 2, DType::Int8).unwrap();
        assert_eq!(out, Buffer::Int8(vec![44, -1]));
    }

    #[test]
    fn test_cast_complex_decomposes() {
        let src = Buffer::Complex128(vec![Complex64::new(1.0, 2.0), Complex64::new(-3.0, 0.5)]);
        let out = cast(&src, 2, DType::Float32).unwrap();
        assert_eq!(out, Buffer::Float32(vec![1.0, 2.0, -3.0, 0.5]));
        let out = cast(&src, 1, DType::Complex64).unwrap();
        assert_eq!(out, Buffer::Complex64(vec![Complex32::new(1.0, 2.0)]));
    }

    #[test]
    fn test_cast_real_to_complex() {
        let src = Buffer::Int32(vec![4, -1]);
        let out = cast(&src, 2, DType::Complex128).unwrap();
        assert_eq!(
            out,
            Buffer::Complex128(vec![Complex64::new(4.0, 0.0), Complex64::new(-1.0, 0.0)])
        );
    }

    #[test]
    fn test_cast_generic_is_verbatim() {
        let src = Buffer::Complex128(vec![Complex64::new(1.0, -1.0)]);
        let out = cast(&src, 1, DType::Generic).unwrap();
        assert_eq!(out, Buffer::Generic(vec![Scalar::Complex(Complex64::new(1.0, -1.0))]));
    }

    #[test]
    fn test_cast_binary_bytes() {
        let src = Buffer::Uint16(vec![0x0102, 0x0304]);
        let out = cast(&src, 2, DType::Binary).unwrap();
        let mut expected = 0x0102u16.to_ne_bytes().to_vec();
        expected.extend_from_slice(&0x0304u16.to_ne_bytes());
        assert_eq!(out, Buffer::Binary(expected));

        let out = cast(&Buffer::Bool(vec![true, false]), 2, DType::Binary).unwrap();
        assert_eq!(out, Buffer::Binary(vec![1, 0]));

        let src = Buffer::Complex64(vec![Complex32::new(1.0, 2.0)]);
        let out = cast(&src, 1, DType::Binary).unwrap();
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn test_cast_partial_and_errors() {
        let src = Buffer::Float64(vec![1.0, 2.0, 3.0]);
        assert_eq!(cast(&src, 2, DType::Int32).unwrap(), Buffer::Int32(vec![1, 2]));
        assert_eq!(
            cast(&src, 4, DType::Int32),
            Err(DTypeError::LengthOutOfRange { len: 4, available: 3 })
        );
        assert_eq!(
            cast_to(&src, 1, "float128"),
            Err(DTypeError::Unknown("float128".into()))
        );
        assert_eq!(cast_to(&src, 1, "bool").unwrap(), Buffer::Bool(vec![true]));
    }

    #[test]
    fn test_cast_float32_rounds() {
        let src = Buffer::Float64(vec![0.1, 1e40, -2.5]);
        let out = cast(&src, 3, DType::Float32).unwrap();
        let back = cast(&out, 3, DType::Float64).unwrap().to_scalars();
        approx::assert_relative_eq!(back[0].to_f64(), 0.1, max_relative = 1e-7);
        assert!(back[1].to_f64().is_infinite());
        assert_eq!(back[2], Scalar::Float(-2.5));
    }

    #[test]
    fn test_cast_leaves_input_untouched() {
        let src = Buffer::Float32(vec![1.5, 2.5]);
        let before = src.clone();
        let _ = cast(&src, 2, DType::Uint8c).unwrap();
        assert_eq!(src, before);
    }
}
