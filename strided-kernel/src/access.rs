//! Strided element accessors.
//!
//! Reduction, scan and sort algorithms are written once against
//! [`StridedAccess`] / [`StridedAccessMut`]. Typed slices instantiate them on
//! the native path; [`BufferAccess`] instantiates them on the fallback path,
//! where every element travels as a [`Scalar`].
//!
//! Element `i` of an accessor lives at `offset + i * stride` in its storage.
//! Accessors do not check bounds up front: typed slices panic on a bad
//! index, and dispatchers validate operands before building one.

use strided_dtype::{Buffer, Scalar};

/// Read access to `len()` strided elements.
pub trait StridedAccess {
    type Item: Copy;

    fn len(&self) -> usize;

    fn get(&self, i: usize) -> Self::Item;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-write access to strided elements.
pub trait StridedAccessMut: StridedAccess {
    fn set(&mut self, i: usize, value: Self::Item);

    fn swap(&mut self, i: usize, j: usize);
}

#[inline(always)]
fn position(offset: usize, stride: isize, i: usize) -> usize {
    (offset as isize + i as isize * stride) as usize
}

// ============================================================================
// Typed slices
// ============================================================================

#[derive(Clone, Copy, Debug)]
pub struct StridedSlice<'a, T> {
    data: &'a [T],
    len: usize,
    stride: isize,
    offset: usize,
}

impl<'a, T: Copy> StridedSlice<'a, T> {
    pub fn new(data: &'a [T], len: usize, stride: isize, offset: usize) -> Self {
        Self {
            data,
            len,
            stride,
            offset,
        }
    }

    /// The elements as one plain slice, when the stride is 1.
    #[inline]
    pub fn as_contiguous(&self) -> Option<&'a [T]> {
        (self.stride == 1).then(|| &self.data[self.offset..self.offset + self.len])
    }
}

impl<T: Copy> StridedAccess for StridedSlice<'_, T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, i: usize) -> T {
        self.data[position(self.offset, self.stride, i)]
    }
}

#[derive(Debug)]
pub struct StridedSliceMut<'a, T> {
    data: &'a mut [T],
    len: usize,
    stride: isize,
    offset: usize,
}

impl<'a, T: Copy> StridedSliceMut<'a, T> {
    pub fn new(data: &'a mut [T], len: usize, stride: isize, offset: usize) -> Self {
        Self {
            data,
            len,
            stride,
            offset,
        }
    }

    #[inline]
    pub fn as_contiguous_mut(&mut self) -> Option<&mut [T]> {
        if self.stride != 1 {
            return None;
        }
        Some(&mut self.data[self.offset..self.offset + self.len])
    }
}

impl<T: Copy> StridedAccess for StridedSliceMut<'_, T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, i: usize) -> T {
        self.data[position(self.offset, self.stride, i)]
    }
}

impl<T: Copy> StridedAccessMut for StridedSliceMut<'_, T> {
    #[inline]
    fn set(&mut self, i: usize, value: T) {
        self.data[position(self.offset, self.stride, i)] = value;
    }

    #[inline]
    fn swap(&mut self, i: usize, j: usize) {
        self.data.swap(
            position(self.offset, self.stride, i),
            position(self.offset, self.stride, j),
        );
    }
}

// ============================================================================
// Dtype-agnostic buffers
// ============================================================================

#[derive(Clone, Copy, Debug)]
pub struct BufferAccess<'a> {
    buffer: &'a Buffer,
    len: usize,
    stride: isize,
    offset: usize,
}

impl<'a> BufferAccess<'a> {
    pub fn new(buffer: &'a Buffer, len: usize, stride: isize, offset: usize) -> Self {
        Self {
            buffer,
            len,
            stride,
            offset,
        }
    }

    pub fn buffer(&self) -> &'a Buffer {
        self.buffer
    }
}

impl StridedAccess for BufferAccess<'_> {
    type Item = Scalar;

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, i: usize) -> Scalar {
        self.buffer.get(position(self.offset, self.stride, i))
    }
}

/// Mutable [`BufferAccess`]. `set` converts with the buffer's assignment
/// rule; `swap` moves stored values unchanged.
#[derive(Debug)]
pub struct BufferAccessMut<'a> {
    buffer: &'a mut Buffer,
    len: usize,
    stride: isize,
    offset: usize,
}

impl<'a> BufferAccessMut<'a> {
    pub fn new(buffer: &'a mut Buffer, len: usize, stride: isize, offset: usize) -> Self {
        Self {
            buffer,
            len,
            stride,
            offset,
        }
    }
}

impl StridedAccess for BufferAccessMut<'_> {
    type Item = Scalar;

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, i: usize) -> Scalar {
        self.buffer.get(position(self.offset, self.stride, i))
    }
}

impl StridedAccessMut for BufferAccessMut<'_> {
    #[inline]
    fn set(&mut self, i: usize, value: Scalar) {
        self.buffer
            .set(position(self.offset, self.stride, i), value);
    }

    #[inline]
    fn swap(&mut self, i: usize, j: usize) {
        self.buffer.swap(
            position(self.offset, self.stride, i),
            position(self.offset, self.stride, j),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_stride_slice() {
        let data = [0, 1, 2, 3, 4, 5];
        let s = StridedSlice::new(&data, 3, -2, 5);
        let got: Vec<i32> = (0..s.len()).map(|i| s.get(i)).collect();
        assert_eq!(got, vec![5, 3, 1]);
        assert!(s.as_contiguous().is_none());
        let c = StridedSlice::new(&data, 2, 1, 3);
        assert_eq!(c.as_contiguous(), Some(&[3, 4][..]));
    }

    #[test]
    fn test_slice_mut_swap_and_set() {
        let mut data = [1.0f64, 2.0, 3.0, 4.0];
        let mut s = StridedSliceMut::new(&mut data, 2, 2, 0);
        s.swap(0, 1);
        s.set(0, 9.0);
        assert_eq!(data, [9.0, 2.0, 1.0, 4.0]);
    }

    #[test]
    fn test_buffer_access_converts_on_set() {
        let mut buf = Buffer::Int8(vec![0; 4]);
        {
            let mut acc = BufferAccessMut::new(&mut buf, 2, -1, 3);
            acc.set(0, Scalar::Float(300.0));
            acc.set(1, Scalar::Float(-1.9));
            acc.swap(0, 1);
        }
        assert_eq!(buf, Buffer::Int8(vec![0, 0, 44, -1]));
        let acc = BufferAccess::new(&buf, 2, 1, 2);
        assert_eq!(acc.get(1), Scalar::Int(-1));
    }
}
