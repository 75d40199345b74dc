//! Dynamic-rank ndarray views over shared buffers.
//!
//! - [`SharedBuffer`]: reference-counted, lock-protected [`Buffer`]
//! - [`NdArray`]: immutable descriptor `(dtype, shape, strides, offset, order)`
//!   over a `SharedBuffer`, with cached iteration order and contiguity
//!
//! Descriptors never change after construction. Slicing, transposing,
//! squeezing and broadcasting build new descriptors over the same buffer;
//! only [`NdArray::copy`] allocates.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use smallvec::{smallvec, SmallVec};
use strided_dtype::{Buffer, DType, Element, Scalar};

use crate::geometry::{
    buffer_index, checked_min_max_view_buffer_index, is_contiguous, iteration_order, numel,
    shape_to_strides, IterationOrder, Order,
};
use crate::index::{vind_to_bind, IndexMode};
use crate::slice::{Resolved, SliceSpec};
use crate::{Result, StridedError};

// ============================================================================
// Shared buffer
// ============================================================================

/// A buffer shared by any number of views.
///
/// The lock only guards memory safety; callers that write through aliasing
/// views from several threads must order those writes themselves.
#[derive(Clone)]
pub struct SharedBuffer(Arc<RwLock<Buffer>>);

impl SharedBuffer {
    pub fn new(buffer: Buffer) -> Self {
        SharedBuffer(Arc::new(RwLock::new(buffer)))
    }

    /// Read access. A poisoned lock is recovered: buffers hold plain values
    /// and stay valid after a panicking writer.
    pub fn read(&self) -> RwLockReadGuard<'_, Buffer> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Buffer> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &SharedBuffer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        self.read().dtype()
    }

    /// Snapshot of the current contents.
    pub fn to_buffer(&self) -> Buffer {
        self.read().clone()
    }
}

impl From<Buffer> for SharedBuffer {
    fn from(buffer: Buffer) -> Self {
        SharedBuffer::new(buffer)
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.read();
        f.debug_struct("SharedBuffer")
            .field("dtype", &b.dtype())
            .field("len", &b.len())
            .finish()
    }
}

// ============================================================================
// Validation helpers
// ============================================================================

/// Validate that all accessed buffer indices stay within `[0, len)`.
fn validate_bounds(len: usize, shape: &[usize], strides: &[isize], offset: usize) -> Result<()> {
    if shape.len() != strides.len() {
        return Err(StridedError::StrideLengthMismatch);
    }
    // Empty array - no access needed
    if shape.iter().any(|&d| d == 0) {
        return Ok(());
    }
    let (min, max) = checked_min_max_view_buffer_index(shape, strides, offset)
        .ok_or(StridedError::OffsetOverflow)?;
    if min < 0 || max as usize >= len {
        return Err(StridedError::OutOfBounds { min, max, len });
    }
    Ok(())
}

// ============================================================================
// NdArray
// ============================================================================

/// An n-dimensional view over a [`SharedBuffer`].
///
/// Invariant: for every valid multi-index `i`, `offset + Σ i[k] * strides[k]`
/// lies in `[0, buffer.len())`. It is checked by [`NdArray::new`] and
/// preserved by every derived view, so internal walks use unchecked
/// arithmetic.
#[derive(Clone)]
pub struct NdArray {
    buffer: SharedBuffer,
    dtype: DType,
    shape: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: usize,
    order: Order,
    len: usize,
    iteration_order: IterationOrder,
    contiguous: bool,
}

impl fmt::Debug for NdArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NdArray")
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("order", &self.order)
            .finish()
    }
}

impl NdArray {
    /// Create a view, validating that every multi-index stays inside the buffer.
    pub fn new(
        buffer: impl Into<SharedBuffer>,
        shape: &[usize],
        strides: &[isize],
        offset: usize,
        order: Order,
    ) -> Result<Self> {
        let buffer = buffer.into();
        let (dtype, len) = {
            let b = buffer.read();
            (b.dtype(), b.len())
        };
        validate_bounds(len, shape, strides, offset)?;
        Ok(Self::from_parts(
            buffer,
            dtype,
            Arc::from(shape),
            Arc::from(strides),
            offset,
            order,
        ))
    }

    /// Packed view of `buffer` with strides synthesized from `order`.
    pub fn from_buffer(buffer: impl Into<SharedBuffer>, shape: &[usize], order: Order) -> Result<Self> {
        let buffer = buffer.into();
        let required = numel(shape);
        let len = buffer.len();
        if len < required {
            return Err(StridedError::BufferTooShort { required, len });
        }
        let strides = shape_to_strides(shape, order);
        Self::new(buffer, shape, &strides, 0, order)
    }

    pub fn from_vec<T: Element>(data: Vec<T>, shape: &[usize], order: Order) -> Result<Self> {
        Self::from_buffer(Buffer::from_vec(data), shape, order)
    }

    /// Packed view of `values` converted to `dtype`.
    pub fn from_scalars(
        dtype: DType,
        values: &[Scalar],
        shape: &[usize],
        order: Order,
    ) -> Result<Self> {
        Self::from_buffer(Buffer::from_scalars(dtype, values), shape, order)
    }

    pub fn zeros(dtype: DType, shape: &[usize], order: Order) -> Self {
        let strides = shape_to_strides(shape, order);
        Self::from_parts(
            Buffer::zeros(dtype, numel(shape)).into(),
            dtype,
            Arc::from(shape),
            Arc::from(strides),
            0,
            order,
        )
    }

    fn from_parts(
        buffer: SharedBuffer,
        dtype: DType,
        shape: Arc<[usize]>,
        strides: Arc<[isize]>,
        offset: usize,
        order: Order,
    ) -> Self {
        let len = numel(&shape);
        let iteration_order = iteration_order(&strides);
        let contiguous = is_contiguous(len, &shape, &strides, offset, iteration_order);
        Self {
            buffer,
            dtype,
            shape,
            strides,
            offset,
            order,
            len,
            iteration_order,
            contiguous,
        }
    }

    /// New descriptor over the same buffer.
    fn derive(&self, shape: Vec<usize>, strides: Vec<isize>, offset: usize) -> Self {
        Self::from_parts(
            self.buffer.clone(),
            self.dtype,
            shape.into(),
            strides.into(),
            offset,
            self.order,
        )
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn order(&self) -> Order {
        self.order
    }

    #[inline]
    pub fn ndims(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn iteration_order(&self) -> IterationOrder {
        self.iteration_order
    }

    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.contiguous
    }

    #[inline]
    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    /// Whether both views address the same buffer.
    #[inline]
    pub fn shares_buffer(&self, other: &NdArray) -> bool {
        self.buffer.ptr_eq(&other.buffer)
    }

    // ------------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------------

    fn checked_buffer_index(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.ndims() {
            return Err(StridedError::WrongIndexCount {
                expected: self.ndims(),
                found: index.len(),
            });
        }
        for (dim, (&i, &extent)) in index.iter().zip(self.shape.iter()).enumerate() {
            if i >= extent {
                return Err(StridedError::IndexOutOfBounds {
                    dim,
                    index: i as isize,
                    extent,
                });
            }
        }
        Ok(self.buffer_index_unchecked(index))
    }

    #[inline]
    fn buffer_index_unchecked(&self, index: &[usize]) -> usize {
        buffer_index(index, &self.strides, self.offset) as usize
    }

    /// Read the element at `index`.
    pub fn get(&self, index: &[usize]) -> Result<Scalar> {
        let i = self.checked_buffer_index(index)?;
        Ok(self.buffer.read().get(i))
    }

    /// Write the element at `index`, converting with the dtype's assignment rule.
    pub fn set(&self, index: &[usize], value: impl Into<Scalar>) -> Result<()> {
        let i = self.checked_buffer_index(index)?;
        self.buffer.write().set(i, value.into());
        Ok(())
    }

    /// Read by linear index in the view's order.
    pub fn iget(&self, idx: usize) -> Result<Scalar> {
        let i = self.linear_to_buffer(idx)?;
        Ok(self.buffer.read().get(i))
    }

    /// Write by linear index in the view's order.
    pub fn iset(&self, idx: usize, value: impl Into<Scalar>) -> Result<()> {
        let i = self.linear_to_buffer(idx)?;
        self.buffer.write().set(i, value.into());
        Ok(())
    }

    fn linear_to_buffer(&self, idx: usize) -> Result<usize> {
        let idx = isize::try_from(idx).map_err(|_| StridedError::OffsetOverflow)?;
        vind_to_bind(
            &self.shape,
            &self.strides,
            self.offset,
            self.order,
            idx,
            IndexMode::Throw,
        )
    }

    /// Row-major multi-indices of the view.
    pub fn indices(&self) -> IndexIter {
        IndexIter::new(self.shape.clone())
    }

    // ------------------------------------------------------------------------
    // Derived views
    // ------------------------------------------------------------------------

    /// Sub-view selected per dimension; missing trailing specs select everything.
    pub fn slice(&self, specs: &[SliceSpec]) -> Result<NdArray> {
        if specs.len() > self.ndims() {
            return Err(StridedError::RankMismatch(specs.len(), self.ndims()));
        }
        let mut shape = Vec::with_capacity(self.ndims());
        let mut strides = Vec::with_capacity(self.ndims());
        let mut offset = self.offset as isize;
        for (dim, (&extent, &stride)) in self.shape.iter().zip(self.strides.iter()).enumerate() {
            let spec = specs.get(dim).copied().unwrap_or(SliceSpec::Full);
            match spec.resolve(extent, dim)? {
                Resolved::Drop { index } => offset += index as isize * stride,
                Resolved::Keep { start, len, step } => {
                    offset += start as isize * stride;
                    shape.push(len);
                    strides.push(stride * step);
                }
            }
        }
        let offset = if shape.contains(&0) || self.is_empty() {
            self.offset
        } else {
            usize::try_from(offset).map_err(|_| StridedError::OffsetOverflow)?
        };
        Ok(self.derive(shape, strides, offset))
    }

    /// Drop extent-1 dimensions; returns this descriptor unchanged if none exist.
    pub fn squeeze(&self) -> NdArray {
        if !self.shape.contains(&1) {
            return self.clone();
        }
        let (shape, strides): (Vec<usize>, Vec<isize>) = self
            .shape
            .iter()
            .zip(self.strides.iter())
            .filter(|(&d, _)| d != 1)
            .map(|(&d, &s)| (d, s))
            .unzip();
        self.derive(shape, strides, self.offset)
    }

    /// Reverse the dimension order (zero-copy).
    pub fn transpose(&self) -> NdArray {
        let shape = self.shape.iter().rev().copied().collect();
        let strides = self.strides.iter().rev().copied().collect();
        self.derive(shape, strides, self.offset)
    }

    /// Reorder dimensions: dimension `k` of the result is `perm[k]` of `self`.
    pub fn permute(&self, perm: &[usize]) -> Result<NdArray> {
        let rank = self.ndims();
        if perm.len() != rank {
            return Err(StridedError::RankMismatch(perm.len(), rank));
        }
        let mut seen = vec![false; rank];
        for &p in perm {
            if p >= rank {
                return Err(StridedError::InvalidAxis { axis: p, rank });
            }
            if std::mem::replace(&mut seen[p], true) {
                return Err(StridedError::InvalidPermutation(perm.to_vec()));
            }
        }
        let shape = perm.iter().map(|&p| self.shape[p]).collect();
        let strides = perm.iter().map(|&p| self.strides[p]).collect();
        Ok(self.derive(shape, strides, self.offset))
    }

    /// View with `shape`, repeating extent-1 and missing leading dimensions
    /// through zero strides.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<NdArray> {
        let mismatch = || StridedError::ShapeMismatch(self.shape.to_vec(), shape.to_vec());
        let rank = self.ndims();
        if shape.len() < rank {
            return Err(mismatch());
        }
        let lead = shape.len() - rank;
        let mut strides = vec![0isize; shape.len()];
        for k in 0..rank {
            let (have, want) = (self.shape[k], shape[lead + k]);
            strides[lead + k] = if have == want {
                self.strides[k]
            } else if have == 1 {
                0
            } else {
                return Err(mismatch());
            };
        }
        Ok(self.derive(shape.to_vec(), strides, self.offset))
    }

    // ------------------------------------------------------------------------
    // Materialization
    // ------------------------------------------------------------------------

    /// Packed copy in the view's order, over a new buffer.
    pub fn copy(&self) -> NdArray {
        let strides = shape_to_strides(&self.shape, self.order);
        let mut out = Buffer::zeros(self.dtype, self.len);
        {
            let src = self.buffer.read();
            for idx in self.indices() {
                let dst = buffer_index(&idx, &strides, 0) as usize;
                out.set(dst, src.get(self.buffer_index_unchecked(&idx)));
            }
        }
        Self::from_parts(
            out.into(),
            self.dtype,
            self.shape.clone(),
            strides.into(),
            0,
            self.order,
        )
    }

    /// Elements in row-major order of the view.
    pub fn to_vec(&self) -> Vec<Scalar> {
        let src = self.buffer.read();
        self.indices()
            .map(|idx| src.get(self.buffer_index_unchecked(&idx)))
            .collect()
    }

    /// Nested copy, one level per dimension.
    pub fn to_nested(&self) -> Nested {
        fn build(buf: &Buffer, shape: &[usize], strides: &[isize], base: isize) -> Nested {
            match shape.split_first() {
                None => Nested::Scalar(buf.get(base as usize)),
                Some((&n, rest)) => Nested::Array(
                    (0..n)
                        .map(|i| build(buf, rest, &strides[1..], base + i as isize * strides[0]))
                        .collect(),
                ),
            }
        }
        let src = self.buffer.read();
        build(&src, &self.shape, &self.strides, self.offset as isize)
    }
}

/// Nested-array export of a view.
#[derive(Clone, Debug, PartialEq)]
pub enum Nested {
    Scalar(Scalar),
    Array(Vec<Nested>),
}

// ============================================================================
// Index iteration
// ============================================================================

/// Row-major iterator over the multi-indices of a shape.
pub struct IndexIter {
    shape: Arc<[usize]>,
    next: Option<SmallVec<[usize; 8]>>,
}

impl IndexIter {
    fn new(shape: Arc<[usize]>) -> Self {
        let next = (numel(&shape) > 0).then(|| smallvec![0; shape.len()]);
        IndexIter { shape, next }
    }
}

impl Iterator for IndexIter {
    type Item = SmallVec<[usize; 8]>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut advanced = current.clone();
        for k in (0..advanced.len()).rev() {
            advanced[k] += 1;
            if advanced[k] < self.shape[k] {
                self.next = Some(advanced);
                return Some(current);
            }
            advanced[k] = 0;
        }
        Some(current)
    }
}
