//! The strided dispatch engine.
//!
//! A dispatcher pairs a table of native kernels, keyed by the dtypes of its
//! operands, with a fallback over [`Scalar`]. Every `apply` goes through the
//! same steps:
//!
//! 1. `n == 0`: return the output untouched, before any validation.
//! 2. Validate each operand: its lowest and highest reachable buffer index
//!    must lie inside its buffer, or the call fails with
//!    [`StridedError::OperandOutOfBounds`].
//! 3. Re-base each operand at its lowest reachable index and run the native
//!    kernel for the dtype combination, if one is registered.
//! 4. Otherwise run the fallback through [`Buffer::get`] / [`Buffer::set`].
//!
//! Tables are read-only after construction and natives are only registered
//! when [`KernelConfig::global`] allows them.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use strided_dtype::{Buffer, DType, Element, Scalar};
use strided_view::geometry::{
    checked_min_max_view_buffer_index, max_view_index_1d, min_view_index_1d, stride_start,
};
use tracing::{debug, trace};

use crate::access::{
    BufferAccess, BufferAccessMut, StridedAccess, StridedAccessMut, StridedSlice, StridedSliceMut,
};
use crate::config::KernelConfig;
use crate::{simd, Result, StridedError};

/// Which kernel a dtype combination resolves to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KernelPath {
    Native,
    Fallback,
}

// ============================================================================
// Kernel table
// ============================================================================

/// Native kernels keyed by dtype signature.
pub struct KernelTable<K, F: ?Sized> {
    entries: HashMap<K, Box<F>>,
}

impl<K: Eq + Hash, F: ?Sized> KernelTable<K, F> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register `kernel` for `key`, replacing any previous entry.
    pub fn insert(&mut self, key: K, kernel: Box<F>) {
        self.entries.insert(key, kernel);
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<&F> {
        self.entries.get(key).map(|k| &**k)
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub(crate) fn path(&self, key: &K) -> KernelPath {
        if self.contains(key) {
            KernelPath::Native
        } else {
            KernelPath::Fallback
        }
    }

    /// Insert only when natives are enabled for this process.
    pub(crate) fn insert_native(&mut self, key: K, kernel: Box<F>) {
        if KernelConfig::global().natives_enabled() {
            self.insert(key, kernel);
        }
    }
}

impl<K: Eq + Hash, F: ?Sized> Default for KernelTable<K, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, F: ?Sized> fmt::Debug for KernelTable<K, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

// ============================================================================
// Validated operands
// ============================================================================

/// A validated 1-D operand: `n` elements starting at `base + start`, at
/// `stride`, where `base` is the lowest reachable buffer index.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Lane {
    pub(crate) base: usize,
    pub(crate) start: usize,
    pub(crate) stride: isize,
    pub(crate) len: usize,
}

impl Lane {
    pub(crate) fn new(
        operand: &'static str,
        n: usize,
        buffer_len: usize,
        stride: isize,
        offset: usize,
    ) -> Result<Lane> {
        let out_of_bounds = || StridedError::OperandOutOfBounds {
            operand,
            min: min_view_index_1d(n, stride, offset),
            max: max_view_index_1d(n, stride, offset),
            len: buffer_len,
        };
        // bounds that overflow isize can never fit a buffer
        let (min, max) = checked_min_max_view_buffer_index(&[n], &[stride], offset)
            .ok_or_else(|| out_of_bounds())?;
        if min < 0 || max as usize >= buffer_len {
            return Err(out_of_bounds());
        }
        Ok(Lane {
            base: min as usize,
            start: stride_start(n, stride),
            stride,
            len: n,
        })
    }

    /// Buffer index of element 0.
    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.base + self.start
    }

    #[inline]
    pub(crate) fn index(&self, i: usize) -> usize {
        (self.offset() as isize + i as isize * self.stride) as usize
    }

    /// Typed view re-based at `base`.
    #[inline]
    pub(crate) fn slice<'a, T: Copy>(&self, data: &'a [T]) -> StridedSlice<'a, T> {
        StridedSlice::new(&data[self.base..], self.len, self.stride, self.start)
    }

    #[inline]
    pub(crate) fn slice_mut<'a, T: Copy>(&self, data: &'a mut [T]) -> StridedSliceMut<'a, T> {
        StridedSliceMut::new(&mut data[self.base..], self.len, self.stride, self.start)
    }

    #[inline]
    pub(crate) fn access<'a>(&self, buffer: &'a Buffer) -> BufferAccess<'a> {
        BufferAccess::new(buffer, self.len, self.stride, self.offset())
    }

    #[inline]
    pub(crate) fn access_mut<'a>(&self, buffer: &'a mut Buffer) -> BufferAccessMut<'a> {
        BufferAccessMut::new(buffer, self.len, self.stride, self.offset())
    }
}

/// `y[i] = f(x[i])` over typed strided slices.
#[inline]
pub(crate) fn map_lane<T: Copy, U: Copy>(
    x: StridedSlice<'_, T>,
    mut y: StridedSliceMut<'_, U>,
    f: &impl Fn(T) -> U,
) {
    if let (Some(xs), Some(ys)) = (x.as_contiguous(), y.as_contiguous_mut()) {
        simd::dispatch_if_large(xs.len(), || {
            for (o, &v) in ys.iter_mut().zip(xs) {
                *o = f(v);
            }
        });
        return;
    }
    for i in 0..x.len() {
        y.set(i, f(x.get(i)));
    }
}

pub(crate) fn log_table_built(name: &str, natives: usize) {
    debug!(op = name, natives, "dispatch table built");
}

// ============================================================================
// Unary
// ============================================================================

type UnaryKernel = dyn Fn(&Buffer, Lane, &mut Buffer, Lane) -> bool + Send + Sync;
type ScalarUnary = dyn Fn(Scalar) -> Scalar + Send + Sync;

/// A native unary kernel `T -> U`, ready to be placed in a [`UnaryDispatch`].
pub struct NativeUnary {
    key: (DType, DType),
    kernel: Box<UnaryKernel>,
}

impl NativeUnary {
    pub fn new<T: Element, U: Element>(f: impl Fn(T) -> U + Send + Sync + 'static) -> Self {
        let kernel = move |x: &Buffer, lx: Lane, y: &mut Buffer, ly: Lane| {
            let (Some(xs), Some(ys)) = (T::slice_of(x), U::slice_of_mut(y)) else {
                return false;
            };
            map_lane(lx.slice(xs), ly.slice_mut(ys), &f);
            true
        };
        NativeUnary {
            key: (T::DTYPE, U::DTYPE),
            kernel: Box::new(kernel),
        }
    }

    pub fn key(&self) -> (DType, DType) {
        self.key
    }
}

impl fmt::Debug for NativeUnary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeUnary").field("key", &self.key).finish()
    }
}

/// `y[i] = f(x[i])`.
pub struct UnaryDispatch {
    name: &'static str,
    natives: KernelTable<(DType, DType), UnaryKernel>,
    fallback: Box<ScalarUnary>,
}

impl UnaryDispatch {
    pub fn new(name: &'static str, fallback: impl Fn(Scalar) -> Scalar + Send + Sync + 'static) -> Self {
        Self {
            name,
            natives: KernelTable::new(),
            fallback: Box::new(fallback),
        }
    }

    /// Register a native kernel for `(T::DTYPE, U::DTYPE)`.
    pub fn with_native<T: Element, U: Element>(
        self,
        f: impl Fn(T) -> U + Send + Sync + 'static,
    ) -> Self {
        self.register(NativeUnary::new(f))
    }

    pub fn register(mut self, native: NativeUnary) -> Self {
        self.natives.insert_native(native.key, native.kernel);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn native_count(&self) -> usize {
        self.natives.len()
    }

    pub fn resolve(&self, dx: DType, dy: DType) -> KernelPath {
        self.natives.path(&(dx, dy))
    }

    /// Apply to `n` elements of `x` (stride `sx`, offset `ox`) into `y`.
    #[allow(clippy::too_many_arguments)]
    pub fn apply<'y>(
        &self,
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

        let native = self
            .natives
            .get(&(x.dtype(), y.dtype()))
            .is_some_and(|kernel| kernel(x, lx, y, ly));
        if !native {
            let src = lx.access(x);
            for i in 0..n {
                y.set(ly.index(i), (self.fallback)(src.get(i)));
            }
        }
        trace!(op = self.name, n, native, "unary dispatch");
        Ok(y)
    }
}

impl fmt::Debug for UnaryDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryDispatch")
            .field("name", &self.name)
            .field("natives", &self.natives)
            .finish()
    }
}

/// Build a [`UnaryDispatch`] from prepared native kernels and a fallback.
pub fn dispatch(
    name: &'static str,
    natives: impl IntoIterator<Item = NativeUnary>,
    fallback: impl Fn(Scalar) -> Scalar + Send + Sync + 'static,
) -> UnaryDispatch {
    let table = natives
        .into_iter()
        .fold(UnaryDispatch::new(name, fallback), UnaryDispatch::register);
    log_table_built(name, table.native_count());
    table
}

// ============================================================================
// Binary
// ============================================================================

type BinaryKernel = dyn Fn(&Buffer, Lane, &Buffer, Lane, &mut Buffer, Lane) -> bool + Send + Sync;
type ScalarBinary = dyn Fn(Scalar, Scalar) -> Scalar + Send + Sync;

/// `z[i] = f(x[i], y[i])`.
pub struct BinaryDispatch {
    name: &'static str,
    natives: KernelTable<(DType, DType, DType), BinaryKernel>,
    fallback: Box<ScalarBinary>,
}

impl BinaryDispatch {
    pub fn new(
        name: &'static str,
        fallback: impl Fn(Scalar, Scalar) -> Scalar + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            natives: KernelTable::new(),
            fallback: Box::new(fallback),
        }
    }

    pub fn with_native<T: Element, U: Element, V: Element>(
        mut self,
        f: impl Fn(T, U) -> V + Send + Sync + 'static,
    ) -> Self {
        let kernel = move |x: &Buffer, lx: Lane, y: &Buffer, ly: Lane, z: &mut Buffer, lz: Lane| {
            let (Some(xs), Some(ys), Some(zs)) =
                (T::slice_of(x), U::slice_of(y), V::slice_of_mut(z))
            else {
                return false;
            };
            let (xs, ys, mut zs) = (lx.slice(xs), ly.slice(ys), lz.slice_mut(zs));
            if let (Some(a), Some(b), Some(c)) =
                (xs.as_contiguous(), ys.as_contiguous(), zs.as_contiguous_mut())
            {
                simd::dispatch_if_large(c.len(), || {
                    for ((o, &u), &v) in c.iter_mut().zip(a).zip(b) {
                        *o = f(u, v);
                    }
                });
            } else {
                for i in 0..xs.len() {
                    zs.set(i, f(xs.get(i), ys.get(i)));
                }
            }
            true
        };
        self.natives
            .insert_native((T::DTYPE, U::DTYPE, V::DTYPE), Box::new(kernel));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn native_count(&self) -> usize {
        self.natives.len()
    }

    pub fn resolve(&self, dx: DType, dy: DType, dz: DType) -> KernelPath {
        self.natives.path(&(dx, dy, dz))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn apply<'z>(
        &self,
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
        if n == 0 {
            return Ok(z);
        }
        let lx = Lane::new("x", n, x.len(), sx, ox)?;
        let ly = Lane::new("y", n, y.len(), sy, oy)?;
        let lz = Lane::new("z", n, z.len(), sz, oz)?;

        let native = self
            .natives
            .get(&(x.dtype(), y.dtype(), z.dtype()))
            .is_some_and(|kernel| kernel(x, lx, y, ly, z, lz));
        if !native {
            let (a, b) = (lx.access(x), ly.access(y));
            for i in 0..n {
                z.set(lz.index(i), (self.fallback)(a.get(i), b.get(i)));
            }
        }
        trace!(op = self.name, n, native, "binary dispatch");
        Ok(z)
    }
}

// ============================================================================
// Nullary
// ============================================================================

type NullaryKernel = dyn Fn(&mut Buffer, Lane) -> bool + Send + Sync;
type ScalarNullary = dyn Fn() -> Scalar + Send + Sync;

/// `x[i] = f()`.
pub struct NullaryDispatch {
    name: &'static str,
    natives: KernelTable<DType, NullaryKernel>,
    fallback: Box<ScalarNullary>,
}

impl NullaryDispatch {
    pub fn new(name: &'static str, fallback: impl Fn() -> Scalar + Send + Sync + 'static) -> Self {
        Self {
            name,
            natives: KernelTable::new(),
            fallback: Box::new(fallback),
        }
    }

    pub fn with_native<T: Element>(mut self, f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        let kernel = move |x: &mut Buffer, lx: Lane| {
            let Some(xs) = T::slice_of_mut(x) else {
                return false;
            };
            let mut xs = lx.slice_mut(xs);
            match xs.as_contiguous_mut() {
                Some(run) => simd::dispatch_if_large(run.len(), || run.fill_with(&f)),
                None => {
                    for i in 0..lx.len {
                        xs.set(i, f());
                    }
                }
            }
            true
        };
        self.natives.insert_native(T::DTYPE, Box::new(kernel));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn native_count(&self) -> usize {
        self.natives.len()
    }

    pub fn resolve(&self, dx: DType) -> KernelPath {
        self.natives.path(&dx)
    }

    pub fn apply<'x>(
        &self,
        n: usize,
        x: &'x mut Buffer,
        sx: isize,
        ox: usize,
    ) -> Result<&'x mut Buffer> {
        if n == 0 {
            return Ok(x);
        }
        let lx = Lane::new("x", n, x.len(), sx, ox)?;
        let native = self
            .natives
            .get(&x.dtype())
            .is_some_and(|kernel| kernel(x, lx));
        if !native {
            for i in 0..n {
                x.set(lx.index(i), (self.fallback)());
            }
        }
        trace!(op = self.name, n, native, "nullary dispatch");
        Ok(x)
    }
}

// ============================================================================
// Masked unary
// ============================================================================

type MaskedKernel = dyn Fn(&Buffer, Lane, &Buffer, Lane, &mut Buffer, Lane) -> bool + Send + Sync;

/// `y[i] = f(x[i])` where `mask[i]` is falsy; a truthy mask entry skips the
/// element and leaves `y[i]` as it was.
pub struct MaskedUnaryDispatch {
    name: &'static str,
    natives: KernelTable<(DType, DType), MaskedKernel>,
    fallback: Box<ScalarUnary>,
}

impl MaskedUnaryDispatch {
    pub fn new(name: &'static str, fallback: impl Fn(Scalar) -> Scalar + Send + Sync + 'static) -> Self {
        Self {
            name,
            natives: KernelTable::new(),
            fallback: Box::new(fallback),
        }
    }

    pub fn with_native<T: Element, U: Element>(
        mut self,
        f: impl Fn(T) -> U + Send + Sync + 'static,
    ) -> Self {
        let kernel =
            move |x: &Buffer, lx: Lane, mask: &Buffer, lm: Lane, y: &mut Buffer, ly: Lane| {
                let (Some(xs), Some(ys)) = (T::slice_of(x), U::slice_of_mut(y)) else {
                    return false;
                };
                let (xs, mask, mut ys) = (lx.slice(xs), lm.access(mask), ly.slice_mut(ys));
                for i in 0..xs.len() {
                    if !mask.get(i).is_truthy() {
                        ys.set(i, f(xs.get(i)));
                    }
                }
                true
            };
        self.natives
            .insert_native((T::DTYPE, U::DTYPE), Box::new(kernel));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn resolve(&self, dx: DType, dy: DType) -> KernelPath {
        self.natives.path(&(dx, dy))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn apply<'y>(
        &self,
        n: usize,
        x: &Buffer,
        sx: isize,
        ox: usize,
        mask: &Buffer,
        sm: isize,
        om: usize,
        y: &'y mut Buffer,
        sy: isize,
        oy: usize,
    ) -> Result<&'y mut Buffer> {
        if n == 0 {
            return Ok(y);
        }
        let lx = Lane::new("x", n, x.len(), sx, ox)?;
        let lm = Lane::new("mask", n, mask.len(), sm, om)?;
        let ly = Lane::new("y", n, y.len(), sy, oy)?;

        let native = self
            .natives
            .get(&(x.dtype(), y.dtype()))
            .is_some_and(|kernel| kernel(x, lx, mask, lm, y, ly));
        if !native {
            let (src, m) = (lx.access(x), lm.access(mask));
            for i in 0..n {
                if !m.get(i).is_truthy() {
                    y.set(ly.index(i), (self.fallback)(src.get(i)));
                }
            }
        }
        trace!(op = self.name, n, native, "masked unary dispatch");
        Ok(y)
    }
}

// ============================================================================
// Reduction
// ============================================================================

type ReduceKernel<P> = dyn Fn(P, &Buffer, Lane) -> Option<Scalar> + Send + Sync;
type ScalarReduce<P> = dyn Fn(P, &BufferAccess<'_>) -> Scalar + Send + Sync;

/// `n` strided elements reduced to one [`Scalar`], parameterized by `P`
/// (for example a summation method).
pub struct ReduceDispatch<P> {
    name: &'static str,
    natives: KernelTable<DType, ReduceKernel<P>>,
    fallback: Box<ScalarReduce<P>>,
}

impl<P: Copy + 'static> ReduceDispatch<P> {
    pub fn new(
        name: &'static str,
        fallback: impl Fn(P, &BufferAccess<'_>) -> Scalar + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            natives: KernelTable::new(),
            fallback: Box::new(fallback),
        }
    }

    pub fn with_native<T: Element>(
        mut self,
        f: impl Fn(P, StridedSlice<'_, T>) -> Scalar + Send + Sync + 'static,
    ) -> Self {
        let kernel = move |param: P, x: &Buffer, lx: Lane| {
            T::slice_of(x).map(|xs| f(param, lx.slice(xs)))
        };
        self.natives.insert_native(T::DTYPE, Box::new(kernel));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn native_count(&self) -> usize {
        self.natives.len()
    }

    pub fn resolve(&self, dx: DType) -> KernelPath {
        self.natives.path(&dx)
    }

    /// Reduce `n` elements of `x`. With `n == 0` the fallback sees an empty
    /// accessor and no operand is validated.
    pub fn apply(&self, param: P, n: usize, x: &Buffer, sx: isize, ox: usize) -> Result<Scalar> {
        if n == 0 {
            return Ok((self.fallback)(param, &BufferAccess::new(x, 0, sx, ox)));
        }
        let lx = Lane::new("x", n, x.len(), sx, ox)?;
        let native = self
            .natives
            .get(&x.dtype())
            .and_then(|kernel| kernel(param, x, lx));
        trace!(op = self.name, n, native = native.is_some(), "reduce dispatch");
        Ok(match native {
            Some(value) => value,
            None => (self.fallback)(param, &lx.access(x)),
        })
    }
}
