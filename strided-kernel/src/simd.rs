//! Optional runtime SIMD dispatch for unit-stride elementwise loops.
//!
//! With the `simd` feature, [`dispatch`] runs its closure under
//! `pulp::Arch::dispatch`, which selects the best instruction set available
//! at runtime and lets the compiler vectorize the inlined loop for it.
//! Without the feature the closure is called directly.
//!
//! Only elementwise loops go through here. Reductions keep a fixed
//! left-to-right traversal and never use multi-accumulator SIMD sums.

#[inline(always)]
pub(crate) fn dispatch<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(feature = "simd")]
    {
        pulp::Arch::new().dispatch(f)
    }
    #[cfg(not(feature = "simd"))]
    {
        f()
    }
}

/// Minimum run length worth the dispatch overhead.
pub(crate) const SIMD_MIN_LEN: usize = 64;

#[inline(always)]
pub(crate) fn dispatch_if_large<R>(len: usize, f: impl FnOnce() -> R) -> R {
    if len >= SIMD_MIN_LEN {
        dispatch(f)
    } else {
        f()
    }
}
