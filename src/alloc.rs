//! Allocation primitives that report failure instead of aborting.
//!
//! `Box::new` aborts the process when the allocator gives up. These helpers
//! reserve first and surface
//! [`Error::AllocationFailure`](crate::Error::AllocationFailure), so building
//! a handle can propagate the failure with `?`.

use crate::error::Result;

/// Allocate a single object.
pub fn one<T>(value: T) -> Result<Box<T>> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(1)?;
    v.push(value);
    let raw = Box::into_raw(v.into_boxed_slice());
    // SAFETY: a one-element slice has the layout of `T`.
    Ok(unsafe { Box::from_raw(raw.cast::<T>()) })
}

/// Allocate an `N`-element array, filling element `i` with `fill(i)`.
pub fn array<T, const N: usize>(fill: impl FnMut(usize) -> T) -> Result<Box<[T; N]>> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(N)?;
    v.extend((0..N).map(fill));
    debug_assert_eq!(v.len(), N);
    let raw = Box::into_raw(v.into_boxed_slice());
    // SAFETY: the slice holds exactly `N` elements, so it has the layout of `[T; N]`.
    Ok(unsafe { Box::from_raw(raw.cast::<[T; N]>()) })
}
