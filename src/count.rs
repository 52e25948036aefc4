//! Per-record reference counter.
//!
//! A plain `Cell<usize>` with the handful of transitions the handle layer
//! needs. Increment follows `Rc`: overflow aborts. Decrement comes in two
//! flavors because the handle paths disagree on what a zero count means:
//! destruction never goes below zero, raw reassignment does not check.

use core::cell::Cell;
use core::marker::PhantomData;

#[derive(Debug)]
pub(crate) struct RefCount {
    count: Cell<usize>,
    // Single-threaded like the table that owns it.
    _nosend: PhantomData<*mut ()>,
}

impl RefCount {
    pub(crate) fn new(initial: usize) -> Self {
        Self {
            count: Cell::new(initial),
            _nosend: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> usize {
        self.count.get()
    }

    #[inline]
    pub(crate) fn is_zero(&self) -> bool {
        self.count.get() == 0
    }

    #[inline]
    pub(crate) fn inc(&self) {
        let n = self.count.get().wrapping_add(1);
        self.count.set(n);
        if n == 0 {
            // Follow Rc semantics: abort on overflow rather than continue unsafely.
            std::process::abort();
        }
    }

    /// Decrement with no floor. A zero count wraps to `usize::MAX`, which
    /// keeps the record out of every sweep until shutdown forces it.
    #[inline]
    pub(crate) fn dec_unchecked(&self) {
        self.count.set(self.count.get().wrapping_sub(1));
    }

    /// Decrement only when positive. Returns whether a decrement happened.
    #[inline]
    pub(crate) fn dec_if_positive(&self) -> bool {
        let c = self.count.get();
        if c > 0 {
            self.count.set(c - 1);
            true
        } else {
            false
        }
    }

    #[inline]
    pub(crate) fn force_zero(&self) {
        self.count.set(0);
    }
}
