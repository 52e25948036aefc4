//! Bounds-checked cursor over a contiguous element range.
//!
//! A cursor is a position plus the `[begin, end)` range it may read. Moving
//! never checks bounds; only reads do. Cursors take no part in reference
//! counting: holding one does not keep the allocation tracked.

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Add, AddAssign, Sub, SubAssign};
use core::ptr::NonNull;

use crate::error::{Error, Result};

/// Cursor over elements of `T` borrowed for `'a`.
///
/// Cursors obtained from [`Gc::begin`](crate::Gc::begin) and
/// [`Gc::end`](crate::Gc::end) borrow the handle, so they cannot outlive it.
/// The allocation can still be freed underneath a cursor by
/// [`Registry::shutdown`](crate::Registry::shutdown), whose safety contract
/// covers that case.
pub struct Cursor<'a, T> {
    begin: NonNull<T>,
    len: usize,
    // Offset of the current position from `begin`, in elements.
    pos: isize,
    _borrow: PhantomData<&'a T>,
}

impl<'a, T> Cursor<'a, T> {
    pub(crate) fn over(begin: NonNull<T>, len: usize, pos: isize) -> Self {
        Self {
            begin,
            len,
            pos,
            _borrow: PhantomData,
        }
    }

    /// Build a cursor over `len` elements starting at `begin`, positioned at
    /// `begin + pos`.
    ///
    /// # Safety
    ///
    /// `begin..begin + len` must be valid for reads of `T` for all of `'a`.
    /// Nothing ties the cursor to the allocation's lifetime; reading through
    /// it after the allocation is freed is undefined behavior.
    pub unsafe fn from_raw_parts(begin: NonNull<T>, len: usize, pos: isize) -> Self {
        Self::over(begin, len, pos)
    }

    /// Number of elements in the bounded range.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the bounded range has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position relative to the start of the range. May lie outside it.
    pub fn offset(&self) -> isize {
        self.pos
    }

    fn in_range(&self, pos: isize) -> bool {
        usize::try_from(pos).is_ok_and(|p| p < self.len)
    }

    fn element(&self, pos: isize) -> Result<&'a T> {
        if !self.in_range(pos) {
            return Err(Error::OutOfRange {
                offset: pos,
                len: self.len,
            });
        }
        // SAFETY: `pos` is inside the range this cursor was built over, and
        // the range is valid for reads for `'a`.
        Ok(unsafe { &*self.begin.as_ptr().offset(pos) })
    }

    /// The element at the current position.
    pub fn get(&self) -> Result<&'a T> {
        self.element(self.pos)
    }

    /// The element `i` positions past the current one.
    pub fn index(&self, i: isize) -> Result<&'a T> {
        self.element(self.pos.wrapping_add(i))
    }

    /// Advance by one; returns the cursor for chaining.
    pub fn inc(&mut self) -> &mut Self {
        self.pos = self.pos.wrapping_add(1);
        self
    }

    /// Step back by one; returns the cursor for chaining.
    pub fn dec(&mut self) -> &mut Self {
        self.pos = self.pos.wrapping_sub(1);
        self
    }

    /// Advance by one and return the cursor as it was before the move.
    pub fn post_inc(&mut self) -> Self {
        let before = *self;
        self.inc();
        before
    }

    /// Step back by one and return the cursor as it was before the move.
    pub fn post_dec(&mut self) -> Self {
        let before = *self;
        self.dec();
        before
    }

    /// Address of the current position. Computed without dereferencing, so
    /// it is meaningful even outside the range.
    pub fn as_ptr(&self) -> *const T {
        self.begin.as_ptr().wrapping_offset(self.pos)
    }

    fn addr(&self) -> usize {
        self.as_ptr() as usize
    }
}

impl<T> Clone for Cursor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Cursor<'_, T> {}

impl<T> AddAssign<isize> for Cursor<'_, T> {
    fn add_assign(&mut self, n: isize) {
        self.pos = self.pos.wrapping_add(n);
    }
}

impl<T> SubAssign<isize> for Cursor<'_, T> {
    fn sub_assign(&mut self, n: isize) {
        self.pos = self.pos.wrapping_sub(n);
    }
}

impl<T> Add<isize> for Cursor<'_, T> {
    type Output = Self;

    fn add(mut self, n: isize) -> Self {
        self += n;
        self
    }
}

impl<T> Sub<isize> for Cursor<'_, T> {
    type Output = Self;

    fn sub(mut self, n: isize) -> Self {
        self -= n;
        self
    }
}

/// Number of elements from `rhs` to `self`.
impl<'a, T> Sub<Cursor<'a, T>> for Cursor<'a, T> {
    type Output = isize;

    fn sub(self, rhs: Cursor<'a, T>) -> isize {
        let size = core::mem::size_of::<T>();
        if size == 0 || self.begin == rhs.begin {
            return self.pos.wrapping_sub(rhs.pos);
        }
        (self.addr() as isize).wrapping_sub(rhs.addr() as isize) / size as isize
    }
}

impl<T> PartialEq for Cursor<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl<T> Eq for Cursor<'_, T> {}

impl<T> PartialOrd for Cursor<'_, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Cursor<'_, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.addr().cmp(&other.addr())
    }
}

impl<T> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("begin", &self.begin)
            .field("len", &self.len)
            .field("pos", &self.pos)
            .finish()
    }
}
