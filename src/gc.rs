//! `Gc`: the handle clients hold instead of a raw allocation.
//!
//! Every construction, clone and reassignment adjusts the count on the
//! matching record in the handle's table. Dropping a handle returns its
//! count and then sweeps the table, so an allocation is freed by the drop
//! of its last handle. Reassignment does not sweep: a handle that is
//! retargeted many times leaves dead records behind until the next drop or
//! an explicit [`Registry::collect`].

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::{Deref, Index};
use core::ptr::NonNull;
use std::rc::Rc;

use crate::cursor::Cursor;
use crate::registry::{Registry, Table};

/// Shared handle to a tracked allocation of `T`.
///
/// `N == 0` handles point at single objects; `N > 0` handles point at
/// `N`-element arrays. All handles of one `(T, N)` registry share its table.
pub struct Gc<T, const N: usize = 0> {
    table: Rc<Table<T, N>>,
    address: NonNull<T>,
    is_array: bool,
    length: usize,
    _owns: PhantomData<T>,
}

impl<T> Gc<T> {
    /// Track a single object.
    pub fn new(registry: &Registry<T>, value: Box<T>) -> Self {
        let address = NonNull::from(Box::leak(value));
        // SAFETY: a fresh box is untracked and has the single-object shape.
        unsafe { Self::from_raw(registry, address) }
    }

    /// Retarget this handle at a new single object.
    pub fn assign(&mut self, value: Box<T>) {
        let address = NonNull::from(Box::leak(value));
        // SAFETY: as in `new`.
        unsafe { self.assign_raw(address) }
    }
}

impl<T, const N: usize> Gc<T, N> {
    /// Track an `N`-element array.
    pub fn new_array(registry: &Registry<T, N>, values: Box<[T; N]>) -> Self {
        const { assert!(N > 0, "array handles need a nonzero length") };
        let address = NonNull::from(Box::leak(values)).cast::<T>();
        // SAFETY: a fresh box is untracked and holds exactly `N` elements.
        unsafe { Self::from_raw(registry, address) }
    }

    /// Retarget this handle at a new `N`-element array.
    pub fn assign_array(&mut self, values: Box<[T; N]>) {
        const { assert!(N > 0, "array handles need a nonzero length") };
        let address = NonNull::from(Box::leak(values)).cast::<T>();
        // SAFETY: as in `new_array`.
        unsafe { self.assign_raw(address) }
    }

    /// Build a handle from a raw address. If the address is already tracked
    /// its count goes up by one; otherwise a record starting at one is added.
    ///
    /// # Safety
    ///
    /// `address` must be either tracked by `registry` already, or an
    /// allocation nobody else owns that came from `Box<T>` (when `N == 0`) or
    /// `Box<[T; N]>` (when `N > 0`). The table takes over freeing it.
    pub unsafe fn from_raw(registry: &Registry<T, N>, address: NonNull<T>) -> Self {
        let (is_array, length) = registry.table.register(address, N);
        Self {
            table: Rc::clone(&registry.table),
            address,
            is_array,
            length,
            _owns: PhantomData,
        }
    }

    /// Retarget this handle at a raw address. The old target loses one
    /// count, with no floor; the new one gains one or starts a record.
    /// The cached shape is kept.
    ///
    /// # Safety
    ///
    /// Same requirements on `address` as [`Gc::from_raw`], against this
    /// handle's registry.
    pub unsafe fn assign_raw(&mut self, address: NonNull<T>) {
        self.table.release_unchecked(self.address);
        self.table.register(address, N);
        self.address = address;
    }

    /// Retarget this handle at `other`'s allocation. Only the address moves
    /// over; `is_array` and the cached length stay as they were.
    pub fn assign_from(&mut self, other: &Self) {
        self.table.release_unchecked(self.address);
        other.table.retain(other.address);
        self.address = other.address;
        if !Rc::ptr_eq(&self.table, &other.table) {
            self.table = Rc::clone(&other.table);
        }
    }

    /// Give up the handle without returning its count. The allocation stays
    /// tracked and is only freed by the table's shutdown.
    pub fn into_raw(this: Self) -> NonNull<T> {
        let this = ManuallyDrop::new(this);
        // SAFETY: `this` is never used again; the table reference is moved
        // out exactly once and dropped.
        drop(unsafe { core::ptr::read(&this.table) });
        this.address
    }

    /// The registry this handle counts against.
    pub fn registry(&self) -> Registry<T, N> {
        Registry {
            table: Rc::clone(&self.table),
        }
    }

    /// The tracked address.
    pub fn as_ptr(&self) -> *const T {
        self.address.as_ptr()
    }

    /// Whether both handles point at the same allocation.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.address == other.address
    }

    /// Whether the cached shape is an element array.
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// Cached array length; 0 for single objects.
    pub fn array_len(&self) -> usize {
        self.length
    }

    fn extent(&self) -> usize {
        if self.is_array {
            self.length
        } else {
            1
        }
    }

    /// The allocation as a slice: one element for single objects.
    pub fn as_slice(&self) -> &[T] {
        self.table.assert_open();
        // SAFETY: the record for `address` holds at least this handle's
        // count, so the allocation is live and spans `extent()` elements.
        unsafe { core::slice::from_raw_parts(self.address.as_ptr(), self.extent()) }
    }

    /// Mutable access when this is the only reference to the allocation.
    pub fn get_mut(this: &mut Self) -> Option<&mut [T]> {
        this.table.assert_open();
        if this.table.refcount(this.address) != Some(1) {
            return None;
        }
        // SAFETY: the count of one is this handle's, and `&mut self` rules
        // out borrows through it.
        Some(unsafe { core::slice::from_raw_parts_mut(this.address.as_ptr(), this.extent()) })
    }

    /// Element `i` without a bounds check.
    ///
    /// # Safety
    ///
    /// `i` must be below the allocation's element count.
    pub unsafe fn get_unchecked(&self, i: usize) -> &T {
        &*self.address.as_ptr().add(i)
    }

    /// Cursor at the first element.
    pub fn begin(&self) -> Cursor<'_, T> {
        self.table.assert_open();
        Cursor::over(self.address, self.extent(), 0)
    }

    /// Cursor one past the last element.
    pub fn end(&self) -> Cursor<'_, T> {
        self.table.assert_open();
        let extent = self.extent();
        Cursor::over(self.address, extent, extent as isize)
    }
}

impl<T, const N: usize> Clone for Gc<T, N> {
    fn clone(&self) -> Self {
        self.table.retain(self.address);
        Self {
            table: Rc::clone(&self.table),
            address: self.address,
            is_array: self.is_array,
            length: self.length,
            _owns: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign_from(source);
    }
}

impl<T, const N: usize> Drop for Gc<T, N> {
    fn drop(&mut self) {
        self.table.release(self.address);
        self.table.collect();
    }
}

impl<T, const N: usize> Deref for Gc<T, N> {
    type Target = T;

    fn deref(&self) -> &T {
        self.table.assert_open();
        // SAFETY: see `as_slice`.
        unsafe { self.address.as_ref() }
    }
}

impl<T, const N: usize> Index<usize> for Gc<T, N> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        &self.as_slice()[i]
    }
}

impl<T, const N: usize> PartialEq for Gc<T, N> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.table, &other.table) && self.address == other.address
    }
}

impl<T, const N: usize> Eq for Gc<T, N> {}

impl<T, const N: usize> Hash for Gc<T, N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.table) as usize).hash(state);
        self.address.hash(state);
    }
}

impl<T, const N: usize> fmt::Debug for Gc<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gc")
            .field("address", &self.address)
            .field("is_array", &self.is_array)
            .field("length", &self.length)
            .finish()
    }
}
