//! Tracking record: what the table knows about one allocation.

use core::ptr::{self, NonNull};

use crate::count::RefCount;

#[derive(Debug)]
pub(crate) struct TrackingRecord<T> {
    pub(crate) refcount: RefCount,
    pub(crate) address: NonNull<T>,
    pub(crate) is_array: bool,
    pub(crate) length: usize,
}

impl<T> TrackingRecord<T> {
    /// New record holding one reference. `size == 0` marks a single object.
    pub(crate) fn new(address: NonNull<T>, size: usize) -> Self {
        Self {
            refcount: RefCount::new(1),
            address,
            is_array: size != 0,
            length: size,
        }
    }

    /// Free the allocation through the path matching its shape.
    ///
    /// # Safety
    ///
    /// `address` must come from `Box<T>` (single object) or a boxed slice /
    /// `Box<[T; length]>` (array), must not be freed elsewhere, and no
    /// reference into it may outlive this call.
    pub(crate) unsafe fn release(self) {
        if self.is_array {
            let slice = ptr::slice_from_raw_parts_mut(self.address.as_ptr(), self.length);
            drop(Box::from_raw(slice));
        } else {
            drop(Box::from_raw(self.address.as_ptr()));
        }
    }
}

// Records are the same record iff they describe the same address.
impl<T> PartialEq for TrackingRecord<T> {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl<T> Eq for TrackingRecord<T> {}
