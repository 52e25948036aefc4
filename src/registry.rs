//! Tracking table and its public facade.
//!
//! A `Table<T, N>` holds every record for one `(T, N)` combination. Handles
//! keep the table alive through an `Rc`, so the table is torn down only
//! after its last `Registry` clone and its last `Gc` are gone. Teardown runs
//! the shutdown hook if a handle was ever constructed against the table.
//!
//! A table kept alive by a cycle of tracked values never reaches teardown.
//! Per-thread global tables do not depend on that: their slot closes the
//! table at thread exit. A `Registry::new()` table with cycles needs an
//! explicit [`Registry::shutdown`].
//!
//! Lookup is a linear scan over the slot storage; there is no address index.
//! Tables are expected to hold a small number of live allocations.

use core::any::{Any, TypeId};
use core::cell::{Cell, RefCell};
use core::ptr::NonNull;
use std::rc::Rc;

use hashbrown::HashMap;
use slotmap::{DefaultKey, SlotMap};
use tracing::{debug, trace};

use crate::record::TrackingRecord;

pub(crate) struct Table<T, const N: usize> {
    records: RefCell<SlotMap<DefaultKey, TrackingRecord<T>>>,
    hook_armed: Cell<bool>,
    closed: Cell<bool>,
}

impl<T, const N: usize> Table<T, N> {
    fn new() -> Self {
        Self {
            records: RefCell::new(SlotMap::with_key()),
            hook_armed: Cell::new(false),
            closed: Cell::new(false),
        }
    }

    fn find_in(
        records: &SlotMap<DefaultKey, TrackingRecord<T>>,
        address: NonNull<T>,
    ) -> Option<DefaultKey> {
        records
            .iter()
            .find(|(_, r)| r.address == address)
            .map(|(k, _)| k)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// Panics once the table has been closed; every allocation it tracked
    /// is gone by then.
    pub(crate) fn assert_open(&self) {
        assert!(
            !self.closed.get(),
            "registry for {} was torn down",
            core::any::type_name::<T>()
        );
    }

    pub(crate) fn refcount(&self, address: NonNull<T>) -> Option<usize> {
        let records = self.records.borrow();
        Self::find_in(&records, address).map(|k| records[k].refcount.get())
    }

    /// Look up `address`; bump its count if tracked, otherwise start a new
    /// record at one. Returns the touched record's `(is_array, length)`.
    pub(crate) fn register(&self, address: NonNull<T>, size: usize) -> (bool, usize) {
        if !self.hook_armed.replace(true) {
            debug!(
                element = core::any::type_name::<T>(),
                size = N,
                "shutdown hook armed"
            );
        }
        let mut records = self.records.borrow_mut();
        match Self::find_in(&records, address) {
            Some(k) => {
                let record = &records[k];
                record.refcount.inc();
                trace!(address = ?address, refcount = record.refcount.get(), "reference added");
                (record.is_array, record.length)
            }
            None => {
                let record = TrackingRecord::new(address, size);
                let shape = (record.is_array, record.length);
                records.insert(record);
                trace!(address = ?address, length = size, "record inserted");
                shape
            }
        }
    }

    /// Add a reference to an address that must already be tracked.
    pub(crate) fn retain(&self, address: NonNull<T>) {
        self.assert_open();
        let records = self.records.borrow();
        let k = Self::find_in(&records, address)
            .expect("a live handle's address must be tracked by its table");
        records[k].refcount.inc();
        trace!(address = ?address, refcount = records[k].refcount.get(), "reference added");
    }

    /// Drop a reference without a floor. Untracked addresses are ignored.
    pub(crate) fn release_unchecked(&self, address: NonNull<T>) {
        let records = self.records.borrow();
        if let Some(k) = Self::find_in(&records, address) {
            records[k].refcount.dec_unchecked();
            trace!(address = ?address, refcount = records[k].refcount.get(), "reference dropped");
        }
    }

    /// Drop a reference only if the count is positive.
    pub(crate) fn release(&self, address: NonNull<T>) {
        let records = self.records.borrow();
        if let Some(k) = Self::find_in(&records, address) {
            if records[k].refcount.dec_if_positive() {
                trace!(address = ?address, refcount = records[k].refcount.get(), "reference dropped");
            }
        }
    }

    /// Sweep: detach every zero-count record, then free them with the table
    /// unborrowed. Freeing may drop handles held inside the values, which
    /// can zero further records, so passes repeat until one finds nothing.
    pub(crate) fn collect(&self) -> bool {
        let mut freed = 0usize;
        loop {
            let dead: Vec<TrackingRecord<T>> = {
                let mut records = self.records.borrow_mut();
                let keys: Vec<DefaultKey> = records
                    .iter()
                    .filter(|(_, r)| r.refcount.is_zero())
                    .map(|(k, _)| k)
                    .collect();
                keys.into_iter().filter_map(|k| records.remove(k)).collect()
            };
            if dead.is_empty() {
                break;
            }
            for record in dead {
                trace!(
                    address = ?record.address,
                    is_array = record.is_array,
                    length = record.length,
                    "releasing allocation"
                );
                // SAFETY: the record was detached above, so nothing else can
                // free it; every tracked address came from a Box of the
                // recorded shape (see the `Gc` constructors).
                unsafe { record.release() };
                freed += 1;
            }
        }
        if freed > 0 {
            debug!(freed, remaining = self.len(), "collection pass finished");
        }
        freed > 0
    }

    fn force_all_zero(&self) {
        for (_, record) in self.records.borrow().iter() {
            record.refcount.force_zero();
        }
    }

    pub(crate) fn shutdown(&self) {
        if self.len() == 0 {
            return;
        }
        debug!(
            element = core::any::type_name::<T>(),
            size = N,
            records = self.len(),
            "forcing shutdown collection"
        );
        self.force_all_zero();
        self.collect();
    }

    /// Shut down for good. Handles that survive this may only be dropped.
    pub(crate) fn close(&self) {
        self.closed.set(true);
        self.shutdown();
    }

    fn snapshot(&self) -> Vec<RecordInfo> {
        self.records
            .borrow()
            .values()
            .map(|r| RecordInfo {
                address: r.address.as_ptr() as usize,
                refcount: r.refcount.get(),
                is_array: r.is_array,
                length: r.length,
            })
            .collect()
    }
}

impl<T, const N: usize> Drop for Table<T, N> {
    fn drop(&mut self) {
        if self.hook_armed.get() {
            self.shutdown();
        }
    }
}

/// Point-in-time view of one tracking record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RecordInfo {
    /// Address of the tracked allocation.
    pub address: usize,
    /// Number of references the table holds for the allocation.
    pub refcount: usize,
    /// Whether the allocation is an element array.
    pub is_array: bool,
    /// Element count for arrays, 0 for single objects.
    pub length: usize,
}

/// The tracking table for allocations of `T` with array length `N`.
///
/// `N == 0` tracks single objects. Clones share the same table. The table
/// lives as long as any clone or any [`Gc`](crate::Gc) created against it.
pub struct Registry<T, const N: usize = 0> {
    pub(crate) table: Rc<Table<T, N>>,
}

// Holds a per-thread table and closes it when the thread's locals are
// destroyed, whether or not tracked values still hold handles into it.
struct GlobalSlot<T, const N: usize>(Registry<T, N>);

impl<T, const N: usize> Drop for GlobalSlot<T, N> {
    fn drop(&mut self) {
        debug!(
            element = core::any::type_name::<T>(),
            size = N,
            "closing global registry at thread exit"
        );
        self.0.table.close();
    }
}

thread_local! {
    static GLOBAL_TABLES: RefCell<HashMap<TypeId, Box<dyn Any>>> = RefCell::new(HashMap::new());
}

impl<T, const N: usize> Registry<T, N> {
    /// A fresh, empty table shared by this registry and its clones.
    pub fn new() -> Self {
        Self {
            table: Rc::new(Table::new()),
        }
    }

    /// This thread's shared registry for `(T, N)`, created on first use.
    ///
    /// The table is closed at thread exit: every allocation still tracked is
    /// freed, including ones kept alive only by cycles. Handles that outlive
    /// the close (for example, in another thread-local's destructor) panic
    /// on access and may only be dropped.
    pub fn global() -> Self
    where
        T: 'static,
    {
        GLOBAL_TABLES.with(|tables| {
            let mut tables = tables.borrow_mut();
            let entry = tables.entry(TypeId::of::<Self>()).or_insert_with(|| {
                debug!(
                    element = core::any::type_name::<T>(),
                    size = N,
                    "global registry created"
                );
                Box::new(GlobalSlot(Self::new())) as Box<dyn Any>
            });
            entry
                .downcast_ref::<GlobalSlot<T, N>>()
                .expect("global table slot is keyed by its own type")
                .0
                .clone()
        })
    }

    /// Number of records currently tracked.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table tracks nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free every allocation whose count is zero. Returns whether anything
    /// was freed.
    pub fn collect(&self) -> bool {
        self.table.collect()
    }

    /// Current count for `address`, or `None` if it is not tracked.
    pub fn refcount(&self, address: *const T) -> Option<usize> {
        NonNull::new(address.cast_mut()).and_then(|a| self.table.refcount(a))
    }

    /// Copy out every record. Also logs them at debug level.
    pub fn snapshot(&self) -> Vec<RecordInfo> {
        let records = self.table.snapshot();
        debug!(
            element = core::any::type_name::<T>(),
            size = N,
            records = ?records,
            "table snapshot"
        );
        records
    }

    /// Force every count to zero and collect, emptying the table.
    ///
    /// This overrides reference counting and is meant for final cleanup.
    /// Dropping the table does the same thing automatically, but a table
    /// whose tracked values hold handles into it (a cycle) is never dropped;
    /// call this to reclaim it.
    ///
    /// # Safety
    ///
    /// Every [`Gc`](crate::Gc) outstanding against this table dangles after
    /// the call. Such handles, and cursors borrowed from them, must not be
    /// dereferenced, cloned or reassigned. They may be dropped, but only
    /// before any further allocation is registered with this table, since a
    /// new allocation can reuse a freed address.
    pub unsafe fn shutdown(&self) {
        self.table.shutdown();
    }
}

impl<T, const N: usize> Clone for Registry<T, N> {
    fn clone(&self) -> Self {
        Self {
            table: Rc::clone(&self.table),
        }
    }
}

impl<T, const N: usize> Default for Registry<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> core::fmt::Debug for Registry<T, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("element", &core::any::type_name::<T>())
            .field("size", &N)
            .field("records", &self.len())
            .finish()
    }
}
