//! rc-collect: single-threaded handles over tracked allocations, with
//! deterministic collection when the last handle goes away.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: opt-in reclamation without a tracing collector. Clients hold
//!   `Gc` handles instead of raw allocations; a per-type table counts how
//!   many handles point at each allocation and frees the ones nobody points
//!   at anymore.
//! - Layers:
//!   - RefCount: the counter cell inside a record (abort on overflow, a
//!     guarded and an unguarded decrement, force-to-zero).
//!   - TrackingRecord: address, count, array-ness and length of one
//!     allocation; knows how to free itself through the right path.
//!   - Table / Registry: the records for one `(T, N)` pair, the linear
//!     lookup, the sweep and the shutdown hook. `Registry` is the public,
//!     cloneable facade over a shared table.
//!   - Gc: the handle. Construction, clone, reassignment and drop keep the
//!     table's counts equal to the number of live handles.
//!   - Cursor: bounds-checked traversal over a handle's elements.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (no atomics, no locks).
//! - One table per `(T, N)` registry. `N == 0` tracks single objects,
//!   `N > 0` tracks `N`-element arrays.
//! - Lookup is a linear scan; tables are meant to stay small.
//! - Collection is explicit and deterministic: on every handle drop, on
//!   `Registry::collect`, and once more when the table is torn down.
//!
//! Sweep
//! - Each pass detaches every zero-count record from the table before any
//!   allocation is freed, so no record is skipped while the table changes.
//!   Freeing runs user destructors with the table unborrowed; those may
//!   drop more handles, so passes repeat until one finds nothing.
//!
//! Shutdown
//! - The first handle constructed against a table arms its shutdown hook.
//!   When the table is torn down the hook forces every count to zero and
//!   sweeps once, so nothing tracked survives the table. The same step is
//!   available as `Registry::shutdown`, which is `unsafe` because handles
//!   still alive at that point are left dangling.
//! - A cycle of tracked values keeps its table alive, so teardown alone
//!   never reaches it. Per-thread global tables are closed by their
//!   thread-local slot at thread exit regardless; after that, surviving
//!   handles panic on access. `Registry::new()` tables with cycles need an
//!   explicit `Registry::shutdown`.
//!
//! Hazards kept on purpose
//! - Reassigning from a raw address decrements the old target with no
//!   floor; a zero count wraps and the record then waits for shutdown.
//! - Reassignment never sweeps. Dead records pile up until the next drop
//!   or explicit collect.
//! - `Gc::assign_from` moves only the address; cached array shape stays.
//! - Cycles between tracked allocations are never reclaimed by collection;
//!   only shutdown or the global slot's close frees them.

pub mod alloc;
mod count;
pub mod cursor;
mod error;
mod gc;
mod record;
mod registry;

// Public surface
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use gc::Gc;
pub use registry::{RecordInfo, Registry};
