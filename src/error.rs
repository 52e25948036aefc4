use std::collections::TryReserveError;

use thiserror::Error;

/// Errors surfaced by cursor access and the allocation primitives.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A cursor was read at a position outside the range it bounds.
    #[error("cursor position {offset} is outside the bounded range of {len} elements")]
    OutOfRange {
        /// Position relative to the start of the range.
        offset: isize,

        /// Number of elements in the range.
        len: usize,
    },

    /// The allocator could not provide memory for a new allocation.
    #[error("allocation failure: {0}")]
    AllocationFailure(#[from] TryReserveError),
}

/// A specialized `Result` type for this crate, returning [`Error`] as the
/// error value.
pub type Result<T> = std::result::Result<T, Error>;
