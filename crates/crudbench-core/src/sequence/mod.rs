//! Sequence allocators.
//!
//! Backends disagree on how identities are produced. Relational tables with
//! auto-increment assign them on write; document collections and key-value
//! namespaces have no such concept and need an out-of-band counter. A
//! [`SequenceAllocator`] hides that difference from the adaptor so every
//! backend hands out the same `1, 2, 3, ..` sequence, including across warm
//! runs that never reset the store.
//!
//! Counter strategies never read-modify-write at the application level; they
//! sit on an [`AtomicCounter`] that each backend implements with its own
//! atomic primitive.

mod counter;
mod native;

pub use counter::{CounterDocument, CounterKey};
pub use native::NativeSequence;

use crate::error::Error;
use crate::record::RecordId;

/// Identity allocation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The store assigns identities on insert.
    Native,
    /// A counter document is bumped once by the batch size.
    CounterDocument,
    /// A counter key is bumped once per identity.
    CounterKey,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Native => write!(f, "native"),
            Strategy::CounterDocument => write!(f, "counter-document"),
            Strategy::CounterKey => write!(f, "counter-key"),
        }
    }
}

/// Outcome of reserving identities for a batch of inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// The store assigns identities itself while writing the batch.
    Deferred,
    /// Identities reserved ahead of the write, one per value, ascending.
    Reserved(Vec<RecordId>),
}

/// Produces strictly increasing identities for new records.
pub trait SequenceAllocator {
    /// The strategy this allocator implements.
    fn strategy(&self) -> Strategy;

    /// Reserve identities for `count` new records.
    ///
    /// `floor` yields the highest identity currently in the store. It is only
    /// consulted when the counter has never been written, so a counter created
    /// against pre-existing data starts above it.
    fn reserve(
        &self,
        count: usize,
        floor: &mut dyn FnMut() -> Result<RecordId, Error>,
    ) -> Result<Reservation, Error>;

    /// Return the counter to its baseline so the next identity is 1.
    fn reset(&self) -> Result<(), Error>;
}

/// Backend-side counter with an atomic increment.
pub trait AtomicCounter {
    /// Atomically add `delta` and return the new value.
    ///
    /// A counter with no stored value starts from `seed()`.
    fn increment(
        &self,
        delta: u64,
        seed: &mut dyn FnMut() -> Result<u64, Error>,
    ) -> Result<u64, Error>;

    /// Overwrite the counter.
    fn store(&self, value: u64) -> Result<(), Error>;

    /// Current value, `None` if the counter has never been written.
    fn load(&self) -> Result<Option<u64>, Error>;
}

impl<C: AtomicCounter + ?Sized> AtomicCounter for &C {
    fn increment(
        &self,
        delta: u64,
        seed: &mut dyn FnMut() -> Result<u64, Error>,
    ) -> Result<u64, Error> {
        (**self).increment(delta, seed)
    }

    fn store(&self, value: u64) -> Result<(), Error> {
        (**self).store(value)
    }

    fn load(&self) -> Result<Option<u64>, Error> {
        (**self).load()
    }
}
