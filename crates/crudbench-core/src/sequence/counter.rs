//! Counter-backed identity strategies.

use tracing::debug;

use super::{AtomicCounter, Reservation, SequenceAllocator, Strategy};
use crate::error::Error;
use crate::record::RecordId;

/// Reserves a whole batch with a single increment of a counter document.
///
/// The increment returns the top of the reserved range; the batch receives
/// `top - count + 1 ..= top`.
pub struct CounterDocument<C> {
    counter: C,
}

impl<C: AtomicCounter> CounterDocument<C> {
    /// Create a strategy over the given counter.
    pub fn new(counter: C) -> Self {
        Self { counter }
    }

    /// Access the underlying counter.
    pub fn counter(&self) -> &C {
        &self.counter
    }
}

impl<C: AtomicCounter> SequenceAllocator for CounterDocument<C> {
    fn strategy(&self) -> Strategy {
        Strategy::CounterDocument
    }

    fn reserve(
        &self,
        count: usize,
        floor: &mut dyn FnMut() -> Result<RecordId, Error>,
    ) -> Result<Reservation, Error> {
        if count == 0 {
            return Ok(Reservation::Reserved(Vec::new()));
        }

        let count = count as u64;
        let top = self.counter.increment(count, floor)?;
        let base = top.checked_sub(count).ok_or_else(|| {
            Error::InvalidData(format!(
                "counter returned {} after reserving {} identities",
                top, count
            ))
        })?;
        debug!(count, top, "reserved identity range");
        Ok(Reservation::Reserved((base + 1..=top).collect()))
    }

    fn reset(&self) -> Result<(), Error> {
        self.counter.store(0)
    }
}

/// Reserves identities with one atomic increment of a counter key each.
///
/// Each identity comes from its own increment, so batches interleaved by
/// another writer still never share an identity. Identities within a batch
/// are ascending but not necessarily contiguous.
pub struct CounterKey<C> {
    counter: C,
}

impl<C: AtomicCounter> CounterKey<C> {
    /// Create a strategy over the given counter.
    pub fn new(counter: C) -> Self {
        Self { counter }
    }

    /// Access the underlying counter.
    pub fn counter(&self) -> &C {
        &self.counter
    }
}

impl<C: AtomicCounter> SequenceAllocator for CounterKey<C> {
    fn strategy(&self) -> Strategy {
        Strategy::CounterKey
    }

    fn reserve(
        &self,
        count: usize,
        floor: &mut dyn FnMut() -> Result<RecordId, Error>,
    ) -> Result<Reservation, Error> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(self.counter.increment(1, floor)?);
        }
        Ok(Reservation::Reserved(ids))
    }

    fn reset(&self) -> Result<(), Error> {
        self.counter.store(0)
    }
}
