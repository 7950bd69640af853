//! Store-native identity assignment.

use super::{Reservation, SequenceAllocator, Strategy};
use crate::error::Error;
use crate::record::RecordId;

/// Defers identity assignment to the store's auto-increment.
///
/// Resetting the increment watermark is the store's job: its `clear` must
/// make the next assigned identity 1 again.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeSequence;

impl SequenceAllocator for NativeSequence {
    fn strategy(&self) -> Strategy {
        Strategy::Native
    }

    fn reserve(
        &self,
        _count: usize,
        _floor: &mut dyn FnMut() -> Result<RecordId, Error>,
    ) -> Result<Reservation, Error> {
        Ok(Reservation::Deferred)
    }

    fn reset(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_defers_to_store() {
        let mut floor = || -> Result<RecordId, Error> { panic!("native must not seed") };
        let reservation = NativeSequence.reserve(5, &mut floor).unwrap();
        assert_eq!(reservation, Reservation::Deferred);
        assert_eq!(NativeSequence.strategy(), Strategy::Native);
    }
}
