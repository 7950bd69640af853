//! The uniform CRUD contract and its backends.
//!
//! [`Store`] is what the orchestrator talks to. It is implemented once, by
//! [`Adaptor`], which combines a backend's raw [`RecordStore`] primitives with
//! one of the [`SequenceAllocator`] strategies. Backends therefore only
//! implement storage; identity policy, the "delete newest" fallback and input
//! ordering live here.

pub mod document;
pub mod keyvalue;
pub mod sqlite;
pub(crate) mod tree;

pub use document::{DocumentCounter, DocumentStore};
pub use keyvalue::{KeyCounter, KeyValueStore};
pub use sqlite::{SqliteCounter, SqliteStore};

use tracing::debug;

use crate::error::Error;
use crate::record::{Record, RecordId};
use crate::registry::BackendKind;
use crate::sequence::{Reservation, SequenceAllocator, Strategy};

/// A connected backend exposing identical CRUD semantics.
///
/// Dropping the store closes the underlying connection.
pub trait Store {
    /// Which backend this store talks to.
    fn backend(&self) -> BackendKind;

    /// The identity strategy in use.
    fn strategy(&self) -> Strategy;

    /// Create the backing table, collection or namespace if absent.
    fn ensure_schema(&self) -> Result<(), Error>;

    /// Delete every record and return the sequence to its baseline.
    fn reset_state(&self) -> Result<(), Error>;

    /// Insert values in order; `values[i]` receives the i-th new identity.
    fn insert(&self, values: &[String]) -> Result<(), Error>;

    /// All live records, ascending by identity.
    fn read_all(&self) -> Result<Vec<Record>, Error>;

    /// Point lookup.
    fn read_by_id(&self, id: RecordId) -> Result<Option<Record>, Error>;

    /// Replace the value at `id`. Missing identities are ignored.
    fn update(&self, id: RecordId, value: &str) -> Result<(), Error>;

    /// Delete `id`, or the record with the highest identity when `None`.
    ///
    /// Deleting from an empty store, or a missing identity, is a no-op.
    fn delete(&self, id: Option<RecordId>) -> Result<(), Error>;

    /// Records whose value contains `needle` literally, ascending by identity.
    fn filter_contains(&self, needle: &str) -> Result<Vec<Record>, Error>;
}

/// Raw storage primitives a backend provides to [`Adaptor`].
pub trait RecordStore {
    /// Create the backing structure if absent.
    fn ensure_schema(&self) -> Result<(), Error>;

    /// Delete every record, resetting any native increment watermark.
    fn clear(&self) -> Result<(), Error>;

    /// Write values and let the store assign identities in order.
    fn append(&self, values: &[String]) -> Result<(), Error> {
        let _ = values;
        Err(Error::Write(
            "store does not assign identities natively".to_string(),
        ))
    }

    /// Write records with pre-reserved identities.
    ///
    /// Fails with [`Error::Write`] if any identity is already taken.
    fn write(&self, records: &[(RecordId, &str)]) -> Result<(), Error>;

    /// All records, ascending by identity.
    fn scan(&self) -> Result<Vec<Record>, Error>;

    /// Fetch one record.
    fn get(&self, id: RecordId) -> Result<Option<Record>, Error>;

    /// Overwrite an existing record's value; no-op if absent.
    fn replace(&self, id: RecordId, value: &str) -> Result<(), Error>;

    /// Remove a record; no-op if absent.
    fn remove(&self, id: RecordId) -> Result<(), Error>;

    /// Highest identity currently stored.
    fn max_id(&self) -> Result<Option<RecordId>, Error>;

    /// Literal substring match over values, ascending by identity.
    fn filter_contains(&self, needle: &str) -> Result<Vec<Record>, Error>;
}

/// The single [`Store`] implementation: record primitives plus a sequence
/// strategy.
pub struct Adaptor<R> {
    backend: BackendKind,
    records: R,
    sequence: Box<dyn SequenceAllocator>,
}

impl<R: RecordStore> Adaptor<R> {
    /// Combine a record store with an identity strategy.
    pub fn new(backend: BackendKind, records: R, sequence: Box<dyn SequenceAllocator>) -> Self {
        Self {
            backend,
            records,
            sequence,
        }
    }

    /// Access the raw record store.
    pub fn records(&self) -> &R {
        &self.records
    }
}

impl<R: RecordStore> Store for Adaptor<R> {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    fn strategy(&self) -> Strategy {
        self.sequence.strategy()
    }

    fn ensure_schema(&self) -> Result<(), Error> {
        debug!(backend = %self.backend, "ensuring schema");
        self.records.ensure_schema()
    }

    fn reset_state(&self) -> Result<(), Error> {
        debug!(backend = %self.backend, "resetting state");
        self.records.clear()?;
        self.sequence.reset()
    }

    fn insert(&self, values: &[String]) -> Result<(), Error> {
        if values.is_empty() {
            return Ok(());
        }

        let records = &self.records;
        let mut floor = || records.max_id().map(|id| id.unwrap_or(0));

        match self.sequence.reserve(values.len(), &mut floor)? {
            Reservation::Deferred => self.records.append(values),
            Reservation::Reserved(ids) => {
                if ids.len() != values.len() {
                    return Err(Error::Write(format!(
                        "reserved {} identities for {} values",
                        ids.len(),
                        values.len()
                    )));
                }
                let rows: Vec<(RecordId, &str)> = ids
                    .into_iter()
                    .zip(values.iter().map(String::as_str))
                    .collect();
                self.records.write(&rows)
            }
        }
    }

    fn read_all(&self) -> Result<Vec<Record>, Error> {
        self.records.scan()
    }

    fn read_by_id(&self, id: RecordId) -> Result<Option<Record>, Error> {
        self.records.get(id)
    }

    fn update(&self, id: RecordId, value: &str) -> Result<(), Error> {
        self.records.replace(id, value)
    }

    fn delete(&self, id: Option<RecordId>) -> Result<(), Error> {
        let target = match id {
            Some(id) => Some(id),
            None => self.records.max_id()?,
        };

        match target {
            Some(id) => self.records.remove(id),
            None => Ok(()),
        }
    }

    fn filter_contains(&self, needle: &str) -> Result<Vec<Record>, Error> {
        self.records.filter_contains(needle)
    }
}

/// Big-endian identity key, so byte order matches identity order.
pub(crate) fn encode_id(id: RecordId) -> [u8; 8] {
    id.to_be_bytes()
}

/// Decode a key produced by [`encode_id`].
pub(crate) fn decode_id(bytes: &[u8]) -> Result<RecordId, Error> {
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::InvalidData(format!("identity key has {} bytes", bytes.len())))?;
    Ok(RecordId::from_be_bytes(bytes))
}
