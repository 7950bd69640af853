//! Document backend on sled.
//!
//! Records are JSON documents `{"_id": n, "name": ".."}` in a `records`
//! collection keyed by big-endian identity. The collection has no identity
//! generator, so a counter document `{"_id": "records", "value": n}` in a
//! separate `counters` collection hands them out.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};

use super::tree::{increment, insert_unique};
use super::{decode_id, encode_id, RecordStore};
use crate::error::Error;
use crate::record::{Record, RecordId};
use crate::sequence::AtomicCounter;

/// Collection holding the benchmark records.
pub const RECORDS_COLLECTION: &str = "records";

/// Collection holding sequence counter documents.
pub const COUNTERS_COLLECTION: &str = "counters";

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    #[serde(rename = "_id")]
    id: RecordId,
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CounterDoc {
    #[serde(rename = "_id")]
    id: String,
    value: u64,
}

/// JSON document collection.
pub struct DocumentStore {
    db: Db,
    records: Tree,
    counters: Tree,
}

impl DocumentStore {
    /// Open (or create) a database directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| {
            Error::Connection(format!("failed to open {}: {}", path.display(), e))
        })?;
        Self::from_db(db)
    }

    /// Open a throwaway database that is removed on drop.
    pub fn temporary() -> Result<Self, Error> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| Error::Connection(format!("failed to open temporary database: {}", e)))?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, Error> {
        let records = db.open_tree(RECORDS_COLLECTION)?;
        let counters = db.open_tree(COUNTERS_COLLECTION)?;
        Ok(Self {
            db,
            records,
            counters,
        })
    }

    /// A counter document in this database's `counters` collection.
    pub fn counter(&self, name: impl Into<String>) -> DocumentCounter {
        DocumentCounter {
            counters: self.counters.clone(),
            name: name.into(),
        }
    }

    fn decode(bytes: &[u8]) -> Result<Record, Error> {
        let doc: Document = serde_json::from_slice(bytes)?;
        Ok(Record {
            id: doc.id,
            value: doc.name,
        })
    }

    fn encode(id: RecordId, value: &str) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(&Document {
            id,
            name: value.to_string(),
        })?)
    }
}

impl RecordStore for DocumentStore {
    fn ensure_schema(&self) -> Result<(), Error> {
        // Collections are created when opened
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        self.records.clear()?;
        Ok(())
    }

    fn write(&self, records: &[(RecordId, &str)]) -> Result<(), Error> {
        let entries = records
            .iter()
            .map(|(id, value)| Ok((encode_id(*id).to_vec(), Self::encode(*id, value)?)))
            .collect::<Result<Vec<_>, Error>>()?;
        insert_unique(&self.records, &entries)
    }

    fn scan(&self) -> Result<Vec<Record>, Error> {
        self.records
            .iter()
            .values()
            .map(|doc| Self::decode(&doc?))
            .collect()
    }

    fn get(&self, id: RecordId) -> Result<Option<Record>, Error> {
        self.records
            .get(encode_id(id))?
            .map(|doc| Self::decode(&doc))
            .transpose()
    }

    fn replace(&self, id: RecordId, value: &str) -> Result<(), Error> {
        let doc = Self::encode(id, value)?;
        // Only documents that already exist are rewritten
        self.records
            .fetch_and_update(encode_id(id), |old| old.map(|_| doc.clone()))?;
        Ok(())
    }

    fn remove(&self, id: RecordId) -> Result<(), Error> {
        self.records.remove(encode_id(id))?;
        Ok(())
    }

    fn max_id(&self) -> Result<Option<RecordId>, Error> {
        self.records
            .last()?
            .map(|(key, _)| decode_id(&key))
            .transpose()
    }

    fn filter_contains(&self, needle: &str) -> Result<Vec<Record>, Error> {
        // Document queries match by regex; escape so the needle is literal
        let pattern =
            Regex::new(&regex::escape(needle)).map_err(|e| Error::InvalidData(e.to_string()))?;

        let mut matches = Vec::new();
        for doc in self.records.iter().values() {
            let record = Self::decode(&doc?)?;
            if pattern.is_match(&record.value) {
                matches.push(record);
            }
        }
        Ok(matches)
    }
}

impl Drop for DocumentStore {
    fn drop(&mut self) {
        let _ = self.db.flush();
    }
}

/// Counter document in the `counters` collection.
pub struct DocumentCounter {
    counters: Tree,
    name: String,
}

impl AtomicCounter for DocumentCounter {
    fn increment(
        &self,
        delta: u64,
        seed: &mut dyn FnMut() -> Result<u64, Error>,
    ) -> Result<u64, Error> {
        increment(
            &self.counters,
            self.name.as_bytes(),
            delta,
            seed,
            |bytes| Ok(serde_json::from_slice::<CounterDoc>(bytes)?.value),
            |value| self.encode(value),
        )
    }

    fn store(&self, value: u64) -> Result<(), Error> {
        self.counters.insert(self.name.as_bytes(), self.encode(value)?)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<u64>, Error> {
        self.counters
            .get(self.name.as_bytes())?
            .map(|bytes| Ok(serde_json::from_slice::<CounterDoc>(&bytes)?.value))
            .transpose()
    }
}

impl DocumentCounter {
    fn encode(&self, value: u64) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(&CounterDoc {
            id: self.name.clone(),
            value,
        })?)
    }
}
