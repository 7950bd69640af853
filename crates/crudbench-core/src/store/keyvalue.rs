//! Key-value backend on sled.
//!
//! Records live under `record:<id>` keys in a single namespace, the id
//! encoded big-endian so a prefix scan yields identity order. The namespace
//! has no schema and no identity generator; `seq:record` holds a counter
//! that is bumped once per identity.

use std::path::Path;

use sled::{Batch, Db, IVec, Tree};

use super::tree::{increment, insert_unique};
use super::{decode_id, encode_id, RecordStore};
use crate::error::Error;
use crate::record::{Record, RecordId};
use crate::sequence::AtomicCounter;

/// Namespace (sled tree) holding records and their counter.
pub const NAMESPACE: &str = "benchmark";

/// Key prefix for records.
pub const RECORD_PREFIX: &[u8] = b"record:";

/// Counter key for record identities.
pub const SEQUENCE_KEY: &str = "seq:record";

/// Key-value namespace.
pub struct KeyValueStore {
    db: Db,
    namespace: Tree,
}

impl KeyValueStore {
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
        let namespace = db.open_tree(NAMESPACE)?;
        Ok(Self { db, namespace })
    }

    /// A counter key in this namespace.
    pub fn counter(&self, key: impl Into<String>) -> KeyCounter {
        KeyCounter {
            namespace: self.namespace.clone(),
            key: key.into(),
        }
    }

    fn decode(key: &[u8], value: &[u8]) -> Result<Record, Error> {
        let id = record_id(key)?;
        let value = String::from_utf8(value.to_vec())
            .map_err(|e| Error::InvalidData(format!("record {} is not UTF-8: {}", id, e)))?;
        Ok(Record { id, value })
    }

    fn records(&self) -> impl DoubleEndedIterator<Item = Result<(IVec, IVec), Error>> + '_ {
        self.namespace
            .scan_prefix(RECORD_PREFIX)
            .map(|entry| entry.map_err(Error::from))
    }
}

impl RecordStore for KeyValueStore {
    fn ensure_schema(&self) -> Result<(), Error> {
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        let mut batch = Batch::default();
        for entry in self.records() {
            let (key, _) = entry?;
            batch.remove(key);
        }
        self.namespace.apply_batch(batch)?;
        Ok(())
    }

    fn write(&self, records: &[(RecordId, &str)]) -> Result<(), Error> {
        let entries: Vec<_> = records
            .iter()
            .map(|(id, value)| (record_key(*id), value.as_bytes().to_vec()))
            .collect();
        insert_unique(&self.namespace, &entries)
    }

    fn scan(&self) -> Result<Vec<Record>, Error> {
        self.records()
            .map(|entry| {
                let (key, value) = entry?;
                Self::decode(&key, &value)
            })
            .collect()
    }

    fn get(&self, id: RecordId) -> Result<Option<Record>, Error> {
        let key = record_key(id);
        self.namespace
            .get(&key)?
            .map(|value| Self::decode(&key, &value))
            .transpose()
    }

    fn replace(&self, id: RecordId, value: &str) -> Result<(), Error> {
        // Only keys that already exist are overwritten
        self.namespace
            .fetch_and_update(record_key(id), |old| old.map(|_| value.as_bytes().to_vec()))?;
        Ok(())
    }

    fn remove(&self, id: RecordId) -> Result<(), Error> {
        self.namespace.remove(record_key(id))?;
        Ok(())
    }

    fn max_id(&self) -> Result<Option<RecordId>, Error> {
        match self.records().next_back() {
            Some(entry) => {
                let (key, _) = entry?;
                Ok(Some(record_id(&key)?))
            }
            None => Ok(None),
        }
    }

    fn filter_contains(&self, needle: &str) -> Result<Vec<Record>, Error> {
        let mut matches = Vec::new();
        for entry in self.records() {
            let (key, value) = entry?;
            let record = Self::decode(&key, &value)?;
            if record.value.contains(needle) {
                matches.push(record);
            }
        }
        Ok(matches)
    }
}

impl Drop for KeyValueStore {
    fn drop(&mut self) {
        let _ = self.db.flush();
    }
}

/// Counter key holding a decimal integer.
pub struct KeyCounter {
    namespace: Tree,
    key: String,
}

impl AtomicCounter for KeyCounter {
    fn increment(
        &self,
        delta: u64,
        seed: &mut dyn FnMut() -> Result<u64, Error>,
    ) -> Result<u64, Error> {
        increment(
            &self.namespace,
            self.key.as_bytes(),
            delta,
            seed,
            parse_counter,
            |value| Ok(value.to_string().into_bytes()),
        )
    }

    fn store(&self, value: u64) -> Result<(), Error> {
        self.namespace
            .insert(self.key.as_bytes(), value.to_string().into_bytes())?;
        Ok(())
    }

    fn load(&self) -> Result<Option<u64>, Error> {
        self.namespace
            .get(self.key.as_bytes())?
            .map(|bytes| parse_counter(&bytes))
            .transpose()
    }
}

fn record_key(id: RecordId) -> Vec<u8> {
    let mut key = Vec::with_capacity(RECORD_PREFIX.len() + 8);
    key.extend_from_slice(RECORD_PREFIX);
    key.extend_from_slice(&encode_id(id));
    key
}

fn record_id(key: &[u8]) -> Result<RecordId, Error> {
    let suffix = key
        .strip_prefix(RECORD_PREFIX)
        .ok_or_else(|| Error::InvalidData("key outside the record prefix".to_string()))?;
    decode_id(suffix)
}

fn parse_counter(bytes: &[u8]) -> Result<u64, Error> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::InvalidData("counter is not a decimal integer".to_string()))
}
