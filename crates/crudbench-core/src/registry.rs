//! Backend registry: maps a backend kind to a connected [`Store`].

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

use crate::config::ConnectionConfig;
use crate::error::Error;
use crate::sequence::{CounterDocument, CounterKey, NativeSequence, SequenceAllocator, Strategy};
use crate::store::document::RECORDS_COLLECTION;
use crate::store::keyvalue::SEQUENCE_KEY;
use crate::store::sqlite::RECORDS_SEQUENCE;
use crate::store::{Adaptor, DocumentStore, KeyValueStore, SqliteStore, Store};

/// The supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Relational table with native auto-increment.
    RelationalAuto,
    /// Relational table with explicit identities from a counter row.
    RelationalNoAuto,
    /// Document collection with a counter document.
    Document,
    /// Key-value namespace with a counter key.
    KeyValue,
}

impl BackendKind {
    /// Every backend, in registry order.
    pub const ALL: [BackendKind; 4] = [
        BackendKind::RelationalAuto,
        BackendKind::RelationalNoAuto,
        BackendKind::Document,
        BackendKind::KeyValue,
    ];

    /// Identifier used in configuration, reports and ledger names.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::RelationalAuto => "relational-auto",
            BackendKind::RelationalNoAuto => "relational-no-auto",
            BackendKind::Document => "document",
            BackendKind::KeyValue => "key-value",
        }
    }

    /// Identity strategy the backend is wired with.
    pub fn strategy(&self) -> Strategy {
        match self {
            BackendKind::RelationalAuto => Strategy::Native,
            BackendKind::RelationalNoAuto | BackendKind::Document => Strategy::CounterDocument,
            BackendKind::KeyValue => Strategy::CounterKey,
        }
    }

    /// Location of this backend's database under `data_dir`.
    pub fn data_path(&self, data_dir: &Path) -> PathBuf {
        match self {
            BackendKind::RelationalAuto => data_dir.join("relational_auto.sqlite3"),
            BackendKind::RelationalNoAuto => data_dir.join("relational_no_auto.sqlite3"),
            BackendKind::Document => data_dir.join("document"),
            BackendKind::KeyValue => data_dir.join("key_value"),
        }
    }

    /// Open a connection to this backend.
    ///
    /// Failures are [`Error::Connection`] and are not retried.
    pub fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Store>, Error> {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            Error::Connection(format!(
                "failed to create data directory {}: {}",
                config.data_dir.display(),
                e
            ))
        })?;

        let path = self.data_path(&config.data_dir);
        info!(backend = %self, path = %path.display(), "connecting");

        let store = match self {
            BackendKind::RelationalAuto => sqlite_adaptor(*self, SqliteStore::open(&path, true)?),
            BackendKind::RelationalNoAuto => {
                sqlite_adaptor(*self, SqliteStore::open(&path, false)?)
            }
            BackendKind::Document => document_adaptor(*self, DocumentStore::open(&path)?),
            BackendKind::KeyValue => key_value_adaptor(*self, KeyValueStore::open(&path)?),
        };
        Ok(store)
    }

    /// Open a private, throwaway instance of this backend.
    pub fn connect_temporary(&self) -> Result<Box<dyn Store>, Error> {
        let store = match self {
            BackendKind::RelationalAuto => sqlite_adaptor(*self, SqliteStore::open_in_memory(true)?),
            BackendKind::RelationalNoAuto => {
                sqlite_adaptor(*self, SqliteStore::open_in_memory(false)?)
            }
            BackendKind::Document => document_adaptor(*self, DocumentStore::temporary()?),
            BackendKind::KeyValue => key_value_adaptor(*self, KeyValueStore::temporary()?),
        };
        Ok(store)
    }
}

fn sqlite_adaptor(kind: BackendKind, records: SqliteStore) -> Box<dyn Store> {
    let sequence: Box<dyn SequenceAllocator> = if records.is_autoincrement() {
        Box::new(NativeSequence)
    } else {
        Box::new(CounterDocument::new(records.counter(RECORDS_SEQUENCE)))
    };
    Box::new(Adaptor::new(kind, records, sequence))
}

fn document_adaptor(kind: BackendKind, records: DocumentStore) -> Box<dyn Store> {
    let sequence = CounterDocument::new(records.counter(RECORDS_COLLECTION));
    Box::new(Adaptor::new(kind, records, Box::new(sequence)))
}

fn key_value_adaptor(kind: BackendKind, records: KeyValueStore) -> Box<dyn Store> {
    let sequence = CounterKey::new(records.counter(SEQUENCE_KEY));
    Box::new(Adaptor::new(kind, records, Box::new(sequence)))
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::Config(format!(
                    "unknown backend '{}' (expected one of: {})",
                    s,
                    BackendKind::ALL.map(|k| k.as_str()).join(", ")
                ))
            })
    }
}
