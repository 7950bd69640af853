//! Error types shared by every backend and the benchmark engine.

use thiserror::Error;

/// Benchmark errors.
///
/// A record that is not found is never an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown backend or operation, or an invalid numeric option.
    #[error("configuration error: {0}")]
    Config(String),

    /// The backend could not be opened or reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// A write was rejected, e.g. an identity collision.
    #[error("write error: {0}")]
    Write(String),

    /// SQLite driver error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// sled storage error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Document encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored bytes did not have the expected shape.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// IO error, including ledger writes.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
