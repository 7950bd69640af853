//! Crudbench Core - CRUD latency benchmarking across heterogeneous stores.
//!
//! This crate provides the store adaptors, sequence allocators, timing and
//! statistics engines, and the orchestrator that ties them together.

pub mod config;
pub mod dataset;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod record;
pub mod registry;
pub mod report;
pub mod sequence;
pub mod stats;
pub mod store;
pub mod timing;

pub use config::{BenchConfig, ConnectionConfig, OutputDetail, RunKind, RunMode};
pub use dataset::generate_dataset;
pub use error::Error;
pub use ledger::CsvLedger;
pub use orchestrator::{Observation, Operation, Orchestrator, RunInfo, StageReport};
pub use record::{Record, RecordId};
pub use registry::BackendKind;
pub use report::{ConsoleReporter, MemorySink, ResultSink};
pub use sequence::{Reservation, SequenceAllocator, Strategy};
pub use stats::Summary;
pub use store::{Adaptor, RecordStore, Store};
pub use timing::{time_operation, time_with_setup, DurationSample};
