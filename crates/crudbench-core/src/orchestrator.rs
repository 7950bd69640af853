//! Benchmark orchestrator.
//!
//! A run is either a *scenario* (insert, full scan, lookup, update and delete
//! in that order over one evolving dataset) or an *isolated* measurement of a
//! single operation, where every repeat starts from the same baseline. Setup
//! work is never timed.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::config::{BenchConfig, RunKind, RunMode};
use crate::dataset::generate_dataset;
use crate::error::Error;
use crate::record::{Record, RecordId};
use crate::registry::BackendKind;
use crate::report::ResultSink;
use crate::stats::Summary;
use crate::store::Store;
use crate::timing::{time_with_setup, DurationSample};

/// Value written by the update stage.
pub const UPDATED_VALUE: &str = "Updated Record";

/// A benchmarked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    FullScan,
    Lookup,
    Update,
    Delete,
}

impl Operation {
    /// Scenario order.
    pub const ALL: [Operation; 5] = [
        Operation::Insert,
        Operation::FullScan,
        Operation::Lookup,
        Operation::Update,
        Operation::Delete,
    ];

    /// Name used in configuration, reports and the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::FullScan => "full_scan",
            Operation::Lookup => "lookup",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Whether the operation changes the store.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Operation::FullScan | Operation::Lookup)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::Config(format!(
                    "unknown operation '{}' (expected one of: {})",
                    s,
                    Operation::ALL.map(|op| op.as_str()).join(", ")
                ))
            })
    }
}

/// What a read-only operation returned on its last repeat.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Result of a full scan.
    Scan(Vec<Record>),
    /// Result of a point lookup.
    Lookup {
        id: RecordId,
        record: Option<Record>,
    },
}

/// Result of measuring one operation.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub operation: Operation,
    pub sample: DurationSample,
    pub summary: Summary,
    /// Output of the last repeat, for full scans and lookups.
    pub observation: Option<Observation>,
}

impl StageReport {
    fn new(operation: Operation, sample: DurationSample, observation: Option<Observation>) -> Self {
        let summary = Summary::from(&sample);
        Self {
            operation,
            sample,
            summary,
            observation,
        }
    }
}

/// Metadata shared by every stage of a run.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub backend: BackendKind,
    pub dataset_size: usize,
    pub repeats: usize,
    pub run_kind: RunKind,
    pub isolated: bool,
    pub started_at: DateTime<Utc>,
}

impl RunInfo {
    /// Describe a run of `config` starting now.
    pub fn start(config: &BenchConfig) -> Self {
        Self {
            backend: config.backend,
            dataset_size: config.dataset_size,
            repeats: config.repeats.max(1),
            run_kind: config.run_kind(),
            isolated: config.mode.is_isolated(),
            started_at: Utc::now(),
        }
    }
}

/// Drives one benchmark run against a connected store.
pub struct Orchestrator<'a> {
    config: BenchConfig,
    store: &'a dyn Store,
    sinks: Vec<Box<dyn ResultSink + 'a>>,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator. Invalid configuration fails here, before any
    /// store access.
    pub fn new(config: BenchConfig, store: &'a dyn Store) -> Result<Self, Error> {
        config.validate()?;
        if store.backend() != config.backend {
            return Err(Error::Config(format!(
                "configured backend {} does not match connected store {}",
                config.backend,
                store.backend()
            )));
        }
        Ok(Self {
            config,
            store,
            sinks: Vec::new(),
        })
    }

    /// Forward every stage report to `sink`.
    pub fn with_sink(mut self, sink: impl ResultSink + 'a) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Execute the run and return one report per measured operation.
    ///
    /// A store failure aborts the run with that error; nothing is retried.
    #[instrument(skip(self), fields(backend = %self.config.backend))]
    pub fn run(&mut self) -> Result<Vec<StageReport>, Error> {
        let info = RunInfo::start(&self.config);
        info!(
            mode = ?self.config.mode,
            run_kind = %info.run_kind,
            dataset_size = info.dataset_size,
            repeats = info.repeats,
            strategy = %self.store.strategy(),
            "starting benchmark run"
        );

        self.store.ensure_schema()?;
        let dataset = generate_dataset(self.config.dataset_size);

        let mut reports = Vec::new();
        match self.config.mode {
            RunMode::Scenario { reset } => {
                if reset {
                    debug!("resetting store before scenario");
                    self.store.reset_state()?;
                }
                for operation in Operation::ALL {
                    let report = self.measure(operation, &dataset, || Ok(()))?;
                    self.emit(&info, &report)?;
                    reports.push(report);
                }
            }
            RunMode::Isolated(operation) => {
                let report = self.measure_isolated(operation, &dataset)?;
                self.emit(&info, &report)?;
                reports.push(report);
            }
        }

        info!(stages = reports.len(), "benchmark run complete");
        Ok(reports)
    }

    fn measure_isolated(&self, operation: Operation, dataset: &[String]) -> Result<StageReport, Error> {
        match operation {
            Operation::Insert => self.measure(operation, dataset, || self.store.reset_state()),
            Operation::Update | Operation::Delete => {
                self.measure(operation, dataset, || self.load_baseline(dataset))
            }
            Operation::FullScan | Operation::Lookup => {
                self.load_baseline(dataset)?;
                self.measure(operation, dataset, || Ok(()))
            }
        }
    }

    fn measure<F>(&self, operation: Operation, dataset: &[String], setup: F) -> Result<StageReport, Error>
    where
        F: FnMut() -> Result<(), Error>,
    {
        let (sample, observation) = time_with_setup(
            setup,
            |()| self.execute(operation, dataset),
            self.config.repeats,
        )?;
        Ok(StageReport::new(operation, sample, observation.flatten()))
    }

    fn load_baseline(&self, dataset: &[String]) -> Result<(), Error> {
        self.store.reset_state()?;
        self.store.insert(dataset)
    }

    fn execute(&self, operation: Operation, dataset: &[String]) -> Result<Option<Observation>, Error> {
        let id = self.config.target_id();
        match operation {
            Operation::Insert => self.store.insert(dataset).map(|()| None),
            Operation::FullScan => self.store.read_all().map(|records| Some(Observation::Scan(records))),
            Operation::Lookup => {
                let record = self.store.read_by_id(id)?;
                Ok(Some(Observation::Lookup { id, record }))
            }
            Operation::Update => self.store.update(id, UPDATED_VALUE).map(|()| None),
            Operation::Delete => self.store.delete(None).map(|()| None),
        }
    }

    fn emit(&mut self, info: &RunInfo, report: &StageReport) -> Result<(), Error> {
        info!(
            operation = %report.operation,
            runs = report.summary.count,
            mean = report.summary.mean,
            median = report.summary.median,
            "stage complete"
        );
        for sink in &mut self.sinks {
            sink.record(info, report)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemorySink;

    fn scenario(backend: BackendKind) -> BenchConfig {
        BenchConfig::new(backend).with_dataset_size(4).with_repeats(2)
    }

    #[test]
    fn test_parse_operation() {
        assert_eq!("full_scan".parse::<Operation>().unwrap(), Operation::FullScan);
        assert_eq!(" Lookup ".parse::<Operation>().unwrap(), Operation::Lookup);
        assert!(matches!("scan".parse::<Operation>(), Err(Error::Config(_))));
    }

    #[test]
    fn test_operation_mutation() {
        assert!(Operation::Insert.is_mutating());
        assert!(Operation::Delete.is_mutating());
        assert!(!Operation::FullScan.is_mutating());
        assert!(!Operation::Lookup.is_mutating());
    }

    #[test]
    fn test_invalid_config_fails_before_run() {
        let store = BackendKind::KeyValue.connect_temporary().unwrap();
        let config = scenario(BackendKind::KeyValue).with_repeats(0);
        assert!(matches!(
            Orchestrator::new(config, store.as_ref()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_backend_mismatch_rejected() {
        let store = BackendKind::KeyValue.connect_temporary().unwrap();
        let config = scenario(BackendKind::Document);
        assert!(Orchestrator::new(config, store.as_ref()).is_err());
    }

    #[test]
    fn test_scenario_reports_every_stage() {
        let store = BackendKind::RelationalAuto.connect_temporary().unwrap();
        let mut sink = MemorySink::new();

        let reports = Orchestrator::new(scenario(BackendKind::RelationalAuto), store.as_ref())
            .unwrap()
            .with_sink(&mut sink)
            .run()
            .unwrap();

        let ops: Vec<_> = reports.iter().map(|r| r.operation).collect();
        assert_eq!(ops, Operation::ALL.to_vec());
        assert!(reports.iter().all(|r| r.sample.len() == 2));
        assert_eq!(sink.reports().len(), 5);

        // Two inserts of four records, then two newest-deletes.
        let ids: Vec<_> = store.read_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(store.read_by_id(1).unwrap().unwrap().value, UPDATED_VALUE);
    }

    #[test]
    fn test_scenario_observations() {
        let store = BackendKind::Document.connect_temporary().unwrap();
        let config = scenario(BackendKind::Document).with_read_id(99);

        let reports = Orchestrator::new(config, store.as_ref())
            .unwrap()
            .run()
            .unwrap();

        match &reports[1].observation {
            Some(Observation::Scan(records)) => assert_eq!(records.len(), 8),
            other => panic!("unexpected observation {:?}", other),
        }
        match &reports[2].observation {
            Some(Observation::Lookup { id, record }) => {
                assert_eq!(*id, 4);
                assert_eq!(record.as_ref().map(|r| r.value.as_str()), Some("Record 4"));
            }
            other => panic!("unexpected observation {:?}", other),
        }
        assert!(reports[0].observation.is_none());
    }

    #[test]
    fn test_isolated_delete_restores_baseline_each_repeat() {
        let store = BackendKind::KeyValue.connect_temporary().unwrap();
        let config = scenario(BackendKind::KeyValue)
            .with_mode(RunMode::Isolated(Operation::Delete))
            .with_repeats(3);

        let reports = Orchestrator::new(config, store.as_ref())
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].sample.len(), 3);
        let ids: Vec<_> = store.read_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_isolated_insert_starts_from_empty() {
        let store = BackendKind::RelationalNoAuto.connect_temporary().unwrap();
        let config = scenario(BackendKind::RelationalNoAuto)
            .with_mode(RunMode::Isolated(Operation::Insert))
            .with_repeats(4);

        Orchestrator::new(config, store.as_ref())
            .unwrap()
            .run()
            .unwrap();

        let ids: Vec<_> = store.read_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
