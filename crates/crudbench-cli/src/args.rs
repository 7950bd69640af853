//! Command-line and environment options.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

use crudbench_core::config::{
    DEFAULT_DATASET_SIZE, DEFAULT_DATA_DIR, DEFAULT_READ_ID, DEFAULT_REPEATS, DEFAULT_RESULTS_DIR,
};
use crudbench_core::{BackendKind, BenchConfig, Error, OutputDetail, RunMode};

/// CRUD latency benchmark across relational, document and key-value stores.
///
/// Every option can also be given through the environment variable shown.
#[derive(Parser, Debug)]
#[command(name = "crudbench")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Backend: relational-auto, relational-no-auto, document or key-value
    #[arg(long, env = "DB_TYPE", default_value = "relational-auto")]
    pub db_type: String,

    /// Clear the store before a scenario run (cold) or keep it (warm)
    #[arg(long, env = "RESET_DATA", default_value = "true", action = ArgAction::Set,
          value_parser = BoolishValueParser::new())]
    pub reset_data: bool,

    /// Records in the baseline dataset
    #[arg(long, env = "DATASET_SIZE", default_value_t = DEFAULT_DATASET_SIZE)]
    pub dataset_size: usize,

    /// Timed repeats per operation
    #[arg(long, env = "REPEATS", default_value_t = DEFAULT_REPEATS)]
    pub repeats: usize,

    /// Measure a single operation against a fresh baseline each repeat
    #[arg(long, env = "ISOLATED_MODE", default_value = "false", action = ArgAction::Set,
          value_parser = BoolishValueParser::new())]
    pub isolated_mode: bool,

    /// Operation for isolated mode: insert, full_scan, lookup, update or delete
    #[arg(long, env = "ISOLATED_OP")]
    pub isolated_op: Option<String>,

    /// Identity used by lookup and update, clamped to the dataset
    #[arg(long, env = "READ_ID", default_value_t = DEFAULT_READ_ID,
          allow_negative_numbers = true)]
    pub read_id: i64,

    /// Console detail for scan and lookup results: count, preview or full
    #[arg(long, env = "OUTPUT_DETAIL", default_value = "count")]
    pub output_detail: String,

    /// Directory holding backend databases
    #[arg(long, env = "DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Directory receiving CSV ledgers
    #[arg(long, env = "RESULTS_DIR", default_value = DEFAULT_RESULTS_DIR)]
    pub results_dir: PathBuf,
}

impl Args {
    /// Convert arguments to a validated benchmark configuration.
    pub fn into_config(self) -> Result<BenchConfig, Error> {
        let backend: BackendKind = self.db_type.parse()?;
        let mode = RunMode::from_flags(
            self.isolated_mode,
            self.isolated_op.as_deref().filter(|op| !op.trim().is_empty()),
            self.reset_data,
        )?;
        let output_detail: OutputDetail = self.output_detail.parse()?;

        let config = BenchConfig::new(backend)
            .with_mode(mode)
            .with_dataset_size(self.dataset_size)
            .with_repeats(self.repeats)
            .with_read_id(self.read_id)
            .with_output_detail(output_detail)
            .with_data_dir(self.data_dir)
            .with_results_dir(self.results_dir);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudbench_core::{Operation, RunKind};

    fn parse(args: &[&str]) -> Result<BenchConfig, Error> {
        let mut argv = vec!["crudbench"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap().into_config()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.backend, BackendKind::RelationalAuto);
        assert_eq!(config.mode, RunMode::Scenario { reset: true });
        assert_eq!(config.dataset_size, DEFAULT_DATASET_SIZE);
        assert_eq!(config.repeats, DEFAULT_REPEATS);
        assert_eq!(config.read_id, DEFAULT_READ_ID);
        assert_eq!(config.output_detail, OutputDetail::Count);
        assert_eq!(config.connection.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.results_dir, PathBuf::from(DEFAULT_RESULTS_DIR));
    }

    #[test]
    fn test_out_of_range_read_id_is_clamped() {
        let config = parse(&["--read-id", "-3"]).unwrap();
        assert_eq!(config.read_id, -3);
        assert_eq!(config.target_id(), 1);

        let config = parse(&["--read-id=0", "--dataset-size", "10"]).unwrap();
        assert_eq!(config.target_id(), 1);

        let config = parse(&["--read-id", "9999", "--dataset-size", "10"]).unwrap();
        assert_eq!(config.target_id(), 10);
    }

    #[test]
    fn test_warm_scenario() {
        let config = parse(&["--db-type", "key-value", "--reset-data", "false"]).unwrap();
        assert_eq!(config.backend, BackendKind::KeyValue);
        assert_eq!(config.run_kind(), RunKind::Warm);
    }

    #[test]
    fn test_boolish_values() {
        let config = parse(&["--reset-data", "0"]).unwrap();
        assert_eq!(config.mode, RunMode::Scenario { reset: false });

        let config = parse(&["--isolated-mode", "yes", "--isolated-op", "lookup"]).unwrap();
        assert_eq!(config.mode, RunMode::Isolated(Operation::Lookup));
    }

    #[test]
    fn test_isolated_without_operation() {
        assert!(matches!(
            parse(&["--isolated-mode", "true"]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse(&["--isolated-mode", "true", "--isolated-op", ""]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_unknown_values_rejected() {
        assert!(matches!(parse(&["--db-type", "graph"]), Err(Error::Config(_))));
        assert!(matches!(
            parse(&["--output-detail", "verbose"]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse(&["--dataset-size", "1"]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_non_numeric_rejected_by_parser() {
        assert!(Args::try_parse_from(["crudbench", "--repeats", "many"]).is_err());
    }

    #[test]
    fn test_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = parse(&[
            "--data-dir",
            dir.path().to_str().unwrap(),
            "--results-dir",
            "out",
        ])
        .unwrap();
        assert_eq!(config.connection.data_dir, dir.path());
        assert_eq!(config.results_dir, PathBuf::from("out"));
    }
}
