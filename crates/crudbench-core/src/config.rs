//! Benchmark configuration.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::error::Error;
use crate::orchestrator::Operation;
use crate::record::RecordId;
use crate::registry::BackendKind;

/// Default number of records in the baseline dataset.
pub const DEFAULT_DATASET_SIZE: usize = 100;

/// Smallest dataset that gives lookup and delete distinct targets.
pub const MIN_DATASET_SIZE: usize = 2;

/// Default number of timed repeats per operation.
pub const DEFAULT_REPEATS: usize = 5;

/// Default identity for lookup and update.
pub const DEFAULT_READ_ID: i64 = 1;

/// Default directory holding backend databases.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Default directory holding CSV ledgers.
pub const DEFAULT_RESULTS_DIR: &str = "./results";

/// Where backends keep their data.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Directory holding one database per backend.
    pub data_dir: PathBuf,
}

impl ConnectionConfig {
    /// Create a connection configuration rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

/// Whether a run starts from a cleared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// All records and counters cleared before measuring.
    Cold,
    /// Measured against whatever earlier runs left behind.
    Warm,
}

impl std::fmt::Display for RunKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunKind::Cold => write!(f, "cold"),
            RunKind::Warm => write!(f, "warm"),
        }
    }
}

/// How operations are scheduled during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// insert, full_scan, lookup, update, delete over one evolving dataset.
    Scenario {
        /// Clear the store before the first stage.
        reset: bool,
    },
    /// One operation, each repeat against an identical baseline.
    Isolated(Operation),
}

impl RunMode {
    /// Build a mode from the raw `ISOLATED_MODE`, `ISOLATED_OP` and
    /// `RESET_DATA` settings.
    pub fn from_flags(isolated: bool, operation: Option<&str>, reset: bool) -> Result<Self, Error> {
        match (isolated, operation) {
            (true, Some(op)) => Ok(RunMode::Isolated(op.parse()?)),
            (true, None) => Err(Error::Config(
                "isolated mode requires an operation".to_string(),
            )),
            (false, Some(op)) => {
                warn!(operation = op, "ignoring isolated operation outside isolated mode");
                Ok(RunMode::Scenario { reset })
            }
            (false, None) => Ok(RunMode::Scenario { reset }),
        }
    }

    /// Cold or warm, as recorded in reports.
    ///
    /// Isolated runs reset before every measurement and are always cold.
    pub fn run_kind(&self) -> RunKind {
        match self {
            RunMode::Scenario { reset: false } => RunKind::Warm,
            RunMode::Scenario { reset: true } | RunMode::Isolated(_) => RunKind::Cold,
        }
    }

    /// Whether this is an isolated run.
    pub fn is_isolated(&self) -> bool {
        matches!(self, RunMode::Isolated(_))
    }
}

/// Console verbosity for scan and lookup results. Has no effect on timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputDetail {
    /// Row counts only.
    #[default]
    Count,
    /// The first few rows.
    Preview,
    /// Every row.
    Full,
}

impl OutputDetail {
    /// Number of rows shown in preview mode.
    pub const PREVIEW_ROWS: usize = 5;
}

impl std::fmt::Display for OutputDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputDetail::Count => write!(f, "count"),
            OutputDetail::Preview => write!(f, "preview"),
            OutputDetail::Full => write!(f, "full"),
        }
    }
}

impl FromStr for OutputDetail {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(OutputDetail::Count),
            "preview" => Ok(OutputDetail::Preview),
            "full" => Ok(OutputDetail::Full),
            other => Err(Error::Config(format!(
                "unknown output detail '{}' (expected count, preview or full)",
                other
            ))),
        }
    }
}

/// Everything a benchmark run needs, passed to the orchestrator up front.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Backend under test.
    pub backend: BackendKind,

    /// Scenario or isolated scheduling.
    pub mode: RunMode,

    /// Records in the baseline dataset.
    pub dataset_size: usize,

    /// Timed repeats per operation.
    pub repeats: usize,

    /// Requested lookup/update identity, clamped before use. May be out of
    /// range, including zero or negative.
    pub read_id: i64,

    /// Console verbosity.
    pub output_detail: OutputDetail,

    /// Directory receiving CSV ledgers.
    pub results_dir: PathBuf,

    /// Backend data location.
    pub connection: ConnectionConfig,
}

impl BenchConfig {
    /// Create a cold scenario configuration with defaults for `backend`.
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            mode: RunMode::Scenario { reset: true },
            dataset_size: DEFAULT_DATASET_SIZE,
            repeats: DEFAULT_REPEATS,
            read_id: DEFAULT_READ_ID,
            output_detail: OutputDetail::default(),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            connection: ConnectionConfig::default(),
        }
    }

    /// Set the run mode.
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the dataset size.
    pub fn with_dataset_size(mut self, size: usize) -> Self {
        self.dataset_size = size;
        self
    }

    /// Set the repeat count.
    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    /// Set the lookup/update identity.
    pub fn with_read_id(mut self, id: i64) -> Self {
        self.read_id = id;
        self
    }

    /// Set the console verbosity.
    pub fn with_output_detail(mut self, detail: OutputDetail) -> Self {
        self.output_detail = detail;
        self
    }

    /// Set the ledger directory.
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Set the backend data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.connection = ConnectionConfig::new(dir);
        self
    }

    /// Reject option values the engine cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.dataset_size < MIN_DATASET_SIZE {
            return Err(Error::Config(format!(
                "dataset size must be at least {}, got {}",
                MIN_DATASET_SIZE, self.dataset_size
            )));
        }
        if self.repeats < 1 {
            return Err(Error::Config("repeats must be at least 1".to_string()));
        }
        Ok(())
    }

    /// The lookup/update identity, clamped to `[1, dataset_size]`.
    pub fn target_id(&self) -> RecordId {
        let upper = i64::try_from(self.dataset_size).unwrap_or(i64::MAX).max(1);
        self.read_id.clamp(1, upper) as RecordId
    }

    /// Cold or warm.
    pub fn run_kind(&self) -> RunKind {
        self.mode.run_kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::new(BackendKind::Document);
        assert_eq!(config.mode, RunMode::Scenario { reset: true });
        assert_eq!(config.dataset_size, DEFAULT_DATASET_SIZE);
        assert_eq!(config.repeats, DEFAULT_REPEATS);
        assert_eq!(config.output_detail, OutputDetail::Count);
        assert_eq!(config.connection.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_small_dataset() {
        let config = BenchConfig::new(BackendKind::KeyValue).with_dataset_size(1);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_repeats() {
        let config = BenchConfig::new(BackendKind::KeyValue).with_repeats(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_target_id_is_clamped() {
        let config = BenchConfig::new(BackendKind::RelationalAuto).with_dataset_size(10);
        assert_eq!(config.clone().with_read_id(0).target_id(), 1);
        assert_eq!(config.clone().with_read_id(7).target_id(), 7);
        assert_eq!(config.clone().with_read_id(500).target_id(), 10);
        assert_eq!(config.with_read_id(-3).target_id(), 1);
    }

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(
            RunMode::from_flags(false, None, false).unwrap(),
            RunMode::Scenario { reset: false }
        );
        assert_eq!(
            RunMode::from_flags(true, Some("update"), false).unwrap(),
            RunMode::Isolated(Operation::Update)
        );
        assert_eq!(
            RunMode::from_flags(false, Some("update"), true).unwrap(),
            RunMode::Scenario { reset: true }
        );
        assert!(matches!(
            RunMode::from_flags(true, None, true),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RunMode::from_flags(true, Some("truncate"), true),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_run_kind() {
        assert_eq!(RunMode::Scenario { reset: true }.run_kind(), RunKind::Cold);
        assert_eq!(RunMode::Scenario { reset: false }.run_kind(), RunKind::Warm);
        assert_eq!(
            RunMode::Isolated(Operation::Lookup).run_kind(),
            RunKind::Cold
        );
    }

    #[test]
    fn test_parse_output_detail() {
        assert_eq!("PREVIEW".parse::<OutputDetail>().unwrap(), OutputDetail::Preview);
        assert_eq!("full".parse::<OutputDetail>().unwrap(), OutputDetail::Full);
        assert!("verbose".parse::<OutputDetail>().is_err());
    }
}
