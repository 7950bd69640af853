//! Append-only CSV ledger of stage summaries.
//!
//! One file per day, backend, run kind and dataset size. The header is
//! written only by the run that creates the file; later runs append rows.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::error::Error;
use crate::orchestrator::{RunInfo, StageReport};
use crate::report::ResultSink;

/// Column names, times in seconds.
pub const HEADER: [&str; 10] = [
    "timestamp",
    "db",
    "operation",
    "records",
    "run_type",
    "runs",
    "mean_time",
    "median_time",
    "min_time",
    "max_time",
];

/// Ledger file name for a run, e.g. `2024-03-09_document_cold_100_isolated.csv`.
pub fn ledger_file_name(run: &RunInfo) -> String {
    format!(
        "{}_{}_{}_{}{}.csv",
        run.started_at.format("%Y-%m-%d"),
        run.backend,
        run.run_kind,
        run.dataset_size,
        if run.isolated { "_isolated" } else { "" }
    )
}

/// Writes one row per stage report into the ledger under a results directory.
pub struct CsvLedger {
    results_dir: PathBuf,
}

impl CsvLedger {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    /// Full ledger path for a run.
    pub fn ledger_path(&self, run: &RunInfo) -> PathBuf {
        self.results_dir.join(ledger_file_name(run))
    }

    /// Append a row, writing the header first if this call creates the file.
    pub fn append(&self, run: &RunInfo, report: &StageReport) -> Result<PathBuf, Error> {
        fs::create_dir_all(&self.results_dir)?;
        let path = self.ledger_path(run);
        let mut file = open_ledger(&path)?;

        let s = &report.summary;
        let row = [
            Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            run.backend.to_string(),
            report.operation.to_string(),
            run.dataset_size.to_string(),
            run.run_kind.to_string(),
            s.count.to_string(),
            format!("{:.6}", s.mean),
            format!("{:.6}", s.median),
            format!("{:.6}", s.min),
            format!("{:.6}", s.max),
        ];
        write_row(&mut file, &row)?;
        file.flush()?;

        debug!(path = %path.display(), operation = %report.operation, "ledger row appended");
        Ok(path)
    }
}

impl ResultSink for CsvLedger {
    fn record(&mut self, run: &RunInfo, report: &StageReport) -> Result<(), Error> {
        self.append(run, report).map(|_| ())
    }
}

fn open_ledger(path: &Path) -> Result<File, Error> {
    match OpenOptions::new().append(true).create_new(true).open(path) {
        Ok(mut file) => {
            start_ledger(path, &mut file)?;
            Ok(file)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Ok(OpenOptions::new().append(true).open(path)?)
        }
        Err(e) => Err(e.into()),
    }
}

/// Write the header into a ledger this run just created.
///
/// A ledger whose header could not be written is removed, so a later run
/// creates it again instead of appending rows to a headerless file.
fn start_ledger(path: &Path, out: &mut impl Write) -> Result<(), Error> {
    if let Err(e) = write_row(out, &HEADER) {
        if let Err(remove_err) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %remove_err, "failed to remove headerless ledger");
        }
        return Err(e.into());
    }
    Ok(())
}

fn write_row<S: AsRef<str>>(out: &mut impl Write, fields: &[S]) -> io::Result<()> {
    let line = fields
        .iter()
        .map(|field| escape_csv(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    write!(out, "{}\r\n", line)
}

/// Quote a field if it contains a delimiter, quote or line break.
fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Operation;
    use crate::report::tests::{run_info, stage};

    #[test]
    fn test_ledger_file_name() {
        let mut run = run_info();
        assert_eq!(ledger_file_name(&run), "2024-03-09_document_cold_100.csv");

        run.isolated = true;
        assert_eq!(
            ledger_file_name(&run),
            "2024-03-09_document_cold_100_isolated.csv"
        );
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("results"));
        let run = run_info();

        let path = ledger.append(&run, &stage(Operation::Insert, None)).unwrap();
        ledger.append(&run, &stage(Operation::Delete, None)).unwrap();

        let contents = fs::read_to_string(path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER.join(","));
        assert!(lines[1].contains(",document,insert,100,cold,4,0.250000,0.250000,0.100000,0.400000"));
        assert!(lines[2].contains(",delete,"));
        assert!(lines[1].ends_with("0.400000"));
    }

    #[test]
    fn test_existing_ledger_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let run = run_info();

        CsvLedger::new(dir.path())
            .append(&run, &stage(Operation::Lookup, None))
            .unwrap();
        let path = CsvLedger::new(dir.path())
            .append(&run, &stage(Operation::Lookup, None))
            .unwrap();

        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(contents.matches("timestamp,db").count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_timestamp_is_utc() {
        let dir = tempfile::tempdir().unwrap();
        let path = CsvLedger::new(dir.path())
            .append(&run_info(), &stage(Operation::Update, None))
            .unwrap();

        let contents = fs::read_to_string(path).unwrap();
        let row = contents.lines().nth(1).unwrap();
        let timestamp = row.split(',').next().unwrap();
        assert!(timestamp.ends_with("+00:00"));
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_header_removes_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        fs::write(&path, b"").unwrap();

        let result = start_ledger(&path, &mut FullDisk);
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
