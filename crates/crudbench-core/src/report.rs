//! Result sinks: where stage reports go once measured.

use std::io::{self, Write};

use crate::config::OutputDetail;
use crate::error::Error;
use crate::orchestrator::{Observation, RunInfo, StageReport};
use crate::record::Record;

/// Receives every stage report of a run, in execution order.
pub trait ResultSink {
    /// Handle one measured stage. An error aborts the run.
    fn record(&mut self, run: &RunInfo, report: &StageReport) -> Result<(), Error>;
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn record(&mut self, run: &RunInfo, report: &StageReport) -> Result<(), Error> {
        (**self).record(run, report)
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn record(&mut self, run: &RunInfo, report: &StageReport) -> Result<(), Error> {
        (**self).record(run, report)
    }
}

/// Human-readable block per stage.
///
/// ```text
/// document LOOKUP (cold)
///   runs=5  records=100
///   mean=0.001s  median=0.001s
///   min=0.000s  max=0.002s
/// ```
///
/// Full scan and lookup results follow, rendered per [`OutputDetail`].
pub struct ConsoleReporter<W: Write> {
    out: W,
    detail: OutputDetail,
}

impl ConsoleReporter<io::Stdout> {
    /// Report to standard output.
    pub fn stdout(detail: OutputDetail) -> Self {
        Self::new(io::stdout(), detail)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, detail: OutputDetail) -> Self {
        Self { out, detail }
    }

    /// Consume the reporter, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_observation(&mut self, observation: &Observation) -> io::Result<()> {
        match observation {
            Observation::Scan(records) => {
                writeln!(self.out, "  rows={}", records.len())?;
                let shown = match self.detail {
                    OutputDetail::Count => 0,
                    OutputDetail::Preview => OutputDetail::PREVIEW_ROWS,
                    OutputDetail::Full => records.len(),
                };
                self.write_rows(&records[..shown.min(records.len())])?;
                if shown < records.len() && self.detail == OutputDetail::Preview {
                    writeln!(self.out, "    ... {} more", records.len() - shown)?;
                }
            }
            Observation::Lookup { id, record } => match (self.detail, record) {
                (OutputDetail::Count, Some(_)) => writeln!(self.out, "  found id={}", id)?,
                (_, Some(record)) => self.write_rows(std::slice::from_ref(record))?,
                (_, None) => writeln!(self.out, "  not found id={}", id)?,
            },
        }
        Ok(())
    }

    fn write_rows(&mut self, records: &[Record]) -> io::Result<()> {
        for record in records {
            writeln!(self.out, "    {}", record)?;
        }
        Ok(())
    }
}

impl<W: Write> ResultSink for ConsoleReporter<W> {
    fn record(&mut self, run: &RunInfo, report: &StageReport) -> Result<(), Error> {
        let s = &report.summary;
        writeln!(
            self.out,
            "{} {} ({})",
            run.backend,
            report.operation.as_str().to_uppercase(),
            run.run_kind
        )?;
        writeln!(self.out, "  runs={}  records={}", s.count, run.dataset_size)?;
        writeln!(self.out, "  mean={:.3}s  median={:.3}s", s.mean, s.median)?;
        writeln!(self.out, "  min={:.3}s  max={:.3}s", s.min, s.max)?;
        if let Some(observation) = &report.observation {
            self.write_observation(observation)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Vec<(RunInfo, StageReport)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn reports(&self) -> &[(RunInfo, StageReport)] {
        &self.reports
    }
}

impl ResultSink for MemorySink {
    fn record(&mut self, run: &RunInfo, report: &StageReport) -> Result<(), Error> {
        self.reports.push((run.clone(), report.clone()));
        Ok(())
    }
}
