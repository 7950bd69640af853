//! Timing engine: repeated sequential execution with per-call wall-clock
//! measurement.

use std::time::{Duration, Instant};

use crate::error::Error;

/// Elapsed times of repeated executions, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationSample {
    durations: Vec<Duration>,
}

impl DurationSample {
    /// Create an empty sample.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one measurement.
    pub fn push(&mut self, elapsed: Duration) {
        self.durations.push(elapsed);
    }

    /// Number of measurements.
    pub fn len(&self) -> usize {
        self.durations.len()
    }

    /// Whether no measurement has been recorded.
    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Raw measurements.
    pub fn durations(&self) -> &[Duration] {
        &self.durations
    }

    /// Measurements in seconds.
    pub fn seconds(&self) -> Vec<f64> {
        self.durations.iter().map(Duration::as_secs_f64).collect()
    }
}

impl From<Vec<Duration>> for DurationSample {
    fn from(durations: Vec<Duration>) -> Self {
        Self { durations }
    }
}

impl FromIterator<f64> for DurationSample {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        iter.into_iter().map(Duration::from_secs_f64).collect::<Vec<_>>().into()
    }
}

/// Run `op` `max(1, repeats)` times and time each call.
///
/// The first failing call aborts the loop and its error is returned; no
/// partial sample escapes.
pub fn time_operation<T, F>(mut op: F, repeats: usize) -> Result<DurationSample, Error>
where
    F: FnMut() -> Result<T, Error>,
{
    time_with_setup(|| Ok(()), |_| op(), repeats).map(|(sample, _)| sample)
}

/// Like [`time_operation`], but runs an untimed `setup` before every call and
/// hands its output to `op`.
///
/// Returns the sample together with the last call's output.
pub fn time_with_setup<S, T, Setup, Op>(
    mut setup: Setup,
    mut op: Op,
    repeats: usize,
) -> Result<(DurationSample, Option<T>), Error>
where
    Setup: FnMut() -> Result<S, Error>,
    Op: FnMut(S) -> Result<T, Error>,
{
    let runs = repeats.max(1);
    let mut sample = DurationSample {
        durations: Vec::with_capacity(runs),
    };
    let mut last = None;

    for _ in 0..runs {
        let input = setup()?;
        let start = Instant::now();
        let output = op(input)?;
        sample.push(start.elapsed());
        last = Some(output);
    }

    Ok((sample, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_runs_requested_repeats() {
        let calls = Cell::new(0);
        let sample = time_operation(
            || -> Result<(), Error> {
                calls.set(calls.get() + 1);
                Ok(())
            },
            7,
        )
        .unwrap();

        assert_eq!(sample.len(), 7);
        assert_eq!(calls.get(), 7);
    }

    #[test]
    fn test_zero_repeats_runs_once() {
        let sample = time_operation(|| -> Result<(), Error> { Ok(()) }, 0).unwrap();
        assert_eq!(sample.len(), 1);
    }

    #[test]
    fn test_failure_aborts_remaining_repeats() {
        let calls = Cell::new(0);
        let result = time_operation(
            || {
                calls.set(calls.get() + 1);
                if calls.get() == 3 {
                    Err(Error::Write("collision".to_string()))
                } else {
                    Ok(())
                }
            },
            10,
        );

        assert!(matches!(result, Err(Error::Write(_))));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_setup_runs_before_every_call() {
        let order = std::cell::RefCell::new(Vec::new());
        let (sample, last) = time_with_setup(
            || {
                order.borrow_mut().push("setup");
                Ok(order.borrow().len())
            },
            |n| {
                order.borrow_mut().push("op");
                Ok(n)
            },
            2,
        )
        .unwrap();

        assert_eq!(sample.len(), 2);
        assert_eq!(last, Some(3));
        assert_eq!(*order.borrow(), vec!["setup", "op", "setup", "op"]);
    }

    #[test]
    fn test_sample_seconds() {
        let sample: DurationSample = [0.5, 1.25].into_iter().collect();
        assert_eq!(sample.seconds(), vec![0.5, 1.25]);
    }
}
