//! Statistics engine: reduces a duration sample to summary statistics.
//!
//! All values are in seconds.

use crate::timing::DurationSample;

/// Immutable summary of one duration sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
    /// `p75 - p25`.
    pub iqr: f64,
}

impl Summary {
    /// Summarize raw measurements in seconds.
    ///
    /// An empty input yields all zeros.
    pub fn from_seconds(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let p25 = percentile(&sorted, 25.0);
        let p75 = percentile(&sorted, 75.0);

        Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            median: median(&sorted),
            p25,
            p75,
            iqr: p75 - p25,
        }
    }
}

impl From<&DurationSample> for Summary {
    fn from(sample: &DurationSample) -> Self {
        Self::from_seconds(&sample.seconds())
    }
}

/// Middle value of sorted data, or the mean of the two middle values.
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Linear-interpolation percentile of sorted data, `p` in `[0, 100]`.
///
/// The rank is `(n - 1) * p / 100`; the result interpolates between the two
/// sorted values around it.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let rank = (sorted.len() - 1) as f64 * p.clamp(0.0, 100.0) / 100.0;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_quartiles_interpolate() {
        let summary = Summary::from_seconds(&[0.1, 0.2, 0.3, 0.4]);

        assert_eq!(summary.count, 4);
        assert_close(summary.min, 0.1);
        assert_close(summary.max, 0.4);
        assert_close(summary.mean, 0.25);
        assert_close(summary.median, 0.25);
        assert_close(summary.p25, 0.175);
        assert_close(summary.p75, 0.325);
        assert_close(summary.iqr, 0.15);
    }

    #[test]
    fn test_unsorted_input() {
        let summary = Summary::from_seconds(&[0.4, 0.1, 0.3, 0.2, 0.5]);

        assert_close(summary.min, 0.1);
        assert_close(summary.max, 0.5);
        assert_close(summary.median, 0.3);
        assert_close(summary.p25, 0.2);
        assert_close(summary.p75, 0.4);
    }

    #[test]
    fn test_single_value() {
        let summary = Summary::from_seconds(&[0.042]);

        assert_eq!(summary.count, 1);
        assert_close(summary.min, 0.042);
        assert_close(summary.median, 0.042);
        assert_close(summary.p25, 0.042);
        assert_close(summary.iqr, 0.0);
    }

    #[test]
    fn test_empty_is_all_zero() {
        assert_eq!(Summary::from_seconds(&[]), Summary::default());
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_percentile_bounds() {
        let sorted = [1.0, 2.0, 3.0];
        assert_close(percentile(&sorted, 0.0), 1.0);
        assert_close(percentile(&sorted, 100.0), 3.0);
        assert_close(percentile(&sorted, 50.0), 2.0);
    }

    #[test]
    fn test_from_sample() {
        let sample: DurationSample = [0.25, 0.75].into_iter().collect();
        let summary = Summary::from(&sample);
        assert_eq!(summary.count, 2);
        assert_close(summary.mean, 0.5);
    }
}
