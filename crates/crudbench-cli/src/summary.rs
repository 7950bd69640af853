//! End-of-run summary table.

use comfy_table::{Cell, Table};

use crudbench_core::{BenchConfig, StageReport};

/// Render every stage of a run as one table, times in milliseconds.
pub fn render(config: &BenchConfig, reports: &[StageReport]) -> String {
    let mut table = Table::new();
    table.set_header(vec![
        "operation",
        "runs",
        "mean (ms)",
        "median (ms)",
        "p25 (ms)",
        "p75 (ms)",
        "iqr (ms)",
        "min (ms)",
        "max (ms)",
    ]);

    for report in reports {
        let s = &report.summary;
        let mut cells = vec![
            Cell::new(report.operation.as_str()),
            Cell::new(s.count),
        ];
        cells.extend(
            [s.mean, s.median, s.p25, s.p75, s.iqr, s.min, s.max]
                .into_iter()
                .map(|seconds| Cell::new(format!("{:.3}", seconds * 1_000.0))),
        );
        table.add_row(cells);
    }

    format!(
        "{} ({}, {} records)\n{}",
        config.backend,
        config.run_kind(),
        config.dataset_size,
        table
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudbench_core::{BackendKind, Orchestrator};

    #[test]
    fn test_render_summary() {
        let store = BackendKind::KeyValue.connect_temporary().unwrap();
        let config = BenchConfig::new(BackendKind::KeyValue)
            .with_dataset_size(3)
            .with_repeats(2);
        let reports = Orchestrator::new(config.clone(), store.as_ref())
            .unwrap()
            .run()
            .unwrap();

        let output = render(&config, &reports);
        assert!(output.starts_with("key-value (cold, 3 records)\n"));
        for operation in ["insert", "full_scan", "lookup", "update", "delete"] {
            assert!(output.contains(operation), "missing {}", operation);
        }
        assert!(output.contains("p75 (ms)"));
    }

    #[test]
    fn test_render_empty() {
        let config = BenchConfig::new(BackendKind::Document);
        let output = render(&config, &[]);
        assert!(output.contains("median (ms)"));
    }
}
