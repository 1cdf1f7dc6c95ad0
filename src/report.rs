//! Fixed-column text reports for terminal output.
//!
//! ```text
//!         name  #steps       total         max         ave       stdev   #>ave (    frac)     tot>ave (    frac)
//! ------------  ------  ----------  ----------  ----------  ----------  -------------------  ----------------------
//! ```

use std::fmt::Write as _;

use crate::axis::AxisKey;
use crate::counter::CounterSeries;
use crate::histogram::HistogramSeries;
use crate::stats::Statistics;
use crate::timeseries::IndexedSeries;

/// Anything that can contribute one line to a report table.
pub trait Reportable {
    /// Label in the first column.
    fn report_name(&self) -> &str;
    /// Number of time steps covered.
    fn steps(&self) -> usize;
    /// The statistics snapshot, if computed.
    fn report_stats(&self) -> Option<&Statistics>;
}

impl<K: AxisKey> Reportable for IndexedSeries<K> {
    fn report_name(&self) -> &str {
        self.name()
    }

    fn steps(&self) -> usize {
        self.len()
    }

    fn report_stats(&self) -> Option<&Statistics> {
        self.stats()
    }
}

impl Reportable for CounterSeries {
    fn report_name(&self) -> &str {
        self.name()
    }

    fn steps(&self) -> usize {
        self.len()
    }

    fn report_stats(&self) -> Option<&Statistics> {
        self.stats()
    }
}

impl Reportable for HistogramSeries {
    fn report_name(&self) -> &str {
        self.name()
    }

    fn steps(&self) -> usize {
        self.time_keys().len()
    }

    fn report_stats(&self) -> Option<&Statistics> {
        self.stats()
    }
}

/// Column titles followed by an underline.
pub fn header() -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>12}  {:>6}  {:>10}  {:>10}  {:>10}  {:>10}  {:>6} ({:>10})  {:>10} ({:>10})",
        "name", "#steps", "total", "max", "ave", "stdev", "#>ave", "frac", "tot>ave", "frac"
    );
    let _ = writeln!(
        out,
        "{:>12}  {:>6}  {:>10}  {:>10}  {:>10}  {:>10}  {:>19}  {:>23}",
        "-".repeat(12),
        "-".repeat(6),
        "-".repeat(10),
        "-".repeat(10),
        "-".repeat(10),
        "-".repeat(10),
        "-".repeat(19),
        "-".repeat(23)
    );
    out
}

/// One table line, or `None` when there is nothing worth reporting.
///
/// A missing snapshot or a zero total produces no line.
pub fn line(name: &str, steps: usize, stats: Option<&Statistics>) -> Option<String> {
    let stats = stats?;
    if stats.total == 0.0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let above_frac = if steps == 0 {
        0.0
    } else {
        stats.above as f64 / steps as f64
    };
    Some(format!(
        "{:>12}  {:>6}  {:>10.3e}  {:>10.3e}  {:>10.3e}  {:>10.3e}  {:>6} ({:>10.3e})  {:>10.3e} ({:>10.3e})",
        name,
        steps,
        stats.total,
        stats.max,
        stats.mean,
        stats.stdev,
        stats.above,
        above_frac,
        stats.total_above,
        stats.total_above_frac
    ))
}

/// Report line for a single series.
pub fn report<R: Reportable + ?Sized>(series: &R) -> Option<String> {
    line(series.report_name(), series.steps(), series.report_stats())
}

/// Header plus one line per reportable series. Silent series are skipped.
pub fn table(rows: &[&dyn Reportable]) -> String {
    let mut out = header();
    for row in rows {
        if let Some(text) = report(*row) {
            out.push_str(&text);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::TimeAxis;
    use crate::timeseries::TimeSeries;

    fn finished(name: &str, values: &[f64]) -> TimeSeries {
        let keys: Vec<i64> = (0..values.len() as i64).collect();
        let mut series = TimeSeries::new(name, "MiB/sec");
        series.bind_axis(TimeAxis::from_keys(keys.clone()).unwrap()).unwrap();
        for (key, value) in keys.into_iter().zip(values) {
            series.register(key, *value).unwrap();
        }
        series.compute_stats().unwrap();
        series
    }

    #[test]
    fn test_header_has_two_lines() {
        let header = header();
        assert_eq!(header.lines().count(), 2);
        assert!(header.contains("#steps"));
        assert!(header.contains("tot>ave"));
    }

    #[test]
    fn test_line_columns() {
        let series = finished("read", &[1.0, 2.0, 3.0, 6.0]);
        let text = report(&series).unwrap();
        assert!(text.trim_start().starts_with("read"));
        assert!(text.contains("1.200e1"));
        assert!(text.contains("6.000e0"));
        assert_eq!(text.split_whitespace().nth(1), Some("4"));
    }

    #[test]
    fn test_line_skipped_without_stats_or_total() {
        assert_eq!(line("x", 3, None), None);
        let zeros = finished("idle", &[0.0, 0.0]);
        assert_eq!(report(&zeros), None);
    }

    #[test]
    fn test_table_skips_silent_rows() {
        let busy = finished("write", &[5.0, 5.0]);
        let idle = finished("idle", &[0.0]);
        let text = table(&[&busy, &idle]);
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("write"));
        assert!(!text.contains("idle"));
    }
}
