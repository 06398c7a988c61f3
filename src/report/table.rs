use crate::error::{Field, ReportError};
use crate::metrics::GroupKey;

use super::delta::MetricRow;

// ─── Layout ──────────────────────────────────────────────────────
//
// Log scrapers parse these lines by column position:
//
//   [<prefix>] - ---------------------------------------- ... (158 dashes)
//   [<prefix>] - | Metrics<pad 75>   Max(ms)  Concurrent ...       Qps |
//   [<prefix>] - | getUser<pad 75>       4.1           0 ...      10.0 |
//   [<prefix>] - ---------------------------------------- ...

const SPLIT: &str = "| ";

const TAG_WIDTH: usize = 75;

/// Numeric columns in print order: header, width, decimals.
const COLUMNS: [(Field, &str, usize, usize); 8] = [
    (Field::Max, "Max(ms)", 10, 1),
    (Field::Concurrent, "Concurrent", 11, 0),
    (Field::Error, "Error", 10, 0),
    (Field::Count, "Count", 10, 0),
    (Field::P90, "P90(ms)", 10, 1),
    (Field::P99, "P99(ms)", 10, 1),
    (Field::P999, "P999(ms)", 10, 1),
    (Field::Qps, "Qps", 8, 1),
];

/// Width of the dash separator: every column plus the two delimiters.
pub const LINE_WIDTH: usize = TAG_WIDTH + 10 + 11 + 10 + 10 + 10 + 10 + 10 + 8 + SPLIT.len() * 2;

/// Output of rendering one group.
#[derive(Debug, Default)]
pub struct RenderedTable {
    pub lines: Vec<String>,
    pub diagnostics: Vec<ReportError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TableRenderer;

impl TableRenderer {
    /// Separator, header, one line per printable row, separator.
    ///
    /// A row with a value too wide for its column is left out and reported
    /// in `diagnostics`.
    pub fn render(&self, group: &GroupKey, prefix: &str, rows: &[MetricRow]) -> RenderedTable {
        let lead = format!("[{prefix}] - ");
        let separator = format!("{lead}{}", "-".repeat(LINE_WIDTH));

        let mut table = RenderedTable {
            lines: Vec::with_capacity(rows.len() + 3),
            diagnostics: Vec::new(),
        };
        table.lines.push(separator.clone());
        table.lines.push(Self::header(&lead));

        for row in rows {
            match Self::row(&lead, group, row) {
                Ok(line) => table.lines.push(line),
                Err(err) => table.diagnostics.push(err),
            }
        }

        table.lines.push(separator);
        table
    }

    fn header(lead: &str) -> String {
        let mut line = format!("{lead}{SPLIT}{:<width$}", "Metrics", width = TAG_WIDTH);
        for (_, label, width, _) in COLUMNS {
            line.push_str(&format!("{label:>width$}"));
        }
        line.push(' ');
        line.push_str(SPLIT);
        line
    }

    fn row(lead: &str, group: &GroupKey, row: &MetricRow) -> Result<String, ReportError> {
        let tag: String = row.tag.chars().take(TAG_WIDTH).collect();
        let mut line = format!("{lead}{SPLIT}{tag:<width$}", width = TAG_WIDTH);

        for (field, _, width, decimals) in COLUMNS {
            let cell = format_fixed(field_value(row, field), decimals);
            if cell.chars().count() > width {
                return Err(ReportError::Format {
                    group: group.clone(),
                    labels: row.labels.clone(),
                    field,
                    value: cell,
                });
            }
            line.push_str(&format!("{cell:>width$}"));
        }

        line.push(' ');
        line.push_str(SPLIT);
        Ok(line)
    }
}

fn field_value(row: &MetricRow, field: Field) -> f64 {
    match field {
        Field::Max => row.max_ms,
        Field::Concurrent => row.concurrent as f64,
        Field::Error => row.error_delta,
        Field::Count => row.sample_delta as f64,
        Field::P90 => row.p90_ms,
        Field::P99 => row.p99_ms,
        Field::P999 => row.p999_ms,
        Field::Qps => row.qps,
    }
}

/// Fixed-point text with ties rounded away from zero.
///
/// A small negative value keeps its sign (`-0.04` is `-0.0`), the same text
/// downstream scrapers already see from counter resets.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round() / scale;
    format!("{rounded:.decimals$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::LabelTuple;

    fn key() -> GroupKey {
        GroupKey::new("svc", "main")
    }

    fn row(tag: &str) -> MetricRow {
        MetricRow {
            tag: tag.to_string(),
            labels: LabelTuple::from(["svc", tag]),
            max_ms: 12.34,
            concurrent: 3,
            error_delta: 2.0,
            sample_delta: 600,
            p90_ms: 4.06,
            p99_ms: 8.0,
            p999_ms: 11.96,
            qps: 10.0,
        }
    }

    #[test]
    fn separator_width() {
        assert_eq!(LINE_WIDTH, 158);
        let table = TableRenderer.render(&key(), "pref-svc-main", &[]);
        assert_eq!(table.lines.len(), 3);
        assert_eq!(table.lines[0], format!("[pref-svc-main] - {}", "-".repeat(158)));
        assert_eq!(table.lines[0], table.lines[2]);
    }

    #[test]
    fn header_is_literal() {
        let table = TableRenderer.render(&key(), "p", &[]);
        let expected = format!(
            "[p] - | {:<75}{:>10}{:>11}{:>10}{:>10}{:>10}{:>10}{:>10}{:>8} | ",
            "Metrics", "Max(ms)", "Concurrent", "Error", "Count", "P90(ms)", "P99(ms)", "P999(ms)", "Qps"
        );
        assert_eq!(table.lines[1], expected);
    }

    #[test]
    fn row_layout() {
        let table = TableRenderer.render(&key(), "p", &[row("getUser")]);
        let expected = format!(
            "[p] - | {:<75}{:>10}{:>11}{:>10}{:>10}{:>10}{:>10}{:>10}{:>8} | ",
            "getUser", "12.3", "3", "2", "600", "4.1", "8.0", "12.0", "10.0"
        );
        assert_eq!(table.lines[2], expected);
    }

    #[test]
    fn every_line_has_the_same_width() {
        let long_tag = "x".repeat(200);
        let rows = [row("a"), row(&long_tag), row("getUser")];
        let table = TableRenderer.render(&key(), "p", &rows);
        assert!(table.diagnostics.is_empty());

        let header_len = table.lines[1].chars().count();
        for line in &table.lines[1..table.lines.len() - 1] {
            assert_eq!(line.chars().count(), header_len, "{line}");
        }
        assert!(table.lines[3].contains(&"x".repeat(75)));
        assert!(!table.lines[3].contains(&"x".repeat(76)));
    }

    #[test]
    fn rendering_is_deterministic() {
        let rows = [row("a"), row("b")];
        let first = TableRenderer.render(&key(), "p", &rows).lines;
        let second = TableRenderer.render(&key(), "p", &rows).lines;
        assert_eq!(first, second);
    }

    #[test]
    fn oversized_value_skips_the_row() {
        let mut wide = row("wide");
        wide.qps = 123_456_789.0;
        let rows = [row("a"), wide, row("b")];

        let table = TableRenderer.render(&key(), "p", &rows);
        assert_eq!(table.lines.len(), 5);
        assert_eq!(table.diagnostics.len(), 1);
        match &table.diagnostics[0] {
            ReportError::Format { field, value, .. } => {
                assert_eq!(*field, Field::Qps);
                assert_eq!(value, "123456789.0");
            }
            other => panic!("unexpected diagnostic {other:?}"),
        }
    }

    #[test]
    fn fixed_formatting_rounds_half_away_from_zero() {
        assert_eq!(format_fixed(2.0, 1), "2.0");
        assert_eq!(format_fixed(0.25, 1), "0.3");
        assert_eq!(format_fixed(2.5, 0), "3");
        assert_eq!(format_fixed(-2.5, 0), "-3");
        assert_eq!(format_fixed(0.01, 1), "0.0");
        assert_eq!(format_fixed(1.0 / 60.0, 1), "0.0");
        assert_eq!(format_fixed(100.0 / 60.0, 1), "1.7");
    }

    #[test]
    fn small_negative_values_keep_their_sign() {
        assert_eq!(format_fixed(-0.04, 1), "-0.0");
        assert_eq!(format_fixed(-0.4, 0), "-0");
        assert_eq!(format_fixed(0.0, 1), "0.0");

        let mut reset = row("reset");
        reset.qps = -0.04;
        let table = TableRenderer.render(&key(), "p", &[reset]);
        assert!(table.lines[2].ends_with(&format!("{:>8} | ", "-0.0")));
    }
}
