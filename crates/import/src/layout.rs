use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::grid::{is_blank_row, RawGrid};
use crate::text::re;

re!(
    re_metadata,
    r"(?i)\b(account\s*(no|number|name|type)?|a/c|branch|ifsc|micr|customer\s*id|opening\s+balance|statement\s+(period|from|date|of\s+account))\b"
);
re!(re_label_value, r"^[A-Za-z][A-Za-z0-9 ./()&_-]{0,40}?\s*:\s*\S");

/// Rows with more than this share of single-cell rows are single-column layouts.
const SINGLE_COLUMN_RATIO: f64 = 0.8;
const KEY_VALUE_RATIO: f64 = 0.6;
const MIN_METADATA_ROWS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    Horizontal,
    SingleColumnStatement,
    Vertical,
    SingleColumnConcatenated,
    Unknown,
}

impl LayoutKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutKind::Horizontal => "horizontal-table",
            LayoutKind::SingleColumnStatement => "single-column-statement",
            LayoutKind::Vertical => "vertical-key-value",
            LayoutKind::SingleColumnConcatenated => "single-column-concatenated",
            LayoutKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first few non-blank rows of a grid, reduced to what the detectors need.
#[derive(Debug, Default)]
pub struct GridSample {
    pub total_rows: usize,
    /// Text of every row that has exactly one non-blank cell.
    pub single_column: Vec<String>,
}

impl GridSample {
    pub fn take(grid: &RawGrid, limit: usize) -> Self {
        let mut sample = GridSample::default();
        for row in grid.rows().iter().filter(|r| !is_blank_row(r)).take(limit) {
            sample.total_rows += 1;
            let mut cells = row.iter().filter(|c| !c.trim().is_empty());
            if let (Some(only), None) = (cells.next(), cells.next()) {
                sample.single_column.push(only.clone());
            }
        }
        sample
    }

    pub fn single_ratio(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        self.single_column.len() as f64 / self.total_rows as f64
    }
}

/// One layout heuristic. Each returns a verdict or passes to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detector {
    EmptyGrid,
    Tabular,
    StatementBlock,
    KeyValue,
    Concatenated,
}

const DETECTORS: [Detector; 5] = [
    Detector::EmptyGrid,
    Detector::Tabular,
    Detector::StatementBlock,
    Detector::KeyValue,
    Detector::Concatenated,
];

impl Detector {
    fn detect(self, sample: &GridSample) -> Option<LayoutKind> {
        match self {
            Detector::EmptyGrid => (sample.total_rows == 0).then_some(LayoutKind::Unknown),
            Detector::Tabular => {
                (sample.single_ratio() <= SINGLE_COLUMN_RATIO).then_some(LayoutKind::Horizontal)
            }
            Detector::StatementBlock => {
                let tabbed = sample.single_column.iter().any(|line| line.contains('\t'));
                let metadata = sample
                    .single_column
                    .iter()
                    .filter(|line| re_metadata().is_match(line))
                    .count();
                (tabbed || metadata >= MIN_METADATA_ROWS).then_some(LayoutKind::SingleColumnStatement)
            }
            Detector::KeyValue => {
                let labelled = sample
                    .single_column
                    .iter()
                    .filter(|line| re_label_value().is_match(line.trim()))
                    .count();
                let ratio = labelled as f64 / sample.single_column.len().max(1) as f64;
                (ratio > KEY_VALUE_RATIO).then_some(LayoutKind::Vertical)
            }
            Detector::Concatenated => Some(LayoutKind::SingleColumnConcatenated),
        }
    }
}

/// Runs the detectors in order over the first `sample_rows` non-blank rows.
pub fn classify_layout(grid: &RawGrid, sample_rows: usize) -> LayoutKind {
    let sample = GridSample::take(grid, sample_rows);
    DETECTORS
        .iter()
        .find_map(|detector| {
            let verdict = detector.detect(&sample);
            if let Some(kind) = verdict {
                debug!(?detector, layout = %kind, ratio = sample.single_ratio(), "layout detected");
            }
            verdict
        })
        .unwrap_or(LayoutKind::Unknown)
}
