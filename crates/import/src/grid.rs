use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use thiserror::Error;

use crate::text::excel_serial_to_date;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),
    #[error("Workbook has no worksheets")]
    NoWorksheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridOrigin {
    Delimited,
    Spreadsheet,
}

/// Untyped cells of one uploaded file, row by row.
///
/// Blank source lines are kept as empty rows so that block-structured
/// statements can still be split on them.
#[derive(Debug, Clone)]
pub struct RawGrid {
    rows: Vec<Vec<String>>,
    origin: GridOrigin,
}

impl RawGrid {
    pub fn from_rows(rows: Vec<Vec<String>>, origin: GridOrigin) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| clean_cell(&c)).collect())
            .collect();
        Self { rows, origin }
    }

    /// Reads delimited text one physical line at a time.
    pub fn from_delimited(data: &[u8], delimiter: u8) -> Result<Self, GridError> {
        let text = String::from_utf8_lossy(data);
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

        let mut rows = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                rows.push(Vec::new());
                continue;
            }
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .delimiter(delimiter)
                .from_reader(line.as_bytes());
            let row = match reader.records().next() {
                Some(record) => record?.iter().map(clean_cell).collect(),
                None => Vec::new(),
            };
            rows.push(row);
        }
        Ok(Self { rows, origin: GridOrigin::Delimited })
    }

    /// Decodes the first worksheet of an xlsx/xls/xlsm workbook.
    pub fn from_spreadsheet(data: &[u8]) -> Result<Self, GridError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))
            .map_err(|e| GridError::Spreadsheet(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(GridError::NoWorksheet)?
            .map_err(|e| GridError::Spreadsheet(e.to_string()))?;

        let rows = range
            .rows()
            .map(|row| row.iter().map(render_cell).collect())
            .collect();
        Ok(Self { rows, origin: GridOrigin::Spreadsheet })
    }

    pub fn origin(&self) -> GridOrigin {
        self.origin
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no row holds a non-blank cell.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| is_blank_row(r))
    }

    /// 1-indexed row access.
    pub fn row(&self, number: usize) -> Option<&[String]> {
        number.checked_sub(1).and_then(|i| self.rows.get(i)).map(Vec::as_slice)
    }

    pub(crate) fn is_blank(&self, index: usize) -> bool {
        self.rows.get(index).map_or(true, |r| is_blank_row(r))
    }

    /// Non-blank cells of a row joined with single spaces.
    pub(crate) fn row_text(&self, index: usize) -> String {
        self.rows
            .get(index)
            .map(|row| {
                row.iter()
                    .filter(|c| !c.trim().is_empty())
                    .map(|c| c.trim())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }

    /// Tab-separated tokens of a row's non-blank cells. Empty tokens are kept
    /// so that positions line up with a header line.
    pub(crate) fn row_tokens(&self, index: usize) -> Vec<String> {
        self.rows
            .get(index)
            .map(|row| {
                row.iter()
                    .filter(|c| !c.trim().is_empty())
                    .flat_map(|c| c.split('\t'))
                    .map(|t| t.trim().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub(crate) fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// Spreadsheet-style column letter for a 0-based index (`0 -> A`, `26 -> AA`).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

// Tabs are significant in single-column statements, so only spaces go.
fn clean_cell(raw: &str) -> String {
    raw.trim_matches(|c| c == ' ' || c == '\r' || c == '\u{a0}').to_string()
}

fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => clean_cell(s),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimited_keeps_blank_lines_and_strips_bom() {
        let data = "\u{feff}Date,Amount\n\n01/02/2026,100\n".as_bytes();
        let grid = RawGrid::from_delimited(data, b',').unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.row(1).unwrap(), ["Date", "Amount"]);
        assert!(grid.row(2).unwrap().is_empty());
        assert!(grid.is_blank(1));
        assert_eq!(grid.origin(), GridOrigin::Delimited);
    }

    #[test]
    fn delimited_honours_quotes_and_delimiter() {
        let grid = RawGrid::from_delimited(b"\"1,000.00\",ATM\n", b',').unwrap();
        assert_eq!(grid.row(1).unwrap(), ["1,000.00", "ATM"]);

        let tsv = RawGrid::from_delimited(b"Date\tNarration\n", b'\t').unwrap();
        assert_eq!(tsv.row(1).unwrap(), ["Date", "Narration"]);
    }

    #[test]
    fn tabs_survive_inside_a_comma_file() {
        let grid = RawGrid::from_delimited(b"01/02/2026\tSalary\t\t50000\n", b',').unwrap();
        assert_eq!(grid.row_tokens(0), ["01/02/2026", "Salary", "", "50000"]);
        assert_eq!(grid.row_text(0), "01/02/2026\tSalary\t\t50000");
    }

    #[test]
    fn empty_input_is_an_empty_grid() {
        assert!(RawGrid::from_delimited(b"", b',').unwrap().is_empty());
        assert!(RawGrid::from_delimited(b" \n,,\n", b',').unwrap().is_empty());
    }

    #[test]
    fn row_is_one_indexed() {
        let grid = RawGrid::from_rows(vec![vec!["a".into()]], GridOrigin::Spreadsheet);
        assert!(grid.row(0).is_none());
        assert_eq!(grid.row(1).unwrap(), ["a"]);
    }

    #[test]
    fn render_cell_formats() {
        assert_eq!(render_cell(&Data::Float(1500.0)), "1500");
        assert_eq!(render_cell(&Data::Float(1500.25)), "1500.25");
        assert_eq!(render_cell(&Data::Int(7)), "7");
        assert_eq!(render_cell(&Data::Empty), "");
        assert_eq!(render_cell(&Data::String("  ATM ".into())), "ATM");
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
    }

    #[test]
    fn garbage_is_not_a_workbook() {
        assert!(matches!(
            RawGrid::from_spreadsheet(b"not a workbook"),
            Err(GridError::Spreadsheet(_))
        ));
    }
}
