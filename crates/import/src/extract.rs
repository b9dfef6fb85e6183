use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::fields::{Field, FieldMap, HeaderMatch};
use crate::grid::RawGrid;
use crate::text::{collapse_whitespace, parse_amount, parse_date, parse_date_cell, re};

re!(re_label_line, r"^\s*([^:]{1,60}?)\s*:\s*(.*?)\s*$");
re!(
    re_date_token,
    r"(?i)\b(\d{1,2}[/.-]\d{1,2}[/.-]\d{2,4}|\d{4}[/.-]\d{1,2}[/.-]\d{1,2}|\d{1,2}[ -](?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*[-, ]+\d{4})\b"
);
re!(
    re_balance_suffix,
    r"(?i)\b(?:avl\.?\s*bal|available\s+balance|balance|bal)\s*[:.=-]?\s*(?:inr|rs\.?|\x{20b9})?\s*(\d[\d,]*\.\d{2})\s*(?:cr|dr)?\s*$"
);
re!(re_money_token, r"(\d[\d,]*\.\d{2})(?:\D|$)");

const TOTAL_MARKERS: &[&str] = &["subtotal", "total", "summary", "opening balance"];
const MIN_DATE_TOKEN_LEN: usize = 10;

/// Direction of money flow as read from the statement, before typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Received,
    Paid,
}

impl Flow {
    /// Reads an explicit type / Dr-Cr cell. Unrecognized values are `None`.
    pub fn from_type_cell(raw: &str) -> Option<Flow> {
        match raw.trim().trim_end_matches('.').to_lowercase().as_str() {
            "cr" | "c" | "credit" | "deposit" | "received" | "+" => Some(Flow::Received),
            "dr" | "d" | "debit" | "withdrawal" | "paid" | "-" => Some(Flow::Paid),
            _ => None,
        }
    }
}

/// One statement line as read off the page, before direction is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransactionRow {
    pub date: NaiveDate,
    pub description: String,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub balance: Option<Decimal>,
    pub flow: Option<Flow>,
    pub reference: Option<String>,
}

/// Total, subtotal and summary lines are not transactions.
pub fn is_total_row(date_cell: &str, description_cell: &str) -> bool {
    let date_cell = date_cell.to_lowercase();
    let description_cell = description_cell.to_lowercase();
    TOTAL_MARKERS
        .iter()
        .any(|m| date_cell.contains(m) || description_cell.contains(m))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RowExtractor {
    /// Spreadsheet date columns may hold bare Excel serials.
    pub allow_serial_dates: bool,
}

impl RowExtractor {
    pub fn new(allow_serial_dates: bool) -> Self {
        Self { allow_serial_dates }
    }

    /// Rows below a column header.
    pub fn horizontal(&self, grid: &RawGrid, header: &HeaderMatch) -> Vec<RawTransactionRow> {
        (header.row_index + 1..grid.len())
            .filter(|&i| !grid.is_blank(i))
            .filter_map(|i| {
                let row = &grid.rows()[i];
                self.build_row(&header.map, |col| row.get(col).map(String::as_str))
            })
            .collect()
    }

    /// Tab-packed lines below a token header.
    pub fn statement_lines(&self, grid: &RawGrid, header: &HeaderMatch) -> Vec<RawTransactionRow> {
        (header.row_index + 1..grid.len())
            .filter(|&i| !grid.is_blank(i))
            .filter_map(|i| {
                let tokens = grid.row_tokens(i);
                self.build_row(&header.map, |col| tokens.get(col).map(String::as_str))
            })
            .collect()
    }

    /// `label: value` blocks separated by blank lines.
    pub fn vertical(&self, grid: &RawGrid) -> Vec<RawTransactionRow> {
        let mut rows = Vec::new();
        let mut block: Vec<(String, String)> = Vec::new();
        for i in 0..=grid.len() {
            if i < grid.len() && !grid.is_blank(i) {
                if let Some(caps) = re_label_line().captures(&grid.row_text(i)) {
                    block.push((caps[1].to_string(), caps[2].to_string()));
                }
                continue;
            }
            if !block.is_empty() {
                rows.extend(self.block_row(&block));
                block.clear();
            }
        }
        rows
    }

    fn block_row(&self, block: &[(String, String)]) -> Option<RawTransactionRow> {
        let map = FieldMap::from_labels(block.iter().map(|(label, _)| label.as_str()));
        self.build_row(&map, |i| block.get(i).map(|(_, value)| value.as_str()))
    }

    /// Last resort: one free-text line per transaction.
    pub fn concatenated(&self, grid: &RawGrid) -> Vec<RawTransactionRow> {
        (0..grid.len())
            .filter(|&i| !grid.is_blank(i))
            .filter_map(|i| parse_concatenated_line(&grid.row_text(i)))
            .collect()
    }

    fn build_row<'a>(
        &self,
        map: &FieldMap,
        cell: impl Fn(usize) -> Option<&'a str>,
    ) -> Option<RawTransactionRow> {
        let text = |field: Field| map.get(field).and_then(&cell).unwrap_or("").trim();

        let date_cell = text(Field::Date);
        let description = collapse_whitespace(text(Field::Description));
        if is_total_row(date_cell, &description) {
            return None;
        }
        let date = parse_date_cell(date_cell, self.allow_serial_dates)?;

        // A mapped money column with a blank cell reads as zero.
        let money = |field: Field| {
            map.contains(field)
                .then(|| parse_amount(text(field)).unwrap_or(Decimal::ZERO))
        };
        let reference = Some(text(Field::Reference)).filter(|r| !r.is_empty()).map(str::to_string);

        Some(RawTransactionRow {
            date,
            description,
            debit: money(Field::Debit),
            credit: money(Field::Credit),
            amount: map.contains(Field::Amount).then(|| parse_amount(text(Field::Amount))).flatten(),
            balance: parse_amount(text(Field::Balance)),
            flow: Flow::from_type_cell(text(Field::Type)),
            reference,
        })
    }
}

/// Reads a line such as `01/02/2026 NEFT ACME PAYROLL 50,000.00 Balance: 1,50,000.00`.
///
/// The largest money token is taken as the amount; a trailing balance is
/// split off first.
pub fn parse_concatenated_line(line: &str) -> Option<RawTransactionRow> {
    let line = collapse_whitespace(&line.replace('\t', " "));
    let date_match = re_date_token()
        .find_iter(&line)
        .find(|m| m.as_str().len() >= MIN_DATE_TOKEN_LEN)?;
    let date = parse_date(date_match.as_str())?;
    if is_total_row("", &line) {
        return None;
    }

    let mut rest = format!("{} {}", &line[..date_match.start()], &line[date_match.end()..]);
    let suffix = re_balance_suffix()
        .captures(&rest)
        .and_then(|caps| Some((caps.get(0)?.start(), parse_amount(&caps[1]))));
    let balance = match suffix {
        Some((start, balance)) => {
            rest.truncate(start);
            balance
        }
        None => None,
    };

    let amount = re_money_token()
        .captures_iter(&rest)
        .filter_map(|c| parse_amount(&c[1]))
        .max()?;
    // The token pattern swallows one trailing character; put it back.
    let description = re_money_token()
        .replace_all(&rest, |caps: &regex::Captures| format!(" {}", &caps[0][caps[1].len()..]));
    let description = collapse_whitespace(&description)
        .trim_matches(|c: char| c == '-' || c == '|' || c == ',' || c.is_whitespace())
        .to_string();

    Some(RawTransactionRow {
        date,
        description,
        debit: None,
        credit: None,
        amount: Some(amount),
        balance,
        flow: None,
        reference: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{find_header_line, find_header_row};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn grid(text: &str) -> RawGrid {
        RawGrid::from_delimited(text.as_bytes(), b',').unwrap()
    }

    #[test]
    fn horizontal_skips_blanks_totals_and_undated_rows() {
        let g = grid(
            "Date,Description,Debit,Credit,Balance\n\
             01/02/2026,Salary Credit,,50000,150000\n\
             \n\
             02/02/2026,ATM Withdrawal,2000,,148000\n\
             ,Total,2000,50000,\n\
             Generated on request,,,,\n",
        );
        let header = find_header_row(&g, 30).unwrap();
        let rows = RowExtractor::default().horizontal(&g, &header);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, d(2026, 2, 1));
        assert_eq!(rows[0].description, "Salary Credit");
        assert_eq!(rows[0].debit, Some(Decimal::ZERO));
        assert_eq!(rows[0].credit, Some(dec("50000")));
        assert_eq!(rows[0].balance, Some(dec("150000")));
        assert_eq!(rows[1].debit, Some(dec("2000")));
        assert_eq!(rows[1].amount, None);
    }

    #[test]
    fn horizontal_reads_type_and_reference_columns() {
        let g = grid(
            "Txn Date,Narration,Ref No,Amount,Dr/Cr\n\
             05/02/2026,UPI/ACME,UTR991,\"1,250.00\",CR\n",
        );
        let header = find_header_row(&g, 30).unwrap();
        let rows = RowExtractor::default().horizontal(&g, &header);
        assert_eq!(rows[0].amount, Some(dec("1250.00")));
        assert_eq!(rows[0].flow, Some(Flow::Received));
        assert_eq!(rows[0].reference.as_deref(), Some("UTR991"));
    }

    #[test]
    fn transaction_type_column_does_not_hide_the_narration() {
        let g = grid("Date,Transaction Type,Narration,Amount
01/02/2026,CR,NEFT ACME PAYROLL,500.00
");
        let header = find_header_row(&g, 30).unwrap();
        let rows = RowExtractor::default().horizontal(&g, &header);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "NEFT ACME PAYROLL");
        assert_eq!(rows[0].flow, Some(Flow::Received));
        assert_eq!(rows[0].amount, Some(dec("500.00")));
    }

    #[test]
    fn opening_balance_row_is_dropped() {
        let g = grid("Date,Description,Amount,Balance\n01/02/2026,Opening Balance,,1000\n02/02/2026,Fee,10,990\n");
        let header = find_header_row(&g, 30).unwrap();
        let rows = RowExtractor::default().horizontal(&g, &header);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "Fee");
    }

    #[test]
    fn spreadsheet_serial_dates_are_accepted() {
        let g = RawGrid::from_rows(
            vec![
                vec!["Date".into(), "Details".into(), "Amount".into()],
                vec!["46054".into(), "Rent".into(), "900".into()],
            ],
            crate::grid::GridOrigin::Spreadsheet,
        );
        let header = find_header_row(&g, 30).unwrap();
        assert_eq!(RowExtractor::new(true).horizontal(&g, &header)[0].date, d(2026, 2, 1));
        assert!(RowExtractor::new(false).horizontal(&g, &header).is_empty());
    }

    #[test]
    fn statement_lines_index_tokens() {
        let g = grid(
            "Account No 0012345\n\
             IFSC HDFC0000123\n\
             Date\tNarration\tWithdrawal\tDeposit\tBalance\n\
             01/02/2026\tSalary\t\t50000.00\t150000.00\n\
             02/02/2026\tATM\t2000.00\t\t148000.00\n",
        );
        let header = find_header_line(&g, 30).unwrap();
        let rows = RowExtractor::default().statement_lines(&g, &header);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].credit, Some(dec("50000.00")));
        assert_eq!(rows[1].debit, Some(dec("2000.00")));
        assert_eq!(rows[1].balance, Some(dec("148000.00")));
    }

    #[test]
    fn vertical_blocks() {
        let g = grid(
            "Date: 01/02/2026\nDescription: Salary\nCredit: 50000\n\n\
             Date: 02/02/2026\nDescription: ATM\nDebit: 2000\nBalance: 148000\n\n\
             Description: no date here\nAmount: 5\n",
        );
        let rows = RowExtractor::default().vertical(&g);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].credit, Some(dec("50000")));
        assert_eq!(rows[0].debit, None);
        assert_eq!(rows[1].debit, Some(dec("2000")));
        assert_eq!(rows[1].balance, Some(dec("148000")));
    }

    #[test]
    fn concatenated_takes_largest_amount_and_splits_balance() {
        let row = parse_concatenated_line("01/02/2026 NEFT ACME PAYROLL 50,000.00 Balance: 1,50,000.00").unwrap();
        assert_eq!(row.date, d(2026, 2, 1));
        assert_eq!(row.amount, Some(dec("50000.00")));
        assert_eq!(row.balance, Some(dec("150000.00")));
        assert_eq!(row.description, "NEFT ACME PAYROLL");

        let row = parse_concatenated_line("03-02-2026 POS 12.50 fee 1.00").unwrap();
        assert_eq!(row.amount, Some(dec("12.50")));
        assert_eq!(row.description, "POS fee");
    }

    #[test]
    fn concatenated_reads_month_name_dates() {
        let row = parse_concatenated_line("01-Feb-2026 NEFT ACME 500.00").unwrap();
        assert_eq!(row.date, d(2026, 2, 1));
        assert_eq!(row.amount, Some(dec("500.00")));
        assert_eq!(row.description, "NEFT ACME");

        let row = parse_concatenated_line("01 Feb 2026 NEFT ACME 500.00").unwrap();
        assert_eq!(row.date, d(2026, 2, 1));
        let row = parse_concatenated_line("01 Feb, 2026 NEFT ACME 500.00").unwrap();
        assert_eq!(row.date, d(2026, 2, 1));
    }

    #[test]
    fn concatenated_requires_a_long_date_and_an_amount() {
        assert!(parse_concatenated_line("1/2/26 Coffee 4.00").is_none());
        assert!(parse_concatenated_line("01/02/2026 no money here").is_none());
        assert!(parse_concatenated_line("Statement summary 01/02/2026 100.00").is_none());
    }

    #[test]
    fn type_cells() {
        assert_eq!(Flow::from_type_cell("Cr."), Some(Flow::Received));
        assert_eq!(Flow::from_type_cell("DEBIT"), Some(Flow::Paid));
        assert_eq!(Flow::from_type_cell("-"), Some(Flow::Paid));
        assert_eq!(Flow::from_type_cell("transfer"), None);
        assert_eq!(Flow::from_type_cell(""), None);
    }

    #[test]
    fn total_rows() {
        assert!(is_total_row("", "Grand TOTAL"));
        assert!(is_total_row("Sub-total", ""));
        assert!(!is_total_row("01/02/2026", "Salary"));
    }
}
