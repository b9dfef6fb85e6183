use std::collections::BTreeMap;

use tracing::debug;

use crate::grid::{column_letter, is_blank_row, RawGrid};
use crate::text::{contains_phrase, normalize_label};

/// Logical statement columns. Declaration order breaks keyword-length ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Date,
    Debit,
    Credit,
    Balance,
    Type,
    Reference,
    Branch,
    Description,
    Amount,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Date,
        Field::Debit,
        Field::Credit,
        Field::Balance,
        Field::Type,
        Field::Reference,
        Field::Branch,
        Field::Description,
        Field::Amount,
    ];

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Field::Date => &[
                "date", "txn date", "value date", "value dt", "posting date", "trans date",
                "transaction date",
            ],
            Field::Debit => &[
                "debit", "withdrawal", "withdrawals", "dr", "paid", "payment", "paid out",
                "withdrawal amt",
            ],
            Field::Credit => &[
                "credit", "deposit", "deposits", "cr", "received", "receipt", "paid in",
                "deposit amt",
            ],
            Field::Balance => &[
                "balance", "closing balance", "running balance", "available balance",
                "ledger balance",
            ],
            Field::Type => &["type", "dr cr", "cr dr", "txn type", "transaction type"],
            Field::Reference => &[
                "ref", "ref no", "reference", "chq", "cheque", "utr", "chq ref no", "txn id",
                "transaction id", "transaction ref", "transaction reference",
            ],
            Field::Branch => &["branch"],
            Field::Description => &[
                "description", "particulars", "narration", "details", "remarks", "narrative",
                "transaction",
            ],
            Field::Amount => &["amount", "value", "net amount", "transaction amount"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::Debit => "debit",
            Field::Credit => "credit",
            Field::Balance => "balance",
            Field::Type => "type",
            Field::Reference => "reference",
            Field::Branch => "branch",
            Field::Description => "description",
            Field::Amount => "amount",
        }
    }
}

/// Header labels longer than this are data, not headers.
const MAX_LABEL_TOKENS: usize = 6;

/// Best field for a header label, or `None` when nothing matches.
pub fn match_label(label: &str) -> Option<Field> {
    let normalized = normalize_label(label);
    let tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();
    if tokens.is_empty() || tokens.len() > MAX_LABEL_TOKENS {
        return None;
    }

    let mut best: Option<(Field, usize, usize)> = None;
    for field in Field::ALL {
        for keyword in field.keywords() {
            let needle: Vec<&str> = keyword.split(' ').collect();
            if !contains_phrase(&tokens, &needle) {
                continue;
            }
            let score = (needle.len(), keyword.len());
            if best.map_or(true, |(_, t, c)| score > (t, c)) {
                best = Some((field, score.0, score.1));
            }
        }
    }
    best.map(|(field, _, _)| field)
}

/// Field to column (or token) index. Absent fields are simply missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    columns: BTreeMap<Field, usize>,
}

impl FieldMap {
    /// Assigns each label to its best field. A field is assigned at most once;
    /// the first label to claim it keeps it.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut columns = BTreeMap::new();
        for (index, label) in labels.into_iter().enumerate() {
            if let Some(field) = match_label(label) {
                columns.entry(field).or_insert(index);
            }
        }
        let mut map = FieldMap { columns };
        if map.has_debit_or_credit() {
            map.columns.remove(&Field::Amount);
        }
        map
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn has_debit_or_credit(&self) -> bool {
        self.contains(Field::Debit) || self.contains(Field::Credit)
    }

    /// Date, description and at least one money column.
    pub fn is_complete(&self) -> bool {
        self.contains(Field::Date)
            && self.contains(Field::Description)
            && (self.has_debit_or_credit() || self.contains(Field::Amount))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, usize)> + '_ {
        self.columns.iter().map(|(f, i)| (*f, *i))
    }
}

/// Where the header was found (0-based grid row) and what it maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    pub row_index: usize,
    pub map: FieldMap,
}

/// Column-based header search over the first `limit` non-blank rows.
pub fn find_header_row(grid: &RawGrid, limit: usize) -> Option<HeaderMatch> {
    find_header(grid, limit, |index| {
        let row = &grid.rows()[index];
        FieldMap::from_labels(row.iter().map(String::as_str))
    })
}

/// Token-based header search: each line is split on tabs.
pub fn find_header_line(grid: &RawGrid, limit: usize) -> Option<HeaderMatch> {
    find_header(grid, limit, |index| {
        let tokens = grid.row_tokens(index);
        FieldMap::from_labels(tokens.iter().map(String::as_str))
    })
}

fn find_header(
    grid: &RawGrid,
    limit: usize,
    map_row: impl Fn(usize) -> FieldMap,
) -> Option<HeaderMatch> {
    let found = grid
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| !is_blank_row(row))
        .take(limit)
        .map(|(index, _)| HeaderMatch { row_index: index, map: map_row(index) })
        .find(|header| header.map.is_complete());

    if let Some(header) = &found {
        let columns: Vec<String> = header
            .map
            .iter()
            .map(|(f, i)| format!("{}={}", f.as_str(), column_letter(i)))
            .collect();
        debug!(row = header.row_index + 1, columns = %columns.join(","), "header row found");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_map_to_fields() {
        assert_eq!(match_label("Txn Date"), Some(Field::Date));
        assert_eq!(match_label("Value Date"), Some(Field::Date));
        assert_eq!(match_label("Narration"), Some(Field::Description));
        assert_eq!(match_label("Withdrawal Amt.(INR)"), Some(Field::Debit));
        assert_eq!(match_label("Deposit Amt."), Some(Field::Credit));
        assert_eq!(match_label("Closing Balance"), Some(Field::Balance));
        assert_eq!(match_label("Chq./Ref.No."), Some(Field::Reference));
        assert_eq!(match_label("Amount (INR)"), Some(Field::Amount));
        assert_eq!(match_label("Branch"), Some(Field::Branch));
    }

    #[test]
    fn longest_keyword_wins() {
        assert_eq!(match_label("Dr/Cr"), Some(Field::Type));
        assert_eq!(match_label("Paid In"), Some(Field::Credit));
        assert_eq!(match_label("Transaction Amount"), Some(Field::Amount));
        assert_eq!(match_label("Transaction ID"), Some(Field::Reference));
        assert_eq!(match_label("Transaction Type"), Some(Field::Type));
        assert_eq!(match_label("Transaction Reference"), Some(Field::Reference));
        assert_eq!(match_label("Transaction"), Some(Field::Description));
    }

    #[test]
    fn transaction_qualifier_leaves_narration_to_its_column() {
        let map = FieldMap::from_labels(["Date", "Transaction Type", "Narration", "Amount"]);
        assert_eq!(map.get(Field::Type), Some(1));
        assert_eq!(map.get(Field::Description), Some(2));
        assert_eq!(map.get(Field::Amount), Some(3));
    }

    #[test]
    fn unrelated_or_long_labels_do_not_match() {
        assert_eq!(match_label("Serial"), None);
        assert_eq!(match_label(""), None);
        assert_eq!(match_label("NEFT transfer from the payroll account of the company date"), None);
    }

    #[test]
    fn first_claim_keeps_the_field() {
        let map = FieldMap::from_labels(["Date", "Value Date", "Narration", "Amount"]);
        assert_eq!(map.get(Field::Date), Some(0));
        assert_eq!(map.get(Field::Description), Some(2));
        assert_eq!(map.get(Field::Amount), Some(3));
        assert!(map.is_complete());
    }

    #[test]
    fn debit_credit_suppress_amount() {
        let map = FieldMap::from_labels(["Date", "Description", "Amount", "Debit", "Credit"]);
        assert!(!map.contains(Field::Amount));
        assert_eq!(map.get(Field::Debit), Some(3));
        assert_eq!(map.get(Field::Credit), Some(4));
    }

    #[test]
    fn incomplete_header_is_rejected() {
        assert!(!FieldMap::from_labels(["Date", "Description", "Balance"]).is_complete());
        assert!(!FieldMap::from_labels(["Date", "Debit"]).is_complete());
    }

    #[test]
    fn header_row_found_below_preamble() {
        let grid = RawGrid::from_delimited(
            b"Statement of account,,\nAccount,1234,\n\nDate,Description,Debit,Credit,Balance\n01/02/2026,Salary,,5,5\n",
            b',',
        )
        .unwrap();
        let header = find_header_row(&grid, 30).unwrap();
        assert_eq!(header.row_index, 3);
        assert_eq!(header.map.get(Field::Balance), Some(4));
    }

    #[test]
    fn header_search_stops_at_limit() {
        let grid = RawGrid::from_delimited(b"a,b\nc,d\nDate,Description,Amount\n", b',').unwrap();
        assert!(find_header_row(&grid, 2).is_none());
        assert!(find_header_row(&grid, 3).is_some());
    }

    #[test]
    fn header_line_splits_on_tabs() {
        let grid = RawGrid::from_delimited(
            b"Account No 1234\nDate\tNarration\tWithdrawal\tDeposit\tBalance\n",
            b',',
        )
        .unwrap();
        let header = find_header_line(&grid, 30).unwrap();
        assert_eq!(header.row_index, 1);
        assert_eq!(header.map.get(Field::Debit), Some(2));
        assert_eq!(header.map.get(Field::Credit), Some(3));
    }
}
