use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::extract::{Flow, RawTransactionRow};
use crate::text::{normalize_label, re};

re!(re_rail_credit, r"(?i)\b(?:upi|imps|neft|rtgs)\b.*/cr\b");
re!(re_rail_debit, r"(?i)\b(?:upi|imps|neft|rtgs)\b.*/dr\b");

const RECEIVED_WORDS: &[&str] = &["deposit", "salary", "refund", "interest", "received", "credited"];
const PAID_WORDS: &[&str] = &["atm", "withdrawal", "purchase", "payment", "debited"];

/// A typed statement line: positive amount plus direction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub flow: Flow,
    pub balance: Option<Decimal>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedStatement {
    pub transactions: Vec<ClassifiedTransaction>,
    pub total_credited: Decimal,
    pub total_debited: Decimal,
}

/// Guesses direction from narration text alone. Defaults to paid.
pub fn guess_flow(description: &str) -> Flow {
    if re_rail_credit().is_match(description) {
        return Flow::Received;
    }
    if re_rail_debit().is_match(description) {
        return Flow::Paid;
    }
    let lower = description.to_lowercase();
    if lower.contains("by transfer") {
        return Flow::Received;
    }
    if lower.contains("to transfer") {
        return Flow::Paid;
    }
    let normalized = normalize_label(description);
    let has_token = |words: &[&str]| normalized.split(' ').any(|t| words.contains(&t));
    if has_token(&["cr", "credit"]) {
        return Flow::Received;
    }
    if has_token(&["dr", "debit"]) {
        return Flow::Paid;
    }
    if RECEIVED_WORDS.iter().any(|w| lower.contains(w)) {
        return Flow::Received;
    }
    if PAID_WORDS.iter().any(|w| lower.contains(w)) {
        return Flow::Paid;
    }
    Flow::Paid
}

/// Resolves one row against the balance carried from earlier rows.
///
/// Returns the typed transaction (if the row holds a positive amount) and the
/// balance to carry into the next row.
pub fn classify_row(
    row: &RawTransactionRow,
    previous_balance: Option<Decimal>,
) -> (Option<ClassifiedTransaction>, Option<Decimal>) {
    let next_balance = row.balance.or(previous_balance);
    let resolved = resolve(row, previous_balance).and_then(|(amount, flow)| {
        let amount = amount.round_dp(2);
        (amount > Decimal::ZERO).then(|| ClassifiedTransaction {
            date: row.date,
            description: row.description.clone(),
            amount,
            flow,
            balance: row.balance,
            reference: row.reference.clone(),
        })
    });
    (resolved, next_balance)
}

fn resolve(row: &RawTransactionRow, previous_balance: Option<Decimal>) -> Option<(Decimal, Flow)> {
    let positive = |value: Decimal, flow: Flow| (value > Decimal::ZERO).then_some((value, flow));

    match (row.debit, row.credit, row.amount) {
        // Debit wins when a row fills both columns.
        (Some(debit), Some(credit), _) => {
            positive(debit, Flow::Paid).or_else(|| positive(credit, Flow::Received))
        }
        (_, _, Some(amount)) => {
            let flow = row.flow.unwrap_or_else(|| {
                let guessed = guess_flow(&row.description);
                let balance_rose = matches!(
                    (row.balance, previous_balance),
                    (Some(now), Some(before)) if now > before
                );
                if guessed == Flow::Paid && balance_rose {
                    Flow::Received
                } else {
                    guessed
                }
            });
            Some((amount.abs(), flow))
        }
        (Some(debit), None, None) => positive(debit, Flow::Paid),
        (None, Some(credit), None) => positive(credit, Flow::Received),
        (None, None, None) => None,
    }
}

/// Folds rows into typed transactions with running totals.
pub fn classify_rows(rows: &[RawTransactionRow]) -> ClassifiedStatement {
    let (transactions, _) = rows.iter().fold(
        (Vec::with_capacity(rows.len()), None),
        |(mut kept, previous_balance), row| {
            let (classified, carried) = classify_row(row, previous_balance);
            kept.extend(classified);
            (kept, carried)
        },
    );

    let total = |flow: Flow| -> Decimal {
        transactions
            .iter()
            .filter(|t| t.flow == flow)
            .map(|t| t.amount)
            .sum::<Decimal>()
            .round_dp(2)
    };
    ClassifiedStatement {
        total_credited: total(Flow::Received),
        total_debited: total(Flow::Paid),
        transactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn row(description: &str) -> RawTransactionRow {
        RawTransactionRow {
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            description: description.to_string(),
            debit: None,
            credit: None,
            amount: None,
            balance: None,
            flow: None,
            reference: None,
        }
    }

    #[test]
    fn debit_credit_columns_beat_amount_column() {
        let r = RawTransactionRow {
            debit: Some(dec("500")),
            credit: Some(Decimal::ZERO),
            amount: Some(dec("999")),
            ..row("Cheque deposit")
        };
        let (tx, _) = classify_row(&r, None);
        let tx = tx.unwrap();
        assert_eq!(tx.flow, Flow::Paid);
        assert_eq!(tx.amount, dec("500"));
    }

    #[test]
    fn debit_wins_when_both_positive() {
        let r = RawTransactionRow { debit: Some(dec("10")), credit: Some(dec("20")), ..row("x") };
        let tx = classify_row(&r, None).0.unwrap();
        assert_eq!((tx.flow, tx.amount), (Flow::Paid, dec("10")));
    }

    #[test]
    fn zero_rows_are_dropped_but_carry_balance() {
        let r = RawTransactionRow {
            debit: Some(Decimal::ZERO),
            credit: Some(Decimal::ZERO),
            balance: Some(dec("100")),
            ..row("Opening")
        };
        assert_eq!(classify_row(&r, None), (None, Some(dec("100"))));
    }

    #[test]
    fn explicit_type_column_decides() {
        let r = RawTransactionRow { amount: Some(dec("-75")), flow: Some(Flow::Received), ..row("ATM") };
        let tx = classify_row(&r, None).0.unwrap();
        assert_eq!((tx.flow, tx.amount), (Flow::Received, dec("75")));
    }

    #[test]
    fn rising_balance_overrides_default_paid_guess() {
        let r = RawTransactionRow { amount: Some(dec("1000")), balance: Some(dec("6000")), ..row("MISC 0042") };
        let tx = classify_row(&r, Some(dec("5000"))).0.unwrap();
        assert_eq!(tx.flow, Flow::Received);

        let falling = RawTransactionRow { balance: Some(dec("4000")), ..r };
        assert_eq!(classify_row(&falling, Some(dec("5000"))).0.unwrap().flow, Flow::Paid);
    }

    #[test]
    fn balance_never_overrides_a_received_guess() {
        let r = RawTransactionRow { amount: Some(dec("1000")), balance: Some(dec("4000")), ..row("Salary") };
        let tx = classify_row(&r, Some(dec("5000"))).0.unwrap();
        assert_eq!(tx.flow, Flow::Received);
    }

    #[test]
    fn single_money_columns() {
        let paid = RawTransactionRow { debit: Some(dec("5")), ..row("x") };
        assert_eq!(classify_row(&paid, None).0.unwrap().flow, Flow::Paid);
        let received = RawTransactionRow { credit: Some(dec("5")), ..row("x") };
        assert_eq!(classify_row(&received, None).0.unwrap().flow, Flow::Received);
        let blank = RawTransactionRow { credit: Some(Decimal::ZERO), ..row("x") };
        assert!(classify_row(&blank, None).0.is_none());
        assert!(classify_row(&row("x"), None).0.is_none());
    }

    #[test]
    fn keyword_guesses_in_order() {
        assert_eq!(guess_flow("UPI/CR/401234/ACME"), Flow::Received);
        assert_eq!(guess_flow("NEFT/DR/ACME LTD"), Flow::Paid);
        assert_eq!(guess_flow("BY TRANSFER-NEFT"), Flow::Received);
        assert_eq!(guess_flow("TO TRANSFER-RENT"), Flow::Paid);
        assert_eq!(guess_flow("Salary Credit"), Flow::Received);
        assert_eq!(guess_flow("Card debit"), Flow::Paid);
        assert_eq!(guess_flow("Interest paid"), Flow::Received);
        assert_eq!(guess_flow("ATM WDL"), Flow::Paid);
        assert_eq!(guess_flow("POS 4411 GROCER"), Flow::Paid);
    }

    #[test]
    fn fold_carries_balance_across_dropped_rows() {
        let rows = vec![
            RawTransactionRow { debit: Some(Decimal::ZERO), credit: Some(Decimal::ZERO), balance: Some(dec("100")), ..row("b/f") },
            RawTransactionRow { amount: Some(dec("50")), balance: Some(dec("150")), ..row("MISC") },
            RawTransactionRow { amount: Some(dec("20")), balance: Some(dec("130")), ..row("MISC") },
        ];
        let statement = classify_rows(&rows);
        assert_eq!(statement.transactions.len(), 2);
        assert_eq!(statement.transactions[0].flow, Flow::Received);
        assert_eq!(statement.transactions[1].flow, Flow::Paid);
        assert_eq!(statement.total_credited, dec("50"));
        assert_eq!(statement.total_debited, dec("20"));
    }

    #[test]
    fn amounts_round_to_cents() {
        let r = RawTransactionRow { credit: Some(dec("10.005")), debit: None, ..row("x") };
        assert_eq!(classify_row(&r, None).0.unwrap().amount, dec("10.00"));
        let tiny = RawTransactionRow { credit: Some(dec("0.004")), ..row("x") };
        assert!(classify_row(&tiny, None).0.is_none());
    }
}
