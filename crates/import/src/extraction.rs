use std::str::FromStr;

use bankline_core::{DateRange, ImportSource, Money, ParsedTransaction, TransactionType};
use bankline_oracle::{ExtractedTransaction, SmsExtraction, SmsOracle, StatementExtraction};
use rust_decimal::Decimal;
use tracing::debug;

use crate::normalize::{ImportError, NormalizedStatement};
use crate::text::{collapse_whitespace, parse_date};

/// Maps a document-extraction answer onto canonical transactions. Rows with
/// an unreadable date, type or amount are dropped.
pub fn statement_from_extraction(extraction: StatementExtraction) -> NormalizedStatement {
    let bank_name = non_blank(extraction.bank_name);
    let period = DateRange::from_bounds(
        extraction.statement_from.as_deref().and_then(parse_date),
        extraction.statement_to.as_deref().and_then(parse_date),
    );

    let total = extraction.transactions.len();
    let transactions: Vec<ParsedTransaction> = extraction
        .transactions
        .into_iter()
        .filter_map(|row| {
            let parsed = extracted_row(row, bank_name.as_deref());
            if parsed.is_none() {
                debug!("dropping unreadable extracted row");
            }
            parsed
        })
        .collect();
    debug!(kept = transactions.len(), total, "document extraction converted");

    let sum = |t: TransactionType| {
        transactions
            .iter()
            .filter(|tx| tx.transaction_type == t)
            .map(|tx| tx.amount)
            .sum::<Money>()
    };
    NormalizedStatement {
        total_credited: sum(TransactionType::Credit),
        total_debited: sum(TransactionType::Debit),
        transactions,
        layout: None,
        account_number: non_blank(extraction.account_number),
        bank_name,
        period,
        source: ImportSource::Pdf,
    }
}

fn extracted_row(row: ExtractedTransaction, statement_bank: Option<&str>) -> Option<ParsedTransaction> {
    let transaction_type = TransactionType::from_str(&row.transaction_type).ok()?;
    let date = parse_date(&row.date)?;
    let amount = positive_money(row.amount)?;
    let narration = collapse_whitespace(&row.raw_narration);

    ParsedTransaction::new(narration, transaction_type, amount, date)
        .ok()
        .map(|tx| {
            tx.with_reference(row.bank_reference.unwrap_or_default().trim())
                .with_balance_after(row.balance_after.map(Money::from_decimal))
                .with_party_name(row.party_name)
                .with_bank_name(non_blank(row.bank_name).or_else(|| statement_bank.map(str::to_string)))
        })
}

/// Wraps one SMS extraction as a transaction. Unlike statement rows, a bad
/// SMS answer is an error: there is nothing else to import.
pub fn transaction_from_sms(text: &str, sms: SmsExtraction) -> Result<ParsedTransaction, ImportError> {
    let transaction_type = TransactionType::from_str(&sms.transaction_type)
        .map_err(|_| ImportError::InvalidSms(format!("unknown type '{}'", sms.transaction_type)))?;
    let date = parse_date(&sms.transaction_date)
        .ok_or_else(|| ImportError::InvalidSms(format!("unreadable date '{}'", sms.transaction_date)))?;
    let amount = positive_money(sms.amount)
        .ok_or_else(|| ImportError::InvalidSms("amount must be positive".to_string()))?;

    let tx = ParsedTransaction::new(collapse_whitespace(text), transaction_type, amount, date)
        .map_err(|e| ImportError::InvalidSms(e.to_string()))?;
    Ok(tx
        .with_reference(sms.bank_reference.unwrap_or_default().trim())
        .with_balance_after(sms.balance_after.map(Money::from_decimal))
        .with_party_name(sms.party_name)
        .with_bank_name(sms.bank_name))
}

/// Sends an SMS to the extraction oracle and converts its answer.
pub async fn parse_sms(text: &str, oracle: &dyn SmsOracle) -> Result<ParsedTransaction, ImportError> {
    if text.trim().is_empty() {
        return Err(ImportError::InvalidSms("empty message".to_string()));
    }
    let extraction = oracle.extract_sms(text).await?;
    transaction_from_sms(text, extraction)
}

fn positive_money(amount: Option<Decimal>) -> Option<Money> {
    amount
        .map(|a| Money::from_decimal(a.abs()))
        .filter(|m| m.is_positive())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
