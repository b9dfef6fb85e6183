use std::collections::BTreeMap;
use std::str::FromStr;

use bankline_core::{
    AccountId, HeadId, Money, NewTransaction, ParsedTransaction, RuleId, SubHeadId, Transaction,
    TransactionId,
};
use chrono::NaiveDate;
use sqlx::{FromRow, SqliteExecutor};

use crate::db::DbPool;

const SELECT_TRANSACTION: &str = r#"
    SELECT id, bank_account_id, transaction_date, transaction_type, amount_cents, raw_narration,
           bank_reference, party_name, balance_after_cents, bank_name, narration_head_id,
           narration_sub_head_id, narration_note, suggestion_source, confidence, applied_rule_id,
           alternatives, suggestion_metadata, dedup_hash, is_duplicate, review_status,
           import_batch_id, import_source, created_at
    FROM transactions
"#;

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: i64,
    bank_account_id: i64,
    transaction_date: NaiveDate,
    transaction_type: String,
    amount_cents: i64,
    raw_narration: String,
    bank_reference: String,
    party_name: Option<String>,
    balance_after_cents: Option<i64>,
    bank_name: Option<String>,
    narration_head_id: Option<i64>,
    narration_sub_head_id: Option<i64>,
    narration_note: Option<String>,
    suggestion_source: Option<String>,
    confidence: Option<f64>,
    applied_rule_id: Option<i64>,
    alternatives: Option<String>,
    suggestion_metadata: Option<String>,
    dedup_hash: String,
    is_duplicate: bool,
    review_status: String,
    import_batch_id: Option<String>,
    import_source: String,
    created_at: String,
}

fn decode_err(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> sqlx::Error {
    sqlx::Error::Decode(e.into())
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = sqlx::Error;

    fn try_from(r: TransactionRow) -> Result<Self, Self::Error> {
        let alternatives: Vec<String> = match r.alternatives.as_deref() {
            Some(json) => serde_json::from_str(json).map_err(decode_err)?,
            None => Vec::new(),
        };
        let suggestion_metadata: BTreeMap<String, String> = match r.suggestion_metadata.as_deref() {
            Some(json) => serde_json::from_str(json).map_err(decode_err)?,
            None => BTreeMap::new(),
        };

        Ok(Transaction {
            id: TransactionId(r.id),
            account_id: AccountId(r.bank_account_id),
            details: ParsedTransaction {
                raw_narration: r.raw_narration,
                transaction_type: FromStr::from_str(&r.transaction_type).map_err(decode_err)?,
                amount: Money::from_cents(r.amount_cents),
                bank_reference: r.bank_reference,
                party_name: r.party_name,
                transaction_date: r.transaction_date,
                balance_after: r.balance_after_cents.map(Money::from_cents),
                bank_name: r.bank_name,
            },
            narration_head_id: r.narration_head_id.map(HeadId),
            narration_sub_head_id: r.narration_sub_head_id.map(SubHeadId),
            narration_note: r.narration_note,
            suggestion_source: r
                .suggestion_source
                .as_deref()
                .map(FromStr::from_str)
                .transpose()
                .map_err(decode_err)?,
            confidence: r.confidence.map(|c| c as f32),
            applied_rule_id: r.applied_rule_id.map(RuleId),
            alternatives,
            suggestion_metadata,
            dedup_hash: r.dedup_hash,
            is_duplicate: r.is_duplicate,
            review_status: FromStr::from_str(&r.review_status).map_err(decode_err)?,
            import_batch_id: r.import_batch_id,
            import_source: FromStr::from_str(&r.import_source).map_err(decode_err)?,
            created_at: r.created_at,
        })
    }
}

/// Whether this account already holds a transaction with the fingerprint.
pub async fn fingerprint_exists<'e>(
    executor: impl SqliteExecutor<'e>,
    account_id: AccountId,
    dedup_hash: &str,
) -> Result<bool, sqlx::Error> {
    let (found,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM transactions WHERE bank_account_id = ? AND dedup_hash = ?)",
    )
    .bind(account_id.0)
    .bind(dedup_hash)
    .fetch_one(executor)
    .await?;
    Ok(found)
}

fn json_or_null<T: serde::Serialize + ?Sized>(value: &T, empty: bool) -> Result<Option<String>, sqlx::Error> {
    if empty {
        return Ok(None);
    }
    serde_json::to_string(value)
        .map(Some)
        .map_err(|e| sqlx::Error::Encode(e.into()))
}

pub async fn insert_transaction<'e>(
    executor: impl SqliteExecutor<'e>,
    tx: &NewTransaction,
) -> Result<TransactionId, sqlx::Error> {
    let d = &tx.details;
    let s = tx.suggestion.as_ref();
    let party_name = d
        .party_name
        .clone()
        .or_else(|| s.and_then(|s| s.party_name.clone()));
    let alternatives = match s {
        Some(s) => json_or_null(&s.alternatives, s.alternatives.is_empty())?,
        None => None,
    };
    let metadata = match s {
        Some(s) => json_or_null(&s.metadata, s.metadata.is_empty())?,
        None => None,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO transactions
            (bank_account_id, transaction_date, transaction_type, amount_cents, raw_narration,
             bank_reference, party_name, balance_after_cents, bank_name, narration_head_id,
             narration_sub_head_id, narration_note, suggestion_source, confidence, applied_rule_id,
             alternatives, suggestion_metadata, dedup_hash, is_duplicate, review_status,
             import_batch_id, import_source)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(tx.account_id.0)
    .bind(d.transaction_date)
    .bind(d.transaction_type.as_str())
    .bind(d.amount.to_cents())
    .bind(&d.raw_narration)
    .bind(d.bank_reference.trim())
    .bind(party_name)
    .bind(d.balance_after.map(Money::to_cents))
    .bind(&d.bank_name)
    .bind(s.and_then(|s| s.narration_head_id).map(|h| h.0))
    .bind(s.and_then(|s| s.narration_sub_head_id).map(|h| h.0))
    .bind(s.and_then(|s| s.note.clone()))
    .bind(s.map(|s| s.source.as_str()))
    .bind(s.map(|s| f64::from(s.confidence)))
    .bind(s.and_then(|s| s.applied_rule_id).map(|r| r.0))
    .bind(alternatives)
    .bind(metadata)
    .bind(tx.dedup_hash())
    .bind(tx.is_duplicate)
    .bind(tx.review_status.to_string())
    .bind(&tx.import_batch_id)
    .bind(tx.import_source.as_str())
    .execute(executor)
    .await?;

    Ok(TransactionId(result.last_insert_rowid()))
}

pub async fn get_transaction<'e>(
    executor: impl SqliteExecutor<'e>,
    id: TransactionId,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row = sqlx::query_as::<_, TransactionRow>(&format!("{SELECT_TRANSACTION} WHERE id = ?"))
        .bind(id.0)
        .fetch_optional(executor)
        .await?;
    row.map(Transaction::try_from).transpose()
}

/// Everything one upload produced, in insertion order.
pub async fn get_batch_transactions(pool: &DbPool, batch_id: &str) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "{SELECT_TRANSACTION} WHERE import_batch_id = ? ORDER BY id"
    ))
    .bind(batch_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Transaction::try_from).collect()
}

/// Newest first.
pub async fn list_transactions(
    pool: &DbPool,
    account_id: AccountId,
    limit: i64,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "{SELECT_TRANSACTION} WHERE bank_account_id = ? ORDER BY transaction_date DESC, id DESC LIMIT ?"
    ))
    .bind(account_id.0)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Transaction::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::insert_bank_account;
    use crate::catalog::insert_head;
    use crate::db::test_support::temp_db;
    use bankline_core::{
        BankAccount, CompanyId, ImportSource, NarrationSuggestion, ReviewStatus, SuggestionSource,
        TransactionType,
    };

    fn parsed(reference: &str, cents: i64) -> ParsedTransaction {
        ParsedTransaction::new(
            "NEFT ACME PAYROLL",
            TransactionType::Credit,
            Money::from_cents(cents),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        )
        .unwrap()
        .with_reference(reference)
        .with_balance_after(Some(Money::from_cents(15_000_000)))
    }

    async fn account(pool: &DbPool) -> AccountId {
        insert_bank_account(pool, &BankAccount::new(CompanyId(1), "Operating")).await.unwrap()
    }

    #[tokio::test]
    async fn insert_and_read_back_with_suggestion() {
        let (pool, _dir) = temp_db().await;
        let account_id = account(&pool).await;
        let head = insert_head(&pool, CompanyId(1), "Salary").await.unwrap();

        let mut suggestion = NarrationSuggestion::from_ai(Some(head), None, Some("Payroll".into()), 0.8);
        suggestion.party_name = Some("Acme".into());
        suggestion.alternatives = vec!["Bonus".into()];
        suggestion.metadata.insert("reasoning".into(), "payroll keyword".into());

        let mut new = NewTransaction::new(account_id, parsed("UTR1", 5_000_000), ImportSource::Csv);
        new.suggestion = Some(suggestion);
        new.import_batch_id = Some("batch-1".into());
        let id = insert_transaction(&pool, &new).await.unwrap();

        let tx = get_transaction(&pool, id).await.unwrap().unwrap();
        assert_eq!(tx.account_id, account_id);
        assert_eq!(tx.details.amount, Money::from_cents(5_000_000));
        assert_eq!(tx.details.transaction_type, TransactionType::Credit);
        assert_eq!(tx.details.bank_reference, "UTR1");
        assert_eq!(tx.details.party_name.as_deref(), Some("Acme"));
        assert_eq!(tx.narration_head_id, Some(head));
        assert_eq!(tx.suggestion_source, Some(SuggestionSource::Ai));
        assert!((tx.confidence.unwrap() - 0.8).abs() < 1e-6);
        assert_eq!(tx.alternatives, vec!["Bonus".to_string()]);
        assert_eq!(tx.suggestion_metadata.get("reasoning").map(String::as_str), Some("payroll keyword"));
        assert_eq!(tx.review_status, ReviewStatus::Pending);
        assert_eq!(tx.import_source, ImportSource::Csv);
        assert_eq!(tx.dedup_hash, new.dedup_hash());
        assert!(!tx.is_duplicate);
    }

    #[tokio::test]
    async fn uncategorized_rows_store_nulls() {
        let (pool, _dir) = temp_db().await;
        let account_id = account(&pool).await;
        let new = NewTransaction::new(account_id, parsed("", 100), ImportSource::Sms);
        let id = insert_transaction(&pool, &new).await.unwrap();

        let tx = get_transaction(&pool, id).await.unwrap().unwrap();
        assert!(tx.narration_head_id.is_none());
        assert!(tx.suggestion_source.is_none());
        assert!(tx.confidence.is_none());
        assert!(tx.alternatives.is_empty());
        assert!(tx.import_batch_id.is_none());
    }

    #[tokio::test]
    async fn fingerprints_are_scoped_per_account() {
        let (pool, _dir) = temp_db().await;
        let first = account(&pool).await;
        let second = account(&pool).await;
        let new = NewTransaction::new(first, parsed("UTR9", 100), ImportSource::Csv);
        insert_transaction(&pool, &new).await.unwrap();

        assert!(fingerprint_exists(&pool, first, new.dedup_hash()).await.unwrap());
        assert!(!fingerprint_exists(&pool, second, new.dedup_hash()).await.unwrap());
    }

    #[tokio::test]
    async fn non_positive_amount_violates_the_schema() {
        let (pool, _dir) = temp_db().await;
        let account_id = account(&pool).await;
        let mut details = parsed("X", 100);
        details.amount = Money::zero();
        let new = NewTransaction::new(account_id, details, ImportSource::Csv);
        assert!(insert_transaction(&pool, &new).await.is_err());
    }

    #[tokio::test]
    async fn batch_and_account_listings() {
        let (pool, _dir) = temp_db().await;
        let account_id = account(&pool).await;
        for (i, reference) in ["A", "B", "C"].iter().enumerate() {
            let mut new = NewTransaction::new(account_id, parsed(reference, 100 + i as i64), ImportSource::Excel);
            new.import_batch_id = (i < 2).then(|| "batch-7".to_string());
            insert_transaction(&pool, &new).await.unwrap();
        }

        let batch = get_batch_transactions(&pool, "batch-7").await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].details.bank_reference, "A");

        let recent = list_transactions(&pool, account_id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].details.bank_reference, "C");
    }
}
