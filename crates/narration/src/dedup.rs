use bankline_core::NewTransaction;
use bankline_storage::fingerprint_exists;
use sqlx::SqliteExecutor;
use tracing::debug;

/// Sets `is_duplicate` when the account already holds a transaction with the
/// same fingerprint. Read-only; returns the flag.
pub async fn flag_duplicate<'e>(
    executor: impl SqliteExecutor<'e>,
    tx: &mut NewTransaction,
) -> Result<bool, sqlx::Error> {
    let seen = fingerprint_exists(executor, tx.account_id, tx.dedup_hash()).await?;
    if seen {
        debug!(account = %tx.account_id, hash = tx.dedup_hash(), "duplicate fingerprint");
    }
    tx.is_duplicate = seen;
    Ok(seen)
}
