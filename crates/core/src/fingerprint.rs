use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::money::Money;
use crate::transaction::TransactionType;

/// Compute SHA-256 of an in-memory byte slice.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode a raw 32-byte hash as a lowercase hex string (64 chars).
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Content fingerprint identifying "the same bank event" across imports.
///
/// Pure function of `(date, amount, type, reference)`; the reference is
/// trimmed and an absent one hashes as the empty string. The account is not
/// an input; callers scope lookups per account.
pub fn dedup_fingerprint(
    date: NaiveDate,
    amount: Money,
    transaction_type: TransactionType,
    reference: Option<&str>,
) -> String {
    let canonical = format!(
        "{}|{}|{}|{}",
        date.format("%Y-%m-%d"),
        amount.to_cents(),
        transaction_type.as_str(),
        reference.map(str::trim).unwrap_or_default()
    );
    to_hex(&sha256_bytes(canonical.as_bytes()))
}
