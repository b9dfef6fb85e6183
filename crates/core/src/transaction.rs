use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use super::account::AccountId;
use super::fingerprint::dedup_fingerprint;
use super::money::Money;
use super::narration::{HeadId, NarrationSuggestion, RuleId, SubHeadId, SuggestionSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit" | "cr" => Ok(TransactionType::Credit),
            "debit" | "dr" => Ok(TransactionType::Debit),
            other => Err(format!("Unknown transaction type: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Reviewed,
    Flagged,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Pending => write!(f, "pending"),
            ReviewStatus::Reviewed => write!(f, "reviewed"),
            ReviewStatus::Flagged => write!(f, "flagged"),
        }
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "reviewed" => Ok(ReviewStatus::Reviewed),
            "flagged" => Ok(ReviewStatus::Flagged),
            other => Err(format!("Unknown review status: '{other}'")),
        }
    }
}

/// Where an imported transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportSource {
    Csv,
    Excel,
    Pdf,
    Sms,
}

impl ImportSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportSource::Csv => "csv",
            ImportSource::Excel => "excel",
            ImportSource::Pdf => "pdf",
            ImportSource::Sms => "sms",
        }
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImportSource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ImportSource::Csv),
            "excel" => Ok(ImportSource::Excel),
            "pdf" => Ok(ImportSource::Pdf),
            "sms" => Ok(ImportSource::Sms),
            other => Err(format!("Unknown import source: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransactionError {
    #[error("Transaction amount must be positive, got {0}")]
    NonPositiveAmount(Money),
}

/// Canonical shape every input path (CSV, spreadsheet, PDF, SMS) converges on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub raw_narration: String,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub bank_reference: String,
    pub party_name: Option<String>,
    pub transaction_date: NaiveDate,
    pub balance_after: Option<Money>,
    pub bank_name: Option<String>,
}

impl ParsedTransaction {
    pub fn new(
        raw_narration: impl Into<String>,
        transaction_type: TransactionType,
        amount: Money,
        transaction_date: NaiveDate,
    ) -> Result<Self, TransactionError> {
        if !amount.is_positive() {
            return Err(TransactionError::NonPositiveAmount(amount));
        }
        Ok(ParsedTransaction {
            raw_narration: raw_narration.into(),
            transaction_type,
            amount,
            bank_reference: String::new(),
            party_name: None,
            transaction_date,
            balance_after: None,
            bank_name: None,
        })
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.bank_reference = reference.into();
        self
    }

    pub fn with_balance_after(mut self, balance: Option<Money>) -> Self {
        self.balance_after = balance;
        self
    }

    pub fn with_party_name(mut self, party: Option<String>) -> Self {
        self.party_name = party.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_bank_name(mut self, bank: Option<String>) -> Self {
        self.bank_name = bank.filter(|b| !b.trim().is_empty());
        self
    }

    pub fn fingerprint(&self) -> String {
        dedup_fingerprint(
            self.transaction_date,
            self.amount,
            self.transaction_type,
            Some(&self.bank_reference),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub i64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A transaction ready to be written. The dedup hash is fixed at construction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub details: ParsedTransaction,
    pub suggestion: Option<NarrationSuggestion>,
    dedup_hash: String,
    pub is_duplicate: bool,
    pub review_status: ReviewStatus,
    pub import_batch_id: Option<String>,
    pub import_source: ImportSource,
}

impl NewTransaction {
    pub fn new(account_id: AccountId, details: ParsedTransaction, import_source: ImportSource) -> Self {
        let dedup_hash = details.fingerprint();
        NewTransaction {
            account_id,
            details,
            suggestion: None,
            dedup_hash,
            is_duplicate: false,
            review_status: ReviewStatus::Pending,
            import_batch_id: None,
            import_source,
        }
    }

    pub fn dedup_hash(&self) -> &str {
        &self.dedup_hash
    }
}

/// Persisted transaction with its categorization outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub details: ParsedTransaction,
    pub narration_head_id: Option<HeadId>,
    pub narration_sub_head_id: Option<SubHeadId>,
    pub narration_note: Option<String>,
    pub suggestion_source: Option<SuggestionSource>,
    pub confidence: Option<f32>,
    pub applied_rule_id: Option<RuleId>,
    pub alternatives: Vec<String>,
    pub suggestion_metadata: BTreeMap<String, String>,
    pub dedup_hash: String,
    pub is_duplicate: bool,
    pub review_status: ReviewStatus,
    pub import_batch_id: Option<String>,
    pub import_source: ImportSource,
    pub created_at: String,
}
