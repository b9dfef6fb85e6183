use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub i64);

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A company's bank account. Transactions are imported into exactly one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: Option<AccountId>,
    pub company_id: CompanyId,
    pub name: String,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    /// Running balance, moved only by non-duplicate transactions that carry a closing balance.
    pub current_balance: Option<Money>,
}

impl BankAccount {
    pub fn new(company_id: CompanyId, name: &str) -> Self {
        BankAccount {
            id: None,
            company_id,
            name: name.to_string(),
            account_number: None,
            bank_name: None,
            current_balance: None,
        }
    }
}
