pub mod account;
pub mod fingerprint;
pub mod money;
pub mod narration;
pub mod period;
pub mod transaction;

pub use account::{AccountId, BankAccount, CompanyId};
pub use fingerprint::dedup_fingerprint;
pub use money::Money;
pub use narration::{
    CatalogHead, CatalogSubHead, CategorizationRule, CategoryCatalog, HeadId, MatchType,
    NarrationSuggestion, RuleId, RuleScope, SubHeadId, SuggestionSource,
};
pub use period::DateRange;
pub use transaction::{
    ImportSource, NewTransaction, ParsedTransaction, ReviewStatus, Transaction, TransactionError,
    TransactionId, TransactionType,
};
