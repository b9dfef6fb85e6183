pub mod accounts;
pub mod catalog;
pub mod db;
pub mod rules;
pub mod transactions;

pub use accounts::{get_bank_account, insert_bank_account, list_bank_accounts, update_current_balance};
pub use catalog::{get_category_catalog, insert_head, insert_sub_head, set_head_active, set_sub_head_active};
pub use db::{create_db, DbPool};
pub use rules::{get_active_rules, get_rule_stats, record_rule_match, save_rule, set_rule_active, RuleStats};
pub use transactions::{
    fingerprint_exists, get_batch_transactions, get_transaction, insert_transaction, list_transactions,
};
