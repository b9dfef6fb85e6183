use std::sync::Arc;
use std::time::Duration;

use bankline_core::{
    AccountId, BankAccount, CategoryCatalog, ImportSource, NarrationSuggestion, NewTransaction,
    ParsedTransaction, TransactionId,
};
use bankline_import::{RuleInput, RuleMatchEngine};
use bankline_oracle::CategorizationOracle;
use bankline_storage::{
    get_active_rules, get_bank_account, get_category_catalog, insert_transaction, record_rule_match,
    update_current_balance, DbPool,
};
use tracing::debug;

use crate::dedup::flag_duplicate;
use crate::error::PipelineError;
use crate::tier2;

pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Upper bound on one tier-2 call.
    pub oracle_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { oracle_timeout: DEFAULT_ORACLE_TIMEOUT }
    }
}

/// The account being imported into, with its company's rules and catalog
/// as of the start of the import.
#[derive(Debug)]
pub struct AccountContext {
    pub account: BankAccount,
    pub account_id: AccountId,
    pub rules: RuleMatchEngine,
    pub catalog: CategoryCatalog,
}

/// What happened to one persisted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Processed {
    pub transaction_id: TransactionId,
    pub is_duplicate: bool,
}

/// Dedup, tier 1, tier 2 and persistence for one transaction at a time.
#[derive(Clone)]
pub struct NarrationPipeline {
    pool: DbPool,
    oracle: Arc<dyn CategorizationOracle>,
    config: PipelineConfig,
}

impl NarrationPipeline {
    pub fn new(pool: DbPool, oracle: Arc<dyn CategorizationOracle>, config: PipelineConfig) -> Self {
        Self { pool, oracle, config }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn load_context(&self, account_id: AccountId) -> Result<AccountContext, PipelineError> {
        let account = get_bank_account(&self.pool, account_id)
            .await?
            .ok_or(PipelineError::AccountNotFound(account_id))?;
        let rules = get_active_rules(&self.pool, account.company_id).await?;
        let catalog = get_category_catalog(&self.pool, account.company_id).await?;
        debug!(account = %account_id, rules = rules.len(), heads = catalog.heads.len(), "loaded account context");
        Ok(AccountContext {
            account,
            account_id,
            rules: RuleMatchEngine::new(rules),
            catalog,
        })
    }

    /// Tier 1, then tier 2 only when no rule matched.
    pub async fn suggest(&self, ctx: &AccountContext, details: &ParsedTransaction) -> Option<NarrationSuggestion> {
        let input = RuleInput {
            narration: &details.raw_narration,
            transaction_type: details.transaction_type,
            amount: details.amount,
            date: details.transaction_date,
        };
        if let Some(hit) = ctx.rules.find_match(&input) {
            debug!(rule = ?hit.rule.id, matched = %hit.matched_text, "rule matched");
            return Some(hit.to_suggestion());
        }
        tier2::suggest(self.oracle.as_ref(), &ctx.catalog, details, self.config.oracle_timeout).await
    }

    /// Categorizes and stores one transaction. The row, its rule telemetry and
    /// any balance change commit together or not at all.
    pub async fn process(
        &self,
        ctx: &AccountContext,
        details: ParsedTransaction,
        source: ImportSource,
        batch_id: Option<&str>,
    ) -> Result<Processed, PipelineError> {
        let mut new = NewTransaction::new(ctx.account_id, details, source);
        new.import_batch_id = batch_id.map(str::to_string);
        flag_duplicate(&self.pool, &mut new).await?;

        // Outside the write transaction: the oracle call may be slow.
        new.suggestion = self.suggest(ctx, &new.details).await;

        let mut db_tx = self.pool.begin().await?;
        // Another import may have landed the same event meanwhile.
        flag_duplicate(&mut *db_tx, &mut new).await?;
        let transaction_id = insert_transaction(&mut *db_tx, &new).await?;

        if let Some(rule_id) = new.suggestion.as_ref().and_then(|s| s.applied_rule_id) {
            record_rule_match(&mut *db_tx, rule_id).await?;
        }
        if !new.is_duplicate {
            if let Some(balance) = new.details.balance_after {
                update_current_balance(&mut *db_tx, ctx.account_id, balance).await?;
            }
        }
        db_tx.commit().await?;

        debug!(id = %transaction_id, duplicate = new.is_duplicate, "transaction stored");
        Ok(Processed { transaction_id, is_duplicate: new.is_duplicate })
    }
}
