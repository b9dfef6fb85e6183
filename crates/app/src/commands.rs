use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bankline_core::{AccountId, BankAccount, CompanyId};
use bankline_import::{RuleMatchEngine, StatementNormalizer};
use bankline_narration::{ImportService, NarrationPipeline, PipelineConfig};
use bankline_oracle::LlmOracle;
use bankline_storage::{self as storage, DbPool};
use serde::Serialize;

use crate::config::Config;

pub struct AppState {
    pub db: DbPool,
    pub config: Config,
}

impl AppState {
    fn service(&self) -> Result<ImportService> {
        let oracle = Arc::new(LlmOracle::new(self.config.oracle.llm_config())?);
        if !oracle.is_available() {
            tracing::warn!(
                env = %self.config.oracle.api_key_env,
                "no oracle API key; categorization falls back to rules only"
            );
        }
        let pipeline = NarrationPipeline::new(
            self.db.clone(),
            oracle.clone(),
            PipelineConfig {
                oracle_timeout: Duration::from_secs(self.config.oracle.categorize_timeout_secs),
            },
        );
        let normalizer = StatementNormalizer::new(self.config.import.sample_rows);
        Ok(ImportService::new(pipeline, normalizer, oracle.clone(), oracle))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn import(state: &AppState, file: &Path, account: i64) -> Result<()> {
    let result = state
        .service()?
        .import_path(file, AccountId(account))
        .await
        .with_context(|| format!("import {}", file.display()))?;
    print_json(&result)?;
    if result.failed > 0 {
        eprintln!(
            "{} of {} rows failed; first error: {}",
            result.failed,
            result.total,
            result.first_error().unwrap_or_default()
        );
    }
    Ok(())
}

pub async fn sms(state: &AppState, text: &str, account: i64) -> Result<()> {
    let tx = state.service()?.ingest_sms(text, AccountId(account)).await?;
    print_json(&tx)
}

pub async fn add_account(
    state: &AppState,
    company: i64,
    name: &str,
    number: Option<String>,
    bank: Option<String>,
) -> Result<()> {
    let mut account = BankAccount::new(CompanyId(company), name);
    account.account_number = number;
    account.bank_name = bank;
    let id = storage::insert_bank_account(&state.db, &account).await?;
    println!("Created bank account {id}");
    Ok(())
}

pub async fn list_accounts(state: &AppState, company: i64) -> Result<()> {
    let accounts = storage::list_bank_accounts(&state.db, CompanyId(company)).await?;
    print_json(&accounts)
}

pub async fn account_transactions(state: &AppState, account: i64, limit: i64) -> Result<()> {
    let txs = storage::list_transactions(&state.db, AccountId(account), limit).await?;
    print_json(&txs)
}

pub async fn add_head(state: &AppState, company: i64, name: &str, sub_heads: &[String]) -> Result<()> {
    let head = storage::insert_head(&state.db, CompanyId(company), name).await?;
    for sub in sub_heads {
        storage::insert_sub_head(&state.db, head, sub).await?;
    }
    println!("Head '{}' ({}) with {} sub-head(s)", name.trim(), head.0, sub_heads.len());
    Ok(())
}

pub async fn list_heads(state: &AppState, company: i64) -> Result<()> {
    let catalog = storage::get_category_catalog(&state.db, CompanyId(company)).await?;
    print_json(&catalog)
}

/// Saves every `[[rules]]` entry from a TOML file for the company.
pub async fn load_rules(state: &AppState, company: i64, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let engine = RuleMatchEngine::from_toml(&content)?;
    let catalog = storage::get_category_catalog(&state.db, CompanyId(company)).await?;
    for rule in engine.rules() {
        if !catalog.heads.iter().any(|h| h.id == rule.head_id) {
            bail!("rule '{}' points at unknown head {}", rule.match_value, rule.head_id.0);
        }
    }
    for rule in engine.rules() {
        storage::save_rule(&state.db, CompanyId(company), rule).await?;
    }
    println!("Loaded {} rule(s)", engine.len());
    Ok(())
}

pub async fn list_rules(state: &AppState, company: i64) -> Result<()> {
    let rules = storage::get_active_rules(&state.db, CompanyId(company)).await?;
    print_json(&rules)
}

pub async fn rule_stats(state: &AppState, company: i64) -> Result<()> {
    for rule in storage::get_active_rules(&state.db, CompanyId(company)).await? {
        let Some(id) = rule.id else { continue };
        if let Some(stats) = storage::get_rule_stats(&state.db, id).await? {
            println!(
                "{:>5}  {:<12} {:<30} matches={} last={}",
                id.0,
                rule.match_type.as_str(),
                rule.match_value,
                stats.match_count,
                stats.last_matched_at.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}
