use std::path::Path;
use std::sync::Arc;

use bankline_core::{AccountId, ImportSource, ParsedTransaction, Transaction};
use bankline_import::{parse_sms, FileKind, ImportError, StatementNormalizer};
use bankline_oracle::{SmsOracle, StatementOracle};
use bankline_storage::get_transaction;
use tracing::{debug, info};

use crate::batch::{BatchImportOrchestrator, BatchImportResult};
use crate::error::PipelineError;
use crate::pipeline::NarrationPipeline;

pub const NOTHING_FOUND: &str = "no transactions found in file";

/// Upload and SMS entry points for one database.
#[derive(Clone)]
pub struct ImportService {
    pipeline: NarrationPipeline,
    normalizer: StatementNormalizer,
    statement_oracle: Arc<dyn StatementOracle>,
    sms_oracle: Arc<dyn SmsOracle>,
}

impl ImportService {
    pub fn new(
        pipeline: NarrationPipeline,
        normalizer: StatementNormalizer,
        statement_oracle: Arc<dyn StatementOracle>,
        sms_oracle: Arc<dyn SmsOracle>,
    ) -> Self {
        Self { pipeline, normalizer, statement_oracle, sms_oracle }
    }

    pub fn pipeline(&self) -> &NarrationPipeline {
        &self.pipeline
    }

    /// Parses an uploaded statement and imports every row into the account.
    pub async fn import_statement(
        &self,
        data: &[u8],
        extension: &str,
        account_id: AccountId,
    ) -> Result<BatchImportResult, PipelineError> {
        let ctx = self.pipeline.load_context(account_id).await?;
        let statement = self
            .normalizer
            .normalize(data, extension, self.statement_oracle.as_ref())
            .await?;
        if statement.is_empty() {
            info!(account = %account_id, "statement had no transactions");
            return Ok(BatchImportResult::empty(NOTHING_FOUND));
        }

        let mut result = BatchImportOrchestrator::new(&self.pipeline)
            .run(&ctx, statement.transactions, statement.source)
            .await?;
        result.total_credited = Some(statement.total_credited);
        result.total_debited = Some(statement.total_debited);
        Ok(result)
    }

    /// Rejects unsupported extensions before touching the file.
    pub async fn import_path(&self, path: &Path, account_id: AccountId) -> Result<BatchImportResult, PipelineError> {
        FileKind::from_path(path)?;
        let data = std::fs::read(path).map_err(ImportError::from)?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        debug!(path = %path.display(), bytes = data.len(), "reading statement");
        self.import_statement(&data, extension, account_id).await
    }

    /// Imports already-parsed transactions, e.g. from another system.
    pub async fn import_parsed(
        &self,
        transactions: Vec<ParsedTransaction>,
        source: ImportSource,
        account_id: AccountId,
    ) -> Result<BatchImportResult, PipelineError> {
        if transactions.is_empty() {
            return Ok(BatchImportResult::default());
        }
        let ctx = self.pipeline.load_context(account_id).await?;
        BatchImportOrchestrator::new(&self.pipeline).run(&ctx, transactions, source).await
    }

    /// One bank SMS alert becomes one stored transaction, outside any batch.
    pub async fn ingest_sms(&self, text: &str, account_id: AccountId) -> Result<Transaction, PipelineError> {
        let ctx = self.pipeline.load_context(account_id).await?;
        let details = parse_sms(text, self.sms_oracle.as_ref()).await?;
        let done = self.pipeline.process(&ctx, details, ImportSource::Sms, None).await?;
        info!(account = %account_id, id = %done.transaction_id, duplicate = done.is_duplicate, "sms ingested");
        get_transaction(self.pipeline.pool(), done.transaction_id)
            .await?
            .ok_or(PipelineError::Storage(sqlx::Error::RowNotFound))
    }
}
