use bankline_core::{ImportSource, Money, ParsedTransaction, TransactionId};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::pipeline::{AccountContext, NarrationPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Imported,
    Duplicate,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSummary {
    /// Zero-based position in the input.
    pub index: usize,
    pub status: RowStatus,
    pub transaction_id: Option<TransactionId>,
    pub error: Option<String>,
}

/// Outcome of one upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchImportResult {
    pub batch_id: Option<String>,
    pub total: usize,
    pub imported: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub rows: Vec<RowSummary>,
    pub total_credited: Option<Money>,
    pub total_debited: Option<Money>,
    /// Set when there was nothing to import.
    pub message: Option<String>,
}

impl BatchImportResult {
    pub fn empty(message: impl Into<String>) -> Self {
        Self { message: Some(message.into()), ..Self::default() }
    }

    fn record(&mut self, index: usize, outcome: Result<(TransactionId, bool), String>) {
        let summary = match outcome {
            Ok((id, true)) => {
                self.duplicates += 1;
                RowSummary { index, status: RowStatus::Duplicate, transaction_id: Some(id), error: None }
            }
            Ok((id, false)) => {
                self.imported += 1;
                RowSummary { index, status: RowStatus::Imported, transaction_id: Some(id), error: None }
            }
            Err(error) => {
                self.failed += 1;
                RowSummary { index, status: RowStatus::Failed, transaction_id: None, error: Some(error) }
            }
        };
        self.rows.push(summary);
    }

    /// First failure message, if any row failed.
    pub fn first_error(&self) -> Option<&str> {
        self.rows.iter().find_map(|r| r.error.as_deref())
    }
}

/// Runs the pipeline over every row of one upload, each in its own unit of work.
pub struct BatchImportOrchestrator<'a> {
    pipeline: &'a NarrationPipeline,
}

impl<'a> BatchImportOrchestrator<'a> {
    pub fn new(pipeline: &'a NarrationPipeline) -> Self {
        Self { pipeline }
    }

    /// A row error is recorded and the loop moves on; only fatal errors
    /// abort, leaving rows already committed in place.
    pub async fn run(
        &self,
        ctx: &AccountContext,
        transactions: Vec<ParsedTransaction>,
        source: ImportSource,
    ) -> Result<BatchImportResult, PipelineError> {
        if transactions.is_empty() {
            return Ok(BatchImportResult::default());
        }

        let batch_id = Uuid::new_v4().to_string();
        let mut result = BatchImportResult {
            batch_id: Some(batch_id.clone()),
            total: transactions.len(),
            ..BatchImportResult::default()
        };
        info!(batch = %batch_id, account = %ctx.account_id, rows = result.total, %source, "import batch started");

        for (index, details) in transactions.into_iter().enumerate() {
            match self.pipeline.process(ctx, details, source, Some(&batch_id)).await {
                Ok(done) => result.record(index, Ok((done.transaction_id, done.is_duplicate))),
                Err(e) if e.is_fatal() => {
                    warn!(batch = %batch_id, row = index, error = %e, "import batch aborted");
                    return Err(e);
                }
                Err(e) => {
                    warn!(batch = %batch_id, row = index, error = %e, "row failed");
                    result.record(index, Err(e.to_string()));
                }
            }
            debug!(batch = %batch_id, row = index, "row done");
        }

        info!(
            batch = %batch_id,
            imported = result.imported,
            duplicates = result.duplicates,
            failed = result.failed,
            "import batch finished"
        );
        Ok(result)
    }
}
