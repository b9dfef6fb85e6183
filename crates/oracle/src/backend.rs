use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{CategorizationRequest, CategorizationResponse, SmsExtraction, StatementExtraction};

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle request failed: {0}")]
    Transport(String),
    #[error("Oracle returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Oracle returned malformed JSON: {0}")]
    Malformed(String),
    #[error("Oracle timed out after {0:?}")]
    Timeout(Duration),
    #[error("Oracle not available: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        OracleError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(e: serde_json::Error) -> Self {
        OracleError::Malformed(e.to_string())
    }
}

/// Reads a whole bank statement document (PDF bytes) into structured rows.
#[async_trait]
pub trait StatementOracle: Send + Sync {
    async fn extract_statement(&self, document: &[u8]) -> Result<StatementExtraction, OracleError>;
}

/// Reads one bank SMS alert.
#[async_trait]
pub trait SmsOracle: Send + Sync {
    async fn extract_sms(&self, text: &str) -> Result<SmsExtraction, OracleError>;
}

/// Picks a head/sub-head for one transaction from the company's catalog.
#[async_trait]
pub trait CategorizationOracle: Send + Sync {
    async fn categorize(
        &self,
        request: &CategorizationRequest,
    ) -> Result<CategorizationResponse, OracleError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns canned answers and counts calls, so pipelines can be tested
/// without a model behind them.
#[derive(Debug, Default)]
pub struct MockOracle {
    statement: Option<StatementExtraction>,
    sms: Option<SmsExtraction>,
    categorization: Option<CategorizationResponse>,
    fail: bool,
    delay: Option<Duration>,
    statement_calls: AtomicUsize,
    sms_calls: AtomicUsize,
    categorize_calls: AtomicUsize,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statement(mut self, statement: StatementExtraction) -> Self {
        self.statement = Some(statement);
        self
    }

    pub fn with_sms(mut self, sms: SmsExtraction) -> Self {
        self.sms = Some(sms);
        self
    }

    pub fn with_categorization(mut self, response: CategorizationResponse) -> Self {
        self.categorization = Some(response);
        self
    }

    /// Every call fails with a transport error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn statement_calls(&self) -> usize {
        self.statement_calls.load(Ordering::SeqCst)
    }

    pub fn sms_calls(&self) -> usize {
        self.sms_calls.load(Ordering::SeqCst)
    }

    pub fn categorize_calls(&self) -> usize {
        self.categorize_calls.load(Ordering::SeqCst)
    }

    async fn answer<T: Clone>(&self, canned: &Option<T>, what: &str) -> Result<T, OracleError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(OracleError::Transport(format!("mock {what} failure")));
        }
        canned
            .clone()
            .ok_or_else(|| OracleError::Unavailable(format!("no canned {what} response")))
    }
}

#[async_trait]
impl StatementOracle for MockOracle {
    async fn extract_statement(&self, _document: &[u8]) -> Result<StatementExtraction, OracleError> {
        self.statement_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.statement, "statement").await
    }
}

#[async_trait]
impl SmsOracle for MockOracle {
    async fn extract_sms(&self, _text: &str) -> Result<SmsExtraction, OracleError> {
        self.sms_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.sms, "sms").await
    }
}

#[async_trait]
impl CategorizationOracle for MockOracle {
    async fn categorize(
        &self,
        _request: &CategorizationRequest,
    ) -> Result<CategorizationResponse, OracleError> {
        self.categorize_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.categorization, "categorization").await
    }
}
