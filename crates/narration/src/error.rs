use bankline_core::AccountId;
use bankline_import::ImportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("Bank account {0} not found")]
    AccountNotFound(AccountId),
}

impl PipelineError {
    /// Fatal errors abort a batch; anything else fails only the row it came from.
    pub fn is_fatal(&self) -> bool {
        match self {
            PipelineError::Storage(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Configuration(_)
            ),
            PipelineError::AccountNotFound(_) => true,
            PipelineError::Import(_) => false,
        }
    }
}
