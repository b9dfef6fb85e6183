//! Turns parsed bank transactions into stored, categorized ones: duplicate
//! detection, rule and oracle categorization, and batch bookkeeping.

pub mod batch;
pub mod dedup;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod tier2;

pub use batch::{BatchImportOrchestrator, BatchImportResult, RowStatus, RowSummary};
pub use dedup::flag_duplicate;
pub use error::PipelineError;
pub use pipeline::{AccountContext, NarrationPipeline, PipelineConfig, Processed, DEFAULT_ORACLE_TIMEOUT};
pub use service::{ImportService, NOTHING_FOUND};
