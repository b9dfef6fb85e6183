use std::path::Path;

use bankline_core::{DateRange, ImportSource, Money, ParsedTransaction, TransactionType};
use bankline_oracle::{OracleError, StatementOracle};
use thiserror::Error;
use tracing::{debug, info};

use crate::classify::{classify_rows, ClassifiedStatement, ClassifiedTransaction};
use crate::extract::{Flow, RowExtractor};
use crate::extraction::statement_from_extraction;
use crate::fields::{find_header_line, find_header_row};
use crate::grid::{GridError, GridOrigin, RawGrid};
use crate::layout::{classify_layout, LayoutKind};

pub const DEFAULT_SAMPLE_ROWS: usize = 30;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("no data found in file")]
    NoData,
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),
    #[error("Extraction oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("Invalid SMS: {0}")]
    InvalidSms(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Declared upload type, from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Tsv,
    Spreadsheet,
    Pdf,
}

impl FileKind {
    pub fn from_extension(extension: &str) -> Result<Self, ImportError> {
        match extension.trim().trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(FileKind::Csv),
            "tsv" => Ok(FileKind::Tsv),
            "xlsx" | "xls" | "xlsm" => Ok(FileKind::Spreadsheet),
            "pdf" => Ok(FileKind::Pdf),
            other => Err(ImportError::UnsupportedFileType(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::from_extension(extension)
    }

    pub fn import_source(self) -> ImportSource {
        match self {
            FileKind::Csv | FileKind::Tsv => ImportSource::Csv,
            FileKind::Spreadsheet => ImportSource::Excel,
            FileKind::Pdf => ImportSource::Pdf,
        }
    }
}

/// Canonical transactions from one upload, plus what the statement said about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStatement {
    pub transactions: Vec<ParsedTransaction>,
    /// `None` for oracle-extracted documents.
    pub layout: Option<LayoutKind>,
    pub total_credited: Money,
    pub total_debited: Money,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub period: Option<DateRange>,
    pub source: ImportSource,
}

impl NormalizedStatement {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Entry point for statement files: picks the decoding path by extension.
#[derive(Debug, Clone, Copy)]
pub struct StatementNormalizer {
    pub sample_rows: usize,
}

impl Default for StatementNormalizer {
    fn default() -> Self {
        Self { sample_rows: DEFAULT_SAMPLE_ROWS }
    }
}

impl StatementNormalizer {
    pub fn new(sample_rows: usize) -> Self {
        Self { sample_rows: sample_rows.max(1) }
    }

    pub async fn normalize(
        &self,
        data: &[u8],
        extension: &str,
        oracle: &dyn StatementOracle,
    ) -> Result<NormalizedStatement, ImportError> {
        let kind = FileKind::from_extension(extension)?;
        if kind == FileKind::Pdf {
            let extraction = oracle.extract_statement(data).await?;
            let statement = statement_from_extraction(extraction);
            info!(transactions = statement.transactions.len(), "document statement extracted");
            return Ok(statement);
        }
        self.normalize_tabular(data, kind)
    }

    /// CSV, TSV and spreadsheet uploads. Never consults an oracle.
    pub fn normalize_tabular(&self, data: &[u8], kind: FileKind) -> Result<NormalizedStatement, ImportError> {
        let grid = match kind {
            FileKind::Csv => RawGrid::from_delimited(data, b',')?,
            FileKind::Tsv => RawGrid::from_delimited(data, b'\t')?,
            FileKind::Spreadsheet => RawGrid::from_spreadsheet(data)?,
            FileKind::Pdf => return Err(ImportError::UnsupportedFileType("pdf".to_string())),
        };
        let (layout, classified) = self.normalize_grid(&grid)?;
        Ok(to_statement(layout, classified, kind.import_source()))
    }

    /// Layout detection, field mapping, extraction and typing over one grid.
    pub fn normalize_grid(&self, grid: &RawGrid) -> Result<(LayoutKind, ClassifiedStatement), ImportError> {
        let layout = classify_layout(grid, self.sample_rows);
        let extractor = RowExtractor::new(grid.origin() == GridOrigin::Spreadsheet);

        let rows = match layout {
            LayoutKind::Unknown => return Err(ImportError::NoData),
            LayoutKind::Horizontal => match find_header_row(grid, self.sample_rows) {
                Some(header) => extractor.horizontal(grid, &header),
                None => {
                    debug!("no usable header row, reading lines as free text");
                    extractor.concatenated(grid)
                }
            },
            LayoutKind::SingleColumnStatement => match find_header_line(grid, self.sample_rows) {
                Some(header) => extractor.statement_lines(grid, &header),
                None => {
                    debug!("no usable header line, reading lines as free text");
                    extractor.concatenated(grid)
                }
            },
            LayoutKind::Vertical => extractor.vertical(grid),
            LayoutKind::SingleColumnConcatenated => extractor.concatenated(grid),
        };

        let classified = classify_rows(&rows);
        info!(
            layout = %layout,
            rows = rows.len(),
            transactions = classified.transactions.len(),
            credited = %classified.total_credited,
            debited = %classified.total_debited,
            "statement parsed"
        );
        Ok((layout, classified))
    }
}

fn to_statement(layout: LayoutKind, classified: ClassifiedStatement, source: ImportSource) -> NormalizedStatement {
    let transactions: Vec<ParsedTransaction> = classified
        .transactions
        .into_iter()
        .filter_map(to_parsed)
        .collect();
    let period = DateRange::from_bounds(
        transactions.iter().map(|t| t.transaction_date).min(),
        transactions.iter().map(|t| t.transaction_date).max(),
    );
    NormalizedStatement {
        transactions,
        layout: Some(layout),
        total_credited: Money::from_decimal(classified.total_credited),
        total_debited: Money::from_decimal(classified.total_debited),
        account_number: None,
        bank_name: None,
        period,
        source,
    }
}

fn to_parsed(tx: ClassifiedTransaction) -> Option<ParsedTransaction> {
    let transaction_type = match tx.flow {
        Flow::Received => TransactionType::Credit,
        Flow::Paid => TransactionType::Debit,
    };
    ParsedTransaction::new(tx.description, transaction_type, Money::from_decimal(tx.amount), tx.date)
        .ok()
        .map(|parsed| {
            parsed
                .with_reference(tx.reference.unwrap_or_default())
                .with_balance_after(tx.balance.map(Money::from_decimal))
        })
}
