//! Statement parsing: grid loading, layout detection, field mapping, row
//! extraction and typing, plus the tier-1 rule engine.

pub mod classify;
pub mod extract;
pub mod extraction;
pub mod fields;
pub mod grid;
pub mod layout;
pub mod normalize;
pub mod rules;
pub(crate) mod text;

pub use classify::{classify_row, classify_rows, guess_flow, ClassifiedStatement, ClassifiedTransaction};
pub use extract::{Flow, RawTransactionRow, RowExtractor};
pub use extraction::{parse_sms, statement_from_extraction, transaction_from_sms};
pub use fields::{Field, FieldMap, HeaderMatch};
pub use grid::{GridError, GridOrigin, RawGrid};
pub use layout::{classify_layout, LayoutKind};
pub use normalize::{FileKind, ImportError, NormalizedStatement, StatementNormalizer, DEFAULT_SAMPLE_ROWS};
pub use rules::{parse_rules_toml, RuleError, RuleInput, RuleMatch, RuleMatchEngine};
pub use text::{parse_amount, parse_date};
