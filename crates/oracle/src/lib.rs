pub mod backend;
pub mod json;
pub mod llm;
pub mod types;

pub use backend::{CategorizationOracle, MockOracle, OracleError, SmsOracle, StatementOracle};
pub use json::{parse_json, strip_json_fences};
pub use llm::{LlmConfig, LlmOracle};
pub use types::{
    CatalogEntry, CategorizationRequest, CategorizationResponse, ExtractedTransaction,
    SmsExtraction, StatementExtraction,
};
