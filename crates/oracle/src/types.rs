use std::str::FromStr;

use bankline_core::{Money, TransactionType};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// One head and its active sub-heads, by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub head_name: String,
    pub sub_head_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizationRequest {
    pub narration: String,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub date: NaiveDate,
    pub catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizationResponse {
    #[serde(default)]
    pub narration_head_name: String,
    #[serde(default)]
    pub narration_sub_head_name: Option<String>,
    #[serde(default)]
    pub narration_note: Option<String>,
    #[serde(default)]
    pub party_name: Option<String>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

/// A transaction row as returned by the document extraction oracle.
/// Fields are kept loose; validation happens on conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTransaction {
    #[serde(default)]
    pub date: String,
    #[serde(rename = "type", default)]
    pub transaction_type: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub raw_narration: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bank_reference: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub balance_after: Option<Decimal>,
    #[serde(default)]
    pub party_name: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementExtraction {
    #[serde(default)]
    pub transactions: Vec<ExtractedTransaction>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub statement_from: Option<String>,
    #[serde(default)]
    pub statement_to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmsExtraction {
    #[serde(rename = "type", default)]
    pub transaction_type: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bank_reference: Option<String>,
    #[serde(default)]
    pub party_name: Option<String>,
    #[serde(default)]
    pub transaction_date: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub balance_after: Option<Decimal>,
    #[serde(default)]
    pub bank_name: Option<String>,
}

/// Accepts `15000.5`, `"15,000.50"`, `"INR 15000"` or `null`. Anything
/// unreadable becomes `None` rather than failing the whole document.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)).ok()
        }
        serde_json::Value::String(s) => {
            let cleaned: String = s
                .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '-')
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    })
}

/// Reference numbers sometimes come back as JSON numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
