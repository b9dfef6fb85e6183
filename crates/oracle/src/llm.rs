use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::backend::{CategorizationOracle, OracleError, SmsOracle, StatementOracle};
use crate::json::parse_json;
use crate::types::{CategorizationRequest, CategorizationResponse, SmsExtraction, StatementExtraction};

const STATEMENT_PROMPT: &str = "You extract transactions from bank statements. Reply with JSON only: \
{\"transactions\":[{\"date\":\"DD/MM/YYYY\",\"type\":\"credit|debit\",\"amount\":0.0,\"raw_narration\":\"\",\
\"bank_reference\":\"\",\"balance_after\":0.0,\"party_name\":null,\"bank_name\":null}],\
\"account_number\":null,\"bank_name\":null,\"statement_from\":null,\"statement_to\":null}. \
Amounts are positive; use type for direction.";

const SMS_PROMPT: &str = "You read one bank transaction SMS. Reply with JSON only: \
{\"type\":\"credit|debit\",\"amount\":0.0,\"bank_reference\":\"\",\"party_name\":null,\
\"transaction_date\":\"DD-MM-YY\",\"balance_after\":null,\"bank_name\":null}.";

const CATEGORIZE_PROMPT: &str = "You categorize business bank transactions into the given catalog of \
heads and sub-heads. Only use names from the catalog. Reply with JSON only: \
{\"narration_head_name\":\"\",\"narration_sub_head_name\":\"\",\"narration_note\":\"\",\
\"party_name\":null,\"confidence\":0.0,\"reasoning\":\"\",\"alternatives\":[]}.";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
            max_tokens: 4096,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageOut,
}

#[derive(Debug, Deserialize)]
struct MessageOut {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Result<String, OracleError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| OracleError::Malformed("empty completion".to_string()))
    }
}

/// Chat-completions backend for all three oracles.
#[derive(Debug, Clone)]
pub struct LlmOracle {
    config: LlmConfig,
    client: reqwest::Client,
}

impl LlmOracle {
    pub fn new(config: LlmConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn is_available(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    fn body(&self, system: &str, user: Value) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
            messages: vec![
                json!({ "role": "system", "content": system }),
                json!({ "role": "user", "content": user }),
            ],
        }
    }

    async fn complete(&self, system: &str, user: Value) -> Result<String, OracleError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| OracleError::Unavailable("no API key configured".to_string()))?;

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        debug!(%url, model = %self.config.model, "oracle request");
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {key}"))
            .json(&self.body(system, user))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Status { status: status.as_u16(), body });
        }
        let out: ChatResponse = resp.json().await?;
        out.into_text()
    }
}

fn pdf_part(document: &[u8]) -> Value {
    let encoded = base64::engine::general_purpose::STANDARD.encode(document);
    json!({
        "type": "file",
        "file": {
            "filename": "statement.pdf",
            "file_data": format!("data:application/pdf;base64,{encoded}"),
        }
    })
}

#[async_trait]
impl StatementOracle for LlmOracle {
    async fn extract_statement(&self, document: &[u8]) -> Result<StatementExtraction, OracleError> {
        let user = json!([
            { "type": "text", "text": "Extract every transaction from this statement." },
            pdf_part(document),
        ]);
        parse_json(&self.complete(STATEMENT_PROMPT, user).await?)
    }
}

#[async_trait]
impl SmsOracle for LlmOracle {
    async fn extract_sms(&self, text: &str) -> Result<SmsExtraction, OracleError> {
        parse_json(&self.complete(SMS_PROMPT, Value::String(text.to_string())).await?)
    }
}

#[async_trait]
impl CategorizationOracle for LlmOracle {
    async fn categorize(
        &self,
        request: &CategorizationRequest,
    ) -> Result<CategorizationResponse, OracleError> {
        let user = Value::String(serde_json::to_string(request)?);
        parse_json(&self.complete(CATEGORIZE_PROMPT, user).await?)
    }
}
