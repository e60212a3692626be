//! AI extraction path: structured-output calls to a Gemini-style model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::fields::CandidateFields;
use crate::models::config::AiConfig;

const SYSTEM_PROMPT: &str = "You are an expert at extracting invoice information. \
Extract the invoice number, invoice date, total amount, and due date from the provided text. \
Dates must be formatted as YYYY-MM-DD.";

const USER_PREFIX: &str = "Extract invoice data from this text:\n\n";

/// Extracts candidate fields with a language model.
///
/// Never fails: every problem (missing key, transport, status, malformed
/// output) is logged and reported as empty fields.
#[async_trait]
pub trait AiExtractor: Send + Sync {
    /// Extract candidate fields from recognized text.
    async fn extract(&self, text: &str) -> CandidateFields;
}

/// Why a single AI call produced nothing. Logged, never returned.
#[derive(Debug, Error)]
enum AiCallError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Client for the `generateContent` endpoint with a JSON response schema.
#[derive(Clone)]
pub struct GeminiExtractor {
    client: Client,
    config: AiConfig,
    api_key: Option<String>,
}

impl GeminiExtractor {
    /// Create an extractor, resolving the API key from config or environment.
    pub fn new(config: AiConfig) -> Self {
        let api_key = config.resolve_api_key();
        Self {
            client: Client::new(),
            config,
            api_key,
        }
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Whether a credential is available.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request_body(&self, text: &str) -> GenerateContentRequest {
        let text = truncate_chars(text, self.config.max_input_chars);
        GenerateContentRequest {
            contents: vec![Content::text(format!("{}{}", USER_PREFIX, text))],
            system_instruction: Content::text(SYSTEM_PROMPT.to_string()),
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: invoice_schema(),
                temperature: 0.0,
            },
        }
    }

    async fn call(&self, api_key: &str, text: &str) -> Result<CandidateFields, AiCallError> {
        let request = self.request_body(text);
        debug!("Sending extraction request to model {}", self.config.model);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiCallError::Status { status, body });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AiCallError::Malformed(e.to_string()))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| AiCallError::Malformed("no text part in first candidate".to_string()))?;

        serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| AiCallError::Malformed(format!("model output is not invoice JSON: {}", e)))
    }
}

#[async_trait]
impl AiExtractor for GeminiExtractor {
    async fn extract(&self, text: &str) -> CandidateFields {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("No AI API key configured, skipping AI extraction");
            return CandidateFields::default();
        };

        match self.call(api_key, text).await {
            Ok(fields) => {
                info!("AI extraction returned data");
                fields
            }
            Err(e) => {
                warn!("AI extraction failed: {}", e);
                CandidateFields::default()
            }
        }
    }
}

/// Response schema: the four fields, in a fixed order.
fn invoice_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "invoice_number": { "type": "STRING" },
            "invoice_date": {
                "type": "STRING",
                "description": "The date the invoice was issued, in YYYY-MM-DD format."
            },
            "amount": {
                "type": "NUMBER",
                "description": "The total amount due on the invoice."
            },
            "due_date": {
                "type": "STRING",
                "description": "The payment due date, in YYYY-MM-DD format."
            }
        },
        "propertyOrdering": ["invoice_number", "invoice_date", "amount", "due_date"]
    })
}

/// First `max_chars` characters of `text`, never splitting a character.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Remove a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

impl Content {
    fn text(text: String) -> Self {
        Self {
            parts: vec![Part { text }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}
