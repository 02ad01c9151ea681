//! Gemini REST client and the ordered model fallback chain.
//!
//! The client is deliberately stateless: one prompt in, one text out.
//! Callers that expect structured output strip code fences and parse
//! via [`crate::json`] — that is their contract, not the client's.

use async_trait::async_trait;
use clarion_core::{ClarionError, Result};
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model-completion capability consumed by the analyzers.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String>;
}

/// Gemini generateContent request format
#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

/// Gemini generateContent response format
#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Client for the Generative Language REST API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Completion for GeminiClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", BASE_URL, model);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        tracing::debug!(model, "sending completion request");
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClarionError::Api(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            // 401/403 and the API's "API key not valid" 400 all mean the
            // credential itself is bad
            if status.as_u16() == 401
                || status.as_u16() == 403
                || body.contains("API key not valid")
            {
                return Err(ClarionError::InvalidCredential(format!(
                    "{}: {}",
                    status, body
                )));
            }
            return Err(ClarionError::Api(format!(
                "Model endpoint error {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ClarionError::Api(format!("Failed to parse response: {}", e)))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        Ok(text)
    }
}

/// Try each model in order and return the first non-empty response.
///
/// Every per-model failure is logged exactly once. An
/// [`ClarionError::InvalidCredential`] aborts the whole chain — retrying
/// other models with the same bad key cannot succeed. If the chain is
/// exhausted the last error comes back as `AllModelsFailed`.
pub async fn complete_any<C>(client: &C, models: &[&str], prompt: &str) -> Result<String>
where
    C: Completion + ?Sized,
{
    let mut last_err: Option<ClarionError> = None;
    for model in models {
        match client.complete(model, prompt).await {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => {
                tracing::warn!(model, "model returned an empty response");
                last_err = Some(ClarionError::Api(format!(
                    "{} returned an empty response",
                    model
                )));
            }
            Err(err @ ClarionError::InvalidCredential(_)) => {
                tracing::warn!(model, error = %err, "credential rejected, aborting fallback chain");
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(model, error = %err, "model attempt failed");
                last_err = Some(err);
            }
        }
    }
    Err(ClarionError::AllModelsFailed(
        last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no models configured".to_string()),
    ))
}
