//! Debate card generation: verbatim excerpt-plus-citation artifacts.
//!
//! Unlike bias scoring there is no safe default here — fabricated cards
//! would be worse than an error — so failures propagate to the caller.

use crate::bias::MAX_PROMPT_TEXT_CHARS;
use crate::client::{complete_any, Completion};
use crate::json;
use clarion_core::{ClarionError, DebateCard, Result};
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;

/// Models tried in order for debate card generation.
pub const DEBATE_MODEL_ORDER: [&str; 2] = ["gemini-2.0-flash", "gemini-1.5-flash"];

/// Random base36 token for debate record ids.
pub fn random_token() -> String {
    let mut rng = rand::thread_rng();
    (0..13)
        .map(|_| char::from_digit(rng.gen_range(0..36), 36).unwrap())
        .collect()
}

/// Inputs for one card generation run.
#[derive(Debug, Clone)]
pub struct DebateCardRequest {
    pub text: String,
    pub purpose: String,
    pub title: String,
    pub author: Option<String>,
    pub source: Option<String>,
    pub date: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardsEnvelope {
    #[serde(default)]
    cards: Vec<DebateCard>,
}

pub struct DebateCardGenerator {
    client: Option<Arc<dyn Completion>>,
    models: Vec<String>,
}

impl DebateCardGenerator {
    pub fn new(client: Option<Arc<dyn Completion>>) -> Self {
        Self {
            client,
            models: DEBATE_MODEL_ORDER.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Generate 2-4 cards from the article. Errors on missing credential,
    /// exhausted fallback chain, or unparseable output.
    pub async fn generate(&self, request: &DebateCardRequest) -> Result<Vec<DebateCard>> {
        let client = self.client.as_deref().ok_or(ClarionError::CredentialMissing)?;

        let prompt = Self::build_prompt(request);
        let model_refs: Vec<&str> = self.models.iter().map(String::as_str).collect();
        let raw = complete_any(client, &model_refs, &prompt).await?;

        let value = json::extract_object(&raw)?;
        let envelope: CardsEnvelope = serde_json::from_value(value)
            .map_err(|e| ClarionError::MalformedModelOutput(e.to_string()))?;
        Ok(envelope.cards)
    }

    fn build_prompt(request: &DebateCardRequest) -> String {
        let truncated: String = request.text.chars().take(MAX_PROMPT_TEXT_CHARS).collect();
        format!(
            r#"Act as a competitive policy debate researcher. Generate 2-4 "debate cards" from the following article text that support the following purpose: "{purpose}".

Format Requirements for each card:
1. **Tag**: A single sentence summarizing the argument made by the evidence. Must be punchy and strategic.
2. **Cite**: Use the author "{author}", the date "{date}", and source "{source}". Format as "Author, Date (Source)".
3. **Body**: This MUST be a continuous, EXACT, VERBATIM segment (at least one full paragraph) from the article. DO NOT change a single character, punctuation, or capitalization.
4. **Highlights**: Identify specific phrases or full clauses within the Body that should be emphasized. **CRITICAL**: In high-level debate, highlights must form a coherent, condensed version of the argument that can be spoken aloud. Highlight long, readable phrases and complete sentences rather than isolated single words. Reading ONLY the highlighted words should sound like a natural, persuasive speech.

**CRITICAL**: The "body" will be compared against the original article text for validation. If it is not exact, the card will be rejected.

Article Title: {title}
Article Text: {text}

Return a JSON object with this structure:
{{
  "cards": [
    {{
      "tag": "Short summary",
      "cite": "Author, Date (Source)",
      "body": "Exact text from article",
      "highlights": ["word1", "phrase two", "word3"]
    }}
  ]
}}

Only use text from the article. Ensure "body" is an exact match for a segment of the article. Return ONLY valid JSON."#,
            purpose = request.purpose,
            author = request.author.as_deref().unwrap_or("Unknown"),
            date = request.date.as_deref().unwrap_or("n.d."),
            source = request.source.as_deref().unwrap_or("Unknown"),
            title = request.title,
            text = truncated,
        )
    }
}
