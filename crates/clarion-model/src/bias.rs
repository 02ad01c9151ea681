//! Political bias analysis over the completion capability.

use crate::client::Completion;
use crate::json;
use clarion_core::{BiasScore, ClarionError, Result};
use std::sync::Arc;

/// Prompts are bounded to this many characters of article text.
pub const MAX_PROMPT_TEXT_CHARS: usize = 15_000;

/// Models tried in order for bias scoring.
pub const BIAS_MODEL_ORDER: [&str; 3] = [
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-2.5-flash-lite",
];

const PROMPT: &str = r#"Analyze this article and return metrics people care about. Return ONLY valid JSON with these exact keys (no markdown, no code blocks):
{
  "left_right": number (-100 = far left, 0 = center, 100 = far right),
  "auth_lib": number (-100 = authoritarian, 0 = balanced, 100 = libertarian),
  "nat_glob": number (-100 = nationalist, 0 = balanced, 100 = globalist),
  "objectivity": number (0 = very opinionated, 100 = very factual and neutral),
  "sensationalism": number (0 = dry/restrained, 100 = highly sensational/clickbait),
  "clarity": number (0 = confusing or opaque, 100 = very clear and well-structured),
  "tone_calm_urgent": number (-100 = very calm/measured, 100 = very urgent/alarming),
  "confidence": number (0-100, how confident you are in this analysis),
  "reasoning": string (concise, punchy summary; max 2 sentences)
}

Article text:
"#;

/// Scores article text, degrading to [`BiasScore::neutral`] instead of
/// failing: a missing credential, an exhausted fallback chain, and
/// malformed output all yield the neutral score. Malformed output from
/// one model falls through to the next model in the chain.
pub struct BiasAnalyzer {
    client: Option<Arc<dyn Completion>>,
    models: Vec<String>,
}

impl BiasAnalyzer {
    pub fn new(client: Option<Arc<dyn Completion>>) -> Self {
        Self {
            client,
            models: BIAS_MODEL_ORDER.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Analyze the given text. Never errors; see the type docs.
    pub async fn analyze(&self, text: &str) -> BiasScore {
        let Some(client) = &self.client else {
            // Credential-missing short-circuit: no network attempt at all
            return BiasScore::neutral();
        };

        let truncated: String = text.chars().take(MAX_PROMPT_TEXT_CHARS).collect();
        let prompt = format!("{}{}", PROMPT, truncated);

        let mut last_err = None;
        for model in &self.models {
            match Self::score_with(client.as_ref(), model, &prompt).await {
                Ok(score) => return score,
                Err(err @ ClarionError::InvalidCredential(_)) => {
                    last_err = Some(err);
                    break;
                }
                Err(err) => {
                    tracing::warn!(model, error = %err, "bias analysis attempt failed");
                    last_err = Some(err);
                }
            }
        }
        if let Some(err) = last_err {
            tracing::error!(error = %err, "bias analysis failed on every model");
        }
        BiasScore::neutral()
    }

    async fn score_with(client: &dyn Completion, model: &str, prompt: &str) -> Result<BiasScore> {
        let raw = client.complete(model, prompt).await?;
        if raw.trim().is_empty() {
            return Err(ClarionError::Api(format!(
                "{} returned an empty response",
                model
            )));
        }
        let value = json::extract_object(&raw)?;
        Ok(BiasScore::from_json(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::ScriptedCompletion;
    use clarion_core::NEUTRAL_REASONING;

    fn models(list: &[&str]) -> Vec<String> {
        list.iter().map(|m| m.to_string()).collect()
    }

    #[tokio::test]
    async fn test_parses_and_clamps_model_output() {
        let client = ScriptedCompletion::new().ok(
            "m1",
            r#"{"left_right": 130, "objectivity": 80, "confidence": 90, "reasoning": "lean"}"#,
        );
        let analyzer = BiasAnalyzer::new(Some(Arc::new(client))).with_models(models(&["m1"]));

        let score = analyzer.analyze("some article text").await;
        assert_eq!(score.left_right, 100.0);
        assert_eq!(score.objectivity, 80.0);
        assert_eq!(score.reasoning, "lean");
    }

    #[tokio::test]
    async fn test_no_credential_returns_neutral_without_network() {
        let analyzer = BiasAnalyzer::new(None);
        let score = analyzer.analyze("some article text").await;
        assert_eq!(score.confidence, 0.0);
        assert_eq!(score.reasoning, NEUTRAL_REASONING);
    }

    #[tokio::test]
    async fn test_malformed_output_falls_through_to_next_model() {
        let client = ScriptedCompletion::new()
            .ok("m1", "I refuse to answer in JSON.")
            .ok("m2", r#"{"left_right": -40, "reasoning": "ok"}"#);
        let analyzer =
            BiasAnalyzer::new(Some(Arc::new(client))).with_models(models(&["m1", "m2"]));

        let score = analyzer.analyze("text").await;
        assert_eq!(score.left_right, -40.0);
    }

    #[tokio::test]
    async fn test_exhausted_chain_degrades_to_neutral() {
        let client = ScriptedCompletion::new()
            .ok("m1", "garbage")
            .ok("m2", "more garbage");
        let analyzer =
            BiasAnalyzer::new(Some(Arc::new(client))).with_models(models(&["m1", "m2"]));

        let score = analyzer.analyze("text").await;
        assert_eq!(score.reasoning, NEUTRAL_REASONING);
        assert_eq!(score.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_fenced_output_is_recovered() {
        let client = ScriptedCompletion::new()
            .ok("m1", "```json\n{\"left_right\": 10, \"reasoning\": \"r\"}\n```");
        let analyzer = BiasAnalyzer::new(Some(Arc::new(client))).with_models(models(&["m1"]));

        let score = analyzer.analyze("text").await;
        assert_eq!(score.left_right, 10.0);
    }
}
