use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Minimum article length for extraction. Anything shorter is noise
/// (cookie banners, paywall stubs) and is rejected before analysis.
pub const MIN_ARTICLE_TEXT_CHARS: usize = 100;

/// Current time as epoch milliseconds. All record timestamps use this unit.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Structured political/rhetorical bias metrics for one article.
///
/// Bipolar axes live in [-100, 100] with 0 neutral; unipolar quality
/// metrics live in [0, 100]. Every numeric field is clamped to its range
/// at ingestion — a score that came through [`BiasScore::from_json`] is
/// always in range, whatever the model returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasScore {
    /// -100 = far left, 0 = center, 100 = far right.
    pub left_right: f64,

    /// -100 = authoritarian, 0 = balanced, 100 = libertarian.
    pub auth_lib: f64,

    /// -100 = nationalist, 0 = balanced, 100 = globalist.
    pub nat_glob: f64,

    /// -100 = calm/measured, 100 = urgent/alarming.
    pub tone_calm_urgent: f64,

    /// 0 = very opinionated, 100 = very factual and neutral.
    pub objectivity: f64,

    /// 0 = dry/restrained, 100 = highly sensational.
    pub sensationalism: f64,

    /// 0 = confusing or opaque, 100 = very clear and well-structured.
    pub clarity: f64,

    /// Model's confidence in its own analysis, 0-100.
    pub confidence: f64,

    /// Short free-text summary of why the scores are what they are.
    pub reasoning: String,
}

/// Reasoning string attached to the neutral fallback score. Shown to the
/// user, so it has to say how to fix the situation.
pub const NEUTRAL_REASONING: &str =
    "AI analysis unavailable. Add an API key in settings to enable.";

fn bipolar(value: &Value, key: &str) -> f64 {
    value
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .clamp(-100.0, 100.0)
}

fn unipolar(value: &Value, key: &str) -> f64 {
    value
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or(50.0)
        .clamp(0.0, 100.0)
}

impl BiasScore {
    /// Build a score from a parsed model response, clamping every field
    /// and substituting the documented neutral default (0 for bipolar,
    /// 50 for unipolar) when a field is absent or not a number.
    pub fn from_json(value: &Value) -> Self {
        BiasScore {
            left_right: bipolar(value, "left_right"),
            auth_lib: bipolar(value, "auth_lib"),
            nat_glob: bipolar(value, "nat_glob"),
            tone_calm_urgent: bipolar(value, "tone_calm_urgent"),
            objectivity: unipolar(value, "objectivity"),
            sensationalism: unipolar(value, "sensationalism"),
            clarity: unipolar(value, "clarity"),
            confidence: unipolar(value, "confidence"),
            reasoning: value
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or("Analysis unavailable")
                .to_string(),
        }
    }

    /// The degrade-gracefully score returned when no credential is
    /// configured or every model failed: all midpoints, zero confidence.
    pub fn neutral() -> Self {
        BiasScore {
            left_right: 0.0,
            auth_lib: 0.0,
            nat_glob: 0.0,
            tone_calm_urgent: 0.0,
            objectivity: 50.0,
            sensationalism: 50.0,
            clarity: 50.0,
            confidence: 0.0,
            reasoning: NEUTRAL_REASONING.to_string(),
        }
    }
}

/// One persisted analysis. URL is the unique key; re-analysis overwrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub source: Option<String>,
    pub bias: BiasScore,
    /// Epoch milliseconds at the time of the fresh computation.
    pub timestamp: i64,
    /// Whether the analysis was served from cache when this record was
    /// built. Persisted records always carry `false`.
    pub cached: bool,
}

/// What the coordinator hands back to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub bias: BiasScore,
    pub cached: bool,
    pub timestamp: i64,
}

/// A structured excerpt-plus-citation artifact for argumentation use.
/// `body` is verbatim article text; `highlights` are substrings of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateCard {
    pub tag: String,
    pub cite: String,
    pub body: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// One generation batch of debate cards. History keeps the most recent
/// [`crate::storage::DEBATE_HISTORY_CAP`] of these, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateRecord {
    /// Random base36 token, not a URL — several batches can share a URL.
    pub id: String,
    pub url: String,
    pub article_title: String,
    pub purpose: String,
    pub cards: Vec<DebateCard>,
    pub timestamp: i64,
}

/// Storage statistics for the settings/history views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub article_count: u64,
    pub debate_count: u64,
    pub oldest_timestamp: Option<i64>,
    pub newest_timestamp: Option<i64>,
    pub db_size_bytes: u64,
}

/// Article handed to the core by the text-extraction collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub title: String,
    pub text: String,
    pub url: String,
    pub source: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
}

impl ExtractedArticle {
    /// Accept raw extraction output, or reject it when the text is below
    /// the [`MIN_ARTICLE_TEXT_CHARS`] threshold. Callers treat `None` as
    /// "could not extract" and never reach the coordinator.
    pub fn from_parts(
        title: impl Into<String>,
        text: &str,
        url: impl Into<String>,
        source: Option<String>,
        author: Option<String>,
        date: Option<String>,
    ) -> Option<Self> {
        let text = text.trim();
        if text.chars().count() < MIN_ARTICLE_TEXT_CHARS {
            return None;
        }
        let excerpt: String = text.chars().take(300).collect();
        let excerpt = if excerpt.chars().count() < text.chars().count() {
            format!("{}...", excerpt.trim_end())
        } else {
            excerpt
        };
        Some(ExtractedArticle {
            title: title.into(),
            text: text.to_string(),
            url: url.into(),
            source,
            excerpt: Some(excerpt),
            author,
            date,
        })
    }
}
