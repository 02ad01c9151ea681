//! The JSON command surface: one request object in, one response object
//! out. Message shape is `{"type": "...", "payload": {...}}`.

use crate::coordinator::Coordinator;
use clarion_core::{ClarionError, ExtractedArticle, Result, Store};
use clarion_model::DebateCardRequest;
use serde::Deserialize;
use serde_json::{json, Value};

const KNOWN_TYPES: [&str; 11] = [
    "ANALYZE_ARTICLE",
    "GET_CACHED_ANALYSIS",
    "GET_ARTICLE_HISTORY",
    "DELETE_ARTICLE",
    "CLEAR_HISTORY",
    "GET_DEBATE_HISTORY",
    "DELETE_DEBATE_RECORD",
    "GENERATE_DEBATE_CARDS",
    "FETCH_AUTHOR_INFO",
    "FETCH_RELATED_ARTICLES",
    "GET_STORAGE_STATS",
];

/// Raw extraction output as it arrives over the wire. Gets the same
/// minimum-length gate as [`ExtractedArticle::from_parts`].
#[derive(Debug, Clone, Deserialize)]
pub struct ArticlePayload {
    pub title: String,
    pub text: String,
    pub url: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebateCardPayload {
    pub text: String,
    pub purpose: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<DebateCardPayload> for DebateCardRequest {
    fn from(p: DebateCardPayload) -> Self {
        DebateCardRequest {
            text: p.text,
            purpose: p.purpose,
            title: p.title,
            author: p.author,
            source: p.source,
            date: p.date,
            url: p.url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    #[serde(rename = "ANALYZE_ARTICLE")]
    AnalyzeArticle(ArticlePayload),
    #[serde(rename = "GET_CACHED_ANALYSIS")]
    GetCachedAnalysis { url: String },
    #[serde(rename = "GET_ARTICLE_HISTORY")]
    GetArticleHistory,
    #[serde(rename = "DELETE_ARTICLE")]
    DeleteArticle { url: String },
    #[serde(rename = "CLEAR_HISTORY")]
    ClearHistory,
    #[serde(rename = "GET_DEBATE_HISTORY")]
    GetDebateHistory,
    #[serde(rename = "DELETE_DEBATE_RECORD")]
    DeleteDebateRecord { id: String },
    #[serde(rename = "GENERATE_DEBATE_CARDS")]
    GenerateDebateCards(DebateCardPayload),
    #[serde(rename = "FETCH_AUTHOR_INFO")]
    FetchAuthorInfo { author: String },
    #[serde(rename = "FETCH_RELATED_ARTICLES")]
    FetchRelatedArticles {
        title: String,
        #[serde(default)]
        source: Option<String>,
    },
    #[serde(rename = "GET_STORAGE_STATS")]
    GetStorageStats,
}

impl Command {
    /// Parse one request line. An unrecognized `type` is reported as such;
    /// a recognized type with a bad payload is a validation error.
    pub fn parse(line: &str) -> Result<Self> {
        match serde_json::from_str::<Command>(line) {
            Ok(command) => Ok(command),
            Err(err) => {
                if let Ok(value) = serde_json::from_str::<Value>(line) {
                    if let Some(kind) = value.get("type").and_then(Value::as_str) {
                        if !KNOWN_TYPES.contains(&kind) {
                            return Err(ClarionError::UnknownCommand(kind.to_string()));
                        }
                    }
                }
                Err(ClarionError::Validation(err.to_string()))
            }
        }
    }
}

/// Handle one request line and produce the response object. Failures come
/// back as `{"error": "..."}` rather than an Err — the transport always
/// has something to write.
pub async fn dispatch<S: Store + 'static>(coordinator: &Coordinator<S>, line: &str) -> Value {
    match handle(coordinator, line).await {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }),
    }
}

async fn handle<S: Store + 'static>(coordinator: &Coordinator<S>, line: &str) -> Result<Value> {
    let response = match Command::parse(line)? {
        Command::AnalyzeArticle(payload) => {
            let article = ExtractedArticle::from_parts(
                payload.title,
                &payload.text,
                payload.url,
                payload.source,
                payload.author,
                payload.date,
            )
            .ok_or_else(|| {
                ClarionError::Validation("article text is too short to analyze".to_string())
            })?;
            let outcome = coordinator.analyze_article(&article).await?;
            serde_json::to_value(outcome)?
        }
        Command::GetCachedAnalysis { url } => {
            serde_json::to_value(coordinator.cached_analysis(&url))?
        }
        Command::GetArticleHistory => serde_json::to_value(coordinator.article_history())?,
        Command::DeleteArticle { url } => {
            coordinator.delete_article(&url)?;
            json!({ "success": true })
        }
        Command::ClearHistory => {
            coordinator.clear_history()?;
            json!({ "success": true })
        }
        Command::GetDebateHistory => serde_json::to_value(coordinator.debate_history())?,
        Command::DeleteDebateRecord { id } => {
            coordinator.delete_debate(&id)?;
            json!({ "success": true })
        }
        Command::GenerateDebateCards(payload) => {
            let cards = coordinator.generate_debate_cards(&payload.into()).await?;
            json!({ "cards": cards })
        }
        Command::FetchAuthorInfo { author } => {
            serde_json::to_value(coordinator.author_info(&author).await?)?
        }
        Command::FetchRelatedArticles { title, source } => {
            let articles = coordinator.related_articles(&title, source.as_deref()).await?;
            json!({ "articles": articles })
        }
        Command::GetStorageStats => serde_json::to_value(coordinator.stats())?,
    };
    Ok(response)
}
