//! Model access for clarion: the Gemini client, ordered fallback
//! chains, and the analyzers built on top of them.

pub mod author;
pub mod bias;
pub mod client;
pub mod debate;
pub mod json;

pub use author::{
    fetch_author_info, fetch_related_articles, AuthorProfile, RelatedArticle, SocialLink,
    LOOKUP_MODEL_ORDER,
};
pub use bias::{BiasAnalyzer, BIAS_MODEL_ORDER, MAX_PROMPT_TEXT_CHARS};
pub use client::{complete_any, Completion, GeminiClient};
pub use debate::{
    random_token, DebateCardGenerator, DebateCardRequest, DEBATE_MODEL_ORDER,
};
