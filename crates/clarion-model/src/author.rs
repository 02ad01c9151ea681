//! Author profile lookup and related-article discovery.

use crate::client::{complete_any, Completion};
use crate::json;
use clarion_core::{ClarionError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Models tried in order for author/related-article queries.
pub const LOOKUP_MODEL_ORDER: [&str; 2] = ["gemini-2.0-flash", "gemini-1.5-flash"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedArticle {
    pub title: String,
    pub url: Option<String>,
    pub source: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub name: String,
    pub bio: Option<String>,
    pub occupation: Option<String>,
    /// The model returns this as a string, a number, or null.
    pub age: Option<Value>,
    #[serde(default)]
    pub articles: Vec<RelatedArticle>,
    #[serde(default, rename = "socialLinks", alias = "social_links")]
    pub social_links: Vec<SocialLink>,
    #[serde(rename = "imageUrl", alias = "image_url")]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelatedEnvelope {
    #[serde(default)]
    articles: Vec<RelatedArticle>,
}

/// Look up a journalist's public profile. No safe default exists, so a
/// missing credential or unparseable output is a hard error.
pub async fn fetch_author_info<C>(client: Option<&C>, author_name: &str) -> Result<AuthorProfile>
where
    C: Completion + ?Sized,
{
    let client = client.ok_or(ClarionError::CredentialMissing)?;

    let prompt = format!(
        r#"Search for information about the journalist/author "{author_name}". Provide:
1. A brief biography (2-3 sentences)
2. Their occupation/role
3. Age (if publicly available)
4. List of 3-5 notable articles they've written (with titles and URLs if available)
5. Any social media or professional profile links (LinkedIn, Twitter, etc.)
6. A URL to a publicly available profile picture of the author (if found)

Format your response as a JSON object with this structure:
{{
  "name": "{author_name}",
  "bio": "brief biography",
  "occupation": "their role/title",
  "age": "age if available, otherwise null",
  "articles": [
    {{"title": "article title", "url": "article url", "source": "publication", "date": "publication date"}}
  ],
  "socialLinks": [
    {{"platform": "platform name", "url": "profile url"}}
  ],
  "imageUrl": "url to author image or null"
}}

If you cannot find specific information, use null for that field. Only include verified, publicly available information. Return only valid JSON."#
    );

    let model_refs: Vec<&str> = LOOKUP_MODEL_ORDER.to_vec();
    let raw = complete_any(client, &model_refs, &prompt).await?;
    let value = json::extract_object(&raw)?;
    serde_json::from_value(value).map_err(|e| ClarionError::MalformedModelOutput(e.to_string()))
}

/// Find recent coverage of the same topic. Failures other than a missing
/// credential are swallowed into an empty list — a broken sidebar is not
/// worth breaking the page for.
pub async fn fetch_related_articles<C>(
    client: Option<&C>,
    title: &str,
    source: Option<&str>,
) -> Result<Vec<RelatedArticle>>
where
    C: Completion + ?Sized,
{
    let client = client.ok_or(ClarionError::CredentialMissing)?;

    let from_source = source.map(|s| format!(" from {}", s)).unwrap_or_default();
    let prompt = format!(
        r#"Find 3-5 real, recent news articles that cover the same topic as this article: "{title}"{from_source}.
Try to find articles from different sources with varying political perspectives if possible.

Return a JSON object with this structure:
{{
  "articles": [
    {{
      "title": "Article Title",
      "url": "Article URL",
      "source": "News Source Name",
      "date": "Publication Date (approximate is fine)"
    }}
  ]
}}

Return ONLY valid JSON. If you cannot find specific articles, return an empty array."#
    );

    let outcome = async {
        let raw = client.complete(LOOKUP_MODEL_ORDER[0], &prompt).await?;
        let value = json::extract_object(&raw)?;
        let envelope: RelatedEnvelope = serde_json::from_value(value)
            .map_err(|e| ClarionError::MalformedModelOutput(e.to_string()))?;
        Ok::<_, ClarionError>(envelope.articles)
    }
    .await;

    match outcome {
        Ok(articles) => Ok(articles),
        Err(err) => {
            tracing::warn!(error = %err, "related articles lookup failed");
            Ok(Vec::new())
        }
    }
}
