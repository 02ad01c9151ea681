//! The analysis coordinator: cache-first orchestration of scoring,
//! persistence, and background maintenance.

use clarion_core::{
    now_ms, AnalysisOutcome, AnalysisRecord, DebateCard, DebateRecord, ExtractedArticle, Result,
    Store, StoreStats,
};
use clarion_model::{
    fetch_author_info, fetch_related_articles, random_token, AuthorProfile, BiasAnalyzer,
    Completion, DebateCardGenerator, DebateCardRequest, RelatedArticle,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// A cached analysis is served without recomputation for this long.
pub const ANALYSIS_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Analyses older than this are swept out by the background eviction pass.
pub const MAX_RECORD_AGE_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Freshness check for a stored analysis timestamp. A record exactly at
/// the TTL boundary is stale.
pub fn is_fresh(timestamp: i64, now: i64) -> bool {
    now - timestamp < ANALYSIS_TTL_MS
}

/// Orchestrates the analyze flow and fronts the store for the command
/// surface.
///
/// Error policy: reads degrade (a failed cache read is a miss, a failed
/// history read is an empty list) while writes and deletes propagate —
/// silently losing a just-computed analysis would defeat the cache.
pub struct Coordinator<S: Store + 'static> {
    store: Arc<S>,
    bias: BiasAnalyzer,
    debate: DebateCardGenerator,
    client: Option<Arc<dyn Completion>>,
    // Per-URL gates so concurrent requests for the same article compute once
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: Store + 'static> Coordinator<S> {
    pub fn new(store: Arc<S>, client: Option<Arc<dyn Completion>>) -> Self {
        Self {
            bias: BiasAnalyzer::new(client.clone()),
            debate: DebateCardGenerator::new(client.clone()),
            store,
            client,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Analyze an article, serving a fresh cached score when one exists.
    ///
    /// Concurrent calls for the same URL are coalesced behind a per-URL
    /// gate: the first computes, the rest find the record in cache. A
    /// successful analysis also kicks off a detached eviction sweep for
    /// records past [`MAX_RECORD_AGE_MS`].
    pub async fn analyze_article(&self, article: &ExtractedArticle) -> Result<AnalysisOutcome> {
        let gate = {
            let mut map = self.in_flight.lock().await;
            map.entry(article.url.clone()).or_default().clone()
        };
        let guard = gate.lock().await;
        let outcome = self.analyze_locked(article).await;
        drop(guard);

        let mut map = self.in_flight.lock().await;
        if let Some(entry) = map.get(&article.url) {
            // Only the map's handle and ours remain: nobody is waiting
            if Arc::strong_count(entry) <= 2 {
                map.remove(&article.url);
            }
        }

        outcome
    }

    async fn analyze_locked(&self, article: &ExtractedArticle) -> Result<AnalysisOutcome> {
        let now = now_ms();

        let cached = match self.store.get_analysis(&article.url) {
            Ok(found) => found,
            Err(err) => {
                warn!(url = %article.url, error = %err, "cache read failed, treating as miss");
                None
            }
        };
        if let Some(record) = cached {
            if is_fresh(record.timestamp, now) {
                return Ok(AnalysisOutcome {
                    bias: record.bias,
                    cached: true,
                    timestamp: record.timestamp,
                });
            }
        }

        let bias = self.bias.analyze(&article.text).await;
        let record = AnalysisRecord {
            url: article.url.clone(),
            title: article.title.clone(),
            author: article.author.clone(),
            source: article.source.clone(),
            bias: bias.clone(),
            timestamp: now,
            cached: false,
        };
        self.store.put_analysis(&record)?;

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match store.evict_older_than(MAX_RECORD_AGE_MS) {
                Ok(0) => {}
                Ok(removed) => info!(removed, "evicted stale analyses"),
                Err(err) => warn!(error = %err, "eviction sweep failed"),
            }
        });

        Ok(AnalysisOutcome {
            bias,
            cached: false,
            timestamp: now,
        })
    }

    /// Fetch a stored analysis without any freshness check. The history
    /// view shows stale records; only the analyze flow enforces the TTL.
    pub fn cached_analysis(&self, url: &str) -> Option<AnalysisRecord> {
        match self.store.get_analysis(url) {
            Ok(found) => found,
            Err(err) => {
                warn!(url, error = %err, "cache read failed");
                None
            }
        }
    }

    pub fn article_history(&self) -> Vec<AnalysisRecord> {
        match self.store.list_analyses() {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "history read failed");
                Vec::new()
            }
        }
    }

    pub fn delete_article(&self, url: &str) -> Result<()> {
        self.store.delete_analysis(url)
    }

    pub fn clear_history(&self) -> Result<()> {
        self.store.clear_analyses()
    }

    pub fn debate_history(&self) -> Vec<DebateRecord> {
        match self.store.list_debates() {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "debate history read failed");
                Vec::new()
            }
        }
    }

    pub fn delete_debate(&self, id: &str) -> Result<()> {
        self.store.delete_debate(id)
    }

    /// Generate debate cards and return them immediately; the history
    /// record is saved on a detached task so a slow disk never delays the
    /// response.
    pub async fn generate_debate_cards(
        &self,
        request: &DebateCardRequest,
    ) -> Result<Vec<DebateCard>> {
        let cards = self.debate.generate(request).await?;

        let record = DebateRecord {
            id: random_token(),
            url: request.url.clone().unwrap_or_else(|| "unknown".to_string()),
            article_title: request.title.clone(),
            purpose: request.purpose.clone(),
            cards: cards.clone(),
            timestamp: now_ms(),
        };
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(err) = store.prepend_debate(&record) {
                warn!(id = %record.id, error = %err, "failed to save debate record");
            }
        });

        Ok(cards)
    }

    pub async fn author_info(&self, author: &str) -> Result<AuthorProfile> {
        fetch_author_info(self.client.as_deref(), author).await
    }

    pub async fn related_articles(
        &self,
        title: &str,
        source: Option<&str>,
    ) -> Result<Vec<RelatedArticle>> {
        fetch_related_articles(self.client.as_deref(), title, source).await
    }

    pub fn stats(&self) -> StoreStats {
        match self.store.stats() {
            Ok(stats) => stats,
            Err(err) => {
                warn!(error = %err, "stats read failed");
                StoreStats::default()
            }
        }
    }
}
