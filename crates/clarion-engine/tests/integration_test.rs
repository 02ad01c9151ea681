use async_trait::async_trait;
use clarion_core::storage::RedbStore;
use clarion_core::{
    now_ms, AnalysisRecord, BiasScore, ClarionError, DebateRecord, ExtractedArticle, Result,
    Store, StoreStats, NEUTRAL_REASONING,
};
use clarion_engine::{commands, Coordinator, ANALYSIS_TTL_MS};
use clarion_model::Completion;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Scripted completion double. Counts every model invocation and sleeps
/// briefly so concurrent analyses genuinely overlap.
struct ScriptedModel {
    responses: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn ok(mut self, model: &str, text: &str) -> Self {
        self.responses.insert(model.to_string(), text.to_string());
        self
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Completion for ScriptedModel {
    async fn complete(&self, model: &str, _prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(model.to_string());
        tokio::time::sleep(Duration::from_millis(10)).await;
        match self.responses.get(model) {
            Some(text) => Ok(text.clone()),
            None => Err(ClarionError::Api(format!("{} not scripted", model))),
        }
    }
}

/// Store double whose every operation fails.
struct FailingStore;

impl Store for FailingStore {
    fn put_analysis(&self, _record: &AnalysisRecord) -> Result<()> {
        Err(ClarionError::Validation("store offline".to_string()))
    }
    fn get_analysis(&self, _url: &str) -> Result<Option<AnalysisRecord>> {
        Err(ClarionError::Validation("store offline".to_string()))
    }
    fn delete_analysis(&self, _url: &str) -> Result<()> {
        Err(ClarionError::Validation("store offline".to_string()))
    }
    fn list_analyses(&self) -> Result<Vec<AnalysisRecord>> {
        Err(ClarionError::Validation("store offline".to_string()))
    }
    fn clear_analyses(&self) -> Result<()> {
        Err(ClarionError::Validation("store offline".to_string()))
    }
    fn evict_older_than(&self, _max_age_ms: i64) -> Result<usize> {
        Err(ClarionError::Validation("store offline".to_string()))
    }
    fn prepend_debate(&self, _record: &DebateRecord) -> Result<()> {
        Err(ClarionError::Validation("store offline".to_string()))
    }
    fn list_debates(&self) -> Result<Vec<DebateRecord>> {
        Err(ClarionError::Validation("store offline".to_string()))
    }
    fn delete_debate(&self, _id: &str) -> Result<()> {
        Err(ClarionError::Validation("store offline".to_string()))
    }
    fn stats(&self) -> Result<StoreStats> {
        Err(ClarionError::Validation("store offline".to_string()))
    }
}

const BIAS_JSON: &str =
    r#"{"left_right": 25, "objectivity": 70, "confidence": 80, "reasoning": "leans right"}"#;

fn article(url: &str) -> ExtractedArticle {
    let text = "The council voted on the new transit measure after months of debate. \
                Supporters argue it will cut commute times, while opponents point to \
                the cost overruns of the previous project."
        .to_string();
    ExtractedArticle::from_parts(
        "Transit Vote",
        &text,
        url,
        Some("example.test".to_string()),
        Some("A. Writer".to_string()),
        None,
    )
    .unwrap()
}

// ── Analyze Flow ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_analyze_then_serves_from_cache() {
    let dir = tempdir().unwrap();
    let store = Arc::new(RedbStore::open(dir.path().join("test.redb")).unwrap());
    let model = Arc::new(ScriptedModel::new().ok("gemini-2.5-flash", BIAS_JSON));
    let coordinator = Coordinator::new(store, Some(model.clone()));

    let first = coordinator.analyze_article(&article("https://a.test/1")).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.bias.left_right, 25.0);
    assert_eq!(model.total_calls(), 1);

    let second = coordinator.analyze_article(&article("https://a.test/1")).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.timestamp, first.timestamp);
    assert_eq!(model.total_calls(), 1);
}

#[tokio::test]
async fn test_expired_cache_entry_is_recomputed() {
    let dir = tempdir().unwrap();
    let store = Arc::new(RedbStore::open(dir.path().join("test.redb")).unwrap());
    let stale = AnalysisRecord {
        url: "https://a.test/1".to_string(),
        title: "Transit Vote".to_string(),
        author: None,
        source: None,
        bias: BiasScore::neutral(),
        timestamp: now_ms() - ANALYSIS_TTL_MS - 1000,
        cached: false,
    };
    store.put_analysis(&stale).unwrap();

    let model = Arc::new(ScriptedModel::new().ok("gemini-2.5-flash", BIAS_JSON));
    let coordinator = Coordinator::new(store.clone(), Some(model.clone()));

    let outcome = coordinator.analyze_article(&article("https://a.test/1")).await.unwrap();
    assert!(!outcome.cached);
    assert_eq!(outcome.bias.left_right, 25.0);
    assert_eq!(model.total_calls(), 1);

    // Stale record was overwritten in place
    let stored = store.get_analysis("https://a.test/1").unwrap().unwrap();
    assert_eq!(stored.bias.left_right, 25.0);
}

#[tokio::test]
async fn test_no_credential_persists_neutral_score() {
    let dir = tempdir().unwrap();
    let store = Arc::new(RedbStore::open(dir.path().join("test.redb")).unwrap());
    let coordinator = Coordinator::new(store.clone(), None);

    let outcome = coordinator.analyze_article(&article("https://a.test/1")).await.unwrap();
    assert!(!outcome.cached);
    assert_eq!(outcome.bias.confidence, 0.0);
    assert_eq!(outcome.bias.reasoning, NEUTRAL_REASONING);

    assert!(store.get_analysis("https://a.test/1").unwrap().is_some());
}

#[tokio::test]
async fn test_concurrent_analyses_coalesce_to_one_computation() {
    let dir = tempdir().unwrap();
    let store = Arc::new(RedbStore::open(dir.path().join("test.redb")).unwrap());
    let model = Arc::new(ScriptedModel::new().ok("gemini-2.5-flash", BIAS_JSON));
    let coordinator = Coordinator::new(store, Some(model.clone()));

    let url = "https://a.test/1";
    let article_a = article(url);
    let article_b = article(url);
    let (first, second) = tokio::join!(
        coordinator.analyze_article(&article_a),
        coordinator.analyze_article(&article_b),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(model.total_calls(), 1);
    // Exactly one of the two actually computed
    assert_eq!([first.cached, second.cached].iter().filter(|c| **c).count(), 1);
}

// ── Command Surface ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_command_reports_error() {
    let dir = tempdir().unwrap();
    let store = Arc::new(RedbStore::open(dir.path().join("test.redb")).unwrap());
    let coordinator = Coordinator::new(store, None);

    let response = commands::dispatch(&coordinator, r#"{"type": "REWRITE_ARTICLE"}"#).await;
    let error = response["error"].as_str().unwrap();
    assert!(error.contains("REWRITE_ARTICLE"), "got: {error}");
}

#[tokio::test]
async fn test_short_article_is_rejected() {
    let dir = tempdir().unwrap();
    let store = Arc::new(RedbStore::open(dir.path().join("test.redb")).unwrap());
    let coordinator = Coordinator::new(store.clone(), None);

    let line = r#"{"type": "ANALYZE_ARTICLE", "payload": {"title": "T", "text": "too short", "url": "https://a.test/1"}}"#;
    let response = commands::dispatch(&coordinator, line).await;
    assert!(response["error"].as_str().unwrap().contains("too short"));

    // Nothing was persisted for the rejected request
    assert!(store.get_analysis("https://a.test/1").unwrap().is_none());
}

#[tokio::test]
async fn test_delete_is_idempotent_over_the_wire() {
    let dir = tempdir().unwrap();
    let store = Arc::new(RedbStore::open(dir.path().join("test.redb")).unwrap());
    let coordinator = Coordinator::new(store, None);

    let line = r#"{"type": "DELETE_ARTICLE", "payload": {"url": "https://a.test/1"}}"#;
    for _ in 0..2 {
        let response = commands::dispatch(&coordinator, line).await;
        assert_eq!(response["success"], true);
    }
}

#[tokio::test]
async fn test_analyze_and_history_round_trip() {
    let dir = tempdir().unwrap();
    let store = Arc::new(RedbStore::open(dir.path().join("test.redb")).unwrap());
    let model = Arc::new(ScriptedModel::new().ok("gemini-2.5-flash", BIAS_JSON));
    let coordinator = Coordinator::new(store, Some(model));

    let line = r#"{"type": "ANALYZE_ARTICLE", "payload": {"title": "Transit Vote", "text": "The council voted on the new transit measure after months of debate. Supporters argue it will cut commute times, while opponents point to the cost overruns of the previous project.", "url": "https://a.test/1"}}"#;
    let response = commands::dispatch(&coordinator, line).await;
    assert_eq!(response["cached"], false);

    let history = commands::dispatch(&coordinator, r#"{"type": "GET_ARTICLE_HISTORY"}"#).await;
    let records = history.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["url"], "https://a.test/1");

    let cleared = commands::dispatch(&coordinator, r#"{"type": "CLEAR_HISTORY"}"#).await;
    assert_eq!(cleared["success"], true);
    let history = commands::dispatch(&coordinator, r#"{"type": "GET_ARTICLE_HISTORY"}"#).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_debate_cards_are_returned_and_recorded() {
    let dir = tempdir().unwrap();
    let store = Arc::new(RedbStore::open(dir.path().join("test.redb")).unwrap());
    let cards_json = r#"{"cards": [{"tag": "Transit cuts commutes", "cite": "Writer, n.d. (example.test)", "body": "Supporters argue it will cut commute times.", "highlights": ["cut commute times"]}]}"#;
    let model = Arc::new(ScriptedModel::new().ok("gemini-2.0-flash", cards_json));
    let coordinator = Coordinator::new(store.clone(), Some(model));

    let line = r#"{"type": "GENERATE_DEBATE_CARDS", "payload": {"text": "Supporters argue it will cut commute times.", "purpose": "affirm transit funding", "title": "Transit Vote", "url": "https://a.test/1"}}"#;
    let response = commands::dispatch(&coordinator, line).await;
    let cards = response["cards"].as_array().unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0]["tag"], "Transit cuts commutes");

    // The history record is saved on a detached task
    tokio::time::sleep(Duration::from_millis(100)).await;
    let debates = store.list_debates().unwrap();
    assert_eq!(debates.len(), 1);
    assert_eq!(debates[0].url, "https://a.test/1");
    assert_eq!(debates[0].purpose, "affirm transit funding");
    assert_eq!(debates[0].id.len(), 13);
}

#[tokio::test]
async fn test_debate_cards_without_credential_error() {
    let dir = tempdir().unwrap();
    let store = Arc::new(RedbStore::open(dir.path().join("test.redb")).unwrap());
    let coordinator = Coordinator::new(store, None);

    let line = r#"{"type": "GENERATE_DEBATE_CARDS", "payload": {"text": "body", "purpose": "p", "title": "T"}}"#;
    let response = commands::dispatch(&coordinator, line).await;
    assert!(response["error"].as_str().unwrap().contains("API key"));
}

#[tokio::test]
async fn test_storage_stats_over_the_wire() {
    let dir = tempdir().unwrap();
    let store = Arc::new(RedbStore::open(dir.path().join("test.redb")).unwrap());
    let model = Arc::new(ScriptedModel::new().ok("gemini-2.5-flash", BIAS_JSON));
    let coordinator = Coordinator::new(store, Some(model));

    coordinator.analyze_article(&article("https://a.test/1")).await.unwrap();

    let stats = commands::dispatch(&coordinator, r#"{"type": "GET_STORAGE_STATS"}"#).await;
    assert_eq!(stats["article_count"], 1);
    assert_eq!(stats["debate_count"], 0);
}

// ── Degraded Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failing_store_degrades_reads_but_fails_writes() {
    let coordinator = Coordinator::new(Arc::new(FailingStore), None);

    assert!(coordinator.article_history().is_empty());
    assert!(coordinator.debate_history().is_empty());
    assert!(coordinator.cached_analysis("https://a.test/1").is_none());
    assert_eq!(coordinator.stats().article_count, 0);

    assert!(coordinator.delete_article("https://a.test/1").is_err());
    assert!(coordinator.clear_history().is_err());
}

#[tokio::test]
async fn test_failing_store_still_analyzes_but_reports_write_failure() {
    let model = Arc::new(ScriptedModel::new().ok("gemini-2.5-flash", BIAS_JSON));
    let coordinator = Coordinator::new(Arc::new(FailingStore), Some(model.clone()));

    // Cache read failure is a miss; the write failure propagates
    let err = coordinator.analyze_article(&article("https://a.test/1")).await.unwrap_err();
    assert!(matches!(err, ClarionError::Validation(_)));
    assert_eq!(model.total_calls(), 1);
}
