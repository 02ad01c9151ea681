use crate::error::Result;
use crate::types::{AnalysisRecord, DebateRecord, StoreStats};

/// Debate history keeps at most this many generation batches. Inserting
/// past the cap silently drops the oldest entries.
pub const DEBATE_HISTORY_CAP: usize = 50;

/// Persistence backend for analyses and debate history.
///
/// Implementations report every backend failure as an `Err` — the policy
/// of swallowing read failures (and only read failures) belongs to the
/// coordinator, where it can be exercised with test doubles.
pub trait Store: Send + Sync {
    // === Analyses ===

    /// Insert or overwrite the analysis for `record.url`.
    fn put_analysis(&self, record: &AnalysisRecord) -> Result<()>;

    /// Exact-key lookup by URL.
    fn get_analysis(&self, url: &str) -> Result<Option<AnalysisRecord>>;

    /// Remove one analysis. Idempotent; absent key is a no-op.
    fn delete_analysis(&self, url: &str) -> Result<()>;

    /// All analyses, newest first (timestamp descending, ties by URL).
    fn list_analyses(&self) -> Result<Vec<AnalysisRecord>>;

    /// Empty the article map. Debate history is untouched.
    fn clear_analyses(&self) -> Result<()>;

    /// Remove analyses with `now - timestamp >= max_age_ms`. Persists a
    /// single commit when anything was removed and returns the count.
    /// Safe to run concurrently with reads.
    fn evict_older_than(&self, max_age_ms: i64) -> Result<usize>;

    // === Debate history ===

    /// Add a generation batch, trimming the history to
    /// [`DEBATE_HISTORY_CAP`] newest entries.
    fn prepend_debate(&self, record: &DebateRecord) -> Result<()>;

    /// All debate records, newest first.
    fn list_debates(&self) -> Result<Vec<DebateRecord>>;

    /// Remove one debate record by id. Idempotent.
    fn delete_debate(&self, id: &str) -> Result<()>;

    // === Maintenance ===

    /// Counts, timestamp range, and on-disk size.
    fn stats(&self) -> Result<StoreStats>;
}
