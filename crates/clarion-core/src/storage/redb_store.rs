use crate::error::{ClarionError, Result};
use crate::storage::traits::{Store, DEBATE_HISTORY_CAP};
use crate::types::{now_ms, AnalysisRecord, DebateRecord, StoreStats};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Table definitions
const ARTICLES: TableDefinition<&str, &[u8]> = TableDefinition::new("articles");
const DEBATE_HISTORY: TableDefinition<&str, &[u8]> = TableDefinition::new("debate_history");
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

/// Current schema version.
/// v1 = articles only (predates debate history)
/// v2 = articles + debate_history tables
pub const CURRENT_SCHEMA_VERSION: u32 = 2;
const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Redb-based store implementation
pub struct RedbStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbStore {
    /// Open or create a database at the given path, migrating older
    /// schemas forward field by field (never by wholesale reset).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClarionError::Validation(format!("Failed to create directory: {}", e))
            })?;
        }

        let is_new = !path.exists();
        let db = Database::create(&path)?;

        if is_new {
            let write_txn = db.begin_write()?;
            {
                let _ = write_txn.open_table(ARTICLES)?;
                let _ = write_txn.open_table(DEBATE_HISTORY)?;
                let mut meta = write_txn.open_table(META)?;
                meta.insert(
                    SCHEMA_VERSION_KEY,
                    CURRENT_SCHEMA_VERSION.to_string().as_bytes(),
                )?;
            }
            write_txn.commit()?;
        } else {
            let version = Self::stored_schema_version(&db);
            if version > CURRENT_SCHEMA_VERSION {
                return Err(ClarionError::Validation(format!(
                    "Database schema v{} is newer than this binary v{}. Upgrade Clarion.",
                    version, CURRENT_SCHEMA_VERSION
                )));
            }
            if version < CURRENT_SCHEMA_VERSION {
                Self::migrate(&db, version)?;
            }
            // Ensure tables exist
            let write_txn = db.begin_write()?;
            {
                let _ = write_txn.open_table(ARTICLES)?;
                let _ = write_txn.open_table(DEBATE_HISTORY)?;
                let _ = write_txn.open_table(META)?;
            }
            write_txn.commit()?;
        }

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Read the stored schema version. No version entry = v1.
    fn stored_schema_version(db: &Database) -> u32 {
        let Ok(read_txn) = db.begin_read() else {
            return 1;
        };
        read_txn
            .open_table(META)
            .ok()
            .and_then(|t| {
                t.get(SCHEMA_VERSION_KEY).ok().flatten().and_then(|v| {
                    std::str::from_utf8(v.value())
                        .ok()
                        .and_then(|s| s.parse::<u32>().ok())
                })
            })
            .unwrap_or(1)
    }

    /// Step the schema forward one version at a time.
    fn migrate(db: &Database, mut version: u32) -> Result<()> {
        while version < CURRENT_SCHEMA_VERSION {
            match version {
                // v1 predates debate history: backfill an empty table,
                // leave the article map untouched.
                1 => {
                    let write_txn = db.begin_write()?;
                    {
                        let _ = write_txn.open_table(DEBATE_HISTORY)?;
                    }
                    write_txn.commit()?;
                }
                v => {
                    return Err(ClarionError::Validation(format!(
                        "No migration path from schema v{}",
                        v
                    )))
                }
            }
            version += 1;
            let write_txn = db.begin_write()?;
            {
                let mut meta = write_txn.open_table(META)?;
                meta.insert(SCHEMA_VERSION_KEY, version.to_string().as_bytes())?;
            }
            write_txn.commit()?;
        }
        Ok(())
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn serialize_analysis(record: &AnalysisRecord) -> Result<Vec<u8>> {
        bincode::serialize(record).map_err(ClarionError::from)
    }

    fn deserialize_analysis(bytes: &[u8]) -> Result<AnalysisRecord> {
        bincode::deserialize(bytes).map_err(ClarionError::from)
    }

    fn serialize_debate(record: &DebateRecord) -> Result<Vec<u8>> {
        bincode::serialize(record).map_err(ClarionError::from)
    }

    fn deserialize_debate(bytes: &[u8]) -> Result<DebateRecord> {
        bincode::deserialize(bytes).map_err(ClarionError::from)
    }
}

impl Store for RedbStore {
    fn put_analysis(&self, record: &AnalysisRecord) -> Result<()> {
        let bytes = Self::serialize_analysis(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ARTICLES)?;
            table.insert(record.url.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_analysis(&self, url: &str) -> Result<Option<AnalysisRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ARTICLES)?;

        if let Some(bytes) = table.get(url)? {
            let record = Self::deserialize_analysis(bytes.value())?;
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    fn delete_analysis(&self, url: &str) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ARTICLES)?;
            table.remove(url)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_analyses(&self) -> Result<Vec<AnalysisRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ARTICLES)?;

        let mut records = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            records.push(Self::deserialize_analysis(value.value())?);
        }

        // Newest first, ties broken by URL for a stable order
        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.url.cmp(&b.url))
        });
        Ok(records)
    }

    fn clear_analyses(&self) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(ARTICLES)?;
        {
            let _ = write_txn.open_table(ARTICLES)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn evict_older_than(&self, max_age_ms: i64) -> Result<usize> {
        let cutoff = now_ms() - max_age_ms;
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(ARTICLES)?;

            let mut expired = Vec::new();
            for item in table.iter()? {
                let (key, value) = item?;
                let record = Self::deserialize_analysis(value.value())?;
                if record.timestamp <= cutoff {
                    expired.push(key.value().to_string());
                }
            }
            for url in &expired {
                table.remove(url.as_str())?;
            }
            expired.len()
        };

        // Commit only when something was actually removed
        if removed > 0 {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(removed)
    }

    fn prepend_debate(&self, record: &DebateRecord) -> Result<()> {
        let bytes = Self::serialize_debate(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DEBATE_HISTORY)?;
            table.insert(record.id.as_str(), bytes.as_slice())?;

            // Trim past the cap: oldest entries drop silently
            let mut entries = Vec::new();
            for item in table.iter()? {
                let (key, value) = item?;
                let rec = Self::deserialize_debate(value.value())?;
                entries.push((key.value().to_string(), rec.timestamp));
            }
            if entries.len() > DEBATE_HISTORY_CAP {
                entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                for (id, _) in entries.split_off(DEBATE_HISTORY_CAP) {
                    table.remove(id.as_str())?;
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_debates(&self) -> Result<Vec<DebateRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DEBATE_HISTORY)?;

        let mut records = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            records.push(Self::deserialize_debate(value.value())?);
        }

        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    fn delete_debate(&self, id: &str) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DEBATE_HISTORY)?;
            table.remove(id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let read_txn = self.db.begin_read()?;
        let articles = read_txn.open_table(ARTICLES)?;
        let debates = read_txn.open_table(DEBATE_HISTORY)?;

        let mut article_count = 0u64;
        let mut oldest: Option<i64> = None;
        let mut newest: Option<i64> = None;
        let mut observe = |ts: i64, oldest: &mut Option<i64>, newest: &mut Option<i64>| {
            *oldest = Some(oldest.map_or(ts, |o| o.min(ts)));
            *newest = Some(newest.map_or(ts, |n| n.max(ts)));
        };

        for item in articles.iter()? {
            let (_, value) = item?;
            let record = Self::deserialize_analysis(value.value())?;
            observe(record.timestamp, &mut oldest, &mut newest);
            article_count += 1;
        }

        let mut debate_count = 0u64;
        for item in debates.iter()? {
            let (_, value) = item?;
            let record = Self::deserialize_debate(value.value())?;
            observe(record.timestamp, &mut oldest, &mut newest);
            debate_count += 1;
        }

        let db_size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        Ok(StoreStats {
            article_count,
            debate_count,
            oldest_timestamp: oldest,
            newest_timestamp: newest,
            db_size_bytes,
        })
    }
}
