use crate::analysis::AnalysisPayload;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tokio_rusqlite::Connection;
use tracing::{debug, info};

/// Prefix for every cache key. Bump the version when the payload schema changes.
pub const CACHE_KEY_PREFIX: &str = "anthology_analysis_v1_";

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS analyses (
    cache_key TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    fetched_at INTEGER NOT NULL
);
";

/// Derive the cache key for a song title.
///
/// Every run of whitespace becomes a single `_` and the result is lowercased.
#[must_use]
pub fn cache_key(song_title: &str) -> String {
    let mut key = String::with_capacity(CACHE_KEY_PREFIX.len() + song_title.len());
    key.push_str(CACHE_KEY_PREFIX);

    let mut in_whitespace = false;
    for c in song_title.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                key.push('_');
            }
            in_whitespace = true;
        } else {
            key.extend(c.to_lowercase());
            in_whitespace = false;
        }
    }

    key
}

/// Key/value store for analysis payloads. No TTL and no eviction.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Look up a payload by cache key
    async fn get(&self, key: &str) -> Result<Option<AnalysisPayload>>;

    /// Store a payload, replacing any previous entry for the key
    async fn put(&self, key: &str, payload: &AnalysisPayload) -> Result<()>;
}

/// Process-wide in-memory store
#[derive(Debug, Default)]
pub struct MemoryAnalysisCache {
    entries: RwLock<HashMap<String, AnalysisPayload>>,
}

impl MemoryAnalysisCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AnalysisStore for MemoryAnalysisCache {
    async fn get(&self, key: &str) -> Result<Option<AnalysisPayload>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn put(&self, key: &str, payload: &AnalysisPayload) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), payload.clone());
        Ok(())
    }
}

/// Cached analysis row
#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub cache_key: String,
    pub payload: AnalysisPayload,
    pub fetched_at: DateTime<Utc>,
}

/// SQLite-based analysis cache
pub struct AnalysisCache {
    conn: Connection,
}

impl AnalysisCache {
    /// Create a new cache at the default location
    ///
    /// # Errors
    ///
    /// Returns an error if the cache database cannot be created or opened.
    pub async fn new() -> Result<Self> {
        let cache_path = crate::paths::analysis_cache_db_path();
        Self::open(&cache_path).await
    }

    /// Open a cache at a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub async fn open(path: &Path) -> Result<Self> {
        info!("Opening analysis cache database at {:?}", path);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).await?;
        Self::initialize(conn, true).await
    }

    /// Open a cache that lives only as long as this value
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::initialize(conn, false).await
    }

    async fn initialize(conn: Connection, wal: bool) -> Result<Self> {
        conn.call(move |conn| {
            conn.execute_batch(SCHEMA_SQL)?;
            if wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            Ok(())
        })
        .await?;

        info!("Analysis cache database initialized");
        Ok(Self { conn })
    }

    /// Fetch the full cached row for a key
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored payload cannot be decoded.
    pub async fn get_entry(&self, key: &str) -> Result<Option<CachedAnalysis>> {
        debug!("Looking up analysis in cache: {}", key);
        let key = key.to_string();

        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT cache_key, payload, fetched_at FROM analyses WHERE cache_key = ?1",
                )?;

                let result = stmt
                    .query_row(rusqlite::params![key], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                        ))
                    })
                    .optional()?;

                Ok(result)
            })
            .await?;

        let Some((cache_key, payload, fetched_at)) = row else {
            return Ok(None);
        };

        Ok(Some(CachedAnalysis {
            cache_key,
            payload: serde_json::from_str(&payload)?,
            fetched_at: DateTime::from_timestamp(fetched_at, 0).unwrap_or_else(Utc::now),
        }))
    }

    /// Checkpoint WAL for clean shutdown
    ///
    /// # Errors
    ///
    /// Returns an error if the WAL checkpoint fails.
    pub async fn checkpoint(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")?;
                Ok(())
            })
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl AnalysisStore for AnalysisCache {
    async fn get(&self, key: &str) -> Result<Option<AnalysisPayload>> {
        Ok(self.get_entry(key).await?.map(|entry| entry.payload))
    }

    async fn put(&self, key: &str, payload: &AnalysisPayload) -> Result<()> {
        info!("Storing analysis in cache: {}", key);
        let key = key.to_string();
        let content = serde_json::to_string(payload)?;
        let now = Utc::now().timestamp();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r"
                    INSERT INTO analyses (cache_key, payload, fetched_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(cache_key) DO UPDATE SET
                        payload = excluded.payload,
                        fetched_at = excluded.fetched_at
                ",
                    rusqlite::params![key, content, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::LyricLine;

    fn payload(mood: &str) -> AnalysisPayload {
        AnalysisPayload {
            background: "bg".to_string(),
            mood: mood.to_string(),
            lyrics: vec![LyricLine::new("line", "行")],
            vocabulary: Vec::new(),
            connections: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn test_cache_key_normalizes_title() {
        assert_eq!(cache_key("Down Bad"), "anthology_analysis_v1_down_bad");
        assert_eq!(
            cache_key("So Long,  London"),
            "anthology_analysis_v1_so_long,_london"
        );
        assert_eq!(cache_key("loml"), "anthology_analysis_v1_loml");
    }

    #[test]
    fn test_cache_key_collapses_mixed_whitespace() {
        assert_eq!(cache_key(" A\t\nB "), "anthology_analysis_v1__a_b_");
    }

    #[test]
    fn test_cache_key_is_case_insensitive() {
        assert_eq!(cache_key("thanK you aIMee"), cache_key("THANK YOU AIMEE"));
    }

    #[tokio::test]
    async fn test_memory_cache_get_put() {
        let cache = MemoryAnalysisCache::new();
        assert!(cache.is_empty());
        assert!(cache.get("k").await.unwrap().is_none());

        cache.put("k", &payload("one")).await.unwrap();
        cache.put("k", &payload("two")).await.unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k").await.unwrap().map(|p| p.mood), Some("two".to_string()));
    }

    #[tokio::test]
    async fn test_sqlite_cache_roundtrip_and_replace() {
        let cache = AnalysisCache::open_in_memory().await.unwrap();
        assert!(cache.get("missing").await.unwrap().is_none());

        cache.put("k", &payload("first")).await.unwrap();
        cache.put("k", &payload("second")).await.unwrap();

        let entry = cache.get_entry("k").await.unwrap().unwrap();
        assert_eq!(entry.cache_key, "k");
        assert_eq!(entry.payload.mood, "second");
        assert_eq!(entry.payload.lyrics.len(), 1);
    }
}
