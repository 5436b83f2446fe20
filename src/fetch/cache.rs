use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Validators and timestamp stored next to each cached body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheMeta {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub content: Vec<u8>,
    pub meta: CacheMeta,
}

impl CacheEntry {
    /// `None` when the entry claims to be fetched after `now` (clock skew, hand-edited sidecar).
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        (now - self.meta.fetched_at).to_std().ok()
    }

    /// Fresh iff strictly younger than `max_age`. A future timestamp is stale.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.age(now) {
            Some(age) => age < max_age,
            None => {
                debug!(url = %self.meta.url, fetched_at = %self.meta.fetched_at, "cache timestamp in the future");
                false
            }
        }
    }
}

/// Flat content store keyed by the SHA-256 of the URL: `<hex>.cache` + `<hex>.meta.json`.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key_for(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn content_path(&self, url: &str) -> PathBuf {
        self.root.join(format!("{}.cache", Self::key_for(url)))
    }

    fn meta_path(&self, url: &str) -> PathBuf {
        self.root.join(format!("{}.meta.json", Self::key_for(url)))
    }

    /// Reads a cached body. Entries written without a sidecar fall back to the file mtime.
    pub fn read(&self, url: &str) -> Option<CacheEntry> {
        let path = self.content_path(url);
        let content = fs::read(&path).ok()?;
        let meta = match fs::read(self.meta_path(url))
            .ok()
            .and_then(|b| serde_json::from_slice::<CacheMeta>(&b).ok())
        {
            Some(meta) => meta,
            None => {
                let mtime = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                debug!("cache entry for {} has no metadata, using mtime", url);
                CacheMeta {
                    url: url.to_string(),
                    fetched_at: DateTime::<Utc>::from(mtime),
                    etag: None,
                    last_modified: None,
                }
            }
        };
        Some(CacheEntry { content, meta })
    }

    pub fn write(&self, content: &[u8], meta: &CacheMeta) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.content_path(&meta.url), content)?;
        self.write_meta(meta)
    }

    /// Rewrites only the sidecar, e.g. to restart the freshness window after a 304.
    pub fn write_meta(&self, meta: &CacheMeta) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let body = serde_json::to_vec_pretty(meta).map_err(io::Error::other)?;
        fs::write(self.meta_path(&meta.url), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    fn meta(url: &str, fetched_at: DateTime<Utc>) -> CacheMeta {
        CacheMeta {
            url: url.to_string(),
            fetched_at,
            etag: Some("\"abc\"".to_string()),
            last_modified: None,
        }
    }

    #[test]
    fn test_key_is_stable_hex_of_url() {
        let a = CacheStore::key_for("https://example.org/a");
        assert_eq!(a.len(), 64);
        assert_eq!(a, CacheStore::key_for("https://example.org/a"));
        assert_ne!(a, CacheStore::key_for("https://example.org/b"));
    }

    #[test]
    fn test_write_then_read_preserves_validators() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("nested"));
        let now = Utc::now();
        store.write(b"hello", &meta("https://example.org/a", now)).unwrap();

        let entry = store.read("https://example.org/a").unwrap();
        assert_eq!(entry.content, b"hello");
        assert_eq!(entry.meta.etag.as_deref(), Some("\"abc\""));
        assert!(store.read("https://example.org/other").is_none());
    }

    #[test]
    fn test_freshness_boundary() {
        let now = Utc::now();
        let entry = CacheEntry {
            content: vec![],
            meta: meta("u", now - ChronoDuration::hours(2)),
        };
        assert!(entry.is_fresh(now, Duration::from_secs(3 * 3600)));
        assert!(!entry.is_fresh(now, Duration::from_secs(3600)));
        assert!(!entry.is_fresh(now, Duration::ZERO));
    }

    #[test]
    fn test_future_timestamp_is_stale() {
        let now = Utc::now();
        let entry = CacheEntry {
            content: vec![],
            meta: meta("u", now + ChronoDuration::days(3650)),
        };
        assert!(entry.age(now).is_none());
        assert!(!entry.is_fresh(now, Duration::from_secs(1)));
        assert!(!entry.is_fresh(now, Duration::MAX));
    }

    #[test]
    fn test_missing_sidecar_falls_back_to_mtime() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        fs::write(store.content_path("https://example.org/x"), b"body").unwrap();

        let entry = store.read("https://example.org/x").unwrap();
        assert!(entry.meta.etag.is_none());
        assert!(entry.is_fresh(Utc::now(), Duration::from_secs(3600)));
    }
}
