//! File-based cache with TTL.
//!
//! Used to remember vulnerability descriptions between runs so that a CVE
//! referenced by several repositories is looked up once per TTL period.
//!
//! # Example
//!
//! ```no_run
//! use cvewatch::Cache;
//!
//! let cache = Cache::with_ttl_hours(24);
//! cache.set("avd_CVE-2024-1234", &"description".to_string()).unwrap();
//!
//! let value: Option<String> = cache.get("avd_CVE-2024-1234");
//! assert_eq!(value, Some("description".to_string()));
//! ```

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::platform::cache_dir;

/// Default cache TTL in hours.
pub const CACHE_TTL_HOURS: u64 = 24;

/// A directory of JSON files, each expiring `ttl` after it was written.
pub struct Cache {
    dir: PathBuf,
    ttl: Duration,
}

impl Cache {
    /// Creates a cache in the platform cache directory with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl_hours(CACHE_TTL_HOURS)
    }

    pub fn with_ttl_hours(hours: u64) -> Self {
        Self::in_dir(cache_dir(), Duration::from_secs(hours.saturating_mul(3600)))
    }

    pub fn in_dir(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    /// Converts a cache key to a safe filename.
    fn cache_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe_key))
    }

    /// Returns the cached value, or `None` if it is missing, expired or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.cache_path(key);

        if !path.exists() {
            return None;
        }

        let expired = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .map(|elapsed| elapsed > self.ttl)
            .unwrap_or(false);
        if expired {
            let _ = fs::remove_file(&path);
            return None;
        }

        let content = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.cache_path(key);
        let content = serde_json::to_string(value)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Removes all JSON files from the cache directory.
    pub fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)?.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    let _ = fs::remove_file(path);
                }
            }
        }
        Ok(())
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::in_dir(dir.path(), Duration::from_secs(3600));

        cache.set("avd_CVE-2024-0001", &"desc".to_string()).unwrap();
        assert_eq!(cache.get::<String>("avd_CVE-2024-0001"), Some("desc".to_string()));
        assert_eq!(cache.get::<String>("avd_CVE-2024-0002"), None);
    }

    #[test]
    fn test_unsafe_characters_are_replaced() {
        let cache = Cache::in_dir("/tmp/c", Duration::from_secs(1));
        assert_eq!(cache.cache_path("a/b:c"), PathBuf::from("/tmp/c/a_b_c.json"));
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::in_dir(dir.path(), Duration::ZERO);

        cache.set("key", &1u32).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get::<u32>("key"), None);
        assert!(!cache.cache_path("key").exists());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let cache = Cache::with_ttl_hours(u64::MAX);
        assert_eq!(cache.ttl, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::in_dir(dir.path(), Duration::from_secs(3600));

        cache.set("one", &1u32).unwrap();
        cache.set("two", &2u32).unwrap();
        cache.clear().unwrap();

        assert_eq!(cache.get::<u32>("one"), None);
        assert_eq!(cache.get::<u32>("two"), None);
    }
}
