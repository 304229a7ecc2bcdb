//! Response cache with time-to-live (TTL) support.
//!
//! Memoizes body-less responses keyed by the full request URL. The cache
//! is an optional capability; mutation requests always bypass it.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

/// Default cache TTL.
const DEFAULT_TTL_HOURS: i64 = 1;

/// Response memoization capability, keyed by request URL.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// The cached response body for `key`, if present and still valid.
    async fn get(&self, key: &str) -> Option<String>;

    /// Cache a response body under `key`.
    async fn set(&self, key: &str, value: &str);

    /// Drop the entry for `key`.
    async fn remove(&self, key: &str);
}

/// Cached data with timestamp.
#[derive(Debug, Clone)]
struct CachedEntry {
    value: String,
    cached_at: DateTime<Utc>,
}

/// In-memory [`ResponseCache`] with a fixed TTL per entry.
#[derive(Debug)]
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedEntry>>,
}

impl MemoryCache {
    /// Create a cache with the default 1-hour TTL.
    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(DEFAULT_TTL_HOURS))
    }

    /// Create a cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn is_valid(&self, cached_at: &DateTime<Utc>) -> bool {
        Utc::now() - *cached_at < self.ttl
    }

    /// Drop every entry.
    pub async fn invalidate(&self) {
        self.entries.lock().await.clear();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().await;
        entries.get(key).and_then(|entry| {
            if self.is_valid(&entry.cached_at) {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    async fn set(&self, key: &str, value: &str) {
        self.entries.lock().await.insert(
            key.to_string(),
            CachedEntry {
                value: value.to_string(),
                cached_at: Utc::now(),
            },
        );
    }

    async fn remove(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}
