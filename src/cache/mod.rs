//! Caching module for UQE-API
//!
//! Autocomplete suggestions are cached per normalized query with a short TTL.

use crate::config::CacheSettings;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Cache for article-number suggestions, keyed by normalized query
#[derive(Clone)]
pub struct SuggestionCache {
    cache: Cache<String, Arc<Vec<String>>>,
}

impl SuggestionCache {
    /// Create a new suggestion cache with specified TTL and capacity
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity)
            .build();

        Self { cache }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(
            Duration::from_secs(settings.suggestion_ttl_secs),
            settings.suggestion_capacity,
        )
    }

    /// Get cached suggestions for a normalized query
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<String>>> {
        self.cache.get(key).await
    }

    /// Store suggestions for a normalized query
    pub async fn set(&self, key: String, value: Arc<Vec<String>>) {
        self.cache.insert(key, value).await;
    }
}
