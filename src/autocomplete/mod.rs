//! Article-number autocomplete
//!
//! Looks up distinct article numbers containing a search term. Matching is
//! case- and whitespace-insensitive; results keep the spelling first seen in
//! the table and are cached per normalized term.

use crate::cache::SuggestionCache;
use crate::query::normalize_article;
use crate::store::{RecordStore, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Autocomplete service over a record store
pub struct ArticleAutocomplete {
    store: Arc<dyn RecordStore>,
    cache: SuggestionCache,
    limit: usize,
}

impl ArticleAutocomplete {
    pub fn new(store: Arc<dyn RecordStore>, cache: SuggestionCache, limit: usize) -> Self {
        Self {
            store,
            cache,
            limit,
        }
    }

    /// Fetch suggestions for a raw search term
    pub async fn suggest(&self, raw: &str) -> Result<Arc<Vec<String>>, StoreError> {
        let key = normalize_article(raw);
        if key.is_empty() {
            return Ok(Arc::new(Vec::new()));
        }

        if let Some(hit) = self.cache.get(&key).await {
            debug!("Suggestion cache hit for '{}'", key);
            return Ok(hit);
        }

        let articles = self.store.search_article_numbers(&key, self.limit).await?;
        let suggestions = Arc::new(distinct_matches(articles, &key, self.limit));
        debug!("{} suggestion(s) for '{}'", suggestions.len(), key);

        self.cache.set(key, suggestions.clone()).await;
        Ok(suggestions)
    }
}

/// Keep article numbers whose normalized form contains `needle`, one per
/// normalized key, first spelling wins, at most `limit` entries.
pub fn distinct_matches<I>(articles: I, needle: &str, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|article| {
            let key = normalize_article(article);
            key.contains(needle) && seen.insert(key)
        })
        .take(limit)
        .collect()
}
