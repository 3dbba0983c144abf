//! Application state shared across handlers

use crate::autocomplete::ArticleAutocomplete;
use crate::cache::SuggestionCache;
use crate::config::Settings;
use crate::network::HttpClient;
use crate::restart::RestartClient;
use crate::store::RecordStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Global settings
    pub settings: Arc<Settings>,
    /// Record store
    pub store: Arc<dyn RecordStore>,
    /// Article-number autocomplete
    pub autocomplete: Arc<ArticleAutocomplete>,
    /// Restart proxy, absent when credentials are not configured
    pub restart: Option<Arc<RestartClient>>,
}

impl AppState {
    /// Create new application state
    pub fn new(settings: Settings, store: Arc<dyn RecordStore>, client: HttpClient) -> Self {
        let cache = SuggestionCache::from_settings(&settings.cache);
        let autocomplete = Arc::new(ArticleAutocomplete::new(
            store.clone(),
            cache,
            settings.search.autocomplete_limit,
        ));
        let restart = RestartClient::from_settings(client, &settings.restart).map(Arc::new);

        Self {
            settings: Arc::new(settings),
            store,
            autocomplete,
            restart,
        }
    }

    /// Name of the configured backend
    pub fn backend(&self) -> &'static str {
        self.settings.database.backend.as_str()
    }
}
