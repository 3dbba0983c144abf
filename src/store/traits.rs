//! Record store traits and types

use crate::query::{ArticleQuery, RecordFilter, ShiftRange};
use async_trait::async_trait;
use thiserror::Error;

/// A quality record row, passed through without a fixed schema
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Errors raised by a record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Read-only access to the quality records table
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Cheap connectivity check
    async fn ping(&self) -> Result<(), StoreError>;

    /// Rows whose `LotID` is one of `lots`
    async fn fetch_by_lots(&self, lots: &[String]) -> Result<Vec<Record>, StoreError>;

    /// Rows whose `ShiftStartTime` lies inside `range` (inclusive)
    async fn fetch_by_shift_range(&self, range: &ShiftRange) -> Result<Vec<Record>, StoreError>;

    /// Article numbers whose normalized form contains `needle`, at most `limit` rows.
    /// `needle` is already normalized. Results may contain duplicates.
    async fn search_article_numbers(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;

    /// Rows whose normalized `ArticleNumber` equals one of the query keys.
    /// Backends may over-match; callers filter with [`ArticleQuery::matches`].
    async fn fetch_by_articles(&self, query: &ArticleQuery) -> Result<Vec<Record>, StoreError>;

    /// Dispatch a [`RecordFilter`]. No filter yields no rows without touching the store.
    async fn fetch(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        match filter {
            RecordFilter::Lots(lots) => self.fetch_by_lots(lots).await,
            RecordFilter::ShiftRange(range) => self.fetch_by_shift_range(range).await,
            RecordFilter::None => Ok(Vec::new()),
        }
    }
}
