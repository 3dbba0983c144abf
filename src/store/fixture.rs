//! In-memory store for unit tests

use super::traits::{Record, RecordStore, StoreError};
use crate::query::{normalize_article, ArticleQuery, ShiftRange};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Filters a fixed row set the way the real backends filter the table
#[derive(Default)]
pub struct FixtureStore {
    pub rows: Vec<Record>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FixtureStore {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .filter_map(|v| v.as_object().cloned())
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::Upstream {
                status: 500,
                body: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    fn field<'a>(row: &'a Record, name: &str) -> Option<&'a str> {
        row.get(name).and_then(Value::as_str)
    }
}

#[async_trait]
impl RecordStore for FixtureStore {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.begin()
    }

    async fn fetch_by_lots(&self, lots: &[String]) -> Result<Vec<Record>, StoreError> {
        self.begin()?;
        Ok(self
            .rows
            .iter()
            .filter(|r| Self::field(r, "LotID").is_some_and(|lot| lots.iter().any(|l| l == lot)))
            .cloned()
            .collect())
    }

    async fn fetch_by_shift_range(&self, range: &ShiftRange) -> Result<Vec<Record>, StoreError> {
        self.begin()?;
        Ok(self
            .rows
            .iter()
            .filter(|r| {
                Self::field(r, "ShiftStartTime")
                    .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
                    .is_some_and(|ts| range.contains(&ts))
            })
            .cloned()
            .collect())
    }

    async fn search_article_numbers(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        self.begin()?;
        Ok(self
            .rows
            .iter()
            .filter_map(|r| Self::field(r, "ArticleNumber"))
            .filter(|a| normalize_article(a).contains(needle))
            .take(limit)
            .map(String::from)
            .collect())
    }

    async fn fetch_by_articles(&self, query: &ArticleQuery) -> Result<Vec<Record>, StoreError> {
        self.begin()?;
        Ok(self
            .rows
            .iter()
            .filter(|r| Self::field(r, "ArticleNumber").is_some_and(|a| query.matches(a)))
            .cloned()
            .collect())
    }
}
