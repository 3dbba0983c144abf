//! Supabase record store
//!
//! Talks to the PostgREST endpoint Supabase exposes at `/rest/v1/<table>`,
//! authenticating with the service role key.

use super::traits::{Record, RecordStore, StoreError};
use crate::config::DatabaseSettings;
use crate::network::{HttpClient, HttpResponse, OutboundRequest};
use crate::query::{ArticleQuery, ShiftRange};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Record store backed by Supabase's REST API
pub struct SupabaseStore {
    client: HttpClient,
    endpoint: String,
    service_role_key: String,
}

#[derive(Deserialize)]
struct ArticleRow {
    #[serde(rename = "ArticleNumber")]
    article_number: Option<String>,
}

impl SupabaseStore {
    /// Create a store for the configured project and table
    pub fn new(client: HttpClient, settings: &DatabaseSettings) -> Self {
        let base = settings
            .supabase
            .url
            .as_deref()
            .unwrap_or_default()
            .trim_end_matches('/');
        Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base, settings.table),
            service_role_key: settings
                .supabase
                .service_role_key
                .clone()
                .unwrap_or_default(),
        }
    }

    fn request(&self) -> OutboundRequest {
        OutboundRequest::get(&self.endpoint)
            .header("apikey", &self.service_role_key)
            .bearer(&self.service_role_key)
    }

    async fn send(&self, request: OutboundRequest) -> Result<HttpResponse, StoreError> {
        debug!("Running PostgREST query: {:?}", request.params);
        let response = self.client.execute(request).await?;
        if !response.is_success() {
            return Err(StoreError::Upstream {
                status: response.status,
                body: response.text,
            });
        }
        Ok(response)
    }

    async fn fetch_rows(&self, request: OutboundRequest) -> Result<Vec<Record>, StoreError> {
        let response = self.send(request).await?;
        Ok(response.json()?)
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.send(self.request().param("select", "*").param("limit", "1"))
            .await?;
        Ok(())
    }

    async fn fetch_by_lots(&self, lots: &[String]) -> Result<Vec<Record>, StoreError> {
        if lots.is_empty() {
            return Ok(Vec::new());
        }
        let request = self
            .request()
            .param("select", "*")
            .param("LotID", format!("in.({})", quote_list(lots)));
        self.fetch_rows(request).await
    }

    async fn fetch_by_shift_range(&self, range: &ShiftRange) -> Result<Vec<Record>, StoreError> {
        let request = self
            .request()
            .param("select", "*")
            .param(
                "ShiftStartTime",
                format!("gte.{}", range.start.format(TIMESTAMP_FORMAT)),
            )
            .param(
                "ShiftStartTime",
                format!("lte.{}", range.end.format(TIMESTAMP_FORMAT)),
            );
        self.fetch_rows(request).await
    }

    async fn search_article_numbers(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let request = self
            .request()
            .param("select", "ArticleNumber")
            .param("ArticleNumber", format!("ilike.*{}*", needle))
            .param("limit", limit.to_string());

        let response = self.send(request).await?;
        let rows: Vec<ArticleRow> = response.json()?;
        Ok(rows.into_iter().filter_map(|r| r.article_number).collect())
    }

    async fn fetch_by_articles(&self, query: &ArticleQuery) -> Result<Vec<Record>, StoreError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let conditions = query
            .keys()
            .iter()
            .map(|key| format!("ArticleNumber.ilike.{}", quote(&spaced_pattern(key))))
            .collect::<Vec<_>>()
            .join(",");
        let request = self
            .request()
            .param("select", "*")
            .param("or", format!("({})", conditions));

        // The pattern over-matches; keep rows whose normalized number is requested
        let rows = self.fetch_rows(request).await?;
        Ok(rows
            .into_iter()
            .filter(|row| {
                row.get("ArticleNumber")
                    .and_then(serde_json::Value::as_str)
                    .is_some_and(|article| query.matches(article))
            })
            .collect())
    }
}

/// ILIKE pattern matching `key` with any characters around and between its
/// characters, so stored values with embedded whitespace are returned.
/// `*` is PostgREST's wildcard and cannot be escaped, so a literal `*` in the
/// key becomes the single-character wildcard `_`.
fn spaced_pattern(key: &str) -> String {
    let mut pattern = String::from("*");
    for c in key.chars() {
        match c {
            '%' | '_' | '\\' => {
                pattern.push('\\');
                pattern.push(c);
            }
            '*' => pattern.push('_'),
            _ => pattern.push(c),
        }
        pattern.push('*');
    }
    pattern
}

/// Quote a value for a PostgREST list or logic tree
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

fn quote_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| quote(v))
        .collect::<Vec<_>>()
        .join(",")
}
