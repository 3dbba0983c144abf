//! HTTP client for making requests to upstream services

use super::request::{HttpMethod, HttpResponse, OutboundRequest};
use crate::config::OutgoingSettings;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

/// Used when the configured timeout is not a valid duration
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client wrapper with a bounded request timeout
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    default_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> reqwest::Result<Self> {
        Self::with_settings(&OutgoingSettings::default())
    }

    /// Create a new HTTP client with custom settings
    pub fn with_settings(settings: &OutgoingSettings) -> reqwest::Result<Self> {
        let timeout = Duration::try_from_secs_f64(settings.request_timeout)
            .unwrap_or(DEFAULT_TIMEOUT);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(settings.pool_maxsize)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Execute an outbound request
    pub async fn execute(&self, request: OutboundRequest) -> reqwest::Result<HttpResponse> {
        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        req_builder = req_builder
            .timeout(self.default_timeout)
            .header("Accept", "application/json");

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if !request.params.is_empty() {
            req_builder = req_builder.query(&request.params);
        }

        debug!(
            "{:?} {} ({} params)",
            request.method,
            request.url,
            request.params.len()
        );

        let response = req_builder.send().await?;

        Self::parse_response(response).await
    }

    async fn parse_response(response: Response) -> reqwest::Result<HttpResponse> {
        let status = response.status().as_u16();
        let text = response.text().await?;

        Ok(HttpResponse { status, text })
    }
}
