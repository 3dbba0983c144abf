//! Render deployment restart proxy

use crate::config::RestartSettings;
use crate::network::{HttpClient, OutboundRequest};
use tracing::{info, warn};

/// Result of a restart call that reached the upstream API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// Upstream answered 2xx
    Triggered,
    /// Upstream answered with a non-success status
    Rejected { status: u16, body: String },
}

/// Client for Render's `POST /services/{id}/restart`
pub struct RestartClient {
    client: HttpClient,
    endpoint: String,
    api_key: String,
}

impl RestartClient {
    /// Returns `None` when restart credentials are not configured
    pub fn from_settings(client: HttpClient, settings: &RestartSettings) -> Option<Self> {
        let (service_id, api_key) = match (&settings.service_id, &settings.api_key) {
            (Some(id), Some(key)) => (id, key),
            _ => return None,
        };

        Some(Self {
            client,
            endpoint: format!(
                "{}/services/{}/restart",
                settings.api_base_url.trim_end_matches('/'),
                service_id
            ),
            api_key: api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the upstream API to restart the service
    pub async fn trigger(&self) -> reqwest::Result<RestartOutcome> {
        let request = OutboundRequest::post(&self.endpoint).bearer(&self.api_key);
        let response = self.client.execute(request).await?;

        if response.is_success() {
            info!("Restart accepted by {}", self.endpoint);
            Ok(RestartOutcome::Triggered)
        } else {
            warn!(
                "Restart rejected by {}: {} {}",
                self.endpoint, response.status, response.text
            );
            Ok(RestartOutcome::Rejected {
                status: response.status,
                body: response.text,
            })
        }
    }
}
