// Scheduler REST API client
//
// Thin wrapper over the scheduler's HTTP API: health probe, event creation
// and on-demand runs. Each operation is a single request with a bounded
// timeout; nothing is retried.

use crate::config::SchedulerConfig;
use crate::errors::SchedulerError;
use crate::models::{EventDefaults, EventRequest, EventResponse, HealthStatus, ScheduleTiming};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::json;
use std::time::Duration;

pub const HEALTH_PATH: &str = "/api/app/get_health";
pub const CREATE_EVENT_PATH: &str = "/api/app/create_event/v1";
pub const RUN_EVENT_PATH: &str = "/api/app/run_event/v1";
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Operations the portal needs from the scheduler
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchedulerApi: Send + Sync {
    /// Probe the scheduler; never fails, the outcome is in the status
    async fn health_check(&self) -> HealthStatus;

    async fn create_event(
        &self,
        title: &str,
        command: &str,
        timing: ScheduleTiming,
    ) -> Result<EventResponse, SchedulerError>;

    async fn run_event(&self, event_id: &str) -> Result<EventResponse, SchedulerError>;
}

/// HTTP client for a Cronicle-compatible scheduler
#[derive(Clone)]
pub struct CronicleClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    defaults: EventDefaults,
    health_timeout: Duration,
    request_timeout: Duration,
}

impl std::fmt::Debug for CronicleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronicleClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl CronicleClient {
    /// Create a new client from the scheduler configuration
    pub fn new(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        let client = Client::builder().build().map_err(|e| {
            SchedulerError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        let api_key = Some(config.api_key.trim().to_string()).filter(|k| !k.is_empty());

        Ok(Self {
            client,
            base_url: config.url.trim().trim_end_matches('/').to_string(),
            api_key,
            defaults: EventDefaults {
                category: config.category.clone(),
                plugin_id: config.plugin.clone(),
                target_host: config.target_host.clone(),
                timezone: config.timezone.clone(),
            },
            health_timeout: Duration::from_secs(config.health_timeout_seconds),
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn defaults(&self) -> &EventDefaults {
        &self.defaults
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the API key and JSON content type, when a key is configured
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request
                .header(API_KEY_HEADER, key)
                .header(reqwest::header::CONTENT_TYPE, "application/json"),
            None => request,
        }
    }

    /// POST a JSON body and decode the reply as a JSON object
    #[tracing::instrument(skip(self, body))]
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<EventResponse, SchedulerError> {
        let url = self.url(path);
        let payload = serde_json::to_vec(body)
            .map_err(|e| SchedulerError::InvalidResponse(format!("Failed to encode body: {}", e)))?;

        let response = self
            .authorize(self.client.post(&url))
            .timeout(self.request_timeout)
            .body(payload)
            .send()
            .await?;

        decode_event_response(response).await
    }

    /// Reachability fallback: any successful status on the root URL
    async fn probe_root(&self) -> HealthStatus {
        let url = format!("{}/", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => HealthStatus::reachable("Scheduler reachable"),
            Ok(resp) => HealthStatus::unreachable(format!("HTTP {}", resp.status().as_u16())),
            Err(e) => HealthStatus::unreachable(format!("Health check error: {}", e)),
        }
    }
}

#[async_trait]
impl SchedulerApi for CronicleClient {
    #[tracing::instrument(skip(self), fields(base_url = %self.base_url))]
    async fn health_check(&self) -> HealthStatus {
        let url = self.url(HEALTH_PATH);
        let response = self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await;

        let status = match response {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
                // Older builds answer 200 with "Unsupported API call" but work fine otherwise
                let body: serde_json::Value = resp.json().await.unwrap_or_default();
                let description = body
                    .get("description")
                    .map(|d| match d {
                        serde_json::Value::String(s) => s.to_lowercase(),
                        other => other.to_string().to_lowercase(),
                    })
                    .unwrap_or_default();
                if description.contains("unsupported api") {
                    HealthStatus::reachable("Scheduler reachable (health API not present)")
                } else {
                    HealthStatus::reachable("Scheduler reachable")
                }
            }
            Ok(resp) => {
                tracing::debug!(status = %resp.status(), "Health endpoint unavailable, probing root");
                self.probe_root().await
            }
            Err(e) => {
                tracing::debug!(error = %e, "Health request failed, probing root");
                self.probe_root().await
            }
        };

        tracing::info!(
            reachable = status.reachable,
            message = %status.message,
            "Scheduler health checked"
        );
        status
    }

    #[tracing::instrument(skip(self, command, timing))]
    async fn create_event(
        &self,
        title: &str,
        command: &str,
        timing: ScheduleTiming,
    ) -> Result<EventResponse, SchedulerError> {
        if self.api_key.is_none() {
            return Err(SchedulerError::Configuration(
                "No scheduler API key configured. Set CRONICLE_API_KEY in the container env."
                    .to_string(),
            ));
        }

        let request = EventRequest::new(&self.defaults, title, command, timing);
        let body = serde_json::to_value(&request)
            .map_err(|e| SchedulerError::InvalidResponse(format!("Failed to encode event: {}", e)))?;

        tracing::info!(
            target_host = %request.target_host,
            timing = %request.timing.describe(),
            "Creating scheduler event"
        );
        tracing::debug!(script = %request.script_body(), "Event script");
        self.post_json(CREATE_EVENT_PATH, &body).await
    }

    #[tracing::instrument(skip(self))]
    async fn run_event(&self, event_id: &str) -> Result<EventResponse, SchedulerError> {
        self.post_json(RUN_EVENT_PATH, &json!({ "id": event_id }))
            .await
    }
}

/// Fail on non-2xx statuses, then require a JSON object body
async fn decode_event_response(response: Response) -> Result<EventResponse, SchedulerError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(SchedulerError::RemoteFailure {
            status: status.as_u16(),
            body: text,
        });
    }

    let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
        SchedulerError::InvalidResponse(format!("Response is not JSON ({}): {}", e, text))
    })?;

    EventResponse::try_from(value).map_err(|other| {
        SchedulerError::InvalidResponse(format!("Expected a JSON object, got {}", other))
    })
}
