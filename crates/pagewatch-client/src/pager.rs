//! Paging capability and its PagerDuty Events API implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::transport::HttpClient;

/// Something that can open an incident.
#[async_trait]
pub trait PagerClient: Send + Sync {
    /// Trigger an incident and return the pager's incident identifier.
    async fn trigger(&self, description: &str) -> ClientResult<String>;
}

#[derive(Debug, Serialize)]
struct EventRequest<'a> {
    service_key: &'a str,
    event_type: &'static str,
    description: &'a str,
    client: &'static str,
}

#[derive(Debug, Deserialize)]
struct EventResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    incident_key: String,
    #[serde(default)]
    errors: Vec<String>,
}

/// PagerDuty generic events (v1) client.
#[derive(Clone)]
pub struct PagerDutyClient {
    service_key: String,
    events_url: String,
    http: HttpClient,
}

impl PagerDutyClient {
    pub fn new(
        service_key: impl Into<String>,
        events_url: impl Into<String>,
        timeout: Duration,
    ) -> ClientResult<Self> {
        Ok(Self {
            service_key: service_key.into(),
            events_url: events_url.into(),
            http: HttpClient::new(timeout)?,
        })
    }

    pub fn events_url(&self) -> &str {
        &self.events_url
    }
}

#[async_trait]
impl PagerClient for PagerDutyClient {
    async fn trigger(&self, description: &str) -> ClientResult<String> {
        let event = EventRequest {
            service_key: &self.service_key,
            event_type: "trigger",
            description,
            client: "pagewatch",
        };
        let body = serde_json::to_vec(&event)?;
        let resp = self.http.post_json(&self.events_url, body).await?;

        if !resp.status.is_success() {
            // Error bodies carry a JSON message when the key or payload is rejected.
            let body = match serde_json::from_slice::<EventResponse>(&resp.body) {
                Ok(parsed) if !parsed.message.is_empty() => {
                    let mut message = parsed.message;
                    if !parsed.errors.is_empty() {
                        message = format!("{message}: {}", parsed.errors.join(", "));
                    }
                    message
                }
                _ => resp.body_text(),
            };
            return Err(ClientError::Status {
                status: resp.status.as_u16(),
                body,
            });
        }

        let parsed: EventResponse = serde_json::from_slice(&resp.body)?;
        debug!(status = %parsed.status, message = %parsed.message, "pager event accepted");
        Ok(parsed.incident_key)
    }
}
