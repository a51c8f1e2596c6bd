//! Service registry capability and its Consul HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use pagewatch_core::{HealthCheck, Services};

use crate::error::{ClientError, ClientResult};
use crate::transport::{HttpClient, HttpResponse, encode_path_segment};

/// Read access to the registry's service catalog and health checks.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// All known services with their tags, in registry order.
    async fn list_services(&self) -> ClientResult<Services>;

    /// Every health check attached to one service.
    async fn list_checks(&self, service: &str) -> ClientResult<Vec<HealthCheck>>;
}

/// Consul agent/server HTTP API client.
#[derive(Clone)]
pub struct ConsulClient {
    base_url: String,
    http: HttpClient,
}

impl ConsulClient {
    /// Create a client for a base URL such as `http://localhost:8500`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            base_url,
            http: HttpClient::new(timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}{path}", self.base_url);
        let resp = self.http.get(&url).await?;
        decode(&url, resp)
    }
}

fn decode<T: serde::de::DeserializeOwned>(url: &str, resp: HttpResponse) -> ClientResult<T> {
    if !resp.status.is_success() {
        debug!(%url, status = %resp.status, "registry returned non-2xx");
        return Err(ClientError::Status {
            status: resp.status.as_u16(),
            body: resp.body_text(),
        });
    }
    Ok(serde_json::from_slice(&resp.body)?)
}

#[async_trait]
impl RegistryClient for ConsulClient {
    async fn list_services(&self) -> ClientResult<Services> {
        self.get_json("/v1/catalog/services").await
    }

    async fn list_checks(&self, service: &str) -> ClientResult<Vec<HealthCheck>> {
        let path = format!("/v1/health/checks/{}", encode_path_segment(service));
        // Consul answers `null` rather than `[]` on some versions.
        let checks: Option<Vec<HealthCheck>> = self.get_json(&path).await?;
        Ok(checks.unwrap_or_default())
    }
}
