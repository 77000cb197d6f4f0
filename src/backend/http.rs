//! `reqwest` implementation of the backend traits.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use super::{DocumentationApi, PluginApi};
use crate::error::ApiError;
use crate::types::{BusinessFlowTag, DocFile, DocGroup, PluginActionResult, PluginInfo};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client bound to one backend base URL (e.g. `http://localhost:8080/api`).
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        match base.scheme() {
            "http" | "https" => {}
            _ => return Err(ApiError::InvalidBaseUrl(base_url.to_string())),
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append path segments to the base URL. Segments are percent-encoded,
    /// so ids containing `/` or spaces cannot change the route.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn post(&self, segments: &[&str]) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "POST");
        let response = self.client.post(url).send().await?;
        check_status(response).await
    }
}

/// Map a non-2xx response to `ApiError::Server`, keeping the body as message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ApiError::Server {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DocumentationApi for HttpBackend {
    async fn list_groups(&self) -> Result<Vec<DocGroup>, ApiError> {
        self.get_json(&["documentation", "groups"]).await
    }

    async fn get_group(&self, group_id: &str) -> Result<DocGroup, ApiError> {
        self.get_json(&["documentation", "groups", group_id]).await
    }

    async fn get_file(&self, file_id: &str) -> Result<DocFile, ApiError> {
        self.get_json(&["documentation", "files", file_id]).await
    }

    async fn get_tags(&self, file_id: &str) -> Result<Vec<BusinessFlowTag>, ApiError> {
        self.get_json(&["documentation", "files", file_id, "business-flow-tags"])
            .await
    }

    async fn trigger_rescan(&self) -> Result<String, ApiError> {
        let response = self.post(&["documentation", "refresh"]).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl PluginApi for HttpBackend {
    async fn list_plugins(&self) -> Result<Vec<PluginInfo>, ApiError> {
        self.get_json(&["plugins"]).await
    }

    async fn start_plugin(&self, plugin_id: &str) -> Result<PluginActionResult, ApiError> {
        let response = self.post(&["plugins", plugin_id, "start"]).await?;
        Ok(response.json().await?)
    }

    async fn stop_plugin(&self, plugin_id: &str) -> Result<PluginActionResult, ApiError> {
        let response = self.post(&["plugins", plugin_id, "stop"]).await?;
        Ok(response.json().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
