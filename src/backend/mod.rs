//! Backend seams consumed by the core.
//!
//! The orchestrator and the readiness poller only see these traits; the
//! `reqwest` implementation lives in [`http`]. Tests plug in fakes.

pub mod http;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{BusinessFlowTag, DocFile, DocGroup, PluginActionResult, PluginInfo};

pub use http::HttpBackend;

/// Documentation endpoints (`/documentation/...`).
#[async_trait]
pub trait DocumentationApi: Send + Sync {
    /// `GET /documentation/groups`
    async fn list_groups(&self) -> Result<Vec<DocGroup>, ApiError>;

    /// `GET /documentation/groups/{groupId}`
    async fn get_group(&self, group_id: &str) -> Result<DocGroup, ApiError>;

    /// `GET /documentation/files/{fileId}`
    async fn get_file(&self, file_id: &str) -> Result<DocFile, ApiError>;

    /// `GET /documentation/files/{fileId}/business-flow-tags`
    async fn get_tags(&self, file_id: &str) -> Result<Vec<BusinessFlowTag>, ApiError>;

    /// `POST /documentation/refresh`: asks the backend to rescan its sources.
    async fn trigger_rescan(&self) -> Result<String, ApiError>;
}

/// Plugin endpoints (`/plugins/...`).
#[async_trait]
pub trait PluginApi: Send + Sync {
    /// `GET /plugins`
    async fn list_plugins(&self) -> Result<Vec<PluginInfo>, ApiError>;

    /// `POST /plugins/{id}/start`
    async fn start_plugin(&self, plugin_id: &str) -> Result<PluginActionResult, ApiError>;

    /// `POST /plugins/{id}/stop`
    async fn stop_plugin(&self, plugin_id: &str) -> Result<PluginActionResult, ApiError>;
}

/// Read a failed list-shaped response as "nothing there".
///
/// Returns the empty value plus a human-readable message for the caller to
/// surface. Non-list responses keep their errors.
pub fn empty_on_failure<T: Default>(result: Result<T, ApiError>, what: &str) -> (T, Option<String>) {
    match result {
        Ok(value) => (value, None),
        Err(e) => {
            tracing::warn!(kind = e.kind(), "failed to load {what}: {e}");
            (T::default(), Some(format!("Failed to load {what}: {e}")))
        }
    }
}

/// `GET /documentation/groups`, empty on transport failure.
pub async fn list_groups_or_empty(api: &dyn DocumentationApi) -> (Vec<DocGroup>, Option<String>) {
    empty_on_failure(api.list_groups().await, "documentation groups")
}

/// `GET /documentation/files/{fileId}/business-flow-tags`, empty on transport failure.
pub async fn tags_or_empty(api: &dyn DocumentationApi, file_id: &str) -> (Vec<BusinessFlowTag>, Option<String>) {
    let what = format!("business-flow tags for \"{file_id}\"");
    empty_on_failure(api.get_tags(file_id).await, &what)
}
