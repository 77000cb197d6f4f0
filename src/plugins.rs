//! Plugin lifecycle on top of the readiness poller.
//!
//! Plugins live in the backend; this module only asks the backend to start
//! or stop them and then lets [`ReadinessPoller`] find out what actually
//! happened. A start or stop request never sets a status by itself.

use std::sync::Arc;

use crate::backend::{empty_on_failure, PluginApi};
use crate::readiness::ReadinessPoller;
use crate::status_store::{CapabilityStatus, StatusStore};
use crate::types::PluginInfo;

// ---------------------------------------------------------------------------
// Route safety
// ---------------------------------------------------------------------------

/// Returns true if a route prefix could escape its mount point via `..`
/// or `.` segments.
fn is_route_escape(route: &str) -> bool {
    route.split('/').any(|segment| segment == ".." || segment == ".")
}

/// Validate a route prefix claimed by a plugin, e.g. `/metrics/dashboard`.
fn validate_route(route: &str) -> Result<(), String> {
    let Some(rest) = route.strip_prefix('/') else {
        return Err(format!("route \"{route}\" must start with '/'"));
    };
    if is_route_escape(route) {
        return Err(format!("route \"{route}\" attempts path traversal"));
    }
    if rest.split('/').any(str::is_empty) {
        return Err(format!("route \"{route}\" contains an empty segment"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

pub struct PluginManager {
    api: Arc<dyn PluginApi>,
    poller: Arc<ReadinessPoller>,
}

impl PluginManager {
    pub fn new(api: Arc<dyn PluginApi>, poller: Arc<ReadinessPoller>) -> Self {
        Self { api, poller }
    }

    pub fn poller(&self) -> &Arc<ReadinessPoller> {
        &self.poller
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        self.poller.store()
    }

    /// Installed plugins for display. A transport failure yields an empty list.
    pub async fn list_plugins(&self) -> Vec<PluginInfo> {
        empty_on_failure(self.api.list_plugins().await, "plugins").0
    }

    /// Ask the backend to start a plugin, then poll until it is ready.
    ///
    /// Returns whether the plugin became ready. When the backend refuses or
    /// cannot be reached, the plugin is re-verified and the backend's message
    /// is returned as the error.
    pub async fn start(&self, plugin_id: &str) -> Result<bool, String> {
        let refusal = match self.api.start_plugin(plugin_id).await {
            Ok(result) if result.success => {
                tracing::info!(plugin = plugin_id, "start accepted: {}", result.message);
                self.poller.invalidate();
                return Ok(self.poller.check_ready(plugin_id).await);
            }
            Ok(result) => result.message,
            Err(e) => format!("Failed to start plugin \"{plugin_id}\": {e}"),
        };
        tracing::warn!(plugin = plugin_id, "start refused: {refusal}");
        self.poller.verify(plugin_id).await;
        Err(refusal)
    }

    /// Ask the backend to stop a plugin and re-verify its status from scratch.
    pub async fn stop(&self, plugin_id: &str) -> Result<CapabilityStatus, String> {
        let outcome = match self.api.stop_plugin(plugin_id).await {
            Ok(result) if result.success => {
                tracing::info!(plugin = plugin_id, "stop accepted: {}", result.message);
                Ok(())
            }
            Ok(result) => Err(result.message),
            Err(e) => Err(format!("Failed to stop plugin \"{plugin_id}\": {e}")),
        };
        let status = self.poller.verify(plugin_id).await;
        outcome.map(|()| status)
    }

    /// Record the route prefixes a plugin serves. All routes are validated
    /// before any is recorded. Returns how many were new.
    pub fn register_routes(&self, plugin_id: &str, routes: &[&str]) -> Result<usize, String> {
        if plugin_id.is_empty() {
            return Err("plugin id is empty".into());
        }
        for route in routes {
            validate_route(route)?;
        }
        let added = routes
            .iter()
            .filter(|route| self.store().register_route(plugin_id, route))
            .count();
        Ok(added)
    }
}
