pub mod backend;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod navigation;
pub mod plugins;
pub mod readiness;
pub mod status_store;
pub mod types;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use crate::backend::{DocumentationApi, HttpBackend, PluginApi};

pub use crate::cache::ContentCache;
pub use crate::config::ExplorerConfig;
pub use crate::coordinator::{RequestCoordinator, SequenceId};
pub use crate::error::ApiError;
pub use crate::navigation::{NavigationOrchestrator, NavigationState, Resolution, ResolvedSelection};
pub use crate::plugins::PluginManager;
pub use crate::readiness::{ReadinessConfig, ReadinessPoller};
pub use crate::status_store::{CapabilityRecord, CapabilityStatus, StatusStore};

/// Everything an explorer front end needs, wired to one backend.
///
/// The status store is shared: the poller writes it, the plugin manager
/// reads it, and front ends subscribe to it.
pub struct Explorer {
    pub config: ExplorerConfig,
    /// Raw documentation endpoints, for listings that need no navigation.
    pub docs: Arc<dyn DocumentationApi>,
    pub store: Arc<StatusStore>,
    pub poller: Arc<ReadinessPoller>,
    pub navigation: Arc<NavigationOrchestrator>,
    pub plugins: Arc<PluginManager>,
}

impl Explorer {
    /// Connect to the backend at `config.base_url` over HTTP.
    pub fn new(config: ExplorerConfig) -> Result<Self, ApiError> {
        let backend = Arc::new(HttpBackend::new(&config.base_url, config.request_timeout())?);
        tracing::debug!(base_url = %backend.base_url(), "explorer backend configured");
        Ok(Self::with_backends(config, backend.clone(), backend))
    }

    pub fn with_backends(
        config: ExplorerConfig,
        docs: Arc<dyn DocumentationApi>,
        plugin_api: Arc<dyn PluginApi>,
    ) -> Self {
        let store = Arc::new(StatusStore::new());
        let poller = Arc::new(ReadinessPoller::new(
            plugin_api.clone(),
            store.clone(),
            config.readiness(),
        ));
        let plugins = Arc::new(PluginManager::new(plugin_api, poller.clone()));
        let navigation = Arc::new(NavigationOrchestrator::new(docs.clone()));
        Self {
            config,
            docs,
            store,
            poller,
            navigation,
            plugins,
        }
    }
}
