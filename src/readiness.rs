//! Plugin readiness discovery.
//!
//! A plugin is *ready* when it is both registered with the backend and
//! running. `check_ready` probes once immediately, then retries with a fixed
//! delay until the attempt budget runs out. A clean "not yet" keeps the loop
//! going; a transport failure ends the cycle with `Error` straight away.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::backend::PluginApi;
use crate::coordinator::{RequestCoordinator, SequenceId};
use crate::error::ApiError;
use crate::status_store::{CapabilityStatus, StatusStore};
use crate::types::PluginInfo;

/// Total probes per check cycle, the immediate one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Fixed pause before every probe after the first.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Result of one registration + liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Probe {
    registered: bool,
    running: bool,
}

impl Probe {
    fn from_list(plugins: &[PluginInfo], capability_id: &str) -> Self {
        match plugins.iter().find(|p| p.id == capability_id) {
            Some(plugin) => Probe {
                registered: true,
                running: plugin.running,
            },
            None => Probe {
                registered: false,
                running: false,
            },
        }
    }

    fn is_ready(self) -> bool {
        self.registered && self.running
    }

    fn status(self) -> CapabilityStatus {
        match (self.registered, self.running) {
            (true, true) => CapabilityStatus::Ready,
            (true, false) => CapabilityStatus::NotRunning,
            (false, _) => CapabilityStatus::NotRegistered,
        }
    }
}

pub struct ReadinessPoller {
    api: Arc<dyn PluginApi>,
    store: Arc<StatusStore>,
    config: ReadinessConfig,
    /// Last plugin list read from the backend; `None` until first fetch.
    known: RwLock<Option<Vec<PluginInfo>>>,
    /// One coordinator per capability so a newer check supersedes an older one.
    cycles: DashMap<String, RequestCoordinator>,
}

impl ReadinessPoller {
    pub fn new(api: Arc<dyn PluginApi>, store: Arc<StatusStore>, config: ReadinessConfig) -> Self {
        Self {
            api,
            store,
            config,
            known: RwLock::new(None),
            cycles: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// Forget the cached plugin list; the next probe reads it fresh.
    pub fn invalidate(&self) {
        *self.known.write() = None;
    }

    pub fn known_plugins(&self) -> Option<Vec<PluginInfo>> {
        self.known.read().clone()
    }

    /// Start a new check cycle for `capability_id` and mark it `Checking`.
    fn begin_cycle(&self, capability_id: &str) -> SequenceId {
        let cycle = self.cycles.entry(capability_id.to_string()).or_default();
        let token = cycle.next();
        self.store.set_status(capability_id, CapabilityStatus::Checking);
        token
    }

    fn is_current_cycle(&self, capability_id: &str, token: SequenceId) -> bool {
        self.cycles
            .get(capability_id)
            .is_some_and(|cycle| cycle.is_current(token))
    }

    /// Write a status if this cycle has not been superseded.
    fn finish(&self, capability_id: &str, token: SequenceId, status: CapabilityStatus) -> bool {
        debug_assert!(status.is_terminal(), "cycle finished in {status:?}");
        // Holding the shard guard keeps `begin_cycle` from interleaving.
        let Some(cycle) = self.cycles.get(capability_id) else {
            return false;
        };
        if !cycle.is_current(token) {
            tracing::debug!(capability = capability_id, session = %token, ?status, "check superseded, status dropped");
            return false;
        }
        self.store.set_status(capability_id, status);
        true
    }

    async fn plugin_list(&self, refresh: bool) -> Result<Vec<PluginInfo>, ApiError> {
        if !refresh && let Some(plugins) = self.known.read().clone() {
            return Ok(plugins);
        }
        let plugins = self.api.list_plugins().await?;
        *self.known.write() = Some(plugins.clone());
        Ok(plugins)
    }

    async fn probe(&self, capability_id: &str, refresh: bool) -> Result<Probe, ApiError> {
        let plugins = self.plugin_list(refresh).await?;
        Ok(Probe::from_list(&plugins, capability_id))
    }

    /// Poll until the capability is registered and running, or give up.
    ///
    /// Ends in `Ready` (returns true), `NotRegistered` / `NotRunning` once
    /// the attempts are exhausted, or `Error` on the first transport failure.
    /// A cycle superseded by a newer check for the same id returns false
    /// without writing any further status.
    pub async fn check_ready(&self, capability_id: &str) -> bool {
        let token = self.begin_cycle(capability_id);
        let max_attempts = self.config.max_attempts.max(1);
        let mut ever_registered = false;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.config.retry_delay).await;
                if !self.is_current_cycle(capability_id, token) {
                    tracing::debug!(capability = capability_id, session = %token, "check superseded");
                    return false;
                }
            }

            match self.probe(capability_id, attempt > 1).await {
                Ok(probe) if probe.is_ready() => {
                    tracing::info!(capability = capability_id, attempt, "capability ready");
                    self.finish(capability_id, token, CapabilityStatus::Ready);
                    return true;
                }
                Ok(probe) => {
                    ever_registered |= probe.registered;
                    tracing::debug!(
                        capability = capability_id,
                        attempt,
                        registered = probe.registered,
                        running = probe.running,
                        "capability not ready yet"
                    );
                }
                Err(e) => {
                    tracing::warn!(capability = capability_id, attempt, kind = e.kind(), "readiness probe failed: {e}");
                    self.finish(capability_id, token, CapabilityStatus::Error);
                    return false;
                }
            }
        }

        let status = if ever_registered {
            CapabilityStatus::NotRunning
        } else {
            CapabilityStatus::NotRegistered
        };
        tracing::info!(capability = capability_id, attempts = max_attempts, ?status, "capability not ready, giving up");
        self.finish(capability_id, token, status);
        false
    }

    /// Re-verify from scratch with a single fresh probe, no retries.
    pub async fn verify(&self, capability_id: &str) -> CapabilityStatus {
        let token = self.begin_cycle(capability_id);
        let status = match self.probe(capability_id, true).await {
            Ok(probe) => probe.status(),
            Err(e) => {
                tracing::warn!(capability = capability_id, kind = e.kind(), "verification probe failed: {e}");
                CapabilityStatus::Error
            }
        };
        self.finish(capability_id, token, status);
        status
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
