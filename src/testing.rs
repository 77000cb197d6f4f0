//! In-memory backends for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::backend::{DocumentationApi, PluginApi};
use crate::error::ApiError;
use crate::types::{BusinessFlowTag, DocFile, DocGroup, FlowStep, PluginActionResult, PluginInfo};

fn server_error(status: u16) -> ApiError {
    ApiError::Server {
        status,
        message: format!("fake backend returned {status}"),
    }
}

pub(crate) fn plugin(id: &str, running: bool) -> PluginInfo {
    PluginInfo {
        id: id.to_string(),
        name: id.to_uppercase(),
        version: "1.0.0".to_string(),
        running,
    }
}

pub(crate) fn file(id: &str, group_id: &str) -> DocFile {
    DocFile {
        id: id.to_string(),
        group_id: group_id.to_string(),
        name: format!("{id}.md"),
        content: None,
        order: 0,
    }
}

pub(crate) fn group(id: &str, file_ids: &[&str]) -> DocGroup {
    DocGroup {
        id: id.to_string(),
        name: id.to_uppercase(),
        description: None,
        files: file_ids.iter().map(|f| file(f, id)).collect(),
        overview: None,
    }
}

pub(crate) fn tag(file_id: &str, name: &str, steps: &[&str]) -> BusinessFlowTag {
    BusinessFlowTag {
        file_id: file_id.to_string(),
        name: name.to_string(),
        description: None,
        steps: steps
            .iter()
            .map(|s| FlowStep {
                name: s.to_string(),
                description: None,
                is_last: false,
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Plugins
// ---------------------------------------------------------------------------

/// Scripted `GET /plugins`: responses are consumed in order and the last
/// one repeats forever. Errors are HTTP status codes.
pub(crate) struct FakePlugins {
    script: Mutex<VecDeque<Result<Vec<PluginInfo>, u16>>>,
    list_calls: AtomicUsize,
    action: Mutex<Result<PluginActionResult, u16>>,
    actions: Mutex<Vec<String>>,
}

impl FakePlugins {
    pub(crate) fn scripted(script: Vec<Result<Vec<PluginInfo>, u16>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            list_calls: AtomicUsize::new(0),
            action: Mutex::new(Ok(PluginActionResult {
                success: true,
                message: "ok".to_string(),
            })),
            actions: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always(response: Result<Vec<PluginInfo>, u16>) -> Self {
        Self::scripted(vec![response])
    }

    pub(crate) fn set_script(&self, script: Vec<Result<Vec<PluginInfo>, u16>>) {
        *self.script.lock() = script.into();
    }

    pub(crate) fn set_action(&self, result: Result<PluginActionResult, u16>) {
        *self.action.lock() = result;
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn actions(&self) -> Vec<String> {
        self.actions.lock().clone()
    }

    fn record_action(&self, action: String) -> Result<PluginActionResult, ApiError> {
        self.actions.lock().push(action);
        self.action.lock().clone().map_err(server_error)
    }
}

#[async_trait]
impl PluginApi for FakePlugins {
    async fn list_plugins(&self) -> Result<Vec<PluginInfo>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock();
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        next.unwrap_or(Ok(Vec::new())).map_err(server_error)
    }

    async fn start_plugin(&self, plugin_id: &str) -> Result<PluginActionResult, ApiError> {
        self.record_action(format!("start:{plugin_id}"))
    }

    async fn stop_plugin(&self, plugin_id: &str) -> Result<PluginActionResult, ApiError> {
        self.record_action(format!("stop:{plugin_id}"))
    }
}

// ---------------------------------------------------------------------------
// Documentation
// ---------------------------------------------------------------------------

/// Documentation backend with call counters and optional gates.
///
/// A gated call (`gate("group:g1")`, `gate("tags:f1")`) blocks until the
/// test calls `release` with the same key, which lets tests choose the
/// completion order of overlapping requests.
#[derive(Default)]
pub(crate) struct FakeDocs {
    listed: Mutex<Vec<DocGroup>>,
    details: Mutex<HashMap<String, DocGroup>>,
    tags: Mutex<HashMap<String, Vec<BusinessFlowTag>>>,
    gates: DashMap<String, Arc<Notify>>,
    fail_list: AtomicBool,
    fail_groups: AtomicBool,
    fail_tags: AtomicBool,
    fail_rescan: AtomicBool,
    list_calls: AtomicUsize,
    group_calls: AtomicUsize,
    file_calls: AtomicUsize,
    tag_calls: AtomicUsize,
    rescan_calls: AtomicUsize,
}

impl FakeDocs {
    /// Groups served by both the list and the detail endpoints.
    pub(crate) fn new(groups: Vec<DocGroup>) -> Self {
        let fake = Self::default();
        fake.set_groups(groups);
        fake
    }

    pub(crate) fn set_groups(&self, groups: Vec<DocGroup>) {
        let mut details = self.details.lock();
        for g in &groups {
            details.insert(g.id.clone(), g.clone());
        }
        *self.listed.lock() = groups;
    }

    /// A group only reachable through `GET /documentation/groups/{id}`.
    pub(crate) fn add_detail(&self, group: DocGroup) {
        self.details.lock().insert(group.id.clone(), group);
    }

    pub(crate) fn set_tags(&self, file_id: &str, tags: Vec<BusinessFlowTag>) {
        self.tags.lock().insert(file_id.to_string(), tags);
    }

    pub(crate) fn gate(&self, key: &str) {
        self.gates.insert(key.to_string(), Arc::new(Notify::new()));
    }

    pub(crate) fn release(&self, key: &str) {
        if let Some(gate) = self.gates.get(key) {
            gate.notify_one();
        }
    }

    async fn pass_gate(&self, key: &str) {
        let gate = self.gates.get(key).map(|g| Arc::clone(g.value()));
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    pub(crate) fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_groups(&self, fail: bool) {
        self.fail_groups.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_tags(&self, fail: bool) {
        self.fail_tags.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_rescan(&self, fail: bool) {
        self.fail_rescan.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn group_calls(&self) -> usize {
        self.group_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn file_calls(&self) -> usize {
        self.file_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn tag_calls(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn rescan_calls(&self) -> usize {
        self.rescan_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentationApi for FakeDocs {
    async fn list_groups(&self) -> Result<Vec<DocGroup>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate("list").await;
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(server_error(500));
        }
        Ok(self.listed.lock().clone())
    }

    async fn get_group(&self, group_id: &str) -> Result<DocGroup, ApiError> {
        self.group_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate(&format!("group:{group_id}")).await;
        if self.fail_groups.load(Ordering::SeqCst) {
            return Err(server_error(500));
        }
        self.details
            .lock()
            .get(group_id)
            .cloned()
            .ok_or_else(|| server_error(404))
    }

    async fn get_file(&self, file_id: &str) -> Result<DocFile, ApiError> {
        self.file_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate(&format!("file:{file_id}")).await;
        let details = self.details.lock();
        let found = details
            .values()
            .flat_map(|g| g.files.iter().chain(g.overview.iter()))
            .find(|f| f.id == file_id)
            .cloned();
        found
            .map(|mut f| {
                f.content = Some(format!("# {}", f.id));
                f
            })
            .ok_or_else(|| server_error(404))
    }

    async fn get_tags(&self, file_id: &str) -> Result<Vec<BusinessFlowTag>, ApiError> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate(&format!("tags:{file_id}")).await;
        if self.fail_tags.load(Ordering::SeqCst) {
            return Err(server_error(503));
        }
        Ok(self.tags.lock().get(file_id).cloned().unwrap_or_default())
    }

    async fn trigger_rescan(&self) -> Result<String, ApiError> {
        self.rescan_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_rescan.load(Ordering::SeqCst) {
            return Err(server_error(500));
        }
        Ok("rescan started".to_string())
    }
}
