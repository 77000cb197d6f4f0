//! Wire types shared by the documentation and plugin endpoints.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Documentation hierarchy
// ---------------------------------------------------------------------------

/// A documentation group: an ordered list of files plus an optional overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub files: Vec<DocFile>,
    /// Designated landing file, shown when no explicit file is requested.
    #[serde(default, alias = "overviewFile")]
    pub overview: Option<DocFile>,
}

impl DocGroup {
    pub fn file(&self, file_id: &str) -> Option<&DocFile> {
        self.files.iter().find(|f| f.id == file_id)
    }
}

/// A single documentation file. `content` is opaque (possibly base64);
/// list endpoints may omit it, in which case the detail endpoint has it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocFile {
    pub id: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub order: i32,
}

/// One step of a business flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStep {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// True for the final step of the flow, false otherwise.
    #[serde(default)]
    pub is_last: bool,
}

/// Business-flow tag attached to a file, keyed by `(file_id, name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessFlowTag {
    pub file_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<FlowStep>,
}

impl BusinessFlowTag {
    /// Force `is_last` to be set on exactly the final step.
    pub fn normalize_terminal_step(&mut self) {
        let last = self.steps.len().saturating_sub(1);
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.is_last = i == last;
        }
    }
}

// ---------------------------------------------------------------------------
// Plugins
// ---------------------------------------------------------------------------

/// A backend-registered plugin as reported by `GET /plugins`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub running: bool,
}

/// Response of the start/stop endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginActionResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}
