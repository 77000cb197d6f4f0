//! Navigation over the documentation hierarchy (groups → files → tags).
//!
//! Every `resolve` / `reload` is a session with its own sequence token.
//! Sessions may overlap freely; a session only touches the hierarchy, the
//! caches, or the visible state while its token is still the latest, so the
//! last session issued always wins and late arrivals are dropped silently.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::backend::{list_groups_or_empty, tags_or_empty, DocumentationApi};
use crate::cache::ContentCache;
use crate::coordinator::{RequestCoordinator, SequenceId};
use crate::types::{BusinessFlowTag, DocFile, DocGroup};

/// What the explorer currently shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NavigationState {
    pub selected_group_id: Option<String>,
    pub selected_file_id: Option<String>,
    pub file: Option<DocFile>,
    pub tags: Vec<BusinessFlowTag>,
    pub loading: bool,
    /// One human-readable message for the whole session.
    pub error: Option<String>,
    /// Session whose result is on display.
    pub session: Option<SequenceId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSelection {
    pub group: DocGroup,
    pub file: Option<DocFile>,
    pub tags: Vec<BusinessFlowTag>,
    /// Set when the tag list came back empty because its fetch failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a navigation session.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Result is now the visible selection.
    Applied(ResolvedSelection),
    /// Reload found no groups; the selection was cleared.
    Empty,
    /// A newer session was issued before this one finished.
    Superseded,
    /// Backend failure; message is shown. A failed resolve keeps the
    /// previous content, a failed reload leaves an empty hierarchy.
    Failed(String),
}

/// Why a session stopped early.
enum Interrupt {
    Stale,
    Failed(String),
}

struct Shared {
    groups: Vec<DocGroup>,
    view: NavigationState,
}

/// Priority: explicit file in the group, designated overview, first file.
pub fn select_file<'a>(group: &'a DocGroup, file_id: Option<&str>) -> Option<&'a DocFile> {
    file_id
        .and_then(|id| group.file(id))
        .or(group.overview.as_ref())
        .or_else(|| group.files.first())
}

/// Replace the group with the same id, or append it.
fn merge_group(groups: &mut Vec<DocGroup>, group: DocGroup) {
    match groups.iter_mut().find(|g| g.id == group.id) {
        Some(existing) => *existing = group,
        None => groups.push(group),
    }
}

/// Where a reload should land: the previous group/file if the group still
/// exists, else the first group.
fn reload_target(
    groups: &[DocGroup],
    previous_group: Option<String>,
    previous_file: Option<String>,
) -> Option<(String, Option<String>)> {
    if let Some(group_id) = previous_group
        && groups.iter().any(|g| g.id == group_id)
    {
        return Some((group_id, previous_file));
    }
    groups.first().map(|g| (g.id.clone(), None))
}

pub struct NavigationOrchestrator {
    api: Arc<dyn DocumentationApi>,
    coordinator: RequestCoordinator,
    /// Hierarchy and visible state. Written only by a current session.
    shared: RwLock<Shared>,
    /// File detail keyed by file id.
    file_cache: ContentCache<String, DocFile>,
    /// Tag lists keyed by owning file id.
    tag_cache: ContentCache<String, Vec<BusinessFlowTag>>,
}

impl NavigationOrchestrator {
    pub fn new(api: Arc<dyn DocumentationApi>) -> Self {
        Self {
            api,
            coordinator: RequestCoordinator::new(),
            shared: RwLock::new(Shared {
                groups: Vec::new(),
                view: NavigationState::default(),
            }),
            file_cache: ContentCache::new(),
            tag_cache: ContentCache::new(),
        }
    }

    pub fn groups(&self) -> Vec<DocGroup> {
        self.shared.read().groups.clone()
    }

    pub fn state(&self) -> NavigationState {
        self.shared.read().view.clone()
    }

    pub fn file_cache(&self) -> &ContentCache<String, DocFile> {
        &self.file_cache
    }

    pub fn tag_cache(&self) -> &ContentCache<String, Vec<BusinessFlowTag>> {
        &self.tag_cache
    }

    fn find_group(&self, group_id: &str) -> Option<DocGroup> {
        self.shared
            .read()
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .cloned()
    }

    // -- Session plumbing --

    /// Issue a token and show the loading state. Issuing under the state
    /// lock orders it against every commit.
    fn begin(&self) -> SequenceId {
        let mut shared = self.shared.write();
        let token = self.coordinator.next();
        shared.view.loading = true;
        shared.view.error = None;
        token
    }

    /// Run `apply` only if `token` is still the latest session.
    fn commit<R>(&self, token: SequenceId, apply: impl FnOnce(&mut Shared) -> R) -> Option<R> {
        let mut shared = self.shared.write();
        if !self.coordinator.is_current(token) {
            return None;
        }
        Some(apply(&mut shared))
    }

    fn ensure_current(&self, token: SequenceId) -> Result<(), Interrupt> {
        if self.coordinator.is_current(token) {
            Ok(())
        } else {
            Err(Interrupt::Stale)
        }
    }

    fn finish(&self, token: SequenceId, outcome: Result<Option<ResolvedSelection>, Interrupt>) -> Resolution {
        match outcome {
            Ok(Some(selection)) => {
                let applied = self.commit(token, |shared| {
                    shared.view = NavigationState {
                        selected_group_id: Some(selection.group.id.clone()),
                        selected_file_id: selection.file.as_ref().map(|f| f.id.clone()),
                        file: selection.file.clone(),
                        tags: selection.tags.clone(),
                        loading: false,
                        error: selection.error.clone(),
                        session: Some(token),
                    };
                });
                match applied {
                    Some(()) => {
                        if let Some(message) = &selection.error {
                            tracing::warn!(session = %token, "{message}");
                        }
                        tracing::debug!(
                            session = %token,
                            group = %selection.group.id,
                            file = ?selection.file.as_ref().map(|f| &f.id),
                            tags = selection.tags.len(),
                            "selection applied"
                        );
                        Resolution::Applied(selection)
                    }
                    None => Resolution::Superseded,
                }
            }
            Ok(None) => {
                let cleared = self.commit(token, |shared| {
                    shared.view = NavigationState {
                        session: Some(token),
                        ..NavigationState::default()
                    };
                });
                match cleared {
                    Some(()) => Resolution::Empty,
                    None => Resolution::Superseded,
                }
            }
            Err(Interrupt::Stale) => {
                tracing::debug!(session = %token, "session superseded, result dropped");
                Resolution::Superseded
            }
            Err(Interrupt::Failed(message)) => {
                let surfaced = self.commit(token, |shared| {
                    shared.view.loading = false;
                    shared.view.error = Some(message.clone());
                });
                match surfaced {
                    Some(()) => {
                        tracing::warn!(session = %token, "{message}");
                        Resolution::Failed(message)
                    }
                    None => Resolution::Superseded,
                }
            }
        }
    }

    // -- Loading steps --

    async fn load_group(&self, token: SequenceId, group_id: &str) -> Result<DocGroup, Interrupt> {
        if let Some(group) = self.find_group(group_id) {
            return Ok(group);
        }
        let fetched = self.api.get_group(group_id).await;
        self.ensure_current(token)?;
        let group = fetched
            .map_err(|e| Interrupt::Failed(format!("Failed to load group \"{group_id}\": {e}")))?;
        self.commit(token, |shared| merge_group(&mut shared.groups, group.clone()))
            .ok_or(Interrupt::Stale)?;
        Ok(group)
    }

    /// Listed files may come without content; fill it from the detail endpoint.
    async fn load_file(&self, token: SequenceId, file: DocFile) -> Result<DocFile, Interrupt> {
        if file.content.is_some() {
            return Ok(file);
        }
        if let Some(cached) = self.file_cache.get(&file.id) {
            return Ok(cached);
        }
        let fetched = self.api.get_file(&file.id).await;
        self.ensure_current(token)?;
        let detail = fetched
            .map_err(|e| Interrupt::Failed(format!("Failed to load file \"{}\": {e}", file.id)))?;
        self.commit(token, |_| self.file_cache.put(file.id.clone(), detail.clone()))
            .ok_or(Interrupt::Stale)?;
        Ok(detail)
    }

    /// Tags for a file. A failed fetch yields no tags plus its message,
    /// and nothing is cached for it.
    async fn load_tags(
        &self,
        token: SequenceId,
        file_id: &str,
    ) -> Result<(Vec<BusinessFlowTag>, Option<String>), Interrupt> {
        if let Some(cached) = self.tag_cache.get(&file_id.to_string()) {
            return Ok((cached, None));
        }
        let (mut tags, failure) = tags_or_empty(self.api.as_ref(), file_id).await;
        self.ensure_current(token)?;
        if failure.is_some() {
            return Ok((tags, failure));
        }
        tags.iter_mut().for_each(BusinessFlowTag::normalize_terminal_step);
        self.commit(token, |_| self.tag_cache.put(file_id.to_string(), tags.clone()))
            .ok_or(Interrupt::Stale)?;
        Ok((tags, None))
    }

    async fn resolve_in_session(
        &self,
        token: SequenceId,
        group_id: &str,
        file_id: Option<&str>,
    ) -> Result<ResolvedSelection, Interrupt> {
        let group = self.load_group(token, group_id).await?;

        let Some(selected) = select_file(&group, file_id).cloned() else {
            return Ok(ResolvedSelection {
                group,
                file: None,
                tags: Vec::new(),
                error: None,
            });
        };

        let file = self.load_file(token, selected).await?;
        let (tags, error) = self.load_tags(token, &file.id).await?;
        Ok(ResolvedSelection {
            group,
            file: Some(file),
            tags,
            error,
        })
    }

    async fn reload_in_session(
        &self,
        token: SequenceId,
        previous_group: Option<String>,
        previous_file: Option<String>,
    ) -> Result<Option<ResolvedSelection>, Interrupt> {
        // A failed list reads as an empty hierarchy.
        let (groups, failure) = list_groups_or_empty(self.api.as_ref()).await;
        self.ensure_current(token)?;

        let target = reload_target(&groups, previous_group, previous_file);
        let count = groups.len();
        self.commit(token, |shared| {
            shared.groups = groups;
            self.file_cache.clear();
            self.tag_cache.clear();
            if failure.is_some() {
                shared.view = NavigationState {
                    session: Some(token),
                    ..NavigationState::default()
                };
            }
        })
        .ok_or(Interrupt::Stale)?;
        tracing::debug!(session = %token, groups = count, "hierarchy reloaded, caches cleared");

        if let Some(message) = failure {
            return Err(Interrupt::Failed(message));
        }

        match target {
            Some((group_id, file_id)) => self
                .resolve_in_session(token, &group_id, file_id.as_deref())
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    fn begin_reload(&self) -> (SequenceId, Option<String>, Option<String>) {
        let token = self.begin();
        let shared = self.shared.read();
        (
            token,
            shared.view.selected_group_id.clone(),
            shared.view.selected_file_id.clone(),
        )
    }

    // -- Operations --

    /// Resolve a group (and optionally a file) into the visible selection.
    pub async fn resolve(&self, group_id: &str, file_id: Option<&str>) -> Resolution {
        let token = self.begin();
        tracing::debug!(session = %token, group = group_id, file = ?file_id, "resolving");
        let outcome = self.resolve_in_session(token, group_id, file_id).await;
        self.finish(token, outcome.map(Some))
    }

    /// Re-fetch the hierarchy, clear the caches, and restore the previous
    /// selection by identity (falling back to the first group).
    pub async fn reload(&self) -> Resolution {
        let (token, previous_group, previous_file) = self.begin_reload();
        let outcome = self
            .reload_in_session(token, previous_group, previous_file)
            .await;
        self.finish(token, outcome)
    }

    /// First load: fetch the hierarchy and select the first group.
    pub async fn initialize(&self) -> Resolution {
        self.reload().await
    }

    /// Ask the backend to rescan its sources, then reload.
    pub async fn rescan(&self) -> Resolution {
        let (token, previous_group, previous_file) = self.begin_reload();
        let outcome = async {
            let triggered = self.api.trigger_rescan().await;
            self.ensure_current(token)?;
            let message = triggered
                .map_err(|e| Interrupt::Failed(format!("Failed to trigger documentation rescan: {e}")))?;
            tracing::info!(session = %token, "backend rescan: {message}");
            self.reload_in_session(token, previous_group, previous_file)
                .await
        }
        .await;
        self.finish(token, outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
