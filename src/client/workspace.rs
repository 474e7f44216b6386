//! # Project/Session Orchestrator
//!
//! The [`Workspace`] owns the project list and wires the gateway, block store,
//! reconciler and chat session together for the active project.
//!
//! ## Features
//!
//! - **Project lifecycle**: list, create (and select), rename, delete
//! - **Selection**: each selection starts a new scope; blocks and chat history
//!   are fetched concurrently, and responses for an older selection are dropped
//! - **Block commands**: thin delegation to the store and the reconciler
//! - **Content assists**: generate, improve and fix, suspended while a block
//!   has a proposal awaiting review
//! - **Plugins**: the backend's plugin registry, re-fetched after every change
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use structured_chat::client::{MemoryGateway, Workspace};
//!
//! # async fn demo() -> structured_chat::shared::Result<()> {
//! let workspace = Workspace::new(Arc::new(MemoryGateway::new()), 100);
//! workspace.create_project("Research").await?;
//! workspace.send_message("Summarise the notes").await?;
//! # Ok(())
//! # }
//! ```

use crate::client::chat::{ChatOutcome, ChatSession};
use crate::client::config::Config;
use crate::client::diff::{DiffSpan, Granularity};
use crate::client::gateway::{Gateway, HttpGateway};
use crate::client::reconcile::{AcceptAllReport, Reconciler};
use crate::client::store::{BlockStore, Direction, Scope};
use crate::shared::block::{BlockContent, BlockField, BlockId, BlockType, ContextBlock};
use crate::shared::chat::ChatMessage;
use crate::shared::error::{ClientError, Result};
use crate::shared::plugin::{NewPlugin, PluginId, PluginInfo};
use crate::shared::project::{Project, ProjectId};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Where the result of a content assist went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistOutcome {
    /// Written straight into an empty block
    Written(String),
    /// Attached as a pending proposal
    Proposed(String),
}

/// Application-level session over one backend
pub struct Workspace {
    gateway: Arc<dyn Gateway>,
    store: Arc<BlockStore>,
    reconciler: Reconciler,
    chat: ChatSession,
    projects: RwLock<Vec<Project>>,
    plugins: RwLock<Vec<PluginInfo>>,
    epoch: AtomicU64,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("epoch", &self.epoch.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Workspace {
    pub fn new(gateway: Arc<dyn Gateway>, history_limit: usize) -> Self {
        let store = Arc::new(BlockStore::new(gateway.clone(), history_limit));
        let reconciler = Reconciler::new(store.clone());
        let chat = ChatSession::new(gateway.clone(), store.clone(), reconciler.clone());
        Self {
            gateway,
            store,
            reconciler,
            chat,
            projects: RwLock::new(Vec::new()),
            plugins: RwLock::new(Vec::new()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Workspace over the HTTP backend named in `config`
    pub fn connect(config: Config) -> Result<Self> {
        let history_limit = config.history_limit();
        let gateway = HttpGateway::new(config)?;
        Ok(Self::new(Arc::new(gateway), history_limit))
    }

    pub fn store(&self) -> &Arc<BlockStore> {
        &self.store
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    // ---- Projects ----

    pub async fn projects(&self) -> Vec<Project> {
        self.projects.read().await.clone()
    }

    /// The selected project, if it is in the project list
    pub async fn active_project(&self) -> Option<Project> {
        let id = self.store.project_id().await?;
        self.projects.read().await.iter().find(|p| p.id == id).cloned()
    }

    pub async fn active_project_id(&self) -> Option<ProjectId> {
        self.store.project_id().await
    }

    /// Re-fetch the project list; on failure the current list is kept
    pub async fn refresh_projects(&self) -> Result<Vec<Project>> {
        let projects = self.gateway.list_projects().await.map_err(|e| {
            tracing::warn!("[WORKSPACE] Failed to fetch projects: {}", e);
            e
        })?;
        tracing::debug!("[WORKSPACE] Loaded {} projects", projects.len());
        *self.projects.write().await = projects.clone();
        Ok(projects)
    }

    /// Create a project and select it
    pub async fn create_project(&self, name: &str) -> Result<Project> {
        let name = validate_project_name(name)?;
        let project = self.gateway.create_project(name).await.map_err(|e| {
            tracing::warn!("[WORKSPACE] Failed to create project '{}': {}", name, e);
            e
        })?;
        self.projects.write().await.push(project.clone());
        tracing::info!("[WORKSPACE] Created project {} '{}'", project.id, project.name);
        self.select_project(&project.id).await?;
        Ok(project)
    }

    pub async fn rename_project(&self, project_id: &ProjectId, name: &str) -> Result<Project> {
        let name = validate_project_name(name)?;
        let renamed = self
            .gateway
            .rename_project(project_id, name)
            .await
            .map_err(|e| {
                tracing::warn!("[WORKSPACE] Failed to rename project {}: {}", project_id, e);
                e
            })?;
        let mut projects = self.projects.write().await;
        match projects.iter_mut().find(|p| &p.id == project_id) {
            Some(existing) => *existing = renamed.clone(),
            None => projects.push(renamed.clone()),
        }
        Ok(renamed)
    }

    /// Delete a project; deselects it when it is the active one
    pub async fn delete_project(&self, project_id: &ProjectId) -> Result<()> {
        self.gateway.delete_project(project_id).await.map_err(|e| {
            tracing::warn!("[WORKSPACE] Failed to delete project {}: {}", project_id, e);
            e
        })?;
        self.projects.write().await.retain(|p| &p.id != project_id);
        if self.store.project_id().await.as_ref() == Some(project_id) {
            self.deselect().await;
        }
        tracing::info!("[WORKSPACE] Deleted project {}", project_id);
        Ok(())
    }

    /// Make `project_id` active and load its blocks and chat history concurrently.
    ///
    /// A failed read is logged and leaves that part empty; the first error is
    /// returned after both reads settle.
    pub async fn select_project(&self, project_id: &ProjectId) -> Result<()> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let scope = Scope::new(project_id.clone(), epoch);
        tracing::debug!("[WORKSPACE] Selecting project {} (epoch {})", project_id, epoch);

        self.store.enter(scope.clone()).await;
        self.chat.enter(scope).await;

        let (blocks, history) = tokio::join!(self.store.refresh(), self.chat.load_history());
        blocks.and(history)
    }

    /// Clear the active project
    pub async fn deselect(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.store.leave().await;
        self.chat.leave().await;
    }

    // ---- Blocks ----

    pub async fn blocks(&self) -> Vec<ContextBlock> {
        self.store.blocks().await
    }

    pub async fn create_block(&self, title: &str, block_type: BlockType) -> Result<ContextBlock> {
        self.store.create(title, block_type).await
    }

    pub async fn rename_block(&self, block_id: &BlockId, title: &str) -> Result<()> {
        self.store
            .upsert_field(block_id, BlockField::Title(title.trim().to_string()))
            .await
    }

    pub async fn edit_content(&self, block_id: &BlockId, content: BlockContent) -> Result<()> {
        self.store.upsert_field(block_id, BlockField::Content(content)).await
    }

    pub async fn set_collapsed(&self, block_id: &BlockId, collapsed: bool) -> Result<()> {
        self.store.set_collapsed(block_id, collapsed).await
    }

    pub async fn delete_block(&self, block_id: &BlockId) -> Result<()> {
        self.store.remove(block_id).await
    }

    pub async fn reorder_blocks(&self, order: Vec<BlockId>) -> Result<()> {
        self.store.reorder(order).await
    }

    pub async fn move_block(&self, block_id: &BlockId, direction: Direction) -> Result<()> {
        self.store.move_block(block_id, direction).await
    }

    pub async fn undo(&self) -> Result<()> {
        self.store.undo().await
    }

    pub async fn redo(&self) -> Result<()> {
        self.store.redo().await
    }

    // ---- Proposals ----

    pub async fn accept(&self, block_id: &BlockId) -> Result<bool> {
        self.reconciler.accept(block_id).await
    }

    pub async fn reject(&self, block_id: &BlockId) -> Result<bool> {
        self.reconciler.reject(block_id).await
    }

    pub async fn accept_all(&self) -> AcceptAllReport {
        self.reconciler.accept_all().await
    }

    pub async fn reject_all(&self) -> usize {
        self.reconciler.reject_all().await
    }

    pub async fn diff(&self, block_id: &BlockId, granularity: Granularity) -> Result<Option<Vec<DiffSpan>>> {
        self.reconciler.diff(block_id, granularity).await
    }

    // ---- Content assists ----

    /// Generate content for a block.
    ///
    /// An empty block receives the text directly; otherwise it becomes a
    /// proposal.
    pub async fn generate_content(&self, block_id: &BlockId) -> Result<AssistOutcome> {
        let (scope, block) = self.assist_target(block_id).await?;
        let current = block.content.to_text();
        let generated = self
            .gateway
            .generate_content(&scope.project_id, block_id, &current)
            .await
            .map_err(|e| {
                tracing::warn!("[WORKSPACE] Content generation failed for {}: {}", block_id, e);
                e
            })?;
        self.ensure_current(&scope).await?;

        if block.content.is_empty() {
            let content = BlockContent::from_proposal(block.block_type(), &generated);
            self.store.upsert_field(block_id, BlockField::Content(content)).await?;
            Ok(AssistOutcome::Written(generated))
        } else {
            self.reconciler.propose(block_id, generated.clone()).await?;
            Ok(AssistOutcome::Proposed(generated))
        }
    }

    /// Ask for an improved version of the block's content, as a proposal
    pub async fn improve_content(&self, block_id: &BlockId) -> Result<AssistOutcome> {
        let (scope, block) = self.assist_target(block_id).await?;
        let improved = self
            .gateway
            .generate_content(&scope.project_id, block_id, &block.content.to_text())
            .await
            .map_err(|e| {
                tracing::warn!("[WORKSPACE] Content improvement failed for {}: {}", block_id, e);
                e
            })?;
        self.ensure_current(&scope).await?;
        self.reconciler.propose(block_id, improved.clone()).await?;
        Ok(AssistOutcome::Proposed(improved))
    }

    /// Ask for a corrected version of the block's content, as a proposal
    pub async fn fix_content(&self, block_id: &BlockId) -> Result<AssistOutcome> {
        let (scope, block) = self.assist_target(block_id).await?;
        let fixed = self
            .gateway
            .fix_content(&scope.project_id, block_id, &block.content.to_text())
            .await
            .map_err(|e| {
                tracing::warn!("[WORKSPACE] Content fix failed for {}: {}", block_id, e);
                e
            })?;
        self.ensure_current(&scope).await?;
        self.reconciler.propose(block_id, fixed.clone()).await?;
        Ok(AssistOutcome::Proposed(fixed))
    }

    // ---- Chat ----

    pub async fn send_message(&self, message: &str) -> Result<ChatOutcome> {
        self.chat.send(message).await
    }

    pub async fn clear_chat(&self) -> Result<()> {
        self.chat.clear_history().await
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.chat.messages().await
    }

    // ---- Plugins ----

    pub async fn plugins(&self) -> Vec<PluginInfo> {
        self.plugins.read().await.clone()
    }

    /// Re-fetch the plugin registry; on failure the current list is kept
    pub async fn refresh_plugins(&self) -> Result<Vec<PluginInfo>> {
        let plugins = self.gateway.list_plugins().await.map_err(|e| {
            tracing::warn!("[WORKSPACE] Failed to fetch plugins: {}", e);
            e
        })?;
        *self.plugins.write().await = plugins.clone();
        Ok(plugins)
    }

    /// Register a plugin, then re-fetch the registry
    pub async fn add_plugin(&self, name: &str, plugin_type: &str, config: Value) -> Result<Vec<PluginInfo>> {
        let (name, plugin_type) = (name.trim(), plugin_type.trim());
        if name.is_empty() {
            return Err(ClientError::validation("name", "Plugin name cannot be empty"));
        }
        if plugin_type.is_empty() {
            return Err(ClientError::validation("type", "Plugin type cannot be empty"));
        }
        let plugin = NewPlugin::new(name, plugin_type, config);
        self.gateway.add_plugin(&plugin).await.map_err(|e| {
            tracing::warn!("[WORKSPACE] Failed to add plugin '{}': {}", name, e);
            e
        })?;
        tracing::info!("[WORKSPACE] Added {} plugin '{}'", plugin_type, name);
        self.refresh_plugins().await
    }

    /// Unregister a plugin, then re-fetch the registry.
    ///
    /// The built-in text plugin cannot be removed.
    pub async fn remove_plugin(&self, plugin_id: &PluginId) -> Result<Vec<PluginInfo>> {
        let builtin = self
            .plugins
            .read()
            .await
            .iter()
            .any(|p| &p.id == plugin_id && p.is_builtin());
        if builtin {
            return Err(ClientError::validation("plugin", "The text plugin cannot be removed"));
        }
        self.gateway.remove_plugin(plugin_id).await.map_err(|e| {
            tracing::warn!("[WORKSPACE] Failed to remove plugin {}: {}", plugin_id, e);
            e
        })?;
        self.refresh_plugins().await
    }

    async fn assist_target(&self, block_id: &BlockId) -> Result<(Scope, ContextBlock)> {
        let scope = self.store.scope().await?;
        let block = self
            .store
            .get(block_id)
            .await
            .ok_or_else(|| ClientError::block_not_found(block_id))?;
        if block.has_pending() {
            return Err(ClientError::PendingReview {
                block_id: block_id.clone(),
            });
        }
        Ok((scope, block))
    }

    async fn ensure_current(&self, issued: &Scope) -> Result<()> {
        match self.store.scope().await {
            Ok(scope) if &scope == issued => Ok(()),
            _ => {
                tracing::debug!("[WORKSPACE] Dropping stale assist result for {}", issued.project_id);
                Err(ClientError::Stale {
                    project_id: issued.project_id.clone(),
                })
            }
        }
    }
}

fn validate_project_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientError::validation("name", "Project name cannot be empty"));
    }
    Ok(name)
}
