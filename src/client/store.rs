//! # Block Store
//!
//! Authoritative local mirror of one project's context blocks, and the single
//! source of truth for rendering.
//!
//! ## Write Policies
//!
//! - **Write-through** (`upsert_field`, `remove`, `create`, accept): local
//!   state changes only after the backend confirms the write.
//! - **Optimistic + self-heal** (`reorder`): local order changes immediately;
//!   if persisting fails the store re-fetches from the backend.
//!
//! ## Ordering
//!
//! Writes are serialized per block through a lane: at most one request per
//! block id is in flight, and each write re-reads the block after entering its
//! lane so it builds on the last confirmed value. Writes to different blocks
//! proceed independently.
//!
//! ## Stale Responses
//!
//! The store is bound to a [`Scope`] (project id plus an epoch bumped on every
//! project selection). A completion is applied only if the scope captured when
//! the request was issued is still current; otherwise the response is dropped
//! and the call returns [`ClientError::Stale`].

use crate::client::gateway::Gateway;
use crate::client::history::{BlockSnapshot, History};
use crate::shared::block::{BlockContent, BlockField, BlockId, BlockType, ContextBlock, NewBlockRequest};
use crate::shared::error::{ClientError, Result};
use crate::shared::project::ProjectId;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// The project a piece of client state belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub project_id: ProjectId,
    /// Bumped on every selection, so re-selecting a project starts a new scope
    pub epoch: u64,
}

impl Scope {
    pub fn new(project_id: ProjectId, epoch: u64) -> Self {
        Self { project_id, epoch }
    }
}

/// Direction for [`BlockStore::move_block`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Default)]
struct StoreState {
    scope: Option<Scope>,
    blocks: IndexMap<BlockId, ContextBlock>,
}

/// Outcome of a lane-serialized write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    Written,
    /// Nothing to persist (e.g. accept with no pending content)
    Skipped,
}

/// Edits performed through [`BlockStore::persist`]
#[derive(Debug, Clone)]
pub(crate) enum Edit {
    Field(BlockField),
    AcceptPending,
}

/// Per-block write serialization
#[derive(Debug, Default)]
struct WriteLanes {
    lanes: Mutex<HashMap<BlockId, Arc<Mutex<()>>>>,
}

impl WriteLanes {
    async fn enter(&self, block_id: &BlockId) -> OwnedMutexGuard<()> {
        let lane = {
            let mut lanes = self.lanes.lock().await;
            lanes.entry(block_id.clone()).or_default().clone()
        };
        lane.lock_owned().await
    }

    async fn forget(&self, block_id: &BlockId) {
        self.lanes.lock().await.remove(block_id);
    }

    async fn clear(&self) {
        self.lanes.lock().await.clear();
    }
}

/// Local mirror of the active project's context blocks
pub struct BlockStore {
    gateway: Arc<dyn Gateway>,
    state: RwLock<StoreState>,
    lanes: WriteLanes,
    history: RwLock<History<BlockSnapshot>>,
}

impl std::fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockStore").finish_non_exhaustive()
    }
}

impl BlockStore {
    pub fn new(gateway: Arc<dyn Gateway>, history_limit: usize) -> Self {
        Self {
            gateway,
            state: RwLock::new(StoreState::default()),
            lanes: WriteLanes::default(),
            history: RwLock::new(History::new(history_limit)),
        }
    }

    /// Bind the store to a project; blocks and history start empty
    pub async fn enter(&self, scope: Scope) {
        tracing::debug!("[STORE] Entering project {} (epoch {})", scope.project_id, scope.epoch);
        {
            let mut state = self.state.write().await;
            state.scope = Some(scope);
            state.blocks.clear();
        }
        self.history.write().await.clear();
        self.lanes.clear().await;
    }

    /// Unbind from any project
    pub async fn leave(&self) {
        {
            let mut state = self.state.write().await;
            state.scope = None;
            state.blocks.clear();
        }
        self.history.write().await.clear();
        self.lanes.clear().await;
    }

    /// Replace the entire block set
    pub async fn load(&self, blocks: Vec<ContextBlock>) {
        let mut state = self.state.write().await;
        state.blocks = blocks.into_iter().map(|b| (b.id.clone(), b)).collect();
    }

    /// Fetch the block set from the backend and `load` it
    pub async fn refresh(&self) -> Result<()> {
        let scope = self.scope().await?;
        let blocks = self.gateway.list_blocks(&scope.project_id).await.map_err(|e| {
            tracing::warn!("[STORE] Failed to fetch blocks for {}: {}", scope.project_id, e);
            e
        })?;

        let mut state = self.state.write().await;
        Self::check_scope(&state, &scope)?;
        tracing::debug!("[STORE] Loaded {} blocks for {}", blocks.len(), scope.project_id);
        state.blocks = blocks.into_iter().map(|b| (b.id.clone(), b)).collect();
        Ok(())
    }

    /// Update one field of one block, write-through.
    ///
    /// Title and content changes are recorded in history; the collapse flag
    /// is persisted but not recorded.
    pub async fn upsert_field(&self, block_id: &BlockId, field: BlockField) -> Result<()> {
        let scope = self.scope().await?;
        let historied = field.is_historied();
        self.persist(&scope, block_id, Edit::Field(field)).await?;
        if historied {
            self.record_snapshot(&scope).await;
        }
        Ok(())
    }

    pub async fn set_collapsed(&self, block_id: &BlockId, collapsed: bool) -> Result<()> {
        self.upsert_field(block_id, BlockField::Collapsed(collapsed)).await
    }

    /// Delete remotely, then locally
    pub async fn remove(&self, block_id: &BlockId) -> Result<()> {
        let scope = self.scope().await?;
        self.get(block_id)
            .await
            .ok_or_else(|| ClientError::block_not_found(block_id))?;

        let lane = self.lanes.enter(block_id).await;
        self.gateway
            .delete_block(&scope.project_id, block_id)
            .await
            .map_err(|e| {
                tracing::warn!("[STORE] Failed to delete block {}: {}", block_id, e);
                e
            })?;

        {
            let mut state = self.state.write().await;
            Self::check_scope(&state, &scope)?;
            state.blocks.shift_remove(block_id);
        }
        drop(lane);
        self.lanes.forget(block_id).await;
        tracing::debug!("[STORE] Removed block {}", block_id);
        Ok(())
    }

    /// Apply a new order locally, then persist; re-fetch on failure
    pub async fn reorder(&self, order: Vec<BlockId>) -> Result<()> {
        let scope = {
            let mut state = self.state.write().await;
            let scope = state.scope.clone().ok_or(ClientError::NoActiveProject)?;
            Self::validate_order(&state.blocks, &order)?;
            let mut reordered = IndexMap::with_capacity(order.len());
            for id in &order {
                if let Some(block) = state.blocks.shift_remove(id) {
                    reordered.insert(id.clone(), block);
                }
            }
            state.blocks = reordered;
            scope
        };

        match self.gateway.reorder_blocks(&scope.project_id, &order).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("[STORE] Failed to persist block order, re-fetching: {}", e);
                if let Err(refresh_error) = self.refresh().await {
                    tracing::warn!("[STORE] Re-fetch after reorder failure failed: {}", refresh_error);
                }
                Err(e)
            }
        }
    }

    /// Swap a block with its neighbour
    pub async fn move_block(&self, block_id: &BlockId, direction: Direction) -> Result<()> {
        let mut order = self.order().await;
        let index = order
            .iter()
            .position(|id| id == block_id)
            .ok_or_else(|| ClientError::block_not_found(block_id))?;
        let target = match direction {
            Direction::Up if index > 0 => index - 1,
            Direction::Down if index + 1 < order.len() => index + 1,
            _ => return Ok(()),
        };
        order.swap(index, target);
        self.reorder(order).await
    }

    /// Create a block remotely and append the returned block
    pub async fn create(&self, title: &str, block_type: BlockType) -> Result<ContextBlock> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ClientError::validation("title", "Block title cannot be empty"));
        }
        let scope = self.scope().await?;
        let block = self
            .gateway
            .create_block(&scope.project_id, NewBlockRequest::new(title, block_type))
            .await
            .map_err(|e| {
                tracing::warn!("[STORE] Failed to create block '{}': {}", title, e);
                e
            })?;

        let mut state = self.state.write().await;
        Self::check_scope(&state, &scope)?;
        state.blocks.insert(block.id.clone(), block.clone());
        tracing::debug!("[STORE] Created block {} '{}'", block.id, block.title);
        Ok(block)
    }

    /// Blocks in display order
    pub async fn blocks(&self) -> Vec<ContextBlock> {
        self.state.read().await.blocks.values().cloned().collect()
    }

    pub async fn get(&self, block_id: &BlockId) -> Option<ContextBlock> {
        self.state.read().await.blocks.get(block_id).cloned()
    }

    /// Block ids in display order (the reorder wire format)
    pub async fn order(&self) -> Vec<BlockId> {
        self.state.read().await.blocks.keys().cloned().collect()
    }

    /// Ids of blocks with pending content, in display order
    pub async fn pending_ids(&self) -> Vec<BlockId> {
        self.state
            .read()
            .await
            .blocks
            .values()
            .filter(|b| b.has_pending())
            .map(|b| b.id.clone())
            .collect()
    }

    pub async fn project_id(&self) -> Option<ProjectId> {
        self.state.read().await.scope.as_ref().map(|s| s.project_id.clone())
    }

    pub async fn scope(&self) -> Result<Scope> {
        self.state.read().await.scope.clone().ok_or(ClientError::NoActiveProject)
    }

    pub async fn can_undo(&self) -> bool {
        self.history.read().await.can_undo()
    }

    pub async fn can_redo(&self) -> bool {
        self.history.read().await.can_redo()
    }

    /// Step back one snapshot and restore it locally
    pub async fn undo(&self) -> Result<()> {
        let snapshot = self.history.write().await.undo()?;
        self.load(snapshot.blocks).await;
        Ok(())
    }

    /// Step forward one snapshot and restore it locally
    pub async fn redo(&self) -> Result<()> {
        let snapshot = self.history.write().await.redo()?;
        self.load(snapshot.blocks).await;
        Ok(())
    }

    /// Number of snapshots in history
    pub async fn history_len(&self) -> usize {
        self.history.read().await.len()
    }

    /// Set or clear a block's pending content (local only)
    pub(crate) async fn set_pending(
        &self,
        scope: &Scope,
        block_id: &BlockId,
        pending: Option<String>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        Self::check_scope(&state, scope)?;
        let block = state
            .blocks
            .get_mut(block_id)
            .ok_or_else(|| ClientError::block_not_found(block_id))?;
        let changed = block.pending_content != pending;
        block.pending_content = pending;
        Ok(changed)
    }

    /// Clear pending content on every block (local only)
    pub(crate) async fn clear_all_pending(&self) -> usize {
        let mut state = self.state.write().await;
        state
            .blocks
            .values_mut()
            .filter_map(|b| b.pending_content.take())
            .count()
    }

    /// Snapshot the current block array into history.
    ///
    /// Records nothing and returns `false` once `scope` is no longer current.
    pub(crate) async fn record_snapshot(&self, scope: &Scope) -> bool {
        let state = self.state.read().await;
        if Self::check_scope(&state, scope).is_err() {
            return false;
        }
        let snapshot = BlockSnapshot::capture(state.blocks.values().cloned().collect());
        self.history.write().await.record(snapshot);
        true
    }

    /// Lane-serialized write-through of one edit issued under `scope`
    pub(crate) async fn persist(&self, scope: &Scope, block_id: &BlockId, edit: Edit) -> Result<Applied> {
        self.get(block_id)
            .await
            .ok_or_else(|| ClientError::block_not_found(block_id))?;

        let _lane = self.lanes.enter(block_id).await;

        // Re-read inside the lane: an earlier write may have just landed.
        let current = {
            let state = self.state.read().await;
            Self::check_scope(&state, scope)?;
            state
                .blocks
                .get(block_id)
                .cloned()
                .ok_or_else(|| ClientError::block_not_found(block_id))?
        };

        let (updated, accepted) = match &edit {
            Edit::Field(field) => {
                Self::validate_field(&current, field)?;
                (current.with_field(field), None)
            }
            Edit::AcceptPending => match &current.pending_content {
                None => return Ok(Applied::Skipped),
                Some(pending) => {
                    let mut updated = current.clone();
                    updated.content = BlockContent::from_proposal(current.block_type(), pending);
                    updated.pending_content = None;
                    (updated, Some(pending.clone()))
                }
            },
        };

        tracing::debug!("[STORE] Persisting {} of block {}", edit_name(&edit), block_id);
        self.gateway
            .update_block(&scope.project_id, &updated)
            .await
            .map_err(|e| {
                tracing::warn!("[STORE] Failed to persist block {}: {}", block_id, e);
                e
            })?;

        let mut state = self.state.write().await;
        Self::check_scope(&state, scope)?;
        let block = state
            .blocks
            .get_mut(block_id)
            .ok_or_else(|| ClientError::block_not_found(block_id))?;
        match &edit {
            Edit::Field(field) => block.apply(field),
            Edit::AcceptPending => {
                block.content = updated.content;
                // A newer proposal that arrived mid-flight stays pending.
                if block.pending_content == accepted {
                    block.pending_content = None;
                }
            }
        }
        Ok(Applied::Written)
    }

    fn validate_field(block: &ContextBlock, field: &BlockField) -> Result<()> {
        match field {
            BlockField::Title(title) if title.trim().is_empty() => {
                Err(ClientError::validation("title", "Block title cannot be empty"))
            }
            BlockField::Content(_) if block.has_pending() => Err(ClientError::PendingReview {
                block_id: block.id.clone(),
            }),
            BlockField::Content(content) if content.block_type() != block.block_type() => {
                Err(ClientError::validation(
                    "content",
                    format!(
                        "{} content does not fit a {} block",
                        content.block_type(),
                        block.block_type()
                    ),
                ))
            }
            _ => Ok(()),
        }
    }

    fn validate_order(blocks: &IndexMap<BlockId, ContextBlock>, order: &[BlockId]) -> Result<()> {
        let requested: HashSet<&BlockId> = order.iter().collect();
        let is_permutation = order.len() == blocks.len()
            && requested.len() == order.len()
            && order.iter().all(|id| blocks.contains_key(id));
        if is_permutation {
            Ok(())
        } else {
            Err(ClientError::validation(
                "order",
                "New order must list every block exactly once",
            ))
        }
    }

    fn check_scope(state: &StoreState, issued: &Scope) -> Result<()> {
        if state.scope.as_ref() == Some(issued) {
            Ok(())
        } else {
            tracing::debug!("[STORE] Dropping stale response for {}", issued.project_id);
            Err(ClientError::Stale {
                project_id: issued.project_id.clone(),
            })
        }
    }
}

fn edit_name(edit: &Edit) -> &'static str {
    match edit {
        Edit::Field(field) => field.name(),
        Edit::AcceptPending => "accepted proposal",
    }
}
