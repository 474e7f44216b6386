//! # Pending-Change Reconciler
//!
//! Manages AI-proposed content on blocks. A proposal lives in the block's
//! `pending_content` until the user accepts it (write-through to the backend,
//! then one history snapshot) or rejects it (local only).
//!
//! Proposals never create blocks: an update naming an unknown block id is
//! reported back to the caller instead.

use crate::client::diff::{self, DiffSpan, Granularity};
use crate::client::store::{Applied, BlockStore, Edit, Scope};
use crate::shared::block::BlockId;
use crate::shared::chat::ContextUpdate;
use crate::shared::error::{ClientError, Result};
use std::sync::Arc;

/// Result of forwarding a batch of context updates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProposalReport {
    /// Blocks that now carry the proposed content
    pub proposed: Vec<BlockId>,
    /// Updates whose block id matched no local block
    pub unmatched: Vec<ContextUpdate>,
}

/// First failure of an accept-all batch
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptFailure {
    pub block_id: BlockId,
    pub error: ClientError,
}

/// Outcome of [`Reconciler::accept_all`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptAllReport {
    pub accepted: Vec<BlockId>,
    pub failed: Option<AcceptFailure>,
    /// Pending blocks not attempted because the batch stopped early
    pub remaining: Vec<BlockId>,
}

impl AcceptAllReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

/// Accept/reject workflow over a [`BlockStore`]
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: Arc<BlockStore>,
}

impl Reconciler {
    pub fn new(store: Arc<BlockStore>) -> Self {
        Self { store }
    }

    /// Attach `new_content` as the block's pending proposal; the last one wins
    pub async fn propose(&self, block_id: &BlockId, new_content: impl Into<String>) -> Result<()> {
        let scope = self.store.scope().await?;
        self.propose_in(&scope, block_id, new_content.into()).await
    }

    async fn propose_in(&self, scope: &Scope, block_id: &BlockId, new_content: String) -> Result<()> {
        match self.store.set_pending(scope, block_id, Some(new_content)).await {
            Ok(_) => Ok(()),
            Err(ClientError::NotFound { .. }) => Err(ClientError::LookupFailure {
                block_id: block_id.clone(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Propose every update whose block exists; collect the rest.
    ///
    /// Fails with [`ClientError::Stale`] once `scope` is no longer current;
    /// the remaining updates are dropped.
    pub async fn apply_updates(&self, scope: &Scope, updates: &[ContextUpdate]) -> Result<ProposalReport> {
        let mut report = ProposalReport::default();
        for update in updates {
            match self
                .propose_in(scope, &update.block_id, update.new_content.clone())
                .await
            {
                Ok(()) => report.proposed.push(update.block_id.clone()),
                Err(e @ ClientError::Stale { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!("[RECONCILE] Dropping update for {}: {}", update.block_id, e);
                    report.unmatched.push(update.clone());
                }
            }
        }
        Ok(report)
    }

    /// Persist the pending proposal as the block's content.
    ///
    /// Returns `false` without touching the backend when nothing is pending.
    pub async fn accept(&self, block_id: &BlockId) -> Result<bool> {
        let scope = self.store.scope().await?;
        let applied = self.store.persist(&scope, block_id, Edit::AcceptPending).await?;
        if applied == Applied::Skipped {
            return Ok(false);
        }
        self.store.record_snapshot(&scope).await;
        tracing::debug!("[RECONCILE] Accepted proposal for {}", block_id);
        Ok(true)
    }

    /// Discard the pending proposal (local only)
    pub async fn reject(&self, block_id: &BlockId) -> Result<bool> {
        let scope = self.store.scope().await?;
        self.store.set_pending(&scope, block_id, None).await
    }

    /// Accept every pending block in display order, stopping at the first failure.
    ///
    /// Blocks accepted before the failure stay accepted. One snapshot covers
    /// the whole batch, and none is taken if the project changed meanwhile.
    pub async fn accept_all(&self) -> AcceptAllReport {
        let mut report = AcceptAllReport::default();
        let Ok(scope) = self.store.scope().await else {
            return report;
        };
        let pending = self.store.pending_ids().await;

        let mut queue = pending.into_iter();
        while let Some(block_id) = queue.next() {
            match self.store.persist(&scope, &block_id, Edit::AcceptPending).await {
                Ok(Applied::Written) => report.accepted.push(block_id),
                Ok(Applied::Skipped) => {}
                Err(error) => {
                    tracing::warn!("[RECONCILE] Accept all stopped at {}: {}", block_id, error);
                    report.failed = Some(AcceptFailure { block_id, error });
                    report.remaining = queue.by_ref().collect();
                    break;
                }
            }
        }

        if !report.accepted.is_empty() {
            self.store.record_snapshot(&scope).await;
        }
        report
    }

    /// Discard every pending proposal (local only)
    pub async fn reject_all(&self) -> usize {
        self.store.clear_all_pending().await
    }

    /// Diff a block's current content against its proposal, if any
    pub async fn diff(&self, block_id: &BlockId, granularity: Granularity) -> Result<Option<Vec<DiffSpan>>> {
        let block = self
            .store
            .get(block_id)
            .await
            .ok_or_else(|| ClientError::block_not_found(block_id))?;
        Ok(block.pending_content.as_deref().map(|proposed| {
            let current = block.content.to_text();
            diff::compute(Some(&current), proposed, granularity)
        }))
    }
}
