//! # Chat Session Controller
//!
//! Holds the active project's conversation and links assistant replies to the
//! Pending-Change Reconciler.
//!
//! ## Send Flow
//!
//! 1. Blank messages are rejected before anything is appended.
//! 2. The user message is appended immediately.
//! 3. On failure a system notice is appended and the error returned.
//! 4. On success the assistant reply is appended and its context updates are
//!    proposed by block id. A reply without updates triggers a block refresh.
//!
//! Replies that arrive after the active project changed are dropped.

use crate::client::gateway::Gateway;
use crate::client::reconcile::Reconciler;
use crate::client::store::{BlockStore, Scope};
use crate::shared::block::BlockId;
use crate::shared::chat::{ChatMessage, ChatReply, ContextUpdate};
use crate::shared::error::{ClientError, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

/// What a successful `send` did
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub reply: ChatReply,
    /// Blocks that received a proposal
    pub proposed: Vec<BlockId>,
    /// Updates that named no local block
    pub unmatched: Vec<ContextUpdate>,
    /// Whether the block set was re-fetched
    pub refreshed: bool,
}

#[derive(Debug, Default)]
struct ChatState {
    scope: Option<Scope>,
    messages: Vec<ChatMessage>,
}

/// Conversation state for the active project
pub struct ChatSession {
    gateway: Arc<dyn Gateway>,
    store: Arc<BlockStore>,
    reconciler: Reconciler,
    state: RwLock<ChatState>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession").finish_non_exhaustive()
    }
}

impl ChatSession {
    pub fn new(gateway: Arc<dyn Gateway>, store: Arc<BlockStore>, reconciler: Reconciler) -> Self {
        Self {
            gateway,
            store,
            reconciler,
            state: RwLock::new(ChatState::default()),
        }
    }

    /// Bind to a project with an empty conversation
    pub async fn enter(&self, scope: Scope) {
        let mut state = self.state.write().await;
        state.scope = Some(scope);
        state.messages.clear();
    }

    pub async fn leave(&self) {
        let mut state = self.state.write().await;
        state.scope = None;
        state.messages.clear();
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().await.messages.clone()
    }

    /// Replace the conversation with the backend's history
    pub async fn load_history(&self) -> Result<()> {
        let scope = self.scope().await?;
        let messages = self.gateway.chat_history(&scope.project_id).await.map_err(|e| {
            tracing::warn!("[CHAT] Failed to fetch chat history for {}: {}", scope.project_id, e);
            e
        })?;

        let mut state = self.state.write().await;
        Self::check_scope(&state, &scope)?;
        tracing::debug!("[CHAT] Loaded {} messages for {}", messages.len(), scope.project_id);
        state.messages = messages;
        Ok(())
    }

    /// Clear the conversation remotely, then locally
    pub async fn clear_history(&self) -> Result<()> {
        let scope = self.scope().await?;
        self.gateway
            .clear_chat_history(&scope.project_id)
            .await
            .map_err(|e| {
                tracing::warn!("[CHAT] Failed to clear chat history: {}", e);
                e
            })?;

        let mut state = self.state.write().await;
        Self::check_scope(&state, &scope)?;
        state.messages.clear();
        Ok(())
    }

    /// Send a user message and route the reply's context updates
    pub async fn send(&self, message: &str) -> Result<ChatOutcome> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ClientError::validation("message", "Message cannot be empty"));
        }

        let scope = {
            let mut state = self.state.write().await;
            let scope = state.scope.clone().ok_or(ClientError::NoActiveProject)?;
            state.messages.push(ChatMessage::user(message));
            scope
        };

        let reply = match self.gateway.send_chat(&scope.project_id, message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("[CHAT] Failed to send message: {}", e);
                let mut state = self.state.write().await;
                if state.scope.as_ref() == Some(&scope) {
                    state
                        .messages
                        .push(ChatMessage::system(format!("Failed to get a response: {}", e)));
                }
                return Err(e);
            }
        };

        {
            let mut state = self.state.write().await;
            Self::check_scope(&state, &scope)?;
            state.messages.push(ChatMessage::assistant(
                reply.response.clone(),
                reply.context_updates.clone(),
            ));
        }

        let mut outcome = ChatOutcome {
            reply,
            proposed: Vec::new(),
            unmatched: Vec::new(),
            refreshed: false,
        };

        if outcome.reply.context_updates.is_empty() {
            match self.store.refresh().await {
                Ok(()) => outcome.refreshed = true,
                Err(e) => tracing::warn!("[CHAT] Block refresh after reply failed: {}", e),
            }
            return Ok(outcome);
        }

        let report = self
            .reconciler
            .apply_updates(&scope, &outcome.reply.context_updates)
            .await?;
        if !report.unmatched.is_empty() {
            let names: Vec<String> = report
                .unmatched
                .iter()
                .map(|u| {
                    if u.block_title.is_empty() {
                        u.block_id.to_string()
                    } else {
                        format!("{} ({})", u.block_title, u.block_id)
                    }
                })
                .collect();
            let mut state = self.state.write().await;
            Self::check_scope(&state, &scope)?;
            state.messages.push(ChatMessage::system(format!(
                "Could not apply suggested updates to unknown blocks: {}",
                names.join(", ")
            )));
        }
        outcome.proposed = report.proposed;
        outcome.unmatched = report.unmatched;
        Ok(outcome)
    }

    async fn scope(&self) -> Result<Scope> {
        self.state.read().await.scope.clone().ok_or(ClientError::NoActiveProject)
    }

    fn check_scope(state: &ChatState, issued: &Scope) -> Result<()> {
        if state.scope.as_ref() == Some(issued) {
            Ok(())
        } else {
            tracing::debug!("[CHAT] Dropping stale reply for {}", issued.project_id);
            Err(ClientError::Stale {
                project_id: issued.project_id.clone(),
            })
        }
    }
}
