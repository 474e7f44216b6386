//! Chat Message Data Structures
//!
//! Messages exchanged with the chat backend and the context updates the
//! assistant may propose alongside a reply.

use crate::shared::block::BlockId;
use serde::{Deserialize, Deserializer, Serialize};

/// Number of characters of each proposal quoted in [`ChatMessage::update_summary`]
const SUMMARY_PREVIEW_CHARS: usize = 50;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    /// Client-generated notices (send failures, unmatched proposals)
    System,
}

/// A proposed replacement for one block's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextUpdate {
    pub block_id: BlockId,
    #[serde(default)]
    pub block_title: String,
    pub new_content: String,
}

/// One entry of a project's conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_updates: Option<Vec<ContextUpdate>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            context_updates: None,
        }
    }

    /// Assistant reply; an empty update list is stored as `None`
    pub fn assistant(content: impl Into<String>, updates: Vec<ContextUpdate>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            context_updates: if updates.is_empty() { None } else { Some(updates) },
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            context_updates: None,
        }
    }

    /// Note listing the blocks this reply proposed changes to
    pub fn update_summary(&self) -> Option<String> {
        let updates = self.context_updates.as_ref().filter(|u| !u.is_empty())?;
        let lines: Vec<String> = updates
            .iter()
            .map(|update| {
                let title = if update.block_title.is_empty() {
                    "Untitled Block"
                } else {
                    update.block_title.as_str()
                };
                let preview: String = update.new_content.chars().take(SUMMARY_PREVIEW_CHARS).collect();
                format!("- \"{}\": {}...", title, preview)
            })
            .collect();
        Some(format!(
            "I've suggested updates to the following context blocks:\n{}",
            lines.join("\n")
        ))
    }
}

/// Request body for `POST /projects/{id}/chat`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Response body of `POST /projects/{id}/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub context_updates: Vec<ContextUpdate>,
}

/// Request body for `generate_content` and `fix_content`
#[derive(Debug, Clone, Serialize)]
pub struct ContentRequest {
    pub block_id: BlockId,
    pub content: String,
}

/// Response body of `POST /projects/{id}/generate_content`
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedContent {
    pub content: String,
}

/// Response body of `POST /projects/{id}/fix_content`
#[derive(Debug, Clone, Deserialize)]
pub struct FixedContent {
    pub fixed_content: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ContextUpdate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ContextUpdate>>::deserialize(deserializer)?.unwrap_or_default())
}
