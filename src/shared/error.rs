//! Shared Error Types
//!
//! This module defines the error taxonomy used across the client core. Every
//! fallible operation on the gateway, block store, reconciler, history and
//! chat session returns a [`ClientError`].
//!
//! # Error Categories
//!
//! - `Network` - a request failed to complete or returned a non-success status
//! - `NotFound` - a referenced block, project or plugin id is absent
//! - `Validation` - an empty required field or a malformed argument
//! - `Unavailable` - undo/redo requested at a history bound
//! - `LookupFailure` - a proposal references a block the store does not know
//! - `PendingReview` - the block has a proposal awaiting accept/reject
//! - `Stale` - a response arrived after the active project changed
//!
//! # Usage
//!
//! ```rust
//! use structured_chat::shared::error::ClientError;
//!
//! let error = ClientError::validation("title", "Block title cannot be empty");
//! assert!(error.to_string().contains("title"));
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync + Clone` and can be stored in reports.
use crate::shared::block::BlockId;
use crate::shared::plugin::PluginId;
use crate::shared::project::ProjectId;
use thiserror::Error;

/// Result alias used throughout the client core
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by client operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClientError {
    /// Request failed to complete, or the backend answered with an error status
    #[error("Network error: {message}")]
    Network {
        /// HTTP status when the server answered
        status: Option<u16>,
        /// Human-readable error message
        message: String,
    },

    /// Referenced resource id is absent
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Resource kind ("block", "project", "plugin")
        kind: &'static str,
        /// The id that was looked up
        id: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Undo or redo requested at a history bound
    #[error("Nothing to {action}")]
    Unavailable {
        /// "undo" or "redo"
        action: &'static str,
    },

    /// A proposal targets a block id the store does not contain
    #[error("Proposed update references unknown block '{block_id}'")]
    LookupFailure {
        /// The unmatched block id
        block_id: BlockId,
    },

    /// The block has pending content; edits and assists are suspended
    #[error("Block '{block_id}' has a pending change awaiting review")]
    PendingReview {
        /// The block under review
        block_id: BlockId,
    },

    /// A response arrived after the active project changed and was dropped
    #[error("Ignored response for project '{project_id}': active project changed")]
    Stale {
        /// Project the request was issued for
        project_id: ProjectId,
    },

    /// A project-scoped command was issued with no project selected
    #[error("No project selected")]
    NoActiveProject,

    /// JSON/TOML serialization or deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },
}

impl ClientError {
    /// Create a transport-level network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: message.into(),
        }
    }

    /// Create a network error for a non-success HTTP status
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Network {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a not-found error for a block
    pub fn block_not_found(id: &BlockId) -> Self {
        Self::NotFound {
            kind: "block",
            id: id.to_string(),
        }
    }

    /// Create a not-found error for a project
    pub fn project_not_found(id: &ProjectId) -> Self {
        Self::NotFound {
            kind: "project",
            id: id.to_string(),
        }
    }

    pub fn plugin_not_found(id: &PluginId) -> Self {
        Self::NotFound {
            kind: "plugin",
            id: id.to_string(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether this error means the request never produced a usable answer
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Whether this error is the stale-response guard firing
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::serialization(format!("Failed to parse response: {}", err));
        }
        Self::Network {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
