//! Shared Module
//!
//! This module contains the domain and wire types of the structured chat
//! backend: projects, context blocks, chat messages, errors and configuration.
//!
//! # Overview
//!
//! Every type here is plain data. None of them perform I/O; the stateful
//! client core in [`crate::client`] is built on top of them.

/// Project data structure
pub mod project;

/// Context block data structures
pub mod block;

/// Chat message data structures
pub mod chat;

/// Backend plugin registry types
pub mod plugin;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use block::{BlockContent, BlockField, BlockId, BlockType, ContextBlock};
pub use chat::{ChatMessage, ChatReply, ChatRole, ContextUpdate};
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::{ClientError, Result};
pub use plugin::{NewPlugin, PluginId, PluginInfo};
pub use project::{Project, ProjectId};
