//! Structured Chat - Client Library
//!
//! Client core for a structured-chat backend: a project holds an ordered set
//! of titled context blocks and a conversation with an assistant that can
//! propose changes to those blocks.
//!
//! # Overview
//!
//! This library provides:
//! - A local, ordered mirror of a project's context blocks with write-through
//!   persistence
//! - Review of assistant-proposed block content (accept, reject, diff)
//! - Bounded undo/redo over block snapshots
//! - A chat session that routes proposals to the blocks they target
//! - A typed HTTP/JSON gateway to the backend, plus an in-memory one
//!
//! # Module Structure
//!
//! - **`shared`** - Plain data types
//!   - Projects, blocks, chat messages and their wire formats
//!   - Error types
//!   - Configuration
//!
//! - **`client`** - Stateful client core
//!   - Gateway trait with HTTP and in-memory implementations
//!   - Block store, reconciler, history and chat session
//!   - The `Workspace` orchestrator
//!
//! # Usage
//!
//! ```rust,no_run
//! use structured_chat::client::{Config, Workspace};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let workspace = Workspace::connect(Config::load()?)?;
//! for project in workspace.refresh_projects().await? {
//!     println!("{}", project.name);
//! }
//! # Ok(())
//! # }
//! ```

/// Shared data types
pub mod shared;

/// Stateful client core
pub mod client;
