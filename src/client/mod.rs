//! # Client Core
//!
//! Stateful client for the structured chat backend.
//!
//! ## Components
//!
//! - [`gateway`] - the `Gateway` trait and its HTTP/JSON implementation
//! - [`memory`] - an in-process gateway for offline use and tests
//! - [`store`] - the local block mirror, with per-block write lanes
//! - [`reconcile`] - accept/reject of AI-proposed content
//! - [`history`] - bounded undo/redo snapshots
//! - [`chat`] - the conversation for the active project
//! - [`workspace`] - the project list and the orchestration of all of the above
//!
//! Presentation helpers ([`diff`], [`plugins`], [`preferences`]) never touch
//! domain state.

pub mod chat;
pub mod config;
pub mod diff;
pub mod gateway;
pub mod history;
pub mod memory;
pub mod plugins;
pub mod preferences;
pub mod reconcile;
pub mod store;
pub mod workspace;

pub use chat::{ChatOutcome, ChatSession};
pub use config::Config;
pub use diff::{DiffSpan, Granularity, SpanKind};
pub use gateway::{Gateway, HttpGateway};
pub use history::{BlockSnapshot, History};
pub use memory::{GatewayCall, GatewayOp, MemoryGateway};
pub use plugins::{BlockRenderer, RendererRegistry};
pub use preferences::{PreferencesStore, UiPreferences};
pub use reconcile::{AcceptAllReport, AcceptFailure, ProposalReport, Reconciler};
pub use store::{BlockStore, Direction, Scope};
pub use workspace::{AssistOutcome, Workspace};
