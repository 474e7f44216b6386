//! Integration tests
//!
//! Exercise the client core end to end, over a mock HTTP backend or the
//! in-memory gateway.

pub mod chat_test;
pub mod reconcile_test;
pub mod store_test;
pub mod workspace_test;
