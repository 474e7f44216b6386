//! # Undo/Redo History
//!
//! A bounded, linear log of snapshots with a movable cursor.
//!
//! - `record` truncates everything after the cursor, then appends. Any record
//!   after an undo discards the forward branch for good.
//! - `undo` / `redo` only move the cursor; they never change the log length.
//! - When the log grows past its limit the oldest snapshot is evicted.
//!
//! The cursor is `None` before the first record (the "-1" position).

use crate::shared::block::ContextBlock;
use crate::shared::error::{ClientError, Result};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Full copy of a project's block array at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSnapshot {
    pub blocks: Vec<ContextBlock>,
    pub captured_at: DateTime<Utc>,
}

impl BlockSnapshot {
    pub fn capture(blocks: Vec<ContextBlock>) -> Self {
        Self {
            blocks,
            captured_at: Utc::now(),
        }
    }
}

/// Linear undo/redo log
#[derive(Debug, Clone)]
pub struct History<T> {
    snapshots: VecDeque<T>,
    cursor: Option<usize>,
    limit: usize,
}

impl<T: Clone> History<T> {
    /// Create an empty history keeping at most `limit` snapshots (minimum 1)
    pub fn new(limit: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: None,
            limit: limit.max(1),
        }
    }

    /// Drop the redo tail, append `snapshot` and move the cursor onto it
    pub fn record(&mut self, snapshot: T) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.snapshots.truncate(keep);
        self.snapshots.push_back(snapshot);

        if self.snapshots.len() > self.limit {
            self.snapshots.pop_front();
        }
        self.cursor = Some(self.snapshots.len() - 1);
    }

    pub fn undo(&mut self) -> Result<T> {
        match self.cursor {
            Some(cursor) if cursor > 0 => {
                self.cursor = Some(cursor - 1);
                Ok(self.snapshots[cursor - 1].clone())
            }
            _ => Err(ClientError::Unavailable { action: "undo" }),
        }
    }

    pub fn redo(&mut self) -> Result<T> {
        let next = self.cursor.map_or(0, |c| c + 1);
        if self.cursor.is_none() || next >= self.snapshots.len() {
            return Err(ClientError::Unavailable { action: "redo" });
        }
        self.cursor = Some(next);
        Ok(self.snapshots[next].clone())
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(c) if c + 1 < self.snapshots.len())
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Snapshot under the cursor
    pub fn current(&self) -> Option<&T> {
        self.cursor.and_then(|c| self.snapshots.get(c))
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.cursor = None;
    }
}
