// Undo/redo history for HexFog Core
//
// A bounded stack of deep-copied snapshots. The oldest retained entry is the
// floor state: undo never pops past it, so there is no separate "current"
// pointer to track.

use std::collections::VecDeque;

use crate::types::Snapshot;

pub const HISTORY_CAP: usize = 100;

#[derive(Debug, Default)]
pub struct HistoryManager {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
}

impl HistoryManager {
    pub fn new() -> HistoryManager {
        HistoryManager {
            undo: VecDeque::new(),
            redo: Vec::new(),
        }
    }

    /// Append a snapshot, dropping the oldest entry past the cap.
    /// Any push invalidates the redo stack.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.undo.push_back(snapshot);
        while self.undo.len() > HISTORY_CAP {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Step back one snapshot. No-op at the floor (one or zero entries left);
    /// otherwise the current top moves to the redo stack and the new top is
    /// returned for the caller to restore.
    pub fn undo(&mut self) -> Option<Snapshot> {
        if self.undo.len() <= 1 {
            return None;
        }
        let current = self.undo.pop_back()?;
        self.redo.push(current);
        self.undo.back().cloned()
    }

    /// Step forward one snapshot, if any were undone
    pub fn redo(&mut self) -> Option<Snapshot> {
        let snapshot = self.redo.pop()?;
        self.undo.push_back(snapshot.clone());
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }
}
