use std::collections::VecDeque;

use crate::canvas::Grid;

/// Default maximum number of snapshots kept in the log.
pub const DEFAULT_MAX_HISTORY: usize = 50;

// ============================================================================
// HISTORY ENTRY
// ============================================================================

/// One snapshot in the log plus the label of the edit that produced it.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub description: String,
    pub grid: Grid,
}

// ============================================================================
// HISTORY MANAGER — capped, linear, branch-discarding snapshot log
// ============================================================================

/// Linear undo/redo over whole-grid snapshots.
///
/// `entries[position]` is always the current grid. Committing drops every entry
/// after `position` (the redo branch) before appending. When the log grows past
/// `max_depth` the oldest entry is evicted and `position` shifts with it,
/// so it still points at the entry that was just committed.
///
/// Snapshots are [`Grid`] handles onto a shared buffer. Keeping one is a
/// reference-count bump; the first write to a shared grid copies the whole
/// buffer, never part of it.
pub struct HistoryManager {
    entries: VecDeque<HistoryEntry>,
    position: usize,
    max_depth: usize,
}

impl HistoryManager {
    pub fn new(initial: Grid, max_depth: usize) -> Self {
        let mut entries = VecDeque::with_capacity(max_depth.clamp(1, 64));
        entries.push_back(HistoryEntry {
            description: "Initial".to_string(),
            grid: initial,
        });
        Self {
            entries,
            position: 0,
            max_depth: max_depth.max(1),
        }
    }

    /// The grid at the current position.
    pub fn current(&self) -> &Grid {
        &self.entries[self.position].grid
    }

    /// Record a completed edit.
    pub fn commit(&mut self, grid: Grid, description: impl Into<String>) {
        // Discard the redo branch
        self.entries.truncate(self.position + 1);

        self.entries.push_back(HistoryEntry {
            description: description.into(),
            grid,
        });
        self.position = self.entries.len() - 1;

        self.prune();
    }

    /// Step back. Returns the description of the undone edit, or `None` at the
    /// oldest entry.
    pub fn undo(&mut self) -> Option<String> {
        if self.position == 0 {
            return None;
        }
        let description = self.entries[self.position].description.clone();
        self.position -= 1;
        Some(description)
    }

    /// Step forward. Returns the description of the redone edit, or `None` at
    /// the newest entry.
    pub fn redo(&mut self) -> Option<String> {
        if self.position + 1 >= self.entries.len() {
            return None;
        }
        self.position += 1;
        Some(self.entries[self.position].description.clone())
    }

    /// Replace the whole log with a single snapshot (resize, clear, load).
    pub fn reset(&mut self, grid: Grid, description: impl Into<String>) {
        self.entries.clear();
        self.entries.push_back(HistoryEntry {
            description: description.into(),
            grid,
        });
        self.position = 0;
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.position + 1 < self.entries.len()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.can_undo()
            .then(|| self.entries[self.position].description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.entries
            .get(self.position + 1)
            .map(|e| e.description.as_str())
    }

    /// All undoable descriptions (most recent first).
    pub fn undo_history(&self) -> Vec<String> {
        self.entries
            .iter()
            .take(self.position + 1)
            .skip(1)
            .rev()
            .map(|e| e.description.clone())
            .collect()
    }

    /// Undo `steps` times (stops early at the oldest entry).
    pub fn undo_to(&mut self, steps: usize) {
        for _ in 0..steps {
            if self.undo().is_none() {
                break;
            }
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.position
    }

    pub fn redo_count(&self) -> usize {
        self.entries.len() - 1 - self.position
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Snapshot grids, oldest first.
    pub fn snapshots(&self) -> impl Iterator<Item = &Grid> {
        self.entries.iter().map(|e| &e.grid)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Change the cap; evicts immediately if the log is now too long.
    pub fn set_max_depth(&mut self, max: usize) {
        self.max_depth = max.max(1);
        self.prune();
    }

    /// Evict the oldest entries until within the cap, keeping `position` on
    /// the same logical snapshot. The current entry is never evicted.
    fn prune(&mut self) {
        while self.entries.len() > self.max_depth && self.position > 0 {
            self.entries.pop_front();
            self.position -= 1;
        }
        // Cap shrank below the redo tail: drop the far end of the branch instead
        if self.entries.len() > self.max_depth {
            self.entries.truncate(self.max_depth);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
