//! Snapshot-based undo/redo history.
//!
//! Each mutation pushes the full pre-mutation section list; undo/redo swap
//! the live list wholesale. Bounded: pushing past the cap drops the oldest
//! entry, and any new push clears the redo stack.

use tessera_common::Section;

pub const DEFAULT_MAX_ENTRIES: usize = 50;

#[derive(Debug)]
pub struct History {
    undo_stack: Vec<Vec<Section>>,
    redo_stack: Vec<Vec<Section>>,
    max_entries: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries,
        }
    }

    /// Record the pre-mutation state.
    pub fn push(&mut self, state: Vec<Section>) {
        self.undo_stack.push(state);
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Pop the previous state, moving `current` onto the redo stack.
    pub fn undo(&mut self, current: Vec<Section>) -> Option<Vec<Section>> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Pop the next state, moving `current` onto the undo stack.
    pub fn redo(&mut self, current: Vec<Section>) -> Option<Vec<Section>> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    /// Drop the most recent undo entry without restoring it. The redo
    /// stack is untouched.
    pub fn discard_last(&mut self) {
        self.undo_stack.pop();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
